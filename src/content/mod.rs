//! The content manager: one process-wide cache of device-backed UI assets.
//!
//! Each asset kind has its own key-to-entry table. Entries couple a strongly
//! owned core (the object holding the device resource) with a weak reference
//! to the handle client code currently holds. Identical requests share one
//! core; dropped handles leave the core behind for cheap re-activation; a
//! per-frame cleanup pass frees idle cores under memory pressure; a
//! background thread eventually forgets entries nobody uses.

pub mod asset;
pub mod budget;
pub mod core;
pub(crate) mod table;

use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::{Duration, Instant};

use crate::fonts::FontRegistry;
use crate::settings::CacheSettings;
use crate::time::FrameClock;

use self::asset::{EffectAsset, FontAsset, RenderTargetAsset, RenderTextureAsset, TextureAsset};
use self::budget::{cleanup_limits, next_cleanup_interval, BudgetTracker};
use self::core::effect::EffectAssetCore;
use self::core::font::FontAssetCore;
use self::core::render_target::{RenderTargetAssetCore, RenderTextureAssetCore};
use self::core::texture::{TextureAssetCore, TextureSource};
use self::core::CoreServices;
use self::table::{AssetTable, SweepTable};

/// Interval between periodic allocation reports in the log.
const REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// The closed set of asset categories, each with its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Texture,
    Thumbnail,
    Effect,
    Font,
    RenderTexture,
    RenderTarget,
}

impl AssetKind {
    pub const ALL: [AssetKind; 6] = [
        AssetKind::Texture,
        AssetKind::Thumbnail,
        AssetKind::Effect,
        AssetKind::Font,
        AssetKind::RenderTexture,
        AssetKind::RenderTarget,
    ];
}

struct CleanupState {
    last_cleanup: Instant,
    last_report: Instant,
    next_interval: Duration,
    /// Index into `AssetKind::ALL` where the next cleanup pass starts, for
    /// round-robin fairness across kinds.
    next_kind: usize,
}

pub struct ContentManager {
    settings: CacheSettings,
    clock: Arc<FrameClock>,
    budget: BudgetTracker,
    fonts: FontRegistry,

    textures: Mutex<AssetTable<TextureAssetCore, TextureAsset>>,
    thumbnails: Mutex<AssetTable<TextureAssetCore, TextureAsset>>,
    effects: Mutex<AssetTable<EffectAssetCore, EffectAsset>>,
    font_atlases: Mutex<AssetTable<FontAssetCore, FontAsset>>,
    render_textures: Mutex<AssetTable<RenderTextureAssetCore, RenderTextureAsset>>,
    render_targets: Mutex<AssetTable<RenderTargetAssetCore, RenderTargetAsset>>,

    cleanup: Mutex<CleanupState>,
}

impl ContentManager {
    /// Create a manager and start its background entry sweeper. The sweeper
    /// holds a weak reference and exits once the manager is dropped.
    pub fn new(settings: CacheSettings, fonts: FontRegistry) -> Arc<Self> {
        let settings = settings.validate();
        let clock = Arc::new(FrameClock::new());
        let now = clock.frame_time();

        let manager = Arc::new(Self {
            cleanup: Mutex::new(CleanupState {
                last_cleanup: now,
                last_report: now,
                next_interval: settings.long_cleanup_interval(),
                next_kind: 0,
            }),
            settings,
            clock,
            budget: BudgetTracker::new(),
            fonts,
            textures: Mutex::new(AssetTable::default()),
            thumbnails: Mutex::new(AssetTable::default()),
            effects: Mutex::new(AssetTable::default()),
            font_atlases: Mutex::new(AssetTable::default()),
            render_textures: Mutex::new(AssetTable::default()),
            render_targets: Mutex::new(AssetTable::default()),
        });

        Self::spawn_sweeper(&manager);
        manager
    }

    /// The process-wide instance, configured from `content_cache.json` if
    /// present.
    pub fn instance() -> &'static Arc<ContentManager> {
        static INSTANCE: OnceLock<Arc<ContentManager>> = OnceLock::new();
        INSTANCE.get_or_init(|| {
            let settings = CacheSettings::load();
            let fonts = FontRegistry::from_settings(&settings);
            ContentManager::new(settings, fonts)
        })
    }

    fn spawn_sweeper(manager: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(manager);
        let interval = manager.settings.sweep_interval();
        let low_threshold = manager.settings.low_cleanup_threshold;

        // std threads have no priority knob; the sweeper's workload is a few
        // map scans per minute, so none is needed.
        std::thread::Builder::new()
            .name("content sweeper".to_owned())
            .spawn(move || loop {
                std::thread::sleep(interval);
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                // Only compact once allocation is high enough to matter;
                // dead entries are cheap metadata until then.
                if manager.budget.total() > low_threshold {
                    let removed = manager.sweep_dead_entries();
                    if removed > 0 {
                        log::debug!("ContentManager: sweeper removed {} dead entries", removed);
                    }
                }
            })
            .expect("failed to spawn content sweeper thread");
    }

    fn services(&self) -> CoreServices {
        CoreServices {
            clock: self.clock.clone(),
            idle_timeout: self.settings.idle_timeout(),
            budget: self.budget.clone(),
        }
    }

    // ---- Asset entry points ------------------------------------------------

    /// An image texture loaded from a file, decoded at full size.
    pub fn get_texture(&self, name: &str) -> Arc<TextureAsset> {
        self.get_create_texture(name, name, None, false)
    }

    /// An image texture loaded from a file, decoded to fit within the given
    /// bounds. A zero bound means unconstrained.
    pub fn get_texture_sized(&self, name: &str, width: u32, height: u32) -> Arc<TextureAsset> {
        if width == 0 && height == 0 {
            return self.get_texture(name);
        }
        let key = format!("{name}:[{width},{height}]");
        self.get_create_texture(name, &key, Some((width, height)), false)
    }

    /// A thumbnail-sized rendition of an image file. Thumbnails live in their
    /// own table, so a thumbnail and a full texture of the same file coexist.
    pub fn get_thumbnail(&self, name: &str) -> Arc<TextureAsset> {
        let dim = self.settings.thumbnail_dimension;
        self.get_create_texture(name, name, Some((dim, dim)), true)
    }

    fn get_create_texture(
        &self,
        name: &str,
        key: &str,
        decode_limit: Option<(u32, u32)>,
        thumb: bool,
    ) -> Arc<TextureAsset> {
        let table = if thumb { &self.thumbnails } else { &self.textures };
        let path = self.resolve_image_path(name);
        let services = self.services();
        table.lock().unwrap().get_or_create(
            key,
            || TextureAssetCore::new(name, TextureSource::File(path), decode_limit, &services),
            |core| TextureAsset::new(core),
        )
    }

    /// An image texture decoded from an in-memory encoded image (png, jpg,
    /// ...) that a collaborator already fetched.
    pub fn get_texture_from_bytes(&self, key: &str, bytes: Vec<u8>) -> Arc<TextureAsset> {
        let services = self.services();
        self.textures.lock().unwrap().get_or_create(
            key,
            || TextureAssetCore::new(key, TextureSource::Bytes(bytes), None, &services),
            |core| TextureAsset::new(core),
        )
    }

    /// An image texture decoded from a stream. The stream is drained here;
    /// read errors surface as the asset's sticky load-failed state.
    pub fn get_texture_from_reader(&self, key: &str, mut reader: impl Read) -> Arc<TextureAsset> {
        let mut bytes = Vec::new();
        if let Err(err) = reader.read_to_end(&mut bytes) {
            log::warn!("ContentManager: failed to read image stream '{}': {}", key, err);
            // The truncated buffer will fail to decode, which marks the core
            // as load-failed for the caller to observe.
        }
        self.get_texture_from_bytes(key, bytes)
    }

    /// A 16x16 texture filled with a solid color.
    pub fn get_color_texture(&self, color: [u8; 4]) -> Arc<TextureAsset> {
        // The ':' prefix keeps color keys out of the filename namespace.
        let key = format!(":{},{},{},{}", color[0], color[1], color[2], color[3]);
        let services = self.services();
        self.textures.lock().unwrap().get_or_create(
            &key,
            || TextureAssetCore::new(&key, TextureSource::Color(color), None, &services),
            |core| TextureAsset::new(core),
        )
    }

    /// A compiled shader effect, found as `<name>.wgsl` in the shader
    /// directory.
    pub fn get_effect(&self, name: &str) -> Arc<EffectAsset> {
        let path = self.settings.shader_directory.join(format!("{name}.wgsl"));
        let services = self.services();
        self.effects.lock().unwrap().get_or_create(
            name,
            || EffectAssetCore::new(name, path, &services),
            |core| EffectAsset::new(core),
        )
    }

    /// A glyph atlas for the given family and size. Unknown families fall
    /// back to the registry default; the size is rounded up to whole pixels
    /// so near-identical requests share an atlas.
    pub fn get_font(&self, family: &str, size: f32) -> Arc<FontAsset> {
        let family = self.fonts.resolve(family);
        let base_size = (size.ceil() as u32).max(1);
        let key = format!("{family}::{base_size}");
        let services = self.services();
        self.font_atlases.lock().unwrap().get_or_create(
            &key,
            || FontAssetCore::new(family, base_size, &services),
            |core| FontAsset::new(core),
        )
    }

    /// An off-screen render texture that render passes draw into and later
    /// sample.
    pub fn get_render_texture(&self, key: &str) -> Arc<RenderTextureAsset> {
        let services = self.services();
        self.render_textures.lock().unwrap().get_or_create(
            key,
            || RenderTextureAssetCore::new(key, &services),
            |core| RenderTextureAsset::new(core),
        )
    }

    /// An off-screen target whose contents are read back over a copy.
    pub fn get_render_target(&self, key: &str) -> Arc<RenderTargetAsset> {
        let services = self.services();
        self.render_targets.lock().unwrap().get_or_create(
            key,
            || RenderTargetAssetCore::new(key, &services),
            |core| RenderTargetAsset::new(core),
        )
    }

    // ---- Maintenance -------------------------------------------------------

    /// Per-frame cleanup. Cheap when under budget; otherwise frees idle cores
    /// across kinds, bounded by the current pressure tier's limits so one
    /// call never stalls a frame.
    pub fn clean(&self) {
        let now = self.clock.frame_time();
        let total = self.budget.total();
        let mut state = self.cleanup.lock().unwrap();

        if let Some(limits) = cleanup_limits(total, &self.settings) {
            if now.saturating_duration_since(state.last_cleanup) > state.next_interval {
                let kinds = AssetKind::ALL;
                let start = state.next_kind;
                let mut idx = start;
                let mut dealloc_remaining = limits.deallocation;
                let mut scan_remaining = limits.scan as i64;

                loop {
                    let table = self.kind_table(kinds[idx]);
                    dealloc_remaining -= table.free_cores(true, dealloc_remaining);
                    scan_remaining -= table.entry_count() as i64;

                    idx = (idx + 1) % kinds.len();
                    if dealloc_remaining == 0 || scan_remaining <= 0 || idx == start {
                        break;
                    }
                }

                state.next_kind = idx;
                state.next_interval = next_cleanup_interval(dealloc_remaining, &self.settings);
                state.last_cleanup = now;

                log::debug!(
                    "ContentManager: {} resources deallocated, next cleanup in {:?}. {:.1}/{:.1} MB",
                    limits.deallocation - dealloc_remaining,
                    state.next_interval,
                    self.budget.total() as f64 / (1024.0 * 1024.0),
                    self.settings.high_cleanup_threshold as f64 / (1024.0 * 1024.0),
                );
            }
        }

        if now.saturating_duration_since(state.last_report) > REPORT_INTERVAL {
            state.last_report = now;
            log::debug!(
                "ContentManager: allocation {:.1}/{:.1} MB",
                self.budget.total() as f64 / (1024.0 * 1024.0),
                self.settings.high_cleanup_threshold as f64 / (1024.0 * 1024.0),
            );
        }
    }

    /// Free every device payload but keep all cache structure, e.g. around a
    /// device reset.
    pub fn free(&self) {
        log::debug!("ContentManager: freeing all assets");
        for kind in AssetKind::ALL {
            self.kind_table(kind).free_cores(false, usize::MAX);
        }
        log::debug!("ContentManager: all assets freed");
    }

    /// Full teardown: free everything and forget every entry.
    pub fn clear(&self) {
        self.free();
        for kind in AssetKind::ALL {
            self.kind_table(kind).clear();
        }
    }

    /// Drop entries whose handle is gone and whose core holds nothing.
    /// Normally driven by the background sweeper; callable directly by hosts
    /// that manage their own threads.
    pub fn sweep_dead_entries(&self) -> usize {
        AssetKind::ALL
            .iter()
            .map(|kind| self.kind_table(*kind).sweep_dead())
            .sum()
    }

    // ---- Introspection -----------------------------------------------------

    /// Estimated total device memory held by all cached assets, in bytes.
    pub fn total_allocation(&self) -> u64 {
        self.budget.total()
    }

    pub fn entry_count(&self, kind: AssetKind) -> usize {
        self.kind_table(kind).entry_count()
    }

    /// The frame clock that drives cleanup cadence and idle measurement.
    /// Render loops call `begin_frame` on it (or on the manager) once per
    /// frame.
    pub fn clock(&self) -> &Arc<FrameClock> {
        &self.clock
    }

    pub fn begin_frame(&self) {
        self.clock.begin_frame();
    }

    // ---- Internals ---------------------------------------------------------

    fn kind_table(&self, kind: AssetKind) -> &dyn SweepTable {
        match kind {
            AssetKind::Texture => &self.textures,
            AssetKind::Thumbnail => &self.thumbnails,
            AssetKind::Effect => &self.effects,
            AssetKind::Font => &self.font_atlases,
            AssetKind::RenderTexture => &self.render_textures,
            AssetKind::RenderTarget => &self.render_targets,
        }
    }

    fn resolve_image_path(&self, name: &str) -> PathBuf {
        let path = PathBuf::from(name);
        if path.is_absolute() {
            path
        } else {
            self.settings.image_directory.join(path)
        }
    }
}
