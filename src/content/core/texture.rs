use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::content::budget::BudgetTracker;
use crate::content::core::{AssetCore, CoreServices, IdleTracker};
use crate::gpu::GpuContext;
use crate::texture::Texture;

/// Edge length of solid-color textures.
const COLOR_TEXTURE_SIZE: u32 = 16;

/// Where a texture core gets its pixels from when it allocates.
pub enum TextureSource {
    /// Decode an image file from disk.
    File(PathBuf),
    /// Decode an encoded image held in memory (e.g. a thumbnail blob a
    /// collaborator already fetched).
    Bytes(Vec<u8>),
    /// Fill with a solid color. Never fails to allocate.
    Color([u8; 4]),
}

struct TextureState {
    payload: Option<Arc<Texture>>,
    width: u32,
    height: u32,
    max_u: f32,
    max_v: f32,
    allocation_size: usize,
    failed: bool,
}

/// Owns one device texture, created lazily from its source on first use and
/// freed under memory pressure without losing the source description.
pub struct TextureAssetCore {
    name: String,
    source: TextureSource,
    /// Caps the decoded size; set for thumbnails and size-constrained
    /// requests.
    decode_limit: Option<(u32, u32)>,
    state: Mutex<TextureState>,
    idle: IdleTracker,
    budget: BudgetTracker,
}

impl TextureAssetCore {
    pub(crate) fn new(
        name: impl Into<String>,
        source: TextureSource,
        decode_limit: Option<(u32, u32)>,
        services: &CoreServices,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            decode_limit,
            state: Mutex::new(TextureState {
                payload: None,
                width: 0,
                height: 0,
                max_u: 1.0,
                max_v: 1.0,
                allocation_size: 0,
                failed: false,
            }),
            idle: services.idle_tracker(),
            budget: services.budget.clone(),
        }
    }

    /// Realize the device texture. No-op when already allocated or in the
    /// sticky failed state. Render thread only.
    pub fn allocate(&self, gpu: &GpuContext) {
        self.idle.keep_alive();

        let mut state = self.state.lock().unwrap();
        if state.payload.is_some() || state.failed {
            return;
        }

        let result = match &self.source {
            TextureSource::File(path) => {
                Texture::from_path(gpu.device(), gpu.queue(), path, self.decode_limit)
            }
            TextureSource::Bytes(bytes) => Texture::from_encoded_bytes(
                gpu.device(),
                gpu.queue(),
                bytes,
                self.decode_limit,
                Some(&self.name),
            ),
            TextureSource::Color(color) => Ok(Texture::solid_color(
                gpu.device(),
                gpu.queue(),
                *color,
                COLOR_TEXTURE_SIZE,
                Some(&self.name),
            )),
        };

        match result {
            Ok(texture) => {
                state.width = texture.width();
                state.height = texture.height();
                state.max_u = 1.0;
                state.max_v = 1.0;
                state.allocation_size = texture.size_bytes();
                state.payload = Some(Arc::new(texture));
                self.budget.add(state.allocation_size as i64);
            }
            Err(err) => {
                log::warn!("TextureAssetCore: '{}' failed to allocate: {}", self.name, err);
                state.failed = true;
            }
        }
    }

    /// The device texture, if currently allocated. Accessing it counts as a
    /// use for idle tracking.
    pub fn texture(&self) -> Option<Arc<Texture>> {
        self.idle.keep_alive();
        self.state.lock().unwrap().payload.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source image width in pixels; 0 until first allocation.
    pub fn width(&self) -> u32 {
        self.state.lock().unwrap().width
    }

    /// Source image height in pixels; 0 until first allocation.
    pub fn height(&self) -> u32 {
        self.state.lock().unwrap().height
    }

    /// Rightmost texture coordinate covered by image data.
    pub fn max_u(&self) -> f32 {
        self.state.lock().unwrap().max_u
    }

    /// Bottommost texture coordinate covered by image data.
    pub fn max_v(&self) -> f32 {
        self.state.lock().unwrap().max_v
    }

    pub fn load_failed(&self) -> bool {
        self.state.lock().unwrap().failed
    }

    /// Allows allocation to be re-attempted after a failed load.
    pub fn clear_failed_state(&self) {
        self.state.lock().unwrap().failed = false;
    }
}

impl AssetCore for TextureAssetCore {
    fn is_allocated(&self) -> bool {
        self.state.lock().unwrap().payload.is_some()
    }

    fn allocation_size(&self) -> usize {
        let state = self.state.lock().unwrap();
        if state.payload.is_some() {
            state.allocation_size
        } else {
            0
        }
    }

    fn can_be_deleted(&self) -> bool {
        self.is_allocated() && self.idle.expired()
    }

    fn free(&self) {
        let mut state = self.state.lock().unwrap();
        if state.payload.take().is_some() {
            self.budget.add(-(state.allocation_size as i64));
            state.allocation_size = 0;
        }
        // A freed core gets a clean slate; a later request may retry a
        // previously failed source.
        state.failed = false;
    }
}
