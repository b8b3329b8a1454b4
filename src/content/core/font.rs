use std::sync::{Arc, Mutex};

use crate::content::budget::BudgetTracker;
use crate::content::core::{AssetCore, CoreServices, IdleTracker};
use crate::gpu::GpuContext;
use crate::texture::Texture;

pub const ATLAS_WIDTH: u32 = 1024;
pub const ATLAS_HEIGHT: u32 = 1024;
/// Empty pixels between packed glyphs, so linear sampling does not bleed.
const GLYPH_PAD: u32 = 1;

/// Placement of one glyph inside the atlas, both in pixels and in texture
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

/// Left-to-right, row-advance rectangle packer for the glyph atlas.
pub struct AtlasPacker {
    width: u32,
    height: u32,
    current_x: u32,
    current_y: u32,
    row_height: u32,
}

impl AtlasPacker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            current_x: 0,
            current_y: 0,
            row_height: 0,
        }
    }

    /// Reserve a `width` x `height` rectangle. Returns its top-left corner,
    /// or `None` when the atlas is full.
    pub fn pack(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        if width > self.width || height > self.height {
            return None;
        }
        if self.current_x + width > self.width {
            // Start a new row under the tallest glyph of the current one.
            self.current_y += self.row_height + GLYPH_PAD;
            self.current_x = 0;
            self.row_height = 0;
        }
        if self.current_y + height > self.height {
            return None;
        }
        let pos = (self.current_x, self.current_y);
        self.current_x += width + GLYPH_PAD;
        self.row_height = self.row_height.max(height);
        Some(pos)
    }

    pub fn reset(&mut self) {
        self.current_x = 0;
        self.current_y = 0;
        self.row_height = 0;
    }
}

struct FontState {
    atlas: Option<Arc<Texture>>,
    packer: AtlasPacker,
    allocation_size: usize,
}

/// Owns one glyph atlas texture for a (family, size) pair.
///
/// Glyph bitmaps arrive pre-rasterized from the text subsystem and are packed
/// into the atlas incrementally. Freeing the core drops the atlas and
/// invalidates every `GlyphRect` handed out so far; the text subsystem
/// re-adds glyphs after the next allocation.
pub struct FontAssetCore {
    family: String,
    size: u32,
    state: Mutex<FontState>,
    idle: IdleTracker,
    budget: BudgetTracker,
}

impl FontAssetCore {
    pub(crate) fn new(family: impl Into<String>, size: u32, services: &CoreServices) -> Self {
        Self {
            family: family.into(),
            size,
            state: Mutex::new(FontState {
                atlas: None,
                packer: AtlasPacker::new(ATLAS_WIDTH, ATLAS_HEIGHT),
                allocation_size: 0,
            }),
            idle: services.idle_tracker(),
            budget: services.budget.clone(),
        }
    }

    /// Create the atlas texture. No-op when already allocated. Render thread
    /// only.
    pub fn allocate(&self, gpu: &GpuContext) {
        self.idle.keep_alive();

        let mut state = self.state.lock().unwrap();
        if state.atlas.is_some() {
            return;
        }

        let label = format!("{}::{} atlas", self.family, self.size);
        let atlas = Texture::glyph_atlas(gpu.device(), ATLAS_WIDTH, ATLAS_HEIGHT, Some(&label));
        state.allocation_size = atlas.size_bytes();
        state.packer.reset();
        state.atlas = Some(Arc::new(atlas));
        self.budget.add(state.allocation_size as i64);
    }

    /// Pack one pre-rasterized glyph bitmap (single channel, `width` x
    /// `height`, row-major) into the atlas and upload it. Allocates the atlas
    /// lazily. Returns `None` when the atlas has no room left.
    pub fn add_glyph(
        &self,
        gpu: &GpuContext,
        bitmap: &[u8],
        width: u32,
        height: u32,
    ) -> Option<GlyphRect> {
        assert_eq!(
            bitmap.len(),
            (width * height) as usize,
            "glyph bitmap does not match its dimensions"
        );

        self.allocate(gpu);

        let mut state = self.state.lock().unwrap();
        let atlas = state.atlas.clone()?;
        let (x, y) = match state.packer.pack(width, height) {
            Some(pos) => pos,
            None => {
                log::warn!(
                    "FontAssetCore: atlas for {}::{} is full, glyph {}x{} dropped",
                    self.family,
                    self.size,
                    width,
                    height
                );
                return None;
            }
        };

        atlas.write_region(gpu.queue(), x, y, width, height, bitmap);

        Some(GlyphRect {
            x,
            y,
            width,
            height,
            u0: x as f32 / ATLAS_WIDTH as f32,
            v0: y as f32 / ATLAS_HEIGHT as f32,
            u1: (x + width) as f32 / ATLAS_WIDTH as f32,
            v1: (y + height) as f32 / ATLAS_HEIGHT as f32,
        })
    }

    /// The atlas texture, if currently allocated. Accessing it counts as a
    /// use for idle tracking.
    pub fn atlas(&self) -> Option<Arc<Texture>> {
        self.idle.keep_alive();
        self.state.lock().unwrap().atlas.clone()
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// Rendered glyph size in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }
}

impl AssetCore for FontAssetCore {
    fn is_allocated(&self) -> bool {
        self.state.lock().unwrap().atlas.is_some()
    }

    fn allocation_size(&self) -> usize {
        let state = self.state.lock().unwrap();
        if state.atlas.is_some() {
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
        if state.atlas.take().is_some() {
            self.budget.add(-(state.allocation_size as i64));
            state.allocation_size = 0;
        }
        state.packer.reset();
    }
}
