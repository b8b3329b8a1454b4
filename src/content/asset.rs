//! Handle types handed to client code.
//!
//! Handles are thin, cheap shells over a shared core. Client code may drop
//! them at any time; the cache observes the drop through a weak reference and
//! eventually reclaims the underlying device resource. Dropping a handle has
//! no immediate side effect on the core.

use std::sync::Arc;

use crate::content::core::effect::EffectAssetCore;
use crate::content::core::font::{FontAssetCore, GlyphRect};
use crate::content::core::render_target::{RenderTargetAssetCore, RenderTextureAssetCore};
use crate::content::core::texture::TextureAssetCore;
use crate::content::core::AssetCore;
use crate::gpu::GpuContext;
use crate::texture::Texture;

/// Client handle for an image texture.
pub struct TextureAsset {
    core: Arc<TextureAssetCore>,
}

impl TextureAsset {
    pub(crate) fn new(core: Arc<TextureAssetCore>) -> Self {
        Self { core }
    }

    pub(crate) fn core(&self) -> &Arc<TextureAssetCore> {
        &self.core
    }

    /// Realize the device texture if necessary. Render thread only.
    pub fn allocate(&self, gpu: &GpuContext) {
        self.core.allocate(gpu);
    }

    pub fn texture(&self) -> Option<Arc<Texture>> {
        self.core.texture()
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn width(&self) -> u32 {
        self.core.width()
    }

    pub fn height(&self) -> u32 {
        self.core.height()
    }

    pub fn max_u(&self) -> f32 {
        self.core.max_u()
    }

    pub fn max_v(&self) -> f32 {
        self.core.max_v()
    }

    pub fn is_allocated(&self) -> bool {
        self.core.is_allocated()
    }

    pub fn allocation_size(&self) -> usize {
        self.core.allocation_size()
    }

    pub fn load_failed(&self) -> bool {
        self.core.load_failed()
    }

    pub fn clear_failed_state(&self) {
        self.core.clear_failed_state();
    }

    /// Whether two handles drive the same underlying resource. Handles from
    /// different abandonment cycles of one cache key compare equal here even
    /// though they are distinct objects.
    pub fn shares_core(&self, other: &TextureAsset) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

/// Client handle for a compiled shader effect.
pub struct EffectAsset {
    core: Arc<EffectAssetCore>,
}

impl EffectAsset {
    pub(crate) fn new(core: Arc<EffectAssetCore>) -> Self {
        Self { core }
    }

    pub(crate) fn core(&self) -> &Arc<EffectAssetCore> {
        &self.core
    }

    /// Compile the effect if necessary. Render thread only.
    pub fn allocate(&self, gpu: &GpuContext) {
        self.core.allocate(gpu);
    }

    pub fn module(&self) -> Option<Arc<wgpu::ShaderModule>> {
        self.core.module()
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn is_allocated(&self) -> bool {
        self.core.is_allocated()
    }

    pub fn load_failed(&self) -> bool {
        self.core.load_failed()
    }

    pub fn clear_failed_state(&self) {
        self.core.clear_failed_state();
    }

    pub fn shares_core(&self, other: &EffectAsset) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

/// Client handle for a glyph atlas.
pub struct FontAsset {
    core: Arc<FontAssetCore>,
}

impl FontAsset {
    pub(crate) fn new(core: Arc<FontAssetCore>) -> Self {
        Self { core }
    }

    pub(crate) fn core(&self) -> &Arc<FontAssetCore> {
        &self.core
    }

    /// Create the atlas if necessary. Render thread only.
    pub fn allocate(&self, gpu: &GpuContext) {
        self.core.allocate(gpu);
    }

    /// Pack and upload one pre-rasterized glyph. Render thread only.
    pub fn add_glyph(
        &self,
        gpu: &GpuContext,
        bitmap: &[u8],
        width: u32,
        height: u32,
    ) -> Option<GlyphRect> {
        self.core.add_glyph(gpu, bitmap, width, height)
    }

    pub fn atlas(&self) -> Option<Arc<Texture>> {
        self.core.atlas()
    }

    pub fn family(&self) -> &str {
        self.core.family()
    }

    pub fn size(&self) -> u32 {
        self.core.size()
    }

    pub fn is_allocated(&self) -> bool {
        self.core.is_allocated()
    }

    pub fn shares_core(&self, other: &FontAsset) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

/// Client handle for a sampleable off-screen render texture.
pub struct RenderTextureAsset {
    core: Arc<RenderTextureAssetCore>,
}

impl RenderTextureAsset {
    pub(crate) fn new(core: Arc<RenderTextureAssetCore>) -> Self {
        Self { core }
    }

    pub(crate) fn core(&self) -> &Arc<RenderTextureAssetCore> {
        &self.core
    }

    /// Ensure a surface of the given size. Render thread only.
    pub fn allocate(&self, gpu: &GpuContext, width: u32, height: u32) {
        self.core.allocate(gpu, width, height);
    }

    pub fn texture(&self) -> Option<Arc<Texture>> {
        self.core.texture()
    }

    pub fn key(&self) -> &str {
        self.core.key()
    }

    pub fn width(&self) -> u32 {
        self.core.width()
    }

    pub fn height(&self) -> u32 {
        self.core.height()
    }

    pub fn is_allocated(&self) -> bool {
        self.core.is_allocated()
    }

    pub fn shares_core(&self, other: &RenderTextureAsset) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

/// Client handle for a copy-out render target.
pub struct RenderTargetAsset {
    core: Arc<RenderTargetAssetCore>,
}

impl RenderTargetAsset {
    pub(crate) fn new(core: Arc<RenderTargetAssetCore>) -> Self {
        Self { core }
    }

    pub(crate) fn core(&self) -> &Arc<RenderTargetAssetCore> {
        &self.core
    }

    /// Ensure a target of the given size. Render thread only.
    pub fn allocate(&self, gpu: &GpuContext, width: u32, height: u32) {
        self.core.allocate(gpu, width, height);
    }

    pub fn texture(&self) -> Option<Arc<Texture>> {
        self.core.texture()
    }

    pub fn key(&self) -> &str {
        self.core.key()
    }

    pub fn width(&self) -> u32 {
        self.core.width()
    }

    pub fn height(&self) -> u32 {
        self.core.height()
    }

    pub fn is_allocated(&self) -> bool {
        self.core.is_allocated()
    }

    pub fn shares_core(&self, other: &RenderTargetAsset) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}
