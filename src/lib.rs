//! Budget-aware cache of GPU-backed UI assets on wgpu: textures, thumbnails,
//! shader effects, glyph atlases and off-screen render surfaces, deduplicated
//! by key and freed under memory pressure.

pub mod content;
pub mod fonts;
pub mod gpu;
pub mod settings;
pub mod texture;
pub mod time;

pub use content::asset::{
    EffectAsset, FontAsset, RenderTargetAsset, RenderTextureAsset, TextureAsset,
};
pub use content::core::font::GlyphRect;
pub use content::{AssetKind, ContentManager};
pub use fonts::FontRegistry;
pub use gpu::GpuContext;
pub use settings::CacheSettings;
pub use texture::Texture;
pub use time::FrameClock;
