use std::sync::{Arc, Mutex};

use crate::content::budget::BudgetTracker;
use crate::content::core::{AssetCore, CoreServices, IdleTracker};
use crate::gpu::GpuContext;
use crate::texture::Texture;

struct SurfaceState {
    payload: Option<Arc<Texture>>,
    width: u32,
    height: u32,
    allocation_size: usize,
}

impl SurfaceState {
    fn new() -> Self {
        Self {
            payload: None,
            width: 0,
            height: 0,
            allocation_size: 0,
        }
    }
}

/// Owns one off-screen texture that render passes draw into and later passes
/// sample from (e.g. cached sub-tree renderings, blur inputs).
pub struct RenderTextureAssetCore {
    key: String,
    state: Mutex<SurfaceState>,
    idle: IdleTracker,
    budget: BudgetTracker,
}

impl RenderTextureAssetCore {
    pub(crate) fn new(key: impl Into<String>, services: &CoreServices) -> Self {
        Self {
            key: key.into(),
            state: Mutex::new(SurfaceState::new()),
            idle: services.idle_tracker(),
            budget: services.budget.clone(),
        }
    }

    /// Ensure an allocated surface of exactly `width` x `height`, recreating
    /// it when the requested size changed. Render thread only.
    pub fn allocate(&self, gpu: &GpuContext, width: u32, height: u32) {
        self.idle.keep_alive();

        let mut state = self.state.lock().unwrap();
        if state.payload.is_some() && state.width == width && state.height == height {
            return;
        }

        if state.payload.take().is_some() {
            self.budget.add(-(state.allocation_size as i64));
            state.allocation_size = 0;
        }

        let texture = Texture::render_attachment(
            gpu.device(),
            width,
            height,
            wgpu::TextureUsages::TEXTURE_BINDING,
            Some(&self.key),
        );
        state.width = width;
        state.height = height;
        state.allocation_size = texture.size_bytes();
        state.payload = Some(Arc::new(texture));
        self.budget.add(state.allocation_size as i64);
    }

    /// The surface, if currently allocated. Accessing it counts as a use for
    /// idle tracking.
    pub fn texture(&self) -> Option<Arc<Texture>> {
        self.idle.keep_alive();
        self.state.lock().unwrap().payload.clone()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn width(&self) -> u32 {
        self.state.lock().unwrap().width
    }

    pub fn height(&self) -> u32 {
        self.state.lock().unwrap().height
    }
}

impl AssetCore for RenderTextureAssetCore {
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
    }
}

/// Owns one off-screen attachment whose contents are read back over a copy,
/// not sampled (e.g. screenshot and capture targets).
pub struct RenderTargetAssetCore {
    key: String,
    state: Mutex<SurfaceState>,
    idle: IdleTracker,
    budget: BudgetTracker,
}

impl RenderTargetAssetCore {
    pub(crate) fn new(key: impl Into<String>, services: &CoreServices) -> Self {
        Self {
            key: key.into(),
            state: Mutex::new(SurfaceState::new()),
            idle: services.idle_tracker(),
            budget: services.budget.clone(),
        }
    }

    /// Ensure an allocated target of exactly `width` x `height`, recreating
    /// it when the requested size changed. Render thread only.
    pub fn allocate(&self, gpu: &GpuContext, width: u32, height: u32) {
        self.idle.keep_alive();

        let mut state = self.state.lock().unwrap();
        if state.payload.is_some() && state.width == width && state.height == height {
            return;
        }

        if state.payload.take().is_some() {
            self.budget.add(-(state.allocation_size as i64));
            state.allocation_size = 0;
        }

        let texture = Texture::render_attachment(
            gpu.device(),
            width,
            height,
            wgpu::TextureUsages::COPY_SRC,
            Some(&self.key),
        );
        state.width = width;
        state.height = height;
        state.allocation_size = texture.size_bytes();
        state.payload = Some(Arc::new(texture));
        self.budget.add(state.allocation_size as i64);
    }

    /// The target, if currently allocated. Accessing it counts as a use for
    /// idle tracking.
    pub fn texture(&self) -> Option<Arc<Texture>> {
        self.idle.keep_alive();
        self.state.lock().unwrap().payload.clone()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn width(&self) -> u32 {
        self.state.lock().unwrap().width
    }

    pub fn height(&self) -> u32 {
        self.state.lock().unwrap().height
    }
}

impl AssetCore for RenderTargetAssetCore {
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
    }
}
