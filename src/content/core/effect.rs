use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::content::budget::BudgetTracker;
use crate::content::core::{AssetCore, CoreServices, IdleTracker};
use crate::gpu::GpuContext;

struct EffectState {
    module: Option<Arc<wgpu::ShaderModule>>,
    /// WGSL source length. The driver-side size of a compiled module is not
    /// observable, so the source length serves as the byte estimate.
    source_len: usize,
    failed: bool,
}

/// Owns one compiled shader module, identified by effect name and compiled
/// from a WGSL file on first use.
pub struct EffectAssetCore {
    name: String,
    path: PathBuf,
    state: Mutex<EffectState>,
    idle: IdleTracker,
    budget: BudgetTracker,
}

impl EffectAssetCore {
    pub(crate) fn new(name: impl Into<String>, path: PathBuf, services: &CoreServices) -> Self {
        Self {
            name: name.into(),
            path,
            state: Mutex::new(EffectState {
                module: None,
                source_len: 0,
                failed: false,
            }),
            idle: services.idle_tracker(),
            budget: services.budget.clone(),
        }
    }

    /// Read and compile the effect source. No-op when already allocated or in
    /// the sticky failed state. Render thread only.
    pub fn allocate(&self, gpu: &GpuContext) {
        self.idle.keep_alive();

        let mut state = self.state.lock().unwrap();
        if state.module.is_some() || state.failed {
            return;
        }

        let source = match std::fs::read_to_string(&self.path) {
            Ok(source) => source,
            Err(err) => {
                log::warn!(
                    "EffectAssetCore: cannot read effect '{}' from {:?}: {}",
                    self.name,
                    self.path,
                    err
                );
                state.failed = true;
                return;
            }
        };

        log::info!("Compiling effect: {}", self.name);
        let module = gpu
            .device()
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&self.name),
                source: wgpu::ShaderSource::Wgsl(source.as_str().into()),
            });

        state.source_len = source.len();
        state.module = Some(Arc::new(module));
        self.budget.add(state.source_len as i64);
    }

    /// The compiled module, if currently allocated. Accessing it counts as a
    /// use for idle tracking.
    pub fn module(&self) -> Option<Arc<wgpu::ShaderModule>> {
        self.idle.keep_alive();
        self.state.lock().unwrap().module.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn load_failed(&self) -> bool {
        self.state.lock().unwrap().failed
    }

    /// Allows compilation to be re-attempted after a failed load.
    pub fn clear_failed_state(&self) {
        self.state.lock().unwrap().failed = false;
    }
}

impl AssetCore for EffectAssetCore {
    fn is_allocated(&self) -> bool {
        self.state.lock().unwrap().module.is_some()
    }

    fn allocation_size(&self) -> usize {
        let state = self.state.lock().unwrap();
        if state.module.is_some() {
            state.source_len
        } else {
            0
        }
    }

    fn can_be_deleted(&self) -> bool {
        self.is_allocated() && self.idle.expired()
    }

    fn free(&self) {
        let mut state = self.state.lock().unwrap();
        if state.module.take().is_some() {
            self.budget.add(-(state.source_len as i64));
            state.source_len = 0;
        }
        state.failed = false;
    }
}
