//! Temperature sampling boundary and cache

use parking_lot::RwLock;

/// CPU/GPU temperature provider
pub trait TemperatureSource: Send {
    /// Degrees Celsius, `None` when the sensor could not be read
    fn cpu_temp(&mut self) -> Option<f32>;
    fn gpu_temp(&mut self) -> Option<f32>;
}

/// Last sampled temperatures, shared between the sampler and the renderer
#[derive(Debug, Default)]
pub struct TemperatureCache {
    inner: RwLock<Temperatures>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Temperatures {
    pub cpu: f32,
    pub gpu: f32,
}

impl TemperatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Temperatures {
        *self.inner.read()
    }

    /// Refresh from a source; a failed read keeps the previous value
    pub fn sample(&self, source: &mut dyn TemperatureSource) {
        let cpu = source.cpu_temp();
        let gpu = source.gpu_temp();
        let mut t = self.inner.write();
        if let Some(cpu) = cpu {
            t.cpu = cpu;
        }
        if let Some(gpu) = gpu {
            t.gpu = gpu;
        }
    }
}
