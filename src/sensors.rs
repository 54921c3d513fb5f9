//! Host temperature sensors via sysinfo

use k65_keyboard::TemperatureSource;
use sysinfo::{Component, Components};
use tracing::{debug, warn};

const CPU_FALLBACKS: &[&str] = &["Tctl", "Package", "CPU", "coretemp"];
const GPU_FALLBACKS: &[&str] = &["amdgpu", "nouveau", "nvidia", "GPU"];

/// CPU and GPU sensors picked by label
pub struct SystemTemperatures {
    components: Vec<Component>,
    cpu: Option<usize>,
    gpu: Option<usize>,
}

impl SystemTemperatures {
    pub fn new(cpu_label: &str, gpu_label: &str) -> Self {
        let components: Vec<Component> = Components::new_with_refreshed_list().into();
        for c in &components {
            debug!("Temperature sensor: {}", c.label());
        }
        let cpu = find_sensor(&components, cpu_label, CPU_FALLBACKS);
        let gpu = find_sensor(&components, gpu_label, GPU_FALLBACKS);
        if cpu.is_none() {
            warn!("No CPU temperature sensor found");
        }
        if gpu.is_none() {
            warn!("No GPU temperature sensor found");
        }
        Self {
            components,
            cpu,
            gpu,
        }
    }
}

/// Exact label search first, then the fallbacks in order
fn find_sensor(components: &[Component], label: &str, fallbacks: &[&str]) -> Option<usize> {
    std::iter::once(label)
        .chain(fallbacks.iter().copied())
        .filter(|l| !l.is_empty())
        .find_map(|l| components.iter().position(|c| c.label().contains(l)))
}

impl SystemTemperatures {
    fn read(&mut self, index: Option<usize>) -> Option<f32> {
        let component = self.components.get_mut(index?)?;
        component.refresh();
        component.temperature().filter(|t| t.is_finite())
    }
}

impl TemperatureSource for SystemTemperatures {
    fn cpu_temp(&mut self) -> Option<f32> {
        self.read(self.cpu)
    }

    fn gpu_temp(&mut self) -> Option<f32> {
        self.read(self.gpu)
    }
}
