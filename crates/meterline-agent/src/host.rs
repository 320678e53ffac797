//! Host resource gauges (CPU load and memory utilization).

use std::sync::Mutex;

use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

/// Point-in-time host readings, both as ratios in `[0, ∞)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HostSample {
    /// One-minute load average divided by core count.
    pub cpu_ratio: f64,
    /// Used memory over total memory.
    pub memory_ratio: f64,
}

pub trait HostSampler: Send + Sync {
    fn sample(&self) -> HostSample;
}

/// Reads the running host through `sysinfo`.
pub struct SysinfoSampler {
    sys: Mutex<System>,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );
        Self {
            sys: Mutex::new(sys),
        }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSampler for SysinfoSampler {
    fn sample(&self) -> HostSample {
        let mut sys = self.sys.lock().unwrap_or_else(|e| e.into_inner());
        sys.refresh_cpu_all();
        sys.refresh_memory();

        let cores = sys.cpus().len().max(1) as f64;
        let load = System::load_average().one;
        // No load average on this platform: fall back to instantaneous usage.
        let cpu_ratio = if load > 0.0 {
            load / cores
        } else {
            f64::from(sys.global_cpu_usage()) / 100.0
        };

        let total = sys.total_memory() as f64;
        let memory_ratio = if total > 0.0 {
            sys.used_memory() as f64 / total
        } else {
            0.0
        };

        HostSample {
            cpu_ratio: sanitize(cpu_ratio),
            memory_ratio: sanitize(memory_ratio),
        }
    }
}

/// Constant readings; useful where the host must not leak into results.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSampler(pub HostSample);

impl HostSampler for FixedSampler {
    fn sample(&self) -> HostSample {
        self.0
    }
}

fn sanitize(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sysinfo_sample_is_finite_and_non_negative() {
        let s = SysinfoSampler::new().sample();
        assert!(s.cpu_ratio.is_finite() && s.cpu_ratio >= 0.0);
        assert!(s.memory_ratio.is_finite() && s.memory_ratio >= 0.0);
        assert!(s.memory_ratio <= 1.0);
    }

    #[test]
    fn fixed_sampler_returns_its_value() {
        let want = HostSample {
            cpu_ratio: 0.5,
            memory_ratio: 0.25,
        };
        assert_eq!(FixedSampler(want).sample(), want);
    }
}
