use serde::Serialize;
use std::sync::Mutex;
use sysinfo::{Pid, RefreshKind, System};

#[derive(Debug, Clone, Serialize)]
pub struct MemoryStats {
    pub used_memory_mb: u64,
    pub total_memory_mb: u64,
    pub peak_memory_mb: u64,
    pub usage_percent: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemoryStatus {
    Ok,
    Warning,
    Critical,
}

/// 行程記憶體監控，供定期報告與 `/health/live` 使用
pub struct MemoryMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    peak_memory: Mutex<u64>,
    warning_threshold: f32,
    critical_threshold: f32,
}

impl MemoryMonitor {
    pub fn new(warning_threshold_percent: u8, critical_threshold_percent: u8) -> Self {
        let system = System::new_with_specifics(RefreshKind::everything());

        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!("Unable to resolve current PID, memory stats disabled: {}", e);
                None
            }
        };

        Self {
            system: Mutex::new(system),
            pid,
            peak_memory: Mutex::new(0),
            warning_threshold: f32::from(warning_threshold_percent),
            critical_threshold: f32::from(critical_threshold_percent),
        }
    }

    pub fn get_stats(&self) -> Option<MemoryStats> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_all();

        let process = system.process(pid)?;
        let used_memory_mb = process.memory() / 1024 / 1024;
        let total_memory_mb = system.total_memory() / 1024 / 1024;
        let usage_percent = if total_memory_mb > 0 {
            (used_memory_mb as f32 / total_memory_mb as f32) * 100.0
        } else {
            0.0
        };

        // 更新峰值記憶體
        let mut peak = self.peak_memory.lock().ok()?;
        if used_memory_mb > *peak {
            *peak = used_memory_mb;
        }

        Some(MemoryStats {
            used_memory_mb,
            total_memory_mb,
            peak_memory_mb: *peak,
            usage_percent,
        })
    }

    pub fn classify(&self, usage_percent: f32) -> MemoryStatus {
        if usage_percent >= self.critical_threshold {
            MemoryStatus::Critical
        } else if usage_percent >= self.warning_threshold {
            MemoryStatus::Warning
        } else {
            MemoryStatus::Ok
        }
    }

    pub fn log_report(&self) {
        let Some(stats) = self.get_stats() else {
            tracing::debug!("Memory stats unavailable");
            return;
        };

        match self.classify(stats.usage_percent) {
            MemoryStatus::Critical => tracing::error!(
                "🚨 CRITICAL: Memory usage at {:.1}% ({}/{} MB, peak {} MB)",
                stats.usage_percent,
                stats.used_memory_mb,
                stats.total_memory_mb,
                stats.peak_memory_mb
            ),
            MemoryStatus::Warning => tracing::warn!(
                "⚠️ WARNING: Memory usage at {:.1}% ({}/{} MB, peak {} MB)",
                stats.usage_percent,
                stats.used_memory_mb,
                stats.total_memory_mb,
                stats.peak_memory_mb
            ),
            MemoryStatus::Ok => tracing::info!(
                "📊 Memory: {} MB / {} MB ({:.1}% used), peak {} MB",
                stats.used_memory_mb,
                stats.total_memory_mb,
                stats.usage_percent,
                stats.peak_memory_mb
            ),
        }
    }
}

impl Default for MemoryMonitor {
    fn default() -> Self {
        Self::new(80, 90)
    }
}
