//! Remote system statistics.

use serde::Serialize;
use tracing::warn;

use crate::manager::SessionManager;
use crate::transport::capture;
use crate::Result;

/// Combined diagnostic command: CPU from `top`, root disk from `df`,
/// memory from `free`.
pub const STATS_COMMAND: &str = "top -b -n 1 && df -BG / && free -m";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CpuStats {
    /// Busy percentage (user + system).
    pub usage: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageStats {
    pub total: f64,
    pub used: f64,
}

/// One reading of CPU, memory (MB) and root disk (GB).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SystemStats {
    pub cpu: CpuStats,
    pub memory: UsageStats,
    pub disk: UsageStats,
}

/// Leading numeric part of a field such as `29G` or `95.3`.
fn leading_number(field: &str) -> Option<f64> {
    let end = field
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(field.len());
    field[..end].parse().ok()
}

/// `%Cpu(s):  3.1 us,  1.6 sy, ...` gives user + system.
fn parse_cpu_line(line: &str) -> Option<f64> {
    let rest = line.split_once("%Cpu(s):")?.1;
    let mut fields = rest.split(',').map(str::trim);
    let user = fields.next()?.strip_suffix("us")?.trim();
    let system = fields.next()?.strip_suffix("sy")?.trim();
    Some(user.parse::<f64>().ok()? + system.parse::<f64>().ok()?)
}

/// Older `top` builds only report idle time: `... 95.3% idle`.
fn parse_idle_line(line: &str) -> Option<f64> {
    let before = line.split(" idle").next()?;
    let field = before.split_whitespace().last()?;
    let idle = leading_number(field.trim_start_matches(','))?;
    Some(100.0 - idle)
}

/// Parse the combined output of [`STATS_COMMAND`]. Unrecognized input
/// yields zeros.
pub fn parse_system_stats(raw: &str) -> SystemStats {
    let mut stats = SystemStats::default();

    for line in raw.lines() {
        let line = line.trim_end_matches('\r');

        if line.contains("%Cpu(s)") {
            if let Some(usage) = parse_cpu_line(line) {
                stats.cpu.usage = usage;
            }
        } else if line.contains("idle") && stats.cpu.usage == 0.0 {
            if let Some(usage) = parse_idle_line(line) {
                stats.cpu.usage = usage;
            }
        }

        if line.starts_with("Mem:") {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() > 2 {
                stats.memory.total = fields[1].parse().unwrap_or(0.0);
                stats.memory.used = fields[2].parse().unwrap_or(0.0);
            }
        }

        if line.ends_with(" /") {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() > 3 {
                stats.disk.total = leading_number(fields[1]).unwrap_or(0.0);
                stats.disk.used = leading_number(fields[2]).unwrap_or(0.0);
            }
        }
    }

    stats
}

impl SessionManager {
    /// Sample CPU, memory and disk usage on a one-shot channel.
    ///
    /// The interactive command channel is never used. A failed command
    /// yields zeros; only an unknown session is an error.
    pub async fn system_stats(&self, id: &str) -> Result<SystemStats> {
        let session = self.session(id)?;
        match capture(
            session.transport().as_ref(),
            STATS_COMMAND,
            self.options().probe_timeout,
        )
        .await
        {
            Ok(raw) => Ok(parse_system_stats(&raw)),
            Err(e) => {
                warn!(session = %id, error = %e, "System stats unavailable");
                Ok(SystemStats::default())
            }
        }
    }
}
