//! Health reporting.
//!
//! The orchestrator periodically builds a [`DaemonHealth`] from the
//! listener's `health_check()` and its counters, and logs it. Degraded and
//! unhealthy reports are logged at `warn`.

use serde::Serialize;

use syslog_relay_core::pipeline::HealthStatus;
use syslog_relay_pipeline::StatsSnapshot;

/// Point-in-time health report for the daemon.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Listener health status.
    pub status: HealthStatus,
    /// Daemon uptime in seconds since the orchestrator was built.
    pub uptime_secs: u64,
    /// Listener lifecycle state (`running`, `stopped`, ...).
    pub listener_state: String,
    /// Listener counters.
    pub stats: StatsSnapshot,
}

impl DaemonHealth {
    /// Emit this report as a structured log line.
    pub fn log(&self) {
        let s = &self.stats;
        if self.status.is_healthy() {
            tracing::info!(
                status = %self.status,
                uptime_secs = self.uptime_secs,
                received = s.received,
                matched = s.matched,
                delivered = s.delivered,
                in_flight = s.in_flight(),
                "relay status"
            );
        } else {
            tracing::warn!(
                status = %self.status,
                state = %self.listener_state,
                uptime_secs = self.uptime_secs,
                received = s.received,
                matched = s.matched,
                delivery_failures = s.delivery_failures,
                queue_full = s.queue_full,
                "relay status"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_status_and_counters() {
        let health = DaemonHealth {
            status: HealthStatus::Degraded("sink queue full".to_owned()),
            uptime_secs: 42,
            listener_state: "running".to_owned(),
            stats: StatsSnapshot::default(),
        };

        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["uptime_secs"], 42);
        assert_eq!(json["listener_state"], "running");
        assert_eq!(json["stats"]["received"], 0);
        assert!(json["status"].to_string().contains("sink queue full"));
    }
}
