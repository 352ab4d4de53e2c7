//! Listener orchestration -- assembly, lifecycle and signal handling.
//!
//! The [`Orchestrator`] owns the validated configuration and the
//! [`SyslogListener`]. It installs the metrics recorder, starts the
//! listener, logs a health report on a fixed interval and performs a
//! graceful drain when a shutdown signal arrives.
//!
//! # Shutdown Order
//!
//! 1. Stop receiving (socket closed, receive loop cancelled)
//! 2. Drain queued deliveries for up to `sink.drain_grace_secs`
//! 3. Log final counters

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;

use syslog_relay_core::config::RelayConfig;
use syslog_relay_core::metrics as m;
use syslog_relay_core::pipeline::Pipeline;
use syslog_relay_pipeline::{PipelineConfig, SyslogListener, SyslogListenerBuilder};

use crate::health::DaemonHealth;
use crate::metrics_server;

/// Interval between periodic health reports.
const STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// The daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: RelayConfig,
    /// The syslog listener.
    listener: SyslogListener,
    /// Orchestrator build time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration from a file (plus env overrides) and build.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or is invalid.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = RelayConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// No socket is bound here; that happens in [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails, the metrics recorder cannot
    /// be installed, or the listener configuration is rejected.
    pub async fn build_from_config(config: RelayConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            record_build_info();
        }

        let pipeline_config = PipelineConfig::from_core(&config)
            .map_err(|e| anyhow::anyhow!("invalid listener config: {}", e))?;

        let listener = SyslogListenerBuilder::new()
            .config(pipeline_config)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build syslog listener: {}", e))?;

        tracing::debug!("orchestrator initialized");

        Ok(Self {
            config,
            listener,
            start_time: Instant::now(),
        })
    }

    /// Start the listener and block until SIGTERM or SIGINT, then drain.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to start (rules, sink, or
    /// bind) or signal handlers cannot be installed.
    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;
        self.serve_until(wait_for_shutdown_signal()).await
    }

    /// Start the listener (compile rules, build the sink, bind the socket).
    ///
    /// # Errors
    ///
    /// Any startup failure is returned; the listener ends up stopped.
    pub async fn start(&mut self) -> Result<()> {
        self.listener
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start syslog listener: {}", e))?;

        tracing::info!(
            addr = ?self.listener.local_addr(),
            rules = self.listener.rule_count(),
            sink_enabled = self.config.sink.enabled,
            "syslog-relay running"
        );
        Ok(())
    }

    /// Serve until `shutdown` resolves, logging health every
    /// [`STATUS_INTERVAL`], then stop and drain the listener.
    ///
    /// `shutdown` yields a short label for the shutdown cause.
    ///
    /// # Errors
    ///
    /// Returns an error if `shutdown` fails or the listener cannot stop.
    pub async fn serve_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = Result<&'static str>>,
    {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(STATUS_INTERVAL);
        // first tick completes immediately
        ticker.tick().await;

        let cause = loop {
            tokio::select! {
                cause = &mut shutdown => break cause,
                _ = ticker.tick() => self.health().await.log(),
            }
        };

        match &cause {
            Ok(reason) => tracing::info!(reason = *reason, "shutdown requested"),
            Err(e) => tracing::error!(error = %e, "shutdown trigger failed, stopping"),
        }

        self.shutdown().await?;
        cause.map(|_| ())
    }

    /// Stop receiving and drain queued deliveries.
    async fn shutdown(&mut self) -> Result<()> {
        self.listener
            .stop()
            .await
            .map_err(|e| anyhow::anyhow!("failed to stop syslog listener: {}", e))
    }

    /// Current health report.
    pub async fn health(&self) -> DaemonHealth {
        let status = self.listener.health_check().await;
        let uptime_secs = self.start_time.elapsed().as_secs();

        if self.config.metrics.enabled {
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
        }

        DaemonHealth {
            status,
            uptime_secs,
            listener_state: self.listener.state().to_string(),
            stats: self.listener.stats(),
        }
    }

    /// Address the listener is bound to (after [`start`](Self::start)).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    /// Loaded configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

fn record_build_info() {
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}
