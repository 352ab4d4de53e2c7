//! CLI argument definitions for syslog-relay-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.
//! Every override flag takes precedence over both the config file and
//! `SYSLOG_RELAY_*` environment variables.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use syslog_relay_core::config::{RejectedEnvVar, RelayConfig};

/// UDP syslog relay.
///
/// Receives syslog datagrams, classifies each line against a set of
/// regular-expression rules and forwards matched events to a sink.
#[derive(Parser, Debug, Default)]
#[command(name = "syslog-relay-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to a syslog-relay.toml configuration file.
    ///
    /// Optional: without it, built-in defaults plus environment
    /// variables and flags are used.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the IP address to bind the UDP listener to.
    #[arg(long)]
    pub listen_ip: Option<String>,

    /// Override the UDP port to listen on.
    #[arg(short = 'p', long)]
    pub listen_port: Option<u16>,

    /// Match pattern (repeatable). Replaces the configured pattern list.
    #[arg(long = "pattern", value_name = "REGEX")]
    pub patterns: Vec<String>,

    /// Directory of YAML rule files.
    #[arg(long)]
    pub rule_dir: Option<PathBuf>,

    /// Override the webhook URL matched events are posted to.
    #[arg(long)]
    pub sink_url: Option<String>,

    /// Enable or disable event delivery (true/false).
    #[arg(long)]
    pub sink_enabled: Option<bool>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and rules, then exit without listening.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Build the effective configuration: file (if any), then environment,
    /// then command-line flags, then validation.
    ///
    /// Environment variables whose values could not be parsed are left out
    /// of the config and returned alongside it. Tracing is not initialized
    /// yet at this point, so the caller logs them.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// merged configuration is invalid.
    pub async fn load_config(&self) -> Result<(RelayConfig, Vec<RejectedEnvVar>)> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::from_file(path).await.map_err(|e| {
                anyhow::anyhow!("failed to load config {}: {}", path.display(), e)
            })?,
            None => RelayConfig::default(),
        };

        let rejected = config.apply_env_overrides();
        self.apply_overrides(&mut config);

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        Ok((config, rejected))
    }

    /// Apply command-line overrides on top of an already-loaded config.
    pub fn apply_overrides(&self, config: &mut RelayConfig) {
        if let Some(ip) = &self.listen_ip {
            config.listener.listen_ip.clone_from(ip);
        }
        if let Some(port) = self.listen_port {
            config.listener.listen_port = port;
        }
        if !self.patterns.is_empty() {
            config.rules.patterns.clone_from(&self.patterns);
        }
        if let Some(dir) = &self.rule_dir {
            config.rules.rule_dir = dir.display().to_string();
        }
        if let Some(url) = &self.sink_url {
            config.sink.url.clone_from(url);
        }
        if let Some(enabled) = self.sink_enabled {
            config.sink.enabled = enabled;
        }
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
    }
}
