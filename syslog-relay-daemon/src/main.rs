use anyhow::Result;
use clap::Parser;

use syslog_relay_daemon::cli::DaemonCli;
use syslog_relay_daemon::logging;
use syslog_relay_daemon::orchestrator::Orchestrator;
use syslog_relay_pipeline::{EventClassifier, PipelineConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let (config, rejected_env) = cli.load_config().await?;

    logging::init_tracing(&config.general)?;

    for rejected in &rejected_env {
        tracing::warn!(
            env_key = %rejected.key,
            value = %rejected.value,
            expected = rejected.expected,
            "failed to parse env var, ignoring"
        );
    }

    if cli.validate {
        // a value that was silently dropped is a config error here
        if let Some(first) = rejected_env.first() {
            anyhow::bail!(
                "{} environment variable(s) could not be parsed, first: {}",
                rejected_env.len(),
                first
            );
        }

        let pipeline_config = PipelineConfig::from_core(&config)?;
        let classifier = EventClassifier::load(&pipeline_config).await?;
        println!(
            "configuration OK: {} active rule(s), {} disabled, sink {}",
            classifier.rule_count(),
            classifier.disabled_count(),
            if config.sink.enabled { "enabled" } else { "disabled" },
        );
        return Ok(());
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "syslog-relay-daemon starting");

    let mut orchestrator = Orchestrator::build_from_config(config).await?;
    orchestrator.run().await?;

    tracing::info!("syslog-relay-daemon stopped");
    Ok(())
}
