use clap::{Parser, Subcommand};
use pulse_config::ConfigLoader;
use pulse_probe::SimulatedProbe;
use pulse_server::Orchestrator;
use pulse_types::RunKind;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "PULSE web endpoint monitoring platform", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "pulse.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the orchestrator and run until interrupted
    Start,
    /// Run one monitoring cycle now
    Monitor {
        /// Monitoring kind: quick | comprehensive | deep
        #[arg(default_value = "comprehensive")]
        kind: String,
    },
    /// Print configuration summary
    Status,
    /// Validate the configuration file
    Validate,
}

fn parse_kind(kind: &str) -> anyhow::Result<RunKind> {
    match kind {
        "quick" => Ok(RunKind::Quick),
        "comprehensive" => Ok(RunKind::Comprehensive),
        "deep" => Ok(RunKind::Deep),
        other => anyhow::bail!("Unknown monitoring kind: {}", other),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let loader = ConfigLoader::new(&args.config);

    match args.command {
        Command::Start => {
            // 配置错误在启动期即致命
            let config = loader.load_validated()?;
            tracing::info!(config = %args.config, "Starting PULSE orchestrator");

            let orchestrator =
                Arc::new(Orchestrator::new(config, Arc::new(SimulatedProbe::default()))?);
            orchestrator.start().await;

            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutdown signal received");
            orchestrator.stop().await;
        }
        Command::Monitor { kind } => {
            let config = loader.load_validated()?;
            let orchestrator =
                Arc::new(Orchestrator::new(config, Arc::new(SimulatedProbe::default()))?);

            let run = orchestrator.run_now(parse_kind(&kind)?).await?;
            let summary = run.summary();

            println!("Session {} ({})", run.session_id, kind);
            println!(
                "  targets: {} total, {} successful, {} healthy",
                summary.total_targets, summary.successful_targets, summary.healthy_targets
            );
            println!(
                "  avg health: {:.1}, avg load time: {:.0}ms",
                summary.avg_health, summary.avg_load_time_ms
            );

            let alerts = orchestrator.status().await.alerts;
            println!(
                "  alerts: {} ({} critical, {} warning, {} info)",
                alerts.total, alerts.critical, alerts.warning, alerts.info
            );
        }
        Command::Status => {
            let config = loader.load()?;
            let summary = config.summary();

            println!(
                "Targets: {} total, {} enabled",
                summary.total_targets, summary.enabled_targets
            );
            for (environment, count) in &summary.by_environment {
                println!("  {}: {}", environment, count);
            }
            println!(
                "Schedules: quick={} comprehensive={} deep={}",
                config.schedules.quick.enabled,
                config.schedules.comprehensive.enabled,
                config.schedules.deep.enabled
            );
            println!(
                "Maintenance windows: {}",
                config.maintenance.windows.join(", ")
            );
        }
        Command::Validate => {
            loader.load_validated()?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}
