use clap::{Parser, Subcommand};
use inference_scaling::config::AgentConfig;
use inference_scaling::scaling::LogSink;
use inference_scaling::ScalingAgent;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Inference scaling agent — per-model scaling statistics and events
#[derive(Parser)]
#[command(name = "inference-scaling", version, about)]
struct Cli {
    /// Path to configuration file (.hcl)
    #[arg(short, long, default_value = "agent.hcl")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scaling agent until Ctrl+C (default)
    Run,
    /// Validate a configuration file without starting the agent
    Validate,
}

#[tokio::main]
async fn main() -> inference_scaling::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Validate)) {
        return validate_config(&cli.config).await;
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    tracing::info!("Inference scaling agent v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = if std::path::Path::new(&cli.config).exists() {
        tracing::info!(config = cli.config, "Loading configuration");
        AgentConfig::from_file(&cli.config).await?
    } else {
        tracing::warn!("Config file not found, using defaults");
        AgentConfig::default()
    };

    let agent = ScalingAgent::new(config)?;
    agent.start(Arc::new(LogSink))?;

    tracing::info!("Scaling agent ready — press Ctrl+C to stop");

    agent.wait_for_shutdown().await;

    let snapshot = agent.metrics().snapshot();
    tracing::info!(metrics = %serde_json::to_string(&snapshot)?, "Final scaling metrics");

    Ok(())
}

/// Validate a configuration file and print diagnostics
async fn validate_config(path: &str) -> inference_scaling::Result<()> {
    use std::path::Path;

    if !Path::new(path).exists() {
        eprintln!("✗ Config file not found: {}", path);
        std::process::exit(1);
    }

    let config = match AgentConfig::from_file(path).await {
        Ok(c) => {
            println!("✓ Config parsed successfully ({})", path);
            c
        }
        Err(e) => {
            eprintln!("✗ Parse error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("✗ Validation error: {}", e);
        std::process::exit(1);
    }

    println!("✓ Configuration is valid");
    println!();
    println!(
        "  Analyser:  period {}s, buffer {}, send timeout {}ms",
        config.analyser.period_secs, config.analyser.event_buffer, config.analyser.send_timeout_ms
    );
    println!("  Rules:     {}", config.stats.len());
    for (name, rule) in &config.stats {
        println!(
            "    - {} {} {} → {}{}",
            name,
            rule.operator,
            rule.threshold,
            rule.event,
            if rule.reset { " (reset)" } else { "" }
        );
    }

    Ok(())
}
