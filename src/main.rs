//! envagent - environmental telemetry agent
//!
//! Samples the sensor board, keeps a credentialed MQTT session to the cloud
//! broker and publishes status and telemetry on the configured cadence.

use clap::{Parser, Subcommand};
use envagent::agent::Agent;
use envagent::auth::{jwt::Es256Signer, CredentialSigner};
use envagent::clock::{Clock, SystemClock};
use envagent::config::AgentConfig;
use envagent::error::{AgentError, AgentResult};
use envagent::observability::logging::init_logging_with_verbosity;
use envagent::sensor::SimulatedSensor;
use envagent::transport::mqtt::MqttClient;
use std::path::PathBuf;
use std::process;
use tokio::signal;
use tracing::{error, info};

/// Environmental telemetry agent
#[derive(Parser)]
#[command(name = "envagent")]
#[command(about = "Publishes environmental telemetry to a cloud MQTT broker")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "ENVAGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent
    Run,
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Sign one device token and print it
    Token,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging_with_verbosity(cli.verbose);

    info!("Starting envagent v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e.sanitized(), "Failed to load configuration");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_agent(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
        Commands::Token => print_token(&config),
    };

    if let Err(e) = result {
        error!(error = %e.sanitized(), "Command failed");
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn load_configuration(config_path: &Option<PathBuf>) -> AgentResult<AgentConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return Ok(AgentConfig::load_from_file(path)?);
    }

    for path_str in ["envagent.toml", "config/envagent.toml"] {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(AgentConfig::load_from_file(&path)?);
        }
    }

    Err(AgentError::internal_error(
        "No configuration file found. Provide one with -c/--config or create envagent.toml",
    ))
}

fn load_signer(config: &AgentConfig) -> AgentResult<Es256Signer> {
    let key_path = config.private_key_path();
    info!("Loading device key from: {}", key_path.display());
    Ok(Es256Signer::from_pem_file(&key_path)?)
}

async fn run_agent(config: AgentConfig) -> AgentResult<()> {
    info!(
        device_id = %config.device.device_id,
        broker = %config.mqtt.broker_url,
        "Application starting"
    );

    // Key and sensor failures are fatal before the loop starts
    let signer = load_signer(&config)?;
    let transport = MqttClient::new(&config.mqtt)?;
    let mut agent = Agent::from_config(
        &config,
        transport,
        signer,
        SystemClock::new(),
        SimulatedSensor::new(),
    )?;
    agent.initialize()?;

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .map_err(|e| AgentError::internal_error(format!("Failed to install SIGINT handler: {e}")))?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .map_err(|e| AgentError::internal_error(format!("Failed to install SIGTERM handler: {e}")))?;

    let outcome = tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
            Ok(())
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
            Ok(())
        }
        result = agent.run() => result,
    };

    agent.shutdown().await;
    outcome
}

fn handle_config_command(config: &AgentConfig, show: bool) -> AgentResult<()> {
    info!("Configuration is valid");
    info!(client_id = %config.identity().client_id(), "Device identity");

    if show {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| AgentError::internal_error(format!("Failed to render config: {e}")))?;
        println!("{rendered}");
    }

    Ok(())
}

fn print_token(config: &AgentConfig) -> AgentResult<()> {
    let signer = load_signer(config)?;
    let clock = SystemClock::new();
    let token = signer.sign(clock.now_epoch_seconds(), &config.identity())?;

    info!(
        issued_at = token.issued_at(),
        expires_at = token.expires_at(),
        "Token signed"
    );
    println!("{}", token.as_str());
    Ok(())
}
