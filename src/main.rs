use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::io::BufReader;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tollgate::config::TollgateConfig;
use tollgate::gate::GateServer;
use tollgate::ratelimit::Limiters;
use tollgate::validation::{
    auth_rules, sanitize_input, validate_audio_params, validate_email, validate_form,
    validate_url, AudioFile, AudioParams, AuthMode, FormData,
};

#[derive(Debug, Parser)]
#[command(name = "tollgate", version, about = "Upload and auth attempt gatekeeping")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormMode {
    Login,
    Signup,
}

impl From<FormMode> for AuthMode {
    fn from(mode: FormMode) -> Self {
        match mode {
            FormMode::Login => AuthMode::Login,
            FormMode::Signup => AuthMode::Signup,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate an audio file before upload
    CheckFile {
        #[arg(long)]
        name: String,
        /// Size in bytes
        #[arg(long)]
        size: u64,
        #[arg(long, default_value = "")]
        mime_type: String,
    },
    /// Validate pitch/tempo/volume settings
    CheckParams {
        #[arg(long, allow_hyphen_values = true)]
        pitch: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        tempo: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        volume: Option<f64>,
    },
    /// Validate a login or sign-up form given as a JSON object
    CheckForm {
        #[arg(long, value_enum)]
        mode: FormMode,
        #[arg(long)]
        data: String,
    },
    /// Check an email address shape
    CheckEmail { email: String },
    /// Check that a string parses as an absolute URL
    CheckUrl { url: String },
    /// Strip markup characters and cap the length
    Sanitize { input: String },
    /// Answer newline-delimited JSON rate limit requests on stdin
    Gate,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = TollgateConfig::load(cli.config.as_deref())?;

    let passed = match cli.command {
        Command::CheckFile {
            name,
            size,
            mime_type,
        } => {
            let result = config.uploads.validate(&AudioFile::new(name, size, mime_type));
            print_json(&result)?;
            result.is_valid()
        }
        Command::CheckParams {
            pitch,
            tempo,
            volume,
        } => {
            let result = validate_audio_params(&AudioParams {
                pitch,
                tempo,
                volume,
            });
            print_json(&result)?;
            result.is_valid()
        }
        Command::CheckForm { mode, data } => {
            let data: FormData = serde_json::from_str(&data)?;
            let password = data
                .get("password")
                .map(|v| v.to_text())
                .unwrap_or_default();
            let result = validate_form(&data, &auth_rules(mode.into(), &password));
            print_json(&result)?;
            result.is_valid()
        }
        Command::CheckEmail { email } => {
            let valid = validate_email(&email);
            print_json(&serde_json::json!({ "is_valid": valid }))?;
            valid
        }
        Command::CheckUrl { url } => {
            let valid = validate_url(&url);
            print_json(&serde_json::json!({ "is_valid": valid }))?;
            valid
        }
        Command::Sanitize { input } => {
            println!("{}", sanitize_input(&input));
            true
        }
        Command::Gate => {
            run_gate(&config).await?;
            true
        }
    };

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_gate(config: &TollgateConfig) -> anyhow::Result<()> {
    info!("Starting Tollgate gate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let limiters = Limiters::from_config(&config.rate_limiting)?;
    let server = GateServer::new(limiters).with_sweep_interval(
        config
            .rate_limiting
            .sweep_interval_secs
            .map(Duration::from_secs),
    );

    let stats = server
        .serve_with_shutdown(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            shutdown_signal(),
        )
        .await?;

    info!(requests = stats.requests, "Tollgate gate stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
