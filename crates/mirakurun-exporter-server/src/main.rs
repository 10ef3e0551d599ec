use std::{process::ExitCode, sync::Arc, time::Duration};

use clap::{ArgAction, Parser, ValueEnum};
use mirakurun_client::{MirakurunApi, MirakurunClient};
use mirakurun_common::error::Result;
use mirakurun_exporter::{DEFAULT_METRICS_PATH, ExporterConfig, ExporterState, exporter_router};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "mirakurun_exporter",
    version,
    about = "Prometheus exporter for Mirakurun"
)]
struct Cli {
    /// Address on which to expose metrics and the landing page.
    #[arg(
        long = "web.listen-address",
        env = "MIRAKURUN_EXPORTER_LISTEN_ADDRESS",
        default_value = "0.0.0.0:9110"
    )]
    listen_address: String,

    /// Path under which to expose metrics.
    #[arg(
        long = "web.telemetry-path",
        env = "MIRAKURUN_EXPORTER_TELEMETRY_PATH",
        default_value = DEFAULT_METRICS_PATH
    )]
    telemetry_path: String,

    /// Base URL of the Mirakurun server, e.g. http://localhost:40772/
    #[arg(long = "exporter.mirakurun-url", env = "MIRAKURUN_URL")]
    mirakurun_url: String,

    #[arg(long = "exporter.status", default_value_t = true, action = ArgAction::Set)]
    status: bool,

    #[arg(long = "exporter.tuners", default_value_t = true, action = ArgAction::Set)]
    tuners: bool,

    #[arg(long = "exporter.programs", default_value_t = true, action = ArgAction::Set)]
    programs: bool,

    #[arg(long = "exporter.services", default_value_t = true, action = ArgAction::Set)]
    services: bool,

    /// Upstream request timeout in seconds.
    #[arg(long = "exporter.timeout")]
    timeout: Option<u64>,

    #[arg(long = "log.level", value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    #[arg(long = "log.format", value_enum, default_value_t = LogFormat::Logfmt)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Logfmt,
    Json,
}

impl Cli {
    fn exporter_config(&self) -> ExporterConfig {
        ExporterConfig {
            fetch_status: self.status,
            fetch_tuners: self.tuners,
            fetch_programs: self.programs,
            fetch_services: self.services,
        }
    }
}

fn init_logging(level: LogLevel, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    match format {
        LogFormat::Logfmt => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_format);

    run(cli).await
}

/// Serves until shutdown. A failure is logged once and mapped to a non-zero
/// exit code.
async fn run(cli: Cli) -> ExitCode {
    match serve(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "mirakurun exporter failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve(cli: Cli) -> Result<()> {
    let client = MirakurunClient::new(&cli.mirakurun_url, cli.timeout.map(Duration::from_secs))?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        mirakurun_url = %client.base_url(),
        "starting mirakurun exporter"
    );

    let config = cli.exporter_config();
    let client: Arc<dyn MirakurunApi> = Arc::new(client);
    let state = ExporterState::new(client, config, cli.telemetry_path)?;
    let metrics_path = state.metrics_path.clone();
    let app = exporter_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&cli.listen_address).await?;
    info!(
        address = %cli.listen_address,
        metrics_path = %metrics_path,
        "mirakurun exporter listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("mirakurun exporter stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use std::process::ExitCode;

    use clap::Parser;

    use super::{Cli, LogFormat, run};

    #[test]
    fn toggles_default_on_and_accept_values() {
        let cli = Cli::try_parse_from([
            "mirakurun_exporter",
            "--exporter.mirakurun-url",
            "http://localhost:40772/",
            "--exporter.programs=false",
        ])
        .unwrap();

        let config = cli.exporter_config();
        assert!(config.fetch_status);
        assert!(config.fetch_tuners);
        assert!(!config.fetch_programs);
        assert!(config.fetch_services);
        assert_eq!(cli.telemetry_path, "/metrics");
        assert_eq!(cli.listen_address, "0.0.0.0:9110");
        assert!(cli.timeout.is_none());
    }

    #[test]
    fn parses_logging_and_timeout_flags() {
        let cli = Cli::try_parse_from([
            "mirakurun_exporter",
            "--exporter.mirakurun-url=http://tuner:40772",
            "--exporter.timeout=5",
            "--log.level=debug",
            "--log.format=json",
            "--web.telemetry-path=/prometheus",
        ])
        .unwrap();

        assert_eq!(cli.timeout, Some(5));
        assert_eq!(cli.log_level.as_directive(), "debug");
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert_eq!(cli.telemetry_path, "/prometheus");
    }

    #[tokio::test]
    async fn invalid_upstream_url_exits_with_failure() {
        let cli = Cli::try_parse_from([
            "mirakurun_exporter",
            "--exporter.mirakurun-url=localhost:40772",
            "--web.listen-address=127.0.0.1:0",
        ])
        .unwrap();

        assert_eq!(run(cli).await, ExitCode::FAILURE);
    }

    #[test]
    fn rejects_unknown_log_level() {
        assert!(
            Cli::try_parse_from([
                "mirakurun_exporter",
                "--exporter.mirakurun-url=http://tuner:40772",
                "--log.level=verbose",
            ])
            .is_err()
        );
    }
}
