//! Measure Manager CLI
//!
//! Entry point for the `measure-manager` command-line tool.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use measure_manager::config::CONFIG_ENV;
use measure_manager::{bind, build_dispatcher, serve, EffectiveConfig, ServiceConfig};
use mm_server::RpcHandler;

#[derive(Parser)]
#[command(name = "measure-manager")]
#[command(about = "Caching service for building-energy measures and models", version)]
struct Cli {
    /// Path to config file (default: $MEASURE_MANAGER_CONFIG)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of config
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve requests over HTTP
    Serve {
        /// Port to listen on
        #[arg(long, short = 'p')]
        port: Option<u16>,

        /// Address to listen on
        #[arg(long)]
        host: Option<String>,
    },

    /// Handle one request envelope from stdin
    Rpc,

    /// Print the effective configuration
    ShowConfig,
}

fn main() {
    let cli = Cli::parse();

    let mut overrides = serde_json::Map::new();
    if let Commands::Serve { port, host } = &cli.command {
        if let Some(port) = port {
            overrides.insert("port".into(), (*port).into());
        }
        if let Some(host) = host {
            overrides.insert("host".into(), host.clone().into());
        }
    }
    if cli.debug {
        overrides.insert("log_level".into(), "debug".into());
    }

    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    let cli_layer = (!overrides.is_empty()).then(|| serde_json::Value::Object(overrides));

    let effective = match EffectiveConfig::build(config_path.as_deref(), cli_layer) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };
    let config = match effective.service_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };

    init_tracing(&config.log_level, cli.debug);

    match cli.command {
        Commands::Serve { .. } => run_serve(config),
        Commands::Rpc => run_rpc(&config),
        Commands::ShowConfig => match effective.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        },
    }
}

/// Log to stderr; `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str, debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
            .unwrap_or_else(|_| "info".into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_serve(config: ServiceConfig) {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start runtime");
            process::exit(1);
        }
    };

    let result = runtime.block_on(async {
        let listener = bind(&config.host, config.port)?;
        let dispatcher = Arc::new(build_dispatcher(&config));
        serve(listener, dispatcher, shutdown_signal()).await
    });

    if let Err(e) = result {
        error!(error = %e, "server error");
        process::exit(1);
    }
}

fn run_rpc(config: &ServiceConfig) {
    let handler = RpcHandler::new(build_dispatcher(config));
    if let Err(e) = handler.run() {
        error!(error = %e, "rpc failed");
        process::exit(1);
    }
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown requested");
}
