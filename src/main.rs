//! java-decompiler-mcp: MCP server that decompiles Java bytecode
//!
//! Serves the decompiler tools over stdio (default) or HTTP.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use java_decompiler_mcp::config;
use java_decompiler_mcp::decompiler::DecompilerService;
use java_decompiler_mcp::mcp::{http, McpServer};

/// MCP server that decompiles Java .class and .jar files.
///
/// Decompilation is performed by CFR, run with the local Java runtime.
#[derive(Parser, Debug)]
#[command(name = "java-decompiler-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Serve over HTTP instead of stdio (also enabled by MCP_USE_HTTP=true)
    #[arg(long)]
    http: bool,

    /// HTTP port (overrides PORT and the config file)
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Path to cfr.jar (overrides CFR_JAR and the config file)
    #[arg(long, value_name = "FILE")]
    cfr: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber. Logs go to stderr; stdout carries protocol frames.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Entry point for the java-decompiler-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let mut cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = config::apply_env_overrides(&mut cfg, env_var) {
        eprintln!("Configuration error: {e}");
        return ExitCode::FAILURE;
    }
    if let Some(port) = args.port {
        cfg.http.port = port;
    }

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    eprintln!("Java Decompiler MCP Server v{}", env!("CARGO_PKG_VERSION"));

    let cfr_jar = config::resolve_cfr_jar(args.cfr.as_deref(), &cfg.decompiler);
    if !cfr_jar.is_file() {
        tracing::warn!(
            cfr_jar = %cfr_jar.display(),
            "CFR jar not found; decompile requests will fail until it is installed"
        );
    }

    let service = Arc::new(DecompilerService::from_config(&cfg, cfr_jar));
    let use_http = args.http || config::http_requested(env_var);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create Tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = if use_http {
        let (host, port) = (cfg.http.host.clone(), cfg.http.port);
        eprintln!("Starting in HTTP mode on port {port}...");
        eprintln!("MCP endpoint: http://{host}:{port}/mcp");
        runtime.block_on(async {
            let shutdown = http::shutdown_signal()?;
            http::serve(service, &host, port, shutdown).await
        })
    } else {
        eprintln!("Starting in stdio mode...");
        info!("MCP server ready, waiting for client connection...");
        let mut server = McpServer::new(service);
        runtime.block_on(server.run())
    };

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
