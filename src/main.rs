//! parleyd - a UDP voice conferencing daemon.
//!
//! Speaks a legacy binary protocol: clients log in over UDP, join a
//! two-level channel tree, trade compressed audio the server fans out to
//! co-channel listeners, and administer the server through a privilege
//! matrix persisted alongside channels and registrations.

mod config;
mod db;
mod error;
mod handlers;
mod network;
mod runtime;
mod state;

use crate::config::Config;
use crate::db::Database;
use std::sync::Once;
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");

struct CliArgs {
    config_path: String,
}

/// Parse `-c <file>`, `-v` and `-h`. Help and bad options exit non-zero.
fn parse_args() -> CliArgs {
    let mut args = std::env::args();
    let progname = args.next().unwrap_or_else(|| "parleyd".into());
    let mut config_path = "parleyd.toml".to_string();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" => match args.next() {
                Some(path) => config_path = path,
                None => {
                    eprintln!("Missing path after -c");
                    std::process::exit(1);
                }
            },
            "-v" => {
                println!("parleyd version {VERSION}");
                std::process::exit(0);
            }
            "-h" => {
                print_help(&progname);
                std::process::exit(1);
            }
            other => {
                eprintln!("Unknown option: {other}");
                print_help(&progname);
                std::process::exit(1);
            }
        }
    }
    CliArgs { config_path }
}

fn print_help(progname: &str) {
    println!("{progname}");
    println!("Usage:");
    println!(" -c <filename> filename of the config-file");
    println!(" -v show version");
    println!(" -h show this help");
}

/// Install the subscriber once; a reload cannot swap it, so level changes
/// need a restart.
fn init_tracing(config: &Config) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_filter()));
        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        match config.log.output.as_str() {
            "stderr" => builder.with_writer(std::io::stderr).init(),
            "stdout" => builder.with_writer(std::io::stdout).init(),
            path => match std::fs::OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => builder.with_writer(std::sync::Arc::new(file)).init(),
                Err(e) => {
                    eprintln!("cannot open log file {path}: {e}; logging to stderr");
                    builder.with_writer(std::io::stderr).init();
                }
            },
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args();

    // SIGUSR1 tears everything down and runs the boot sequence again with
    // a freshly read configuration; SIGINT leaves the loop.
    let mut reload = true;
    while reload {
        reload = false;

        let config = Config::load(&args.config_path)?;
        init_tracing(&config);
        info!(config = %args.config_path, version = VERSION, "starting parleyd");

        let db = Database::connect(&config.db.url()).await?;
        let servers = runtime::boot(&db).await?;
        for server in &servers {
            server.start();
        }
        info!(count = servers.len(), "servers running");

        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
        let mut sigusr1 =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::user_defined1())?;
        tokio::select! {
            _ = sigint.recv() => {
                info!("SIGINT received - clean exit");
            }
            _ = sigusr1.recv() => {
                info!("SIGUSR1 received - reloading configuration");
                reload = true;
            }
        }

        for server in &servers {
            server.stop().await;
        }
    }

    info!("all servers stopped, exiting");
    Ok(())
}
