//! wharfd - Entry Point
//!
//! Control plane daemon for a self-hosted deployment host. Owns the
//! deployment registry and keeps the edge engine's route table in sync.

use std::collections::HashMap;
use std::env;
use std::net::IpAddr;

use wharfd::app::options::AppOptions;
use wharfd::app::run::run;
use wharfd::logs::{init_logging, LogOptions};
use wharfd::storage::layout::StorageLayout;
use wharfd::storage::settings::Settings;
use wharfd::utils::version_info;
use wharfd::workers::keyset_refresh;

use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        println!("{}", serde_json::to_string_pretty(&version).unwrap());
        return;
    }

    // Resolve the storage layout, optionally overridden on the CLI
    let layout = match cli_args.get("storage") {
        Some(dir) => StorageLayout::new(dir.clone()),
        None => StorageLayout::default(),
    };

    // Retrieve the settings file; defaults apply when it does not exist
    let settings_file = layout.settings_file();
    let settings = if settings_file.exists().await {
        match settings_file.read_json::<Settings>().await {
            Ok(settings) => settings,
            Err(e) => {
                error!("Unable to read settings file: {}", e);
                return;
            }
        }
    } else {
        Settings::default()
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    // Trusted peers must resolve to addresses before the chain can use them
    let mut trusted_peers: Vec<IpAddr> = Vec::new();
    for peer in &settings.trusted_peers {
        match peer.parse() {
            Ok(addr) => trusted_peers.push(addr),
            Err(_) => warn!("Ignoring unparseable trusted peer '{}'", peer),
        }
    }

    let layout = match &settings.storage_dir {
        Some(dir) => StorageLayout::new(dir.clone()),
        None => layout,
    };

    let options = AppOptions {
        server: settings.server.clone(),
        edge: settings.edge.clone(),
        federated: settings.federated.clone(),
        layout,
        trusted_peers,
        keyset_worker: keyset_refresh::Options {
            refresh_interval: std::time::Duration::from_secs(settings.federated.keys_refresh_secs),
        },
        ..Default::default()
    };

    info!("Running wharfd with options: {:?}", options);
    let result = run(options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run wharfd: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).unwrap();
        let mut sigint = signal(SignalKind::interrupt()).unwrap();

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
