//! # bom-sync CLI Interface (Module)
//!
//! Command parsing and orchestration for the `bom-sync` binary. All pipeline
//! logic lives in `bom-sync-core`; this module wires the environment, the
//! Smartsheet and blob clients, and the HTTP trigger together.
//!
//! ## Commands
//! - `serve`: run as an Azure Functions custom handler (the deployed mode)
//! - `sync`: perform one run from the shell and exit
//!
//! For programmatic or test use, call [`run`] with a constructed [`Cli`].

use crate::blob::AzureBlobClient;
use crate::load_config::load_config;
use crate::smartsheet::SmartsheetClient;
use crate::trigger::{run_once, serve, TriggerState, SUCCESS_MESSAGE};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

/// CLI for bom-sync: publish Smartsheet BOM attachments as one CSV blob.
#[derive(Parser)]
#[clap(
    name = "bom-sync",
    version,
    about = "Combine Smartsheet BOM workbook attachments into Latest_BOMS.csv in Azure Blob Storage"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP trigger for the Azure Functions host
    Serve {
        /// Port to listen on
        #[clap(long, env = "FUNCTIONS_CUSTOMHANDLER_PORT", default_value_t = 3000)]
        port: u16,
        /// Address to bind
        #[clap(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        host: IpAddr,
    },
    /// Run the pipeline once and exit
    Sync,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let config = Arc::new(load_config());
    let state = TriggerState {
        sheets: Arc::new(SmartsheetClient::from_config(&config)),
        uploader: Arc::new(AzureBlobClient::from_config(&config)),
        config,
    };

    match cli.command {
        Commands::Serve { port, host } => {
            tracing::info!(command = "serve", port, "Starting HTTP trigger");
            serve(SocketAddr::new(host, port), state).await
        }
        Commands::Sync => {
            tracing::info!(command = "sync", "Starting synchronisation process");
            match run_once(&state.config, state.sheets.as_ref(), state.uploader.as_ref()).await {
                Ok(report) => {
                    tracing::info!(command = "sync", ?report, "Synchronisation complete");
                    println!("{SUCCESS_MESSAGE}");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}
