//! Daemon entry point for the tabular MCP server.
//!
//! Loads configuration from the command line and environment, reads every
//! delimited file in the data directory, builds the selected backend, and
//! serves the MCP protocol over stdio, streamable HTTP, or both.

mod backend;
mod config;

use std::error::Error;
use std::io;
use std::sync::Arc;

use tabular_core::{Loader, MemoryBackend, Selection, SurrealBackend, TableBackend};
use tabular_mcp::server::{McpHttpServerConfig, serve_stdio, serve_streamable_http};
use tracing::info;

use crate::backend::connect_store;
use crate::config::{BackendChoice, TabularConfig};

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = TabularConfig::from_args()?;
    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter()?)
        .with_writer(io::stderr)
        .try_init()?;

    let selection = Selection::load(&config.selection_file)?;
    let output = Loader::new(&config.data_dir)
        .with_selection(selection)
        .load()?;
    info!(
        "loaded {} table(s) from {}",
        output.tables.len(),
        config.data_dir.display()
    );

    match config.backend {
        BackendChoice::Memory => serve(Arc::new(MemoryBackend::new(output)), &config).await,
        BackendChoice::Surreal => {
            let store = connect_store(&config).await?;
            let backend = SurrealBackend::load(store, output).await?;
            serve(Arc::new(backend), &config).await
        }
    }
}

async fn serve<B: TableBackend>(backend: Arc<B>, config: &TabularConfig) -> Result<(), BoxError> {
    info!("serving with the {} backend", backend.kind());
    let http = config.mcp_serve.then(|| {
        let http_config = McpHttpServerConfig::new(config.mcp_http_addr);
        tokio::spawn(serve_streamable_http(backend.clone(), http_config))
    });

    if config.enable_stdio {
        let served = serve_stdio(backend).await;
        // The client closing stdio ends the session, HTTP included.
        if let Some(handle) = http {
            handle.abort();
        }
        return served;
    }

    match http {
        Some(handle) => handle.await?,
        None => Ok(()),
    }
}
