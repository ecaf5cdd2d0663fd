//! Binary crate for the `seaway` HTTP server.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and resolving configuration
//! - Logging setup
//! - Routing, CORS and JSON responses

use clap::Parser;

mod cli;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
