//! Maquinas Service Entry Point
//!
//! Initializes configuration, storage, and services, then starts the HTTP server.

use maquinas_service::run;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run().await
}
