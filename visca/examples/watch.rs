//! Connects to a camera and prints every status transition.
//!
//! ```sh
//! RUST_LOG=info cargo run --example watch -- 192.0.2.1:5678
//! ```

use clap::Parser;
use std::net::SocketAddr;
use tokio_stream::StreamExt;
use visca::{Camera, CameraConfig, OpContext};

#[derive(Parser)]
struct Cli {
    /// The camera's VISCA-over-TCP endpoint.
    addr: SocketAddr,

    /// VISCA device address of the camera.
    #[clap(long, default_value_t = 1)]
    device_id: u8,
}

#[tokio::main]
async fn main() -> visca::Result {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = CameraConfig::new(cli.addr);
    config.device_id = cli.device_id;

    let camera = Camera::new(config)?;
    let mut statuses = camera.status_stream();
    camera.connect(OpContext::unbounded()).await?;

    let zoom = camera.zoom(OpContext::unbounded()).await?;
    if let Some(zoom) = zoom.result {
        println!("zoom position: {zoom:.2}");
    }

    while let Some(status) = statuses.next().await {
        println!("{}: {status}", camera.name());
    }

    Ok(())
}
