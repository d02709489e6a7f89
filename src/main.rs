use std::env;

use anyhow::Result;
use env_logger::Env;
use log::info;

use chord_ring::config::PeerConfig;
use chord_ring::RingPeer;

async fn run() -> Result<()> {
    let config = PeerConfig::from_args(env::args().skip(1))?;
    let peer = RingPeer::new(&config).await?;
    let view = peer.chord().display();
    info!(
        "Peer {} started on port {} with id {}",
        config.local_address(),
        config.port,
        view.id
    );

    tokio::signal::ctrl_c().await?;
    peer.initiate_shutdown();
    peer.await_termination().await
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(e) = run().await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
