//! This repository showcases a single-ring, consistent hashing file placement scheme,
//! a simplified [Chord](https://en.wikipedia.org/wiki/Chord_(peer-to-peer)) overlay.
//!
//! Every peer process owns a ring.
//! Peers and filenames are hashed onto the same 32 bit identifier circle,
//! and a filename is stored on the ring member whose range `(predecessor, member]` covers its hash.
//!
//! # Architecture:
//! - [`chord`]: ring membership, successor lookup and the per-peer file maps
//! - [`api_communication`]: the line based command protocol and the server accepting connections
//! - [`client`]: a client for the command protocol, used by the `ring_client` binary
//! - [`config`]: command line and configuration file handling
//!
//! # Main executables:
//! `ring_peer <port> [-c <config>]` starts a peer listening on `<port>` on all interfaces.
//! The optional configuration file is expected to be in the INI format:
//! ```ini
//! [peer]
//! host = localhost         ; Host announced in the peer identifier
//! bind_address = 0.0.0.0   ; Interface to listen on
//! ```
//!
//! `ring_client <host> <port>` connects to a peer and offers an interactive menu
//! to store and retrieve filenames.
//!
//! To run a peer and a client, you may use:
//! ```bash
//! cargo run --release --bin ring_peer -- 9000
//! cargo run --release --bin ring_client -- localhost 9000
//! ```
//! We support different levels of logging, with the default being `info`.
//! You can change the log level by setting the `RUST_LOG` environment variable to one of the following values:
//! - `error`
//! - `warn`
//! - `info`
//! - `debug`
//! - `trace`
//!
//! ## Testing:
//! ```bash
//! cargo test --release
//! ```
//! The end-to-end tests bind loopback ports starting at 47000.

use std::net::SocketAddr;

use anyhow::Result;
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::chord::Chord;
use crate::config::PeerConfig;

pub mod api_communication;
pub mod chord;
pub mod client;
pub mod config;
#[cfg(test)]
mod testing;

/// A running peer: its ring and the server answering commands for it
pub struct RingPeer {
    pub(crate) chord: Chord,
    pub(crate) api_address: SocketAddr,
    cancellation_token: CancellationToken,
    server_thread: JoinHandle<()>,
}

impl RingPeer {
    /// Creates a ring of one for the configured address and starts accepting commands
    ///
    /// Fails if the command socket cannot be bound.
    pub async fn new(config: &PeerConfig) -> Result<Self> {
        let chord = Chord::new(config.local_address());
        let cancellation_token = CancellationToken::new();
        let (server_thread, api_address) = api_communication::start_api_server(
            chord.clone(),
            config.api_address(),
            cancellation_token.clone(),
        )
        .await?;
        Ok(RingPeer {
            chord,
            api_address,
            cancellation_token,
            server_thread,
        })
    }

    pub fn chord(&self) -> &Chord {
        &self.chord
    }

    /// Address the command socket is bound to
    pub fn api_address(&self) -> SocketAddr {
        self.api_address
    }

    /// Stops accepting new connections
    pub fn initiate_shutdown(&self) {
        info!("{}: Initiating shutdown", self.api_address);
        self.cancellation_token.cancel();
    }

    /// Waits until the accept loop has finished
    pub async fn await_termination(self) -> Result<()> {
        self.server_thread.await?;
        info!("{}: Server terminated", self.api_address);
        Ok(())
    }
}
