//! Command line and configuration file handling
//!
//! The peer binary takes one required argument, the port to listen on,
//! and optionally `-c <config>` pointing to a file in the INI format:
//! ```ini
//! [peer]
//! host = localhost         ; Host announced in the peer identifier
//! bind_address = 0.0.0.0   ; Interface to listen on
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{anyhow, Context, Result};
use ini::ini;

use crate::chord::peer::PeerAddress;

pub const DEFAULT_HOST: &str = "localhost";
pub const PEER_USAGE: &str = "Usage: ring_peer <port> [-c <config>]";
pub const CLIENT_USAGE: &str = "Usage: ring_client <host> <port>";

/// Settings of one peer process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    /// Host part of the address the peer identifier is derived from
    pub host: String,
    /// Port to listen on for commands
    pub port: u16,
    /// Interface to listen on
    pub bind_address: IpAddr,
}

impl PeerConfig {
    pub fn new(port: u16) -> Self {
        PeerConfig {
            host: DEFAULT_HOST.to_owned(),
            port,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }

    /// Parses the arguments following the program name
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut port = None;
        let mut config_file = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" => {
                    config_file = Some(
                        args.next()
                            .ok_or_else(|| anyhow!("Missing path after -c\n{}", PEER_USAGE))?,
                    );
                }
                _ if port.is_none() => port = Some(parse_port(&arg)?),
                _ => return Err(anyhow!("Unexpected argument {}\n{}", arg, PEER_USAGE)),
            }
        }

        let port = port.ok_or_else(|| anyhow!("Missing port\n{}", PEER_USAGE))?;
        let mut config = PeerConfig::new(port);
        if let Some(path) = config_file {
            config.load_file(&path)?;
        }
        Ok(config)
    }

    /// Overrides the defaults with the `[peer]` section of an INI file
    pub fn load_file(&mut self, path: &str) -> Result<()> {
        let config =
            ini!(safe path).map_err(|e| anyhow!("Cannot read config file {}: {}", path, e))?;
        let Some(section) = config.get("peer") else {
            return Ok(());
        };
        if let Some(Some(host)) = section.get("host") {
            self.host = host.clone();
        }
        if let Some(Some(bind_address)) = section.get("bind_address") {
            self.bind_address = bind_address
                .parse()
                .with_context(|| format!("Invalid bind_address {}", bind_address))?;
        }
        Ok(())
    }

    /// Address announced to the ring, the peer identifier is its hash
    pub fn local_address(&self) -> PeerAddress {
        PeerAddress::new(self.host.clone(), self.port)
    }

    pub fn api_address(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

/// Settings of the interactive client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
}

impl ClientConfig {
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let args: Vec<String> = args.into_iter().collect();
        match args.as_slice() {
            [host, port] => Ok(ClientConfig {
                host: host.clone(),
                port: parse_port(port)?,
            }),
            _ => Err(anyhow!("{}", CLIENT_USAGE)),
        }
    }
}

fn parse_port(port: &str) -> Result<u16> {
    port.parse()
        .map_err(|_| anyhow!("Invalid port number: {}", port))
}
