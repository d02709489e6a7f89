use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use log::info;
use parking_lot::Mutex;

use crate::chord::identifier::{hash_identifier, Identifier};

/// Host and port under which a peer listens for commands
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    pub host: String,
    pub port: u16,
}

impl PeerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        PeerAddress {
            host: host.into(),
            port,
        }
    }

    /// Position of a peer listening on this address
    pub fn identifier(&self) -> Identifier {
        hash_identifier(&self.to_string())
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for PeerAddress {
    type Err = anyhow::Error;

    /// Parses `host:port`, splitting at the last colon
    fn from_str(s: &str) -> Result<Self> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("Missing port in peer address {}", s))?;
        if host.is_empty() {
            return Err(anyhow!("Missing host in peer address {}", s));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| anyhow!("Invalid port in peer address {}: {}", s, e))?;
        Ok(PeerAddress::new(host, port))
    }
}

/// One member of the ring together with the files it is responsible for
///
/// The ring links (successor and predecessor) are not stored here,
/// they belong to the topology of the [`Chord`](crate::chord::Chord) owning this peer.
#[derive(Debug)]
pub struct ChordPeer {
    /// Node-ID of the peer (hash of the address it announces itself with)
    pub(crate) id: Identifier,
    /// Address under which we can reach the peer
    pub(crate) address: PeerAddress,
    /// File identifier to filename, guarded by this peer's exclusive lock
    storage: Mutex<HashMap<Identifier, String>>,
}

impl ChordPeer {
    pub fn new(address: PeerAddress) -> Self {
        ChordPeer {
            id: address.identifier(),
            address,
            storage: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn address(&self) -> &PeerAddress {
        &self.address
    }

    /// Inserts or overwrites the filename kept under `file_id`
    ///
    /// Returns the filename previously stored under the same identifier, if any.
    pub fn store(&self, file_id: Identifier, filename: &str) -> Option<String> {
        let previous = self.storage.lock().insert(file_id, filename.to_owned());
        info!(
            "File '{}' (ID: {}) stored on peer {}.",
            filename, file_id, self.id
        );
        previous
    }

    /// Looks up the filename kept under `file_id`
    pub fn retrieve(&self, file_id: Identifier) -> Option<String> {
        let filename = self.storage.lock().get(&file_id).cloned();
        info!(
            "Retrieving file with ID: {} from peer {}.",
            file_id, self.id
        );
        filename
    }

    /// Number of files this peer is responsible for
    pub fn file_count(&self) -> usize {
        self.storage.lock().len()
    }
}
