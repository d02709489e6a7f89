//! Ring membership and routing of one peer process
//!
//! We keep a simplified [Chord](https://en.wikipedia.org/wiki/Chord_(peer-to-peer)) ring:
//! every member knows exactly one successor and one predecessor, there is no finger table.
//!
//! # Features:
//! - Peer and file identifiers share the same 32 bit circle, see [`identifier`]
//! - A member is responsible for the keys in `(predecessor, self]`
//! - Joining peers are spliced in immediately before the peer receiving the request
//! - Successor lookup walks the ring one member at a time (O(ring size))
//! - Every member keeps its own file map behind its own lock
//!
//! # Concurrency:
//! The ring topology is protected by a single ring-wide [`RwLock`].
//! Lookups take it for reading, joins for writing.
//! Storage access happens on the [`ChordPeer`] returned by a lookup,
//! after the topology lock has been released,
//! so the two locks are never held at the same time.
//!
//! # Limitations:
//! - Keys are not migrated when a peer joins; files stay with the member that stored them
//! - There is no leave, failure detection or stabilization
//! - Joined members only exist inside this process, no connection to their address is opened

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use parking_lot::RwLock;

use crate::chord::identifier::{hash_identifier, is_between_on_ring, Identifier};
use crate::chord::peer::{ChordPeer, PeerAddress};

pub mod identifier;
pub mod peer;

/// Index of a member inside the ring arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerIndex(usize);

/// Ring of peers as seen from the local peer
#[derive(Clone)]
pub struct Chord {
    state: Arc<SChordState>,
}

/// Structure containing all the state of the ring
struct SChordState {
    /// The peer that was created with this process, always at index 0
    local: PeerIndex,
    /// Successor and predecessor links of all members
    topology: RwLock<Topology>,
}

/// One entry of the arena
struct RingMember {
    peer: Arc<ChordPeer>,
    successor: PeerIndex,
    predecessor: PeerIndex,
}

struct Topology {
    members: Vec<RingMember>,
    /// Members by address, so every listening endpoint is in the ring at most once
    by_address: HashMap<PeerAddress, PeerIndex>,
}

impl Topology {
    fn member(&self, index: PeerIndex) -> &RingMember {
        &self.members[index.0]
    }

    fn member_mut(&mut self, index: PeerIndex) -> &mut RingMember {
        &mut self.members[index.0]
    }
}

/// Snapshot of a member and its neighbours, as reported by `DISPLAY`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingView {
    pub id: Identifier,
    pub successor: Identifier,
    pub predecessor: Identifier,
}

impl Chord {
    /// Creates a ring of one: the local peer is its own successor and predecessor
    pub fn new(local_address: PeerAddress) -> Self {
        let peer = Arc::new(ChordPeer::new(local_address.clone()));
        info!(
            "Creating new ring node {} with id {}",
            local_address, peer.id
        );
        let local = PeerIndex(0);
        let mut by_address = HashMap::new();
        by_address.insert(local_address, local);
        Chord {
            state: Arc::new(SChordState {
                local,
                topology: RwLock::new(Topology {
                    members: vec![RingMember {
                        peer,
                        successor: local,
                        predecessor: local,
                    }],
                    by_address,
                }),
            }),
        }
    }

    /// The peer created with this process, which receives all commands
    pub fn local(&self) -> PeerIndex {
        self.state.local
    }

    /// The peer stored at `index`
    ///
    /// # Panics
    /// Indices are only valid for the `Chord` that returned them.
    /// Panics if `index` was handed out by another, larger ring.
    pub fn peer(&self, index: PeerIndex) -> Arc<ChordPeer> {
        self.state.topology.read().member(index).peer.clone()
    }

    /// # Panics
    /// Panics if `index` does not belong to this ring, see [`Chord::peer`].
    pub fn successor(&self, index: PeerIndex) -> PeerIndex {
        self.state.topology.read().member(index).successor
    }

    /// # Panics
    /// Panics if `index` does not belong to this ring, see [`Chord::peer`].
    pub fn predecessor(&self, index: PeerIndex) -> PeerIndex {
        self.state.topology.read().member(index).predecessor
    }

    /// Number of members, the local peer included
    pub fn member_count(&self) -> usize {
        self.state.topology.read().members.len()
    }

    /// Splices a new member for `address` into the ring immediately before `existing`
    ///
    /// The new member's successor is `existing`, its predecessor is the old predecessor of `existing`.
    /// No keys are moved.
    /// If a member with this address is already part of the ring, nothing changes
    /// and that member is returned.
    ///
    /// # Panics
    /// Panics if `existing` does not belong to this ring, see [`Chord::peer`].
    pub fn join(&self, existing: PeerIndex, address: PeerAddress) -> PeerIndex {
        let mut topology = self.state.topology.write();
        if let Some(index) = topology.by_address.get(&address) {
            debug!("{} is already part of the ring", address);
            return *index;
        }

        let new_index = PeerIndex(topology.members.len());
        let predecessor = topology.member(existing).predecessor;
        let peer = Arc::new(ChordPeer::new(address.clone()));
        info!(
            "Peer {} ({}) joins between {} and {}",
            address,
            peer.id,
            topology.member(predecessor).peer.id,
            topology.member(existing).peer.id
        );

        topology.members.push(RingMember {
            peer,
            successor: existing,
            predecessor,
        });
        topology.member_mut(predecessor).successor = new_index;
        topology.member_mut(existing).predecessor = new_index;
        topology.by_address.insert(address, new_index);
        new_index
    }

    /// Splices a new member into the ring before the local peer
    pub fn connect(&self, address: PeerAddress) -> PeerIndex {
        self.join(self.state.local, address)
    }

    /// Finds the member responsible for `key`, walking the ring from `start`
    ///
    /// Returns the first successor `s` of a visited member `c` with `key ∈ (c, s]`.
    /// If the walk returns to `start` without a match, `start` itself is responsible.
    /// Panics if `start` does not belong to this ring, like [`Chord::peer`].
    pub fn find_successor(&self, start: PeerIndex, key: Identifier) -> Arc<ChordPeer> {
        let topology = self.state.topology.read();
        let mut current = start;
        loop {
            let member = topology.member(current);
            let successor = topology.member(member.successor);
            if is_between_on_ring(key, member.peer.id, successor.peer.id) {
                return successor.peer.clone();
            }
            current = member.successor;
            if current == start {
                return topology.member(start).peer.clone();
            }
        }
    }

    /// Stores `filename` on the member responsible for its hash, routing from `start`
    pub fn store_from(&self, start: PeerIndex, filename: &str) -> Arc<ChordPeer> {
        let file_id = hash_identifier(filename);
        let responsible = self.find_successor(start, file_id);
        responsible.store(file_id, filename);
        responsible
    }

    /// Looks `filename` up on the member responsible for its hash, routing from `start`
    pub fn retrieve_from(&self, start: PeerIndex, filename: &str) -> Option<String> {
        let file_id = hash_identifier(filename);
        self.find_successor(start, file_id).retrieve(file_id)
    }

    pub fn store(&self, filename: &str) -> Arc<ChordPeer> {
        self.store_from(self.state.local, filename)
    }

    pub fn retrieve(&self, filename: &str) -> Option<String> {
        self.retrieve_from(self.state.local, filename)
    }

    /// Identifiers of the local peer and its two neighbours
    pub fn display(&self) -> RingView {
        let topology = self.state.topology.read();
        let member = topology.member(self.state.local);
        RingView {
            id: member.peer.id,
            successor: topology.member(member.successor).peer.id,
            predecessor: topology.member(member.predecessor).peer.id,
        }
    }

    /// All members in successor order, starting at the local peer
    pub fn members(&self) -> Vec<Arc<ChordPeer>> {
        let topology = self.state.topology.read();
        let mut members = Vec::with_capacity(topology.members.len());
        let mut current = self.state.local;
        loop {
            let member = topology.member(current);
            members.push(member.peer.clone());
            current = member.successor;
            if current == self.state.local || members.len() > topology.members.len() {
                break;
            }
        }
        members
    }

    #[cfg(test)]
    pub(crate) fn print_chord(&self) {
        let topology = self.state.topology.read();
        for member in topology.members.iter() {
            debug!(
                "{} {} S:{} P:{} files:{}",
                member.peer.address,
                member.peer.id,
                topology.member(member.successor).peer.id,
                topology.member(member.predecessor).peer.id,
                member.peer.file_count()
            );
        }
    }
}
