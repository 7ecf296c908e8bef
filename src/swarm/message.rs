use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type PieceIndex = usize;

/// "Send me piece `piece` starting at `start_block`" -- start_block is always
/// the number of blocks the requester already holds, so a peer never re-sends
/// a held prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub requester_id: AgentId,
    pub peer_id: AgentId,
    pub piece: PieceIndex,
    pub start_block: u32,
}

impl Request {
    pub fn new(requester_id: AgentId, peer_id: AgentId, piece: PieceIndex, start_block: u32) -> Self {
        Self { requester_id, peer_id, piece, start_block }
    }
}

/// A granted upload slot for one round. Bandwidth is a share of the
/// uploader's per-round budget, in blocks per round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Upload {
    pub from_id: AgentId,
    pub to_id: AgentId,
    pub bandwidth: f64,
}

impl Upload {
    pub fn new(from_id: AgentId, to_id: AgentId, bandwidth: f64) -> Self {
        Self { from_id, to_id, bandwidth }
    }
}

/// What actually landed, recorded by the driver after delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Download {
    pub from_id: AgentId,
    pub to_id: AgentId,
    pub piece: PieceIndex,
    pub blocks: u32,
}

/// Read-only per-round snapshot of one peer: which pieces it has completed.
/// Partially held pieces are not advertised.
#[derive(Debug, Clone)]
pub struct PeerView {
    pub peer_id: AgentId,
    pub available_pieces: HashSet<PieceIndex>,
}

impl PeerView {
    pub fn new(peer_id: AgentId, available_pieces: HashSet<PieceIndex>) -> Self {
        Self { peer_id, available_pieces }
    }
}
