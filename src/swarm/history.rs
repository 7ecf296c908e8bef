use super::message::{AgentId, Download, Upload};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Append-only transfer record, one entry per completed round. The round
/// currently being decided is `current_round()`; its records don't exist
/// yet, so accessors for it (or anything later) return empty slices rather
/// than panicking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundHistory {
    downloads: Vec<Vec<Download>>,
    uploads: Vec<Vec<Upload>>,
}

impl RoundHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the round being decided = number of completed rounds.
    pub fn current_round(&self) -> u64 {
        self.downloads.len() as u64
    }

    pub fn push_round(&mut self, downloads: Vec<Download>, uploads: Vec<Upload>) {
        self.downloads.push(downloads);
        self.uploads.push(uploads);
    }

    pub fn downloads_in(&self, round: u64) -> &[Download] {
        self.downloads
            .get(round as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn uploads_in(&self, round: u64) -> &[Upload] {
        self.uploads
            .get(round as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Blocks that landed at `to` during `round`, summed per sender.
    pub fn blocks_to(&self, to: AgentId, round: u64) -> HashMap<AgentId, u32> {
        let mut received = HashMap::new();
        for d in self.downloads_in(round) {
            if d.to_id == to {
                *received.entry(d.from_id).or_insert(0) += d.blocks;
            }
        }
        received
    }
}
