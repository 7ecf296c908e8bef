use super::message::PieceIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Blocks held per piece. A piece is complete once it holds
/// `blocks_per_piece` blocks; anything less counts as needed.
/// Only the simulation driver writes to this, policies just read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PossessionVector {
    blocks: Vec<u32>,
    blocks_per_piece: u32,
}

impl PossessionVector {
    pub fn new(num_pieces: usize, blocks_per_piece: u32) -> Self {
        Self {
            blocks: vec![0; num_pieces],
            blocks_per_piece,
        }
    }

    pub fn num_pieces(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks_per_piece(&self) -> u32 {
        self.blocks_per_piece
    }

    pub fn blocks_held(&self, piece: PieceIndex) -> u32 {
        self.blocks.get(piece).copied().unwrap_or(0)
    }

    pub fn is_complete(&self, piece: PieceIndex) -> bool {
        self.blocks_held(piece) >= self.blocks_per_piece
    }

    pub fn is_needed(&self, piece: PieceIndex) -> bool {
        piece < self.blocks.len() && !self.is_complete(piece)
    }

    pub fn needed_pieces(&self) -> HashSet<PieceIndex> {
        (0..self.blocks.len()).filter(|&i| self.is_needed(i)).collect()
    }

    pub fn complete_pieces(&self) -> HashSet<PieceIndex> {
        (0..self.blocks.len()).filter(|&i| self.is_complete(i)).collect()
    }

    pub fn all_complete(&self) -> bool {
        self.blocks.iter().all(|&b| b >= self.blocks_per_piece)
    }

    /// Fraction of all blocks held, 0.0..=1.0.
    pub fn completion(&self) -> f64 {
        let total = self.blocks.len() as u64 * self.blocks_per_piece as u64;
        if total == 0 {
            return 1.0;
        }
        let held: u64 = self.blocks.iter().map(|&b| u64::from(b)).sum();
        held as f64 / total as f64
    }

    pub fn mark_complete(&mut self, piece: PieceIndex) {
        if let Some(b) = self.blocks.get_mut(piece) {
            *b = self.blocks_per_piece;
        }
    }

    /// Credit up to `blocks` blocks to a piece, saturating at completion.
    /// Returns how many were actually applied -- redundant deliveries of a
    /// finished piece land as 0, not as an error.
    pub fn add_blocks(&mut self, piece: PieceIndex, blocks: u32) -> u32 {
        let Some(held) = self.blocks.get_mut(piece) else {
            return 0;
        };
        let room = self.blocks_per_piece.saturating_sub(*held);
        let applied = blocks.min(room);
        *held += applied;
        applied
    }
}
