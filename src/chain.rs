//! Chain - bounded ordered container of blocks
//!
//! A chain owns up to [`MAX_MEM`] blocks plus origin metadata. Admission
//! reinforces an existing association or claims a free slot; maintenance
//! passes (cleanup, compact, prune, dedupe, trim) reclaim tombstones and
//! weak memories while preserving survivor order, which is what keeps
//! `delta_ms` spacing and audit scans meaningful.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::block::{Block, DEVICE_ID_SIZE};
use crate::fingerprint::{self, hex_string, HASH_SIZE};

/// Maximum number of blocks a chain can hold.
pub const MAX_MEM: usize = 256;

/// Confidence floor below which cleanup discards and decay tombstones.
pub const MIN_KEEP_CONFIDENCE: f32 = 0.05;

/// Outcome of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnOutcome {
    /// The pair was already known; its block was reinforced in place.
    Reinforced,
    /// A new block was written.
    Inserted,
    /// The chain was full even after cleanup; the admission was discarded.
    Dropped,
}

/// Aggregate numbers over the valid blocks of a chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainStats {
    pub valid_count: usize,
    pub avg_confidence: f32,
    pub immutable_ratio: f32,
}

/// An ordered, bounded collection of learned blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    /// Blocks in admission order. Tombstones stay in place until a
    /// maintenance pass removes them.
    pub blocks: Vec<Block>,

    /// Origin writer identity.
    pub device_id: [u8; DEVICE_ID_SIZE],

    /// Wall-clock seconds at creation.
    pub created_at: u64,

    /// Wall-clock seconds of the last mutation.
    pub updated_at: u64,
}

pub(crate) fn now_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

impl Chain {
    /// Create an empty chain with a zeroed origin identity.
    pub fn new() -> Self {
        let now = now_secs();
        Self {
            blocks: Vec::new(),
            device_id: [0; DEVICE_ID_SIZE],
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an empty chain stamped with a freshly generated origin identity.
    pub fn with_new_device_id() -> Self {
        let mut chain = Self::new();
        chain.device_id = *uuid::Uuid::new_v4().as_bytes();
        chain
    }

    /// Number of block slots in use, tombstones included.
    pub fn count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Admit an (input, output) association.
    ///
    /// If a valid block already holds the pair it is reinforced: usage count
    /// incremented, confidence raised by 0.1 (capped at 1.0), timestamp
    /// refreshed. Otherwise the first free slot is claimed; if none is free
    /// a cleanup pass runs and the claim is retried. A chain that is still
    /// full afterwards drops the admission and reports it.
    pub fn learn(&mut self, input: &str, output: &str) -> LearnOutcome {
        let now = now_secs();

        for block in &mut self.blocks {
            if block.valid && block.input.matches(input) && block.output.matches(output) {
                block.usage_count += 1;
                block.confidence = (block.confidence + 0.1).min(1.0);
                block.timestamp = now;
                self.updated_at = now;
                return LearnOutcome::Reinforced;
            }
        }

        if self.claim_slot(input, output, now) {
            return LearnOutcome::Inserted;
        }

        debug!(count = self.count(), "chain full, running cleanup before admit");
        self.cleanup();

        if self.claim_slot(input, output, now) {
            LearnOutcome::Inserted
        } else {
            warn!(input, "admission dropped: no free slot after cleanup");
            LearnOutcome::Dropped
        }
    }

    fn claim_slot(&mut self, input: &str, output: &str, now: u64) -> bool {
        let index = match self.blocks.iter().position(|b| !b.valid) {
            Some(index) => index,
            None if self.blocks.len() < MAX_MEM => {
                self.blocks.push(Block::default());
                self.blocks.len() - 1
            }
            None => return false,
        };

        let prev_ts = self.blocks[..index].iter().rev().find(|b| b.valid).map(|b| b.timestamp);
        let delta_ms = match prev_ts {
            Some(prev) => now.saturating_sub(prev).saturating_mul(1000).min(u64::from(u32::MAX)) as u32,
            None => 0,
        };

        self.blocks[index] = Block::admit(input, output, now, delta_ms, fingerprint::nonce_micros());
        self.updated_at = now;
        true
    }

    /// Stable compaction keeping valid blocks with confidence at or above
    /// [`MIN_KEEP_CONFIDENCE`]. Immutable blocks are never removed.
    pub fn cleanup(&mut self) {
        let before = self.blocks.len();
        self.blocks
            .retain(|b| b.immutable || (b.valid && b.confidence >= MIN_KEEP_CONFIDENCE));
        let removed = before - self.blocks.len();
        if removed > 0 {
            debug!(removed, "cleanup reclaimed block slots");
        }
    }

    /// Stable compaction keeping every valid block regardless of confidence.
    /// Returns the number of tombstones removed.
    pub fn compact(&mut self) -> usize {
        let before = self.blocks.len();
        self.blocks.retain(|b| b.valid);
        before - self.blocks.len()
    }

    /// Remove tombstones and valid blocks below `min_confidence`, preserving
    /// survivor order. Immutable blocks are never removed. Returns the number
    /// removed.
    pub fn prune(&mut self, min_confidence: f32) -> usize {
        let before = self.blocks.len();
        self.blocks
            .retain(|b| b.immutable || (b.valid && b.confidence >= min_confidence));
        before - self.blocks.len()
    }

    /// Remove later blocks holding the same (input, output) as an earlier
    /// one. Returns the number removed.
    pub fn dedupe(&mut self) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i < self.blocks.len() {
            let mut j = i + 1;
            while j < self.blocks.len() {
                if self.blocks[i].input == self.blocks[j].input
                    && self.blocks[i].output == self.blocks[j].output
                {
                    self.blocks.remove(j);
                    removed += 1;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
        removed
    }

    /// Keep only the `max_blocks` highest-confidence blocks. Survivors end
    /// up sorted by descending confidence; this is the one maintenance pass
    /// that does not preserve admission order. Returns the number removed.
    pub fn trim(&mut self, max_blocks: usize) -> usize {
        if self.blocks.len() <= max_blocks {
            return 0;
        }
        self.blocks.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let removed = self.blocks.len() - max_blocks;
        self.blocks.truncate(max_blocks);
        removed
    }

    /// Trim leading and trailing whitespace from every block's input and
    /// output. Returns the number of blocks modified.
    pub fn normalize(&mut self) -> usize {
        let mut modified = 0;
        for block in &mut self.blocks {
            let input = block.input.trim();
            let output = block.output.trim();
            if input.len() != block.input.len() || output.len() != block.output.len() {
                let input = input.to_owned();
                let output = output.to_owned();
                block.input.set(&input);
                block.output.set(&output);
                modified += 1;
            }
        }
        modified
    }

    /// True when some valid block holds `input` with an output other than
    /// `output`. Conflicting blocks are permitted to coexist; this merely
    /// surfaces them.
    pub fn detect_conflict(&self, input: &str, output: &str) -> bool {
        self.blocks
            .iter()
            .filter(|b| b.valid && b.input.matches(input))
            .any(|b| !b.output.matches(output))
    }

    /// First valid block with the given fingerprint.
    pub fn find_by_hash(&self, hash: &[u8; HASH_SIZE]) -> Option<&Block> {
        self.blocks.iter().find(|b| b.valid && &b.hash == hash)
    }

    /// Number of positions at which two chains disagree: a missing block on
    /// either side or a fingerprint mismatch each count once.
    pub fn compare(&self, other: &Chain) -> usize {
        let max = self.blocks.len().max(other.blocks.len());
        (0..max)
            .filter(|&i| match (self.blocks.get(i), other.blocks.get(i)) {
                (Some(a), Some(b)) => a.hash != b.hash,
                _ => true,
            })
            .count()
    }

    /// Chain-level fingerprint: a pure function of the valid blocks'
    /// (hash, timestamp, confidence, usage_count) and their positions.
    ///
    /// The buffer starts from the `0xA5 ^ i` pattern, so an empty chain has
    /// a well-known fingerprint.
    pub fn fingerprint(&self) -> [u8; HASH_SIZE] {
        let mut out = [0u8; HASH_SIZE];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = 0xA5 ^ i as u8;
        }

        for (i, block) in self.blocks.iter().enumerate() {
            if !block.valid {
                continue;
            }
            let ts = block.timestamp.to_le_bytes();
            for (j, slot) in out.iter_mut().enumerate() {
                let rotated = (block.hash[j] ^ ts[j % 8]).rotate_left((j % 7) as u32 + 1);
                *slot ^= rotated ^ ((j * 31 + i * 17) & 0xFF) as u8;
            }

            let conf = (block.confidence * 255.0) as u8;
            let usage = (block.usage_count & 0xFF) as u8;
            out[i % HASH_SIZE] ^= conf ^ usage;
        }
        out
    }

    /// Mean confidence across valid immutable blocks with confidence of at
    /// least 0.9; 0.0 when there are none.
    pub fn trust_score(&self) -> f32 {
        let mut total = 0.0f32;
        let mut count = 0usize;
        for block in &self.blocks {
            if block.valid && block.immutable && block.confidence >= 0.9 {
                total += block.confidence;
                count += 1;
            }
        }
        if count > 0 {
            total / count as f32
        } else {
            0.0
        }
    }

    /// Ratio of fully-populated blocks (valid, non-empty content, non-zero
    /// fingerprint, device id, signature, and timestamp) to the slot count.
    pub fn coverage(&self) -> f32 {
        if self.blocks.is_empty() {
            return 0.0;
        }
        let full = self
            .blocks
            .iter()
            .filter(|b| {
                b.valid
                    && b.verify()
                    && b.device_id.iter().any(|&x| x != 0)
                    && b.signature.iter().any(|&x| x != 0)
                    && b.timestamp != 0
            })
            .count();
        full as f32 / self.blocks.len() as f32
    }

    /// True when every slot in use verifies structurally. An empty chain
    /// does not verify.
    pub fn verify(&self) -> bool {
        !self.blocks.is_empty() && self.blocks.iter().all(Block::verify)
    }

    /// Aggregate statistics over the valid blocks.
    pub fn stats(&self) -> ChainStats {
        let mut valid = 0usize;
        let mut immutable = 0usize;
        let mut confidence_sum = 0.0f32;
        for block in &self.blocks {
            if !block.valid {
                continue;
            }
            valid += 1;
            confidence_sum += block.confidence;
            if block.immutable {
                immutable += 1;
            }
        }
        ChainStats {
            valid_count: valid,
            avg_confidence: if valid > 0 { confidence_sum / valid as f32 } else { 0.0 },
            immutable_ratio: if valid > 0 { immutable as f32 / valid as f32 } else { 0.0 },
        }
    }

    /// Multi-line self-reflection report: aggregate numbers plus the
    /// strongest memory, if any.
    pub fn reflect(&self) -> String {
        let mut out = String::new();
        out.push_str("== Chain Self-Reflection ==\n");

        if self.blocks.is_empty() {
            out.push_str("No memories available.\n");
            out.push_str("===========================\n");
            return out;
        }

        let stats = self.stats();
        let mut confidence_min = 1.0f32;
        let mut confidence_max = 0.0f32;
        let mut usage_sum = 0u64;
        for block in self.blocks.iter().filter(|b| b.valid) {
            confidence_min = confidence_min.min(block.confidence);
            confidence_max = confidence_max.max(block.confidence);
            usage_sum += u64::from(block.usage_count);
        }

        let coverage = stats.valid_count as f32 / self.blocks.len() as f32;
        out.push_str(&format!("Total Memories  : {}\n", self.blocks.len()));
        out.push_str(&format!(
            "Valid Memories  : {} ({:.1}%)\n",
            stats.valid_count,
            coverage * 100.0
        ));
        out.push_str(&format!("Avg Confidence  : {:.3}\n", stats.avg_confidence));
        out.push_str(&format!("Min Confidence  : {confidence_min:.3}\n"));
        out.push_str(&format!("Max Confidence  : {confidence_max:.3}\n"));
        out.push_str(&format!("Total Usage     : {usage_sum}\n"));

        match self.best_memory() {
            Some(best) => {
                out.push_str("\nStrongest Memory:\n");
                out.push_str(&format!("  {}\n", best.explain()));
                out.push_str(&format!("  Hash       : {}\n", hex_string(&best.hash)));
            }
            None => out.push_str("No confident memories found.\n"),
        }

        out.push_str("===========================\n");
        out
    }

    /// Per-slot structural verification report.
    pub fn validation_report(&self) -> String {
        let mut out = String::new();
        out.push_str("== Chain Validation Report ==\n");
        for (i, block) in self.blocks.iter().enumerate() {
            let status = if !block.valid {
                "Invalid"
            } else if block.verify() {
                "OK"
            } else {
                "Failed"
            };
            out.push_str(&format!("Block {i}: {status}\n"));
        }
        out.push_str("=============================\n");
        out
    }

    /// Full listing of every slot, hex fields included.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (i, block) in self.blocks.iter().enumerate() {
            out.push_str(&format!("Block {i}:\n"));
            out.push_str(&format!("  Input      : {}\n", block.input));
            out.push_str(&format!("  Output     : {}\n", block.output));
            out.push_str(&format!("  Timestamp  : {}\n", block.timestamp));
            out.push_str(&format!("  Delta ms   : {}\n", block.delta_ms));
            out.push_str(&format!("  Duration ms: {}\n", block.duration_ms));
            out.push_str(&format!("  Confidence : {:.2}\n", block.confidence));
            out.push_str(&format!("  Usage Count: {}\n", block.usage_count));
            out.push_str(&format!("  Valid      : {}\n", i32::from(block.valid)));
            out.push_str(&format!("  Device ID  : {}\n", hex_string(&block.device_id)));
            out.push_str(&format!("  Signature  : {}\n", hex_string(&block.signature)));
            out.push_str(&format!("  Hash       : {}\n", hex_string(&block.hash)));
        }
        out
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}
