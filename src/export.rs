//! Export - JSON snapshots of a chain
//!
//! A snapshot is a human-readable rendering of chain state for inspection
//! and archival. It is not the wire format; `.fish` round-trips go through
//! the codec.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::error::Result;
use crate::fingerprint::hex_string;

/// Snapshot of a whole chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub origin_device_id: String,
    pub created_at: u64,
    pub updated_at: u64,
    /// Chain fingerprint at snapshot time, hex.
    pub fingerprint: String,
    pub trust_score: f32,
    pub coverage: f32,
    pub blocks: Vec<BlockSnapshot>,
}

/// Snapshot of a single block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub input: String,
    pub output: String,
    pub hash: String,
    pub timestamp: u64,
    pub confidence: f32,
    pub usage_count: u32,
    pub valid: bool,
    pub immutable: bool,
}

impl Chain {
    /// Capture the current state as a snapshot.
    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            origin_device_id: hex_string(&self.device_id),
            created_at: self.created_at,
            updated_at: self.updated_at,
            fingerprint: hex_string(&self.fingerprint()),
            trust_score: self.trust_score(),
            coverage: self.coverage(),
            blocks: self
                .blocks
                .iter()
                .map(|b| BlockSnapshot {
                    input: b.input.to_string(),
                    output: b.output.to_string(),
                    hash: hex_string(&b.hash),
                    timestamp: b.timestamp,
                    confidence: b.confidence,
                    usage_count: b.usage_count,
                    valid: b.valid,
                    immutable: b.immutable,
                })
                .collect(),
        }
    }

    /// Write a pretty-printed JSON snapshot to `path`.
    pub fn export_to_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_structure() {
        let mut chain = Chain::new();
        chain.learn("key1", "value1");

        let snapshot = chain.snapshot();
        assert_eq!(snapshot.blocks.len(), 1);
        assert_eq!(snapshot.blocks[0].input, "key1");
        assert_eq!(snapshot.fingerprint.len(), 64);
    }

    #[test]
    fn test_export_to_json() {
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let path = dir.path().join("export.json");

        let mut chain = Chain::new();
        chain.learn("key1", "value1");
        chain.export_to_json(&path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("origin_device_id"));
        assert!(json.contains("key1"));
    }
}
