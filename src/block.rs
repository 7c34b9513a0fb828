//! Block - a single learned (input, output) association plus metadata
//!
//! Blocks are the unit of memory. Each carries a fingerprint of its content,
//! admission timing, a confidence value that is reinforced on hits and
//! decayed by age, and an optional 32-byte signature binding the fingerprint
//! to a key.

use serde::{Deserialize, Serialize};

use crate::bounded::BoundedText;
use crate::fingerprint::{self, HASH_SIZE};

/// Capacity of a block's input field in bytes.
pub const INPUT_CAP: usize = 256;

/// Capacity of a block's output field in bytes.
pub const OUTPUT_CAP: usize = 256;

/// Size of a writer identity in bytes.
pub const DEVICE_ID_SIZE: usize = 16;

/// Size of a block signature in bytes.
pub const SIGNATURE_SIZE: usize = 32;

/// Marker text written over redacted fields.
pub const REDACTED_MARKER: &str = "***REDACTED***";

pub type InputText = BoundedText<INPUT_CAP>;
pub type OutputText = BoundedText<OUTPUT_CAP>;

/// A learned association and its audit metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Learned input, truncated to [`INPUT_CAP`] on admission.
    pub input: InputText,

    /// Learned output, truncated to [`OUTPUT_CAP`] on admission.
    pub output: OutputText,

    /// Fingerprint of (input, output, nonce, device salt).
    pub hash: [u8; HASH_SIZE],

    /// Wall-clock seconds at admission; age origin for decay.
    pub timestamp: u64,

    /// Milliseconds since the nearest previous valid block, 0 if none.
    pub delta_ms: u32,

    /// Processing duration, left 0 by the chain itself.
    pub duration_ms: u32,

    /// False marks a tombstone awaiting cleanup.
    pub valid: bool,

    /// Belief strength in [0.0, 1.0].
    pub confidence: f32,

    /// Incremented per successful lookup.
    pub usage_count: u32,

    /// Immutable blocks survive cleanup and prune, and win confidence ties.
    pub immutable: bool,

    /// Writer identity.
    pub device_id: [u8; DEVICE_ID_SIZE],

    /// Optional integrity witness over the fingerprint.
    pub signature: [u8; SIGNATURE_SIZE],
}

impl Block {
    /// Admit a fresh block. Device id and signature start zeroed; the host
    /// stamps and signs them separately.
    pub(crate) fn admit(input: &str, output: &str, timestamp: u64, delta_ms: u32, nonce: u64) -> Self {
        let input = InputText::new(input);
        let output = OutputText::new(output);
        let hash = fingerprint::mix(input.as_bytes(), output.as_bytes(), nonce);
        Self {
            input,
            output,
            hash,
            timestamp,
            delta_ms,
            duration_ms: 0,
            valid: true,
            confidence: 1.0,
            usage_count: 0,
            immutable: false,
            device_id: [0; DEVICE_ID_SIZE],
            signature: [0; SIGNATURE_SIZE],
        }
    }

    /// Structural verification: non-empty input and output, non-zero
    /// fingerprint.
    pub fn verify(&self) -> bool {
        !self.input.is_empty() && !self.output.is_empty() && self.hash.iter().any(|&b| b != 0)
    }

    /// Age in seconds at `now`, 0 if the timestamp lies in the future.
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.timestamp)
    }

    /// One-line human-readable description.
    pub fn explain(&self) -> String {
        format!(
            "Input: '{}' | Output: '{}' | Conf: {:.2} | Used: {} | Immutable: {} | Valid: {}",
            self.input, self.output, self.confidence, self.usage_count, self.immutable, self.valid
        )
    }

    /// Overwrite content with the redaction marker, zero the fingerprint,
    /// and drop confidence to zero. Timing metadata is left for audit.
    pub fn redact(&mut self) {
        self.input.set(REDACTED_MARKER);
        self.output.set(REDACTED_MARKER);
        self.hash = [0; HASH_SIZE];
        self.confidence = 0.0;
    }

    pub fn mark_immutable(&mut self) {
        self.immutable = true;
    }

    /// Sign the fingerprint with up to 32 key bytes, or a built-in default
    /// key when absent. Signing is deterministic (nonce 0) so that
    /// [`Block::verify_signature`] can recompute it.
    pub fn sign(&mut self, key: Option<&[u8]>) {
        self.signature = self.compute_signature(key);
    }

    /// Recompute the signature and compare against the stored one.
    pub fn verify_signature(&self, key: Option<&[u8]>) -> bool {
        self.compute_signature(key) == self.signature
    }

    fn compute_signature(&self, key: Option<&[u8]>) -> [u8; SIGNATURE_SIZE] {
        let key_hex = match key {
            Some(key) => fingerprint::hex_string(&key[..key.len().min(32)]),
            None => "default-key".to_owned(),
        };
        fingerprint::mix(&self.hash, key_hex.as_bytes(), 0)
    }
}
