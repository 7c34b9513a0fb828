//! # Jellyfish
//!
//! A content-addressed associative memory that records each learned
//! (input → output) association as a fingerprinted block in a bounded,
//! auditable chain.
//!
//! ## Core Concept
//!
//! Key-value stores answer queries but forget where answers came from.
//! Jellyfish keeps both in one structure:
//!
//! - **Blocks** - fixed-capacity (input, output) pairs with a 32-byte
//!   fingerprint, admission timing, confidence, and usage counters
//! - **Chain** - a bounded, ordered container with reinforcement on
//!   re-admission and lazy tombstone reclamation
//! - **Reasoner** - exact lookup with a positional fuzzy fallback; reads
//!   reinforce, so reads are writes
//! - **Decay** - confidence halves per half-life of age; weak blocks are
//!   tombstoned for cleanup
//! - **Conflict detection** - contradicting associations coexist and are
//!   surfaced, never auto-resolved
//! - **Persistence** - a textual `.fish` format with byte-exact round-trips
//! - **Mindsets** - declarative `.jellyfish` files naming models and the
//!   chain files backing them
//!
//! ## Example
//!
//! ```rust,no_run
//! use jellyfish::Chain;
//! # fn main() -> jellyfish::Result<()> {
//!
//! let mut chain = Chain::new();
//! chain.learn("hello", "world");
//! chain.learn("hello", "world"); // reinforces instead of duplicating
//!
//! assert_eq!(chain.reason("hello"), "world");
//! assert_eq!(chain.reason("helo"), "world"); // fuzzy fallback
//!
//! // Age out stale memories, then reclaim their slots.
//! chain.decay(86_400.0);
//! chain.cleanup();
//!
//! chain.save("memories.fish")?;
//! let restored = Chain::load("memories.fish")?;
//! assert_eq!(restored.count(), chain.count());
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod bounded;
pub mod chain;
pub mod codec;
pub mod decay;
pub mod error;
pub mod export;
pub mod fingerprint;
pub mod mindset;
pub mod reason;

// Re-exports
pub use crate::block::{
    Block, DEVICE_ID_SIZE, INPUT_CAP, OUTPUT_CAP, REDACTED_MARKER, SIGNATURE_SIZE,
};
pub use crate::bounded::BoundedText;
pub use crate::chain::{Chain, ChainStats, LearnOutcome, MAX_MEM, MIN_KEEP_CONFIDENCE};
pub use crate::codec::{FILE_SIGNATURE, FILE_VERSION, MAX_FILE_SIZE};
pub use crate::error::{Error, Result};
pub use crate::export::{BlockSnapshot, ChainSnapshot};
pub use crate::fingerprint::{device_salt, init_device_salt, mix, HASH_SIZE};
pub use crate::mindset::{parse_mindset, parse_mindset_str, ModelDescriptor, MAX_MODELS, MAX_TAGS};
pub use crate::reason::{similarity, tokenize, Reasoning, TOKEN_CAP, UNKNOWN};

use std::path::Path;

impl Chain {
    /// Write this chain to a `.fish` file. See [`codec::save`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        codec::save(self, path)
    }

    /// Read a chain from a `.fish` file. See [`codec::load`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        codec::load(path)
    }
}
