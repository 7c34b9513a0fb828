//! Reasoner - exact and fuzzy retrieval over a chain
//!
//! Exact lookup wins and reinforces the block it hits, so reads are writes
//! here. The fuzzy fallback scores candidates by positional mismatch (not
//! edit distance): equal positions contribute one per differing lowercase
//! byte, and leftover length on either side contributes one per byte. A
//! best score above half the query length is rejected.

use serde::Serialize;

use crate::block::Block;
use crate::chain::Chain;

/// Sentinel returned when no memory answers a query.
pub const UNKNOWN: &str = "Unknown";

/// Capacity of a single token in bytes.
pub const TOKEN_CAP: usize = 32;

/// A verbose reasoning hit: the answer plus its provenance.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Reasoning<'a> {
    pub output: &'a str,
    pub confidence: f32,
    #[serde(skip)]
    pub block: &'a Block,
}

/// Positional mismatch score between two strings.
///
/// Compared byte-wise over the shared prefix length, case-insensitively for
/// ASCII; remaining bytes on either side cost one each.
pub fn similarity(a: &str, b: &str) -> usize {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let common = a.len().min(b.len());

    let mut cost = 0;
    for i in 0..common {
        if a[i].to_ascii_lowercase() != b[i].to_ascii_lowercase() {
            cost += 1;
        }
    }
    cost + (a.len() - common) + (b.len() - common)
}

/// Split `input` into lowercase ASCII-alphanumeric tokens.
///
/// At most `max_tokens` tokens are produced (0 yields none); a run longer
/// than `TOKEN_CAP - 1` bytes continues in the next token.
pub fn tokenize(input: &str, max_tokens: usize) -> Vec<String> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() && tokens.len() < max_tokens {
        while i < bytes.len() && !bytes[i].is_ascii_alphanumeric() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        let mut token = String::new();
        while i < bytes.len() && bytes[i].is_ascii_alphanumeric() && token.len() < TOKEN_CAP - 1 {
            token.push(bytes[i].to_ascii_lowercase() as char);
            i += 1;
        }
        tokens.push(token);
    }

    tokens
}

impl Chain {
    /// Answer a query from memory.
    ///
    /// An exact input match is reinforced (usage count, +0.05 confidence
    /// capped at 1.0) and returns its output. Otherwise the valid block with
    /// the lowest positional mismatch answers, unless the score exceeds
    /// half the query length, in which case [`UNKNOWN`] is returned.
    pub fn reason(&mut self, input: &str) -> &str {
        let exact = self
            .blocks
            .iter()
            .position(|b| b.valid && b.input.matches(input));
        if let Some(index) = exact {
            let block = &mut self.blocks[index];
            block.usage_count += 1;
            if block.confidence < 1.0 {
                block.confidence = (block.confidence + 0.05).min(1.0);
            }
            return self.blocks[index].output.as_str();
        }

        let mut best: Option<(usize, usize)> = None;
        for (index, block) in self.blocks.iter().enumerate() {
            if !block.valid {
                continue;
            }
            let score = similarity(input, &block.input);
            if best.map_or(true, |(best_score, _)| score < best_score) {
                best = Some((score, index));
            }
        }

        match best {
            Some((score, index)) if score <= input.len() / 2 => self.blocks[index].output.as_str(),
            _ => UNKNOWN,
        }
    }

    /// Exact-match lookup with provenance; does not reinforce.
    pub fn reason_verbose(&self, input: &str) -> Option<Reasoning<'_>> {
        self.best_match(input).map(|block| Reasoning {
            output: block.output.as_str(),
            confidence: block.confidence,
            block,
        })
    }

    /// Among valid blocks whose input equals `input`, the one with maximal
    /// confidence; immutable blocks win ties.
    pub fn best_match(&self, input: &str) -> Option<&Block> {
        let mut best: Option<&Block> = None;
        for block in &self.blocks {
            if !block.valid || !block.input.matches(input) {
                continue;
            }
            best = match best {
                None => Some(block),
                Some(current) => {
                    if block.confidence > current.confidence
                        || (block.confidence == current.confidence
                            && block.immutable
                            && !current.immutable)
                    {
                        Some(block)
                    } else {
                        Some(current)
                    }
                }
            };
        }
        best
    }

    /// The valid block with the highest positive confidence.
    pub fn best_memory(&self) -> Option<&Block> {
        let mut best: Option<&Block> = None;
        let mut best_score = 0.0f32;
        for block in &self.blocks {
            if block.valid && block.confidence > best_score {
                best_score = block.confidence;
                best = Some(block);
            }
        }
        best
    }
}
