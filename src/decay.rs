//! Confidence decay by block age.
//!
//! Confidence halves once per half-life of age: `c *= 0.5 ^ (age / h)`,
//! with the half-life clamped below at one second. Blocks falling under the
//! keep floor are tombstoned in place; pair with [`Chain::cleanup`] to
//! reclaim the slots.

use tracing::debug;

use crate::chain::{now_secs, Chain, MIN_KEEP_CONFIDENCE};

impl Chain {
    /// Decay every valid block's confidence by its age in seconds.
    ///
    /// `half_life_secs` is clamped below at 1.0; non-positive values are a
    /// no-op. Blocks whose confidence falls under [`MIN_KEEP_CONFIDENCE`]
    /// are marked invalid but not removed.
    pub fn decay(&mut self, half_life_secs: f32) {
        if self.blocks.is_empty() || half_life_secs <= 0.0 {
            return;
        }

        let half_life = f64::from(half_life_secs).max(1.0);
        let now = now_secs();
        let mut demoted = 0usize;

        for block in &mut self.blocks {
            if !block.valid {
                continue;
            }
            let age = block.age(now);
            if age == 0 {
                continue;
            }

            let factor = 0.5f64.powf(age as f64 / half_life);
            block.confidence = ((f64::from(block.confidence) * factor) as f32).clamp(0.0, 1.0);

            if block.confidence < MIN_KEEP_CONFIDENCE {
                block.valid = false;
                demoted += 1;
            }
        }

        if demoted > 0 {
            debug!(demoted, "decay tombstoned blocks below confidence floor");
        }
    }
}
