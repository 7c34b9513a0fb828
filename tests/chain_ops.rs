//! End-to-end chain behavior: admission, reasoning, decay, maintenance.

use jellyfish::{Chain, LearnOutcome, HASH_SIZE, MAX_MEM, UNKNOWN};

#[test]
fn test_learn_then_reason_exact() {
    let mut chain = Chain::new();
    chain.learn("hello", "world");
    chain.learn("foo", "bar");

    assert_eq!(chain.reason("hello"), "world");
    assert_eq!(chain.reason("foo"), "bar");
    assert_eq!(chain.reason("unknown"), UNKNOWN);
}

#[test]
fn test_fuzzy_reason_positional() {
    let mut chain = Chain::new();
    chain.learn("cat", "meow");
    chain.learn("dog", "bark");
    chain.learn("bird", "tweet");

    assert_eq!(chain.reason("cot"), "meow");
    assert_eq!(chain.reason("bog"), "bark");
    assert_eq!(chain.reason("elephant"), UNKNOWN);
}

#[test]
fn test_repeat_learn_reinforces_single_block() {
    let mut chain = Chain::new();
    assert_eq!(chain.learn("cat", "meow"), LearnOutcome::Inserted);
    assert_eq!(chain.learn("cat", "meow"), LearnOutcome::Reinforced);

    assert_eq!(chain.count(), 1);
    assert_eq!(chain.blocks[0].usage_count, 1);
    assert_eq!(chain.blocks[0].confidence, 1.0);
}

#[test]
fn test_decay_then_cleanup_keeps_survivor() {
    let mut chain = Chain::new();
    chain.learn("x", "y");
    chain.learn("foo", "bar");
    chain.blocks[0].confidence = 0.5;
    chain.blocks[1].confidence = 0.08;

    // Back-date both blocks so one survives a half-life and one falls
    // under the keep floor.
    for block in &mut chain.blocks {
        block.timestamp -= 2;
    }
    chain.decay(2.0);

    assert!(chain.blocks[0].valid);
    assert!(
        chain.blocks[0].confidence < 0.5 && chain.blocks[0].confidence >= 0.05,
        "confidence was {}",
        chain.blocks[0].confidence
    );
    assert!(!chain.blocks[1].valid);

    chain.cleanup();
    assert_eq!(chain.count(), 1);
    assert_eq!(chain.blocks[0].input.as_str(), "x");
}

#[test]
fn test_conflict_detection() {
    let mut chain = Chain::new();
    chain.learn("earth", "round");

    assert!(chain.detect_conflict("earth", "flat"));
    assert!(!chain.detect_conflict("earth", "round"));
    assert!(!chain.detect_conflict("mars", "red"));
}

#[test]
fn test_empty_chain_boundaries() {
    let mut chain = Chain::new();
    assert_eq!(chain.reason("anything"), UNKNOWN);
    assert!(chain.best_memory().is_none());

    let fp = chain.fingerprint();
    for (i, byte) in fp.iter().enumerate() {
        assert_eq!(*byte, 0xA5 ^ i as u8);
    }
}

#[test]
fn test_full_immutable_chain_drops_admissions() {
    let mut chain = Chain::new();
    for i in 0..MAX_MEM {
        assert_eq!(chain.learn(&format!("key-{i}"), "value"), LearnOutcome::Inserted);
    }
    for block in &mut chain.blocks {
        block.mark_immutable();
    }

    assert_eq!(chain.learn("one-more", "value"), LearnOutcome::Dropped);
    assert_eq!(chain.count(), MAX_MEM);

    // Immutable blocks survive every reclamation path.
    chain.cleanup();
    assert_eq!(chain.count(), MAX_MEM);
    assert_eq!(chain.prune(2.0), 0);
    assert_eq!(chain.count(), MAX_MEM);
}

#[test]
fn test_capacity_recovers_after_decay() {
    let mut chain = Chain::new();
    for i in 0..MAX_MEM {
        chain.learn(&format!("key-{i}"), "value");
    }
    // Weaken half the blocks under the cleanup floor.
    for block in chain.blocks.iter_mut().take(MAX_MEM / 2) {
        block.confidence = 0.01;
    }

    // Admission is full, cleanup reclaims, insert succeeds.
    assert_eq!(chain.learn("fresh", "value"), LearnOutcome::Inserted);
    assert_eq!(chain.count(), MAX_MEM / 2 + 1);
    let mut chain2 = chain.clone();
    assert_eq!(chain2.reason("fresh"), "value");
}

#[test]
fn test_oversized_input_truncated() {
    let mut chain = Chain::new();
    let long_input = "a".repeat(1000);
    chain.learn(&long_input, "value");

    assert_eq!(chain.blocks[0].input.len(), jellyfish::INPUT_CAP - 1);
    // The truncated form keeps answering queries phrased with the full text.
    assert_eq!(chain.reason(&long_input), "value");
}

#[test]
fn test_chain_fingerprint_reflects_usage() {
    let mut chain = Chain::new();
    chain.learn("a", "1");
    chain.learn("b", "2");
    let before = chain.fingerprint();

    // Reads mutate usage counters, so reasoning changes the fingerprint.
    chain.reason("a");
    let after = chain.fingerprint();
    assert_ne!(before, after);
}

#[test]
fn test_find_by_hash_roundabout() {
    let mut chain = Chain::new();
    chain.learn("needle", "haystack");
    let hash = chain.blocks[0].hash;

    let found = chain.find_by_hash(&hash).expect("hash should resolve");
    assert_eq!(found.output.as_str(), "haystack");
    assert!(chain.find_by_hash(&[0u8; HASH_SIZE]).is_none());
}

#[test]
fn test_sign_all_blocks_then_coverage() {
    let mut chain = Chain::with_new_device_id();
    chain.learn("a", "1");
    chain.learn("b", "2");

    assert_eq!(chain.coverage(), 0.0);
    let device_id = chain.device_id;
    for block in &mut chain.blocks {
        block.device_id = device_id;
        block.sign(Some(b"shared-key"));
    }
    assert!((chain.coverage() - 1.0).abs() < 1e-6);
    assert!(chain.blocks.iter().all(|b| b.verify_signature(Some(b"shared-key"))));
}

#[test]
fn test_trim_then_dedupe_counts() {
    let mut chain = Chain::new();
    chain.learn("a", "1");
    chain.learn("b", "2");
    chain.learn("c", "3");
    chain.blocks[0].confidence = 0.9;
    chain.blocks[1].confidence = 0.1;
    chain.blocks[2].confidence = 0.6;

    assert_eq!(chain.trim(2), 1);
    assert_eq!(chain.count(), 2);
    assert_eq!(chain.blocks[0].input.as_str(), "a");

    assert_eq!(chain.dedupe(), 0);
}
