//! Filesystem round-trips, format guarantees, and malformed-input handling.

use jellyfish::{parse_mindset, Chain, Error, FILE_SIGNATURE, MAX_FILE_SIZE};
use tempfile::tempdir;

#[test]
fn test_save_load_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("memories.fish");

    let mut chain = Chain::new();
    chain.learn("alpha", "beta");
    chain.learn("gamma", "delta");
    chain.save(&path).unwrap();

    let restored = Chain::load(&path).unwrap();
    assert_eq!(restored.count(), 2);
    assert_eq!(restored.blocks[0].input.as_str(), "alpha");
    assert_eq!(restored.blocks[0].output.as_str(), "beta");
    assert_eq!(restored.blocks[1].input.as_str(), "gamma");
    assert_eq!(restored.blocks[1].output.as_str(), "delta");

    for (a, b) in chain.blocks.iter().zip(&restored.blocks) {
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(a.delta_ms, b.delta_ms);
        assert_eq!(a.duration_ms, b.duration_ms);
        assert_eq!(a.valid, b.valid);
        assert_eq!(a.usage_count, b.usage_count);
        assert_eq!(a.device_id, b.device_id);
        assert_eq!(a.signature, b.signature);
        assert!((a.confidence - b.confidence).abs() <= 1e-6);
    }
}

#[test]
fn test_saved_bytes_stable_across_round_trip() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.fish");
    let second = dir.path().join("second.fish");

    let mut chain = Chain::new();
    chain.learn("stable", "bytes");
    chain.save(&first).unwrap();

    Chain::load(&first).unwrap().save(&second).unwrap();
    assert_eq!(
        std::fs::read(&first).unwrap(),
        std::fs::read(&second).unwrap()
    );
}

#[test]
fn test_header_layout() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("header.fish");

    let mut chain = Chain::new();
    chain.learn("k", "v");
    chain.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains(&format!("\"signature\": \"{FILE_SIGNATURE}\"")));
    assert!(text.contains("\"version\": \"1.0.0\""));
    assert!(text.contains(&format!("\"previous_hash\": \"{}\"", "0".repeat(64))));
    assert!(text.contains("\"confidence\": 1.000000"));
}

#[test]
fn test_load_missing_file_fails() {
    assert!(Chain::load("does/not/exist.fish").is_err());
}

#[test]
fn test_load_rejects_oversized_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("huge.fish");
    std::fs::write(&path, vec![b' '; MAX_FILE_SIZE + 1]).unwrap();

    match Chain::load(&path) {
        Err(Error::FileTooLarge { bytes, limit }) => {
            assert_eq!(bytes, MAX_FILE_SIZE + 1);
            assert_eq!(limit, MAX_FILE_SIZE);
        }
        other => panic!("expected FileTooLarge, got {other:?}"),
    }
}

#[test]
fn test_load_rejects_garbage() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("garbage.fish");
    std::fs::write(&path, b"{ not a chain file !!!").unwrap();
    assert!(Chain::load(&path).is_err());
}

#[test]
fn test_load_rejects_truncated_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cut.fish");

    let mut chain = Chain::new();
    chain.learn("alpha", "beta");
    chain.save(&path).unwrap();

    let data = std::fs::read(&path).unwrap();
    std::fs::write(&path, &data[..data.len() - 80]).unwrap();
    assert!(Chain::load(&path).is_err());
}

#[test]
fn test_save_to_invalid_path_fails() {
    let chain = Chain::new();
    assert!(chain.save("/nonexistent-dir/deep/chain.fish").is_err());
}

#[test]
fn test_round_trip_preserves_tombstones() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tombstone.fish");

    let mut chain = Chain::new();
    chain.learn("live", "1");
    chain.learn("dead", "2");
    chain.blocks[1].valid = false;
    chain.save(&path).unwrap();

    let restored = Chain::load(&path).unwrap();
    assert_eq!(restored.count(), 2);
    assert!(restored.blocks[0].valid);
    assert!(!restored.blocks[1].valid);
}

#[test]
fn test_mindset_file_parse_and_realize() {
    let dir = tempdir().unwrap();

    // A chain file the mindset will reference.
    let mut chain = Chain::new();
    chain.learn("hi", "hello");
    chain.save(dir.path().join("greeter.fish")).unwrap();

    let mindset_path = dir.path().join("default.jellyfish");
    std::fs::write(
        &mindset_path,
        concat!(
            "model('greeter') {\n",
            "  description: 'Small talk'\n",
            "  tags: ['chat']\n",
            "  models: ['missing.fish', 'greeter.fish']\n",
            "}\n",
        ),
    )
    .unwrap();

    let mut models = parse_mindset(&mindset_path).unwrap();
    assert_eq!(models.len(), 1);

    models[0].realize(dir.path()).unwrap();
    let realized = models[0].chain.as_ref().expect("chain should realize");
    assert_eq!(realized.count(), 1);

    let filtered = models[0].filter_by_tag("chat").expect("tag should match");
    assert_eq!(filtered.count(), 1);
    assert!(models[0].filter_by_tag("other").is_none());
}

#[test]
fn test_json_snapshot_export() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    let mut chain = Chain::new();
    chain.learn("key", "value");
    chain.export_to_json(&path).unwrap();

    let json = std::fs::read_to_string(&path).unwrap();
    assert!(json.contains("\"fingerprint\""));
    assert!(json.contains("\"key\""));
}
