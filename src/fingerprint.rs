//! Fingerprint mixer - per-block audit witness
//!
//! A fast non-cryptographic mixer mapping (input, output, nonce, device salt)
//! to 32 bytes. Two 64-bit FNV-style states absorb the input and output
//! independently, then six cross-mixing rounds diffuse them before byte
//! extraction. The device salt binds fingerprints to the machine that wrote
//! them; the nonce binds them to the moment of admission.
//!
//! Fingerprints are audit witnesses, not content addresses: the nonce makes
//! two admissions of the same (input, output) pair produce different bytes.
//! For identical (input, output, nonce, salt) the output is byte-for-byte
//! reproducible.

use std::sync::OnceLock;

use chrono::Utc;

/// Size of a block fingerprint in bytes.
pub const HASH_SIZE: usize = 32;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_OFFSET_SWAPPED: u64 = 0x84222325cbf29ce4;
const PRIME: u64 = 0x100000001b3;

static DEVICE_SALT: OnceLock<u64> = OnceLock::new();

#[cfg(windows)]
const SALT_ENV_VARS: &[&str] = &["USERNAME", "USERPROFILE", "COMPUTERNAME"];
#[cfg(not(windows))]
const SALT_ENV_VARS: &[&str] = &["USER", "HOME", "SHELL", "HOSTNAME"];

/// FNV-1a 64-bit reduction over the platform's identity environment variables.
fn salt_from_env() -> u64 {
    let mut hash = FNV_OFFSET;
    for var in SALT_ENV_VARS {
        if let Ok(value) = std::env::var(var) {
            for byte in value.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(PRIME);
            }
        }
    }
    hash
}

/// Pin the process-wide device salt to a fixed value.
///
/// Must be called before the first fingerprint is computed; returns `false`
/// if the salt was already initialized. Intended for tests and replay tools
/// that need deterministic fingerprints across runs.
pub fn init_device_salt(salt: u64) -> bool {
    DEVICE_SALT.set(salt).is_ok()
}

/// The process-wide device salt, derived from the environment on first use.
pub fn device_salt() -> u64 {
    *DEVICE_SALT.get_or_init(salt_from_env)
}

/// Microsecond-resolution admission nonce.
pub(crate) fn nonce_micros() -> u64 {
    Utc::now().timestamp_micros() as u64
}

/// Mix (input, output, nonce) into a 32-byte fingerprint under the process
/// device salt.
pub fn mix(input: &[u8], output: &[u8], nonce: u64) -> [u8; HASH_SIZE] {
    let salt = device_salt();

    let mut state1 = FNV_OFFSET ^ salt;
    let mut state2 = FNV_OFFSET_SWAPPED ^ !salt;

    for &byte in input {
        state1 ^= u64::from(byte);
        state1 = state1.wrapping_mul(PRIME);
        state1 ^= state1 >> 27;
        state1 ^= state1 << 33;
    }

    for &byte in output {
        state2 ^= u64::from(byte);
        state2 = state2.wrapping_mul(PRIME);
        state2 ^= state2 >> 29;
        state2 ^= state2 << 31;
    }

    // Nonce and length entropy
    state1 ^= nonce ^ ((input.len() as u64) << 32);
    state2 ^= !nonce ^ ((output.len() as u64) << 16);

    // Cross-mixing rounds
    for _ in 0..6 {
        state1 = state1.wrapping_add(state2 ^ (state1 >> 17));
        state2 = state2.wrapping_add(state1 ^ (state2 >> 13));
        state1 ^= state1 << 41;
        state2 ^= state2 << 37;
        state1 = state1.wrapping_mul(PRIME);
        state2 = state2.wrapping_mul(PRIME);
    }

    let mut out = [0u8; HASH_SIZE];
    for (i, slot) in out.iter_mut().enumerate() {
        let mut mixed = if i % 2 == 0 { state1 } else { state2 };
        mixed ^= mixed >> ((i % 7) + 13);
        mixed = mixed.wrapping_mul(PRIME);
        mixed ^= salt;
        *slot = (mixed >> (8 * (i % 8))) as u8;
    }
    out
}

/// Lowercase hex rendering of a byte slice, no separators.
pub(crate) fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
