//! Chain file codec — `.fish` format
//!
//! Textual key/value records with a fixed signature and field ordering.
//! Loading is atomic: any malformed field aborts and the destination chain
//! is never observed half-populated.
//!
//! ## Document layout
//!
//! ```text
//! {
//!   "signature": "JFS1",
//!   "version": "1.0.0",
//!   "origin_device_id": "<16 bytes hex>",
//!   "created_at": <u64>,
//!   "updated_at": <u64>,
//!   "blocks": [ { ...13 keys in fixed order... }, ... ]
//! }
//! ```
//!
//! Hex fields are lowercase, two digits per byte, no separators. Inside
//! string values a backslash escapes `"` and `\`. `previous_hash` is the
//! prior block's fingerprint, or 32 zero bytes for block 0. Confidence is
//! written with six fractional digits. Files are read and written without
//! newline translation, so round-trips are byte-exact across platforms.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::block::{Block, InputText, OutputText, DEVICE_ID_SIZE, SIGNATURE_SIZE};
use crate::chain::{Chain, MAX_MEM};
use crate::error::{Error, Result};
use crate::fingerprint::{hex_string, HASH_SIZE};

// ── Constants ──────────────────────────────────────────────────────

/// Fixed header signature of a chain file.
pub const FILE_SIGNATURE: &str = "JFS1";

/// Version string written on save. Any quoted version is accepted on load.
pub const FILE_VERSION: &str = "1.0.0";

/// Largest chain file accepted by [`load`].
pub const MAX_FILE_SIZE: usize = 1024 * 1024;

// ── Public API ─────────────────────────────────────────────────────

/// Write `chain` to `path` in `.fish` format.
pub fn save(chain: &Chain, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, encode(chain).as_bytes())?;
    debug!(path = %path.display(), blocks = chain.count(), "saved chain");
    Ok(())
}

/// Read a chain from `path`, rejecting files over [`MAX_FILE_SIZE`].
pub fn load(path: impl AsRef<Path>) -> Result<Chain> {
    let path = path.as_ref();
    let bytes = fs::metadata(path)?.len();
    if bytes > MAX_FILE_SIZE as u64 {
        return Err(Error::FileTooLarge {
            bytes: bytes as usize,
            limit: MAX_FILE_SIZE,
        });
    }

    let text = fs::read_to_string(path)?;
    let chain = decode(&text)?;
    debug!(path = %path.display(), blocks = chain.count(), "loaded chain");
    Ok(chain)
}

/// Render a chain as `.fish` document text.
pub fn encode(chain: &Chain) -> String {
    let mut out = String::with_capacity(256 + chain.count() * 640);

    out.push_str("{\n");
    out.push_str(&format!("  \"signature\": \"{FILE_SIGNATURE}\",\n"));
    out.push_str(&format!("  \"version\": \"{FILE_VERSION}\",\n"));
    out.push_str(&format!(
        "  \"origin_device_id\": \"{}\",\n",
        hex_string(&chain.device_id)
    ));
    out.push_str(&format!("  \"created_at\": {},\n", chain.created_at));
    out.push_str(&format!("  \"updated_at\": {},\n", chain.updated_at));
    out.push_str("  \"blocks\": [\n");

    for (i, block) in chain.blocks.iter().enumerate() {
        let previous_hash = if i > 0 {
            hex_string(&chain.blocks[i - 1].hash)
        } else {
            "0".repeat(HASH_SIZE * 2)
        };

        out.push_str("    {\n");
        out.push_str(&format!("      \"block_index\": {i},\n"));
        out.push_str(&format!("      \"input\": \"{}\",\n", escape(&block.input)));
        out.push_str(&format!("      \"output\": \"{}\",\n", escape(&block.output)));
        out.push_str(&format!("      \"hash\": \"{}\",\n", hex_string(&block.hash)));
        out.push_str(&format!("      \"previous_hash\": \"{previous_hash}\",\n"));
        out.push_str(&format!("      \"timestamp\": {},\n", block.timestamp));
        out.push_str(&format!("      \"delta_ms\": {},\n", block.delta_ms));
        out.push_str(&format!("      \"duration_ms\": {},\n", block.duration_ms));
        out.push_str(&format!("      \"valid\": {},\n", i32::from(block.valid)));
        out.push_str(&format!("      \"confidence\": {:.6},\n", block.confidence));
        out.push_str(&format!("      \"usage_count\": {},\n", block.usage_count));
        out.push_str(&format!(
            "      \"device_id\": \"{}\",\n",
            hex_string(&block.device_id)
        ));
        out.push_str(&format!(
            "      \"signature\": \"{}\"\n",
            hex_string(&block.signature)
        ));
        out.push_str(&format!(
            "    }}{}\n",
            if i + 1 < chain.count() { "," } else { "" }
        ));
    }

    out.push_str("  ]\n");
    out.push_str("}\n");
    out
}

/// Parse `.fish` document text into a fresh chain.
pub fn decode(text: &str) -> Result<Chain> {
    let mut s = Scanner::new(text);

    s.accept_symbol(b'{');
    s.expect_key("signature")?;
    let signature = s.parse_string()?;
    if signature != FILE_SIGNATURE {
        return Err(Error::Parse(format!("bad file signature: {signature:?}")));
    }

    s.expect_key("version")?;
    let _version = s.parse_string()?;

    s.expect_key("origin_device_id")?;
    let device_id: [u8; DEVICE_ID_SIZE] = s.parse_hex()?;

    s.expect_key("created_at")?;
    let created_at = s.parse_u64()?;
    s.expect_key("updated_at")?;
    let updated_at = s.parse_u64()?;

    s.expect_key("blocks")?;
    s.expect_symbol(b'[')?;

    let mut blocks = Vec::new();
    loop {
        if s.accept_symbol(b']') {
            break;
        }
        if blocks.len() >= MAX_MEM {
            return Err(Error::Parse(format!("more than {MAX_MEM} block records")));
        }
        blocks.push(parse_block(&mut s)?);
    }
    s.accept_symbol(b'}');

    Ok(Chain {
        blocks,
        device_id,
        created_at,
        updated_at,
    })
}

// ── Block record ───────────────────────────────────────────────────

fn parse_block(s: &mut Scanner<'_>) -> Result<Block> {
    s.expect_symbol(b'{')?;

    s.expect_key("block_index")?;
    let _index = s.parse_u64()?;

    s.expect_key("input")?;
    let input = s.parse_string()?;
    s.expect_key("output")?;
    let output = s.parse_string()?;

    s.expect_key("hash")?;
    let hash: [u8; HASH_SIZE] = s.parse_hex()?;
    s.expect_key("previous_hash")?;
    let _previous: [u8; HASH_SIZE] = s.parse_hex()?;

    s.expect_key("timestamp")?;
    let timestamp = s.parse_u64()?;
    s.expect_key("delta_ms")?;
    let delta_ms = s.parse_u32()?;
    s.expect_key("duration_ms")?;
    let duration_ms = s.parse_u32()?;

    s.expect_key("valid")?;
    let valid = s.parse_i64()? != 0;
    s.expect_key("confidence")?;
    let confidence = s.parse_f64()? as f32;
    s.expect_key("usage_count")?;
    let usage_count = s.parse_u32()?;

    s.expect_key("device_id")?;
    let device_id: [u8; DEVICE_ID_SIZE] = s.parse_hex()?;
    s.expect_key("signature")?;
    let signature: [u8; SIGNATURE_SIZE] = s.parse_hex()?;

    s.expect_symbol(b'}')?;

    Ok(Block {
        input: InputText::new(&input),
        output: OutputText::new(&output),
        hash,
        timestamp,
        delta_ms,
        duration_ms,
        valid,
        confidence,
        usage_count,
        immutable: false,
        device_id,
        signature,
    })
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ── Scanner ────────────────────────────────────────────────────────

/// Incremental byte scanner over document text. Whitespace and the commas
/// between fields are insignificant; everything else is matched exactly.
struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn skip_separators(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_whitespace() || b == b',' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn accept_symbol(&mut self, symbol: u8) -> bool {
        self.skip_separators();
        if self.bytes.get(self.pos) == Some(&symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: u8) -> Result<()> {
        if self.accept_symbol(symbol) {
            Ok(())
        } else {
            Err(self.fail(&format!("expected '{}'", symbol as char)))
        }
    }

    /// Match `"key":` exactly.
    fn expect_key(&mut self, key: &str) -> Result<()> {
        self.expect_symbol(b'"')?;
        if !self.bytes[self.pos..].starts_with(key.as_bytes()) {
            return Err(self.fail(&format!("expected key {key:?}")));
        }
        self.pos += key.len();
        if self.bytes.get(self.pos) != Some(&b'"') {
            return Err(self.fail(&format!("unterminated key {key:?}")));
        }
        self.pos += 1;
        self.expect_symbol(b':')
    }

    /// Parse a quoted string; a backslash escapes the next byte.
    fn parse_string(&mut self) -> Result<String> {
        self.expect_symbol(b'"')?;
        let mut out = Vec::new();
        loop {
            match self.bytes.get(self.pos) {
                None => return Err(self.fail("unterminated string")),
                Some(&b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(&b'\\') if self.pos + 1 < self.bytes.len() => {
                    out.push(self.bytes[self.pos + 1]);
                    self.pos += 2;
                }
                Some(&b) => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
        String::from_utf8(out).map_err(|e| Error::Parse(format!("invalid UTF-8 in string: {e}")))
    }

    /// Parse a quoted fixed-width hex field into `N` bytes.
    fn parse_hex<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.expect_symbol(b'"')?;
        let mut out = [0u8; N];
        for slot in &mut out {
            let end = self.pos + 2;
            let digits = self
                .bytes
                .get(self.pos..end)
                .and_then(|pair| std::str::from_utf8(pair).ok())
                .ok_or_else(|| self.fail("truncated hex field"))?;
            *slot = u8::from_str_radix(digits, 16)
                .map_err(|_| self.fail(&format!("bad hex digits {digits:?}")))?;
            self.pos = end;
        }
        self.expect_symbol(b'"')?;
        Ok(out)
    }

    fn numeric_token(&mut self, pattern: fn(u8) -> bool) -> Result<&'a str> {
        self.skip_separators();
        let bytes = self.bytes;
        let start = self.pos;
        while let Some(&b) = bytes.get(self.pos) {
            if pattern(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.fail("expected a number"));
        }
        // Token bytes are a subset of ASCII by construction.
        std::str::from_utf8(&bytes[start..self.pos])
            .map_err(|e| Error::Parse(format!("invalid numeric token: {e}")))
    }

    fn parse_u64(&mut self) -> Result<u64> {
        let token = self.numeric_token(|b| b.is_ascii_digit())?;
        token
            .parse()
            .map_err(|_| Error::Parse(format!("bad integer {token:?}")))
    }

    fn parse_u32(&mut self) -> Result<u32> {
        let token = self.numeric_token(|b| b.is_ascii_digit())?;
        token
            .parse()
            .map_err(|_| Error::Parse(format!("bad integer {token:?}")))
    }

    fn parse_i64(&mut self) -> Result<i64> {
        let token = self.numeric_token(|b| b.is_ascii_digit() || b == b'-' || b == b'+')?;
        token
            .parse()
            .map_err(|_| Error::Parse(format!("bad integer {token:?}")))
    }

    fn parse_f64(&mut self) -> Result<f64> {
        let token = self.numeric_token(|b| {
            b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E')
        })?;
        token
            .parse()
            .map_err(|_| Error::Parse(format!("bad number {token:?}")))
    }

    fn fail(&self, message: &str) -> Error {
        Error::Parse(format!("{message} at byte {}", self.pos))
    }
}

// ── Tests ──────────────────────────────────────────────────────────
