//! Mindset loader — `.jellyfish` files
//!
//! A mindset file is a line-oriented list of model records:
//!
//! ```text
//! model('greeter') {
//!   description: 'Small talk responder'
//!   tags: ['chat', 'greeting']
//!   models: ['greeter.fish']
//!   confidence_threshold: 0.4
//! }
//! ```
//!
//! A record opens with `model('name')`, carries indented `key: value` lines,
//! and closes with a line containing `}`. Values may use either quote form;
//! lists are bracketed and comma-separated. Unknown keys are ignored; tags
//! and model references past their caps are discarded silently.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chain::Chain;
use crate::codec;
use crate::error::Result;

/// Maximum number of tags kept per model record.
pub const MAX_TAGS: usize = 8;

/// Maximum number of chain file references kept per model record.
pub const MAX_MODELS: usize = 8;

/// A named model record parsed from a mindset file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub description: String,
    pub activation_condition: String,
    pub source_uri: String,
    pub origin_device_id: String,
    pub version: String,
    pub content_hash: String,
    pub state_machine: String,
    pub created_at: u64,
    pub updated_at: u64,
    pub trust_score: f32,
    pub immutable: bool,
    pub priority: i32,
    pub confidence_threshold: f32,
    pub tags: Vec<String>,
    /// Referenced chain file names, resolved against a base directory by
    /// [`ModelDescriptor::realize`].
    pub models: Vec<String>,
    /// The loaded chain, once realized.
    #[serde(skip)]
    pub chain: Option<Chain>,
}

impl ModelDescriptor {
    /// Load the first referenced chain file that exists under `base_dir`.
    /// Leaves `chain` untouched when none resolve.
    pub fn realize(&mut self, base_dir: impl AsRef<Path>) -> Result<()> {
        for name in &self.models {
            let path = base_dir.as_ref().join(name);
            if path.is_file() {
                self.chain = Some(codec::load(&path)?);
                debug!(model = %self.name, file = %name, "realized model chain");
                return Ok(());
            }
        }
        warn!(model = %self.name, "no referenced chain file found");
        Ok(())
    }

    /// A copy of the realized chain if `tag` is among this model's tags.
    pub fn filter_by_tag(&self, tag: &str) -> Option<Chain> {
        if self.tags.iter().any(|t| t == tag) {
            self.chain.clone()
        } else {
            None
        }
    }
}

/// Parse a mindset file into model records.
pub fn parse_mindset(path: impl AsRef<Path>) -> Result<Vec<ModelDescriptor>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let models = parse_mindset_str(&text);
    debug!(path = %path.display(), models = models.len(), "parsed mindset");
    Ok(models)
}

/// Parse mindset text into model records.
pub fn parse_mindset_str(text: &str) -> Vec<ModelDescriptor> {
    let mut models: Vec<ModelDescriptor> = Vec::new();
    let mut in_model = false;

    for raw in text.lines() {
        let line = raw.trim();

        if let Some(rest) = line.strip_prefix("model(") {
            let mut model = ModelDescriptor::default();
            model.name = quoted_name(rest).unwrap_or_default().to_owned();
            models.push(model);
            in_model = true;
            continue;
        }

        if !in_model {
            continue;
        }
        if line.contains('}') {
            in_model = false;
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if let Some(model) = models.last_mut() {
            apply_field(model, key.trim(), value);
        }
    }

    models
}

/// Text between the first pair of single quotes.
fn quoted_name(rest: &str) -> Option<&str> {
    let start = rest.find('\'')?;
    let tail = &rest[start + 1..];
    let end = tail.find('\'')?;
    Some(&tail[..end])
}

fn apply_field(model: &mut ModelDescriptor, key: &str, value: &str) {
    match key {
        "description" => model.description = unquote(value).to_owned(),
        "activation_condition" => model.activation_condition = unquote(value).to_owned(),
        "source_uri" => model.source_uri = unquote(value).to_owned(),
        "origin_device_id" => model.origin_device_id = unquote(value).to_owned(),
        "version" => model.version = unquote(value).to_owned(),
        "content_hash" => model.content_hash = unquote(value).to_owned(),
        "state_machine" => model.state_machine = unquote(value).to_owned(),
        "created_at" => model.created_at = leading_u64(unquote(value)),
        "updated_at" => model.updated_at = leading_u64(unquote(value)),
        "trust_score" => model.trust_score = leading_f32(unquote(value)),
        "immutable" => model.immutable = leading_i64(unquote(value)) != 0,
        "priority" => model.priority = leading_i64(unquote(value)) as i32,
        "confidence_threshold" => model.confidence_threshold = leading_f32(unquote(value)),
        "tags" => model.tags = parse_list(value, MAX_TAGS),
        "models" => model.models = parse_list(value, MAX_MODELS),
        _ => {} // unknown keys are ignored
    }
}

/// Strip one leading quote of either form and cut at the last quote.
fn unquote(value: &str) -> &str {
    let v = value.trim_start();
    let v = v
        .strip_prefix('\'')
        .or_else(|| v.strip_prefix('"'))
        .unwrap_or(v);
    match v.rfind('\'').or_else(|| v.rfind('"')) {
        Some(end) => &v[..end],
        None => v.trim_end(),
    }
}

/// Bracketed, comma-separated list; items trimmed of spaces and quotes.
fn parse_list(value: &str, cap: usize) -> Vec<String> {
    let inner = match value.find('[') {
        Some(open) => &value[open + 1..],
        None => return Vec::new(),
    };
    let inner = inner.split(']').next().unwrap_or(inner);

    inner
        .split(',')
        .map(|item| item.trim_matches(|c| c == '\'' || c == '"' || c == ' ').to_owned())
        .filter(|item| !item.is_empty())
        .take(cap)
        .collect()
}

fn leading_u64(value: &str) -> u64 {
    let digits: &str = match value.find(|c: char| !c.is_ascii_digit()) {
        Some(end) => &value[..end],
        None => value,
    };
    digits.parse().unwrap_or(0)
}

fn leading_i64(value: &str) -> i64 {
    let mut end = 0;
    for (i, c) in value.char_indices() {
        if c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')) {
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    value[..end].parse().unwrap_or(0)
}

fn leading_f32(value: &str) -> f32 {
    let mut end = 0;
    for (i, c) in value.char_indices() {
        let numeric = c.is_ascii_digit()
            || c == '.'
            || c == 'e'
            || c == 'E'
            || ((c == '-' || c == '+') && i == 0);
        if numeric {
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    value[..end].parse().unwrap_or(0.0)
}
