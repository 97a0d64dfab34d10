//! Canonical cache keys
//!
//! A fingerprint is `endpointName(args)` where `args` is rendered as JSON with
//! object keys sorted at every depth. Two argument values that are deeply
//! equal fingerprint identically no matter how their keys were ordered.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

/// Canonical key for one (endpoint, arguments) pair.
///
/// Cloning only bumps a reference count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(Rc<str>);

impl Fingerprint {
    /// Build the fingerprint for `endpoint` called with `args`
    pub fn new(endpoint: &str, args: &Value) -> Self {
        let mut out = String::with_capacity(endpoint.len() + 16);
        out.push_str(endpoint);
        out.push('(');
        write_canonical(args, &mut out);
        out.push(')');
        Self(out.into())
    }

    /// Wrap an already-built key
    pub fn from_raw(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The endpoint part of the key
    pub fn endpoint(&self) -> &str {
        self.0.split_once('(').map_or(&self.0, |(name, _)| name)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialize `value` with sorted object keys.
///
/// `serde_json::Map` iterates in insertion order under the `preserve_order`
/// feature, so keys are sorted here explicitly.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
