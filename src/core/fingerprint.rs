use serde_json::Value;
use sha2::{Digest, Sha256};

/// Content fingerprint of a deck payload.
///
/// The payload is serialized canonically (object keys sorted at every depth,
/// no whitespace) before hashing, so two payloads that differ only in key
/// order produce the same fingerprint.
pub fn fingerprint(project: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(project, &mut canonical);
    checksum_bytes(canonical.as_bytes())
}

pub fn checksum_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (position, key) in keys.into_iter().enumerate() {
                if position > 0 {
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
            for (position, item) in items.iter().enumerate() {
                if position > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
