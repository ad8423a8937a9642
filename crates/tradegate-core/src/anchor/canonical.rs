use crate::error::EngineError;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Rebuild a JSON value with every object's keys sorted, recursively.
///
/// Hashing runs over this form so the digest depends on content only,
/// never on the key order a producer happened to serialize with.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted = Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                if let Some(inner) = map.get(key) {
                    sorted.insert(key.clone(), canonicalize(inner));
                }
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// SHA-256 hex digest of the canonical serialization.
pub fn canonical_digest(value: &Value) -> Result<String, EngineError> {
    let canonical = canonicalize(value);
    let bytes = serde_json::to_vec(&canonical)
        .map_err(|e| EngineError::Serialization(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digest_ignores_key_order() {
        let a = json!({"beta": 2, "alpha": {"z": true, "a": [1, {"y": 0, "x": 1}]}});
        let b = json!({"alpha": {"a": [1, {"x": 1, "y": 0}], "z": true}, "beta": 2});

        assert_eq!(canonical_digest(&a).unwrap(), canonical_digest(&b).unwrap());
    }

    #[test]
    fn digest_is_stable_across_calls() {
        let value = json!({"deal_id": "d-1", "value_minor": 12_000_000});
        assert_eq!(
            canonical_digest(&value).unwrap(),
            canonical_digest(&value).unwrap()
        );
    }

    #[test]
    fn different_content_yields_different_digest() {
        let a = json!({"deal_id": "d-1"});
        let b = json!({"deal_id": "d-2"});
        assert_ne!(canonical_digest(&a).unwrap(), canonical_digest(&b).unwrap());
    }

    #[test]
    fn digest_is_sha256_hex() {
        let digest = canonical_digest(&json!({})).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
