//! State snapshot codec
//!
//! Checkpoints carry the execution state as JSON text. JSON keeps stored
//! snapshots readable from any SQLite shell and round-trips every
//! serde-derived type exactly, which resume depends on.

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};

/// Encode a state value into its stored snapshot form
pub fn encode_state<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a stored snapshot back into a state value
pub fn decode_state<T: DeserializeOwned>(snapshot: &str) -> Result<T> {
    Ok(serde_json::from_str(snapshot)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckpointError;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestData {
        name: String,
        value: i32,
        tags: Vec<String>,
        extra: BTreeMap<String, Option<f64>>,
    }

    #[test]
    fn test_state_round_trip() {
        let data = TestData {
            name: "test".to_string(),
            value: 42,
            tags: vec!["a".to_string(), "b".to_string()],
            extra: BTreeMap::from([("x".to_string(), Some(1.5)), ("y".to_string(), None)]),
        };

        let snapshot = encode_state(&data).unwrap();
        let restored: TestData = decode_state(&snapshot).unwrap();

        assert_eq!(data, restored);
    }

    #[test]
    fn test_snapshot_is_json_text() {
        let snapshot = encode_state(&vec!["a", "b"]).unwrap();
        assert_eq!(snapshot, r#"["a","b"]"#);
    }

    #[test]
    fn test_malformed_snapshot() {
        let err = decode_state::<TestData>("{\"name\": ").unwrap_err();
        assert!(matches!(err, CheckpointError::Serialization(_)));
    }

    #[test]
    fn test_shape_mismatch() {
        let err = decode_state::<TestData>(r#"{"unrelated": true}"#).unwrap_err();
        assert!(matches!(err, CheckpointError::Serialization(_)));
    }
}
