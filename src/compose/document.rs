//! YAML document load/store
//!
//! Both Pangolin files are edited as untyped [`serde_yaml::Value`] trees so
//! that fields this service does not know about survive the round trip, in
//! their original key order.

use crate::error::EditError;
use serde_yaml::Value;
use std::path::Path;

/// Read and parse the YAML document at `path`
pub fn load(path: &Path) -> Result<Value, EditError> {
    let content = std::fs::read_to_string(path).map_err(|e| EditError::io(path, e))?;
    parse_str(path, &content)
}

/// Parse YAML text; `path` is only used for error reporting
pub fn parse_str(path: &Path, content: &str) -> Result<Value, EditError> {
    serde_yaml::from_str(content).map_err(|e| EditError::parse(path, e))
}

/// Serialize `document` and overwrite `path` with it
pub fn store(path: &Path, document: &Value) -> Result<(), EditError> {
    let content = serde_yaml::to_string(document).map_err(|e| EditError::parse(path, e))?;
    std::fs::write(path, content).map_err(|e| EditError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_store_preserves_key_order() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("doc.yml");
        std::fs::write(&path, "zeta: 1\nalpha: 2\nmiddle:\n  b: 1\n  a: 2\n").unwrap();

        let doc = load(&path).unwrap();
        store(&path, &doc).unwrap();

        let written = load(&path).unwrap();
        let top: Vec<_> = written
            .as_mapping()
            .unwrap()
            .keys()
            .map(|k| k.as_str().unwrap())
            .collect();
        assert_eq!(top, vec!["zeta", "alpha", "middle"]);
        let nested: Vec<_> = written["middle"]
            .as_mapping()
            .unwrap()
            .keys()
            .map(|k| k.as_str().unwrap())
            .collect();
        assert_eq!(nested, vec!["b", "a"]);
        assert_eq!(written, doc);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let temp = tempdir().unwrap();
        let result = load(&temp.path().join("absent.yml"));
        assert!(matches!(result, Err(EditError::Io { .. })));
    }

    #[test]
    fn test_load_malformed_yaml_is_parse_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("bad.yml");
        std::fs::write(&path, "services: [unclosed\n").unwrap();

        assert!(matches!(load(&path), Err(EditError::Parse { .. })));
    }
}
