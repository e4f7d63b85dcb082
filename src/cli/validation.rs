//! Input validation for CLI arguments

use anyhow::{bail, Result};
use std::path::Path;

/// Parse a `KEY=VALUE` pair; the value may be empty or contain `=`
pub fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

pub fn validate_entry_file(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("Entry file '{}' does not exist", path.display());
    }
    if !path.is_file() {
        bail!("Path '{}' is not a file", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_var() {
        assert_eq!(
            parse_var("TARGET=staging").unwrap(),
            ("TARGET".to_string(), "staging".to_string())
        );
        assert_eq!(
            parse_var("EXPR=a=b").unwrap(),
            ("EXPR".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_var("EMPTY=").unwrap().1, "");
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=x").is_err());
    }

    #[test]
    fn test_validate_entry_file() {
        let temp = TempDir::new().unwrap();
        assert!(validate_entry_file(temp.path()).is_err());
        assert!(validate_entry_file(&temp.path().join("absent.yml")).is_err());

        let file = temp.path().join("entry.yml");
        std::fs::write(&file, "name: x").unwrap();
        assert!(validate_entry_file(&file).is_ok());
    }
}
