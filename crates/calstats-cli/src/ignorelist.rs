//! Loading the ignore-pattern file.

use std::path::{Path, PathBuf};

use calstats_core::IgnorePatterns;
use tracing::{debug, warn};

use crate::error::{CliError, CliResult};

/// File read when no ignore list is configured.
pub const DEFAULT_IGNORELIST: &str = "ignorelist";

/// Loads ignore patterns.
///
/// An explicitly configured file must exist. When falling back to
/// `./ignorelist`, a missing file means no patterns.
pub fn load(explicit: Option<&Path>) -> CliResult<IgnorePatterns> {
    let (path, explicit) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_IGNORELIST), false),
    };

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "ignore list not found, no events will be ignored");
            return Ok(IgnorePatterns::default());
        }
        Err(e) => {
            return Err(CliError::Config(format!(
                "failed to read ignore list {}: {}",
                path.display(),
                e
            )));
        }
    };

    let patterns = IgnorePatterns::from_lines(&content)?;
    debug!(path = %path.display(), count = patterns.len(), "loaded ignore list");
    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_patterns_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ignorelist");
        std::fs::write(&path, "# recurring noise\n1:1.*\n\nLunch\n").unwrap();

        let patterns = load(Some(path.as_path())).unwrap();
        assert_eq!(patterns.len(), 2);
        assert!(patterns.matches("1:1 with Bob"));
        assert!(patterns.matches("Lunch"));
        assert!(!patterns.matches("Team lunch"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(dir.path().join("nope").as_path())).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn bad_pattern_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ignorelist");
        std::fs::write(&path, "(unclosed\n").unwrap();
        assert!(matches!(load(Some(path.as_path())).unwrap_err(), CliError::Config(_)));
    }
}
