//! Secret references in configuration values.
//!
//! - `pass::path/in/store`: first line of `pass show path/in/store`
//! - `env::VAR_NAME`: the value of `$VAR_NAME`
//! - anything else is used verbatim

use std::process::Command;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to run `pass show {path}`: {source}")]
    PassSpawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`pass show {path}` failed ({status}): {stderr}")]
    PassFailed {
        path: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("`pass show {path}` produced no output")]
    PassEmpty { path: String },

    #[error("environment variable `{var}` is not set")]
    EnvMissing { var: String },
}

/// Expands `value` if it is a secret reference.
pub fn resolve(value: &str) -> Result<String, SecretError> {
    if let Some(path) = value.strip_prefix("pass::") {
        from_pass(path)
    } else if let Some(var) = value.strip_prefix("env::") {
        std::env::var(var).map_err(|_| SecretError::EnvMissing {
            var: var.to_string(),
        })
    } else {
        Ok(value.to_string())
    }
}

fn from_pass(path: &str) -> Result<String, SecretError> {
    let output = Command::new("pass")
        .args(["show", path])
        .output()
        .map_err(|source| SecretError::PassSpawn {
            path: path.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(SecretError::PassFailed {
            path: path.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SecretError::PassEmpty {
            path: path.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_values_pass_through() {
        assert_eq!(resolve("s3cret").unwrap(), "s3cret");
        assert_eq!(resolve("").unwrap(), "");
        assert_eq!(
            resolve("abc.apps.googleusercontent.com").unwrap(),
            "abc.apps.googleusercontent.com"
        );
    }

    #[test]
    fn env_reference() {
        unsafe {
            std::env::set_var("_CALSTATS_SECRET_TEST", "from-env");
        }
        assert_eq!(resolve("env::_CALSTATS_SECRET_TEST").unwrap(), "from-env");
        unsafe {
            std::env::remove_var("_CALSTATS_SECRET_TEST");
        }
    }

    #[test]
    fn missing_env_var() {
        let err = resolve("env::_CALSTATS_SURELY_UNSET_9876").unwrap_err();
        assert!(matches!(err, SecretError::EnvMissing { .. }));
        assert!(err.to_string().contains("not set"));
    }

    #[test]
    fn pass_failure_is_an_error() {
        // Fails whether or not `pass` is installed.
        assert!(resolve("pass::calstats/does/not/exist/9876").is_err());
    }
}
