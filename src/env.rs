use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Snapshot of the process environment the step reads its inputs from.
///
/// The pipeline hands every step input over as an environment variable, so this is
/// the single place configuration and `PATH` lookups come from. Tests build one with
/// [`Environment::from_vars`] to stay isolated from the real process.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, token, app_path).
    pub vars: HashMap<String, String>,
    /// Directory relative paths are resolved against.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::from_os_vars(stdenv::vars_os(), current_dir)
    }

    /// Build an environment from raw OS variables.
    ///
    /// Entries whose name or value is not valid UTF-8 can't be step inputs and are skipped.
    pub fn from_os_vars<I>(vars: I, current_dir: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let vars = vars
            .into_iter()
            .filter_map(|(k, v)| match (k.into_string(), v.into_string()) {
                (Ok(k), Ok(v)) => Some((k, v)),
                (k, _) => {
                    log::debug!("skipping non UTF-8 environment variable {k:?}");
                    None
                }
            });
        Self::from_vars(vars, current_dir)
    }

    /// Build an environment from explicit variables.
    pub fn from_vars<I, K, V>(vars: I, current_dir: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            current_dir: current_dir.into(),
        }
    }

    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Join a relative path onto `current_dir`; absolute paths pass through.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir.join(path)
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_set_and_get_var() {
        let mut env = Environment::from_vars(Vec::<(String, String)>::new(), "/");

        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        env.set_var("KEY", "VALUE");

        assert_eq!(env.get_var("KEY"), Some("VALUE".to_string()));
    }

    #[test]
    fn test_env_does_not_leak_process_vars() {
        let env = Environment::from_vars([("token", "abc")], "/");
        assert_eq!(env.get_var("PATH"), None);
        assert_eq!(env.get_var("token"), Some("abc".to_string()));
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
    }

    #[test]
    #[cfg(unix)]
    fn test_non_utf8_vars_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let env = Environment::from_os_vars(
            [
                (OsString::from("JUNK"), OsString::from_vec(vec![0xff, 0xfe])),
                (OsString::from_vec(vec![0xff]), OsString::from("value")),
                (OsString::from("token"), OsString::from("abc")),
            ],
            "/",
        );

        assert_eq!(env.vars.len(), 1);
        assert_eq!(env.get_var("JUNK"), None);
        assert_eq!(env.get_var("token"), Some("abc".to_string()));
    }

    #[test]
    #[cfg(unix)]
    fn test_resolve_path() {
        let env = Environment::from_vars(Vec::<(String, String)>::new(), "/work");
        assert_eq!(env.resolve_path("app.apk"), PathBuf::from("/work/app.apk"));
        assert_eq!(env.resolve_path("/tmp/app.apk"), PathBuf::from("/tmp/app.apk"));
    }
}
