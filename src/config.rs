//! Step inputs and their validation.
//!
//! The pipeline exposes each input as an environment variable. [`Configuration::from_env`]
//! is the loader: once it returns `Ok`, every required field is non-empty and the paths
//! exist, and nothing downstream checks them again.

use crate::env::Environment;
use std::fmt;
use std::str::FromStr;

/// Environment variable names for each input.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const APP: &str = "app";
    pub const FRAMEWORK: &str = "framework";
    pub const DEVICES: &str = "devices";
    pub const SERIES: &str = "series";
    pub const LOCALE: &str = "locale";
    pub const APP_PATH: &str = "app_path";
    pub const DSYM_DIR: &str = "dsym_dir";
    pub const TEST_DIR: &str = "test_dir";
    pub const ASYNC: &str = "async";
    pub const ADDITIONAL_OPTIONS: &str = "additional_options";
}

const REDACTED: &str = "*****";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}: required variable is not present")]
    Missing(&'static str),

    #[error("{key}: value '{value}' is not allowed, expected one of [{allowed}]")]
    InvalidValue {
        key: &'static str,
        value: String,
        allowed: String,
    },

    #[error("{key}: file does not exist: {path}")]
    NotAFile { key: &'static str, path: String },

    #[error("{key}: directory does not exist: {path}")]
    NotADirectory { key: &'static str, path: String },
}

/// Test frameworks the upload tool knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestFramework {
    Appium,
    Calabash,
    Espresso,
    Xcuitest,
    Uitest,
}

impl TestFramework {
    pub const ALL: [TestFramework; 5] = [
        TestFramework::Appium,
        TestFramework::Calabash,
        TestFramework::Espresso,
        TestFramework::Xcuitest,
        TestFramework::Uitest,
    ];

    /// Name as the upload tool spells it on its command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestFramework::Appium => "appium",
            TestFramework::Calabash => "calabash",
            TestFramework::Espresso => "espresso",
            TestFramework::Xcuitest => "xcuitest",
            TestFramework::Uitest => "uitest",
        }
    }
}

impl fmt::Display for TestFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestFramework {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestFramework::ALL
            .into_iter()
            .find(|framework| framework.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: keys::FRAMEWORK,
                value: s.to_string(),
                allowed: TestFramework::ALL
                    .iter()
                    .map(TestFramework::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Validated step inputs, constructed once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub token: String,
    pub app: String,
    pub framework: TestFramework,
    pub devices: String,
    pub series: String,
    pub locale: String,
    pub app_path: String,
    /// Empty when there are no debug symbols to upload.
    pub dsym_dir: String,
    pub test_dir: String,
    /// Raw value of the `async` input. Only the exact string `false` disables async mode.
    pub async_mode: String,
    /// Extra arguments for the upload tool, shell-quoted as one string.
    pub additional_options: String,
}

impl Configuration {
    /// Load and validate the configuration from `env`.
    ///
    /// Path checks resolve relative values against `env.current_dir`, but the values
    /// are stored as given.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found, checking fields in declaration order.
    pub fn from_env(env: &Environment) -> Result<Self, ConfigError> {
        let token = required(env, keys::TOKEN)?;
        let app = required(env, keys::APP)?;
        let framework = required(env, keys::FRAMEWORK)?.parse()?;
        let devices = required(env, keys::DEVICES)?;
        let series = required(env, keys::SERIES)?;
        let locale = required(env, keys::LOCALE)?;

        let app_path = required(env, keys::APP_PATH)?;
        if !env.resolve_path(&app_path).is_file() {
            return Err(ConfigError::NotAFile {
                key: keys::APP_PATH,
                path: app_path,
            });
        }

        let dsym_dir = optional(env, keys::DSYM_DIR);

        let test_dir = required(env, keys::TEST_DIR)?;
        if !env.resolve_path(&test_dir).is_dir() {
            return Err(ConfigError::NotADirectory {
                key: keys::TEST_DIR,
                path: test_dir,
            });
        }

        Ok(Self {
            token,
            app,
            framework,
            devices,
            series,
            locale,
            app_path,
            dsym_dir,
            test_dir,
            async_mode: optional(env, keys::ASYNC),
            additional_options: optional(env, keys::ADDITIONAL_OPTIONS),
        })
    }

    /// Whether the upload returns without waiting for test results.
    ///
    /// Empty and unrecognised values count as async.
    pub fn is_async(&self) -> bool {
        self.async_mode != "false"
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() { "" } else { REDACTED };
        writeln!(f, "Configs:")?;
        writeln!(f, "- {}: {}", keys::TOKEN, token)?;
        writeln!(f, "- {}: {}", keys::APP, self.app)?;
        writeln!(f, "- {}: {}", keys::FRAMEWORK, self.framework)?;
        writeln!(f, "- {}: {}", keys::DEVICES, self.devices)?;
        writeln!(f, "- {}: {}", keys::SERIES, self.series)?;
        writeln!(f, "- {}: {}", keys::LOCALE, self.locale)?;
        writeln!(f, "- {}: {}", keys::APP_PATH, self.app_path)?;
        writeln!(f, "- {}: {}", keys::DSYM_DIR, self.dsym_dir)?;
        writeln!(f, "- {}: {}", keys::TEST_DIR, self.test_dir)?;
        writeln!(f, "- {}: {}", keys::ASYNC, self.async_mode)?;
        write!(f, "- {}: {}", keys::ADDITIONAL_OPTIONS, self.additional_options)
    }
}

fn required(env: &Environment, key: &'static str) -> Result<String, ConfigError> {
    match env.get_var(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn optional(env: &Environment, key: &str) -> String {
    env.get_var(key).unwrap_or_default()
}
