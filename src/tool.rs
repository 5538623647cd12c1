use crate::command::{self, Invocation};
use crate::composer::TOOL_NAME;
use crate::env::Environment;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// npm package that provides the upload tool binary.
pub const INSTALL_PACKAGE: &str = "appcenter-cli";

/// The install command exited non-zero or could not be started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{output}")]
pub struct InstallError {
    /// Combined output of the install command, or the reason it did not start.
    pub output: String,
}

/// Availability check and installation of the upload tool.
pub trait ToolProvider {
    /// Whether the tool can be resolved right now.
    fn is_available(&self) -> bool;

    /// Install the tool. Blocks until the installer exits.
    fn install(&self) -> Result<(), InstallError>;

    /// The command `install` runs, for progress output.
    fn install_invocation(&self) -> Invocation;
}

/// Resolves the tool through `PATH` and installs it globally with npm.
#[derive(Debug, Clone)]
pub struct NpmToolProvider {
    env: Environment,
    tool: String,
    installer: Invocation,
}

impl NpmToolProvider {
    /// Provider for `appcenter`, installed with `npm install -g appcenter-cli`.
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            tool: TOOL_NAME.to_string(),
            installer: Invocation::new(
                "npm",
                vec![
                    "install".to_string(),
                    "-g".to_string(),
                    INSTALL_PACKAGE.to_string(),
                ],
            ),
        }
    }

    /// Replace the command `install` runs.
    pub fn with_installer(mut self, installer: Invocation) -> Self {
        self.installer = installer;
        self
    }
}

impl ToolProvider for NpmToolProvider {
    fn is_available(&self) -> bool {
        let search_paths = self.env.get_var("PATH").unwrap_or_default();
        find_command_path(OsStr::new(&search_paths), Path::new(&self.tool)).is_some()
    }

    fn install(&self) -> Result<(), InstallError> {
        match command::run_captured(&self.install_invocation()) {
            Ok((0, _)) => Ok(()),
            Ok((code, output)) => {
                log::debug!("{} exited with status {code}", self.installer.program);
                Err(InstallError { output })
            }
            Err(e) => Err(InstallError {
                output: format!("{e:#}"),
            }),
        }
    }

    fn install_invocation(&self) -> Invocation {
        self.installer.clone()
    }
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`): returns it if it exists.
/// - `./foo` on Unix or any `./`-prefixed path on other platforms: returns it if it exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first existing match.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(cmd))
        .find(|path| is_executable(path))
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
