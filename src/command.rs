use anyhow::{Context, Result};
use std::fmt;
use std::io::Write;
use std::process::{Command, ExitStatus, Stdio};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Abstraction over a writable output stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// A blanket implementation exists for any type that implements `Write` and `Into<Stdio>`
/// (e.g. `std::io::Stdout` or `std::io::Stderr`), which lets a child write straight to
/// the step's own streams.
pub trait Stdout: Write {
    /// Convert this output into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Write + Into<Stdio>> Stdout for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// A program name together with its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Render the invocation as a copy-pasteable shell line.
    ///
    /// With `redact_after` set, the argument following that flag is masked.
    pub fn printable(&self, redact_after: Option<&str>) -> String {
        let mut line = quote(&self.program);
        let mut masked = false;
        for arg in &self.args {
            line.push(' ');
            if masked {
                line.push_str("*****");
            } else {
                line.push_str(&quote(arg));
            }
            masked = redact_after.is_some_and(|flag| flag == arg.as_str());
        }
        line
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.printable(None))
    }
}

fn quote(arg: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "-_./=:,@+%".contains(c);
    if !arg.is_empty() && arg.chars().all(safe) {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Runs an [`Invocation`] to completion with the given output sinks.
pub trait ProcessExecutor {
    /// Spawn the process and block until it exits.
    ///
    /// Returns the exit code; an `Err` means the process could not be started or waited on.
    fn execute(
        &self,
        invocation: &Invocation,
        stdout: Box<dyn Stdout>,
        stderr: Box<dyn Stdout>,
    ) -> Result<ExitCode>;
}

/// Executor backed by real operating system processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl ProcessExecutor for SystemExecutor {
    fn execute(
        &self,
        invocation: &Invocation,
        stdout: Box<dyn Stdout>,
        stderr: Box<dyn Stdout>,
    ) -> Result<ExitCode> {
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::inherit())
            .stdout(stdout.stdio())
            .stderr(stderr.stdio())
            .spawn()
            .with_context(|| format!("can't start {}", invocation.program))?;
        let exit_status = child
            .wait()
            .with_context(|| format!("can't wait for {}", invocation.program))?;
        Ok(exit_code(exit_status))
    }
}

/// Run `invocation` with both output streams captured.
///
/// Returns the exit code and the trimmed output, stdout followed by stderr.
pub fn run_captured(invocation: &Invocation) -> Result<(ExitCode, String)> {
    let output = Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("can't start {}", invocation.program))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok((exit_code(output.status), combined.trim().to_string()))
}

fn exit_code(exit_status: ExitStatus) -> ExitCode {
    match exit_status.code() {
        Some(x) => x,
        None => terminated_by_signal(exit_status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}
