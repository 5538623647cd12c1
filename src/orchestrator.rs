use crate::command::{ExitCode, ProcessExecutor};
use crate::composer::{self, ComposeError, TOKEN_FLAG};
use crate::config::Configuration;
use crate::tool::{INSTALL_PACKAGE, InstallError, ToolProvider};

/// Why a step run failed. Every variant is terminal for the run.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("Failed to install appcenter-cli: {0}")]
    Install(InstallError),

    #[error("Failed to create upload command: {0}")]
    Compose(#[from] ComposeError),

    /// The upload tool could not be started or waited on.
    #[error("Upload failed, error: {0:#}")]
    Upload(anyhow::Error),

    #[error("Upload failed, exit status {0}")]
    UploadExit(ExitCode),
}

impl StepError {
    /// Process exit status to report for this failure. Never zero.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            StepError::UploadExit(code) if *code != 0 => *code,
            _ => 1,
        }
    }
}

/// Phases of a run, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CheckingTool,
    Installing,
    ToolReady,
    Composing,
    Executing,
    Done,
}

/// Drives one upload: make sure the tool exists, compose the command, run it.
///
/// Both collaborators are injected so the control flow can be exercised without
/// touching `PATH` or spawning processes.
pub struct Orchestrator<T, E> {
    tool: T,
    executor: E,
}

impl<T: ToolProvider, E: ProcessExecutor> Orchestrator<T, E> {
    pub fn new(tool: T, executor: E) -> Self {
        Self { tool, executor }
    }

    /// Run the step once. Sub-processes run strictly one after another and nothing is retried.
    ///
    /// The upload tool writes directly to this process's stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns the [`StepError`] for the first phase that failed.
    pub fn run(&self, cfg: &Configuration) -> Result<(), StepError> {
        enter(Stage::CheckingTool);
        if !self.tool.is_available() {
            enter(Stage::Installing);
            log::info!("Installing {INSTALL_PACKAGE}");
            log::info!("$ {}", self.tool.install_invocation());
            self.tool.install().map_err(StepError::Install)?;
        }
        enter(Stage::ToolReady);

        enter(Stage::Composing);
        let invocation = composer::upload_invocation(cfg)?;

        enter(Stage::Executing);
        log::info!("Uploading and scheduling tests");
        log::info!("$ {}", invocation.printable(Some(TOKEN_FLAG)));
        let code = self
            .executor
            .execute(
                &invocation,
                Box::new(std::io::stdout()),
                Box::new(std::io::stderr()),
            )
            .map_err(StepError::Upload)?;
        if code != 0 {
            return Err(StepError::UploadExit(code));
        }

        enter(Stage::Done);
        log::info!("Tests scheduled");
        Ok(())
    }
}

fn enter(stage: Stage) {
    log::debug!("stage: {stage:?}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Invocation, Stdout};
    use crate::config::TestFramework;
    use crate::config::tests::sample_config;
    use crate::lexer::LexingError;
    use std::cell::RefCell;

    struct FakeTool {
        available: bool,
        install_output: Option<&'static str>,
        installs: RefCell<usize>,
    }

    impl FakeTool {
        fn available() -> Self {
            Self {
                available: true,
                install_output: None,
                installs: RefCell::new(0),
            }
        }

        fn missing(install_output: Option<&'static str>) -> Self {
            Self {
                available: false,
                install_output,
                installs: RefCell::new(0),
            }
        }
    }

    impl ToolProvider for &FakeTool {
        fn is_available(&self) -> bool {
            self.available
        }

        fn install(&self) -> Result<(), InstallError> {
            *self.installs.borrow_mut() += 1;
            match self.install_output {
                Some(output) => Err(InstallError {
                    output: output.to_string(),
                }),
                None => Ok(()),
            }
        }

        fn install_invocation(&self) -> Invocation {
            Invocation::new("npm", vec!["install".to_string()])
        }
    }

    /// `None` simulates a process that fails to start.
    struct FakeExecutor {
        exit: Option<ExitCode>,
        calls: RefCell<Vec<Invocation>>,
    }

    impl FakeExecutor {
        fn exiting(exit: Option<ExitCode>) -> Self {
            Self {
                exit,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ProcessExecutor for &FakeExecutor {
        fn execute(
            &self,
            invocation: &Invocation,
            _stdout: Box<dyn Stdout>,
            _stderr: Box<dyn Stdout>,
        ) -> anyhow::Result<ExitCode> {
            self.calls.borrow_mut().push(invocation.clone());
            self.exit
                .ok_or_else(|| anyhow::anyhow!("No such file or directory (os error 2)"))
        }
    }

    #[test]
    fn test_available_tool_skips_install_and_uploads() {
        let tool = FakeTool::available();
        let executor = FakeExecutor::exiting(Some(0));
        let cfg = sample_config(TestFramework::Espresso);

        Orchestrator::new(&tool, &executor).run(&cfg).unwrap();

        assert_eq!(*tool.installs.borrow(), 0);
        let calls = executor.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "appcenter");
        assert_eq!(calls[0].args, composer::compose(&cfg).unwrap());
    }

    #[test]
    fn test_missing_tool_is_installed_before_upload() {
        let tool = FakeTool::missing(None);
        let executor = FakeExecutor::exiting(Some(0));

        Orchestrator::new(&tool, &executor)
            .run(&sample_config(TestFramework::Appium))
            .unwrap();

        assert_eq!(*tool.installs.borrow(), 1);
        assert_eq!(executor.calls.borrow().len(), 1);
    }

    #[test]
    fn test_failed_install_never_uploads() {
        let tool = FakeTool::missing(Some("npm ERR! code EACCES"));
        let executor = FakeExecutor::exiting(Some(0));

        let err = Orchestrator::new(&tool, &executor)
            .run(&sample_config(TestFramework::Appium))
            .unwrap_err();

        assert!(matches!(err, StepError::Install(_)));
        assert_eq!(
            err.to_string(),
            "Failed to install appcenter-cli: npm ERR! code EACCES"
        );
        assert_eq!(err.exit_code(), 1);
        assert!(executor.calls.borrow().is_empty());
    }

    #[test]
    fn test_compose_failure_never_uploads() {
        let tool = FakeTool::available();
        let executor = FakeExecutor::exiting(Some(0));
        let mut cfg = sample_config(TestFramework::Espresso);
        cfg.additional_options = "--foo 'bar".to_string();

        let err = Orchestrator::new(&tool, &executor).run(&cfg).unwrap_err();

        assert!(matches!(
            err,
            StepError::Compose(ComposeError::Options(LexingError::UnfinishedQuote))
        ));
        assert!(err.to_string().starts_with("Failed to create upload command: "));
        assert!(executor.calls.borrow().is_empty());
    }

    #[test]
    fn test_upload_exit_status_is_propagated() {
        let tool = FakeTool::available();
        let executor = FakeExecutor::exiting(Some(2));

        let err = Orchestrator::new(&tool, &executor)
            .run(&sample_config(TestFramework::Xcuitest))
            .unwrap_err();

        assert!(matches!(err, StepError::UploadExit(2)));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(executor.calls.borrow().len(), 1);
    }

    #[test]
    fn test_upload_spawn_failure() {
        let tool = FakeTool::available();
        let executor = FakeExecutor::exiting(None);

        let err = Orchestrator::new(&tool, &executor)
            .run(&sample_config(TestFramework::Uitest))
            .unwrap_err();

        assert!(matches!(err, StepError::Upload(_)));
        assert_eq!(
            err.to_string(),
            "Upload failed, error: No such file or directory (os error 2)"
        );
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    #[cfg(unix)]
    fn test_real_executor_failure_exit_code() {
        use crate::command::SystemExecutor;

        struct ShExecutor;

        impl ProcessExecutor for ShExecutor {
            fn execute(
                &self,
                _invocation: &Invocation,
                stdout: Box<dyn Stdout>,
                stderr: Box<dyn Stdout>,
            ) -> anyhow::Result<ExitCode> {
                let sh = Invocation::new("/bin/sh", vec!["-c".to_string(), "exit 2".to_string()]);
                SystemExecutor.execute(&sh, stdout, stderr)
            }
        }

        let tool = FakeTool::available();
        let err = Orchestrator::new(&tool, ShExecutor)
            .run(&sample_config(TestFramework::Espresso))
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
