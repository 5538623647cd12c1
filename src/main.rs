use anyhow::Context;
use appcenter_test_step::command::SystemExecutor;
use appcenter_test_step::composer::{self, TOKEN_FLAG};
use appcenter_test_step::config::Configuration;
use appcenter_test_step::env::Environment;
use appcenter_test_step::tool::NpmToolProvider;
use appcenter_test_step::{Orchestrator, StepError};
use argh::FromArgs;

#[derive(FromArgs)]
/// Upload a test build to App Center Test and schedule a run.
/// Inputs are read from environment variables (token, app, framework, devices, series,
/// locale, app_path, dsym_dir, test_dir, async, additional_options).
struct Args {
    #[argh(switch)]
    /// print the composed upload command and exit without installing or running anything.
    dry_run: bool,

    #[argh(switch, short = 'v')]
    /// enable debug logging.
    verbose: bool,
}

fn main() {
    let args: Args = argh::from_env();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(err) = run(&args) {
        let code = match err.downcast_ref::<StepError>() {
            Some(step_err) => {
                log::error!("{step_err}");
                step_err.exit_code()
            }
            None => {
                log::error!("{err:#}");
                1
            }
        };
        std::process::exit(code);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let env = Environment::new();
    let cfg = Configuration::from_env(&env).context("Couldn't create config")?;
    log::info!("{cfg}");

    if args.dry_run {
        let invocation = composer::upload_invocation(&cfg).map_err(StepError::from)?;
        println!("{}", invocation.printable(Some(TOKEN_FLAG)));
        return Ok(());
    }

    Orchestrator::new(NpmToolProvider::new(env), SystemExecutor).run(&cfg)?;
    Ok(())
}
