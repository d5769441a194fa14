//! freshcheck - report how long ago an upstream branch last received a commit.

use std::io::Write;
use std::process::ExitCode;

use clap::CommandFactory;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use freshcheck::cli::{self, Cli, Commands};
use freshcheck::report::FAILURE_STATUS;

#[tokio::main]
async fn main() -> ExitCode {
    // A panic must not surface as 101, which would read as a freshness value
    std::panic::set_hook(Box::new(|info| {
        let _ = writeln!(std::io::stderr(), "fatal: {}", info);
        std::process::exit(i32::from(FAILURE_STATUS));
    }));

    // Logs go to stderr, stdout carries the result
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("freshcheck=info")),
        )
        .init();

    let cli = match cli::parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(status) => return ExitCode::from(status),
    };
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        None => {
            let _ = Cli::command().print_help();
            let _ = writeln!(std::io::stdout());
            Ok(())
        }
        Some(Commands::Check(args)) => {
            let status = cli::check::run(config_path, args).await;
            return ExitCode::from(status);
        }
        Some(Commands::Config(args)) => cli::config::show(config_path, args),
        Some(Commands::Init { source, force }) => cli::init::run(config_path, source, force),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            let _ = writeln!(std::io::stderr(), "error: {}", e);
            ExitCode::FAILURE
        }
    }
}
