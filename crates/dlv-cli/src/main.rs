use clap::Parser;
use dlv_core::logging;
use std::process::ExitCode;

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse();

    // Logs go to the state dir; stdout carries the artifact.
    if let Err(err) = logging::init_logging(args.verbose) {
        logging::init_logging_stderr(args.verbose);
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    match cli::run(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("dlv error: {:#}", err);
            ExitCode::from(cli::exit_code(&err))
        }
    }
}
