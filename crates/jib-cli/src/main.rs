//! Jib - scaffold tooling for SSR web applications.
//!
//! Entry point: parses arguments, initializes logging and colors, then
//! dispatches to exactly one of the four tasks. In-process tasks (`build`,
//! `start`) are wrapped in the timing logger; child-process tasks (`test`,
//! `serve`) forward the child's exit status.

use std::process::ExitCode;

use clap::Parser;
use jib_cli::{cli, commands, error, logger, ui};

#[tokio::main]
async fn main() -> miette::Result<ExitCode> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors();

    let globals = cli::Globals {
        verbose: args.verbose,
        root: args.root.clone(),
    };

    // Convert errors to miette diagnostics at the edge; an Err return is
    // rendered as a report and exits with code 1.
    match args.command {
        cli::Command::Build(build_args) => {
            commands::run_task("build", commands::build_execute(&globals, build_args))
                .await
                .map_err(error::to_report)?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Start(start_args) => {
            commands::run_task("start", commands::start_execute(&globals, start_args))
                .await
                .map_err(error::to_report)?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Test(test_args) => {
            let code = commands::test_execute(&globals, test_args)
                .await
                .map_err(error::to_report)?;
            Ok(code)
        }
        cli::Command::Serve(serve_args) => {
            let code = commands::serve_execute(&globals, serve_args)
                .await
                .map_err(error::to_report)?;
            Ok(code)
        }
    }
}
