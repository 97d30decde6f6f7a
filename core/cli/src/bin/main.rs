// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use idtoken_cli::args;
use idtoken_cli::config;
use idtoken_cli::runner;

fn main() -> ExitCode {
    let args = args::Args::parse();

    let mut config = match config::ConfigLoader::new(args.config()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // tracing subscriber initialization
    let tracing_conf = config.tracing();
    if let Err(e) = tracing_conf.setup_tracing_subscriber() {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }
    debug!(?tracing_conf);

    match runner::run(&config, &args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
