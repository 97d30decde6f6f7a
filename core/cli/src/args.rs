// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;

/// Verify identity tokens against the provider's published keys.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Tokens to verify. Read one per line from stdin when none are given
    #[arg(value_name = "TOKEN")]
    tokens: Vec<String>,

    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    #[clap(long, env = "IDTOKEN_CONFIG", required = true)]
    config: String,

    /// Overrides the client id of the configuration file
    #[arg(long, value_name = "ID")]
    #[clap(long, env = "IDTOKEN_CLIENT_ID")]
    client_id: Option<String>,
}

impl Args {
    pub fn config(&self) -> &String {
        &self.config
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}
