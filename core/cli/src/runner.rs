// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use idtoken_auth::fetcher::initialize_crypto_provider;
use idtoken_auth::verifier::Verifier;
use tracing::{debug, info};

use crate::args::Args;
use crate::config::ConfigLoader;

/// Verify each token, printing its claims as JSON to `out` or the
/// rejection to `err`. Returns the number of rejected tokens.
pub async fn verify_tokens<O: Write, E: Write>(
    verifier: &Verifier,
    tokens: &[String],
    out: &mut O,
    err: &mut E,
) -> Result<usize> {
    let mut rejected = 0;

    for token in tokens {
        match verifier.verify(token).await {
            Ok(verified) => {
                let claims = serde_json::to_string(&verified.claims)?;
                writeln!(out, "{}", claims)?;
            }
            Err(e) => {
                rejected += 1;
                writeln!(err, "error: {}", e)?;
            }
        }
    }

    Ok(rejected)
}

/// Read one token per line, skipping blank lines.
pub fn read_tokens(reader: impl BufRead) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    for line in reader.lines() {
        let line = line.context("failed to read tokens")?;
        let token = line.trim();
        if !token.is_empty() {
            tokens.push(token.to_string());
        }
    }
    Ok(tokens)
}

/// Build the verifier from `config` and verify the tokens given in `args`,
/// or read from stdin when there are none.
///
/// Blocks on its own Tokio runtime. Returns whether every token was
/// accepted.
pub fn run(config: &ConfigLoader, args: &Args) -> Result<bool> {
    let verifier_config = config
        .verifier(args.client_id())
        .context("invalid verifier configuration")?;

    let tokens = if args.tokens().is_empty() {
        read_tokens(std::io::stdin().lock())?
    } else {
        args.tokens().to_vec()
    };
    debug!(count = tokens.len(), "tokens to verify");

    initialize_crypto_provider();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    runtime.block_on(async move {
        let verifier = verifier_config
            .into_verifier()
            .await
            .context("failed to build verifier")?;

        let rejected = verify_tokens(
            &verifier,
            &tokens,
            &mut std::io::stdout().lock(),
            &mut std::io::stderr().lock(),
        )
        .await?;

        info!(total = tokens.len(), rejected, "verification done");
        Ok(rejected == 0)
    })
}
