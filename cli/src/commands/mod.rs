// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the apphost CLI

pub mod config;
pub mod publish;
pub mod run;

pub use self::config::ConfigCommand;

use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Token cancelled on the first Ctrl-C.
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    cancel_on_signal(tokio::signal::ctrl_c())
}

/// Token cancelled once `signal` resolves. A handler that fails to install
/// leaves the token untouched.
fn cancel_on_signal<F>(signal: F) -> CancellationToken
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                tracing::info!("Ctrl-C received");
                trigger.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "Failed to install Ctrl-C handler"),
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_cancels_token() {
        let token = cancel_on_signal(async { Ok(()) });
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_handler_leaves_token_running() {
        let token = cancel_on_signal(async { Err(std::io::Error::other("no signal driver")) });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!token.is_cancelled());
    }
}
