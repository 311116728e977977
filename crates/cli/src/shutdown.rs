// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::time::Duration;

use tokio::signal::unix::{Signal, SignalKind};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// How long in-flight requests get to finish once a shutdown started
const GRACE_PERIOD: Duration = Duration::from_secs(30);

async fn next_signal(sigterm: &mut Signal, sigint: &mut Signal) -> &'static str {
    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

/// Coordinates the shutdown of the server and its background tasks.
///
/// The first SIGTERM or SIGINT cancels the `graceful` token: the server stops
/// accepting connections and lets in-flight requests finish. A second signal,
/// or the end of the grace period, cancels the `abort` token.
pub struct Shutdown {
    abort: CancellationToken,
    graceful: CancellationToken,
    tracker: TaskTracker,
    sigterm: Signal,
    sigint: Signal,
}

impl Shutdown {
    /// Install the signal handlers
    ///
    /// # Errors
    ///
    /// Returns an error if a signal handler could not be installed
    pub fn install() -> Result<Self, std::io::Error> {
        let abort = CancellationToken::new();
        let graceful = abort.child_token();

        Ok(Self {
            abort,
            graceful,
            tracker: TaskTracker::new(),
            sigterm: tokio::signal::unix::signal(SignalKind::terminate())?,
            sigint: tokio::signal::unix::signal(SignalKind::interrupt())?,
        })
    }

    /// Tracks the tasks which have to finish before the process exits
    #[must_use]
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Cancelled when the server should stop accepting new work
    #[must_use]
    pub fn graceful(&self) -> CancellationToken {
        self.graceful.clone()
    }

    /// Cancelled when in-flight work should be dropped
    #[must_use]
    pub fn abort(&self) -> CancellationToken {
        self.abort.clone()
    }

    /// Wait for a signal, then for every tracked task to finish.
    pub async fn wait(mut self) {
        let signal = next_signal(&mut self.sigterm, &mut self.sigint).await;
        tracing::info!(signal, "Shutdown signal received, shutting down");

        self.graceful.cancel();
        self.tracker.close();

        tokio::select! {
            signal = next_signal(&mut self.sigterm, &mut self.sigint) => {
                tracing::warn!(signal, "Second shutdown signal received, aborting");
            },
            () = tokio::time::sleep(GRACE_PERIOD) => {
                tracing::warn!("Shutdown grace period elapsed, aborting");
            },
            () = self.tracker.wait() => {},
        }

        self.abort.cancel();
        self.tracker.wait().await;

        tracing::info!("All tasks are done, exiting");
    }
}
