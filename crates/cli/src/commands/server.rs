// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{process::ExitCode, time::Duration};

use anyhow::Context;
use avs_config::{ConfigurationSection, RootConfig};
use avs_data_model::{Clock, SystemClock};
use avs_storage::MemorySessionStoreFactory;
use clap::Parser;
use figment::Figment;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn};

use crate::{
    app_state::AppState,
    shutdown::Shutdown,
    util::{
        cookie_manager_from_config, gate_config_from_config, session_cookie_options_from_config,
        session_store_factory_from_config, url_builder_from_config,
    },
};

/// How often idle sessions are swept out of the store
const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Parser, Debug, Default)]
pub(super) struct Options {}

async fn sweep_sessions(factory: MemorySessionStoreFactory, cancellation: CancellationToken) {
    let clock = SystemClock::default();
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancellation.cancelled() => break,
            _ = interval.tick() => {
                let purged = factory.purge_expired(clock.now());
                if purged > 0 {
                    debug!(purged, remaining = factory.len(), "Purged expired sessions");
                }
            }
        }
    }
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        let span = info_span!("cli.run.init").entered();
        let shutdown = Shutdown::install()?;
        let config = RootConfig::extract(figment).map_err(anyhow::Error::from_boxed)?;

        info!(version = crate::VERSION, "Starting up");

        let gate_config = gate_config_from_config(&config.gate)?;
        if !gate_config.enabled {
            warn!("The age gate is disabled, visitors will never be prompted");
        }

        let session_store_factory = session_store_factory_from_config(&config.session);
        let state = AppState {
            session_store_factory: session_store_factory.clone(),
            cookie_manager: cookie_manager_from_config(&config.http, &config.secrets),
            gate_config,
            session_cookie_options: session_cookie_options_from_config(&config.session),
            url_builder: url_builder_from_config(&config.http),
        };

        let router = crate::server::build_router(state, config.http.prefix.as_deref());

        let listener = tokio::net::TcpListener::bind(config.http.listen)
            .await
            .with_context(|| format!("could not bind address {}", config.http.listen))?;

        let addr = listener
            .local_addr()
            .context("could not get the listener address")?;
        let prefix = config.http.prefix.as_deref().unwrap_or_default();
        info!("Listening on http://{addr}{prefix}");

        // Explicitly drop the config to not keep the secrets around
        drop(config);

        span.exit();

        shutdown.tracker().spawn(sweep_sessions(
            session_store_factory,
            shutdown.graceful(),
        ));

        let graceful = shutdown.graceful();
        let abort = shutdown.abort();
        shutdown.tracker().spawn(async move {
            let server = async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(graceful.cancelled_owned())
                    .await
            };

            tokio::select! {
                res = server => {
                    if let Err(e) = res {
                        error!(error = &e as &dyn std::error::Error, "HTTP server failed");
                    }
                },
                () = abort.cancelled() => {
                    warn!("Dropping in-flight requests");
                },
            }
        });

        shutdown.wait().await;

        Ok(ExitCode::SUCCESS)
    }
}
