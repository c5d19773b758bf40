// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley serve` command implementation.
//!
//! Opens storage, key-value store, and queue, then runs the HTTP API next to
//! `worker.concurrency` worker loops and the reconciliation sweep until a
//! shutdown signal arrives.

use parley_config::ParleyConfig;
use parley_core::ParleyError;
use parley_gateway::{ServerConfig, start_server};
use parley_pipeline::install_signal_handler;
use tracing::{info, warn};

use crate::runtime::{Services, build_generator, init_tracing, join_all};

pub async fn run_serve(config: ParleyConfig) -> Result<(), ParleyError> {
    init_tracing(&config.server.log_level);

    let services = Services::open(&config).await?;
    let shutdown = install_signal_handler();

    let tasks = if config.worker.concurrency > 0 {
        let generator = build_generator(&config)?;
        services.spawn_background(&config, generator, config.worker.concurrency, &shutdown)
    } else {
        warn!("no embedded workers; replies need a separate `parley worker`");
        Vec::new()
    };
    info!(workers = config.worker.concurrency, "background tasks started");

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let served = start_server(&server_config, services.app_state(&config), shutdown.clone()).await;

    // Stop workers even when the server exited on its own.
    shutdown.cancel();
    join_all(tasks).await;
    services.close().await?;
    info!("parley stopped");
    served
}
