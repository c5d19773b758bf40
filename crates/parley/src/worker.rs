// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley worker` command implementation.

use parley_config::ParleyConfig;
use parley_core::ParleyError;
use parley_pipeline::install_signal_handler;
use tracing::info;

use crate::runtime::{Services, build_generator, init_tracing, join_all};

/// Run worker loops and the sweep against the configured database until
/// SIGINT/SIGTERM. Runs at least one loop even if `worker.concurrency` is 0.
pub async fn run_worker(config: ParleyConfig) -> Result<(), ParleyError> {
    init_tracing(&config.server.log_level);

    let services = Services::open(&config).await?;
    let generator = build_generator(&config)?;
    let shutdown = install_signal_handler();

    let count = config.worker.concurrency.max(1);
    let tasks = services.spawn_background(&config, generator, count, &shutdown);
    info!(workers = count, "worker process started");

    shutdown.cancelled().await;
    join_all(tasks).await;
    services.close().await?;
    info!("worker process stopped");
    Ok(())
}
