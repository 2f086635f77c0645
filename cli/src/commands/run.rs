// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `apphost run`: allocate endpoints, report them on stdout, hold until Ctrl-C.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use apphost_core::application::app_host::DistributedApplication;
use apphost_core::domain::app_config::AppHostConfigManifest;
use apphost_core::domain::callbacks::ExecutionContext;
use apphost_core::infrastructure::app_definition_parser::AppDefinitionParser;
use apphost_core::infrastructure::port_allocator::SequentialPortAllocator;

use super::cancel_on_ctrl_c;

pub async fn execute(app: PathBuf, config: &AppHostConfigManifest) -> Result<()> {
    let model = AppDefinitionParser::load(&app)
        .with_context(|| format!("Failed to load application {:?}", app))?
        .build();

    let allocator = SequentialPortAllocator::from_config(&config.spec.allocator)
        .context("Invalid allocator configuration")?;

    info!(
        resources = model.len(),
        host = %allocator.host(),
        "Starting application"
    );

    let application =
        DistributedApplication::new(model, ExecutionContext::Run, Arc::new(allocator));
    let mut stdout = std::io::stdout();
    application.run(&mut stdout, cancel_on_ctrl_c()).await?;

    info!("Application stopped");
    Ok(())
}
