// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `apphost publish`: write the deployment manifest of an application.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use apphost_core::application::app_host::DistributedApplication;
use apphost_core::domain::app_config::AppHostConfigManifest;
use apphost_core::domain::callbacks::ExecutionContext;
use apphost_core::infrastructure::app_definition_parser::AppDefinitionParser;
use apphost_core::infrastructure::port_allocator::SequentialPortAllocator;

use super::cancel_on_ctrl_c;

pub async fn execute(
    app: PathBuf,
    output: Option<PathBuf>,
    config: &AppHostConfigManifest,
) -> Result<()> {
    let model = AppDefinitionParser::load(&app)
        .with_context(|| format!("Failed to load application {:?}", app))?
        .build();

    // Publishing never allocates, the allocator only completes the application
    let allocator = SequentialPortAllocator::from_config(&config.spec.allocator)
        .context("Invalid allocator configuration")?;
    let application =
        DistributedApplication::new(model, ExecutionContext::Publish, Arc::new(allocator));

    let output = output.unwrap_or_else(|| config.spec.manifest.output_path.clone());
    let published = application
        .publish_manifest(&output, &cancel_on_ctrl_c())
        .await
        .with_context(|| format!("Failed to publish manifest to {:?}", output))?;

    println!(
        "{}",
        format!(
            "✓ Manifest written: {} ({} resources)",
            published.path.display(),
            published.resource_count
        )
        .green()
    );

    Ok(())
}
