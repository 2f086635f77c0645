// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Distributed Application - run and publish phases
//!
//! Owns the frozen model together with its run-scoped collaborators: the
//! endpoint allocator and the resource notification service. Launching
//! processes or containers is left to an external supervisor, which observes
//! the allocations and calls [`ResourceNotificationService::publish`].

use crate::application::endpoint_report::write_endpoint_report;
use crate::application::manifest_publisher::{ManifestPublisher, PublishedManifest};
use crate::application::resource_notification::ResourceNotificationService;
use crate::domain::callbacks::ExecutionContext;
use crate::domain::endpoint::{AllocationError, EndpointAllocator};
use crate::domain::lifecycle::StateName;
use crate::domain::manifest::ManifestError;
use crate::domain::model::ApplicationModel;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct DistributedApplication {
    model: Arc<ApplicationModel>,
    execution_context: ExecutionContext,
    notifications: Arc<ResourceNotificationService>,
    allocator: Arc<dyn EndpointAllocator>,
}

impl DistributedApplication {
    pub fn new(
        model: Arc<ApplicationModel>,
        execution_context: ExecutionContext,
        allocator: Arc<dyn EndpointAllocator>,
    ) -> Self {
        Self::with_notifications(
            model,
            execution_context,
            allocator,
            Arc::new(ResourceNotificationService::new()),
        )
    }

    pub fn with_notifications(
        model: Arc<ApplicationModel>,
        execution_context: ExecutionContext,
        allocator: Arc<dyn EndpointAllocator>,
        notifications: Arc<ResourceNotificationService>,
    ) -> Self {
        Self {
            model,
            execution_context,
            notifications,
            allocator,
        }
    }

    pub fn model(&self) -> &Arc<ApplicationModel> {
        &self.model
    }

    pub fn execution_context(&self) -> ExecutionContext {
        self.execution_context
    }

    pub fn notifications(&self) -> &Arc<ResourceNotificationService> {
        &self.notifications
    }

    /// Allocate every declared endpoint that has no allocation yet.
    ///
    /// Endpoints with a fixed port are allocated first, so a sequential
    /// allocator never hands one of those ports to a dynamic endpoint. Within
    /// each pass endpoints are taken in model order.
    ///
    /// Returns the number of endpoints allocated by this call.
    pub async fn allocate_endpoints(&self) -> Result<usize, AllocationError> {
        let mut allocated = 0usize;
        for fixed_pass in [true, false] {
            for resource in self.model.resources() {
                let pending = resource
                    .endpoints()
                    .filter(|endpoint| !endpoint.is_allocated())
                    .filter(|endpoint| endpoint.port.is_some() == fixed_pass);
                for endpoint in pending {
                    let allocation = self.allocator.allocate(resource, endpoint).await?;
                    info!(
                        resource = %resource.name(),
                        endpoint = %endpoint.name,
                        uri = %allocation.uri_string,
                        "Endpoint allocated"
                    );
                    endpoint.attach_allocation(allocation);
                    allocated += 1;
                }
            }
        }
        Ok(allocated)
    }

    /// Resolved environment of one resource for the run phase.
    ///
    /// Expressions whose endpoint is not allocated yet are an error.
    pub fn environment_for(&self, resource_name: &str) -> Result<BTreeMap<String, String>> {
        let resource = self.model.require(resource_name)?;
        let environment = resource
            .environment(self.execution_context)
            .map_err(|e| {
                anyhow::anyhow!("Environment callback of '{}' failed: {}", resource_name, e)
            })?;

        let mut resolved = BTreeMap::new();
        for (key, value) in environment {
            let text = value.resolve(&self.model).with_context(|| {
                format!("Cannot resolve {} for resource '{}'", key, resource_name)
            })?;
            resolved.insert(key, text);
        }
        Ok(resolved)
    }

    /// Run phase: allocate endpoints, report them, announce every resource as
    /// starting, then hold until `shutdown` fires.
    ///
    /// The notification service is shut down on every exit, so waiters are
    /// released with `Cancelled` even when startup fails.
    pub async fn run<W: Write>(
        &self,
        report_sink: &mut W,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let outcome = self.start(report_sink).await;
        match &outcome {
            Ok(()) => {
                shutdown.cancelled().await;
                info!("Shutdown requested, cancelling outstanding waits");
            }
            Err(e) => warn!(error = %e, "Startup failed, cancelling outstanding waits"),
        }
        self.shutdown();
        outcome
    }

    async fn start<W: Write>(&self, report_sink: &mut W) -> Result<()> {
        let allocated = self
            .allocate_endpoints()
            .await
            .context("Endpoint allocation failed")?;
        info!(allocated, resources = self.model.len(), "Endpoint allocation complete");

        write_endpoint_report(&self.model, report_sink)?;

        for resource in self.model.resources() {
            self.notifications
                .publish(resource.name(), StateName::STARTING)
                .with_context(|| format!("Failed to publish state for '{}'", resource.name()))?;
        }
        Ok(())
    }

    /// Write the deployment manifest.
    pub async fn publish_manifest(
        &self,
        manifest_path: &Path,
        cancellation: &CancellationToken,
    ) -> Result<PublishedManifest, ManifestError> {
        if !self.execution_context.is_publish() {
            warn!("Publishing a manifest outside of publish mode");
        }
        ManifestPublisher::new(manifest_path)
            .publish(&self.model, cancellation)
            .await
    }

    pub fn shutdown(&self) {
        self.notifications.shutdown();
    }
}
