// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod app_host;
pub mod builder;
pub mod endpoint_report;
pub mod manifest_publisher;
pub mod resource_notification;

// Re-export use cases for convenience
pub use app_host::DistributedApplication;
pub use builder::{ApplicationBuilder, ResourceBuilder};
pub use endpoint_report::{format_endpoint_report, write_endpoint_report, ENDPOINT_REPORT_MARKER};
pub use manifest_publisher::{ManifestPublisher, PublishedManifest};
pub use resource_notification::ResourceNotificationService;
