// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use apphost_core::application::app_host::DistributedApplication;
use apphost_core::application::builder::ApplicationBuilder;
use apphost_core::application::endpoint_report::{
    format_endpoint_report, ENDPOINT_REPORT_MARKER,
};
use apphost_core::domain::callbacks::ExecutionContext;
use apphost_core::domain::endpoint::{AllocatedEndpoint, EndpointAnnotation};
use apphost_core::domain::lifecycle::StateName;
use apphost_core::domain::model::ModelError;
use apphost_core::infrastructure::port_allocator::SequentialPortAllocator;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[test]
fn duplicate_resource_name_is_rejected() {
    let mut builder = ApplicationBuilder::new("/srv/shop");
    builder.add_container("cache", "redis:7").unwrap();

    let err = builder.add_parameter("cache", false).err().unwrap();
    assert_eq!(err, ModelError::DuplicateResourceName("cache".to_string()));
    assert_eq!(builder.model().len(), 1);
}

#[test]
fn report_lists_only_allocated_endpoints() {
    let mut builder = ApplicationBuilder::new("/srv/shop");
    builder
        .add_project("api", "src/api")
        .unwrap()
        .with_http_endpoint("http", None)
        .unwrap()
        .with_endpoint(EndpointAnnotation::new("https", "https"))
        .unwrap();
    let model = builder.build();

    model
        .resource("api")
        .unwrap()
        .endpoint("http")
        .unwrap()
        .attach_allocation(AllocatedEndpoint::new("http", "localhost", 5000));

    let line = format_endpoint_report(&model).unwrap();
    let json = line.strip_prefix(ENDPOINT_REPORT_MARKER).unwrap();
    let payload: Value = serde_json::from_str(json).unwrap();
    assert_eq!(
        payload,
        json!({ "api": { "Endpoints": [{ "Name": "http", "Uri": "http://localhost:5000" }] } })
    );
}

#[tokio::test]
async fn sequential_allocation_never_repeats_a_port() {
    let mut builder = ApplicationBuilder::new("/srv/shop");
    for name in ["api", "admin", "worker"] {
        builder
            .add_project(name, name)
            .unwrap()
            .with_http_endpoint("http", None)
            .unwrap()
            .with_endpoint(EndpointAnnotation::new("grpc", "http2"))
            .unwrap();
    }
    builder
        .add_container("dashboard", "grafana/grafana")
        .unwrap()
        .with_http_endpoint("http", Some(21003))
        .unwrap();
    let model = builder.build();

    let allocator = SequentialPortAllocator::new("localhost", 21000, 21100).unwrap();
    let app =
        DistributedApplication::new(model.clone(), ExecutionContext::Run, Arc::new(allocator));
    assert_eq!(app.allocate_endpoints().await.unwrap(), 7);

    let mut seen = HashSet::new();
    for resource in model.resources() {
        for endpoint in resource.endpoints() {
            let port = endpoint.allocated_endpoint().unwrap().port;
            assert!(seen.insert(port), "port {} handed out twice", port);
        }
    }
    assert!(seen.contains(&21003));

    // A second pass has nothing left to allocate
    assert_eq!(app.allocate_endpoints().await.unwrap(), 0);
}

#[tokio::test]
async fn fixed_port_declared_late_is_not_taken_by_dynamic_endpoint() {
    let mut builder = ApplicationBuilder::new("/srv/shop");
    builder
        .add_project("api", "src/api")
        .unwrap()
        .with_http_endpoint("http", None)
        .unwrap();
    builder
        .add_container("dashboard", "grafana/grafana")
        .unwrap()
        .with_http_endpoint("http", Some(7000))
        .unwrap();
    let model = builder.build();

    let allocator = SequentialPortAllocator::new("localhost", 7000, 7002).unwrap();
    let app =
        DistributedApplication::new(model.clone(), ExecutionContext::Run, Arc::new(allocator));
    assert_eq!(app.allocate_endpoints().await.unwrap(), 2);

    let port_of = |name: &str| {
        model
            .resource(name)
            .unwrap()
            .endpoint("http")
            .unwrap()
            .allocated_endpoint()
            .unwrap()
            .port
    };
    assert_eq!(port_of("dashboard"), 7000);
    assert_eq!(port_of("api"), 7001);

    let line = format_endpoint_report(&model).unwrap();
    assert!(line.contains("http://localhost:7000"));
    assert!(line.contains("http://localhost:7001"));
}

#[tokio::test]
async fn run_reports_endpoints_and_announces_resources() {
    let mut builder = ApplicationBuilder::new("/srv/shop");
    builder
        .add_project("api", "src/api")
        .unwrap()
        .with_endpoint(
            EndpointAnnotation::new("http", "http").with_environment_variable("PORT"),
        )
        .unwrap();
    builder.add_parameter("api-key", true).unwrap();
    let model = builder.build();

    let allocator = SequentialPortAllocator::new("localhost", 22000, 22010).unwrap();
    let app = DistributedApplication::new(model, ExecutionContext::Run, Arc::new(allocator));

    let shutdown = CancellationToken::new();
    shutdown.cancel();
    let mut output = Vec::new();
    app.run(&mut output, shutdown).await.unwrap();

    let output = String::from_utf8(output).unwrap();
    let expected = concat!(
        "$ENDPOINTS: {\"api\":{\"Endpoints\":",
        "[{\"Name\":\"http\",\"Uri\":\"http://localhost:22000\"}]}}\n"
    );
    assert_eq!(output, expected);

    let state = app.notifications().current_state("api-key").unwrap();
    assert_eq!(state.state.as_str(), StateName::STARTING);
    assert!(app.notifications().is_shut_down());

    let environment = app.environment_for("api").unwrap();
    assert_eq!(environment.get("PORT").map(String::as_str), Some("22000"));
}
