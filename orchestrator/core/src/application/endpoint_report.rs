// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Endpoint report line for a supervising process.
//!
//! ```text
//! $ENDPOINTS: {"api":{"Endpoints":[{"Name":"http","Uri":"http://localhost:5000"}]}}
//! ```

use crate::domain::endpoint::EndpointUri;
use crate::domain::model::ApplicationModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// Prefix a supervising process scans its child's output for.
pub const ENDPOINT_REPORT_MARKER: &str = "$ENDPOINTS: ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceEndpoints {
    pub endpoints: Vec<EndpointUri>,
}

/// Allocated endpoints of every resource that declares at least one endpoint.
///
/// A resource whose endpoints are all still pending appears with an empty list.
pub fn build_endpoint_report(model: &ApplicationModel) -> BTreeMap<String, ResourceEndpoints> {
    model
        .resources()
        .filter(|resource| resource.endpoints().next().is_some())
        .map(|resource| {
            (
                resource.name().to_string(),
                ResourceEndpoints {
                    endpoints: resource.allocated_endpoints(),
                },
            )
        })
        .collect()
}

/// The report as a single line, without trailing newline.
pub fn format_endpoint_report(model: &ApplicationModel) -> Result<String, serde_json::Error> {
    let report = serde_json::to_string(&build_endpoint_report(model))?;
    Ok(format!("{}{}", ENDPOINT_REPORT_MARKER, report))
}

pub fn write_endpoint_report<W: Write>(
    model: &ApplicationModel,
    writer: &mut W,
) -> anyhow::Result<()> {
    let line = format_endpoint_report(model)?;
    writeln!(writer, "{}", line)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::endpoint::{AllocatedEndpoint, EndpointAnnotation};
    use crate::domain::resource::{Resource, ResourceKind};

    #[test]
    fn test_resources_without_endpoints_are_omitted() {
        let mut model = ApplicationModel::new("/app");
        model
            .add_resource(Resource::new("password", ResourceKind::Parameter).unwrap())
            .unwrap();
        let api = model
            .add_resource(Resource::new("api", ResourceKind::Project).unwrap())
            .unwrap();
        api.declare_endpoint(EndpointAnnotation::new("http", "http")).unwrap();
        api.endpoint("http")
            .unwrap()
            .attach_allocation(AllocatedEndpoint::new("http", "localhost", 5000));

        let line = format_endpoint_report(&model).unwrap();
        assert_eq!(
            line,
            r#"$ENDPOINTS: {"api":{"Endpoints":[{"Name":"http","Uri":"http://localhost:5000"}]}}"#
        );
    }

    #[test]
    fn test_pending_resource_has_empty_list() {
        let mut model = ApplicationModel::new("/app");
        model
            .add_resource(Resource::new("worker", ResourceKind::Executable).unwrap())
            .unwrap()
            .declare_endpoint(EndpointAnnotation::new("metrics", "http"))
            .unwrap();

        let mut out = Vec::new();
        write_endpoint_report(&model, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "$ENDPOINTS: {\"worker\":{\"Endpoints\":[]}}\n"
        );
    }
}
