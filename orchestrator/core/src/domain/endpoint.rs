// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Endpoint Model
//!
//! An [`EndpointAnnotation`] records the *intent* to listen on the network.
//! The concrete binding ([`AllocatedEndpoint`]) is produced later by an
//! [`EndpointAllocator`] and attached through an optional back-reference.
//!
//! The back-reference is observational only: readers must tolerate it being
//! absent at any time, and only the allocator writes it.

use crate::domain::resource::Resource;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// Concrete runtime binding for a declared endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedEndpoint {
    pub address: String,
    pub port: u16,
    pub uri_scheme: String,
    pub uri_string: String,
}

impl AllocatedEndpoint {
    pub fn new(uri_scheme: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        let uri_scheme = uri_scheme.into();
        let address = address.into();
        let uri_string = format!("{}://{}:{}", uri_scheme, address, port);
        Self {
            address,
            port,
            uri_scheme,
            uri_string,
        }
    }
}

/// Declared network-listener intent on a resource.
#[derive(Debug, Clone)]
pub struct EndpointAnnotation {
    /// Unique within the owning resource
    pub name: String,
    pub scheme: String,
    pub protocol: Protocol,
    pub transport: String,
    /// Fixed host port, if the endpoint must not be allocated dynamically
    pub port: Option<u16>,
    pub container_port: Option<u16>,
    pub is_external: bool,
    /// Environment variable that receives the allocated port
    pub environment_variable: Option<String>,
    allocation: Arc<RwLock<Option<AllocatedEndpoint>>>,
}

impl EndpointAnnotation {
    pub fn new(name: impl Into<String>, scheme: impl Into<String>) -> Self {
        let scheme = scheme.into();
        let transport = default_transport(&scheme).to_string();
        Self {
            name: name.into(),
            scheme,
            protocol: Protocol::Tcp,
            transport,
            port: None,
            container_port: None,
            is_external: false,
            environment_variable: None,
            allocation: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_transport(mut self, transport: impl Into<String>) -> Self {
        self.transport = transport.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_container_port(mut self, container_port: u16) -> Self {
        self.container_port = Some(container_port);
        self
    }

    pub fn external(mut self) -> Self {
        self.is_external = true;
        self
    }

    pub fn with_environment_variable(mut self, variable: impl Into<String>) -> Self {
        self.environment_variable = Some(variable.into());
        self
    }

    /// Current allocation, `None` until the allocator has run for this endpoint.
    pub fn allocated_endpoint(&self) -> Option<AllocatedEndpoint> {
        self.allocation.read().clone()
    }

    pub fn is_allocated(&self) -> bool {
        self.allocation.read().is_some()
    }

    /// Attach the allocator's result. Only endpoint allocators call this.
    pub fn attach_allocation(&self, allocated: AllocatedEndpoint) {
        *self.allocation.write() = Some(allocated);
    }
}

fn default_transport(scheme: &str) -> &str {
    match scheme {
        "http" | "https" => "http",
        "http2" => "http2",
        _ => "tcp",
    }
}

/// `(Name, UriString)` pair of an allocated endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointUri {
    pub name: String,
    pub uri: String,
}

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("No free port left in range {start}-{end} for endpoint '{resource}/{endpoint}'")]
    PortRangeExhausted {
        resource: String,
        endpoint: String,
        start: u16,
        end: u16,
    },

    #[error("Invalid port range {start}-{end}")]
    InvalidPortRange { start: u16, end: u16 },

    #[error("Failed to allocate endpoint '{resource}/{endpoint}': {reason}")]
    Failed {
        resource: String,
        endpoint: String,
        reason: String,
    },
}

/// External collaborator that turns endpoint declarations into concrete bindings.
#[async_trait]
pub trait EndpointAllocator: Send + Sync {
    async fn allocate(
        &self,
        resource: &Resource,
        endpoint: &EndpointAnnotation,
    ) -> Result<AllocatedEndpoint, AllocationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_scheme() {
        let http = EndpointAnnotation::new("http", "http");
        assert_eq!(http.protocol, Protocol::Tcp);
        assert_eq!(http.transport, "http");

        let redis = EndpointAnnotation::new("tcp", "redis");
        assert_eq!(redis.transport, "tcp");
    }

    #[test]
    fn test_allocation_is_shared_between_clones() {
        let endpoint = EndpointAnnotation::new("http", "http");
        let observer = endpoint.clone();
        assert!(!observer.is_allocated());

        endpoint.attach_allocation(AllocatedEndpoint::new("http", "localhost", 5000));
        assert_eq!(
            observer.allocated_endpoint().unwrap().uri_string,
            "http://localhost:5000"
        );
    }
}
