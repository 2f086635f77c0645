// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Sequential Port Allocator
//!
//! Local-development [`EndpointAllocator`]: hands out ports from a configured
//! range in ascending order, honoring endpoints that declare a fixed port.
//! A port is never handed out twice by the same allocator. With probing
//! enabled, candidates that are already bound by another process are skipped.

use crate::domain::app_config::AllocatorConfig;
use crate::domain::endpoint::{
    AllocatedEndpoint, AllocationError, EndpointAllocator, EndpointAnnotation, Protocol,
};
use crate::domain::resource::Resource;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::debug;

struct AllocatorState {
    cursor: u32,
    issued: HashSet<u16>,
}

pub struct SequentialPortAllocator {
    host: String,
    start: u16,
    end: u16,
    probe: bool,
    state: Mutex<AllocatorState>,
}

impl SequentialPortAllocator {
    /// `end` is inclusive.
    pub fn new(host: impl Into<String>, start: u16, end: u16) -> Result<Self, AllocationError> {
        if start == 0 || start > end {
            return Err(AllocationError::InvalidPortRange { start, end });
        }
        Ok(Self {
            host: host.into(),
            start,
            end,
            probe: false,
            state: Mutex::new(AllocatorState {
                cursor: u32::from(start),
                issued: HashSet::new(),
            }),
        })
    }

    pub fn from_config(config: &AllocatorConfig) -> Result<Self, AllocationError> {
        Ok(Self::new(&config.host, config.port_range_start, config.port_range_end)?
            .with_probe(config.probe))
    }

    pub fn with_probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn claim_fixed(&self, port: u16) -> bool {
        self.state.lock().issued.insert(port)
    }

    fn next_candidate(&self) -> Option<u16> {
        let mut state = self.state.lock();
        while state.cursor <= u32::from(self.end) {
            let candidate = state.cursor as u16;
            state.cursor += 1;
            if state.issued.insert(candidate) {
                return Some(candidate);
            }
        }
        None
    }

    async fn is_available(&self, port: u16, protocol: Protocol) -> bool {
        let address = (self.host.as_str(), port);
        match protocol {
            Protocol::Tcp => tokio::net::TcpListener::bind(address).await.is_ok(),
            Protocol::Udp => tokio::net::UdpSocket::bind(address).await.is_ok(),
        }
    }
}

#[async_trait]
impl EndpointAllocator for SequentialPortAllocator {
    async fn allocate(
        &self,
        resource: &Resource,
        endpoint: &EndpointAnnotation,
    ) -> Result<AllocatedEndpoint, AllocationError> {
        if let Some(port) = endpoint.port {
            if !self.claim_fixed(port) {
                return Err(AllocationError::Failed {
                    resource: resource.name().to_string(),
                    endpoint: endpoint.name.clone(),
                    reason: format!("port {} is already allocated", port),
                });
            }
            return Ok(AllocatedEndpoint::new(endpoint.scheme.clone(), self.host.clone(), port));
        }

        while let Some(candidate) = self.next_candidate() {
            if self.probe && !self.is_available(candidate, endpoint.protocol).await {
                debug!(port = candidate, "Port in use, skipping");
                continue;
            }
            return Ok(AllocatedEndpoint::new(
                endpoint.scheme.clone(),
                self.host.clone(),
                candidate,
            ));
        }

        Err(AllocationError::PortRangeExhausted {
            resource: resource.name().to_string(),
            endpoint: endpoint.name.clone(),
            start: self.start,
            end: self.end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::ResourceKind;

    fn resource() -> Resource {
        Resource::new("api", ResourceKind::Project).unwrap()
    }

    #[test]
    fn test_invalid_range_rejected() {
        assert!(matches!(
            SequentialPortAllocator::new("localhost", 9000, 8000),
            Err(AllocationError::InvalidPortRange { .. })
        ));
        assert!(SequentialPortAllocator::new("localhost", 0, 10).is_err());
    }

    #[tokio::test]
    async fn test_sequential_and_exhausted() {
        let allocator = SequentialPortAllocator::new("localhost", 7000, 7001).unwrap();
        let resource = resource();
        let http = EndpointAnnotation::new("http", "http");

        let first = allocator.allocate(&resource, &http).await.unwrap();
        let second = allocator.allocate(&resource, &http).await.unwrap();
        assert_eq!(first.port, 7000);
        assert_eq!(second.port, 7001);
        assert_eq!(first.uri_string, "http://localhost:7000");

        let err = allocator.allocate(&resource, &http).await.unwrap_err();
        assert!(matches!(err, AllocationError::PortRangeExhausted { .. }));
    }

    #[tokio::test]
    async fn test_fixed_port_is_not_reissued() {
        let allocator = SequentialPortAllocator::new("localhost", 7000, 7002).unwrap();
        let resource = resource();

        let fixed = EndpointAnnotation::new("https", "https").with_port(7000);
        assert_eq!(allocator.allocate(&resource, &fixed).await.unwrap().port, 7000);

        let dynamic = EndpointAnnotation::new("http", "http");
        assert_eq!(allocator.allocate(&resource, &dynamic).await.unwrap().port, 7001);

        let err = allocator.allocate(&resource, &fixed).await.unwrap_err();
        assert!(matches!(err, AllocationError::Failed { .. }));
    }

    #[tokio::test]
    async fn test_probe_skips_bound_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let busy = listener.local_addr().unwrap().port();
        if busy == u16::MAX {
            return;
        }

        let allocator = SequentialPortAllocator::new("127.0.0.1", busy, busy.saturating_add(50))
            .unwrap()
            .with_probe(true);
        let allocated = allocator
            .allocate(&resource(), &EndpointAnnotation::new("tcp", "tcp"))
            .await
            .unwrap();
        assert_ne!(allocated.port, busy);
    }
}
