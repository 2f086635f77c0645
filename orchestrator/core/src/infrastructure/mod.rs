// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod app_definition_parser;
pub mod event_bus;
pub mod port_allocator;

pub use app_definition_parser::AppDefinitionParser;
pub use event_bus::{EventBus, EventBusError};
pub use port_allocator::SequentialPortAllocator;
