//! Human task lifecycle manager.
//!
//! This crate manages tasks that a running business process hands to people:
//! who may claim them, how they move between statuses, and how a suspended
//! task wakes up again once its suspension deadline passes.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure transition and authorization rules with no I/O
//! - **Ports**: Trait interfaces for task storage and wake-up scheduling
//! - **Adapters**: In-memory and `PostgreSQL` implementations of the ports
//!
//! # Modules
//!
//! - [`task`]: Task domain, ports, adapters and lifecycle services

pub mod task;
