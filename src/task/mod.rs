//! Human task lifecycle management.
//!
//! A human task is a unit of work inside a business process that must be
//! performed by a person. This module tracks each task through a fixed set
//! of statuses, decides who may act on it, and lets owners suspend a task
//! until a later instant after which it resumes on its own. The module
//! follows hexagonal architecture:
//!
//! - Domain types and the transition table in [`domain`]
//! - Store and scheduler contracts in [`ports`]
//! - In-memory and `PostgreSQL` implementations in [`adapters`]
//! - The lifecycle engine and suspension worker in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
