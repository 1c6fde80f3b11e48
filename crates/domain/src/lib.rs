//! newsflow domain crate
//!
//! This crate contains the core pipeline logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `policy`: The hot-reloadable pipeline policy value object
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Pipeline stages and the driver state machine
//! - `util`: Bounded polling, JSON extraction, slugs

pub mod model;
pub mod policy;
pub mod ports;
pub mod usecases;
pub mod util;

pub use model::*;
pub use policy::PipelinePolicy;
pub use ports::*;
