//! requisition-core: Shared infrastructure for the requisition dashboard crates.
pub mod config;
pub mod error;
pub mod observability;
pub mod pagination;

pub use chrono;
pub use reqwest;
pub use serde;
pub use serde_json;
pub use tracing;
pub use uuid;
pub use validator;
