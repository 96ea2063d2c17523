// crates/core/src/lib.rs
//! Pure logic behind the backbone data dashboard: bucketing of chart axes,
//! test-client visibility reconciliation, and the domain vocabulary shared
//! by both.
pub mod bucket;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod widget_sync;

pub use bucket::*;
pub use config::*;
pub use domain::*;
pub use error::*;
pub use widget_sync::*;
