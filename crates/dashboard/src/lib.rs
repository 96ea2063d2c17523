// crates/dashboard/src/lib.rs
//! Dashboard side of the backbone data dashboard: the page catalog, chart
//! series assembly and the per-session event dispatcher.
pub mod catalog;
pub mod charts;
pub mod error;
pub mod session;

pub use catalog::{ChartKind, Page, PlotSpec};
pub use error::{DispatchError, DispatchResult};
pub use session::{ChartRequest, DashboardSession, DispatchOutcome, SessionStore};
