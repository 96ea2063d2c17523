// crates/dashboard/src/error.rs
use bbdash_core::PlotSlug;
use thiserror::Error;
use uuid::Uuid;

/// Events the dispatcher refuses to apply. Nothing is written when one of
/// these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unknown page: {path}")]
    UnknownPage { path: String },

    #[error("Plot '{slug}' is not mounted on page '{page}'")]
    PlotNotMounted { slug: PlotSlug, page: String },

    #[error("No page is mounted yet")]
    NoPageMounted,

    #[error("The toggle cannot be set to 'mixed' directly")]
    MixedToggle,

    #[error("Unknown session: {0}")]
    UnknownSession(Uuid),
}

impl DispatchError {
    pub fn unknown_page(path: impl Into<String>) -> Self {
        Self::UnknownPage { path: path.into() }
    }

    pub fn plot_not_mounted(slug: &PlotSlug, page: impl Into<String>) -> Self {
        Self::PlotNotMounted {
            slug: slug.clone(),
            page: page.into(),
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
