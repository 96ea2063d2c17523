// crates/dashboard/src/session.rs
//! Per-browser-session dispatcher.
//!
//! A [`DashboardSession`] owns the toggle state and the widget registry of
//! the mounted page. Every event captures a snapshot, runs
//! [`reconcile`](bbdash_core::reconcile), applies the checkbox writes and
//! reports which charts have to be fetched again.

use std::sync::Arc;

use bbdash_core::{reconcile, FilterState, PlotSlug, SyncPatch, Trigger, WidgetRegistry};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::{self, Page};
use crate::error::{DispatchError, DispatchResult};

/// A chart that must be (re)queried with the given filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartRequest {
    pub slug: PlotSlug,
    pub hide_test_clients: bool,
}

/// Result of one dispatched event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    /// `None` when reconciliation prevented the update (or did not run).
    pub patch: Option<SyncPatch>,
    /// Charts to fetch, in page order.
    pub refresh: Vec<ChartRequest>,
}

impl DispatchOutcome {
    pub fn refreshes(&self, slug: &str) -> bool {
        self.refresh.iter().any(|r| r.slug.as_str() == slug)
    }
}

#[derive(Debug, Clone)]
pub struct DashboardSession {
    hide_default: bool,
    toggle: FilterState,
    page: Option<&'static Page>,
    registry: WidgetRegistry,
}

impl DashboardSession {
    pub fn new(hide_default: bool) -> Self {
        Self {
            hide_default,
            toggle: FilterState::from_default(hide_default),
            page: None,
            registry: WidgetRegistry::default(),
        }
    }

    pub fn toggle(&self) -> FilterState {
        self.toggle
    }

    pub fn page(&self) -> Option<&'static Page> {
        self.page
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    /// Mount the page at `path`, replacing the previous page's widgets.
    pub fn navigate(&mut self, path: &str) -> DispatchResult<DispatchOutcome> {
        let Some(page) = catalog::page(path) else {
            warn!(path, "Navigation to unknown page rejected");
            return Err(DispatchError::unknown_page(path));
        };
        self.page = Some(page);
        self.registry = WidgetRegistry::mount(page.slugs(), self.hide_default);
        info!(page = page.name, widgets = self.registry.len(), "Mounted page");
        Ok(self.dispatch(Trigger::Navigation, None))
    }

    /// The user picked Hide or Show on the global toggle.
    pub fn set_toggle(&mut self, state: FilterState) -> DispatchResult<DispatchOutcome> {
        if state == FilterState::Mixed {
            warn!("Rejected attempt to set the toggle to mixed");
            return Err(DispatchError::MixedToggle);
        }
        self.toggle = state;
        Ok(self.dispatch(Trigger::Toggle, None))
    }

    /// The user (un)checked the checkbox of one chart.
    pub fn set_checkbox(&mut self, slug: &PlotSlug, checked: bool) -> DispatchResult<DispatchOutcome> {
        let page = self.mounted_page()?;
        let Some(previous) = self.registry.set_checked(slug, checked) else {
            warn!(%slug, page = page.path, "Checkbox event for unmounted plot rejected");
            return Err(DispatchError::plot_not_mounted(slug, page.path));
        };
        let edited = (previous != checked).then(|| slug.clone());
        Ok(self.dispatch(Trigger::Checkbox(slug.clone()), edited))
    }

    /// The chart of `slug` received its data.
    pub fn mark_rendered(&mut self, slug: &PlotSlug) -> DispatchResult<DispatchOutcome> {
        let page = self.mounted_page()?;
        if !self.registry.mark_rendered(slug) {
            warn!(%slug, page = page.path, "Render event for unmounted plot rejected");
            return Err(DispatchError::plot_not_mounted(slug, page.path));
        }
        Ok(DispatchOutcome::default())
    }

    fn mounted_page(&self) -> DispatchResult<&'static Page> {
        self.page.ok_or(DispatchError::NoPageMounted)
    }

    fn dispatch(&mut self, trigger: Trigger, edited: Option<PlotSlug>) -> DispatchOutcome {
        let snapshot = self.registry.snapshot(self.toggle);
        let Some(patch) = reconcile(&trigger, &snapshot, self.hide_default) else {
            return DispatchOutcome::default();
        };

        self.toggle = patch.toggle.value();
        let mut dirty = vec![false; self.registry.len()];
        for i in self.registry.apply(&patch) {
            dirty[i] = true;
        }
        if let Some(pos) = edited.and_then(|slug| self.registry.position(&slug)) {
            dirty[pos] = true;
        }

        let refresh: Vec<ChartRequest> = self
            .registry
            .widgets()
            .iter()
            .zip(&dirty)
            .filter(|(w, dirty)| **dirty || !w.rendered)
            .map(|(w, _)| ChartRequest {
                slug: w.slug.clone(),
                hide_test_clients: w.checked,
            })
            .collect();

        info!(
            phase = patch.phase.as_str(),
            toggle = %self.toggle,
            refresh = refresh.len(),
            "Applied widget patch"
        );
        DispatchOutcome {
            patch: Some(patch),
            refresh,
        }
    }
}

/// All open sessions, keyed by session id.
#[derive(Debug, Clone)]
pub struct SessionStore {
    hide_default: bool,
    sessions: Arc<DashMap<Uuid, DashboardSession>>,
}

impl SessionStore {
    pub fn new(hide_default: bool) -> Self {
        Self {
            hide_default,
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Open a session with nothing mounted yet.
    pub fn open(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.insert(id, DashboardSession::new(self.hide_default));
        info!(session = %id, "Opened dashboard session");
        id
    }

    pub fn close(&self, id: Uuid) -> bool {
        self.sessions.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Run `f` with exclusive access to session `id`.
    pub fn with_session<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut DashboardSession) -> DispatchResult<R>,
    ) -> DispatchResult<R> {
        let Some(mut session) = self.sessions.get_mut(&id) else {
            warn!(session = %id, "Event for unknown session rejected");
            return Err(DispatchError::UnknownSession(id));
        };
        f(session.value_mut())
    }

    pub fn navigate(&self, id: Uuid, path: &str) -> DispatchResult<DispatchOutcome> {
        self.with_session(id, |s| s.navigate(path))
    }

    pub fn set_toggle(&self, id: Uuid, state: FilterState) -> DispatchResult<DispatchOutcome> {
        self.with_session(id, |s| s.set_toggle(state))
    }

    pub fn set_checkbox(&self, id: Uuid, slug: &PlotSlug, checked: bool) -> DispatchResult<DispatchOutcome> {
        self.with_session(id, |s| s.set_checkbox(slug, checked))
    }

    pub fn mark_rendered(&self, id: Uuid, slug: &PlotSlug) -> DispatchResult<DispatchOutcome> {
        self.with_session(id, |s| s.mark_rendered(slug))
    }
}
