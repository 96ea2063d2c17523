// crates/core/src/widget_sync.rs
//! Keeps the global "test clients" toggle and the per-chart checkboxes of
//! the current page consistent with each other.
//!
//! Every page carries one checkbox per chart. Flipping the toggle forces all
//! checkboxes to follow; flipping a checkbox recomputes the toggle from the
//! checkbox population (all checked → Hide, none → Show, anything else →
//! Mixed). Each checkbox drives an expensive chart query, so [`reconcile`]
//! reports every target whose effective value does not change as
//! [`Update::Unchanged`] and the caller only re-queries charts that got an
//! [`Update::Set`].
//!
//! [`reconcile`] is a pure function over a [`ReconciliationSnapshot`]. The
//! mutable side lives in [`WidgetRegistry`], which is rebuilt on every
//! navigation and applies patches positionally.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Values
// ============================================================================

/// State of the global toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterState {
    Hide,
    Show,
    /// Checkboxes disagree. Never written into a checkbox.
    Mixed,
}

impl FilterState {
    pub fn from_default(hide: bool) -> Self {
        if hide {
            FilterState::Hide
        } else {
            FilterState::Show
        }
    }

    /// The checkbox value this state forces, or `None` for `Mixed`.
    pub fn checkbox_value(self) -> Option<bool> {
        match self {
            FilterState::Hide => Some(true),
            FilterState::Show => Some(false),
            FilterState::Mixed => None,
        }
    }

    /// Toggle state implied by `checked` out of `total` checkboxes.
    pub fn from_checked_count(checked: usize, total: usize) -> Self {
        debug_assert!(checked <= total);
        if checked == 0 {
            FilterState::Show
        } else if checked == total {
            FilterState::Hide
        } else {
            FilterState::Mixed
        }
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterState::Hide => "hide",
            FilterState::Show => "show",
            FilterState::Mixed => "mixed",
        })
    }
}

/// Stable identifier of a chart (and of the checkbox attached to it).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlotSlug(String);

impl PlotSlug {
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlotSlug {
    fn from(slug: &str) -> Self {
        Self::new(slug)
    }
}

impl fmt::Display for PlotSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What caused a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "slug", rename_all = "snake_case")]
pub enum Trigger {
    /// Page mount or navigation; no user input involved.
    Navigation,
    /// The user changed the global toggle.
    Toggle,
    /// The user changed the checkbox of one chart.
    Checkbox(PlotSlug),
}

impl Trigger {
    fn is_user_action(&self) -> bool {
        !matches!(self, Trigger::Navigation)
    }
}

/// UI state captured right before reconciliation.
///
/// `checked` and `rendered` are in registry order and must have the same
/// length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSnapshot {
    pub toggle: FilterState,
    pub checked: Vec<bool>,
    pub rendered: Vec<bool>,
}

impl ReconciliationSnapshot {
    pub fn checked_count(&self) -> usize {
        self.checked.iter().filter(|c| **c).count()
    }
}

/// One entry of a patch.
///
/// Both variants carry the effective value; `Unchanged` tells the caller
/// not to write it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Update<T> {
    Unchanged(T),
    Set(T),
}

impl<T: Copy + PartialEq> Update<T> {
    /// `Unchanged` when `next` equals `current`, `Set` otherwise.
    pub fn masked(current: T, next: T) -> Self {
        if current == next {
            Update::Unchanged(next)
        } else {
            Update::Set(next)
        }
    }

    pub fn value(self) -> T {
        match self {
            Update::Unchanged(v) | Update::Set(v) => v,
        }
    }

    pub fn is_noop(self) -> bool {
        matches!(self, Update::Unchanged(_))
    }

    /// The value to write, if any.
    pub fn changed(self) -> Option<T> {
        match self {
            Update::Set(v) => Some(v),
            Update::Unchanged(_) => None,
        }
    }
}

// ============================================================================
// Phases
// ============================================================================

/// Which rule produced a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// No checkboxes mounted; nothing to do.
    EmptyRegistry,
    /// Checkboxes mounted but no chart has data yet.
    ChartsUnrendered,
    ToggleDriven,
    CheckboxDriven,
}

impl SyncPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncPhase::EmptyRegistry => "empty_registry",
            SyncPhase::ChartsUnrendered => "charts_unrendered",
            SyncPhase::ToggleDriven => "toggle_driven",
            SyncPhase::CheckboxDriven => "checkbox_driven",
        }
    }
}

/// The trigger and the render state point at different phases.
///
/// The phase is selected from the render state; the divergence is reported
/// so callers can tell the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseDivergence {
    /// Navigation trigger, but at least one chart already has data.
    NavigationWithRenderedCharts,
    /// User trigger, but no chart has data yet.
    UserTriggerBeforeRender,
}

/// Select the phase for `trigger` given the snapshot.
pub fn select_phase(
    trigger: &Trigger,
    snapshot: &ReconciliationSnapshot,
) -> (SyncPhase, Option<PhaseDivergence>) {
    if snapshot.checked.is_empty() {
        return (SyncPhase::EmptyRegistry, None);
    }
    let any_rendered = snapshot.rendered.iter().any(|r| *r);
    match (trigger, any_rendered) {
        (Trigger::Navigation, false) => (SyncPhase::ChartsUnrendered, None),
        (Trigger::Navigation, true) => (
            SyncPhase::ChartsUnrendered,
            Some(PhaseDivergence::NavigationWithRenderedCharts),
        ),
        (t, false) if t.is_user_action() => (
            SyncPhase::ChartsUnrendered,
            Some(PhaseDivergence::UserTriggerBeforeRender),
        ),
        (Trigger::Toggle, _) => (SyncPhase::ToggleDriven, None),
        (_, _) => (SyncPhase::CheckboxDriven, None),
    }
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Writes produced by one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPatch {
    pub phase: SyncPhase,
    pub toggle: Update<FilterState>,
    /// One entry per checkbox, in snapshot order.
    pub checkboxes: Vec<Update<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divergence: Option<PhaseDivergence>,
}

impl SyncPatch {
    /// True when applying the patch writes nothing.
    pub fn is_noop(&self) -> bool {
        self.toggle.is_noop() && self.checkboxes.iter().all(|c| c.is_noop())
    }

    /// Positions of checkboxes whose value is written.
    pub fn changed_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.checkboxes
            .iter()
            .enumerate()
            .filter(|(_, u)| !u.is_noop())
            .map(|(i, _)| i)
    }
}

/// Reconcile the toggle and checkboxes after `trigger`.
///
/// Returns `None` when nothing may be written (no checkboxes mounted).
///
/// # Panics
///
/// - `checked` and `rendered` differ in length.
/// - A toggle-driven reconciliation sees a `Mixed` toggle; users can only
///   pick Hide or Show.
pub fn reconcile(
    trigger: &Trigger,
    snapshot: &ReconciliationSnapshot,
    hide_default: bool,
) -> Option<SyncPatch> {
    assert_eq!(
        snapshot.checked.len(),
        snapshot.rendered.len(),
        "checkbox values and rendered flags must cover the same widgets"
    );

    let (phase, divergence) = select_phase(trigger, snapshot);
    if let Some(divergence) = divergence {
        tracing::warn!(
            ?trigger,
            ?divergence,
            phase = phase.as_str(),
            "Trigger and render state disagree on reconciliation phase"
        );
    }

    let current = snapshot.toggle;
    let (toggle, checkboxes) = match phase {
        SyncPhase::EmptyRegistry => {
            tracing::debug!(?trigger, "No checkboxes mounted, skipping reconciliation");
            return None;
        }
        SyncPhase::ChartsUnrendered => {
            let next = match current {
                FilterState::Mixed => FilterState::from_default(hide_default),
                kept => kept,
            };
            (Update::masked(current, next), force_all(snapshot, next))
        }
        SyncPhase::ToggleDriven => {
            assert_ne!(
                current,
                FilterState::Mixed,
                "toggle-driven reconciliation requires a concrete toggle"
            );
            (Update::Set(current), force_all(snapshot, current))
        }
        SyncPhase::CheckboxDriven => {
            let next = FilterState::from_checked_count(snapshot.checked_count(), snapshot.checked.len());
            let checkboxes = match next {
                FilterState::Mixed => snapshot.checked.iter().map(|c| Update::Unchanged(*c)).collect(),
                concrete => force_all(snapshot, concrete),
            };
            (Update::masked(current, next), checkboxes)
        }
    };

    let patch = SyncPatch {
        phase,
        toggle,
        checkboxes,
        divergence,
    };
    tracing::debug!(
        phase = phase.as_str(),
        toggle = %patch.toggle.value(),
        widgets = patch.checkboxes.len(),
        writes = patch.changed_positions().count(),
        "Reconciled test-client widgets"
    );
    Some(patch)
}

fn force_all(snapshot: &ReconciliationSnapshot, state: FilterState) -> Vec<Update<bool>> {
    let Some(value) = state.checkbox_value() else {
        unreachable!("checkboxes are only forced to a concrete state")
    };
    snapshot
        .checked
        .iter()
        .map(|current| Update::masked(*current, value))
        .collect()
}

// ============================================================================
// Registry
// ============================================================================

/// A mounted checkbox and the chart it drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Widget {
    pub slug: PlotSlug,
    pub checked: bool,
    pub rendered: bool,
}

/// Checkboxes of the current page, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WidgetRegistry {
    widgets: Vec<Widget>,
}

impl WidgetRegistry {
    /// Mount fresh widgets for `slugs`. Charts start unrendered.
    ///
    /// # Panics
    ///
    /// Panics on duplicate slugs.
    pub fn mount<I>(slugs: I, hide_default: bool) -> Self
    where
        I: IntoIterator<Item = PlotSlug>,
    {
        let mut seen = HashSet::new();
        let widgets = slugs
            .into_iter()
            .map(|slug| {
                assert!(seen.insert(slug.clone()), "duplicate plot slug {slug}");
                Widget {
                    slug,
                    checked: hide_default,
                    rendered: false,
                }
            })
            .collect();
        Self { widgets }
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn position(&self, slug: &PlotSlug) -> Option<usize> {
        self.widgets.iter().position(|w| &w.slug == slug)
    }

    pub fn get(&self, slug: &PlotSlug) -> Option<&Widget> {
        self.widgets.iter().find(|w| &w.slug == slug)
    }

    /// Record a user edit. Returns the previous value, or `None` when the
    /// slug is not mounted.
    pub fn set_checked(&mut self, slug: &PlotSlug, checked: bool) -> Option<bool> {
        let widget = self.widgets.iter_mut().find(|w| &w.slug == slug)?;
        Some(std::mem::replace(&mut widget.checked, checked))
    }

    /// Mark the chart of `slug` as fed with data. Returns `false` when the
    /// slug is not mounted.
    pub fn mark_rendered(&mut self, slug: &PlotSlug) -> bool {
        match self.widgets.iter_mut().find(|w| &w.slug == slug) {
            Some(widget) => {
                widget.rendered = true;
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self, toggle: FilterState) -> ReconciliationSnapshot {
        ReconciliationSnapshot {
            toggle,
            checked: self.widgets.iter().map(|w| w.checked).collect(),
            rendered: self.widgets.iter().map(|w| w.rendered).collect(),
        }
    }

    /// Write the checkbox entries of `patch`. Returns the positions written.
    ///
    /// # Panics
    ///
    /// Panics if the patch was computed for a registry of another size.
    pub fn apply(&mut self, patch: &SyncPatch) -> Vec<usize> {
        assert_eq!(
            patch.checkboxes.len(),
            self.widgets.len(),
            "patch does not match the mounted widgets"
        );
        let mut written = Vec::new();
        for (i, (widget, update)) in self.widgets.iter_mut().zip(&patch.checkboxes).enumerate() {
            if let Some(value) = update.changed() {
                widget.checked = value;
                written.push(i);
            }
        }
        written
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn snap(toggle: FilterState, checked: &[bool], rendered: bool) -> ReconciliationSnapshot {
        ReconciliationSnapshot {
            toggle,
            checked: checked.to_vec(),
            rendered: vec![rendered; checked.len()],
        }
    }

    fn slugs(names: &[&str]) -> Vec<PlotSlug> {
        names.iter().map(|n| PlotSlug::from(*n)).collect()
    }

    #[test]
    fn test_empty_registry_prevents_update() {
        let s = snap(FilterState::Hide, &[], false);
        assert_eq!(reconcile(&Trigger::Navigation, &s, true), None);
        assert_eq!(reconcile(&Trigger::Toggle, &s, true), None);
    }

    #[test]
    fn test_unrendered_mixed_toggle_resolves_to_default() {
        let s = snap(FilterState::Mixed, &[true, false], false);
        let patch = reconcile(&Trigger::Navigation, &s, false).unwrap();
        assert_eq!(patch.phase, SyncPhase::ChartsUnrendered);
        assert_eq!(patch.toggle, Update::Set(FilterState::Show));
        assert_eq!(patch.checkboxes, vec![Update::Set(false), Update::Unchanged(false)]);
        assert_eq!(patch.divergence, None);
    }

    #[test]
    fn test_unrendered_kept_toggle_is_masked() {
        let s = snap(FilterState::Hide, &[true, true, false], false);
        let patch = reconcile(&Trigger::Navigation, &s, false).unwrap();
        assert_eq!(patch.toggle, Update::Unchanged(FilterState::Hide));
        assert_eq!(
            patch.checkboxes,
            vec![Update::Unchanged(true), Update::Unchanged(true), Update::Set(true)]
        );
    }

    #[test]
    fn test_toggle_show_to_hide_sets_all_children() {
        // Three unchecked widgets, user flips the toggle to Hide.
        let s = snap(FilterState::Hide, &[false, false, false], true);
        let patch = reconcile(&Trigger::Toggle, &s, false).unwrap();
        assert_eq!(patch.phase, SyncPhase::ToggleDriven);
        assert_eq!(patch.toggle, Update::Set(FilterState::Hide));
        assert_eq!(patch.checkboxes, vec![Update::Set(true); 3]);
    }

    #[test]
    fn test_toggle_masks_children_already_matching() {
        let s = snap(FilterState::Show, &[false, true], true);
        let patch = reconcile(&Trigger::Toggle, &s, true).unwrap();
        assert_eq!(patch.toggle, Update::Set(FilterState::Show));
        assert_eq!(patch.checkboxes, vec![Update::Unchanged(false), Update::Set(false)]);
    }

    #[test]
    #[should_panic(expected = "concrete toggle")]
    fn test_toggle_driven_rejects_mixed() {
        let s = snap(FilterState::Mixed, &[true], true);
        reconcile(&Trigger::Toggle, &s, true);
    }

    #[test]
    fn test_checkbox_partial_selection_is_mixed() {
        let s = snap(FilterState::Hide, &[true, false, true], true);
        let patch = reconcile(&Trigger::Checkbox("b".into()), &s, true).unwrap();
        assert_eq!(patch.phase, SyncPhase::CheckboxDriven);
        assert_eq!(patch.toggle, Update::Set(FilterState::Mixed));
        assert_eq!(
            patch.checkboxes,
            vec![Update::Unchanged(true), Update::Unchanged(false), Update::Unchanged(true)]
        );
    }

    #[test]
    fn test_checkbox_all_and_none() {
        let all = snap(FilterState::Mixed, &[true, true], true);
        let patch = reconcile(&Trigger::Checkbox("a".into()), &all, false).unwrap();
        assert_eq!(patch.toggle, Update::Set(FilterState::Hide));
        assert!(patch.checkboxes.iter().all(|c| c.is_noop()));

        let none = snap(FilterState::Mixed, &[false, false], true);
        let patch = reconcile(&Trigger::Checkbox("a".into()), &none, true).unwrap();
        assert_eq!(patch.toggle, Update::Set(FilterState::Show));
        assert!(patch.checkboxes.iter().all(|c| c.is_noop()));
    }

    #[test]
    fn test_user_trigger_before_render_diverges() {
        let s = snap(FilterState::Mixed, &[true, false], false);
        let patch = reconcile(&Trigger::Toggle, &s, true).unwrap();
        assert_eq!(patch.phase, SyncPhase::ChartsUnrendered);
        assert_eq!(patch.divergence, Some(PhaseDivergence::UserTriggerBeforeRender));
        assert_eq!(patch.toggle, Update::Set(FilterState::Hide));
    }

    #[test]
    fn test_navigation_with_rendered_charts_diverges() {
        let s = ReconciliationSnapshot {
            toggle: FilterState::Show,
            checked: vec![false, true],
            rendered: vec![true, false],
        };
        let patch = reconcile(&Trigger::Navigation, &s, true).unwrap();
        assert_eq!(patch.phase, SyncPhase::ChartsUnrendered);
        assert_eq!(patch.divergence, Some(PhaseDivergence::NavigationWithRenderedCharts));
        assert_eq!(patch.checkboxes, vec![Update::Unchanged(false), Update::Set(false)]);
    }

    #[test]
    #[should_panic(expected = "same widgets")]
    fn test_length_mismatch_panics() {
        let s = ReconciliationSnapshot {
            toggle: FilterState::Hide,
            checked: vec![true, true],
            rendered: vec![true],
        };
        reconcile(&Trigger::Navigation, &s, true);
    }

    #[test]
    fn test_patch_serializes_with_ops() {
        let s = snap(FilterState::Show, &[false], true);
        let patch = reconcile(&Trigger::Toggle, &s, true).unwrap();
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "phase": "toggle_driven",
                "toggle": {"op": "set", "value": "show"},
                "checkboxes": [{"op": "unchanged", "value": false}],
            })
        );
    }

    #[test]
    fn test_trigger_json_shape() {
        let t: Trigger = serde_json::from_str(r#"{"kind":"checkbox","slug":"num-messages"}"#).unwrap();
        assert_eq!(t, Trigger::Checkbox("num-messages".into()));
        let t: Trigger = serde_json::from_str(r#"{"kind":"navigation"}"#).unwrap();
        assert_eq!(t, Trigger::Navigation);
    }

    #[test]
    fn test_registry_mount_snapshot_apply() {
        let mut reg = WidgetRegistry::mount(slugs(&["a", "b", "c"]), false);
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.set_checked(&"b".into(), true), Some(false));
        assert_eq!(reg.set_checked(&"zzz".into(), true), None);
        assert!(reg.mark_rendered(&"a".into()));
        assert!(!reg.mark_rendered(&"zzz".into()));

        let s = reg.snapshot(FilterState::Hide);
        assert_eq!(s.checked, vec![false, true, false]);
        assert_eq!(s.rendered, vec![true, false, false]);

        let patch = reconcile(&Trigger::Toggle, &s, false).unwrap();
        assert_eq!(reg.apply(&patch), vec![0, 2]);
        assert!(reg.widgets().iter().all(|w| w.checked));
    }

    #[test]
    #[should_panic(expected = "duplicate plot slug")]
    fn test_registry_rejects_duplicate_slugs() {
        WidgetRegistry::mount(slugs(&["a", "a"]), true);
    }

    fn arb_filter() -> impl Strategy<Value = FilterState> {
        prop_oneof![
            Just(FilterState::Hide),
            Just(FilterState::Show),
            Just(FilterState::Mixed)
        ]
    }

    fn arb_snapshot() -> impl Strategy<Value = ReconciliationSnapshot> {
        (arb_filter(), prop::collection::vec((any::<bool>(), any::<bool>()), 1..8)).prop_map(
            |(toggle, widgets)| ReconciliationSnapshot {
                toggle,
                checked: widgets.iter().map(|w| w.0).collect(),
                rendered: widgets.iter().map(|w| w.1).collect(),
            },
        )
    }

    fn applied(snapshot: &ReconciliationSnapshot, patch: &SyncPatch) -> ReconciliationSnapshot {
        ReconciliationSnapshot {
            toggle: patch.toggle.value(),
            checked: patch.checkboxes.iter().map(|c| c.value()).collect(),
            rendered: snapshot.rendered.clone(),
        }
    }

    proptest! {
        #[test]
        fn prop_checkbox_driven_toggle_matches_population(
            checked in prop::collection::vec(any::<bool>(), 1..10),
            toggle in arb_filter(),
        ) {
            let s = ReconciliationSnapshot {
                toggle,
                rendered: vec![true; checked.len()],
                checked: checked.clone(),
            };
            let patch = reconcile(&Trigger::Checkbox("x".into()), &s, true).unwrap();
            let expected = if checked.iter().all(|c| *c) {
                FilterState::Hide
            } else if checked.iter().all(|c| !*c) {
                FilterState::Show
            } else {
                FilterState::Mixed
            };
            prop_assert_eq!(patch.toggle.value(), expected);
        }

        #[test]
        fn prop_masking_is_minimal(s in arb_snapshot(), hide in any::<bool>(), by_checkbox in any::<bool>()) {
            let trigger = if by_checkbox { Trigger::Checkbox("x".into()) } else { Trigger::Navigation };
            let patch = reconcile(&trigger, &s, hide).unwrap();
            for (update, current) in patch.checkboxes.iter().zip(&s.checked) {
                prop_assert_eq!(update.is_noop(), update.value() == *current);
            }
            prop_assert_eq!(patch.toggle.is_noop(), patch.toggle.value() == s.toggle);
            prop_assert_eq!(patch.checkboxes.len(), s.checked.len());
        }

        #[test]
        fn prop_reconcile_is_idempotent(s in arb_snapshot(), hide in any::<bool>(), by_checkbox in any::<bool>()) {
            let trigger = if by_checkbox { Trigger::Checkbox("x".into()) } else { Trigger::Navigation };
            let first = reconcile(&trigger, &s, hide).unwrap();
            let next = applied(&s, &first);
            let second = reconcile(&trigger, &next, hide).unwrap();
            prop_assert!(second.is_noop(), "second pass wrote {:?}", second);
        }
    }
}
