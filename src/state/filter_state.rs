use std::collections::{BTreeMap, BTreeSet};

use crate::state::record_store::RecordStore;

/// Which kind of geography a map click selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeoMode {
    #[default]
    State,
    Region,
}

impl GeoMode {
    pub fn label(&self) -> &'static str {
        match self {
            GeoMode::State => "State",
            GeoMode::Region => "Region",
        }
    }

    /// Geography filter a click on county `fips` selects in this mode, if its
    /// state (and for region mode, its region) can be derived.
    pub fn target_for(&self, store: &RecordStore, fips: u32) -> Option<GeoFilter> {
        let state = store.derive_state(fips)?;
        match self {
            GeoMode::State => Some(GeoFilter::State(state.to_string())),
            GeoMode::Region => store
                .region_of_state(state)
                .map(|r| GeoFilter::Region(r.to_string())),
        }
    }
}

/// Active geography filter. State and region are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GeoFilter {
    #[default]
    None,
    State(String),
    Region(String),
}

impl GeoFilter {
    pub fn state(&self) -> Option<&str> {
        match self {
            GeoFilter::State(s) => Some(s),
            _ => None,
        }
    }

    pub fn region(&self) -> Option<&str> {
        match self {
            GeoFilter::Region(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, GeoFilter::None)
    }
}

/// Closed numeric interval, stored with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, v: f64) -> bool {
        v.is_finite() && self.min <= v && v <= self.max
    }
}

/// The histogram/scatter brush. Both variants share one slot in
/// `FilterState`, so setting either replaces the other.
#[derive(Debug, Clone, PartialEq)]
pub enum BrushSelection {
    /// Histogram brush: value range on `axis` plus a bin-count range that only
    /// the histogram itself uses for dimming bars.
    Range {
        axis: String,
        x: Interval,
        y: Interval,
    },
    /// Scatter brush: explicit set of county codes inside the rectangle.
    Members(BTreeSet<u32>),
}

/// Education attainment categories shown in the donut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EduCategory {
    SomeCollege,
    HsGrad,
    NoHsGrad,
    BachelorsPlus,
}

impl EduCategory {
    pub const ALL: [EduCategory; 4] = [
        EduCategory::SomeCollege,
        EduCategory::HsGrad,
        EduCategory::NoHsGrad,
        EduCategory::BachelorsPlus,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EduCategory::SomeCollege => "SomeCollege",
            EduCategory::HsGrad => "HSGrad",
            EduCategory::NoHsGrad => "NoHSGrad",
            EduCategory::BachelorsPlus => "Bachelors+",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            EduCategory::SomeCollege => {
                "Percent of adults completing some college or associate degree, 2019-23"
            }
            EduCategory::HsGrad => {
                "Percent of adults who are high school graduates (or equivalent), 2019-23"
            }
            EduCategory::NoHsGrad => "Percent of adults who are not high school graduates, 2019-23",
            EduCategory::BachelorsPlus => {
                "Percent of adults with a bachelor's degree or higher, 2019-23"
            }
        }
    }
}

/// Donut slice filter. `threshold` is the category mean captured when the
/// slice was clicked and is not recomputed afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DonutFilter {
    pub category: EduCategory,
    pub threshold: f64,
}

/// Which part of the filter state a reset clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    /// Every predicate, clusters back to all enabled.
    All,
    /// Geography filter.
    Map,
    /// All axis brushes and the geography filter.
    Pcp,
    /// Histogram or scatter brush.
    Brush,
}

/// One interaction's worth of change, produced by a panel and applied by the
/// dashboard through [`FilterState::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCommand {
    ToggleGeo(GeoFilter),
    SetClusterEnabled { cluster: usize, enabled: bool },
    SetAxisBrush { axis: String, min: f64, max: f64 },
    ClearAxisBrush(String),
    SetRangeBrush(BrushSelection),
    ClearRangeBrush,
    ToggleDonut { category: EduCategory, threshold: f64 },
    Reset(ResetScope),
}

/// Shared cross-panel selection.
///
/// Fields are private; every transition goes through a named setter that
/// reports whether anything changed so callers only broadcast real changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    geo: GeoFilter,
    cluster_count: usize,
    selected_clusters: BTreeSet<usize>,
    axis_brushes: BTreeMap<String, Interval>,
    range_brush: Option<BrushSelection>,
    donut: Option<DonutFilter>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn geo(&self) -> &GeoFilter {
        &self.geo
    }

    pub fn selected_clusters(&self) -> &BTreeSet<usize> {
        &self.selected_clusters
    }

    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    pub fn is_cluster_selected(&self, cluster: usize) -> bool {
        self.selected_clusters.contains(&cluster)
    }

    pub fn axis_brushes(&self) -> &BTreeMap<String, Interval> {
        &self.axis_brushes
    }

    pub fn range_brush(&self) -> Option<&BrushSelection> {
        self.range_brush.as_ref()
    }

    pub fn donut(&self) -> Option<&DonutFilter> {
        self.donut.as_ref()
    }

    /// True when no predicate restricts anything.
    pub fn is_unfiltered(&self) -> bool {
        !self.geo.is_active()
            && self.selected_clusters.len() == self.cluster_count
            && self.axis_brushes.is_empty()
            && self.range_brush.is_none()
            && self.donut.is_none()
    }

    /// True when any predicate other than cluster membership is active.
    /// Points with no tabular row fail these closed.
    pub fn has_record_predicates(&self) -> bool {
        self.geo.is_active()
            || !self.axis_brushes.is_empty()
            || self.range_brush.is_some()
            || self.donut.is_some()
    }

    pub fn set_geo(&mut self, geo: GeoFilter) -> bool {
        if self.geo == geo {
            return false;
        }
        self.geo = geo;
        true
    }

    /// Map click: clicking the active state or region clears it, anything
    /// else replaces the current geography filter.
    pub fn toggle_geo_target(&mut self, target: GeoFilter) -> bool {
        if self.geo == target {
            self.set_geo(GeoFilter::None)
        } else {
            self.set_geo(target)
        }
    }

    /// Start over with `k` clusters, all enabled.
    pub fn init_clusters(&mut self, k: usize) -> bool {
        let all: BTreeSet<usize> = (0..k).collect();
        if self.cluster_count == k && self.selected_clusters == all {
            return false;
        }
        self.cluster_count = k;
        self.selected_clusters = all;
        true
    }

    pub fn set_cluster_enabled(&mut self, cluster: usize, enabled: bool) -> bool {
        if cluster >= self.cluster_count {
            return false;
        }
        if enabled {
            self.selected_clusters.insert(cluster)
        } else {
            self.selected_clusters.remove(&cluster)
        }
    }

    pub fn set_axis_brush(&mut self, axis: &str, a: f64, b: f64) -> bool {
        if !a.is_finite() || !b.is_finite() {
            return self.clear_axis_brush(axis);
        }
        let range = Interval::new(a, b);
        if self.axis_brushes.get(axis) == Some(&range) {
            return false;
        }
        self.axis_brushes.insert(axis.to_string(), range);
        true
    }

    pub fn clear_axis_brush(&mut self, axis: &str) -> bool {
        self.axis_brushes.remove(axis).is_some()
    }

    pub fn clear_axis_brushes(&mut self) -> bool {
        let changed = !self.axis_brushes.is_empty();
        self.axis_brushes.clear();
        changed
    }

    /// Replace the histogram/scatter brush. The most recent brush wins.
    pub fn set_range_brush(&mut self, brush: BrushSelection) -> bool {
        if self.range_brush.as_ref() == Some(&brush) {
            return false;
        }
        self.range_brush = Some(brush);
        true
    }

    pub fn clear_range_brush(&mut self) -> bool {
        self.range_brush.take().is_some()
    }

    /// Donut click. Clicking the active category clears the filter; any other
    /// category replaces it with the supplied snapshot threshold.
    pub fn toggle_donut(&mut self, category: EduCategory, threshold: f64) -> bool {
        match self.donut {
            Some(active) if active.category == category => {
                self.donut = None;
            }
            _ => {
                if !threshold.is_finite() {
                    return false;
                }
                self.donut = Some(DonutFilter {
                    category,
                    threshold,
                });
            }
        }
        true
    }

    /// Dispatch a command to its setter. Returns whether the state changed.
    pub fn apply(&mut self, command: &FilterCommand) -> bool {
        match command {
            FilterCommand::ToggleGeo(target) => self.toggle_geo_target(target.clone()),
            FilterCommand::SetClusterEnabled { cluster, enabled } => {
                self.set_cluster_enabled(*cluster, *enabled)
            }
            FilterCommand::SetAxisBrush { axis, min, max } => self.set_axis_brush(axis, *min, *max),
            FilterCommand::ClearAxisBrush(axis) => self.clear_axis_brush(axis),
            FilterCommand::SetRangeBrush(brush) => self.set_range_brush(brush.clone()),
            FilterCommand::ClearRangeBrush => self.clear_range_brush(),
            FilterCommand::ToggleDonut { category, threshold } => {
                self.toggle_donut(*category, *threshold)
            }
            FilterCommand::Reset(scope) => self.reset(*scope),
        }
    }

    pub fn reset(&mut self, scope: ResetScope) -> bool {
        match scope {
            ResetScope::All => {
                let k = self.cluster_count;
                let fresh = FilterState {
                    cluster_count: k,
                    selected_clusters: (0..k).collect(),
                    ..FilterState::default()
                };
                if *self == fresh {
                    return false;
                }
                *self = fresh;
                true
            }
            ResetScope::Map => self.set_geo(GeoFilter::None),
            ResetScope::Pcp => {
                let brushes = self.clear_axis_brushes();
                let geo = self.set_geo(GeoFilter::None);
                brushes || geo
            }
            ResetScope::Brush => self.clear_range_brush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_normalizes_order() {
        let i = Interval::new(5.0, 1.0);
        assert_eq!((i.min, i.max), (1.0, 5.0));
        assert!(i.contains(1.0) && i.contains(5.0));
        assert!(!i.contains(f64::NAN));
    }

    #[test]
    fn region_replaces_state() {
        let mut f = FilterState::new();
        assert!(f.set_geo(GeoFilter::State("Ohio".to_string())));
        assert!(f.set_geo(GeoFilter::Region("Midwest".to_string())));
        assert_eq!(f.geo().state(), None);
        assert_eq!(f.geo().region(), Some("Midwest"));
    }

    #[test]
    fn click_targets_follow_mode() {
        let store = crate::fixtures::fixture_store();
        assert_eq!(
            GeoMode::State.target_for(&store, 36003),
            Some(GeoFilter::State("New York".to_string()))
        );
        assert_eq!(
            GeoMode::Region.target_for(&store, 1999),
            Some(GeoFilter::Region("South".to_string()))
        );
        assert_eq!(GeoMode::State.target_for(&store, 99001), None);
    }

    #[test]
    fn toggling_same_geo_clears_it() {
        let mut f = FilterState::new();
        let ohio = GeoFilter::State("Ohio".to_string());
        assert!(f.toggle_geo_target(ohio.clone()));
        assert_eq!(f.geo(), &ohio);
        assert!(f.toggle_geo_target(ohio));
        assert_eq!(f.geo(), &GeoFilter::None);
    }

    #[test]
    fn cluster_setters_report_changes() {
        let mut f = FilterState::new();
        assert!(f.init_clusters(3));
        assert!(!f.init_clusters(3));
        assert!(f.set_cluster_enabled(1, false));
        assert!(!f.set_cluster_enabled(1, false));
        assert!(!f.set_cluster_enabled(7, false));
        assert_eq!(f.selected_clusters().iter().copied().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn axis_brushes_accumulate_and_clear() {
        let mut f = FilterState::new();
        assert!(f.set_axis_brush("Income", 10.0, 2.0));
        assert!(f.set_axis_brush("AvgScore", 1.0, 3.0));
        assert!(!f.set_axis_brush("Income", 2.0, 10.0));
        assert_eq!(f.axis_brushes().len(), 2);
        assert!(f.clear_axis_brush("Income"));
        assert!(!f.clear_axis_brush("Income"));
        assert!(f.clear_axis_brushes());
        assert!(f.axis_brushes().is_empty());
    }

    #[test]
    fn latest_brush_wins() {
        let mut f = FilterState::new();
        f.set_range_brush(BrushSelection::Range {
            axis: "Income".to_string(),
            x: Interval::new(0.0, 1.0),
            y: Interval::new(0.0, 5.0),
        });
        f.set_range_brush(BrushSelection::Members(BTreeSet::from([1001])));
        assert_eq!(
            f.range_brush(),
            Some(&BrushSelection::Members(BTreeSet::from([1001])))
        );
    }

    #[test]
    fn donut_toggle_keeps_snapshot_threshold() {
        let mut f = FilterState::new();
        assert!(f.toggle_donut(EduCategory::HsGrad, 45.0));
        assert_eq!(f.donut().map(|d| d.threshold), Some(45.0));
        // A different category replaces the active one.
        assert!(f.toggle_donut(EduCategory::NoHsGrad, 15.0));
        assert_eq!(f.donut().map(|d| d.category), Some(EduCategory::NoHsGrad));
        // Clicking the active category again clears, whatever mean it shows now.
        assert!(f.toggle_donut(EduCategory::NoHsGrad, 99.0));
        assert!(f.donut().is_none());
        assert!(!f.toggle_donut(EduCategory::HsGrad, f64::NAN));
    }

    #[test]
    fn commands_route_to_setters() {
        let mut f = FilterState::new();
        f.init_clusters(2);
        assert!(f.apply(&FilterCommand::SetClusterEnabled { cluster: 1, enabled: false }));
        assert!(f.apply(&FilterCommand::SetAxisBrush {
            axis: "AvgScore".to_string(),
            min: 3.0,
            max: 1.0,
        }));
        assert_eq!(f.axis_brushes()["AvgScore"], Interval::new(1.0, 3.0));
        assert!(f.apply(&FilterCommand::ToggleGeo(GeoFilter::Region("West".to_string()))));
        assert!(!f.apply(&FilterCommand::ClearRangeBrush));
        assert!(f.apply(&FilterCommand::Reset(ResetScope::All)));
        assert!(f.is_unfiltered());
    }

    #[test]
    fn scoped_resets() {
        let mut f = FilterState::new();
        f.init_clusters(2);
        f.set_cluster_enabled(0, false);
        f.set_geo(GeoFilter::State("Ohio".to_string()));
        f.set_axis_brush("Income", 0.0, 1.0);
        f.set_range_brush(BrushSelection::Members(BTreeSet::new()));
        f.toggle_donut(EduCategory::HsGrad, 40.0);

        assert!(f.reset(ResetScope::Brush));
        assert!(f.range_brush().is_none());
        assert!(f.reset(ResetScope::Pcp));
        assert!(f.axis_brushes().is_empty());
        assert!(!f.geo().is_active());
        assert!(!f.reset(ResetScope::Map));
        assert!(f.reset(ResetScope::All));
        assert!(f.is_unfiltered());
        assert_eq!(f.selected_clusters().len(), 2);
        assert!(!f.reset(ResetScope::All));
    }
}
