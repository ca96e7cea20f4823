use crate::state::filter_state::{BrushSelection, FilterState, GeoFilter};
use crate::state::record_store::{AugmentedRecord, AugmentedStore, ClusterAssignment, RecordStore};

/// Subset of the five predicates to apply. Panels that aggregate over a
/// partially filtered subset pass a narrower mask than `ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predicates {
    pub cluster: bool,
    pub geo: bool,
    pub axis: bool,
    pub brush: bool,
    pub donut: bool,
}

impl Predicates {
    pub const ALL: Predicates = Predicates {
        cluster: true,
        geo: true,
        axis: true,
        brush: true,
        donut: true,
    };

    pub const GEO_CLUSTER: Predicates = Predicates {
        cluster: true,
        geo: true,
        axis: false,
        brush: false,
        donut: false,
    };

    pub const fn without_brush(self) -> Self {
        Predicates {
            brush: false,
            ..self
        }
    }

    pub const fn without_donut(self) -> Self {
        Predicates {
            donut: false,
            ..self
        }
    }
}

/// Whether `record` passes every active predicate.
pub fn passes(
    record: AugmentedRecord<'_>,
    clusters: Option<&ClusterAssignment>,
    filter: &FilterState,
) -> bool {
    passes_with(record, clusters, filter, Predicates::ALL)
}

/// Like [`passes`] but only for the predicates enabled in `mask`.
///
/// Any predicate that references a missing or non-finite value fails.
/// Before a cluster assignment is loaded the cluster predicate is vacuous.
pub fn passes_with(
    record: AugmentedRecord<'_>,
    clusters: Option<&ClusterAssignment>,
    filter: &FilterState,
    mask: Predicates,
) -> bool {
    if mask.cluster {
        if let Some(assignment) = clusters {
            match assignment.cluster_of(record.fips()) {
                Some(c) if filter.is_cluster_selected(c) => {}
                _ => return false,
            }
        }
    }

    if mask.geo {
        let ok = match filter.geo() {
            GeoFilter::None => true,
            GeoFilter::State(s) => record.record.state_name == *s,
            GeoFilter::Region(r) => record.record.region == *r,
        };
        if !ok {
            return false;
        }
    }

    if mask.axis {
        for (axis, range) in filter.axis_brushes() {
            match record.value(axis) {
                Some(v) if range.contains(v) => {}
                _ => return false,
            }
        }
    }

    if mask.brush {
        match filter.range_brush() {
            None => {}
            Some(BrushSelection::Members(set)) => {
                if !set.contains(&record.fips()) {
                    return false;
                }
            }
            Some(BrushSelection::Range { axis, x, .. }) => match record.value(axis) {
                Some(v) if x.contains(v) => {}
                _ => return false,
            },
        }
    }

    if mask.donut {
        if let Some(donut) = filter.donut() {
            match record.value(donut.category.column()) {
                Some(v) if v >= donut.threshold => {}
                _ => return false,
            }
        }
    }

    true
}

/// Evaluation for a map county that has no tabular row. Only the cluster and
/// geography predicates apply, each only when derivable: the cluster when the
/// assignment covers the code, the state from the code's state prefix. An
/// active geography filter fails closed when the state is unknown.
pub fn passes_unmatched(
    fips: u32,
    store: &RecordStore,
    clusters: Option<&ClusterAssignment>,
    filter: &FilterState,
) -> bool {
    if let Some(c) = clusters.and_then(|a| a.cluster_of(fips)) {
        if !filter.is_cluster_selected(c) {
            return false;
        }
    }
    match filter.geo() {
        GeoFilter::None => true,
        GeoFilter::State(s) => store.derive_state(fips) == Some(s.as_str()),
        GeoFilter::Region(r) => store
            .derive_state(fips)
            .and_then(|state| store.region_of_state(state))
            == Some(r.as_str()),
    }
}

/// Records passing `mask`, in store order.
pub fn passing<'a>(
    store: &'a AugmentedStore,
    clusters: Option<&'a ClusterAssignment>,
    filter: &'a FilterState,
    mask: Predicates,
) -> impl Iterator<Item = AugmentedRecord<'a>> + 'a {
    store
        .iter()
        .filter(move |r| passes_with(*r, clusters, filter, mask))
}

pub fn count_passing(
    store: &AugmentedStore,
    clusters: Option<&ClusterAssignment>,
    filter: &FilterState,
) -> usize {
    passing(store, clusters, filter, Predicates::ALL).count()
}
