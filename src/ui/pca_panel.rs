use std::sync::Arc;

use egui::Color32;
use egui_plot::{Arrows, Legend, Plot, PlotPoint, Points, Text};

use crate::data::analysis::AnalysisResult;
use crate::processing::evaluator::passes;
use crate::processing::kd_tree::HoverTree;
use crate::processing::scales::cluster_color;
use crate::state::broadcast::{Panel, PanelId, RefreshContext};
use crate::state::filter_state::FilterCommand;
use crate::state::theme::Theme;

/// One county in principal-component space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcaDot {
    pub fips: u32,
    pub cluster: usize,
    pub pc1: f64,
    pub pc2: f64,
    pub dimmed: bool,
}

/// A loading vector, already scaled into plot units.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadingArrow {
    pub label: String,
    pub tip: [f64; 2],
    /// The average-score vector, drawn in red.
    pub highlight: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PcaView {
    pub dots: Vec<PcaDot>,
    pub arrows: Vec<LoadingArrow>,
}

pub struct PcaPanel {
    analysis: Arc<AnalysisResult>,
    /// Point left out of the scatter when outlier exclusion is on.
    outlier: Option<u32>,
    arrows: Vec<LoadingArrow>,
    hover: HoverTree,
    view: PcaView,
}

impl PcaPanel {
    pub fn new(analysis: Arc<AnalysisResult>, exclude_outlier: bool) -> Self {
        let outlier = if exclude_outlier {
            analysis
                .points
                .iter()
                .filter(|p| p.pc1.is_finite())
                .max_by(|a, b| a.pc1.total_cmp(&b.pc1))
                .map(|p| p.fips)
        } else {
            None
        };
        if let Some(fips) = outlier {
            tracing::info!("PCA scatter hides outlier county {fips:05}");
        }

        let hover = HoverTree::build(
            analysis
                .points
                .iter()
                .filter(|p| Some(p.fips) != outlier)
                .map(|p| (p.fips, p.pc1, p.pc2)),
        );
        let arrows = loading_arrows(&analysis);

        Self {
            analysis,
            outlier,
            arrows,
            hover,
            view: PcaView::default(),
        }
    }

    pub fn view(&self) -> &PcaView {
        &self.view
    }

    fn compute_view(&self, ctx: &RefreshContext<'_>) -> PcaView {
        let dots = self
            .analysis
            .points
            .iter()
            .filter(|p| Some(p.fips) != self.outlier)
            .map(|p| {
                let dimmed = match ctx.store.get(p.fips) {
                    Some(record) => !passes(record, ctx.clusters, ctx.filter),
                    None => {
                        !ctx.filter.is_cluster_selected(p.cluster) || ctx.filter.has_record_predicates()
                    }
                };
                PcaDot {
                    fips: p.fips,
                    cluster: p.cluster,
                    pc1: p.pc1,
                    pc2: p.pc2,
                    dimmed,
                }
            })
            .collect();
        PcaView {
            dots,
            arrows: self.arrows.clone(),
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, ctx: &RefreshContext<'_>, theme: &Theme) -> Option<FilterCommand> {
        let mut command = None;

        ui.horizontal_wrapped(|ui| {
            for cluster in 0..self.analysis.k {
                let mut checked = ctx.filter.is_cluster_selected(cluster);
                let label = egui::RichText::new(format!("Cluster {}", cluster + 1))
                    .color(cluster_color(cluster))
                    .strong();
                if ui.checkbox(&mut checked, label).changed() {
                    command = Some(FilterCommand::SetClusterEnabled {
                        cluster,
                        enabled: checked,
                    });
                }
            }
        });

        let k = self.analysis.k;
        let view = &self.view;
        let hover = &self.hover;
        let response = Plot::new("pca_biplot")
            .data_aspect(1.0)
            .show_grid(true)
            .allow_boxed_zoom(false)
            .legend(Legend::default())
            .x_axis_label("PC1")
            .y_axis_label("PC2")
            .show(ui, |plot_ui| {
                for cluster in 0..k {
                    let color = cluster_color(cluster);
                    let (dim, bright): (Vec<&PcaDot>, Vec<&PcaDot>) = view
                        .dots
                        .iter()
                        .filter(|d| d.cluster == cluster)
                        .partition(|d| d.dimmed);
                    plot_ui.points(
                        Points::new(dim.iter().map(|d| [d.pc1, d.pc2]).collect::<Vec<_>>())
                            .color(theme.dim(color))
                            .radius(2.5),
                    );
                    plot_ui.points(
                        Points::new(bright.iter().map(|d| [d.pc1, d.pc2]).collect::<Vec<_>>())
                            .color(color)
                            .radius(3.0)
                            .name(format!("Cluster {}", cluster + 1)),
                    );
                }

                for arrow in &view.arrows {
                    let color = if arrow.highlight {
                        Color32::from_rgb(214, 39, 40)
                    } else {
                        theme.axis_color()
                    };
                    plot_ui.arrows(Arrows::new(vec![[0.0, 0.0]], vec![arrow.tip]).color(color));
                    plot_ui.text(
                        Text::new(
                            PlotPoint::new(arrow.tip[0] * 1.05, arrow.tip[1] * 1.05),
                            egui::RichText::new(&arrow.label).size(11.0),
                        )
                        .color(color),
                    );
                }

                let radius = plot_ui.plot_bounds().width() * 0.02;
                plot_ui
                    .pointer_coordinate()
                    .and_then(|p| hover.nearest_all(p.x, p.y))
                    .filter(|&(_, dist)| dist <= radius)
                    .and_then(|(slot, _)| slot.first().map(|&fips| (fips, slot.len())))
            });

        if let Some((fips, stacked)) = response.inner {
            let place = ctx
                .store
                .get(fips)
                .map(|r| r.record.state_name.clone())
                .unwrap_or_default();
            let cluster = self
                .view
                .dots
                .iter()
                .find(|d| d.fips == fips)
                .map_or(String::new(), |d| format!(", cluster {}", d.cluster + 1));
            response
                .response
                .on_hover_text_at_pointer(if stacked > 1 {
                    format!("{fips:05} {place}{cluster}\n+{} more at this point", stacked - 1)
                } else {
                    format!("{fips:05} {place}{cluster}")
                });
        }

        command
    }
}

/// Loading vectors scaled so the longest one has length 0.9, followed by the
/// average-score vector on the same scale.
fn loading_arrows(analysis: &AnalysisResult) -> Vec<LoadingArrow> {
    let max_len = analysis
        .loadings
        .iter()
        .map(|l| l.x.hypot(l.y))
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    let sf = if max_len > 0.0 { 0.9 / max_len } else { 1.0 };

    analysis
        .loadings
        .iter()
        .map(|l| LoadingArrow {
            label: l.name.clone(),
            tip: [l.x * sf, l.y * sf],
            highlight: false,
        })
        .chain(std::iter::once(LoadingArrow {
            label: analysis.avg_loading.name.clone(),
            tip: [analysis.avg_loading.x * sf, analysis.avg_loading.y * sf],
            highlight: true,
        }))
        .collect()
}

impl Panel for PcaPanel {
    fn id(&self) -> PanelId {
        PanelId::Pca
    }

    fn refresh(&mut self, ctx: &RefreshContext<'_>) {
        self.view = self.compute_view(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fixture_analysis, fixture_augmented, fixture_clusters, tied_analysis, tied_store};
    use crate::state::filter_state::FilterState;

    #[test]
    fn longest_loading_is_scaled_to_point_nine() {
        let arrows = loading_arrows(&fixture_analysis());
        let lengths: Vec<f64> = arrows.iter().map(|a| a.tip[0].hypot(a.tip[1])).collect();
        assert!((lengths[1] - 0.9).abs() < 1e-9);
        assert!(lengths[0] < 0.9);
        let avg = arrows.last().unwrap();
        assert!(avg.highlight);
        assert_eq!(avg.label, "AvgScore");
    }

    #[test]
    fn unchecked_cluster_is_dimmed_not_removed() {
        let store = fixture_augmented();
        let clusters = fixture_clusters();
        let mut filter = FilterState::new();
        filter.init_clusters(3);
        filter.set_cluster_enabled(2, false);
        let ctx = RefreshContext {
            store: &store,
            clusters: Some(&clusters),
            filter: &filter,
        };
        let mut pca = PcaPanel::new(Arc::new(fixture_analysis()), false);
        pca.refresh(&ctx);

        assert_eq!(pca.view().dots.len(), 6);
        let dimmed: Vec<u32> = pca.view().dots.iter().filter(|d| d.dimmed).map(|d| d.fips).collect();
        assert_eq!(dimmed, vec![36001, 39001]);
    }

    #[test]
    fn outlier_exclusion_is_display_only() {
        let store = fixture_augmented();
        let clusters = fixture_clusters();
        let mut filter = FilterState::new();
        filter.init_clusters(3);
        let ctx = RefreshContext {
            store: &store,
            clusters: Some(&clusters),
            filter: &filter,
        };
        let mut pca = PcaPanel::new(Arc::new(fixture_analysis()), true);
        pca.refresh(&ctx);

        assert_eq!(pca.view().dots.len(), 5);
        assert!(pca.view().dots.iter().all(|d| d.fips != 36001));
        // The hidden county still takes part in filtering elsewhere.
        assert_eq!(crate::processing::evaluator::count_passing(&store, Some(&clusters), &filter), 6);
    }

    #[test]
    fn identical_positions_do_not_break_hover() {
        let analysis = tied_analysis(80);
        let store = tied_store(80, false).project(&analysis.axis_aliases());
        let clusters = analysis.cluster_assignment();
        let mut filter = FilterState::new();
        filter.init_clusters(1);
        let ctx = RefreshContext {
            store: &store,
            clusters: Some(&clusters),
            filter: &filter,
        };
        let mut pca = PcaPanel::new(Arc::new(analysis), false);
        pca.refresh(&ctx);

        assert_eq!(pca.view().dots.len(), 80);
        assert!(pca.view().dots.iter().all(|d| !d.dimmed));
        let (slot, dist) = pca.hover.nearest_all(0.25, 0.25).unwrap();
        assert_eq!(slot.len(), 80);
        assert!(dist < 1e-9);
    }
}
