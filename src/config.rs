//! Command-line configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::data::analysis::AnalysisSource;
use crate::state::filter_state::GeoMode;
use crate::ui::hist_panel::BrushKind;
use crate::ui::map_panel::MapMetric;

pub const DEFAULT_ANALYSIS: &str = "http://127.0.0.1:5000/pca";

/// Linked county mental-health dashboard.
#[derive(Debug, Parser)]
#[command(name = "countyscope", version, about = "Linked county mental-health dashboard")]
pub struct Args {
    /// County table (CSV, XLS or XLSX), one row per county.
    #[arg(long, value_name = "PATH", default_value = "data/county_data.csv")]
    pub data: PathBuf,

    /// TopoJSON with `counties` and `states` objects.
    #[arg(long, value_name = "PATH", default_value = "data/counties-10m.json")]
    pub geometry: PathBuf,

    /// PCA/cluster result: a JSON file path or an http(s) URL.
    #[arg(long, value_name = "PATH_OR_URL", default_value = DEFAULT_ANALYSIS)]
    pub analysis: String,

    /// Chart shown in the brushable panel.
    #[arg(long, value_enum, default_value = "histogram")]
    pub brush_panel: BrushPanelArg,

    /// What a map click selects at startup.
    #[arg(long, value_enum, default_value = "state")]
    pub geo_mode: GeoModeArg,

    /// Column the map colors by at startup.
    #[arg(long, value_enum, default_value = "avg-score")]
    pub metric: MetricArg,

    /// Hide the single largest-PC1 county from the PCA scatter.
    #[arg(long)]
    pub exclude_pca_outlier: bool,

    /// Do not refresh the panel a filter change came from.
    #[arg(long)]
    pub skip_origin_refresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BrushPanelArg {
    Histogram,
    Scatter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeoModeArg {
    State,
    Region,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    AvgScore,
    Wellbeing,
}

/// Resolved startup configuration handed to the app.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub data: PathBuf,
    pub geometry: PathBuf,
    pub analysis: AnalysisSource,
    pub brush_kind: BrushKind,
    pub geo_mode: GeoMode,
    pub metric: MapMetric,
    pub exclude_pca_outlier: bool,
    pub skip_origin_refresh: bool,
}

impl From<Args> for DashboardConfig {
    fn from(args: Args) -> Self {
        Self {
            data: args.data,
            geometry: args.geometry,
            analysis: AnalysisSource::parse(&args.analysis),
            brush_kind: match args.brush_panel {
                BrushPanelArg::Histogram => BrushKind::Histogram,
                BrushPanelArg::Scatter => BrushKind::Scatter,
            },
            geo_mode: match args.geo_mode {
                GeoModeArg::State => GeoMode::State,
                GeoModeArg::Region => GeoMode::Region,
            },
            metric: match args.metric {
                MetricArg::AvgScore => MapMetric::AvgScore,
                MetricArg::Wellbeing => MapMetric::Wellbeing,
            },
            exclude_pca_outlier: args.exclude_pca_outlier,
            skip_origin_refresh: args.skip_origin_refresh,
        }
    }
}
