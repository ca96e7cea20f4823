use std::path::PathBuf;

use serde::Deserialize;

use crate::error::LoadError;
use crate::state::record_store::{AxisAlias, ClusterAssignment, AVG_SCORE_COLUMN};

/// Precomputed PCA + clustering result served by the analysis service.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisResult {
    pub k: usize,
    pub points: Vec<PcaPoint>,
    pub loadings: Vec<Loading>,
    pub top_vars: Vec<TopVariable>,
    pub avg_loading: Loading,
    #[serde(default)]
    pub hist_vars: Vec<TopVariable>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PcaPoint {
    pub fips: u32,
    pub cluster: usize,
    pub pc1: f64,
    pub pc2: f64,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Loading vector of one original variable in PC space.
#[derive(Debug, Clone, Deserialize)]
pub struct Loading {
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(alias = "eig", default)]
    pub eigenvalue: f64,
}

/// A variable offered on an axis or in a dropdown, with its short label.
#[derive(Debug, Clone, Deserialize)]
pub struct TopVariable {
    pub full: String,
    pub short: String,
    #[serde(default)]
    pub corr: Option<f64>,
}

impl AnalysisResult {
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        let result: AnalysisResult = serde_json::from_str(text)?;
        result.validate()?;
        Ok(result)
    }

    fn validate(&self) -> Result<(), LoadError> {
        if self.k == 0 {
            return Err(LoadError::Analysis("cluster count k is zero".to_string()));
        }
        if let Some(p) = self.points.iter().find(|p| p.cluster >= self.k) {
            return Err(LoadError::Analysis(format!(
                "county {} assigned to cluster {} but k = {}",
                p.fips, p.cluster, self.k
            )));
        }
        Ok(())
    }

    pub fn cluster_assignment(&self) -> ClusterAssignment {
        ClusterAssignment::new(self.k, self.points.iter().map(|p| (p.fips, p.cluster)))
    }

    /// Aliases for the top variables and the histogram variables.
    pub fn axis_aliases(&self) -> Vec<AxisAlias> {
        let mut aliases: Vec<AxisAlias> = Vec::new();
        for v in self.top_vars.iter().chain(self.hist_vars.iter()) {
            if v.short != v.full && !aliases.iter().any(|a| a.short == v.short) {
                aliases.push(AxisAlias {
                    short: v.short.clone(),
                    full: v.full.clone(),
                });
            }
        }
        aliases
    }

    /// Parallel-coordinate axes: the average score, then each top variable.
    pub fn pcp_axes(&self) -> Vec<String> {
        std::iter::once(AVG_SCORE_COLUMN.to_string())
            .chain(self.top_vars.iter().map(|v| v.short.clone()))
            .collect()
    }
}

/// Where to get the analysis result from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisSource {
    File(PathBuf),
    Url(String),
}

impl AnalysisSource {
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            AnalysisSource::Url(s.to_string())
        } else {
            AnalysisSource::File(PathBuf::from(s))
        }
    }
}

impl std::fmt::Display for AnalysisSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisSource::File(p) => write!(f, "{}", p.display()),
            AnalysisSource::Url(u) => write!(f, "{u}"),
        }
    }
}

/// Blocking load; run it off the UI thread.
pub fn load_analysis(source: &AnalysisSource) -> Result<AnalysisResult, LoadError> {
    let text = match source {
        AnalysisSource::File(path) => std::fs::read_to_string(path)?,
        AnalysisSource::Url(url) => reqwest::blocking::get(url)?.error_for_status()?.text()?,
    };
    let result = AnalysisResult::from_json(&text)?;
    tracing::info!(
        "Loaded analysis from {source}: k = {}, {} points, {} top variables",
        result.k,
        result.points.len(),
        result.top_vars.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::ANALYSIS_JSON;

    #[test]
    fn parses_service_payload() {
        let result = AnalysisResult::from_json(ANALYSIS_JSON).unwrap();
        assert_eq!(result.k, 3);
        assert_eq!(result.points.len(), 6);
        assert_eq!(result.loadings[0].eigenvalue, 0.5);
        assert_eq!(result.pcp_axes(), vec!["AvgScore", "Income", "Wellbeing"]);
        let clusters = result.cluster_assignment();
        assert_eq!(clusters.cluster_of(36001), Some(2));
        assert_eq!(clusters.cluster_of(1), None);
    }

    #[test]
    fn aliases_skip_identity_and_duplicates() {
        let result = AnalysisResult::from_json(ANALYSIS_JSON).unwrap();
        let shorts: Vec<String> = result.axis_aliases().into_iter().map(|a| a.short).collect();
        assert_eq!(shorts, vec!["Income", "Wellbeing", "Unemp"]);
    }

    #[test]
    fn rejects_out_of_range_cluster() {
        let json = r#"{"k":1,"points":[{"fips":1001,"cluster":3,"pc1":0,"pc2":0}],
            "loadings":[],"top_vars":[],"avg_loading":{"name":"AvgScore","x":0,"y":0,"eig":0}}"#;
        let err = AnalysisResult::from_json(json).unwrap_err();
        assert!(matches!(err, LoadError::Analysis(_)));
    }

    #[test]
    fn source_detects_urls() {
        assert_eq!(
            AnalysisSource::parse("http://127.0.0.1:5000/pca"),
            AnalysisSource::Url("http://127.0.0.1:5000/pca".to_string())
        );
        assert_eq!(
            AnalysisSource::parse("pca.json"),
            AnalysisSource::File(PathBuf::from("pca.json"))
        );
    }

    #[test]
    fn reads_file_source() {
        let path = std::env::temp_dir().join("countyscope_analysis_test.json");
        std::fs::write(&path, ANALYSIS_JSON).unwrap();
        let result = load_analysis(&AnalysisSource::File(path.clone())).unwrap();
        assert_eq!(result.hist_vars.len(), 2);
        let _ = std::fs::remove_file(&path);
    }
}
