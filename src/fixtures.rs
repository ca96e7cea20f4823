//! Shared test data: six counties in four states, three clusters.

use std::sync::Arc;

use crate::data::analysis::AnalysisResult;
use crate::data::geometry::{GeoPolygon, GeoShape, Geometry};
use crate::data::loader::parse_csv;
use crate::state::filter_state::EduCategory;
use crate::state::record_store::{AugmentedStore, ClusterAssignment, RecordStore};

pub const INCOME: &str = "Income";

pub const ANALYSIS_JSON: &str = r#"{
  "k": 3,
  "points": [
    {"fips": 1001,  "cluster": 0, "pc1": -0.40, "pc2":  0.10, "region": "South", "state": "Alabama"},
    {"fips": 1003,  "cluster": 1, "pc1":  0.20, "pc2": -0.30, "region": "South", "state": "Alabama"},
    {"fips": 13001, "cluster": 0, "pc1": -0.60, "pc2":  0.20, "region": "South", "state": "Georgia"},
    {"fips": 36001, "cluster": 2, "pc1":  1.00, "pc2":  0.50},
    {"fips": 36003, "cluster": 1, "pc1":  0.10, "pc2": -0.20},
    {"fips": 39001, "cluster": 2, "pc1":  0.70, "pc2":  0.40}
  ],
  "loadings": [
    {"name": "Income",    "x":  0.4, "y": 0.3, "eig": 0.5},
    {"name": "Wellbeing", "x": -0.2, "y": 0.6, "eig": 0.63}
  ],
  "top_vars": [
    {"full": "Median_Household_Income_2020", "short": "Income",    "corr": 0.61},
    {"full": "Wellbeing_Score",              "short": "Wellbeing", "corr": 0.42}
  ],
  "avg_loading": {"name": "AvgScore", "x": 0.3, "y": -0.4, "eig": 0.5},
  "hist_vars": [
    {"full": "Median_Household_Income_2020", "short": "Income"},
    {"full": "Unemployment_rate_2020",       "short": "Unemp"}
  ]
}"#;

/// Education means over all six rows are SomeCollege 30, HSGrad 45,
/// NoHSGrad 15, Bachelors+ 10.
pub fn fixture_csv() -> String {
    let edu: Vec<String> = EduCategory::ALL
        .iter()
        .map(|c| format!("\"{}\"", c.column()))
        .collect();
    let mut text = format!(
        "FIPS_Code,State_Name,Region,Anxiety_Score_2020,Depression_Score_2020,\
         Median_Household_Income_2020,Wellbeing_Score,{}\n",
        edu.join(",")
    );
    text.push_str(
        "\
1001,Alabama,South,40,50,50000,60,30,50,12,8
1003,Alabama,South,30,40,62000,58,28,40,20,12
13001,Georgia,South,20,30,41000,55,32,45,13,10
36001,New York,Northeast,50,70,70000,52,30,48,14,8
36003,New York,Northeast,44,46,,49,30,42,16,12
39001,Ohio,Midwest,36,34,45000,57,30,45,15,10
",
    );
    text
}

pub fn fixture_store() -> Arc<RecordStore> {
    let table = parse_csv(&fixture_csv(), "fixture").unwrap();
    Arc::new(RecordStore::from_table(&table).unwrap())
}

pub fn fixture_analysis() -> AnalysisResult {
    AnalysisResult::from_json(ANALYSIS_JSON).unwrap()
}

pub fn fixture_augmented() -> AugmentedStore {
    fixture_store().project(&fixture_analysis().axis_aliases())
}

pub fn fixture_clusters() -> ClusterAssignment {
    fixture_analysis().cluster_assignment()
}

fn square(id: u32, name: Option<&str>, lon: f64, lat: f64, size: f64) -> GeoShape {
    GeoShape {
        id: Some(id),
        name: name.map(str::to_string),
        polygons: GeoPolygon::new(vec![[lon, lat], [lon + size, lat], [lon + size, lat + size], [lon, lat + size]])
            .into_iter()
            .collect(),
    }
}

/// One unit square per fixture county, plus 1005 (no row, Alabama prefix) and
/// 99001 (no row, unknown state). State outlines for the four fixture states.
pub fn fixture_geometry() -> Geometry {
    Geometry {
        counties: vec![
            square(1001, None, -88.0, 32.0, 1.0),
            square(1003, None, -87.0, 32.0, 1.0),
            square(1005, None, -86.0, 32.0, 1.0),
            square(13001, None, -84.0, 32.0, 1.0),
            square(36001, None, -75.0, 42.0, 1.0),
            square(36003, None, -74.0, 42.0, 1.0),
            square(39001, None, -83.0, 40.0, 1.0),
            square(99001, None, -100.0, 45.0, 1.0),
        ],
        states: vec![
            square(1, Some("Alabama"), -88.0, 32.0, 3.0),
            square(13, Some("Georgia"), -84.0, 32.0, 1.0),
            square(36, Some("New York"), -75.0, 42.0, 2.0),
            square(39, Some("Ohio"), -83.0, 40.0, 1.0),
        ],
    }
}

/// `n` Alabama counties that all share one average score (anxiety 30,
/// depression 40). Income is constant too unless `vary_income` is set.
pub fn tied_store(n: u32, vary_income: bool) -> Arc<RecordStore> {
    let mut text = String::from(
        "FIPS_Code,State_Name,Region,Anxiety_Score_2020,Depression_Score_2020,\
         Median_Household_Income_2020,Wellbeing_Score\n",
    );
    for i in 0..n {
        let income = if vary_income { 40000 + 100 * i } else { 50000 };
        text.push_str(&format!("{},Alabama,South,30,40,{income},55\n", 1001 + 2 * i));
    }
    let table = parse_csv(&text, "tied").unwrap();
    Arc::new(RecordStore::from_table(&table).unwrap())
}

/// Analysis for [`tied_store`]: one cluster, every county at the same PCA
/// position.
pub fn tied_analysis(n: u32) -> AnalysisResult {
    let points: Vec<String> = (0..n)
        .map(|i| format!(r#"{{"fips": {}, "cluster": 0, "pc1": 0.25, "pc2": 0.25}}"#, 1001 + 2 * i))
        .collect();
    let json = format!(
        r#"{{
  "k": 1,
  "points": [{}],
  "loadings": [{{"name": "Income", "x": 0.4, "y": 0.3, "eig": 0.5}}],
  "top_vars": [{{"full": "Median_Household_Income_2020", "short": "Income"}}],
  "avg_loading": {{"name": "AvgScore", "x": 0.3, "y": -0.4, "eig": 0.5}}
}}"#,
        points.join(", ")
    );
    AnalysisResult::from_json(&json).unwrap()
}
