use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::data::loader::{parse_cell, CellValue, LoadedTable};
use crate::error::LoadError;

pub const FIPS_COLUMN: &str = "FIPS_Code";
pub const STATE_COLUMN: &str = "State_Name";
pub const REGION_COLUMN: &str = "Region";
pub const ANXIETY_COLUMN: &str = "Anxiety_Score_2020";
pub const DEPRESSION_COLUMN: &str = "Depression_Score_2020";
/// Derived at load time as the mean of anxiety and depression.
pub const AVG_SCORE_COLUMN: &str = "AvgScore";
pub const WELLBEING_COLUMN: &str = "Wellbeing_Score";

/// One county row. Immutable once the store is built.
#[derive(Debug, Clone)]
pub struct Record {
    pub fips: u32,
    pub state_name: String,
    pub region: String,
    pub avg_score: Option<f64>,
    numeric: HashMap<String, f64>,
    text: HashMap<String, String>,
}

impl Record {
    /// Numeric value of a column. Missing and non-finite values are `None`.
    pub fn value(&self, column: &str) -> Option<f64> {
        if column == AVG_SCORE_COLUMN {
            return self.avg_score;
        }
        self.numeric.get(column).copied().filter(|v| v.is_finite())
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.text.get(column).map(String::as_str)
    }
}

/// All county records plus the lookups derived from them.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    index: HashMap<u32, usize>,
    region_of_state: HashMap<String, String>,
    /// Two-digit state FIPS prefix -> state name.
    state_of_prefix: HashMap<u32, String>,
    numeric_columns: Vec<String>,
}

impl RecordStore {
    pub fn from_table(table: &LoadedTable) -> Result<Self, LoadError> {
        let col = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
        };
        let fips_idx = col(FIPS_COLUMN)?;
        let state_idx = col(STATE_COLUMN)?;
        let region_idx = col(REGION_COLUMN)?;
        col(ANXIETY_COLUMN)?;
        col(DEPRESSION_COLUMN)?;

        let mut store = RecordStore::default();
        let mut numeric_columns = BTreeSet::new();

        for (row_idx, row) in table.rows.iter().enumerate() {
            let fips = match parse_cell(&row[fips_idx]) {
                CellValue::Number(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => {
                    v as u32
                }
                other => {
                    tracing::warn!("Row {row_idx}: invalid FIPS code {other:?}, skipping");
                    continue;
                }
            };
            if store.index.contains_key(&fips) {
                return Err(LoadError::DuplicateFips(fips));
            }

            let mut numeric = HashMap::new();
            let mut text = HashMap::new();
            for (c, raw) in row.iter().enumerate() {
                if c == fips_idx {
                    continue;
                }
                match parse_cell(raw) {
                    CellValue::Number(v) => {
                        numeric_columns.insert(table.columns[c].clone());
                        numeric.insert(table.columns[c].clone(), v);
                    }
                    CellValue::Text(s) => {
                        text.insert(table.columns[c].clone(), s);
                    }
                    CellValue::Missing => {}
                }
            }

            let state_name = row[state_idx].trim().to_string();
            let region = row[region_idx].trim().to_string();
            let anxiety = numeric.get(ANXIETY_COLUMN).copied();
            let depression = numeric.get(DEPRESSION_COLUMN).copied();
            let avg_score = match (anxiety, depression) {
                (Some(a), Some(d)) if a.is_finite() && d.is_finite() => Some((a + d) / 2.0),
                _ => None,
            };

            if !state_name.is_empty() {
                if !region.is_empty() {
                    store
                        .region_of_state
                        .entry(state_name.clone())
                        .or_insert_with(|| region.clone());
                }
                store
                    .state_of_prefix
                    .entry(fips / 1000)
                    .or_insert_with(|| state_name.clone());
            }

            store.index.insert(fips, store.records.len());
            store.records.push(Record {
                fips,
                state_name,
                region,
                avg_score,
                numeric,
                text,
            });
        }

        if store.records.is_empty() {
            return Err(LoadError::Empty("tabular feed".to_string()));
        }

        numeric_columns.insert(AVG_SCORE_COLUMN.to_string());
        store.numeric_columns = numeric_columns.into_iter().collect();
        tracing::info!(
            "Loaded {} county records ({} numeric columns)",
            store.records.len(),
            store.numeric_columns.len()
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, fips: u32) -> Option<&Record> {
        self.index.get(&fips).map(|&i| &self.records[i])
    }

    pub fn state_of(&self, fips: u32) -> Option<&str> {
        self.get(fips).map(|r| r.state_name.as_str())
    }

    pub fn region_of_state(&self, state: &str) -> Option<&str> {
        self.region_of_state.get(state).map(String::as_str)
    }

    /// State of a county code even when the county itself has no row, via the
    /// two-digit state prefix.
    pub fn derive_state(&self, fips: u32) -> Option<&str> {
        self.state_of(fips)
            .or_else(|| self.state_of_prefix.get(&(fips / 1000)).map(String::as_str))
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    /// Sorted distinct region names.
    pub fn regions(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.region_of_state.values().map(String::as_str).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Min/max of a column over every record.
    pub fn extent(&self, column: &str) -> Option<(f64, f64)> {
        extent(self.records.iter().filter_map(|r| r.value(column)))
    }

    /// Attach short-named aliases for the top analysis variables, producing an
    /// augmented view. The base records are left untouched.
    pub fn project(self: &Arc<Self>, aliases: &[AxisAlias]) -> AugmentedStore {
        let alias_values = self
            .records
            .iter()
            .map(|r| {
                aliases
                    .iter()
                    .filter_map(|a| r.value(&a.full).map(|v| (a.short.clone(), v)))
                    .collect()
            })
            .collect();
        AugmentedStore {
            base: Arc::clone(self),
            aliases: aliases.to_vec(),
            alias_values,
        }
    }
}

pub fn extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        if v.is_finite() {
            min = min.min(v);
            max = max.max(v);
        }
    }
    if min.is_finite() && max.is_finite() {
        Some((min, max))
    } else {
        None
    }
}

/// Short axis label for a full column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisAlias {
    pub short: String,
    pub full: String,
}

/// Record store after the analysis feed has resolved: every record also
/// answers to the short alias names.
#[derive(Debug, Clone)]
pub struct AugmentedStore {
    base: Arc<RecordStore>,
    aliases: Vec<AxisAlias>,
    alias_values: Vec<HashMap<String, f64>>,
}

#[derive(Debug, Clone, Copy)]
pub struct AugmentedRecord<'a> {
    pub record: &'a Record,
    aliases: &'a HashMap<String, f64>,
}

impl<'a> AugmentedRecord<'a> {
    pub fn fips(&self) -> u32 {
        self.record.fips
    }

    pub fn value(&self, column: &str) -> Option<f64> {
        match self.aliases.get(column) {
            Some(v) => Some(*v),
            None => self.record.value(column),
        }
    }
}

impl AugmentedStore {
    pub fn aliases(&self) -> &[AxisAlias] {
        &self.aliases
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn numeric_columns(&self) -> &[String] {
        self.base.numeric_columns()
    }

    pub fn iter(&self) -> impl Iterator<Item = AugmentedRecord<'_>> {
        self.base
            .records
            .iter()
            .zip(self.alias_values.iter())
            .map(|(record, aliases)| AugmentedRecord { record, aliases })
    }

    pub fn get(&self, fips: u32) -> Option<AugmentedRecord<'_>> {
        let &i = self.base.index.get(&fips)?;
        Some(AugmentedRecord {
            record: &self.base.records[i],
            aliases: &self.alias_values[i],
        })
    }

    pub fn extent(&self, column: &str) -> Option<(f64, f64)> {
        extent(self.iter().filter_map(|r| r.value(column)))
    }
}

/// County -> cluster index, replaced wholesale on every analysis load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterAssignment {
    pub k: usize,
    by_fips: HashMap<u32, usize>,
}

impl ClusterAssignment {
    pub fn new(k: usize, entries: impl IntoIterator<Item = (u32, usize)>) -> Self {
        Self {
            k,
            by_fips: entries.into_iter().collect(),
        }
    }

    pub fn cluster_of(&self, fips: u32) -> Option<usize> {
        self.by_fips.get(&fips).copied()
    }

    pub fn len(&self) -> usize {
        self.by_fips.len()
    }
}
