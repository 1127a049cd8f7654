use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use ndarray::{Array, Array3, Array4, Dimension, Ix3, Ix4};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::CcvalError;

pub const DEFAULT_CATEGORY_KEY: &str = "fracPFTs";

pub const NOTE_ATTRIBUTE: &str = "note";
pub const DIMS_ATTRIBUTE: &str = "dims";

const NOTE: &str = "Converted from annual-means nested map.";

/// One variable's yearly values; `years` and `values` are index aligned.
///
/// Missing fields read as empty and `null` values as NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SparseSeries {
    #[serde(default)]
    pub years: Vec<i32>,
    #[serde(rename = "data", default, deserialize_with = "nan_for_null")]
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl SparseSeries {
    pub fn new(years: Vec<i32>, values: Vec<f64>) -> Self {
        Self {
            years,
            values,
            units: None,
        }
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = Some(units.to_string());
        self
    }

    pub fn pairs(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.years.iter().copied().zip(self.values.iter().copied())
    }

    fn known_units(&self) -> Option<String> {
        self.units.clone().filter(|units| !units.is_empty())
    }
}

fn nan_for_null<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|value| value.unwrap_or(f64::NAN))
        .collect())
}

/// Everything reported for one `(experiment, region)` pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSeries {
    pub variables: BTreeMap<String, SparseSeries>,
    /// Per-category breakdown of the designated category variable.
    pub categories: BTreeMap<String, SparseSeries>,
}

/// `experiment -> region -> series`, as aggregated from extracted records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedAnnualMap {
    experiments: BTreeMap<String, BTreeMap<String, RegionSeries>>,
}

/// Annual means JSON before payloads are typed by variable name.
pub type RawAnnualMap = BTreeMap<String, BTreeMap<String, BTreeMap<String, Value>>>;

impl NestedAnnualMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an experiment that may report no regions at all.
    pub fn insert_experiment(&mut self, experiment: &str) {
        self.experiments.entry(experiment.to_string()).or_default();
    }

    pub fn region_mut(&mut self, experiment: &str, region: &str) -> &mut RegionSeries {
        self.experiments
            .entry(experiment.to_string())
            .or_default()
            .entry(region.to_string())
            .or_default()
    }

    pub fn insert_series(
        &mut self,
        experiment: &str,
        region: &str,
        variable: &str,
        series: SparseSeries,
    ) {
        self.region_mut(experiment, region)
            .variables
            .insert(variable.to_string(), series);
    }

    pub fn insert_category(
        &mut self,
        experiment: &str,
        region: &str,
        category: &str,
        series: SparseSeries,
    ) {
        self.region_mut(experiment, region)
            .categories
            .insert(category.to_string(), series);
    }

    pub fn get(&self, experiment: &str, region: &str) -> Option<&RegionSeries> {
        self.experiments.get(experiment)?.get(region)
    }

    pub fn experiments(&self) -> impl Iterator<Item = &str> {
        self.experiments.keys().map(String::as_str)
    }

    pub fn regions(&self) -> BTreeSet<&str> {
        self.experiments
            .values()
            .flat_map(|regions| regions.keys().map(String::as_str))
            .collect()
    }

    fn region_series(&self) -> impl Iterator<Item = &RegionSeries> {
        self.experiments.values().flat_map(|regions| regions.values())
    }

    /// Types a raw map; only `category_key` may carry a per-category payload.
    pub fn from_raw(raw: RawAnnualMap, category_key: &str) -> Result<Self, CcvalError> {
        let mut map = Self::new();
        for (experiment, regions) in raw {
            map.insert_experiment(&experiment);
            for (region, variables) in regions {
                let entry = map.region_mut(&experiment, &region);
                for (variable, payload) in variables {
                    let invalid = |err: serde_json::Error| {
                        CcvalError::InvalidAnnualMap(format!("{experiment}/{region}/{variable}: {err}"))
                    };
                    if variable == category_key {
                        let categories: BTreeMap<String, SparseSeries> =
                            serde_json::from_value(payload).map_err(invalid)?;
                        entry.categories.extend(categories);
                    } else {
                        let series: SparseSeries = serde_json::from_value(payload).map_err(invalid)?;
                        entry.variables.insert(variable, series);
                    }
                }
            }
        }
        Ok(map)
    }

    pub fn from_json(content: &str, category_key: &str) -> Result<Self, CcvalError> {
        let raw: RawAnnualMap = serde_json::from_str(content)
            .map_err(|err| CcvalError::AnnualParse(err.to_string()))?;
        Self::from_raw(raw, category_key)
    }

    pub fn load(path: &Path, category_key: &str) -> Result<Self, CcvalError> {
        let content = fs::read_to_string(path)
            .map_err(|_| CcvalError::AnnualRead(path.to_path_buf()))?;
        Self::from_json(&content, category_key)
    }
}

/// Axis names and the per-category variable's output name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembleOptions {
    pub experiment_axis: String,
    pub region_axis: String,
    pub year_axis: String,
    pub category_axis: String,
    pub category_key: String,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            experiment_axis: "experiment".to_string(),
            region_axis: "region".to_string(),
            year_axis: "year".to_string(),
            category_axis: "pft".to_string(),
            category_key: DEFAULT_CATEGORY_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataArray<D: Dimension> {
    pub name: String,
    pub dims: Vec<String>,
    pub values: Array<f64, D>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

/// `(experiment, region, year)`
pub type AnnualArray = DataArray<Ix3>;
/// `(experiment, region, year, category)`
pub type CategoryArray = DataArray<Ix4>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DenseDataset {
    pub experiments: Vec<String>,
    pub regions: Vec<String>,
    pub years: Vec<i32>,
    pub categories: Vec<String>,
    pub variables: BTreeMap<String, AnnualArray>,
    pub category_variable: Option<CategoryArray>,
    pub attrs: BTreeMap<String, String>,
}

impl DenseDataset {
    pub fn get(&self, name: &str) -> Option<&AnnualArray> {
        self.variables.get(name)
    }

    pub fn units(&self, name: &str) -> Option<&str> {
        match self.variables.get(name) {
            Some(array) => array.units.as_deref(),
            None => self
                .category_variable
                .as_ref()
                .filter(|array| array.name == name)
                .and_then(|array| array.units.as_deref()),
        }
    }

    /// Dimension names in first-use order.
    pub fn dims(&self) -> Vec<&str> {
        let first = self
            .variables
            .values()
            .next()
            .map(|array| &array.dims)
            .or(self.category_variable.as_ref().map(|array| &array.dims));
        let mut dims = first
            .map(|dims| dims.iter().take(3).map(String::as_str).collect::<Vec<_>>())
            .unwrap_or_default();
        if let Some(array) = &self.category_variable {
            dims.extend(array.dims.get(3).map(String::as_str));
        }
        dims
    }

    /// Looks a cell up by label; `None` when a label is not on its axis.
    pub fn value(&self, variable: &str, experiment: &str, region: &str, year: i32) -> Option<f64> {
        let array = self.variables.get(variable)?;
        let (ei, rj, yk) = self.locate(experiment, region, year)?;
        array.values.get((ei, rj, yk)).copied()
    }

    pub fn category_value(
        &self,
        experiment: &str,
        region: &str,
        year: i32,
        category: &str,
    ) -> Option<f64> {
        let array = self.category_variable.as_ref()?;
        let (ei, rj, yk) = self.locate(experiment, region, year)?;
        let cl = position(&self.categories, category)?;
        array.values.get((ei, rj, yk, cl)).copied()
    }

    fn locate(&self, experiment: &str, region: &str, year: i32) -> Option<(usize, usize, usize)> {
        Some((
            position(&self.experiments, experiment)?,
            position(&self.regions, region)?,
            self.years.binary_search(&year).ok()?,
        ))
    }
}

fn position(axis: &[String], label: &str) -> Option<usize> {
    axis.binary_search_by(|entry| entry.as_str().cmp(label)).ok()
}

/// Folds the sparse map into dense arrays over the union of every axis.
///
/// Absent `(experiment, region)` pairs and years outside a series stay NaN.
/// Units come from the first series that reports them, experiments outer and
/// regions inner; conflicting units elsewhere are ignored.
pub fn assemble_annual_series(annual: &NestedAnnualMap, options: &AssembleOptions) -> DenseDataset {
    let experiments = annual.experiments().map(str::to_string).collect::<Vec<_>>();
    let regions = annual
        .regions()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut year_set = BTreeSet::new();
    let mut category_set = BTreeSet::new();
    let mut variable_names = BTreeSet::new();
    for entry in annual.region_series() {
        for (variable, series) in &entry.variables {
            variable_names.insert(variable.as_str());
            year_set.extend(series.years.iter().copied());
        }
        for (category, series) in &entry.categories {
            category_set.insert(category.clone());
            year_set.extend(series.years.iter().copied());
        }
    }
    let years = year_set.into_iter().collect::<Vec<_>>();
    let categories = category_set.into_iter().collect::<Vec<_>>();

    let base_dims = vec![
        options.experiment_axis.clone(),
        options.region_axis.clone(),
        options.year_axis.clone(),
    ];

    let mut variables = BTreeMap::new();
    for variable in variable_names {
        let mut values = Array3::from_elem((experiments.len(), regions.len(), years.len()), f64::NAN);
        let mut units = None;

        for (ei, experiment) in experiments.iter().enumerate() {
            for (rj, region) in regions.iter().enumerate() {
                let series = annual
                    .get(experiment, region)
                    .and_then(|entry| entry.variables.get(variable));
                let Some(series) = series else {
                    continue;
                };
                for (year, value) in series.pairs() {
                    if let Ok(yk) = years.binary_search(&year) {
                        values[[ei, rj, yk]] = value;
                    }
                }
                if units.is_none() {
                    units = series.known_units();
                }
            }
        }

        let name = safe_var_name(variable);
        variables.insert(
            name.clone(),
            DataArray {
                name,
                dims: base_dims.clone(),
                values,
                units,
            },
        );
    }

    let category_variable = if categories.is_empty() {
        None
    } else {
        let mut values = Array4::from_elem(
            (experiments.len(), regions.len(), years.len(), categories.len()),
            f64::NAN,
        );
        let mut units = None;

        for (ei, experiment) in experiments.iter().enumerate() {
            for (rj, region) in regions.iter().enumerate() {
                let Some(entry) = annual.get(experiment, region) else {
                    continue;
                };
                for (category, series) in &entry.categories {
                    let Some(cl) = position(&categories, category) else {
                        continue;
                    };
                    for (year, value) in series.pairs() {
                        if let Ok(yk) = years.binary_search(&year) {
                            values[[ei, rj, yk, cl]] = value;
                        }
                    }
                    if units.is_none() {
                        units = series.known_units();
                    }
                }
            }
        }

        let mut dims = base_dims.clone();
        dims.push(options.category_axis.clone());
        Some(DataArray {
            name: options.category_key.clone(),
            dims,
            values,
            units,
        })
    };

    tracing::debug!(
        "assembled {} variables over {} experiments, {} regions, {} years, {} categories",
        variables.len() + usize::from(category_variable.is_some()),
        experiments.len(),
        regions.len(),
        years.len(),
        categories.len()
    );

    let mut dataset = DenseDataset {
        experiments,
        regions,
        years,
        categories,
        variables,
        category_variable,
        attrs: BTreeMap::new(),
    };
    let dims = dataset.dims().join(", ");
    dataset
        .attrs
        .insert(NOTE_ATTRIBUTE.to_string(), NOTE.to_string());
    dataset.attrs.insert(DIMS_ATTRIBUTE.to_string(), dims);
    dataset
}

/// Keeps a variable name readable while making it safe as an array name.
pub fn safe_var_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        let mapped = match ch {
            ' ' | '-' => '_',
            '/' | '(' | ')' | '[' | ']' | '{' | '}' | ':' | ';' | ',' => continue,
            other => other,
        };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }
    out
}
