use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::CcvalError;
use crate::fs_util::expand_home;

pub const DEFAULT_RECIPE: &str = "ccval.json";

#[derive(Debug, Deserialize, Serialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub expts: Vec<String>,
    pub paths: PathsConfig,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    /// User-facing variable name to internal identifier, e.g. `"frac" -> "m01s03i317"`.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    pub raw_root: Utf8PathBuf,
    pub cache_root: Utf8PathBuf,
    pub output_root: Utf8PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreprocessConfig {
    #[serde(default = "default_regions")]
    pub regions: Vec<String>,
    #[serde(default)]
    pub n_years: Option<u32>,
    #[serde(default)]
    pub regrid_target: Option<String>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            regions: default_regions(),
            n_years: None,
            regrid_target: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedRecipe {
    pub name: String,
    pub expts: Vec<String>,
    pub paths: PathsConfig,
    pub preprocess: PreprocessConfig,
    pub variables: BTreeMap<String, String>,
}

pub struct RecipeLoader;

impl RecipeLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedRecipe, CcvalError> {
        let recipe_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_RECIPE),
        };

        if path.is_none() && !recipe_path.exists() {
            return Err(CcvalError::MissingConfig);
        }

        let content = fs::read_to_string(&recipe_path)
            .map_err(|_| CcvalError::ConfigRead(recipe_path.clone()))?;
        let recipe: Recipe = serde_json::from_str(&content)
            .map_err(|err| CcvalError::ConfigParse(err.to_string()))?;

        Self::resolve_recipe(recipe)
    }

    pub fn resolve_recipe(recipe: Recipe) -> Result<ResolvedRecipe, CcvalError> {
        if recipe.name.trim().is_empty() {
            return Err(CcvalError::InvalidRecipe("name must not be empty".to_string()));
        }
        let expts = recipe
            .expts
            .into_iter()
            .map(|expt| expt.trim().to_string())
            .filter(|expt| !expt.is_empty())
            .collect::<Vec<_>>();
        if expts.is_empty() {
            return Err(CcvalError::InvalidRecipe(
                "at least one experiment is required".to_string(),
            ));
        }

        let paths = PathsConfig {
            raw_root: expand_utf8(&recipe.paths.raw_root)?,
            cache_root: expand_utf8(&recipe.paths.cache_root)?,
            output_root: expand_utf8(&recipe.paths.output_root)?,
        };

        Ok(ResolvedRecipe {
            name: recipe.name,
            expts,
            paths,
            preprocess: recipe.preprocess,
            variables: recipe.variables,
        })
    }
}

fn expand_utf8(path: &Utf8PathBuf) -> Result<Utf8PathBuf, CcvalError> {
    Utf8PathBuf::from_path_buf(expand_home(path.as_std_path()))
        .map_err(|_| CcvalError::InvalidRecipe(format!("non UTF-8 path after expanding {path}")))
}

pub fn default_regions() -> Vec<String> {
    vec!["global".to_string()]
}
