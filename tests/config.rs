use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use tempfile::TempDir;

use ccval::config::{PathsConfig, PreprocessConfig, Recipe, RecipeLoader, default_regions};
use ccval::error::CcvalError;

fn recipe(expts: Vec<&str>) -> Recipe {
    Recipe {
        name: "soilparam".to_string(),
        expts: expts.into_iter().map(str::to_string).collect(),
        paths: PathsConfig {
            raw_root: Utf8PathBuf::from("~/dump2hold"),
            cache_root: Utf8PathBuf::from("/cache"),
            output_root: Utf8PathBuf::from("/out"),
        },
        preprocess: PreprocessConfig::default(),
        variables: Default::default(),
    }
}

#[test]
fn resolve_expands_home() {
    let resolved = RecipeLoader::resolve_recipe(recipe(vec!["xqhuj"])).unwrap();
    assert!(resolved.paths.raw_root.ends_with("dump2hold"));
    assert_eq!(resolved.paths.cache_root, Utf8PathBuf::from("/cache"));
    assert_eq!(resolved.preprocess.regions, default_regions());
}

#[test]
fn resolve_requires_experiments() {
    let err = RecipeLoader::resolve_recipe(recipe(vec![])).unwrap_err();
    assert_matches!(err, CcvalError::InvalidRecipe(_));
}

#[test]
fn load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recipe.json");
    fs::write(
        &path,
        r#"{
            "name": "soilparam",
            "expts": ["xqhuj", "xqhuk"],
            "paths": {"raw_root": "/raw", "cache_root": "/cache", "output_root": "/out"},
            "preprocess": {"regions": ["global", "tropics"], "n_years": 30},
            "variables": {"frac": "m01s03i317", "soilResp": "nothing"}
        }"#,
    )
    .unwrap();

    let resolved = RecipeLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.name, "soilparam");
    assert_eq!(resolved.expts, vec!["xqhuj", "xqhuk"]);
    assert_eq!(resolved.preprocess.regions, vec!["global", "tropics"]);
    assert_eq!(resolved.preprocess.n_years, Some(30));
    assert_eq!(resolved.variables["frac"], "m01s03i317");
}

#[test]
fn unreadable_and_malformed_files() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");
    let err = RecipeLoader::resolve(missing.to_str()).unwrap_err();
    assert_matches!(err, CcvalError::ConfigRead(_));

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{ not json").unwrap();
    let err = RecipeLoader::resolve(broken.to_str()).unwrap_err();
    assert_matches!(err, CcvalError::ConfigParse(_));
}
