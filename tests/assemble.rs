use ccval::assemble::{
    AssembleOptions, DIMS_ATTRIBUTE, NOTE_ATTRIBUTE, NestedAnnualMap, SparseSeries,
    assemble_annual_series,
};

#[test]
fn missing_experiment_is_all_nan() {
    let mut annual = NestedAnnualMap::new();
    annual.insert_series(
        "E1",
        "global",
        "gpp",
        SparseSeries::new(vec![2000, 2001], vec![1.0, 2.0]),
    );
    annual.region_mut("E2", "global");

    let dataset = assemble_annual_series(&annual, &AssembleOptions::default());
    assert_eq!(dataset.experiments, vec!["E1", "E2"]);
    assert_eq!(dataset.regions, vec!["global"]);
    assert_eq!(dataset.years, vec![2000, 2001]);

    assert_eq!(dataset.value("gpp", "E1", "global", 2000), Some(1.0));
    assert_eq!(dataset.value("gpp", "E1", "global", 2001), Some(2.0));
    assert!(dataset.value("gpp", "E2", "global", 2000).unwrap().is_nan());
    assert!(dataset.value("gpp", "E2", "global", 2001).unwrap().is_nan());
    assert_eq!(dataset.value("gpp", "E3", "global", 2000), None);
}

#[test]
fn year_axis_is_union_of_all_series() {
    let mut annual = NestedAnnualMap::new();
    annual.insert_series(
        "E1",
        "global",
        "gpp",
        SparseSeries::new(vec![2002, 2000], vec![3.0, 1.0]),
    );
    annual.insert_series("E1", "global", "npp", SparseSeries::new(vec![2001], vec![0.5]));
    annual.insert_series("E2", "tropics", "npp", SparseSeries::new(vec![1999], vec![0.1]));

    let dataset = assemble_annual_series(&annual, &AssembleOptions::default());
    assert_eq!(dataset.years, vec![1999, 2000, 2001, 2002]);
    assert_eq!(dataset.regions, vec!["global", "tropics"]);

    let gpp = dataset.get("gpp").unwrap();
    assert_eq!(gpp.values.shape(), &[2, 2, 4]);
    assert_eq!(dataset.value("gpp", "E1", "global", 2002), Some(3.0));
    assert!(dataset.value("gpp", "E1", "global", 1999).unwrap().is_nan());
    assert!(dataset.value("gpp", "E1", "global", 2001).unwrap().is_nan());
    assert!(dataset.value("gpp", "E1", "tropics", 2000).unwrap().is_nan());

    assert_eq!(dataset.value("npp", "E2", "tropics", 1999), Some(0.1));
    assert!(dataset.value("npp", "E2", "global", 1999).unwrap().is_nan());
}

#[test]
fn units_come_from_first_reporting_series() {
    let mut annual = NestedAnnualMap::new();
    annual.insert_series("A", "global", "cs", SparseSeries::new(vec![2000], vec![1.0]));
    annual.insert_series(
        "A",
        "tropics",
        "cs",
        SparseSeries::new(vec![2000], vec![1.0]).with_units("kg m-2"),
    );
    annual.insert_series(
        "B",
        "global",
        "cs",
        SparseSeries::new(vec![2000], vec![1.0]).with_units("PgC"),
    );
    annual.insert_series("B", "global", "cv", SparseSeries::new(vec![2000], vec![1.0]));

    let dataset = assemble_annual_series(&annual, &AssembleOptions::default());
    assert_eq!(dataset.units("cs"), Some("kg m-2"));
    assert_eq!(dataset.units("cv"), None);
}

#[test]
fn category_variable_gets_its_own_axis() {
    let mut annual = NestedAnnualMap::new();
    annual.insert_series("E1", "global", "gpp", SparseSeries::new(vec![2000], vec![1.0]));
    annual.insert_category(
        "E1",
        "global",
        "PFT 2",
        SparseSeries::new(vec![2000, 2001], vec![0.2, 0.3]).with_units("1"),
    );
    annual.insert_category("E2", "global", "PFT 1", SparseSeries::new(vec![2001], vec![0.7]));

    let dataset = assemble_annual_series(&annual, &AssembleOptions::default());
    assert_eq!(dataset.categories, vec!["PFT 1", "PFT 2"]);
    assert_eq!(dataset.years, vec![2000, 2001]);
    assert!(dataset.get("fracPFTs").is_none());

    let frac = dataset.category_variable.as_ref().unwrap();
    assert_eq!(frac.name, "fracPFTs");
    assert_eq!(frac.dims, vec!["experiment", "region", "year", "pft"]);
    assert_eq!(frac.values.shape(), &[2, 1, 2, 2]);
    assert_eq!(dataset.units("fracPFTs"), Some("1"));

    assert_eq!(dataset.category_value("E1", "global", 2001, "PFT 2"), Some(0.3));
    assert_eq!(dataset.category_value("E2", "global", 2001, "PFT 1"), Some(0.7));
    assert!(dataset.category_value("E1", "global", 2000, "PFT 1").unwrap().is_nan());
    assert!(dataset.category_value("E2", "global", 2000, "PFT 2").unwrap().is_nan());

    assert!(dataset.value("gpp", "E2", "global", 2001).unwrap().is_nan());
    assert_eq!(dataset.attrs[DIMS_ATTRIBUTE], "experiment, region, year, pft");
    assert!(dataset.attrs.contains_key(NOTE_ATTRIBUTE));
}

#[test]
fn no_categories_means_no_category_array() {
    let mut annual = NestedAnnualMap::new();
    annual.insert_series("E1", "global", "gpp", SparseSeries::new(vec![2000], vec![1.0]));

    let dataset = assemble_annual_series(&annual, &AssembleOptions::default());
    assert!(dataset.category_variable.is_none());
    assert!(dataset.categories.is_empty());
    assert_eq!(dataset.dims(), vec!["experiment", "region", "year"]);
    assert_eq!(dataset.attrs[DIMS_ATTRIBUTE], "experiment, region, year");
}

#[test]
fn variable_names_are_sanitized_and_axes_renamed() {
    let mut annual = NestedAnnualMap::new();
    annual.insert_series(
        "E1",
        "global",
        "soil resp (total)",
        SparseSeries::new(vec![2000], vec![4.0]),
    );
    let options = AssembleOptions {
        year_axis: "time".to_string(),
        ..AssembleOptions::default()
    };

    let dataset = assemble_annual_series(&annual, &options);
    let array = dataset.get("soil_resp_total").unwrap();
    assert_eq!(array.dims, vec!["experiment", "region", "time"]);
    assert_eq!(dataset.value("soil_resp_total", "E1", "global", 2000), Some(4.0));
}

#[test]
fn json_input_end_to_end() {
    let json = r#"{
        "E1": {"global": {"gpp": {"years": [2000, 2001], "data": [1.0, 2.0], "units": "PgC/yr"}}},
        "E2": {"global": {}}
    }"#;
    let annual = NestedAnnualMap::from_json(json, "fracPFTs").unwrap();
    let dataset = assemble_annual_series(&annual, &AssembleOptions::default());

    assert_eq!(dataset.value("gpp", "E1", "global", 2000), Some(1.0));
    assert_eq!(dataset.value("gpp", "E1", "global", 2001), Some(2.0));
    assert!(dataset.value("gpp", "E2", "global", 2000).unwrap().is_nan());
    assert_eq!(dataset.units("gpp"), Some("PgC/yr"));
}

#[test]
fn experiment_without_regions_keeps_its_axis_slot() {
    let json = r#"{"E1": {"global": {"gpp": {"years": [2000], "data": [1.0]}}}, "E2": {}}"#;
    let annual = NestedAnnualMap::from_json(json, "fracPFTs").unwrap();
    let dataset = assemble_annual_series(&annual, &AssembleOptions::default());

    assert_eq!(dataset.experiments, vec!["E1", "E2"]);
    assert_eq!(dataset.get("gpp").unwrap().values.shape(), &[2, 1, 1]);
    assert!(dataset.value("gpp", "E2", "global", 2000).unwrap().is_nan());

    let mut typed = NestedAnnualMap::new();
    typed.insert_series("E1", "global", "gpp", SparseSeries::new(vec![2000], vec![1.0]));
    typed.insert_experiment("E0");
    let dataset = assemble_annual_series(&typed, &AssembleOptions::default());
    assert_eq!(dataset.experiments, vec!["E0", "E1"]);
}

#[test]
fn null_values_and_empty_payloads_become_nan() {
    let json = r#"{"E1": {"global": {
        "gpp": {"years": [2000, 2001], "data": [1.0, null]},
        "npp": {}
    }}}"#;
    let annual = NestedAnnualMap::from_json(json, "fracPFTs").unwrap();
    let dataset = assemble_annual_series(&annual, &AssembleOptions::default());

    assert_eq!(dataset.value("gpp", "E1", "global", 2000), Some(1.0));
    assert!(dataset.value("gpp", "E1", "global", 2001).unwrap().is_nan());

    let npp = dataset.get("npp").unwrap();
    assert_eq!(npp.values.shape(), &[1, 1, 2]);
    assert!(npp.values.iter().all(|value| value.is_nan()));
}
