use std::path::PathBuf;

use storefront::{scenario::ScenarioLoader, snapshot::HistoryWriter, PaymentMode};

fn scenario_loader() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from("scenarios").join(name)
}

#[test]
fn loader_reads_inline_tables() {
    let scenario = scenario_loader()
        .load(scenario_path("dmotopia.yaml"))
        .expect("scenario parses");
    assert_eq!(scenario.name, "Dmotopia");
    assert_eq!(scenario.population, 1000);
    assert_eq!(scenario.cycles(None), 200);
    assert_eq!(scenario.cycles(Some(5)), 5);
    assert_eq!(scenario.tables().demand_types.len(), 3);
    assert_eq!(scenario.tables().business_types.len(), 3);
    assert_eq!(scenario.payment_mode, PaymentMode::PriceReapplied);
}

#[test]
fn loader_merges_json_tables() {
    let scenario = scenario_loader()
        .load(scenario_path("table_town.yaml"))
        .expect("scenario parses");
    let tables = scenario.tables();
    let demand: Vec<_> = tables.demand_types.keys().cloned().collect();
    assert_eq!(demand, vec!["coffee", "food", "haircut"]);
    let business: Vec<_> = tables.business_types.keys().cloned().collect();
    assert_eq!(business, vec!["barber", "coffee", "food"]);
    assert_eq!(tables.business_types["food"].burn_rate, 6.0);
    assert_eq!(scenario.payment_mode, PaymentMode::QuantityTimesPrice);

    let mut city = scenario.build_city().expect("city builds");
    city.run(scenario.cycles(Some(10))).unwrap();
    assert_eq!(city.age(), 10);
    assert_eq!(city.payment_mode(), PaymentMode::QuantityTimesPrice);
}

#[test]
fn missing_scenario_reports_path() {
    let err = scenario_loader()
        .load(scenario_path("nowhere.yaml"))
        .unwrap_err();
    assert!(format!("{err:#}").contains("nowhere.yaml"));
}

#[test]
fn malformed_table_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("demand.json"),
        r#"{"food": {"dlambda": "lots", "dprice": 1.0}}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("city.yaml"),
        "name: Broken\nseed: 1\nradius: 3\npopulation: 10\ndemand_table: demand.json\n",
    )
    .unwrap();
    let err = ScenarioLoader::new(dir.path()).load("city.yaml").unwrap_err();
    assert!(format!("{err:#}").contains("malformed demand-type table"));
}

#[test]
fn hamlet_runs_and_exports_history() {
    let scenario = scenario_loader()
        .load(scenario_path("hamlet.yaml"))
        .unwrap();
    let mut city = scenario.build_city().unwrap();
    assert_eq!(city.businesses().count(), 0);
    city.run(scenario.cycles(None)).unwrap();

    let temp_dir = tempfile::tempdir().unwrap();
    let path = HistoryWriter::new(temp_dir.path())
        .write(&city.export_history())
        .unwrap();
    assert_eq!(path, temp_dir.path().join("Hamlet").join("history.json"));

    let data = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&data).unwrap();
    assert_eq!(json["city"], "Hamlet");
    assert_eq!(json["seed"], 3);
    assert_eq!(json["age"], 5);
    assert_eq!(json["population"].as_array().unwrap().len(), 6);
    assert!(json["businesses"][0]["by_type"]["diner"]["count"].is_u64());
    assert!(json["population"][5]["by_type"]["food"]["total_demand"].is_number());
}
