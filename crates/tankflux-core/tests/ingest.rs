use std::fs;

use tankflux_core::config::{ChannelNames, SourceConfig};
use tankflux_core::ingest::{import_readings_csv, read_channel_columns, AttributeManifest};
use tankflux_core::{ChannelKind, EnergyBalancePipeline, PipelineConfig, PipelineError};
use tankflux_store::{DataStore, JsonFileStore, MemoryStore};
use tempfile::tempdir;

const READINGS: &str = "\
timestamp,level,temperature
0,1.0,20.0
1000,-1.0,21.0
2000,2.0,
3000,nan,22.0
4000,3.0,23.0
";

const ATTRIBUTES: &str = r#"
[brewing]
T_env = 18.0

[tank]
power_heater = 2000.0
efficiency_heater = 0.9
heat_transfer_coeff_tank = 5.0
surface_area_tank = 4.0
mass_tank = 300.0
specific_heat_capacity_tank = 500.0
"#;

#[test]
fn csv_columns_map_empty_and_nan_cells_to_nan() {
    let columns =
        read_channel_columns(READINGS.as_bytes(), &ChannelNames::default()).expect("parse");

    let level = &columns
        .iter()
        .find(|(kind, _)| *kind == ChannelKind::Level)
        .expect("level")
        .1;
    assert_eq!(level.len(), 5);
    assert!(level[3].is_nan());

    let temperature = &columns
        .iter()
        .find(|(kind, _)| *kind == ChannelKind::Temperature)
        .expect("temperature")
        .1;
    assert!(temperature[2].is_nan());
    assert_eq!(temperature[4], 23.0);
}

#[test]
fn trailing_empty_cells_shorten_a_channel() {
    let raw = "timestamp,level,temperature\n0,1,20\n1000,2,\n2000,,\n";
    let columns = read_channel_columns(raw.as_bytes(), &ChannelNames::default()).expect("parse");

    let lengths: Vec<(ChannelKind, usize)> = columns
        .iter()
        .map(|(kind, values)| (*kind, values.len()))
        .collect();
    assert_eq!(
        lengths,
        vec![
            (ChannelKind::Level, 2),
            (ChannelKind::Temperature, 1),
            (ChannelKind::Timestamp, 3),
        ]
    );
}

#[test]
fn missing_column_and_bad_cells_are_import_errors() {
    let err = read_channel_columns("timestamp,level\n0,1\n".as_bytes(), &ChannelNames::default())
        .expect_err("temperature column missing");
    assert!(matches!(err, PipelineError::Import(message) if message.contains("temperature")));

    let err = read_channel_columns(
        "timestamp,level,temperature\n0,high,20\n".as_bytes(),
        &ChannelNames::default(),
    )
    .expect_err("unparsable cell");
    assert!(matches!(err, PipelineError::Import(message) if message.contains("row 2")));
}

#[test]
fn manifest_writes_attributes_to_both_groups() {
    let manifest = AttributeManifest::from_toml_str(ATTRIBUTES).expect("manifest");
    let mut store = MemoryStore::new();

    let written = manifest
        .apply(&mut store, &SourceConfig::default())
        .expect("apply");

    assert_eq!(written, 7);
    assert_eq!(
        store
            .read_scalar_attribute("brewing_0002", "T_env")
            .expect("read"),
        Some(18.0)
    );
    assert_eq!(
        store
            .read_scalar_attribute("brewing_0002/B004", "mass_tank")
            .expect("read"),
        Some(300.0)
    );
}

#[test]
fn imported_data_runs_through_the_pipeline() {
    let dir = tempdir().expect("tempdir");
    let csv_path = dir.path().join("readings.csv");
    fs::write(&csv_path, READINGS).expect("write csv");

    let mut store = JsonFileStore::open(dir.path().join("store.json"));
    let source = SourceConfig::default();
    let summary = import_readings_csv(&mut store, &csv_path, &source, &ChannelNames::default())
        .expect("import");
    assert!(summary.channels.iter().all(|(_, len)| *len == 5));

    AttributeManifest::from_toml_str(ATTRIBUTES)
        .expect("manifest")
        .apply(&mut store, &source)
        .expect("apply");

    let reopened = JsonFileStore::open(dir.path().join("store.json"));
    let pipeline = EnergyBalancePipeline::new(PipelineConfig::default()).expect("config");
    let output = pipeline.run(&reopened).expect("run failed");

    assert_eq!(output.table.height(), 4);
}
