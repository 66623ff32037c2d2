use polars::prelude::*;
use tankflux_core::pipeline::{assemble_table, pipeline_descriptor};
use tankflux_core::{
    ChannelKind, EnergyBalancePipeline, PipelineConfig, PipelineError, PlotFormat, RawChannels,
};
use tankflux_store::{AttributeValue, DataStore, MemoryStore};

fn seed_tank(store: &mut MemoryStore, level: &[f64], temperature: &[f64], timestamp: &[f64]) {
    store.write_array("brewing_0002/B004/level", level).expect("level");
    store
        .write_array("brewing_0002/B004/temperature", temperature)
        .expect("temperature");
    store
        .write_array("brewing_0002/B004/timestamp", timestamp)
        .expect("timestamp");
    store
        .write_attribute("brewing_0002", "T_env", AttributeValue::Float(18.0))
        .expect("T_env");
    for (key, value) in [
        ("power_heater", 2000.0),
        ("efficiency_heater", 0.9),
        ("heat_transfer_coeff_tank", 5.0),
        ("surface_area_tank", 4.0),
        ("mass_tank", 300.0),
        ("specific_heat_capacity_tank", 500.0),
    ] {
        store
            .write_attribute("brewing_0002/B004", key, AttributeValue::Float(value))
            .expect("tank attribute");
    }
}

fn scenario_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    seed_tank(
        &mut store,
        &[1.0, -1.0, 2.0, f64::NAN, 3.0],
        &[20.0, 21.0, f64::NAN, 22.0, 23.0],
        &[0.0, 1000.0, 2000.0, 3000.0, 4000.0],
    );
    store
}

fn column(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .expect("column")
        .f64()
        .expect("f64 column")
        .into_no_null_iter()
        .collect()
}

#[test]
fn end_to_end_run_produces_the_energy_table() {
    let store = scenario_store();
    let pipeline = EnergyBalancePipeline::new(PipelineConfig::default()).expect("config");

    let output = pipeline.run(&store).expect("run failed");
    let table = &output.table;

    assert_eq!(table.height(), 4);
    assert_eq!(column(table, "time"), vec![0.0, 1.0, 2.0, 3.0]);

    let energy = column(table, "inner_energy_k_3");
    assert_eq!(energy.len(), 4);
    assert!(energy.iter().all(|value| value.is_finite()));

    let names: Vec<String> = table
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(names.len(), 1 + 4 * 3);
    assert_eq!(
        &names[..5],
        &[
            "time",
            "level_k_3",
            "temperature_k_3",
            "mass_k_3",
            "inner_energy_k_3"
        ]
    );
    assert_eq!(names[12], "inner_energy_k_7");
}

#[test]
fn energy_column_matches_the_closed_form() {
    let store = scenario_store();
    let pipeline = EnergyBalancePipeline::new(PipelineConfig {
        filter_sizes: vec![1],
        ..PipelineConfig::default()
    })
    .expect("config");

    let output = pipeline.run(&store).expect("run failed");

    // window 1 leaves the cleaned level [1, 2, 2.5, 3] untouched
    let cleaned_temperature = [20.0, 21.0, 21.5, 22.0];
    let levels = [1.0, 2.0, 2.5, 3.0];
    let energy = column(&output.table, "inner_energy_k_1");
    for (index, value) in energy.iter().enumerate() {
        let t = cleaned_temperature[index];
        let mass = levels[index] * 2.5 * 1000.0;
        let expected = 2000.0 * 0.9 - 5.0 * 4.0 * (t - 18.0) + mass * 4184.0 * t
            + 300.0 * 500.0 * 18.0;
        assert!((value - expected).abs() < 1e-6, "row {index}: {value} != {expected}");
    }
    assert_eq!(column(&output.table, "mass_k_1"), vec![2500.0, 5000.0, 6250.0, 7500.0]);
}

#[test]
fn variants_are_smoothed_from_the_same_cleaned_signal() {
    let store = scenario_store();
    let pipeline = EnergyBalancePipeline::new(PipelineConfig::default()).expect("config");

    let output = pipeline.run(&store).expect("run failed");

    assert_eq!(output.variants.len(), 3);
    for variant in &output.variants {
        assert_eq!(variant.level.len(), 4, "k={}", variant.window);
        assert_eq!(variant.temperature.len(), 5, "k={}", variant.window);
        assert_eq!(variant.mass.len(), 4, "k={}", variant.window);
        assert_eq!(variant.energy.len(), 4, "k={}", variant.window);
    }
    let windows: Vec<usize> = output.variants.iter().map(|variant| variant.window).collect();
    assert_eq!(windows, vec![3, 5, 7]);
}

#[test]
fn table_height_is_the_shortest_energy_trace() {
    let mut store = MemoryStore::new();
    seed_tank(
        &mut store,
        &(0..10).map(|v| 1.0 + f64::from(v)).collect::<Vec<_>>(),
        &(0..7).map(|v| 20.0 + f64::from(v)).collect::<Vec<_>>(),
        &(0..12).map(|v| f64::from(v) * 1000.0).collect::<Vec<_>>(),
    );
    let pipeline = EnergyBalancePipeline::new(PipelineConfig::default()).expect("config");

    let output = pipeline.run(&store).expect("run failed");

    assert_eq!(output.table.height(), 7);
}

#[test]
fn missing_channel_aborts_the_run() {
    let mut store = scenario_store();
    store
        .write_table(
            "brewing_0002/B004",
            &df!["level" => &[1.0, 2.0]].expect("df"),
            &Default::default(),
        )
        .expect("replace tank group");

    let pipeline = EnergyBalancePipeline::new(PipelineConfig::default()).expect("config");
    let err = pipeline.run(&store).expect_err("run must fail");

    assert!(matches!(
        err,
        PipelineError::RequiredChannelMissing {
            channel: ChannelKind::Temperature
        }
    ));
}

#[test]
fn custom_channel_names_are_read() {
    let mut store = MemoryStore::new();
    store
        .write_array("brewing_0002/B004/fill_level", &[1.0, 2.0])
        .expect("level");
    let mut config = PipelineConfig::default();
    config.channels.level = "fill_level".to_string();
    let pipeline = EnergyBalancePipeline::new(config).expect("config");

    let err = pipeline.read_raw(&store).expect_err("temperature is absent");
    assert!(matches!(
        err,
        PipelineError::RequiredChannelMissing {
            channel: ChannelKind::Temperature
        }
    ));
}

#[test]
fn process_is_independent_of_the_store() {
    let store = scenario_store();
    let pipeline = EnergyBalancePipeline::new(PipelineConfig::default()).expect("config");
    let parameters = pipeline.resolve_parameters(&store).expect("parameters");

    let raw = RawChannels::new(
        vec![1.0, 1.0, 1.0],
        vec![20.0, 20.0, 20.0],
        vec![0.0, 1000.0, 2000.0],
    );
    let output = pipeline.process(&raw, &parameters).expect("process failed");

    assert_eq!(output.table.height(), 3);
    assert_eq!(column(&output.table, "level_k_5"), vec![1.0, 1.0, 1.0]);
}

#[test]
fn invalid_configuration_is_rejected_up_front() {
    let err = EnergyBalancePipeline::new(PipelineConfig {
        filter_sizes: vec![0],
        ..PipelineConfig::default()
    })
    .expect_err("window 0 must be rejected");
    assert!(matches!(err, PipelineError::InvalidWindow(0)));
}

#[test]
fn persist_writes_table_and_metadata_that_read_back() {
    let mut store = scenario_store();
    let pipeline = EnergyBalancePipeline::new(PipelineConfig::default()).expect("config");
    let output = pipeline.run(&store).expect("run failed");

    pipeline.persist(&output, &mut store).expect("persist failed");

    let (table, metadata) = store
        .read_table("processed_data")
        .expect("read")
        .expect("table present");
    assert_eq!(table.height(), output.table.height());
    assert_eq!(table.width(), output.table.width());
    assert_eq!(
        column(&table, "inner_energy_k_5"),
        column(&output.table, "inner_energy_k_5")
    );

    let format = PlotFormat::from_metadata(&metadata).expect("plot format");
    assert_eq!(format, PlotFormat::default());
    assert_eq!(
        metadata.get("pipeline_code"),
        Some(&AttributeValue::from(pipeline_descriptor().code))
    );
    assert_eq!(
        metadata.get("parameter_source_heater_power"),
        Some(&AttributeValue::from("store"))
    );
    assert_eq!(metadata.get("row_count"), Some(&AttributeValue::Integer(4)));
}

#[test]
fn failed_run_persists_nothing() {
    let mut store = MemoryStore::new();
    seed_tank(&mut store, &[f64::NAN, f64::NAN], &[20.0, 21.0], &[0.0, 1000.0]);
    let pipeline = EnergyBalancePipeline::new(PipelineConfig::default()).expect("config");

    let err = pipeline.run(&store).expect_err("all-NaN level must fail");
    assert!(matches!(
        err,
        PipelineError::AllMissing {
            channel: ChannelKind::Level
        }
    ));
    assert!(store.read_table("processed_data").expect("read").is_none());
}

#[test]
fn assemble_table_of_no_variants_is_empty_time() {
    let table = assemble_table(&[0.0, 1.0], &[]).expect("assemble");
    assert_eq!(table.height(), 0);
    assert_eq!(table.width(), 1);
}
