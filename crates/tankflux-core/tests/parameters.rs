use tankflux_core::parameters::{
    canonical_parameter_definitions, parameter_definition, resolve_parameters, ParameterScope,
    AMBIENT_TEMPERATURE, HEATER_EFFICIENCY, HEATER_POWER, LIQUID_DENSITY,
    LIQUID_SPECIFIC_HEAT_CAPACITY, TANK_MASS,
};
use tankflux_core::{ParameterSource, PipelineConfig, PipelineError};
use tankflux_store::{AttributeValue, DataStore, MemoryStore};

fn seeded_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store
        .write_attribute("brewing_0002", "T_env", AttributeValue::Float(18.5))
        .expect("T_env");
    for (key, value) in [
        ("heat_transfer_coeff_tank", 5.0),
        ("surface_area_tank", 4.2),
        ("mass_tank", 320.0),
        ("specific_heat_capacity_tank", 500.0),
    ] {
        store
            .write_attribute("brewing_0002/B004", key, AttributeValue::Float(value))
            .expect("tank attribute");
    }
    store
}

#[test]
fn canonical_definitions_cover_every_physical_parameter() {
    let definitions = canonical_parameter_definitions();
    assert_eq!(definitions.len(), 10);

    let required: Vec<&str> = definitions
        .iter()
        .filter(|definition| definition.is_required())
        .map(|definition| definition.code)
        .collect();
    assert_eq!(required.len(), 5);
    assert!(required.contains(&AMBIENT_TEMPERATURE));

    let ambient = parameter_definition(AMBIENT_TEMPERATURE).expect("ambient");
    assert_eq!(ambient.scope, ParameterScope::Brewing);
    assert_eq!(ambient.key, "T_env");
    assert!(parameter_definition("unknown").is_none());
}

#[test]
fn missing_optional_attributes_fall_back_to_defaults() {
    let store = seeded_store();
    let resolved =
        resolve_parameters(&store, &PipelineConfig::default()).expect("resolve failed");

    assert_eq!(resolved.values.heater_power, 0.0);
    assert_eq!(resolved.values.heater_efficiency, 1.0);
    assert_eq!(resolved.values.liquid_specific_heat_capacity, 4184.0);
    assert_eq!(resolved.values.tank_footprint, 2.5);
    assert_eq!(resolved.values.liquid_density, 1000.0);
    assert_eq!(resolved.values.ambient_temperature, 18.5);
    assert_eq!(resolved.values.tank_mass, 320.0);

    assert_eq!(resolved.source_of(HEATER_POWER), Some(ParameterSource::Default));
    assert_eq!(resolved.source_of(TANK_MASS), Some(ParameterSource::Store));
}

#[test]
fn integer_attributes_are_accepted() {
    let mut store = seeded_store();
    store
        .write_attribute("brewing_0002/B004", "power_heater", AttributeValue::Integer(3000))
        .expect("power");

    let resolved =
        resolve_parameters(&store, &PipelineConfig::default()).expect("resolve failed");
    assert_eq!(resolved.values.heater_power, 3000.0);
}

#[test]
fn overrides_beat_store_and_configuration() {
    let mut store = seeded_store();
    store
        .write_attribute("brewing_0002/B004", "efficiency_heater", AttributeValue::Float(0.8))
        .expect("efficiency");

    let mut config = PipelineConfig::default();
    config.parameters.insert(HEATER_EFFICIENCY.to_string(), 0.95);
    config.parameters.insert(LIQUID_DENSITY.to_string(), 1010.0);
    config.liquid.density = Some(1040.0);
    config.liquid.specific_heat_capacity = Some(4000.0);

    let resolved = resolve_parameters(&store, &config).expect("resolve failed");

    assert_eq!(resolved.values.heater_efficiency, 0.95);
    assert_eq!(resolved.source_of(HEATER_EFFICIENCY), Some(ParameterSource::Override));
    assert_eq!(resolved.values.liquid_density, 1010.0);
    assert_eq!(resolved.values.liquid_specific_heat_capacity, 4000.0);
    assert_eq!(
        resolved.source_of(LIQUID_SPECIFIC_HEAT_CAPACITY),
        Some(ParameterSource::Configuration)
    );
}

#[test]
fn missing_required_attribute_is_fatal() {
    let mut store = MemoryStore::new();
    store
        .write_attribute("brewing_0002/B004", "mass_tank", AttributeValue::Float(320.0))
        .expect("mass");

    let err = resolve_parameters(&store, &PipelineConfig::default())
        .expect_err("missing required attributes must fail");
    assert!(matches!(err, PipelineError::InvalidParameter { .. }));
}

#[test]
fn required_attribute_can_come_from_an_override() {
    let mut store = seeded_store();
    store
        .write_attribute("brewing_0002", "T_env", AttributeValue::from("warm"))
        .expect("text attribute");

    let err = resolve_parameters(&store, &PipelineConfig::default())
        .expect_err("text attribute is not a number");
    assert!(matches!(err, PipelineError::Store(_)));

    let mut config = PipelineConfig::default();
    config.parameters.insert(AMBIENT_TEMPERATURE.to_string(), 17.0);
    let resolved = resolve_parameters(&store, &config).expect("override skips the store");
    assert_eq!(resolved.values.ambient_temperature, 17.0);
}

#[test]
fn metadata_records_value_and_source() {
    let store = seeded_store();
    let resolved =
        resolve_parameters(&store, &PipelineConfig::default()).expect("resolve failed");
    let metadata = resolved.metadata();

    assert_eq!(
        metadata.get("parameter_tank_mass"),
        Some(&AttributeValue::Float(320.0))
    );
    assert_eq!(
        metadata.get("parameter_source_heater_power"),
        Some(&AttributeValue::from("default"))
    );
    assert_eq!(metadata.len(), 20);
}
