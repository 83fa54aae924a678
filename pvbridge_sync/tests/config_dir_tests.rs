//! The shipped `config/` directory builds a working engine.

use pvbridge_common::io::value::Value;
use pvbridge_hal::ImageRegistry;
use pvbridge_sync::config::load_config_dir;
use pvbridge_sync::{Engine, VariableTable};
use std::path::Path;
use std::sync::Arc;

#[test]
fn shipped_config_binds_every_entry() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config");
    let (app, io) = load_config_dir(&dir).unwrap();

    let image = ImageRegistry::with_builtin()
        .create_image("simulation", &io)
        .unwrap();
    let table = Arc::new(VariableTable::new());
    let mut engine = Engine::new(image, table.clone());
    engine.init(app.cycle).unwrap();
    for binding in &app.bindings {
        binding.create(&mut engine).unwrap();
    }

    assert_eq!(engine.binding_count(), app.bindings.len());
    assert_eq!(table.value("AIO:tank_level"), Some(Value::Number(420.0)));
    assert_eq!(table.value("DIO:door_closed"), Some(Value::Bool(true)));

    let valve = engine.binding("OutputValue_1_3").unwrap();
    valve.set(150.0).unwrap();
    assert_eq!(valve.get(), Value::Number(100.0));
}
