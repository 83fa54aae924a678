//! End-to-end cycle behaviour against a recording process image.

mod common;

use common::{Event, RecordingImage, wait_until};
use pvbridge_common::config::BridgeConfig;
use pvbridge_common::io::value::Value;
use pvbridge_common::variable::AttributeOverrides;
use pvbridge_sync::{
    CycleContext, CycleJob, Engine, EngineError, EngineState, TokioContext, VariableTable,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);

fn fast(cleanup: bool) -> BridgeConfig {
    BridgeConfig {
        cycletime_ms: 20,
        cleanup,
        ..Default::default()
    }
}

fn setup(
    points: &[(&str, &str, Value)],
    config: BridgeConfig,
) -> (Engine, Arc<RecordingImage>, Arc<VariableTable>) {
    let image = Arc::new(RecordingImage::new(points));
    let table = Arc::new(VariableTable::new());
    let mut engine = Engine::new(image.clone(), table.clone());
    engine.init(config).unwrap();
    (engine, image, table)
}

fn bind(engine: &mut Engine, hw: &str) -> pvbridge_sync::Binding {
    engine
        .create_binding(hw, None, AttributeOverrides::default())
        .unwrap()
}

fn wait_cycles(engine: &Engine, n: u64) {
    assert!(
        wait_until(WAIT, || engine.stats().cycle_count >= n),
        "engine did not reach {n} cycles"
    );
}

#[test]
fn inputs_then_outputs_then_tasks() {
    let (mut engine, image, _) = setup(
        &[
            ("InputValue_1_1", "AIO", Value::Number(1.0)),
            ("InputStatus_2_1", "DIO", Value::Bool(false)),
            ("InputValue_3_1", "AIO", Value::Number(3.0)),
            ("OutputValue_1_2", "AIO", Value::Number(0.0)),
            ("OutputStatus_2_2", "DIO", Value::Bool(false)),
        ],
        fast(false),
    );
    for hw in [
        "InputValue_1_1",
        "OutputValue_1_2",
        "InputStatus_2_1",
        "OutputStatus_2_2",
        "InputValue_3_1",
    ] {
        bind(&mut engine, hw);
    }
    for name in ["first", "second"] {
        let recorder = Arc::clone(&image);
        engine
            .add_loop_task(name, move || {
                recorder.record(Event::Task(name.to_string()));
                Ok(())
            })
            .unwrap();
    }

    image.clear_events();
    engine.start(None).unwrap();
    wait_cycles(&engine, 2);
    assert!(engine.stop());

    let events = image.events();
    let second = events
        .iter()
        .skip(1)
        .position(|e| *e == Event::Refresh)
        .map(|i| i + 1)
        .unwrap();
    let first_cycle = &events[..second];

    let read = |n: &str| Event::Read(n.to_string());
    assert_eq!(
        first_cycle,
        &[
            Event::Refresh,
            read("InputValue_1_1"),
            read("InputStatus_2_1"),
            read("InputValue_3_1"),
            Event::Write("OutputValue_1_2".into(), Value::Number(0.0)),
            Event::Write("OutputStatus_2_2".into(), Value::Bool(false)),
            Event::Flush,
            Event::Task("first".into()),
            Event::Task("second".into()),
            Event::Flush,
        ]
    );
}

#[test]
fn cleanup_resets_outputs_to_default() {
    let (mut engine, image, table) = setup(
        &[("OutputValue_1_1", "AIO", Value::Number(0.0))],
        fast(true),
    );
    let out = bind(&mut engine, "OutputValue_1_1");

    engine.start(None).unwrap();
    out.set(42.0).unwrap();
    assert!(wait_until(WAIT, || {
        image.value("OutputValue_1_1") == Value::Number(42.0)
    }));

    assert!(engine.stop());
    assert_eq!(image.value("OutputValue_1_1"), Value::Number(0.0));
    assert_eq!(out.get(), Value::Number(0.0));
    assert_eq!(table.value("OutputValue_1_1"), Some(Value::Number(0.0)));
    assert_eq!(image.events().last(), Some(&Event::Flush));
}

#[test]
fn no_cleanup_keeps_last_output() {
    let (mut engine, image, _) = setup(
        &[("OutputStatus_1_1", "DIO", Value::Bool(false))],
        fast(false),
    );
    let out = bind(&mut engine, "OutputStatus_1_1");

    engine.start(None).unwrap();
    out.set(true).unwrap();
    assert!(wait_until(WAIT, || image.value("OutputStatus_1_1") == Value::Bool(true)));
    assert!(engine.stop());
    assert_eq!(image.value("OutputStatus_1_1"), Value::Bool(true));
}

#[test]
fn overrun_starts_next_cycle_without_catch_up() {
    let (mut engine, image, _) = setup(
        &[("InputValue_1_1", "AIO", Value::Number(0.0))],
        fast(false),
    );
    bind(&mut engine, "InputValue_1_1");
    image.set_refresh_delay(Duration::from_millis(50));

    let started = Instant::now();
    engine.start(None).unwrap();
    wait_cycles(&engine, 3);
    assert!(engine.stop());
    let elapsed = started.elapsed();

    let stats = engine.stats();
    assert!(stats.overruns >= 3, "{stats:?}");
    // One refresh per cycle: missed periods are not replayed.
    assert_eq!(image.refresh_count() as u64, stats.cycle_count);
    assert!(stats.cycle_count <= elapsed.as_millis() as u64 / 50 + 1);
    assert!(stats.max_cycle_us >= 50_000);
}

#[test]
fn input_posted_only_on_change() {
    let (mut engine, image, table) = setup(
        &[("InputValue_1_1", "AIO", Value::Number(5.0))],
        fast(false),
    );
    let input = bind(&mut engine, "InputValue_1_1");
    let var = table.variable("InputValue_1_1").unwrap();

    engine.start(None).unwrap();
    wait_cycles(&engine, 3);
    assert_eq!(var.post_count(), 0);

    image.set("InputValue_1_1", Value::Number(6.5));
    assert!(wait_until(WAIT, || input.get() == Value::Number(6.5)));
    let cycles = engine.stats().cycle_count;
    wait_cycles(&engine, cycles + 3);
    assert!(engine.stop());

    assert_eq!(var.post_count(), 1);
    assert_eq!(table.value("InputValue_1_1"), Some(Value::Number(6.5)));
}

#[test]
fn client_writes_reach_hardware_clamped() {
    let (mut engine, image, table) = setup(
        &[("OutputValue_1_1", "AO", Value::Number(0.0))],
        fast(false),
    );
    let out = engine
        .builder("OutputValue_1_1")
        .name("setpoint")
        .limits(0.0, 10.0)
        .build()
        .unwrap();

    engine.start(None).unwrap();
    table.client_write("setpoint", Value::Number(25.0)).unwrap();
    assert!(wait_until(WAIT, || image.value("OutputValue_1_1") == Value::Number(10.0)));
    assert_eq!(out.get(), Value::Number(10.0));
    assert!(engine.stop());
}

#[test]
fn refresh_failures_skip_cycles_and_recover() {
    let (mut engine, image, _) = setup(
        &[("InputValue_1_1", "AIO", Value::Number(0.0))],
        fast(false),
    );
    let input = bind(&mut engine, "InputValue_1_1");
    image.fail_refreshes(3);
    image.set("InputValue_1_1", Value::Number(9.0));

    engine.start(None).unwrap();
    assert!(wait_until(WAIT, || input.get() == Value::Number(9.0)));
    assert!(engine.stop());

    let stats = engine.stats();
    assert_eq!(stats.refresh_failures, 3);
    assert_eq!(stats.consecutive_refresh_failures, 0);
    assert!(stats.cycle_count >= 4);
}

#[test]
fn point_failures_are_isolated_per_binding() {
    let (mut engine, image, table) = setup(
        &[
            ("InputValue_1_1", "AIO", Value::Number(1.0)),
            ("InputValue_2_1", "AIO", Value::Number(2.0)),
            ("OutputValue_1_2", "AIO", Value::Number(0.0)),
            ("OutputValue_2_2", "AIO", Value::Number(0.0)),
        ],
        fast(false),
    );
    let dead_in = bind(&mut engine, "InputValue_1_1");
    let live_in = bind(&mut engine, "InputValue_2_1");
    let dead_out = bind(&mut engine, "OutputValue_1_2");
    let live_out = bind(&mut engine, "OutputValue_2_2");
    image.fail_point("InputValue_1_1");
    image.fail_point("OutputValue_1_2");
    image.set("InputValue_1_1", Value::Number(11.0));
    image.set("InputValue_2_1", Value::Number(22.0));
    dead_out.set(5.0).unwrap();
    live_out.set(6.0).unwrap();

    engine.start(None).unwrap();
    assert!(wait_until(WAIT, || {
        live_in.get() == Value::Number(22.0)
            && image.value("OutputValue_2_2") == Value::Number(6.0)
    }));
    wait_cycles(&engine, 3);
    assert!(engine.stop());

    assert_eq!(dead_in.get(), Value::Number(1.0));
    assert_eq!(table.value("InputValue_1_1"), Some(Value::Number(1.0)));
    assert_eq!(image.value("OutputValue_1_2"), Value::Number(0.0));

    let stats = engine.stats();
    assert_eq!(stats.binding_failures, 2 * stats.cycle_count);
    assert_eq!(stats.refresh_failures, 0);
}

#[test]
fn failed_output_write_keeps_previous_value() {
    let (mut engine, image, table) = setup(
        &[("OutputValue_1_1", "AO", Value::Number(0.0))],
        fast(false),
    );
    let out = bind(&mut engine, "OutputValue_1_1");
    image.fail_point("OutputValue_1_1");

    engine.start(None).unwrap();
    table.client_write("OutputValue_1_1", Value::Number(9.0)).unwrap();
    let cycles = engine.stats().cycle_count;
    wait_cycles(&engine, cycles + 3);
    assert_eq!(out.get(), Value::Number(0.0));
    assert_eq!(image.value("OutputValue_1_1"), Value::Number(0.0));

    image.heal_point("OutputValue_1_1");
    assert!(wait_until(WAIT, || out.get() == Value::Number(9.0)));
    assert_eq!(image.value("OutputValue_1_1"), Value::Number(9.0));
    assert!(engine.stop());
}

struct RefusingContext;

impl CycleContext for RefusingContext {
    fn launch(&self, job: CycleJob) -> Result<(), EngineError> {
        drop(job);
        Err(EngineError::Launch("no worker available".to_string()))
    }
}

#[test]
fn refused_launch_leaves_outputs_alone() {
    let (mut engine, image, _) = setup(
        &[("OutputValue_1_1", "AO", Value::Number(4.0))],
        fast(true),
    );
    bind(&mut engine, "OutputValue_1_1");
    image.clear_events();

    assert!(matches!(
        engine.start(Some(&RefusingContext)),
        Err(EngineError::Launch(_))
    ));
    assert_eq!(engine.state(), EngineState::Configured);
    assert_eq!(image.value("OutputValue_1_1"), Value::Number(4.0));
    assert!(image.events().is_empty());

    engine.start(None).unwrap();
    wait_cycles(&engine, 1);
    assert!(engine.stop());
    assert_eq!(image.value("OutputValue_1_1"), Value::Number(0.0));
}

#[test]
fn failing_and_panicking_tasks_are_isolated() {
    let (mut engine, _image, _) = setup(
        &[("OutputValue_1_1", "AO", Value::Number(0.0))],
        fast(false),
    );
    let counter = Arc::new(std::sync::atomic::AtomicU64::new(0));
    engine
        .add_loop_task("fails", || Err("interlock open".into()))
        .unwrap();
    engine
        .add_loop_task("panics", || panic!("task bug"))
        .unwrap();
    let seen = Arc::clone(&counter);
    engine
        .add_loop_task("counts", move || {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    engine.start(None).unwrap();
    wait_cycles(&engine, 3);
    assert!(engine.stop());

    let stats = engine.stats();
    let runs = counter.load(std::sync::atomic::Ordering::SeqCst);
    assert!(runs >= 3);
    assert_eq!(stats.task_failures, runs * 2);
    assert_eq!(engine.loop_task_names(), ["fails", "panics", "counts"]);
}

#[test]
fn concurrent_get_set_never_tears() {
    let (mut engine, _image, _) = setup(
        &[("OutputValue_1_1", "AO", Value::Number(0.0))],
        fast(false),
    );
    let out = bind(&mut engine, "OutputValue_1_1");
    engine.start(None).unwrap();

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let b = out.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    b.set(f64::from(i)).unwrap();
                    match b.get() {
                        Value::Number(n) => {
                            assert!(
                                n.fract() == 0.0 && (0.0..100.0).contains(&n),
                                "torn value {n}"
                            )
                        }
                        other => panic!("wrong type {other:?}"),
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert!(engine.stop());
}

#[test]
fn hardware_exit_request_stops_loop() {
    let (mut engine, image, _) = setup(
        &[("OutputValue_1_1", "AO", Value::Number(0.0))],
        fast(true),
    );
    let out = bind(&mut engine, "OutputValue_1_1");
    engine.start(None).unwrap();
    out.set(3.0).unwrap();
    assert!(wait_until(WAIT, || image.value("OutputValue_1_1") == Value::Number(3.0)));

    image.request_exit();
    assert!(wait_until(WAIT, || engine.state() == EngineState::Stopped));
    assert_eq!(image.value("OutputValue_1_1"), Value::Number(0.0));
    assert!(engine.stop());
}

#[test]
fn input_set_fails_with_direction() {
    let (mut engine, _image, table) = setup(
        &[("InputStatus_1_1", "DI", Value::Bool(true))],
        fast(false),
    );
    let input = bind(&mut engine, "InputStatus_1_1");
    assert!(matches!(input.set(false), Err(EngineError::Direction(_))));
    assert_eq!(input.get(), Value::Bool(true));
    assert_eq!(table.value("InputStatus_1_1"), Some(Value::Bool(true)));
}

#[test]
fn invalid_name_leaves_registry_unchanged() {
    let (mut engine, _image, _) = setup(
        &[("InputValue_1_1", "AIO", Value::Number(0.0))],
        fast(false),
    );
    bind(&mut engine, "InputValue_1_1");
    for bad in ["InputValue_1", "ValueInput_1_1", "InputValue_0_1", "inputvalue_1_1"] {
        assert!(matches!(
            engine.create_binding(bad, None, AttributeOverrides::default()),
            Err(EngineError::InvalidName(_))
        ));
    }
    assert!(matches!(
        engine.create_binding("InputValue_1_1", None, AttributeOverrides::default()),
        Err(EngineError::DuplicateBinding(_))
    ));
    assert_eq!(engine.binding_count(), 1);
}

#[test]
fn drop_stops_running_engine() {
    let (mut engine, image, _) = setup(
        &[("OutputValue_1_1", "AO", Value::Number(0.0))],
        fast(true),
    );
    let out = bind(&mut engine, "OutputValue_1_1");
    engine.start(None).unwrap();
    out.set(7.0).unwrap();
    assert!(wait_until(WAIT, || image.value("OutputValue_1_1") == Value::Number(7.0)));

    drop(engine);
    assert_eq!(image.value("OutputValue_1_1"), Value::Number(0.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tokio_context_runs_same_cycle() {
    let (mut engine, image, _) = setup(
        &[
            ("InputValue_1_1", "AIO", Value::Number(1.0)),
            ("OutputValue_1_2", "AIO", Value::Number(0.0)),
        ],
        fast(true),
    );
    let input = bind(&mut engine, "InputValue_1_1");
    let out = bind(&mut engine, "OutputValue_1_2");

    let ctx = TokioContext::current().unwrap();
    engine.start(Some(&ctx)).unwrap();
    assert_eq!(engine.state(), EngineState::Running);

    out.set(2.5).unwrap();
    image.set("InputValue_1_1", Value::Number(8.0));
    let deadline = Instant::now() + WAIT;
    while (image.value("OutputValue_1_2") != Value::Number(2.5)
        || input.get() != Value::Number(8.0))
        && Instant::now() < deadline
    {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(image.value("OutputValue_1_2"), Value::Number(2.5));
    assert_eq!(input.get(), Value::Number(8.0));

    assert!(engine.stop());
    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(image.value("OutputValue_1_2"), Value::Number(0.0));
}
