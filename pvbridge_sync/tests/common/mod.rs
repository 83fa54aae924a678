//! Shared fixtures: a process image that records every call.

#![allow(dead_code)]

use parking_lot::Mutex;
use pvbridge_common::io::image::{HardwarePoint, ImageError, ProcessImage};
use pvbridge_common::io::value::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Refresh,
    Read(String),
    Write(String, Value),
    Flush,
    Task(String),
}

struct Point {
    module: String,
    value: Value,
    default: Value,
}

/// Process image that logs calls in order. Values are written through
/// immediately; `flush` only records.
pub struct RecordingImage {
    points: Mutex<HashMap<String, Point>>,
    order: Vec<String>,
    events: Mutex<Vec<Event>>,
    failing_refreshes: AtomicU32,
    failing_points: Mutex<HashSet<String>>,
    refresh_delay: Mutex<Option<Duration>>,
    exit: AtomicBool,
}

impl RecordingImage {
    /// `points`: (name, module, initial value). Defaults are the zero of the
    /// initial value's type.
    pub fn new(points: &[(&str, &str, Value)]) -> Self {
        let map = points
            .iter()
            .map(|&(name, module, value)| {
                (
                    name.to_string(),
                    Point {
                        module: module.to_string(),
                        value,
                        default: Value::zero(value.value_type()),
                    },
                )
            })
            .collect();
        Self {
            points: Mutex::new(map),
            order: points.iter().map(|p| p.0.to_string()).collect(),
            events: Mutex::new(Vec::new()),
            failing_refreshes: AtomicU32::new(0),
            failing_points: Mutex::new(HashSet::new()),
            refresh_delay: Mutex::new(None),
            exit: AtomicBool::new(false),
        }
    }

    pub fn set(&self, name: &str, value: Value) {
        if let Some(p) = self.points.lock().get_mut(name) {
            p.value = value;
        }
    }

    pub fn value(&self, name: &str) -> Value {
        self.points.lock()[name].value
    }

    pub fn record(&self, event: Event) {
        self.events.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    pub fn refresh_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| **e == Event::Refresh)
            .count()
    }

    /// Make the next `n` refreshes fail.
    pub fn fail_refreshes(&self, n: u32) {
        self.failing_refreshes.store(n, Ordering::SeqCst);
    }

    /// Make reads and writes of one point fail until [`heal_point`](Self::heal_point).
    pub fn fail_point(&self, name: &str) {
        self.failing_points.lock().insert(name.to_string());
    }

    pub fn heal_point(&self, name: &str) {
        self.failing_points.lock().remove(name);
    }

    fn check_point(&self, name: &str) -> Result<(), ImageError> {
        if self.failing_points.lock().contains(name) {
            return Err(ImageError::CommunicationError(format!("{name}: no response")));
        }
        Ok(())
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock() = Some(delay);
    }

    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::SeqCst);
    }
}

impl ProcessImage for RecordingImage {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn lookup(&self, name: &str) -> Option<HardwarePoint> {
        let points = self.points.lock();
        let p = points.get(name)?;
        Some(HardwarePoint {
            name: name.to_string(),
            module: p.module.clone(),
            address: self.order.iter().position(|n| n == name).unwrap_or(0),
        })
    }

    fn refresh(&self) -> Result<(), ImageError> {
        let delay = *self.refresh_delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let failing = self
            .failing_refreshes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ImageError::CommunicationError("bus timeout".to_string()));
        }
        self.record(Event::Refresh);
        Ok(())
    }

    fn read_value(&self, name: &str) -> Result<Value, ImageError> {
        self.check_point(name)?;
        let value = self
            .points
            .lock()
            .get(name)
            .map(|p| p.value)
            .ok_or_else(|| ImageError::UnknownPoint(name.to_string()))?;
        self.record(Event::Read(name.to_string()));
        Ok(value)
    }

    fn write_value(&self, name: &str, value: Value) -> Result<(), ImageError> {
        self.check_point(name)?;
        {
            let mut points = self.points.lock();
            let p = points
                .get_mut(name)
                .ok_or_else(|| ImageError::UnknownPoint(name.to_string()))?;
            p.value = value;
        }
        self.record(Event::Write(name.to_string(), value));
        Ok(())
    }

    fn flush(&self) -> Result<(), ImageError> {
        self.record(Event::Flush);
        Ok(())
    }

    fn default_value(&self, name: &str) -> Result<Value, ImageError> {
        self.points
            .lock()
            .get(name)
            .map(|p| p.default)
            .ok_or_else(|| ImageError::UnknownPoint(name.to_string()))
    }

    fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
    }
}

/// Poll `cond` every few milliseconds until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
