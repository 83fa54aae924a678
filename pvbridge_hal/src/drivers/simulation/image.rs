//! In-memory process image.
//!
//! Each point carries two values:
//! - `field`: what the controller holds (sensor reading or driven output)
//! - `snapshot`: the copy the bridge reads and stages writes into
//!
//! `refresh()` copies field → snapshot for inputs, `flush()` copies
//! snapshot → field for outputs. Tests and the demo binary play the field
//! side through [`SimulatedImage::set_input`] and
//! [`SimulatedImage::output_value`].

use parking_lot::RwLock;
use pvbridge_common::io::config::ImageConfig;
use pvbridge_common::io::image::{HardwarePoint, ImageError, ProcessImage};
use pvbridge_common::io::name::{Direction, PointName};
use pvbridge_common::io::value::{Value, ValueType};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info, trace};

#[derive(Debug, Clone)]
struct SimPoint {
    point: HardwarePoint,
    writable: bool,
    value_type: ValueType,
    default: Value,
    limits: Option<(Option<f64>, Option<f64>)>,
    field: Value,
    snapshot: Value,
}

pub struct SimulatedImage {
    points: RwLock<Vec<SimPoint>>,
    index: HashMap<String, usize>,
    offline: AtomicBool,
    exit: AtomicBool,
    refresh_count: AtomicU64,
    flush_count: AtomicU64,
}

impl SimulatedImage {
    /// Build the image from a point list.
    ///
    /// # Errors
    /// `ImageError::ConfigError` if the list fails validation.
    pub fn new(config: &ImageConfig) -> Result<Self, ImageError> {
        config
            .validate()
            .map_err(|e| ImageError::ConfigError(e.to_string()))?;

        let mut points = Vec::with_capacity(config.points.len());
        let mut index = HashMap::with_capacity(config.points.len());

        for (address, pc) in config.points.iter().enumerate() {
            // Free-form names (status LEDs, diagnostic words) stay read-only.
            let writable = pc
                .name
                .parse::<PointName>()
                .is_ok_and(|p| p.direction == Direction::Output);
            let initial = pc.initial_value();
            points.push(SimPoint {
                point: HardwarePoint {
                    name: pc.name.clone(),
                    module: pc.module_name().to_string(),
                    address,
                },
                writable,
                value_type: pc.value_type(),
                default: pc.default_value(),
                limits: pc.drive_limits(),
                field: initial,
                snapshot: initial,
            });
            index.insert(pc.name.clone(), address);
        }

        info!("Simulated process image: {} points", points.len());

        Ok(Self {
            points: RwLock::new(points),
            index,
            offline: AtomicBool::new(false),
            exit: AtomicBool::new(false),
            refresh_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        })
    }

    fn slot(&self, name: &str) -> Result<usize, ImageError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ImageError::UnknownPoint(name.to_string()))
    }

    // ─── Field side ─────────────────────────────────────────────────

    /// Change what the controller reads on an input. Visible to the bridge
    /// after the next `refresh()`.
    pub fn set_input(&self, name: &str, value: Value) -> Result<(), ImageError> {
        let slot = self.slot(name)?;
        let mut points = self.points.write();
        let p = &mut points[slot];
        p.field = value.coerce(p.value_type);
        trace!("field {} = {}", name, p.field);
        Ok(())
    }

    /// Value the controller currently drives on a point.
    pub fn output_value(&self, name: &str) -> Result<Value, ImageError> {
        let slot = self.slot(name)?;
        Ok(self.points.read()[slot].field)
    }

    /// Simulate loss of the controller link: `refresh()` and `flush()` fail
    /// while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
        debug!("Simulated image offline = {offline}");
    }

    /// Ask the cycle loop to stop at the next boundary.
    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::Release);
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::Relaxed)
    }

    pub fn flush_count(&self) -> u64 {
        self.flush_count.load(Ordering::Relaxed)
    }

    fn check_online(&self) -> Result<(), ImageError> {
        if self.offline.load(Ordering::Acquire) {
            return Err(ImageError::CommunicationError(
                "simulated controller offline".to_string(),
            ));
        }
        Ok(())
    }
}

impl ProcessImage for SimulatedImage {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn lookup(&self, name: &str) -> Option<HardwarePoint> {
        let slot = *self.index.get(name)?;
        Some(self.points.read()[slot].point.clone())
    }

    fn refresh(&self) -> Result<(), ImageError> {
        self.check_online()?;
        let mut points = self.points.write();
        for p in points.iter_mut().filter(|p| !p.writable) {
            p.snapshot = p.field;
        }
        self.refresh_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn read_value(&self, name: &str) -> Result<Value, ImageError> {
        let slot = self.slot(name)?;
        Ok(self.points.read()[slot].snapshot)
    }

    fn write_value(&self, name: &str, value: Value) -> Result<(), ImageError> {
        let slot = self.slot(name)?;
        let mut points = self.points.write();
        let p = &mut points[slot];
        if !p.writable {
            return Err(ImageError::ReadOnly(name.to_string()));
        }
        p.snapshot = value.coerce(p.value_type);
        Ok(())
    }

    fn flush(&self) -> Result<(), ImageError> {
        self.check_online()?;
        let mut points = self.points.write();
        for p in points.iter_mut().filter(|p| p.writable) {
            p.field = p.snapshot;
        }
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn default_value(&self, name: &str) -> Result<Value, ImageError> {
        let slot = self.slot(name)?;
        Ok(self.points.read()[slot].default)
    }

    fn default_limits(&self, name: &str) -> Option<(Option<f64>, Option<f64>)> {
        let slot = *self.index.get(name)?;
        self.points.read()[slot].limits
    }

    fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::Acquire)
    }
}
