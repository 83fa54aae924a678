//! Lifecycle controller.
//!
//! One [`Engine`] owns the binding registry, the loop tasks and the cycle
//! loop for one process image. Lifecycle:
//!
//! ```text
//! new ──► init ──► create_binding / add_loop_task ... ──► start ──► stop
//!          │                    (Configured)              (Running)  (Stopped)
//!          └─ once per engine
//! ```
//!
//! Membership (bindings, tasks) is frozen once the loop has started.

use parking_lot::Mutex;
use pvbridge_common::config::BridgeConfig;
use pvbridge_common::consts::{MODULE_SEPARATOR, STOP_TIMEOUT_CYCLES};
use pvbridge_common::io::image::ProcessImage;
use pvbridge_common::io::name::PointName;
use pvbridge_common::variable::{
    AttributeOverrides, VariableAttributes, VariableError, VariableFramework,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::binding::{Binding, Limits};
use crate::builder::BindingBuilder;
use crate::cycle::{CycleContext, CycleJob, CycleStats, JobSettings, LoopControl, ThreadContext};
use crate::error::EngineError;
use crate::registry::BindingRegistry;
use crate::tasks::{TaskList, TaskResult};

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Configured,
    Running,
    Stopped,
}

pub struct Engine {
    io: Arc<dyn ProcessImage>,
    variables: Arc<dyn VariableFramework>,
    config: Option<BridgeConfig>,
    registry: BindingRegistry,
    tasks: Arc<Mutex<TaskList>>,
    state: EngineState,
    control: Option<Arc<LoopControl>>,
    stats: Arc<Mutex<CycleStats>>,
}

impl Engine {
    pub fn new(io: Arc<dyn ProcessImage>, variables: Arc<dyn VariableFramework>) -> Self {
        Self {
            io,
            variables,
            config: None,
            registry: BindingRegistry::new(),
            tasks: Arc::new(Mutex::new(TaskList::new())),
            state: EngineState::Configured,
            control: None,
            stats: Arc::new(Mutex::new(CycleStats::default())),
        }
    }

    /// Set cycle parameters. Allowed once.
    ///
    /// # Errors
    /// `AlreadyInitialized` on a second call, `InvalidConfig` if the cycle
    /// time is below the minimum.
    pub fn init(&mut self, config: BridgeConfig) -> Result<(), EngineError> {
        if self.config.is_some() {
            return Err(EngineError::AlreadyInitialized);
        }
        config.validate()?;
        info!(
            "Engine initialized on '{}' image: cycletime={}ms debug={} auto_prefix={} cleanup={}",
            self.io.name(),
            config.cycletime_ms,
            config.debug,
            config.auto_prefix,
            config.cleanup
        );
        self.config = Some(config);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    pub fn config(&self) -> Option<&BridgeConfig> {
        self.config.as_ref()
    }

    /// Current state. A loop that ended on its own (hardware exit request)
    /// reads as `Stopped`.
    pub fn state(&self) -> EngineState {
        match (&self.state, &self.control) {
            (EngineState::Running, Some(control)) if control.is_finished() => {
                EngineState::Stopped
            }
            (state, _) => *state,
        }
    }

    fn configurable(&self) -> Result<BridgeConfig, EngineError> {
        let config = self.config.ok_or(EngineError::NotInitialized)?;
        if self.state != EngineState::Configured {
            return Err(EngineError::AlreadyStarted);
        }
        Ok(config)
    }

    // ─── Bindings ───────────────────────────────────────────────────

    /// Fluent alternative to [`create_binding`](Self::create_binding).
    pub fn builder(&mut self, hardware_name: &str) -> BindingBuilder<'_> {
        BindingBuilder::new(self, hardware_name)
    }

    /// Bind a hardware point to a new variable.
    ///
    /// The variable kind comes from the point name; its name is
    /// `exposed_name` or the hardware name, prefixed with the point's module
    /// in auto-prefix mode. It starts at the point's current value.
    ///
    /// Output limits not given in `overrides` fall back, per bound, to the
    /// image's [`default_limits`](ProcessImage::default_limits).
    ///
    /// # Errors
    /// `NotInitialized`, `AlreadyStarted`, `InvalidName`, `UnknownName`,
    /// `DuplicateBinding`, `DuplicateVariable`, `InvalidLimit`, or a
    /// hardware/variable framework error. The registry is unchanged on error.
    pub fn create_binding(
        &mut self,
        hardware_name: &str,
        exposed_name: Option<&str>,
        overrides: AttributeOverrides,
    ) -> Result<Binding, EngineError> {
        let config = self.configurable()?;
        let point = PointName::resolve(hardware_name)?;
        let hw_point = self
            .io
            .lookup(hardware_name)
            .ok_or_else(|| EngineError::UnknownName(hardware_name.to_string()))?;
        if self.registry.contains(hardware_name) {
            return Err(EngineError::DuplicateBinding(hardware_name.to_string()));
        }

        let kind = point.variable_kind();
        if overrides.has_limits() && !kind.is_output() {
            return Err(EngineError::InvalidLimit {
                name: hardware_name.to_string(),
                reason: "limits apply to outputs only".to_string(),
            });
        }
        let mut overrides = overrides;
        if kind.is_output() {
            if let Some((low, high)) = self.io.default_limits(hardware_name) {
                overrides.low = overrides.low.or(low);
                overrides.high = overrides.high.or(high);
            }
        }
        let limits = Limits {
            low: overrides.low,
            high: overrides.high,
        };
        limits.validate(hardware_name)?;

        let base = exposed_name.unwrap_or(hardware_name);
        let exposed = if config.auto_prefix {
            let module = self
                .io
                .logical_module_name(hardware_name)
                .unwrap_or(hw_point.module);
            format!("{module}{MODULE_SEPARATOR}{base}")
        } else {
            base.to_string()
        };
        if self.registry.contains_exposed(&exposed) {
            return Err(EngineError::DuplicateVariable(exposed));
        }

        let initial = self.io.read_value(hardware_name)?.coerce(kind.value_type());
        let attributes = VariableAttributes::defaults_for(kind)
            .merge(&overrides)
            .with_initial(initial);
        let variable = self
            .variables
            .create_variable(kind, &exposed, attributes)
            .map_err(|e| match e {
                VariableError::Duplicate(name) => EngineError::DuplicateVariable(name),
                other => EngineError::Variable(other),
            })?;

        let binding = Binding::new(
            hardware_name.to_string(),
            exposed,
            point,
            limits,
            initial,
            variable,
        );
        self.registry.insert(binding.clone())?;
        debug!(
            "Bound {} -> {} ({}, initial {})",
            binding.hardware_name(),
            binding.exposed_name(),
            kind,
            initial
        );
        Ok(binding)
    }

    /// Drop a binding before start. Returns `false` if the name is not bound.
    pub fn remove_binding(&mut self, hardware_name: &str) -> Result<bool, EngineError> {
        self.configurable()?;
        let Some(binding) = self.registry.remove(hardware_name) else {
            return Ok(false);
        };
        self.variables.remove_variable(binding.exposed_name());
        debug!("Removed binding {}", hardware_name);
        Ok(true)
    }

    pub fn binding(&self, hardware_name: &str) -> Option<Binding> {
        self.registry.get(hardware_name).cloned()
    }

    /// All bindings in registration order.
    pub fn bindings(&self) -> Vec<Binding> {
        self.registry.iter().cloned().collect()
    }

    pub fn binding_count(&self) -> usize {
        self.registry.len()
    }

    // ─── Loop tasks ─────────────────────────────────────────────────

    /// Register a named task to run every cycle after the output phase.
    ///
    /// # Errors
    /// `NotInitialized`, `AlreadyStarted`, `DuplicateTask`.
    pub fn add_loop_task<F>(&mut self, name: impl Into<String>, task: F) -> Result<(), EngineError>
    where
        F: FnMut() -> TaskResult + Send + 'static,
    {
        self.configurable()?;
        let name = name.into();
        self.tasks.lock().push(name.clone(), task)?;
        debug!("Loop task '{name}' registered");
        Ok(())
    }

    pub fn remove_loop_task(&mut self, name: &str) -> Result<bool, EngineError> {
        self.configurable()?;
        Ok(self.tasks.lock().remove(name))
    }

    pub fn clear_loop_tasks(&mut self) -> Result<(), EngineError> {
        self.configurable()?;
        self.tasks.lock().clear();
        Ok(())
    }

    pub fn loop_task_names(&self) -> Vec<String> {
        self.tasks.lock().names()
    }

    pub fn loop_task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    // ─── Run control ────────────────────────────────────────────────

    /// Start the cycle loop on `context`, or on a dedicated thread if `None`.
    ///
    /// # Errors
    /// `NotInitialized`, `AlreadyStarted` (also after stop), `Launch`.
    pub fn start(&mut self, context: Option<&dyn CycleContext>) -> Result<(), EngineError> {
        let config = self.configurable()?;

        let control = Arc::new(LoopControl::new());
        let inputs = self.registry.inputs();
        let outputs = self.registry.outputs();
        info!(
            "Starting cycle loop: {} inputs, {} outputs, {} tasks, period {}ms",
            inputs.len(),
            outputs.len(),
            self.loop_task_count(),
            config.cycletime_ms
        );

        let job = CycleJob::new(
            Arc::clone(&self.io),
            inputs,
            outputs,
            Arc::clone(&self.tasks),
            JobSettings {
                period: config.cycle_time(),
                debug: config.debug,
                cleanup: config.cleanup,
            },
            Arc::clone(&control),
            Arc::clone(&self.stats),
        );

        match context {
            Some(ctx) => ctx.launch(job)?,
            None => ThreadContext::default().launch(job)?,
        }

        self.control = Some(control);
        self.state = EngineState::Running;
        Ok(())
    }

    /// Stop the loop and wait for it to finish (cleanup included), at most
    /// ten cycle periods. Returns `false` if the loop did not finish in time.
    /// A no-op unless running.
    pub fn stop(&mut self) -> bool {
        if self.state != EngineState::Running {
            return true;
        }
        self.state = EngineState::Stopped;

        let (Some(control), Some(config)) = (&self.control, &self.config) else {
            return true;
        };
        control.request_stop();
        let timeout = config.cycle_time() * STOP_TIMEOUT_CYCLES;
        if control.wait_finished(timeout) {
            info!("Engine stopped");
            true
        } else {
            warn!(
                "Cycle loop did not finish within {}ms",
                timeout.as_millis()
            );
            false
        }
    }

    /// Snapshot of the loop statistics.
    pub fn stats(&self) -> CycleStats {
        self.stats.lock().clone()
    }

    /// Direct access to the process image, for loop tasks that need points
    /// without a binding.
    pub fn underlying_io(&self) -> Arc<dyn ProcessImage> {
        Arc::clone(&self.io)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}
