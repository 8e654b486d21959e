//! Fleet controller: the public facade over the queue, registry, timers,
//! dispatcher and poller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{info, warn};
use serde_json::{Value, json};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::command::{Command, QueuedCommand};
use crate::config::ControllerConfig;
use crate::dispatcher::Dispatcher;
use crate::errors::Error;
use crate::poller::Poller;
use crate::queue::CommandQueue;
use crate::registry::DeviceRegistry;
use crate::session::DeviceState;
use crate::timers::TimerManager;
use crate::transport::Transport;
use crate::types::{KELVIN_MAX, KELVIN_MIN};

type Result<T> = std::result::Result<T, Error>;

/// Drives a fleet of bulbs through a transport adapter.
///
/// All external command requests are validated at this boundary and then
/// serialized through the priority queue; the dispatcher task is the only
/// component that talks to the transport or mutates device color state.
///
/// # Example
///
/// ```ignore
/// let controller = FleetController::new(transport, ControllerConfig::default());
/// controller.start();
/// let id = controller.register_device("d0:73:d5:01:02:03");
/// controller.send(id, Command::On)?;
/// // ...
/// controller.shutdown().await?;
/// ```
pub struct FleetController<T: Transport> {
    transport: Arc<T>,
    queue: Arc<CommandQueue>,
    registry: Arc<DeviceRegistry>,
    timers: Arc<TimerManager>,
    config: Arc<Mutex<ControllerConfig>>,
    running: Arc<AtomicBool>,
    poller_wake: Arc<Notify>,
    dispatcher_task: Mutex<Option<JoinHandle<()>>>,
    poller_task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Transport + 'static> FleetController<T> {
    pub fn new(transport: T, config: ControllerConfig) -> Self {
        let queue = Arc::new(CommandQueue::new());
        FleetController {
            transport: Arc::new(transport),
            timers: Arc::new(TimerManager::new(Arc::clone(&queue))),
            queue,
            registry: Arc::new(DeviceRegistry::new()),
            config: Arc::new(Mutex::new(config)),
            running: Arc::new(AtomicBool::new(false)),
            poller_wake: Arc::new(Notify::new()),
            dispatcher_task: Mutex::new(None),
            poller_task: Mutex::new(None),
        }
    }

    /// Spawn the dispatcher and poller tasks and seed the initial
    /// discovery sweep. Idempotent.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("starting fleet controller");

        let dispatcher = Dispatcher::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.queue),
            Arc::clone(&self.registry),
            Arc::clone(&self.timers),
            Arc::clone(&self.config),
            Arc::clone(&self.running),
        );
        *self.dispatcher_task.lock().unwrap() = Some(tokio::spawn(dispatcher.run()));

        let poller = Poller::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.registry),
            Arc::clone(&self.config),
            Arc::clone(&self.running),
            Arc::clone(&self.poller_wake),
        );
        *self.poller_task.lock().unwrap() = Some(tokio::spawn(poller.run()));

        self.queue
            .push(QueuedCommand::new(None, Command::Discovery { initial: true }));
    }

    /// Stop both tasks: cancel outstanding timers so nothing re-enqueues,
    /// preempt all queued work with the stop sentinel, and wait (bounded)
    /// for the dispatcher to drain.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        info!("shutting down fleet controller");
        self.timers.cancel_all();
        self.queue.push(QueuedCommand::new(None, Command::StopThread));
        self.poller_wake.notify_one();

        let join_timeout = self.config.lock().unwrap().shutdown_timeout;
        if let Some(task) = self.poller_task.lock().unwrap().take() {
            task.abort();
        }
        let Some(task) = self.dispatcher_task.lock().unwrap().take() else {
            return Ok(());
        };
        match tokio::time::timeout(join_timeout, task).await {
            Ok(_) => Ok(()),
            Err(_) => {
                warn!("dispatcher did not observe stop sentinel in time");
                Err(Error::ShutdownTimeout(join_timeout))
            }
        }
    }

    /// Pre-register a device from persisted configuration. The session is
    /// created immediately; commands short-circuit with no-ack until
    /// discovery maps the MAC to a network location.
    pub fn register_device(&self, mac: &str) -> Uuid {
        self.registry.register(mac)
    }

    /// Enable or disable a device. Disabling is soft: the session stays,
    /// commands short-circuit with a neutral published state.
    pub fn set_device_enabled(&self, id: Uuid, enabled: bool) -> Result<()> {
        if self.registry.set_enabled(id, enabled) {
            Ok(())
        } else {
            Err(Error::UnknownDevice(id))
        }
    }

    /// Published state snapshot for one device.
    pub fn device_state(&self, id: Uuid) -> Option<DeviceState> {
        self.registry.state(id)
    }

    pub fn device_ids(&self) -> Vec<Uuid> {
        self.registry.ids()
    }

    /// Validate and enqueue a device command.
    pub fn send(&self, id: Uuid, command: Command) -> Result<()> {
        if !command.is_device_scoped() {
            return Err(Error::invalid_parameter("command", command.name()));
        }
        validate(&command)?;
        if self.registry.with_session(id, |_| ()).is_none() {
            return Err(Error::UnknownDevice(id));
        }
        self.queue.push(QueuedCommand::new(Some(id), command));
        Ok(())
    }

    pub fn turn_on(&self, id: Uuid) -> Result<()> {
        self.send(id, Command::On)
    }

    pub fn turn_off(&self, id: Uuid) -> Result<()> {
        self.send(id, Command::Off)
    }

    pub fn set_brightness(&self, id: Uuid, percent: u8) -> Result<()> {
        self.send(id, Command::Brightness { percent })
    }

    pub fn set_white(&self, id: Uuid, percent: u8, kelvin: u16) -> Result<()> {
        self.send(id, Command::White { percent, kelvin })
    }

    pub fn request_status(&self, id: Uuid) -> Result<()> {
        self.send(id, Command::Status)
    }

    /// Trigger an on-demand discovery sweep.
    pub fn request_discovery(&self) {
        self.queue
            .push(QueuedCommand::new(None, Command::Discovery { initial: false }));
    }

    /// Change the poll interval at runtime. The poller is woken so the new
    /// cadence takes effect immediately.
    pub fn set_poll_interval(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(Error::invalid_parameter("poll_interval", "0"));
        }
        self.config.lock().unwrap().poll_interval = interval;
        self.poller_wake.notify_one();
        Ok(())
    }

    /// Diagnostics dump: per-device published state plus engine counters.
    pub fn diagnostics(&self) -> Value {
        let devices: Vec<Value> = self
            .device_ids()
            .into_iter()
            .filter_map(|id| {
                self.registry.state(id).map(|state| {
                    json!({
                        "id": id,
                        "state": serde_json::to_value(&state).unwrap_or(Value::Null),
                    })
                })
            })
            .collect();

        json!({
            "running": self.running.load(Ordering::SeqCst),
            "devices": devices,
            "queue_depth": self.queue.len(),
            "pending_timers": self.timers.pending(),
            "discovery_rounds": self.registry.discovery_rounds(),
            "poll_generation": self.registry.poll_generation(),
        })
    }
}

impl<T: Transport> Drop for FleetController<T> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.timers.cancel_all();
        for task in [
            self.dispatcher_task.lock().unwrap().take(),
            self.poller_task.lock().unwrap().take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
    }
}

/// Boundary validation: malformed parameters are rejected before enqueue so
/// the dispatcher can assume validated input.
fn validate(command: &Command) -> Result<()> {
    match command {
        Command::Brightness { percent }
        | Command::Dim { percent }
        | Command::Brighten { percent }
        | Command::InfraredSet { percent } => percent_in_range(*percent),
        Command::White { percent, kelvin } => {
            percent_in_range(*percent)?;
            kelvin_in_range(*kelvin)
        }
        Command::Standard { kelvin, .. } => match kelvin {
            Some(k) => kelvin_in_range(*k),
            None => Ok(()),
        },
        Command::Waveform {
            period,
            cycles,
            duty_cycle,
            kelvin,
            ..
        } => {
            if period.is_zero() {
                return Err(Error::invalid_parameter("period", "0"));
            }
            if !cycles.is_finite() || *cycles <= 0.0 {
                return Err(Error::invalid_parameter("cycles", cycles));
            }
            if !(0.0..=1.0).contains(duty_cycle) {
                return Err(Error::invalid_parameter("duty_cycle", duty_cycle));
            }
            match kelvin {
                Some(k) => kelvin_in_range(*k),
                None => Ok(()),
            }
        }
        Command::SetLabel { label } => {
            // The wire format caps labels at 32 bytes.
            if label.is_empty() || label.len() > 32 {
                return Err(Error::invalid_parameter("label", label));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn percent_in_range(percent: u8) -> Result<()> {
    if percent > 100 {
        return Err(Error::invalid_parameter("percent", percent));
    }
    Ok(())
}

fn kelvin_in_range(kelvin: u16) -> Result<()> {
    if !(KELVIN_MIN..=KELVIN_MAX).contains(&kelvin) {
        return Err(Error::invalid_parameter("kelvin", kelvin));
    }
    Ok(())
}
