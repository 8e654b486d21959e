//! The single command dispatcher: dequeues, executes against the transport,
//! updates the registry and arms follow-up timers.
//!
//! There is exactly one dispatcher task per controller. It is the only
//! consumer of the command queue and the only writer of session color/power
//! state, which is what makes the per-device fields lock-light: producers
//! (poller, timers, external callers) only ever enqueue.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::command::{ColorMode, Command, Priority, QueuedCommand};
use crate::config::ControllerConfig;
use crate::discovery;
use crate::errors::Error;
use crate::queue::CommandQueue;
use crate::registry::DeviceRegistry;
use crate::timers::TimerManager;
use crate::transport::{DeviceHandle, Transport};
use crate::types::{Hsbk, PowerLevel};
use crate::color;

type Result<T> = std::result::Result<T, Error>;

pub(crate) struct Dispatcher<T: Transport> {
    transport: Arc<T>,
    queue: Arc<CommandQueue>,
    registry: Arc<DeviceRegistry>,
    timers: Arc<TimerManager>,
    config: Arc<Mutex<ControllerConfig>>,
    running: Arc<AtomicBool>,
}

impl<T: Transport> Dispatcher<T> {
    pub(crate) fn new(
        transport: Arc<T>,
        queue: Arc<CommandQueue>,
        registry: Arc<DeviceRegistry>,
        timers: Arc<TimerManager>,
        config: Arc<Mutex<ControllerConfig>>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Dispatcher {
            transport,
            queue,
            registry,
            timers,
            config,
            running,
        }
    }

    fn config(&self) -> ControllerConfig {
        self.config.lock().unwrap().clone()
    }

    /// Worker loop. Processes one entry fully before the next; the only
    /// suspension points are the timed dequeue and the transport exchanges.
    pub(crate) async fn run(self) {
        info!("dispatcher started");
        loop {
            let wait = self.config().dequeue_timeout;
            match self.queue.pop(wait).await {
                None => {
                    if !self.running.load(Ordering::SeqCst) {
                        break;
                    }
                }
                Some(entry) => {
                    if entry.command == Command::StopThread {
                        info!("dispatcher observed stop sentinel");
                        break;
                    }
                    self.handle(entry).await;
                }
            }
        }
        info!("dispatcher stopped");
    }

    /// Execute one dequeued entry. Never returns an error: every failure is
    /// absorbed here so a single bad entry cannot halt the worker.
    pub(crate) async fn handle(&self, entry: QueuedCommand) {
        match &entry.command {
            Command::Discovery { .. } => self.run_discovery().await,
            Command::StopThread => {}
            _ => {
                let Some(id) = entry.device else {
                    warn!("{} entry without a device id, ignoring", entry.command.name());
                    return;
                };
                self.handle_device_command(id, entry.command).await;
            }
        }
    }

    async fn handle_device_command(&self, id: Uuid, command: Command) {
        let gated = self.registry.with_session(id, |session| {
            if !session.enabled {
                session.publish_not_enabled();
                return Err(Error::Disabled(session.id));
            }
            match session.handle() {
                Some(handle) => Ok(handle),
                None => {
                    session.mark_no_ack();
                    Err(Error::Unresolved {
                        mac: session.mac.clone(),
                    })
                }
            }
        });

        let handle = match gated {
            None => {
                warn!("{} for unknown device {id}, ignoring", command.name());
                return;
            }
            Some(Err(err)) => {
                debug!("{} skipped: {err}", command.name());
                return;
            }
            Some(Ok(handle)) => handle,
        };

        debug!("executing {} for {}", command.name(), handle.mac);
        if let Err(err) = self.execute(id, &handle, command).await {
            if err.is_transport() {
                self.registry.with_session(id, |s| s.communication_lost());
                warn!("device {} lost: {err}", handle.mac);
            } else {
                warn!("command failed for {}: {err}", handle.mac);
            }
        }
    }

    async fn execute(&self, id: Uuid, handle: &DeviceHandle, command: Command) -> Result<()> {
        match command {
            Command::On => {
                let duration = self.config().duration_on;
                self.set_power_with_refresh(id, handle, PowerLevel::On, duration)
                    .await
            }
            Command::Off => {
                let duration = self.config().duration_off;
                self.set_power_with_refresh(id, handle, PowerLevel::Off, duration)
                    .await
            }
            Command::ImmediateOn => {
                self.set_power_with_refresh(id, handle, PowerLevel::On, Duration::ZERO)
                    .await
            }
            Command::Brightness { percent } => self.apply_brightness(handle, percent).await,
            Command::Dim { percent } => self.apply_relative(handle, -i32::from(percent)).await,
            Command::Brighten { percent } => self.apply_relative(handle, i32::from(percent)).await,
            Command::White { percent, kelvin } => {
                let target = Hsbk::white(color::percent_to_raw(percent), kelvin);
                self.set_color_sequenced(handle, target).await
            }
            Command::Color {
                hue,
                saturation,
                brightness,
            } => {
                let (_, current) = self.transport.get_color(handle).await?;
                let target = Hsbk {
                    hue,
                    saturation,
                    brightness,
                    kelvin: current.kelvin,
                };
                self.set_color_sequenced(handle, target).await
            }
            Command::Standard {
                turn_on_if_off,
                mode,
                hue,
                saturation,
                brightness,
                kelvin,
                duration,
            } => {
                let (power, current) = self.transport.get_color(handle).await?;
                let target = Hsbk {
                    hue: hue.unwrap_or(current.hue),
                    saturation: match mode {
                        ColorMode::White => 0,
                        ColorMode::Color => saturation.unwrap_or(current.saturation),
                    },
                    brightness: brightness.unwrap_or(current.brightness),
                    kelvin: kelvin.unwrap_or(current.kelvin),
                };
                let duration = duration.unwrap_or(Duration::ZERO);

                if PowerLevel::from_raw(power).is_on() {
                    self.transport
                        .set_color(handle, target, duration, false)
                        .await
                } else if turn_on_if_off {
                    // Write the color invisibly first, then animate power.
                    self.transport
                        .set_color(handle, target, Duration::ZERO, false)
                        .await?;
                    self.transport
                        .set_power(handle, PowerLevel::On.raw(), duration)
                        .await
                } else {
                    // No point animating while off.
                    self.transport
                        .set_color(handle, target, Duration::ZERO, false)
                        .await
                }
            }
            Command::Waveform {
                transient,
                hue,
                saturation,
                brightness,
                kelvin,
                period,
                cycles,
                duty_cycle,
                shape,
            } => {
                let (power, current) = self.transport.get_color(handle).await?;
                let was_off = !PowerLevel::from_raw(power).is_on();
                if was_off {
                    self.transport
                        .set_power(handle, PowerLevel::On.raw(), Duration::ZERO)
                        .await?;
                }
                let target = Hsbk {
                    hue: hue.unwrap_or(current.hue),
                    saturation: saturation.unwrap_or(current.saturation),
                    brightness: brightness.unwrap_or(current.brightness),
                    kelvin: kelvin.unwrap_or(current.kelvin),
                };
                self.transport
                    .set_waveform(handle, transient, target, period, cycles, duty_cycle, shape)
                    .await?;
                if was_off {
                    // Only effects started from an off state auto-off.
                    let total = Duration::from_secs_f64(period.as_secs_f64() * f64::from(cycles));
                    self.timers.start_waveform_off(id, total);
                }
                Ok(())
            }
            Command::Status => self.refresh_status(id, handle).await,
            Command::SetLabel { label } => {
                self.transport.set_label(handle, &label).await?;
                self.registry
                    .with_session(id, |s| s.label = Some(label.clone()));
                Ok(())
            }
            Command::InfraredOn => self.transport.set_infrared(handle, u16::MAX).await,
            Command::InfraredOff => self.transport.set_infrared(handle, 0).await,
            Command::InfraredSet { percent } => {
                self.transport
                    .set_infrared(handle, color::percent_to_raw(percent))
                    .await
            }
            Command::RefreshVersion => {
                let product_id = self.transport.get_product_id(handle).await?;
                let infrared_capable = self
                    .registry
                    .with_session(id, |s| {
                        s.apply_product(product_id);
                        s.supports_infrared()
                    })
                    .unwrap_or(false);
                if infrared_capable {
                    let level = self.transport.get_infrared(handle).await?;
                    self.registry.with_session(id, |s| s.infrared = Some(level));
                }
                Ok(())
            }
            Command::RefreshFirmware => {
                let version = self.transport.get_firmware_version(handle).await?;
                self.registry
                    .with_session(id, |s| s.firmware_version = Some(version));
                Ok(())
            }
            Command::RefreshWifi => {
                let wifi = self.transport.get_wifi_info(handle).await?;
                self.registry.with_session(id, |s| s.wifi = Some(wifi));
                Ok(())
            }
            Command::Discovery { .. } | Command::StopThread => Ok(()),
        }
    }

    /// Power write plus the repeating STATUS refresh that re-reads state
    /// until the transition has completed.
    async fn set_power_with_refresh(
        &self,
        id: Uuid,
        handle: &DeviceHandle,
        level: PowerLevel,
        duration: Duration,
    ) -> Result<()> {
        self.transport
            .set_power(handle, level.raw(), duration)
            .await?;
        let seconds = duration.as_secs_f64().ceil() as u64;
        if seconds == 0 {
            // Immediate transition; one prompt re-read instead of a countdown.
            self.queue.push(QueuedCommand::with_priority(
                Priority::HighStatus,
                Some(id),
                Command::Status,
            ));
        } else {
            self.timers.start_status(id, seconds);
        }
        Ok(())
    }

    /// Absolute perceptual brightness, 0-100%.
    async fn apply_brightness(&self, handle: &DeviceHandle, percent: u8) -> Result<()> {
        let (power, current) = self.transport.get_color(handle).await?;
        let target = brightness_target(current, color::percent_to_raw(percent));

        if !PowerLevel::from_raw(power).is_on() && percent > 0 {
            // Going from off to lit: zero the brightness invisibly, power on,
            // then apply the target, so the old level never flashes.
            self.transport
                .set_color(handle, target.with_brightness(0), Duration::ZERO, false)
                .await?;
            self.transport
                .set_power(handle, PowerLevel::On.raw(), Duration::ZERO)
                .await?;
        }
        self.transport
            .set_color(handle, target, Duration::ZERO, false)
            .await
    }

    /// Relative perceptual change (DIM/BRIGHTEN), coalescable at the
    /// transport layer.
    async fn apply_relative(&self, handle: &DeviceHandle, delta_percent: i32) -> Result<()> {
        let (power, current) = self.transport.get_color(handle).await?;
        if !PowerLevel::from_raw(power).is_on() {
            debug!("relative brightness ignored while off");
            return Ok(());
        }
        let position = if current.is_colored() {
            color::remap_position(current.saturation, current.brightness)
        } else {
            current.brightness
        };
        let delta_raw = delta_percent * 65535 / 100;
        let new_position = (i32::from(position) + delta_raw).clamp(0, 65535) as u16;
        let target = brightness_target(current, new_position);
        self.transport
            .set_color(handle, target, Duration::ZERO, true)
            .await
    }

    /// Color write with the off-to-on sequencing of WHITE/COLOR commands.
    async fn set_color_sequenced(&self, handle: &DeviceHandle, target: Hsbk) -> Result<()> {
        let (power, _) = self.transport.get_color(handle).await?;
        if !PowerLevel::from_raw(power).is_on() && self.config().auto_power_on {
            self.transport
                .set_color(handle, target.with_brightness(0), Duration::ZERO, false)
                .await?;
            self.transport
                .set_power(handle, PowerLevel::On.raw(), Duration::ZERO)
                .await?;
        }
        self.transport
            .set_color(handle, target, Duration::ZERO, false)
            .await
    }

    async fn refresh_status(&self, id: Uuid, handle: &DeviceHandle) -> Result<()> {
        let (power, hsbk) = self.transport.get_color(handle).await?;
        let generation = self.registry.poll_generation();
        let was_disconnected = self
            .registry
            .with_session(id, |session| {
                let was_disconnected = !session.connected;
                session.update_status_from_msg(power, hsbk);
                session.last_response_poll = generation;
                was_disconnected
            })
            .unwrap_or(false);

        if was_disconnected {
            debug!("device {} answered after disconnect, refreshing metadata", handle.mac);
            discovery::enqueue_refresh_cascade(&self.queue, id);
        }
        Ok(())
    }

    async fn run_discovery(&self) {
        debug!("running discovery sweep");
        match self.transport.discover().await {
            Ok(devices) => {
                discovery::reconcile(&self.registry, &self.queue, &devices);
            }
            Err(err) => warn!("discovery sweep failed: {err}"),
        }
    }
}

/// Compose the color write for a raw perceptual brightness position.
///
/// Colored devices ride the combined saturation+brightness curve; white
/// devices set brightness directly.
fn brightness_target(current: Hsbk, position: u16) -> Hsbk {
    if current.is_colored() {
        let (saturation, brightness) = color::remap_brightness(position);
        Hsbk {
            hue: current.hue,
            saturation,
            brightness,
            kelvin: current.kelvin,
        }
    } else {
        current.with_brightness(position)
    }
}
