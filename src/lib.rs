//! # lifx_fleet_rs
//!
//! An async Rust engine for driving a fleet of LIFX smart bulbs over the LAN.
//!
//! This crate implements the control plane above the wire protocol: a
//! priority command queue with a single dispatcher task, per-device session
//! state machines, named follow-up timers, MAC-based discovery
//! reconciliation and a periodic status poller. The wire protocol itself
//! (binary packets, UDP sockets, per-exchange retries) is supplied by the
//! caller through the [`Transport`] trait.
//!
//! ## Quick Start
//!
//! ```ignore
//! use lifx_fleet_rs::{Command, ControllerConfig, FleetController};
//!
//! async fn run(transport: impl lifx_fleet_rs::Transport + 'static)
//! -> Result<(), lifx_fleet_rs::Error> {
//!     let controller = FleetController::new(transport, ControllerConfig::default());
//!     controller.start();
//!
//!     // Pre-register a known bulb; discovery fills in its address later.
//!     let id = controller.register_device("d0:73:d5:01:02:03");
//!     controller.turn_on(id)?;
//!     controller.set_brightness(id, 80)?;
//!
//!     controller.shutdown().await
//! }
//! ```
//!
//! ## Architecture
//!
//! - **One queue, one consumer**: every actuation flows through the
//!   [`CommandQueue`], ordered by [`Priority`] band with FIFO ties. The
//!   dispatcher is the only task that talks to the transport and the only
//!   writer of session color state.
//! - **Sessions survive outages**: a [`DeviceRegistry`] keyed by MAC keeps
//!   each bulb's [`DeviceState`] across reconnects and address changes.
//! - **Producers never block**: the poller, the timers and external callers
//!   only enqueue; all waiting happens in the dispatcher.

pub mod color;
mod command;
mod config;
mod controller;
mod discovery;
mod dispatcher;
mod errors;
mod poller;
pub mod products;
mod queue;
mod registry;
mod session;
mod timers;
mod transport;
mod types;

// Re-export public API
pub use command::{ColorMode, Command, Priority, QueuedCommand};
pub use config::ControllerConfig;
pub use controller::FleetController;
pub use discovery::DiscoveryStats;
pub use errors::Error;
pub use products::{Capabilities, ProductInfo, product_info, product_name};
pub use queue::CommandQueue;
pub use registry::DeviceRegistry;
pub use session::{DeviceSession, DeviceState, LastKnownGood, SessionStatus};
pub use timers::{TimerKind, TimerManager};
pub use transport::{DeviceHandle, DiscoveredDevice, Transport, WifiInfo};
pub use types::{Hsbk, KELVIN_MAX, KELVIN_MIN, PowerLevel, WaveformShape};
