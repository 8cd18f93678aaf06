//! Task-context master layer for the DALI control bus
//!
//! Everything above the bit-timing core lives here:
//!
//! - [`channels`]: the static bounded channels that are the only crossing
//!   point between interrupt context and task context
//! - [`driver`]: the interrupt-side pump wiring a [`dali_link::BusEngine`]
//!   to those channels
//! - [`transport`] / [`bus`]: the synchronous messaging façade
//!   (`send`, `send_double`, `query`)
//! - [`commissioning`]: random-address binary search, short-address
//!   assignment, re-addressing
//! - [`control`]: the level/scene/group/query command set
//!
//! Protocol code is generic over [`transport::Transport`], so the
//! commissioning and control layers run identically over the real channel
//! stack or a simulated gear population in tests.

#![no_std]
#![deny(unsafe_code)]

pub mod bus;
pub mod channels;
pub mod commissioning;
pub mod control;
pub mod driver;
pub mod transport;

#[cfg(test)]
mod sim;

pub use bus::DaliBus;
pub use commissioning::Commissioner;
pub use control::{Controller, DeviceInfo, DeviceSet};
pub use driver::BusDriver;
pub use transport::{CommandError, Transport};
