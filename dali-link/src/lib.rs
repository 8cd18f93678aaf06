//! Bit-level physical/link layer for the DALI control bus
//!
//! The bus runs at 1200 bps, biphase encoded: a logical 1 is a low-to-high
//! transition at bit center, a logical 0 the opposite. Two interrupt sources
//! drive everything time-critical:
//!
//! - a bus-edge interrupt, fed to [`BusEngine::on_edge`]
//! - a periodic half-bit timer (416 µs), fed to [`BusEngine::on_tick`]
//!
//! The whole layer is pure logic: every entry point takes the event plus a
//! microsecond timestamp, so it can run from real interrupts or from a test
//! harness feeding synthetic time. Completed frames come back out through
//! bounded queues on the engine; nothing in this crate blocks or sleeps.
//!
//! On a single core with non-nested interrupts the engine needs no locking:
//! it is owned by the interrupt layer and mutated only through its two entry
//! points. Task-context code talks to it through queues only.

#![no_std]
#![deny(unsafe_code)]

pub mod engine;
pub mod line;
pub mod rx;
pub mod timing;
pub mod tx;

pub use engine::{BusEngine, BusState, EdgeTrace};
pub use line::{BusLine, Level, PinLine};
pub use rx::RxState;
pub use tx::TxState;
