//! DALI control bus protocol definitions
//!
//! This crate defines the wire-level vocabulary shared by the link layer and
//! the master: frames, bus addresses and the IEC 62386 command opcodes.
//!
//! # Frame format
//!
//! All traffic is carried in small fixed frames:
//! ```text
//! ┌───────┬──────────────────────────────┬──────┐
//! │ START │ DATA (MSB first)             │ STOP │
//! │ 1 bit │ 16/24/32 bits fwd, 8 bits bwd│ idle │
//! └───────┴──────────────────────────────┴──────┘
//! ```
//!
//! Bits are biphase encoded on the bus; this crate only models the decoded
//! payload. Timing lives in `dali-link`.

#![no_std]
#![deny(unsafe_code)]

pub mod address;
pub mod commands;
pub mod frame;

pub use address::{Address, LongAddress, BROADCAST};
pub use commands::InitialiseScope;
pub use frame::{Frame, FrameKind, FrameStatus, MAX_FRAME_BITS, MAX_FRAME_BYTES};
