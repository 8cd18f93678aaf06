//! Inter-context channels.
//!
//! The only crossing point between the interrupt-driven link layer and task
//! context. The interrupt side inserts with `try_send` and never blocks; the
//! task side may wait. A full receive channel drops new frames — there is no
//! backpressure into the bus.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use dali_link::EdgeTrace;
use dali_protocol::Frame;

/// Outbound frames, task -> link
pub const SEND_QUEUE_DEPTH: usize = 4;
/// Transmit results, link -> task
pub const SEND_RESULT_QUEUE_DEPTH: usize = 4;
/// Received backward frames, link -> task; best effort
pub const RECEIVE_QUEUE_DEPTH: usize = 16;
/// Raw edge traces, link -> debug consumer
pub const TRACE_QUEUE_DEPTH: usize = 32;

pub type SendChannel = Channel<CriticalSectionRawMutex, Frame, SEND_QUEUE_DEPTH>;
pub type SendResultChannel = Channel<CriticalSectionRawMutex, Frame, SEND_RESULT_QUEUE_DEPTH>;
pub type ReceiveChannel = Channel<CriticalSectionRawMutex, Frame, RECEIVE_QUEUE_DEPTH>;
pub type TraceChannel = Channel<CriticalSectionRawMutex, EdgeTrace, TRACE_QUEUE_DEPTH>;

/// Frames waiting for transmission
pub static SEND_CHANNEL: SendChannel = Channel::new();

/// Completed transmissions, with their final status
pub static SEND_RESULT_CHANNEL: SendResultChannel = Channel::new();

/// Decoded backward frames, including malformed ones with error status
pub static RECEIVE_CHANNEL: ReceiveChannel = Channel::new();

/// Raw pulse traces, only fed while tracing is enabled on the driver
pub static TRACE_CHANNEL: TraceChannel = Channel::new();
