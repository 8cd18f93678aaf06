//! Receive bit-timing state machine.
//!
//! Driven by bus-edge events. Each edge carries the new bus level and the
//! width of the pulse it terminates; the machine classifies that width as a
//! half bit (transition at bit center, two edges per bit) or a full bit
//! (transition only at the bit boundary) and reassembles the biphase stream
//! MSB first. A low-to-high transition inside a bit contributes a 1; the
//! buffer starts zeroed, so 0 bits only advance the counter.
//!
//! End of frame is not an edge: the arbitration engine watches for the bus
//! staying idle past the stop condition and calls [`RxMachine::finish`].

use dali_protocol::{Frame, FrameStatus, MAX_FRAME_BITS};

use crate::line::Level;
use crate::timing;

/// Receive machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxState {
    /// Nothing being received
    Idle,
    /// Falling edge seen, waiting for the start bit's rising edge
    Start,
    /// Collecting data bits
    Data,
    /// Bit capacity reached, waiting for the bus to go idle
    Stop,
    /// Frame closed out
    End,
    /// Fault recorded, waiting for the bus to go idle before delivery
    Error,
}

impl Default for RxState {
    fn default() -> Self {
        RxState::Idle
    }
}

/// Outcome of one edge, reported back to the arbitration engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RxEdge {
    /// Edge consumed
    Accepted,
    /// The start bit itself was malformed; abandon via the bus error path
    StartViolation,
    /// Mid-frame fault; the partial frame is delivered once the bus idles
    Fault,
}

/// The receive machine. Holds the frame being assembled by value.
#[derive(Debug, Default)]
pub struct RxMachine {
    state: RxState,
    half_bits: u8,
    bits: u8,
    frame: Frame,
}

impl RxMachine {
    /// Current state
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Bits collected so far
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Start receiving. `gap_us` is the idle time before the falling edge
    /// that triggered this; it is recorded on the frame (in ms, capped) for
    /// reply-window diagnostics.
    pub(crate) fn begin(&mut self, gap_us: u64) {
        let gap_ms = (gap_us / 1_000).min(255) as u8;
        self.frame = Frame::backward(gap_ms);
        self.state = RxState::Start;
        self.half_bits = 0;
        self.bits = 0;
    }

    /// Process one edge: the new level and the width of the pulse it ended.
    /// `previous` is the level before this edge.
    pub(crate) fn on_edge(&mut self, level: Level, previous: Level, width_us: u64) -> RxEdge {
        match self.state {
            RxState::Start => {
                // The start bit is one driven half bit, ended by a rising edge
                if level.is_high()
                    && timing::within(
                        width_us,
                        timing::RX_HALF_BIT_MIN_US,
                        timing::RX_HALF_BIT_MAX_US,
                    )
                {
                    self.state = RxState::Data;
                    self.half_bits += 1;
                    RxEdge::Accepted
                } else {
                    self.frame.status = FrameStatus::TimeViolation;
                    RxEdge::StartViolation
                }
            }
            RxState::Data => self.on_data_edge(level, previous, width_us),
            // Extra edges after capacity or after a fault change nothing
            RxState::Idle | RxState::Stop | RxState::End | RxState::Error => RxEdge::Accepted,
        }
    }

    fn on_data_edge(&mut self, level: Level, previous: Level, width_us: u64) -> RxEdge {
        // Seeing the same level twice means we missed an edge
        if previous == level {
            self.frame.status = FrameStatus::SequenceError;
            self.state = RxState::Error;
            return RxEdge::Fault;
        }

        if timing::within(
            width_us,
            timing::RX_FULL_BIT_MIN_US,
            timing::RX_FULL_BIT_MAX_US,
        ) {
            // A full-bit pulse may only end on an odd half-bit boundary
            if self.half_bits & 0x01 == 0 {
                self.frame.status = FrameStatus::SequenceError;
                self.state = RxState::Error;
                return RxEdge::Fault;
            }
            if level.is_high() {
                self.frame.set_bit(self.bits);
            }
            self.half_bits = self.half_bits.wrapping_add(2);
            self.bits += 1;
        } else if timing::within(
            width_us,
            timing::RX_HALF_BIT_MIN_US,
            timing::RX_HALF_BIT_MAX_US,
        ) {
            if self.half_bits & 0x01 == 1 {
                // First half of a bit: boundary edge, no value yet
                self.half_bits += 1;
            } else {
                // Second half: the transition direction is the bit value
                self.half_bits += 1;
                if level.is_high() {
                    self.frame.set_bit(self.bits);
                }
                self.bits += 1;
            }
        } else {
            self.frame.status = FrameStatus::TimeViolation;
            self.state = RxState::Error;
            return RxEdge::Fault;
        }

        if self.bits >= MAX_FRAME_BITS {
            self.state = RxState::Stop;
        }
        RxEdge::Accepted
    }

    /// True when the engine should deliver this frame as soon as the bus has
    /// idled past the stop condition.
    pub(crate) fn wants_delivery(&self) -> bool {
        matches!(self.state, RxState::Data | RxState::Stop | RxState::Error)
    }

    /// Close out the frame: stamp the collected bit count (and Ok status for
    /// clean frames), reset the machine, and hand the frame over.
    pub(crate) fn finish(&mut self) -> Frame {
        let mut frame = core::mem::take(&mut self.frame);
        if matches!(self.state, RxState::Data | RxState::Stop) {
            frame.status = FrameStatus::Ok;
        }
        frame.bit_length = self.bits;
        self.state = RxState::Idle;
        self.half_bits = 0;
        self.bits = 0;
        frame
    }
}
