//! Bus arbitration and collision engine.
//!
//! The engine owns the long-lived bus state plus both bit-timing machines,
//! and is the single authority over what the bus does next. It has exactly
//! two entry points, one per interrupt source:
//!
//! - [`BusEngine::on_edge`] for every electrical transition on the bus
//! - [`BusEngine::on_tick`] for the periodic half-bit timer
//!
//! On a single core with non-nested interrupts these never preempt each
//! other, so no locking is needed anywhere in here. Completed transmissions,
//! received frames and (optionally) raw edge traces accumulate in bounded
//! internal queues; the integration layer drains them after every event.
//! Queue insertion never blocks: a full receive queue drops the new frame.

use heapless::Deque;

use dali_protocol::Frame;

use crate::line::{BusLine, Level};
use crate::rx::{RxEdge, RxMachine, RxState};
use crate::timing;
use crate::tx::{TxMachine, TxState, TxTick};

/// Completed-transmission queue depth
pub const COMPLETED_DEPTH: usize = 4;
/// Received-frame queue depth
pub const RECEIVED_DEPTH: usize = 8;
/// Edge-trace queue depth
pub const TRACE_DEPTH: usize = 32;

/// Bus states.
///
/// The variants are ordered: everything up to and including `Error` is a
/// fault, so a single comparison separates faulted from operational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusState {
    /// After startup, before the bus has been seen idle long enough
    Unknown,
    /// Bus held low past the power-down threshold
    PowerDown,
    /// Fault; waiting for the bus to idle before returning to ready
    Error,
    /// Powered and idle; frames may be admitted
    Ready,
    /// Our transmit machine is driving the bus
    Transmitting,
    /// A backward frame is being decoded
    Receiving,
    /// Holding the bus low to signal a collision (101.9.2.4)
    TimeBreak,
    /// Released after a break; waiting out the recovery time
    Recovery,
}

impl BusState {
    /// True for Unknown, PowerDown and Error
    pub fn is_faulted(self) -> bool {
        self <= BusState::Error
    }
}

/// One raw edge observation, for bus debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeTrace {
    /// Time since the previous edge
    pub pulse_width_us: u64,
    /// Time since our own last driven edge
    pub tx_delta_us: u64,
    /// Level after the edge
    pub level: Level,
}

/// The bus engine. One instance per bus; owned by the interrupt layer.
pub struct BusEngine {
    bus_state: BusState,
    tx: TxMachine,
    rx: RxMachine,
    rx_last_edge_us: u64,
    tx_last_edge_us: u64,
    rx_level: Level,
    /// Single admission slot; serializes transmissions
    pending: Option<Frame>,
    completed: Deque<Frame, COMPLETED_DEPTH>,
    received: Deque<Frame, RECEIVED_DEPTH>,
    trace_enabled: bool,
    traces: Deque<EdgeTrace, TRACE_DEPTH>,
}

impl BusEngine {
    /// Create an engine. `now_us` and `level` come from sampling the bus at
    /// initialization time; the bus state starts out unknown until idle has
    /// been observed for the stop condition.
    pub fn new(now_us: u64, level: Level) -> Self {
        Self {
            bus_state: BusState::Unknown,
            tx: TxMachine::default(),
            rx: RxMachine::default(),
            rx_last_edge_us: now_us,
            tx_last_edge_us: now_us,
            rx_level: level,
            pending: None,
            completed: Deque::new(),
            received: Deque::new(),
            trace_enabled: false,
            traces: Deque::new(),
        }
    }

    /// Current bus state
    pub fn bus_state(&self) -> BusState {
        self.bus_state
    }

    /// Current transmit machine state
    pub fn tx_state(&self) -> TxState {
        self.tx.state()
    }

    /// Current receive machine state
    pub fn rx_state(&self) -> RxState {
        self.rx.state()
    }

    /// True when the admission slot can take another frame
    pub fn tx_slot_free(&self) -> bool {
        self.pending.is_none()
    }

    /// Hand a frame to the engine for transmission on the next ready tick.
    /// Returns the frame back when the slot is already occupied.
    pub fn submit(&mut self, frame: Frame) -> Result<(), Frame> {
        if self.pending.is_some() {
            return Err(frame);
        }
        self.pending = Some(frame);
        Ok(())
    }

    /// Pop a completed transmission, if any
    pub fn take_completed(&mut self) -> Option<Frame> {
        self.completed.pop_front()
    }

    /// Pop a received frame, if any
    pub fn take_received(&mut self) -> Option<Frame> {
        self.received.pop_front()
    }

    /// Pop a raw edge trace, if any
    pub fn take_trace(&mut self) -> Option<EdgeTrace> {
        self.traces.pop_front()
    }

    /// Enable or disable raw edge tracing
    pub fn set_trace_enabled(&mut self, enabled: bool) {
        self.trace_enabled = enabled;
    }

    /// Bus-edge event: `level` is the bus level after the transition.
    pub fn on_edge(&mut self, level: Level, now_us: u64, line: &mut impl BusLine) {
        let previous = self.rx_level;
        let pulse_width = now_us.wrapping_sub(self.rx_last_edge_us);
        let tx_delta = now_us.wrapping_sub(self.tx_last_edge_us);
        self.rx_level = level;
        self.rx_last_edge_us = now_us;

        if self.bus_state == BusState::Ready && level.is_low() {
            // Start of a backward frame; the gap identifies the reply window
            self.rx.begin(pulse_width);
            self.bus_state = BusState::Receiving;
        } else if self.bus_state == BusState::Receiving {
            match self.rx.on_edge(level, previous, pulse_width) {
                RxEdge::Accepted => {}
                // Malformed start bit: no frame to deliver, recover via the
                // ordinary bus error path
                RxEdge::StartViolation => self.bus_state = BusState::Error,
                // Mid-frame fault: the partial frame is delivered with its
                // status once the bus idles out
                RxEdge::Fault => {}
            }
        } else if self.bus_state == BusState::Transmitting
            && tx_delta > timing::COLLISION_TX_RX_DELTA_US
        {
            // Somebody else is driving the bus against us. Hold it low to
            // signal the break every device understands (101.9.2.4).
            line.set_level(Level::Low);
            self.tx_last_edge_us = now_us;
            self.tx.collide();
            self.bus_state = BusState::TimeBreak;
        } else if self.bus_state == BusState::Recovery
            && tx_delta > timing::COLLISION_TX_RX_DELTA_US
        {
            // A foreign edge during recovery; our own release edge (small
            // tx delta) must not abort the recovery window.
            self.bus_state = BusState::Error;
        }

        if self.trace_enabled {
            let _ = self.traces.push_back(EdgeTrace {
                pulse_width_us: pulse_width,
                tx_delta_us: tx_delta,
                level,
            });
        }
    }

    /// Half-bit timer tick.
    pub fn on_tick(&mut self, now_us: u64, line: &mut impl BusLine) {
        let rx_delta = now_us.wrapping_sub(self.rx_last_edge_us);
        let tx_delta = now_us.wrapping_sub(self.tx_last_edge_us);

        // Keep stored timestamps close enough that deltas stay meaningful
        if rx_delta > timing::MAX_DELTA_RELOAD_US {
            self.rx_last_edge_us = now_us - timing::MAX_DELTA_RELOAD_US / 2;
        }
        if tx_delta > timing::MAX_DELTA_RELOAD_US {
            self.tx_last_edge_us = now_us - timing::MAX_DELTA_RELOAD_US / 2;
        }

        // Startup and fault recovery: 101.8.2.4
        if self.bus_state.is_faulted()
            && self.rx_level.is_high()
            && rx_delta > timing::RX_STOP_CONDITION_US
        {
            self.bus_state = BusState::Ready;
        }

        // Bus power loss: relinquish the line no matter what was in flight
        if self.rx_level.is_low() && rx_delta > timing::BUS_POWER_DOWN_US {
            self.bus_state = BusState::PowerDown;
            line.set_level(Level::High);
        }

        if self.bus_state == BusState::TimeBreak && rx_delta > timing::TIME_BREAK_MIN_US {
            line.set_level(Level::High);
            self.tx_last_edge_us = now_us;
            if line.bus_level().is_low() {
                // Another master is still holding the bus; the caller owns
                // the retry policy (101.9.2.4 fig 17)
                self.bus_state = BusState::Error;
            } else {
                self.bus_state = BusState::Recovery;
            }
        } else if self.bus_state == BusState::Recovery && rx_delta > timing::RECOVERY_MIN_US {
            self.bus_state = BusState::Ready;
        } else if self.bus_state == BusState::Ready && self.tx.is_idle() {
            if let Some(frame) = self.pending.take() {
                self.bus_state = BusState::Transmitting;
                self.tx.begin(frame, line);
                self.tx_last_edge_us = now_us;
            }
        } else if self.bus_state == BusState::Transmitting {
            match self.tx.tick(tx_delta, line) {
                TxTick::Edge => self.tx_last_edge_us = now_us,
                TxTick::Wait => {}
                TxTick::Done => {
                    if let Some(frame) = self.tx.take_frame() {
                        let _ = self.completed.push_back(frame);
                    }
                    self.bus_state = BusState::Ready;
                }
            }
        } else if self.bus_state == BusState::Ready && !self.tx.is_idle() {
            // Leftover from a collision or an aborted attempt: report it with
            // its last status so the sender unblocks, then clear the machine
            if let Some(frame) = self.tx.take_frame() {
                let _ = self.completed.push_back(frame);
            }
            self.tx.reset();
        }

        // Close out a reception once the bus has idled past the stop
        // condition; error frames are delivered too, with their status
        if self.bus_state == BusState::Receiving
            && self.rx.wants_delivery()
            && rx_delta > timing::RX_STOP_CONDITION_US
        {
            let frame = self.rx.finish();
            let _ = self.received.push_back(frame);
            self.bus_state = BusState::Ready;
        }
    }
}
