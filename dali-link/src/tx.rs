//! Transmit bit-timing state machine.
//!
//! Clocked by the half-bit timer while the bus is in the transmitting state.
//! Each data bit occupies two timer ticks; the level driven on a given tick
//! is `data_bit XOR (half_bit_index is odd)`, which yields the biphase
//! encoding (a logical 1 rises at bit center, a logical 0 falls).

use dali_protocol::{Frame, FrameStatus};

use crate::line::{BusLine, Level};
use crate::timing;

/// Transmit machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxState {
    /// Nothing in flight
    Idle,
    /// Driving the start bit
    Start,
    /// Driving data bits
    Data,
    /// Waiting out the stop condition
    Stop,
    /// Terminal: another transmitter disagreed mid-frame
    Collision,
    /// Terminal: frame abandoned by the arbitration engine
    Error,
}

impl Default for TxState {
    fn default() -> Self {
        TxState::Idle
    }
}

/// Outcome of one timer tick, reported back to the arbitration engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TxTick {
    /// A new level was driven; the own-edge timestamp must be refreshed
    Edge,
    /// Nothing driven this tick
    Wait,
    /// Frame finished; ready for the completion queue
    Done,
}

/// The transmit machine. Holds the in-flight frame by value.
#[derive(Debug, Default)]
pub struct TxMachine {
    state: TxState,
    half_bits: u8,
    bits: u8,
    frame: Option<Frame>,
}

impl TxMachine {
    /// Current state
    pub fn state(&self) -> TxState {
        self.state
    }

    /// True when no frame is loaded
    pub fn is_idle(&self) -> bool {
        self.state == TxState::Idle
    }

    /// Admit a frame and drive the first half of the start bit.
    ///
    /// The status is provisional until the stop condition resolves it; a
    /// frame cut short by power loss or a flush reports this value.
    pub(crate) fn begin(&mut self, mut frame: Frame, line: &mut impl BusLine) {
        frame.status = FrameStatus::Error;
        self.frame = Some(frame);
        self.state = TxState::Start;
        self.half_bits = 0;
        self.bits = 0;
        line.set_level(Level::Low);
    }

    /// Advance one half-bit tick. `tx_delta_us` is the time since our own
    /// last driven edge.
    pub(crate) fn tick(&mut self, tx_delta_us: u64, line: &mut impl BusLine) -> TxTick {
        match self.state {
            TxState::Start => {
                // Second half of the start bit
                self.state = TxState::Data;
                self.half_bits += 1;
                line.set_level(Level::High);
                TxTick::Edge
            }
            TxState::Data => {
                let Some(frame) = self.frame.as_ref() else {
                    self.state = TxState::Error;
                    return TxTick::Wait;
                };
                let high = frame.bit(self.bits) ^ (self.half_bits & 0x01 == 1);
                line.set_level(Level::from_high(high));

                self.half_bits += 1;
                if self.half_bits & 0x01 == 1 {
                    self.bits += 1;
                    if self.bits >= frame.bit_length {
                        self.state = TxState::Stop;
                    }
                }
                TxTick::Edge
            }
            TxState::Stop => {
                if line.tx_level().is_low() {
                    // A frame ending in a 0 leaves our transmitter low;
                    // release the bus or it stays jammed forever.
                    line.set_level(Level::High);
                    TxTick::Edge
                } else if tx_delta_us > timing::TX_STOP_CONDITION_US {
                    if let Some(frame) = self.frame.as_mut() {
                        frame.status = FrameStatus::Ok;
                    }
                    self.state = TxState::Idle;
                    TxTick::Done
                } else {
                    TxTick::Wait
                }
            }
            TxState::Idle | TxState::Collision | TxState::Error => TxTick::Wait,
        }
    }

    /// Mark the in-flight frame as collided. The frame stays loaded until
    /// the engine flushes it once the bus is ready again.
    pub(crate) fn collide(&mut self) {
        if let Some(frame) = self.frame.as_mut() {
            frame.status = FrameStatus::Collision;
        }
        self.state = TxState::Collision;
    }

    /// Take the loaded frame out of the machine
    pub(crate) fn take_frame(&mut self) -> Option<Frame> {
        self.frame.take()
    }

    /// Clear any leftover state back to idle
    pub(crate) fn reset(&mut self) {
        self.state = TxState::Idle;
        self.half_bits = 0;
        self.bits = 0;
        self.frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingLine {
        driven: Level,
        log: heapless::Vec<Level, 80>,
    }

    impl RecordingLine {
        fn new() -> Self {
            Self {
                driven: Level::High,
                log: heapless::Vec::new(),
            }
        }
    }

    impl BusLine for RecordingLine {
        fn set_level(&mut self, level: Level) {
            self.driven = level;
            self.log.push(level).unwrap();
        }

        fn bus_level(&mut self) -> Level {
            self.driven
        }

        fn tx_level(&self) -> Level {
            self.driven
        }
    }

    fn run_to_stop(machine: &mut TxMachine, line: &mut RecordingLine) {
        for _ in 0..80 {
            if machine.state() == TxState::Stop {
                break;
            }
            machine.tick(0, line);
        }
        assert_eq!(machine.state(), TxState::Stop);
    }

    #[test]
    fn test_recall_max_waveform() {
        // Short address 1, RECALL MAX: payload [0x01, 0x05]. The drive
        // sequence is 2 start half-bits plus 32 data half-bit levels.
        let mut machine = TxMachine::default();
        let mut line = RecordingLine::new();

        machine.begin(Frame::forward(0x01, 0x05), &mut line);
        run_to_stop(&mut machine, &mut line);

        let mut expected: heapless::Vec<Level, 80> = heapless::Vec::new();
        expected.push(Level::Low).unwrap(); // start, first half
        expected.push(Level::High).unwrap(); // start, second half
        for byte in [0x01u8, 0x05u8] {
            for bit in 0..8 {
                let value = (byte >> (7 - bit)) & 0x01 != 0;
                // First half inverted, second half is the bit value
                expected.push(Level::from_high(!value)).unwrap();
                expected.push(Level::from_high(value)).unwrap();
            }
        }
        assert_eq!(line.log, expected);
        assert_eq!(line.log.len(), 34);
    }

    #[test]
    fn test_stop_releases_stuck_low_bus() {
        // A frame whose last bit is 0 ends with the transmitter driving low.
        let mut machine = TxMachine::default();
        let mut line = RecordingLine::new();

        machine.begin(Frame::forward(0x01, 0x00), &mut line);
        run_to_stop(&mut machine, &mut line);
        assert_eq!(line.tx_level(), Level::Low);

        assert_eq!(machine.tick(0, &mut line), TxTick::Edge);
        assert_eq!(line.tx_level(), Level::High);
    }

    #[test]
    fn test_stop_condition_completes_frame() {
        let mut machine = TxMachine::default();
        let mut line = RecordingLine::new();

        machine.begin(Frame::forward(0x01, 0x05), &mut line);
        run_to_stop(&mut machine, &mut line);

        // Not yet idle long enough
        assert_eq!(machine.tick(timing::TX_STOP_CONDITION_US, &mut line), TxTick::Wait);
        // Past the stop condition
        assert_eq!(
            machine.tick(timing::TX_STOP_CONDITION_US + 1, &mut line),
            TxTick::Done
        );
        let frame = machine.take_frame().unwrap();
        assert_eq!(frame.status, FrameStatus::Ok);
        assert!(machine.is_idle());
    }

    #[test]
    fn test_collision_marks_frame() {
        let mut machine = TxMachine::default();
        let mut line = RecordingLine::new();

        machine.begin(Frame::forward(0x01, 0x05), &mut line);
        machine.tick(0, &mut line);
        machine.collide();

        assert_eq!(machine.state(), TxState::Collision);
        assert!(!machine.is_idle());
        let frame = machine.take_frame().unwrap();
        assert_eq!(frame.status, FrameStatus::Collision);
    }
}
