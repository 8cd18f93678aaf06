//! Bus line abstraction.
//!
//! The DALI pair is open-collector wired-AND: any device driving low pulls
//! the whole bus low; high is the released/idle state. The engine therefore
//! needs three things from the hardware: drive our side, read the actual bus
//! (the receive pin, which sees everyone), and read back what we ourselves
//! are driving.

/// Electrical level of the bus or of our transmit side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Driven/active state
    Low,
    /// Released/idle state
    High,
}

impl Level {
    /// Check for the idle state
    pub fn is_high(self) -> bool {
        self == Level::High
    }

    /// Check for the active state
    pub fn is_low(self) -> bool {
        self == Level::Low
    }

    /// Map a logical "drive high" flag to a level
    pub fn from_high(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Access to the physical bus pair
pub trait BusLine {
    /// Drive our transmit side to the given level
    fn set_level(&mut self, level: Level);

    /// Sample the actual bus level via the receive side.
    ///
    /// This is the wired-AND of every transmitter, not our own pin.
    fn bus_level(&mut self) -> Level;

    /// The level our own transmitter is currently driving
    fn tx_level(&self) -> Level;
}

/// [`BusLine`] over a pair of `embedded-hal` digital pins.
///
/// The driven level is cached rather than read back from the output pin, so
/// a plain `OutputPin` suffices. A receive-pin read error is treated as the
/// idle state.
pub struct PinLine<O, I> {
    tx: O,
    rx: I,
    driven: Level,
}

impl<O, I> PinLine<O, I>
where
    O: embedded_hal::digital::OutputPin,
    I: embedded_hal::digital::InputPin,
{
    /// Wrap a transmit output pin and a receive input pin, releasing the bus
    pub fn new(tx: O, rx: I) -> Self {
        let mut line = Self {
            tx,
            rx,
            driven: Level::High,
        };
        line.set_level(Level::High);
        line
    }
}

impl<O, I> BusLine for PinLine<O, I>
where
    O: embedded_hal::digital::OutputPin,
    I: embedded_hal::digital::InputPin,
{
    fn set_level(&mut self, level: Level) {
        self.driven = level;
        let _ = match level {
            Level::High => self.tx.set_high(),
            Level::Low => self.tx.set_low(),
        };
    }

    fn bus_level(&mut self) -> Level {
        Level::from_high(self.rx.is_high().unwrap_or(true))
    }

    fn tx_level(&self) -> Level {
        self.driven
    }
}
