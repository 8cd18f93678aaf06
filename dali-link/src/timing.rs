//! Bus timing constants, in microseconds.
//!
//! Values follow IEC 62386-101 (table numbers noted inline). The `multimaster`
//! feature selects the tighter transmit/receive windows of 101.8.3.1, which
//! assume crystal-accurate timers on every master.

/// Half bit: the minimum timing unit (101.8.1.1 tab 16)
pub const HALF_BIT_US: u64 = 416;

/// Full bit, or one double-width half bit
pub const FULL_BIT_US: u64 = 833;

/// Bus held low at least this long means bus power is down
pub const BUS_POWER_DOWN_US: u64 = 45_000;

// Transmit windows: 101.8.1.1 tab 16 (±12%)
#[cfg(not(feature = "multimaster"))]
pub const TX_HALF_BIT_MIN_US: u64 = 366;
#[cfg(not(feature = "multimaster"))]
pub const TX_HALF_BIT_MAX_US: u64 = 467;
#[cfg(not(feature = "multimaster"))]
pub const TX_FULL_BIT_MIN_US: u64 = 733;
#[cfg(not(feature = "multimaster"))]
pub const TX_FULL_BIT_MAX_US: u64 = 934;

// Multi-master transmit windows: 101.8.3.1 tab 21 (±4%)
#[cfg(feature = "multimaster")]
pub const TX_HALF_BIT_MIN_US: u64 = 400;
#[cfg(feature = "multimaster")]
pub const TX_HALF_BIT_MAX_US: u64 = 433;
#[cfg(feature = "multimaster")]
pub const TX_FULL_BIT_MIN_US: u64 = 800;
#[cfg(feature = "multimaster")]
pub const TX_FULL_BIT_MAX_US: u64 = 867;

/// Transmit-side stop condition: idle this long after our last edge
pub const TX_STOP_CONDITION_US: u64 = 2450;

// Forward-to-backward reply spacing, transmit side: 101.8.1.2 tab 17
pub const TX_FORWARD_BACKWARD_MIN_US: u64 = 5_500;
pub const TX_FORWARD_BACKWARD_MAX_US: u64 = 10_500;

/// Minimum spacing between two forward frames
pub const TX_FORWARD_FORWARD_MIN_US: u64 = 13_500;
/// Maximum spacing for a send-twice command to take effect (101.9.4)
pub const TX_FORWARD_FORWARD_MAX_US: u64 = 75_500;

// Receive windows: 101.8.2.1 tab 18/19 (±20%)
#[cfg(not(feature = "multimaster"))]
pub const RX_HALF_BIT_MIN_US: u64 = 333;
#[cfg(not(feature = "multimaster"))]
pub const RX_HALF_BIT_MAX_US: u64 = 500;
#[cfg(not(feature = "multimaster"))]
pub const RX_FULL_BIT_MIN_US: u64 = 666;
#[cfg(not(feature = "multimaster"))]
pub const RX_FULL_BIT_MAX_US: u64 = 1_000;

// Multi-master receive windows: 101.9.2.3 tab 23/24 (±4%)
#[cfg(feature = "multimaster")]
pub const RX_HALF_BIT_MIN_US: u64 = 400;
#[cfg(feature = "multimaster")]
pub const RX_HALF_BIT_MAX_US: u64 = 433;
#[cfg(feature = "multimaster")]
pub const RX_FULL_BIT_MIN_US: u64 = 800;
#[cfg(feature = "multimaster")]
pub const RX_FULL_BIT_MAX_US: u64 = 867;

/// Receive-side stop condition: bus idle this long ends a frame (101.8.2.4)
pub const RX_STOP_CONDITION_US: u64 = 2_400;

// Forward-to-backward reply window, receive side: 101.8.2.4 tab 20
pub const RX_FORWARD_BACKWARD_MIN_US: u64 = 2_400;
pub const RX_FORWARD_BACKWARD_MAX_US: u64 = 12_400;

// Collision recovery: 101.9.2.4 tab 25
pub const TIME_BREAK_MIN_US: u64 = 1_200;
pub const RECOVERY_MIN_US: u64 = 4_000;

/// An edge further than this from our own last driven edge was made by
/// somebody else. Bounded by the worst-case receive window skew
/// (500 - 416 µs single master, 433 - 416 µs multi-master), rounded up for
/// interrupt latency.
#[cfg(not(feature = "multimaster"))]
pub const COLLISION_TX_RX_DELTA_US: u64 = 100;
#[cfg(feature = "multimaster")]
pub const COLLISION_TX_RX_DELTA_US: u64 = 50;

/// Clamp for stored edge timestamps so deltas stay meaningful across very
/// long idle periods.
pub const MAX_DELTA_RELOAD_US: u64 = 600_000_000;

/// Exclusive range check used for all pulse-width windows
pub(crate) fn within(value: u64, min: u64, max: u64) -> bool {
    value > min && value < max
}
