//! Bus access seam for the protocol layers.
//!
//! [`Transport`] is what commissioning and the command set are written
//! against: three primitive operations plus two provided sequences. The real
//! implementation is [`crate::bus::DaliBus`]; tests substitute a simulated
//! gear population.

use dali_protocol::Frame;

/// Delay between the two halves of a send-twice command. The bus standard
/// requires 13.5-75 ms between forward frames; queue latency and the stop
/// condition supply the rest.
pub const SEND_TWICE_GAP_MS: u32 = 10;

/// How long a query waits for a backward frame. The reply window closes
/// 12.4 ms after the forward frame, so anything this late is silence.
pub const QUERY_TIMEOUT_MS: u64 = 50;

/// Errors surfaced by the command and commissioning layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// A query received no backward frame within the reply window
    NoReply {
        /// The query opcode that went unanswered
        opcode: u8,
    },
    /// Short address outside 0-63
    InvalidAddress(u8),
}

/// Synchronous access to the bus.
///
/// `send` blocks until the hardware resolves the frame; there is no timeout
/// and no cancellation, because the link layer terminates every transmit
/// attempt in bounded time. `query` is the only bounded wait: the device
/// being asked may simply not exist.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Transmit a forward frame and wait for hardware resolution.
    ///
    /// The frame is overwritten with its completion status.
    async fn send(&mut self, frame: &mut Frame);

    /// Transmit `tx`, then wait for one backward frame.
    ///
    /// Returns `false` when no reply arrives within [`QUERY_TIMEOUT_MS`];
    /// absence of a reply is an expected outcome, not an error.
    async fn query(&mut self, tx: Frame, rx: &mut Frame) -> bool;

    /// Sleep for at least `ms` milliseconds
    async fn delay_ms(&mut self, ms: u32);

    /// Send the same frame twice with the mandated inter-frame gap.
    ///
    /// Required for the safety-relevant commands that only take effect when
    /// received twice.
    async fn send_double(&mut self, frame: &mut Frame) {
        self.send(frame).await;
        frame.sequence_id = frame.sequence_id.wrapping_add(1);
        self.delay_ms(SEND_TWICE_GAP_MS).await;
        self.send(frame).await;
    }

    /// Query one byte from `opcode` addressed to `address`.
    ///
    /// The caller decides whether a missing reply aborts the larger
    /// operation.
    async fn query_byte(&mut self, address: u8, opcode: u8) -> Result<u8, CommandError> {
        let mut reply = Frame::default();
        if self.query(Frame::forward(address, opcode), &mut reply).await {
            Ok(reply.payload[0])
        } else {
            Err(CommandError::NoReply { opcode })
        }
    }
}
