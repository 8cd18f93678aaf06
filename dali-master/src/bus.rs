//! The channel-backed messaging façade.
//!
//! [`DaliBus`] implements [`Transport`] over the static channels: frames go
//! out through the send channel, come back resolved through the result
//! channel, and backward frames arrive on the receive channel. This is the
//! task-context counterpart of the interrupt-side [`crate::BusDriver`].

use embassy_time::{with_timeout, Duration, Timer};

use dali_protocol::Frame;

use crate::channels::{
    ReceiveChannel, SendChannel, SendResultChannel, RECEIVE_CHANNEL, SEND_CHANNEL,
    SEND_RESULT_CHANNEL,
};
use crate::transport::{Transport, QUERY_TIMEOUT_MS};

/// Task-side handle to the bus
pub struct DaliBus {
    send: &'static SendChannel,
    results: &'static SendResultChannel,
    replies: &'static ReceiveChannel,
}

impl Default for DaliBus {
    fn default() -> Self {
        Self::new()
    }
}

impl DaliBus {
    /// Handle over the global channels
    pub fn new() -> Self {
        Self::with_channels(&SEND_CHANNEL, &SEND_RESULT_CHANNEL, &RECEIVE_CHANNEL)
    }

    /// Handle over explicit channels
    pub fn with_channels(
        send: &'static SendChannel,
        results: &'static SendResultChannel,
        replies: &'static ReceiveChannel,
    ) -> Self {
        Self {
            send,
            results,
            replies,
        }
    }
}

impl Transport for DaliBus {
    async fn send(&mut self, frame: &mut Frame) {
        self.send.send(*frame).await;
        // Only one frame is ever in flight, so the next result is ours
        *frame = self.results.receive().await;
    }

    async fn query(&mut self, tx: Frame, rx: &mut Frame) -> bool {
        // A delayed reply to an earlier, already-abandoned query may still
        // be sitting in the channel; it must not answer this one
        while self.replies.try_receive().is_ok() {}

        let mut tx = tx;
        self.send(&mut tx).await;

        match with_timeout(
            Duration::from_millis(QUERY_TIMEOUT_MS),
            self.replies.receive(),
        )
        .await
        {
            Ok(frame) => {
                *rx = frame;
                true
            }
            Err(_) => false,
        }
    }

    async fn delay_ms(&mut self, ms: u32) {
        Timer::after_millis(ms as u64).await;
    }
}
