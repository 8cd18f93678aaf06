//! Interrupt-side pump between the bus engine and the channels.
//!
//! The hardware integration calls [`BusDriver::on_edge`] from the bus-edge
//! interrupt and [`BusDriver::on_tick`] from the half-bit timer interrupt.
//! Around each event the driver moves frames across the context boundary:
//! pending sends into the engine's admission slot, and completed/received/
//! trace entries out into the channels. Channel insertion uses `try_send`
//! only — interrupt context never blocks, and a full receive channel simply
//! drops the frame.

use dali_link::{BusEngine, BusLine, Level};

use crate::channels::{
    ReceiveChannel, SendChannel, SendResultChannel, TraceChannel, RECEIVE_CHANNEL, SEND_CHANNEL,
    SEND_RESULT_CHANNEL, TRACE_CHANNEL,
};

/// Owns the engine and the physical line
pub struct BusDriver<L: BusLine> {
    engine: BusEngine,
    line: L,
    send: &'static SendChannel,
    results: &'static SendResultChannel,
    replies: &'static ReceiveChannel,
    traces: &'static TraceChannel,
}

impl<L: BusLine> BusDriver<L> {
    /// Driver over the global channels. `now_us` stamps the initial bus
    /// sample.
    pub fn new(line: L, now_us: u64) -> Self {
        Self::with_channels(
            line,
            now_us,
            &SEND_CHANNEL,
            &SEND_RESULT_CHANNEL,
            &RECEIVE_CHANNEL,
            &TRACE_CHANNEL,
        )
    }

    /// Driver over explicit channels
    pub fn with_channels(
        mut line: L,
        now_us: u64,
        send: &'static SendChannel,
        results: &'static SendResultChannel,
        replies: &'static ReceiveChannel,
        traces: &'static TraceChannel,
    ) -> Self {
        let level = line.bus_level();
        Self {
            engine: BusEngine::new(now_us, level),
            line,
            send,
            results,
            replies,
            traces,
        }
    }

    /// Bus-edge interrupt entry point
    pub fn on_edge(&mut self, level: Level, now_us: u64) {
        self.engine.on_edge(level, now_us, &mut self.line);
        self.drain();
    }

    /// Half-bit timer interrupt entry point
    pub fn on_tick(&mut self, now_us: u64) {
        if self.engine.tx_slot_free() {
            if let Ok(frame) = self.send.try_receive() {
                let _ = self.engine.submit(frame);
            }
        }
        self.engine.on_tick(now_us, &mut self.line);
        self.drain();
    }

    fn drain(&mut self) {
        while let Some(frame) = self.engine.take_completed() {
            let _ = self.results.try_send(frame);
        }
        while let Some(frame) = self.engine.take_received() {
            let _ = self.replies.try_send(frame);
        }
        while let Some(trace) = self.engine.take_trace() {
            let _ = self.traces.try_send(trace);
        }
    }

    /// Enable or disable raw edge tracing
    pub fn set_trace_enabled(&mut self, enabled: bool) {
        self.engine.set_trace_enabled(enabled);
    }

    /// The engine, for state inspection
    pub fn engine(&self) -> &BusEngine {
        &self.engine
    }

    /// The physical line
    pub fn line_mut(&mut self) -> &mut L {
        &mut self.line
    }
}
