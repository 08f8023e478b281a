//! Event sink that narrates the run: structured logs plus thinned instructions.

use wayfinder_core::Event;
use wayfinder_system_relay::{Instruction, InstructionFilter};
use wayfinder_system_simulation::{EventSink, TracingSink};

/// Forwards every tick to `tracing` and queues debounced instructions.
#[derive(Debug)]
pub(crate) struct NarrationSink {
    filter: InstructionFilter,
    logs: TracingSink,
    pending: Vec<(u64, Instruction)>,
}

impl NarrationSink {
    pub(crate) fn new(filter: InstructionFilter) -> Self {
        Self {
            filter,
            logs: TracingSink,
            pending: Vec::new(),
        }
    }

    /// Instructions forwarded since the previous drain, tagged with their tick.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = (u64, Instruction)> + '_ {
        self.pending.drain(..)
    }
}

impl EventSink for NarrationSink {
    fn publish(&mut self, tick: u64, events: &[Event]) {
        self.logs.publish(tick, events);

        let mut forwarded = Vec::new();
        self.filter.relay(events, &mut forwarded);
        self.pending
            .extend(forwarded.into_iter().map(|instruction| (tick, instruction)));
    }
}
