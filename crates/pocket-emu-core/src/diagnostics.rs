//! Host-facing diagnostics seam.
//!
//! The dispatcher never talks to a UI directly. Whoever embeds the core hands
//! it a [`Diagnostics`] implementation, which receives fault reports, optional
//! per-instruction trace lines and the request to stop feeding instructions.

/// Receiver for dispatcher reports.
pub trait Diagnostics {
    /// Something went wrong and a human should see it (e.g. an opcode fault).
    fn report_message(&mut self, text: &str);

    /// Short, frequently replaced status line (per-instruction trace).
    fn report_status(&mut self, text: &str);

    /// Ask the host to stop stepping the CPU at the next instruction boundary.
    fn request_pause(&mut self);
}

/// Forwards reports to the `log` facade and remembers pause requests.
#[derive(Debug, Default)]
pub struct LogDiagnostics {
    pause_requested: bool,
    messages: usize,
}

impl LogDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns and clears the pending pause request.
    pub fn take_pause_request(&mut self) -> bool {
        std::mem::take(&mut self.pause_requested)
    }

    pub fn pause_requested(&self) -> bool {
        self.pause_requested
    }

    /// Number of messages reported so far.
    pub fn message_count(&self) -> usize {
        self.messages
    }
}

impl Diagnostics for LogDiagnostics {
    fn report_message(&mut self, text: &str) {
        self.messages += 1;
        log::warn!(target: "pocket_emu::diag", "{text}");
    }

    fn report_status(&mut self, text: &str) {
        log::trace!(target: "pocket_emu::diag", "{text}");
    }

    fn request_pause(&mut self) {
        log::info!(target: "pocket_emu::diag", "pause requested");
        self.pause_requested = true;
    }
}

/// Discards everything. Useful for benchmarks and tests that only look at
/// CPU state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn report_message(&mut self, _text: &str) {}

    fn report_status(&mut self, _text: &str) {}

    fn request_pause(&mut self) {}
}
