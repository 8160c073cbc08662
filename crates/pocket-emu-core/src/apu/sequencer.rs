/// Sub-rate events produced by one 512 Hz frame sequencer tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameEvents {
    /// 256 Hz length counter clock.
    pub length: bool,
    /// 64 Hz envelope clock.
    pub envelope: bool,
    /// 128 Hz sweep clock.
    pub sweep: bool,
}

/// Shared modulo-8 counter every channel is clocked from.
///
/// Step layout follows the hardware: length on even steps, sweep on steps 2
/// and 6, envelope on step 7.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameSequencer {
    step: u8,
}

impl FrameSequencer {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Step that the next `advance` will run.
    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }

    pub fn advance(&mut self) -> FrameEvents {
        let s = self.step;
        self.step = (self.step + 1) & 7;
        FrameEvents {
            length: s & 1 == 0,
            envelope: s == 7,
            sweep: s == 2 || s == 6,
        }
    }
}
