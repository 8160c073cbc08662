//! The four sound generators.
//!
//! All channels share SoundOn/DAC/length/phase handling in [`Channel`]; what
//! differs lives in the closed [`Voice`] set.

use super::sequencer::FrameEvents;

// Channel clocks from gbdev.io/pandocs/Audio_Registers.html
const PULSE_CLOCK_HZ: f32 = 131_072.0;
const WAVE_CLOCK_HZ: f32 = 65_536.0;
const NOISE_CLOCK_HZ: f32 = 524_288.0;

/// Highest frequency an 11-bit period can express. Sweeping past it silences
/// the channel.
pub const MAX_FREQUENCY_HZ: f32 = 131_072.0;

pub const PULSE_LENGTH_MAX: u16 = 64;
pub const WAVE_LENGTH_MAX: u16 = 256;

const PULSE_STEPS: usize = 8;
const WAVE_STEPS: usize = 32;
const LFSR_SEED: u16 = 0x7FFF;

// Duty table for pulse channels (CH1, CH2), indexed by NRx1 bits 6-7:
// 0 -> 00000001 (12.5%)
// 1 -> 10000001 (25%)
// 2 -> 10000111 (50%)
// 3 -> 01111110 (75%)
const DUTY_TABLE: [[u8; PULSE_STEPS]; 4] = [
    [0, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 1, 1, 1],
    [0, 1, 1, 1, 1, 1, 1, 0],
];

// NR32 output level: mute, 100%, 50%, 25%.
const WAVE_LEVEL_SCALE: [f32; 4] = [0.0, 1.0, 0.5, 0.25];

/// Counts up from the loaded value; reaching `max` in counter mode silences
/// the channel.
#[derive(Clone, Copy, Debug)]
pub struct LengthCounter {
    counter: u16,
    max: u16,
    enabled: bool,
}

impl LengthCounter {
    pub fn new(max: u16) -> Self {
        Self {
            counter: 0,
            max,
            enabled: false,
        }
    }

    pub fn load(&mut self, value: u16) {
        self.counter = value.min(self.max);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Ticks left before expiry.
    pub fn remaining(&self) -> u16 {
        self.max - self.counter
    }

    /// Returns true on the tick the counter expires.
    pub fn clock(&mut self) -> bool {
        if !self.enabled || self.counter >= self.max {
            return false;
        }
        self.counter += 1;
        self.counter == self.max
    }

    fn trigger(&mut self) {
        if self.counter >= self.max {
            self.counter = 0;
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Envelope {
    initial: u8,
    volume: u8,
    increase: bool,
    period: u8,
    step: u8,
}

impl Envelope {
    /// NRx2: initial volume, direction (bit 3 set = increase), step period.
    fn write(&mut self, val: u8) {
        self.initial = val >> 4;
        self.increase = val & 0x08 != 0;
        self.period = val & 0x07;
    }

    fn trigger(&mut self) {
        self.volume = self.initial;
        self.step = 0;
    }

    fn clock(&mut self) {
        if self.period == 0 {
            return;
        }
        self.step += 1;
        if self.step >= self.period {
            if self.increase && self.volume < 15 {
                self.volume += 1;
            } else if !self.increase && self.volume > 0 {
                self.volume -= 1;
            }
            self.step = 0;
        }
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }
}

/// Frequency sweep for channel 1, tracked as an offset in Hz from the
/// programmed frequency.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sweep {
    period: u8,
    decrease: bool,
    shift: u8,
    step: u8,
    offset_hz: f32,
}

impl Sweep {
    /// NR10: period in bits 4-6, direction (bit 3 set = decrease), shift.
    fn write(&mut self, val: u8) {
        self.period = (val >> 4) & 0x07;
        self.decrease = val & 0x08 != 0;
        self.shift = val & 0x07;
    }

    fn trigger(&mut self) {
        self.offset_hz = 0.0;
        self.step = 0;
    }

    /// Run one 128 Hz sweep clock. Returns true if the frequency overflowed
    /// and the channel must be silenced.
    fn clock(&mut self, base_hz: f32) -> bool {
        if self.period == 0 || self.shift == 0 {
            self.step = 0;
            self.offset_hz = 0.0;
            return false;
        }
        self.step += 1;
        if self.step < self.period {
            return false;
        }
        self.step = 0;

        let delta = (base_hz + self.offset_hz) / (1u32 << self.shift) as f32;
        if self.decrease {
            self.offset_hz -= delta;
            if base_hz + self.offset_hz < 0.0 {
                self.offset_hz = 0.0;
            }
            false
        } else {
            self.offset_hz += delta;
            if base_hz + self.offset_hz > MAX_FREQUENCY_HZ {
                self.offset_hz = 0.0;
                return true;
            }
            false
        }
    }

    pub fn offset_hz(&self) -> f32 {
        self.offset_hz
    }
}

#[derive(Clone, Debug)]
pub struct Pulse {
    envelope: Envelope,
    sweep: Option<Sweep>,
    duty: u8,
    built_duty: Option<u8>,
    period: u16,
}

impl Pulse {
    fn base_frequency(&self) -> f32 {
        PULSE_CLOCK_HZ / period_divisor(self.period)
    }
}

#[derive(Clone, Debug)]
pub struct Wave {
    period: u16,
    level: u8,
    ram: [u8; 16],
    dirty: bool,
}

#[derive(Clone, Debug)]
pub struct Noise {
    envelope: Envelope,
    lfsr: u16,
    shift: u8,
    width7: bool,
    divisor: u8,
}

impl Noise {
    fn frequency(&self) -> f32 {
        let r = if self.divisor == 0 {
            0.5
        } else {
            self.divisor as f32
        };
        NOISE_CLOCK_HZ / r / (1u32 << (self.shift as u32 + 1)) as f32
    }

    fn clock_lfsr(&mut self) {
        let bit = (self.lfsr ^ (self.lfsr >> 1)) & 1;
        self.lfsr = (self.lfsr >> 1) | (bit << 14);
        if self.width7 {
            self.lfsr = (self.lfsr & !0x40) | (bit << 6);
        }
    }
}

#[derive(Clone, Debug)]
pub enum Voice {
    Pulse(Pulse),
    Wave(Wave),
    Noise(Noise),
}

/// The 11-bit period turned into a divisor; never zero.
fn period_divisor(period: u16) -> f32 {
    (2048 - (period & 0x7FF)).max(1) as f32
}

#[derive(Clone, Debug)]
pub struct Channel {
    sound_on: bool,
    dac_enabled: bool,
    length: LengthCounter,
    phase: f32,
    table: Vec<f32>,
    table_builds: u32,
    voice: Voice,
}

impl Channel {
    fn with_voice(max_length: u16, voice: Voice) -> Self {
        Self {
            sound_on: false,
            dac_enabled: false,
            length: LengthCounter::new(max_length),
            phase: 0.0,
            table: Vec::new(),
            table_builds: 0,
            voice,
        }
    }

    pub fn pulse(with_sweep: bool) -> Self {
        Self::with_voice(
            PULSE_LENGTH_MAX,
            Voice::Pulse(Pulse {
                envelope: Envelope::default(),
                sweep: with_sweep.then(Sweep::default),
                duty: 0,
                built_duty: None,
                period: 0,
            }),
        )
    }

    pub fn wave() -> Self {
        Self::with_voice(
            WAVE_LENGTH_MAX,
            Voice::Wave(Wave {
                period: 0,
                level: 0,
                ram: [0; 16],
                dirty: true,
            }),
        )
    }

    pub fn noise() -> Self {
        Self::with_voice(
            PULSE_LENGTH_MAX,
            Voice::Noise(Noise {
                envelope: Envelope::default(),
                lfsr: LFSR_SEED,
                shift: 0,
                width7: false,
                divisor: 0,
            }),
        )
    }

    pub fn sound_on(&self) -> bool {
        self.sound_on
    }

    pub fn length(&self) -> &LengthCounter {
        &self.length
    }

    /// Phase accumulator, in lookup-table steps (LFSR clocks for noise).
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// How many times the lookup table has been regenerated.
    pub fn table_builds(&self) -> u32 {
        self.table_builds
    }

    pub fn envelope_volume(&self) -> Option<u8> {
        match &self.voice {
            Voice::Pulse(p) => Some(p.envelope.volume()),
            Voice::Noise(n) => Some(n.envelope.volume()),
            Voice::Wave(_) => None,
        }
    }

    pub fn sweep_offset_hz(&self) -> Option<f32> {
        match &self.voice {
            Voice::Pulse(p) => p.sweep.as_ref().map(Sweep::offset_hz),
            _ => None,
        }
    }

    /// Current output frequency in Hz, including any sweep offset.
    pub fn frequency(&self) -> f32 {
        match &self.voice {
            Voice::Pulse(p) => {
                let offset = p.sweep.as_ref().map_or(0.0, Sweep::offset_hz);
                p.base_frequency() + offset
            }
            Voice::Wave(w) => WAVE_CLOCK_HZ / period_divisor(w.period),
            Voice::Noise(n) => n.frequency(),
        }
    }

    /// Output scale before master volume, 0.0..=1.0.
    pub fn amplitude(&self) -> f32 {
        match &self.voice {
            Voice::Pulse(p) => p.envelope.volume() as f32 / 15.0,
            Voice::Noise(n) => n.envelope.volume() as f32 / 15.0,
            // NR32 level is baked into the wave table.
            Voice::Wave(_) => 1.0,
        }
    }

    pub(crate) fn write_sweep(&mut self, val: u8) {
        let Voice::Pulse(p) = &mut self.voice else {
            return;
        };
        if let Some(sweep) = p.sweep.as_mut() {
            sweep.write(val);
        }
    }

    /// NRx1. Pulse channels also take the duty in bits 6-7.
    pub(crate) fn write_length(&mut self, val: u8) {
        match &mut self.voice {
            Voice::Pulse(p) => {
                p.duty = val >> 6;
                self.length.load((val & 0x3F) as u16);
            }
            Voice::Wave(_) => self.length.load(val as u16),
            Voice::Noise(_) => self.length.load((val & 0x3F) as u16),
        }
    }

    /// NRx2 for pulse/noise. The upper five bits all clear turn the DAC off.
    pub(crate) fn write_envelope(&mut self, val: u8) {
        match &mut self.voice {
            Voice::Pulse(Pulse { envelope, .. }) | Voice::Noise(Noise { envelope, .. }) => {
                envelope.write(val);
            }
            Voice::Wave(_) => return,
        }
        self.set_dac(val & 0xF8 != 0);
    }

    /// NR30 bit 7.
    pub(crate) fn write_wave_dac(&mut self, val: u8) {
        if matches!(self.voice, Voice::Wave(_)) {
            self.set_dac(val & 0x80 != 0);
        }
    }

    /// NR32 bits 5-6.
    pub(crate) fn write_wave_level(&mut self, val: u8) {
        if let Voice::Wave(w) = &mut self.voice {
            let level = (val >> 5) & 0x03;
            if level != w.level {
                w.level = level;
                w.dirty = true;
            }
        }
    }

    pub(crate) fn load_wave_ram(&mut self, ram: &[u8; 16]) {
        if let Voice::Wave(w) = &mut self.voice {
            if w.ram != *ram {
                w.ram = *ram;
                w.dirty = true;
            }
        }
    }

    /// NR43: clock shift, LFSR width, divisor code.
    pub(crate) fn write_noise_poly(&mut self, val: u8) {
        if let Voice::Noise(n) = &mut self.voice {
            n.shift = val >> 4;
            n.width7 = val & 0x08 != 0;
            n.divisor = val & 0x07;
        }
    }

    pub(crate) fn write_period_low(&mut self, val: u8) {
        match &mut self.voice {
            Voice::Pulse(Pulse { period, .. }) | Voice::Wave(Wave { period, .. }) => {
                *period = (*period & 0x700) | val as u16;
            }
            Voice::Noise(_) => {}
        }
    }

    /// NRx4: trigger (bit 7), length enable (bit 6), period high bits.
    pub(crate) fn write_control(&mut self, val: u8) {
        match &mut self.voice {
            Voice::Pulse(Pulse { period, .. }) | Voice::Wave(Wave { period, .. }) => {
                *period = (*period & 0xFF) | (((val & 0x07) as u16) << 8);
            }
            Voice::Noise(_) => {}
        }
        self.length.set_enabled(val & 0x40 != 0);
        if val & 0x80 != 0 {
            self.trigger();
        }
    }

    fn set_dac(&mut self, on: bool) {
        self.dac_enabled = on;
        if !on {
            self.sound_on = false;
        }
    }

    /// (Re)initialize the channel. SoundOn only latches if the DAC is on.
    pub fn trigger(&mut self) {
        self.sound_on = self.dac_enabled;
        self.length.trigger();
        match &mut self.voice {
            Voice::Pulse(p) => {
                p.envelope.trigger();
                if let Some(sweep) = p.sweep.as_mut() {
                    sweep.trigger();
                }
            }
            Voice::Wave(_) => self.phase = 0.0,
            Voice::Noise(n) => {
                n.envelope.trigger();
                n.lfsr = LFSR_SEED;
            }
        }
    }

    /// Apply one frame sequencer tick. Envelope and sweep only run while
    /// the channel is sounding.
    pub fn clock(&mut self, events: FrameEvents) {
        if events.length && self.length.clock() {
            self.sound_on = false;
        }
        if !self.sound_on {
            return;
        }
        match &mut self.voice {
            Voice::Pulse(p) => {
                if events.envelope {
                    p.envelope.clock();
                }
                if events.sweep {
                    let base = p.base_frequency();
                    if let Some(sweep) = p.sweep.as_mut() {
                        if sweep.clock(base) {
                            log::debug!(
                                "sweep overflow above {MAX_FREQUENCY_HZ} Hz, channel disabled"
                            );
                            self.sound_on = false;
                        }
                    }
                }
            }
            Voice::Noise(n) => {
                if events.envelope {
                    n.envelope.clock();
                }
            }
            Voice::Wave(_) => {}
        }
    }

    fn sync_table(&mut self) {
        match &mut self.voice {
            Voice::Pulse(p) => {
                if p.built_duty == Some(p.duty) {
                    return;
                }
                self.table.clear();
                self.table.extend(
                    DUTY_TABLE[p.duty as usize & 3]
                        .iter()
                        .map(|&high| if high != 0 { 1.0 } else { -1.0 }),
                );
                p.built_duty = Some(p.duty);
            }
            Voice::Wave(w) => {
                if !w.dirty {
                    return;
                }
                let scale = WAVE_LEVEL_SCALE[w.level as usize];
                self.table.clear();
                for byte in w.ram {
                    for nibble in [byte >> 4, byte & 0x0F] {
                        self.table.push((nibble as f32 / 7.5 - 1.0) * scale);
                    }
                }
                debug_assert_eq!(self.table.len(), WAVE_STEPS);
                w.dirty = false;
            }
            Voice::Noise(_) => return,
        }
        self.table_builds += 1;
    }

    /// Produce one sample at `sample_rate` and advance the phase.
    ///
    /// The phase advances even when the result is gated to silence.
    pub fn sample(&mut self, sample_rate: f32) -> f32 {
        self.sync_table();
        let freq = self.frequency();
        let amplitude = self.amplitude();
        let value = match &mut self.voice {
            Voice::Noise(n) => {
                let value = if n.lfsr & 1 == 0 { 1.0 } else { -1.0 };
                self.phase += freq / sample_rate;
                while self.phase >= 1.0 {
                    self.phase -= 1.0;
                    n.clock_lfsr();
                }
                value
            }
            Voice::Pulse(_) | Voice::Wave(_) => {
                let len = self.table.len() as f32;
                let value = self.table[self.phase as usize % self.table.len()];
                self.phase = (self.phase + len * (freq / sample_rate)) % len;
                value
            }
        };
        if self.sound_on && self.dac_enabled {
            value * amplitude
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPE_TICK: FrameEvents = FrameEvents {
        length: false,
        envelope: true,
        sweep: false,
    };
    const SWEEP_TICK: FrameEvents = FrameEvents {
        length: false,
        envelope: false,
        sweep: true,
    };
    const LENGTH_TICK: FrameEvents = FrameEvents {
        length: true,
        envelope: false,
        sweep: false,
    };

    fn sounding_pulse(sweep: bool, nrx2: u8) -> Channel {
        let mut ch = Channel::pulse(sweep);
        ch.write_envelope(nrx2);
        ch.write_control(0x80);
        ch
    }

    #[test]
    fn envelope_steps_and_clamps() {
        let mut ch = sounding_pulse(false, 0xE9); // vol 14, increase, period 1
        ch.clock(ENVELOPE_TICK);
        assert_eq!(ch.envelope_volume(), Some(15));
        ch.clock(ENVELOPE_TICK);
        assert_eq!(ch.envelope_volume(), Some(15));

        let mut ch = sounding_pulse(false, 0x12); // vol 1, decrease, period 2
        ch.clock(ENVELOPE_TICK);
        assert_eq!(ch.envelope_volume(), Some(1));
        ch.clock(ENVELOPE_TICK);
        assert_eq!(ch.envelope_volume(), Some(0));
        for _ in 0..4 {
            ch.clock(ENVELOPE_TICK);
        }
        assert_eq!(ch.envelope_volume(), Some(0));
    }

    #[test]
    fn envelope_period_zero_is_disabled() {
        let mut ch = sounding_pulse(false, 0x80);
        for _ in 0..16 {
            ch.clock(ENVELOPE_TICK);
        }
        assert_eq!(ch.envelope_volume(), Some(8));
    }

    #[test]
    fn length_expiry_clears_sound_on() {
        let mut ch = Channel::pulse(false);
        ch.write_envelope(0xF0);
        ch.write_length(0x3E); // two ticks left
        ch.write_control(0xC0);
        assert!(ch.sound_on());
        ch.clock(LENGTH_TICK);
        assert!(ch.sound_on());
        ch.clock(LENGTH_TICK);
        assert!(!ch.sound_on());
        // Re-trigger reloads an expired counter to the full length.
        ch.write_control(0xC0);
        assert!(ch.sound_on());
        assert_eq!(ch.length().remaining(), PULSE_LENGTH_MAX);
    }

    #[test]
    fn continuous_mode_ignores_length() {
        let mut ch = sounding_pulse(false, 0xF0);
        ch.write_length(0x3F);
        for _ in 0..300 {
            ch.clock(LENGTH_TICK);
        }
        assert!(ch.sound_on());
    }

    #[test]
    fn dac_off_blocks_trigger() {
        let mut ch = sounding_pulse(false, 0x00);
        assert!(!ch.sound_on());
        ch.write_envelope(0x08);
        ch.trigger();
        assert!(ch.sound_on());
        ch.write_envelope(0x00);
        assert!(!ch.sound_on());
    }

    #[test]
    fn sweep_decrease_clamps_without_disabling() {
        let mut ch = sounding_pulse(true, 0xF0);
        ch.write_sweep(0x19); // period 1, decrease, shift 1
        ch.write_period_low(0x00);
        ch.write_control(0x84);
        for _ in 0..40 {
            ch.clock(SWEEP_TICK);
        }
        assert!(ch.sound_on());
        assert!(ch.frequency() >= 0.0);
    }

    #[test]
    fn sweep_needs_period_and_shift() {
        let mut ch = sounding_pulse(true, 0xF0);
        ch.write_sweep(0x10); // shift 0
        for _ in 0..10 {
            ch.clock(SWEEP_TICK);
        }
        assert_eq!(ch.sweep_offset_hz(), Some(0.0));
    }

    #[test]
    fn clearing_sweep_shift_drops_the_offset() {
        let mut ch = sounding_pulse(true, 0xF0);
        ch.write_sweep(0x11); // period 1, increase, shift 1
        ch.write_period_low(0x00);
        ch.write_control(0x84);
        let base = ch.frequency();
        ch.clock(SWEEP_TICK);
        assert!(ch.sweep_offset_hz().is_some_and(|hz| hz > 0.0));
        assert!(ch.frequency() > base);

        ch.write_sweep(0x10); // shift 0
        ch.clock(SWEEP_TICK);
        assert_eq!(ch.sweep_offset_hz(), Some(0.0));
        assert_eq!(ch.frequency(), base);
    }

    #[test]
    fn frequency_formulas() {
        let mut ch = Channel::pulse(false);
        ch.write_period_low(0x00);
        ch.write_control(0x07);
        assert_eq!(ch.frequency(), 131_072.0 / 256.0);
        ch.write_period_low(0xFF);
        assert_eq!(ch.frequency(), 131_072.0);

        let mut wave = Channel::wave();
        wave.write_period_low(0x00);
        wave.write_control(0x04);
        assert_eq!(wave.frequency(), 65_536.0 / 1024.0);

        let mut noise = Channel::noise();
        noise.write_noise_poly(0x00);
        assert_eq!(noise.frequency(), 524_288.0);
        noise.write_noise_poly(0x23);
        assert_eq!(noise.frequency(), 524_288.0 / 3.0 / 8.0);
    }

    #[test]
    fn duty_table_rebuilt_only_on_change() {
        let mut ch = sounding_pulse(false, 0xF0);
        ch.write_length(0x80);
        for _ in 0..100 {
            ch.sample(44_100.0);
        }
        assert_eq!(ch.table_builds(), 1);
        ch.write_length(0x80);
        ch.sample(44_100.0);
        assert_eq!(ch.table_builds(), 1);
        ch.write_length(0xC0);
        ch.sample(44_100.0);
        assert_eq!(ch.table_builds(), 2);
    }

    #[test]
    fn duty_ratio_matches_hardware() {
        let mut ch = sounding_pulse(false, 0xF0);
        ch.write_length(0x00); // 12.5%
        ch.sample(44_100.0);
        let high = ch.table.iter().filter(|&&v| v > 0.0).count();
        assert_eq!(high, 1);
        ch.write_length(0xC0); // 75%
        ch.sample(44_100.0);
        let high = ch.table.iter().filter(|&&v| v > 0.0).count();
        assert_eq!(high, 6);
    }

    #[test]
    fn wave_table_follows_ram_and_level() {
        let mut ch = Channel::wave();
        let mut ram = [0u8; 16];
        ram[0] = 0xF0;
        ch.load_wave_ram(&ram);
        ch.write_wave_level(0x20); // 100%
        ch.write_wave_dac(0x80);
        ch.write_control(0x80);
        ch.sample(44_100.0);
        assert_eq!(ch.table[0], 1.0);
        assert_eq!(ch.table[1], -1.0);
        let builds = ch.table_builds();
        ch.load_wave_ram(&ram);
        ch.sample(44_100.0);
        assert_eq!(ch.table_builds(), builds);
        ch.write_wave_level(0x40); // 50%
        ch.sample(44_100.0);
        assert_eq!(ch.table[0], 0.5);
        assert_eq!(ch.table_builds(), builds + 1);
    }

    #[test]
    fn noise_lfsr_is_pseudo_random() {
        let mut ch = Channel::noise();
        ch.write_envelope(0xF0);
        ch.write_noise_poly(0x00);
        ch.write_control(0x80);
        let samples: Vec<f32> = (0..64).map(|_| ch.sample(32_768.0)).collect();
        assert!(samples.iter().any(|&s| s > 0.0));
        assert!(samples.iter().any(|&s| s < 0.0));
    }

    #[test]
    fn silent_channel_still_advances_phase() {
        let mut ch = Channel::pulse(false);
        ch.write_period_low(0x00);
        ch.write_control(0x06);
        assert!(!ch.sound_on());
        assert_eq!(ch.sample(44_100.0), 0.0);
        assert!(ch.phase() > 0.0);
    }
}
