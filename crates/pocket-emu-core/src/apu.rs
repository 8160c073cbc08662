mod channel;
mod sequencer;

pub use channel::{
    Channel, Envelope, LengthCounter, MAX_FREQUENCY_HZ, Noise, PULSE_LENGTH_MAX, Pulse, Sweep,
    Voice, WAVE_LENGTH_MAX, Wave,
};
pub use sequencer::{FrameEvents, FrameSequencer};

use crate::audio_queue::{AudioConsumer, AudioProducer, Frame, audio_queue};

#[cfg(feature = "apu-trace")]
macro_rules! apu_trace {
    ($($arg:tt)*) => {
        log::trace!(target: "pocket_emu::apu", $($arg)*);
    };
}
#[cfg(not(feature = "apu-trace"))]
macro_rules! apu_trace {
    ($($arg:tt)*) => {};
}

/// Machine cycles per second.
pub const M_CYCLE_HZ: u64 = 1_048_576;
// 512 Hz frame sequencer tick, in machine cycles.
const FRAME_SEQUENCER_PERIOD: u64 = 2048;
pub const AUDIO_LATENCY_MS: u32 = 40;
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
/// Per-channel output scale; four full-volume channels stay below 1.0.
pub const HEADROOM: f32 = 0.2;

pub const NR10: u16 = 0xFF10;
pub const NR11: u16 = 0xFF11;
pub const NR12: u16 = 0xFF12;
pub const NR13: u16 = 0xFF13;
pub const NR14: u16 = 0xFF14;
pub const NR21: u16 = 0xFF16;
pub const NR22: u16 = 0xFF17;
pub const NR23: u16 = 0xFF18;
pub const NR24: u16 = 0xFF19;
pub const NR30: u16 = 0xFF1A;
pub const NR31: u16 = 0xFF1B;
pub const NR32: u16 = 0xFF1C;
pub const NR33: u16 = 0xFF1D;
pub const NR34: u16 = 0xFF1E;
pub const NR41: u16 = 0xFF20;
pub const NR42: u16 = 0xFF21;
pub const NR43: u16 = 0xFF22;
pub const NR44: u16 = 0xFF23;
pub const NR50: u16 = 0xFF24;
pub const NR51: u16 = 0xFF25;
pub const NR52: u16 = 0xFF26;
pub const WAVE_RAM_START: u16 = 0xFF30;
pub const WAVE_RAM_END: u16 = 0xFF3F;

// NR50/NR51 as left by the DMG boot ROM.
const BOOT_NR50: u8 = 0x77;
const BOOT_NR51: u8 = 0xF3;

/// Decoded NR51: which channels reach which terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Routing {
    pub left: [bool; 4],
    pub right: [bool; 4],
}

/// NR51 layout: bits 4-7 route channels 1-4 left, bits 0-3 route them right.
pub fn decode_routing(byte: u8) -> Routing {
    let mut routing = Routing::default();
    for ch in 0..4 {
        routing.left[ch] = byte & (0x10 << ch) != 0;
        routing.right[ch] = byte & (0x01 << ch) != 0;
    }
    routing
}

pub fn encode_routing(routing: Routing) -> u8 {
    let mut byte = 0u8;
    for ch in 0..4 {
        if routing.left[ch] {
            byte |= 0x10 << ch;
        }
        if routing.right[ch] {
            byte |= 0x01 << ch;
        }
    }
    byte
}

/// Four channels, the frame sequencer and the NR50-NR52 mixer.
///
/// Host-side options (global and per-channel mute, sample rate, attached
/// output queue) survive both NR52 power cycles and [`Apu::reset`].
pub struct Apu {
    channels: [Channel; 4],
    sequencer: FrameSequencer,
    regs: [u8; 0x30],
    wave_ram: [u8; 0x10],
    enabled: bool,
    nr50: u8,
    routing: Routing,
    mute: bool,
    muted_channels: [bool; 4],
    sample_rate: u32,
    sequencer_cycles: u64,
    sample_clock: u64,
    output: Option<AudioProducer>,
    dropped_frames: u64,
}

impl Apu {
    pub fn new() -> Self {
        Self {
            channels: Self::fresh_channels(),
            sequencer: FrameSequencer::new(),
            regs: [0; 0x30],
            wave_ram: [0; 0x10],
            enabled: true,
            nr50: BOOT_NR50,
            routing: decode_routing(BOOT_NR51),
            mute: false,
            muted_channels: [false; 4],
            sample_rate: DEFAULT_SAMPLE_RATE,
            sequencer_cycles: 0,
            sample_clock: 0,
            output: None,
            dropped_frames: 0,
        }
    }

    fn fresh_channels() -> [Channel; 4] {
        [
            Channel::pulse(true),
            Channel::pulse(false),
            Channel::wave(),
            Channel::noise(),
        ]
    }

    fn read_mask(addr: u16) -> u8 {
        match addr {
            NR10 => 0x80,
            NR11 => 0x3F,
            NR12 => 0x00,
            NR13 => 0xFF,
            NR14 => 0xBF,
            NR21 => 0x3F,
            NR22 => 0x00,
            NR23 => 0xFF,
            NR24 => 0xBF,
            NR30 => 0x7F,
            NR31 => 0xFF,
            NR32 => 0x9F,
            NR33 => 0xFF,
            NR34 => 0xBF,
            NR41 => 0xFF,
            NR42 => 0x00,
            NR43 => 0x00,
            NR44 => 0xBF,
            NR50 => 0x00,
            NR51 => 0x00,
            NR52 => 0x70,
            WAVE_RAM_START..=WAVE_RAM_END => 0x00,
            _ => 0xFF,
        }
    }

    /// Recreate every channel and clear the register file. Wave RAM and host
    /// options are kept.
    fn power_cycle(&mut self) {
        self.channels = Self::fresh_channels();
        self.channels[2].load_wave_ram(&self.wave_ram);
        self.sequencer.reset();
        self.sequencer_cycles = 0;
        self.regs.fill(0);
        self.nr50 = 0;
        self.routing = Routing::default();
    }

    /// Full audio reset: powered off, channels recreated, wave RAM cleared.
    pub fn reset(&mut self) {
        self.wave_ram = [0; 0x10];
        self.power_cycle();
        self.enabled = false;
        self.sample_clock = 0;
    }

    fn set_enabled(&mut self, on: bool) {
        if on == self.enabled {
            return;
        }
        log::debug!("APU master enable {}", if on { "on" } else { "off" });
        self.power_cycle();
        self.enabled = on;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn read_reg(&self, addr: u16) -> u8 {
        match addr {
            NR52 => {
                let status = self
                    .channels
                    .iter()
                    .enumerate()
                    .fold(0u8, |acc, (i, ch)| acc | ((ch.sound_on() as u8) << i));
                ((self.enabled as u8) << 7) | status | Apu::read_mask(addr)
            }
            NR50 => self.nr50,
            NR51 => encode_routing(self.routing),
            WAVE_RAM_START..=WAVE_RAM_END => self.wave_ram[(addr - WAVE_RAM_START) as usize],
            NR10..=WAVE_RAM_END => self.regs[(addr - NR10) as usize] | Apu::read_mask(addr),
            _ => 0xFF,
        }
    }

    pub fn write_reg(&mut self, addr: u16, val: u8) {
        match addr {
            WAVE_RAM_START..=WAVE_RAM_END => {
                self.wave_ram[(addr - WAVE_RAM_START) as usize] = val;
                self.channels[2].load_wave_ram(&self.wave_ram);
                return;
            }
            NR52 => {
                self.set_enabled(val & 0x80 != 0);
                return;
            }
            _ if !self.enabled => {
                apu_trace!("dropped write {addr:04X}={val:02X} while powered off");
                return;
            }
            NR10..=WAVE_RAM_END => self.regs[(addr - NR10) as usize] = val,
            _ => return,
        }

        apu_trace!("write {addr:04X}={val:02X}");
        match addr {
            NR10 => self.channels[0].write_sweep(val),
            NR11 => self.channels[0].write_length(val),
            NR12 => self.channels[0].write_envelope(val),
            NR13 => self.channels[0].write_period_low(val),
            NR14 => self.channels[0].write_control(val),
            NR21 => self.channels[1].write_length(val),
            NR22 => self.channels[1].write_envelope(val),
            NR23 => self.channels[1].write_period_low(val),
            NR24 => self.channels[1].write_control(val),
            NR30 => self.channels[2].write_wave_dac(val),
            NR31 => self.channels[2].write_length(val),
            NR32 => self.channels[2].write_wave_level(val),
            NR33 => self.channels[2].write_period_low(val),
            NR34 => self.channels[2].write_control(val),
            NR41 => self.channels[3].write_length(val),
            NR42 => self.channels[3].write_envelope(val),
            NR43 => self.channels[3].write_noise_poly(val),
            NR44 => self.channels[3].write_control(val),
            NR50 => self.nr50 = val,
            NR51 => self.routing = decode_routing(val),
            _ => {}
        }
    }

    /// Channel by zero-based index (0 = pulse with sweep, 3 = noise).
    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    /// Left/right master volume from NR50, each 0-7.
    pub fn master_volume(&self) -> (u8, u8) {
        ((self.nr50 >> 4) & 0x07, self.nr50 & 0x07)
    }

    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    pub fn muted(&self) -> bool {
        self.mute
    }

    pub fn set_channel_mute(&mut self, index: usize, mute: bool) {
        if let Some(slot) = self.muted_channels.get_mut(index) {
            *slot = mute;
        }
    }

    pub fn channel_muted(&self, index: usize) -> bool {
        self.muted_channels.get(index).copied().unwrap_or(false)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, rate: u32) {
        self.sample_rate = rate.max(1);
        self.sample_clock = 0;
    }

    /// Start producing frames at `sample_rate` into a fresh queue sized for
    /// [`AUDIO_LATENCY_MS`] of audio, and hand back its consumer.
    pub fn enable_output(&mut self, sample_rate: u32) -> AudioConsumer {
        self.set_sample_rate(sample_rate);
        let capacity = (self.sample_rate as usize * AUDIO_LATENCY_MS as usize / 1000).max(64);
        let (producer, consumer) = audio_queue(capacity);
        self.output = Some(producer);
        consumer
    }

    /// Like [`Apu::enable_output`] with an explicit queue capacity.
    pub fn enable_output_with_capacity(
        &mut self,
        sample_rate: u32,
        frames: usize,
    ) -> AudioConsumer {
        self.set_sample_rate(sample_rate);
        let (producer, consumer) = audio_queue(frames);
        self.output = Some(producer);
        consumer
    }

    /// Frames dropped because the consumer fell behind.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    pub fn sequencer_step(&self) -> u8 {
        self.sequencer.step()
    }

    /// Advance the frame sequencer by one 512 Hz tick and clock every channel
    /// from it. Does nothing while powered off.
    pub fn tick_frame_sequencer(&mut self) -> FrameEvents {
        if !self.enabled {
            return FrameEvents::default();
        }
        let events = self.sequencer.advance();
        for ch in &mut self.channels {
            ch.clock(events);
        }
        events
    }

    /// Fill `out` with mixed stereo frames at the configured sample rate.
    pub fn render(&mut self, out: &mut [Frame]) {
        for frame in out {
            *frame = self.mix_frame();
        }
    }

    fn mix_frame(&mut self) -> Frame {
        let rate = self.sample_rate as f32;
        let (left_vol, right_vol) = self.master_volume();
        let left_gain = left_vol as f32 / 7.0 * HEADROOM;
        let right_gain = right_vol as f32 / 7.0 * HEADROOM;
        let mut left = 0.0;
        let mut right = 0.0;
        for (i, ch) in self.channels.iter_mut().enumerate() {
            // Always sample so the phase keeps running under mute.
            let value = ch.sample(rate);
            if !self.enabled || self.mute || self.muted_channels[i] {
                continue;
            }
            if self.routing.left[i] {
                left += value * left_gain;
            }
            if self.routing.right[i] {
                right += value * right_gain;
            }
        }
        [left, right]
    }

    /// Advance by `m_cycles` machine cycles: clock the frame sequencer every
    /// 2048 cycles and, with an output attached, push frames at the sample
    /// rate.
    pub fn step(&mut self, m_cycles: u32) {
        if self.enabled {
            self.sequencer_cycles += m_cycles as u64;
            while self.sequencer_cycles >= FRAME_SEQUENCER_PERIOD {
                self.sequencer_cycles -= FRAME_SEQUENCER_PERIOD;
                self.tick_frame_sequencer();
            }
        }

        let Some(producer) = self.output.take() else {
            return;
        };
        self.sample_clock += m_cycles as u64 * self.sample_rate as u64;
        while self.sample_clock >= M_CYCLE_HZ {
            self.sample_clock -= M_CYCLE_HZ;
            let frame = self.mix_frame();
            if !producer.push_frame(frame) {
                self.dropped_frames += 1;
            }
        }
        self.output = Some(producer);
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_state_is_powered_with_routing() {
        let apu = Apu::new();
        assert!(apu.enabled());
        assert_eq!(apu.read_reg(NR50), 0x77);
        assert_eq!(apu.read_reg(NR51), 0xF3);
        assert_eq!(apu.read_reg(NR52), 0xF0);
    }

    #[test]
    fn routing_bits_map_to_terminals() {
        let r = decode_routing(0x12);
        assert!(r.left[0]);
        assert!(r.right[1]);
        assert!(!r.right[0]);
        assert!(!r.left[1]);
        assert_eq!(encode_routing(r), 0x12);
    }

    #[test]
    fn sample_clock_matches_rate() {
        let mut apu = Apu::new();
        let rx = apu.enable_output_with_capacity(32_768, 100_000);
        // One second of machine cycles.
        for _ in 0..1024 {
            apu.step(1024);
        }
        assert_eq!(rx.len(), 32_768);
        assert_eq!(apu.dropped_frames(), 0);
    }

    #[test]
    fn sequencer_runs_every_2048_cycles() {
        let mut apu = Apu::new();
        apu.step(2047);
        assert_eq!(apu.sequencer_step(), 0);
        apu.step(1);
        assert_eq!(apu.sequencer_step(), 1);
        apu.step(2048 * 7);
        assert_eq!(apu.sequencer_step(), 0);
    }

    #[test]
    fn huge_steps_keep_the_sequencer_count() {
        let mut apu = Apu::new();
        apu.step(2047);
        // 2047 + u32::MAX is 2^21 whole periods with 2046 cycles left over.
        apu.step(u32::MAX);
        assert_eq!(apu.sequencer_step(), 0);
        apu.step(1);
        assert_eq!(apu.sequencer_step(), 0);
        apu.step(1);
        assert_eq!(apu.sequencer_step(), 1);
    }

    #[test]
    fn channel_index_out_of_range_is_none() {
        let apu = Apu::new();
        assert!(apu.channel(3).is_some());
        assert!(apu.channel(4).is_none());
    }
}
