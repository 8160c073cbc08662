#[cfg(feature = "playback")]
mod audio;
mod config;

use clap::Parser;
use log::{LevelFilter, info, warn};
use pocket_emu_core::{
    apu::M_CYCLE_HZ,
    audio_queue::{AudioConsumer, Frame},
    cartridge::Cartridge,
    diagnostics::LogDiagnostics,
    gameboy::{GameBoy, RunExit},
    hardware::DmgRevision,
};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::EmuConfig;

const DEFAULT_SECONDS: f64 = 3.0;
// Cycles per run_for call: 1/64 s.
const CHUNK_CYCLES: u64 = M_CYCLE_HZ / 64;

#[derive(Parser, Debug)]
#[command(name = "pocket-emu", about = "Headless DMG CPU and sound core runner")]
struct Args {
    /// Path to ROM file
    #[arg(required_unless_present = "write_config")]
    rom: Option<PathBuf>,

    /// Number of machine cycles to run
    #[arg(long, conflicts_with = "seconds")]
    cycles: Option<u64>,

    /// Number of emulated seconds to run
    #[arg(long)]
    seconds: Option<f64>,

    /// Write the mixed stereo output to this WAV file
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Log every executed instruction
    #[arg(long)]
    trace: bool,

    /// Silence all audio output
    #[arg(long)]
    mute: bool,

    /// Silence one channel (1-4); may be repeated
    #[arg(long = "mute-channel", value_parser = clap::value_parser!(u8).range(1..=4))]
    mute_channel: Vec<u8>,

    /// Config file (defaults to the per-user config path)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// DMG revision: 0, A, B or C
    #[arg(long)]
    revision: Option<String>,

    /// Stream audio to the default output device
    #[arg(long)]
    play: bool,

    /// Save the merged settings to the config file and exit
    #[arg(long)]
    write_config: bool,
}

/// Config file merged with command-line overrides.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    budget: u64,
    sample_rate: u32,
    mute: bool,
    muted_channels: Vec<usize>,
    trace: bool,
    revision: DmgRevision,
}

fn resolve(args: &Args, cfg: &EmuConfig) -> Result<Settings, Box<dyn std::error::Error>> {
    let budget = match (args.cycles, args.seconds) {
        (Some(cycles), _) => cycles,
        (None, Some(seconds)) if seconds <= 0.0 => return Err("seconds must be positive".into()),
        (None, seconds) => {
            let seconds = seconds.unwrap_or(DEFAULT_SECONDS);
            (seconds * M_CYCLE_HZ as f64).ceil() as u64
        }
    };

    let revision = match args.revision.as_deref() {
        Some(name) => match DmgRevision::parse(name) {
            Some(revision) => revision,
            None => return Err(format!("unknown DMG revision: {name}").into()),
        },
        None => cfg.dmg_revision(),
    };

    let mut muted_channels: Vec<usize> = cfg.muted_channel_indices().collect();
    muted_channels.extend(args.mute_channel.iter().map(|&n| n as usize - 1));
    muted_channels.sort_unstable();
    muted_channels.dedup();

    Ok(Settings {
        budget,
        sample_rate: args.sample_rate.unwrap_or(cfg.sample_rate),
        mute: args.mute || cfg.mute,
        muted_channels,
        trace: args.trace || cfg.trace,
        revision,
    })
}

impl Settings {
    /// The persistent part of the settings, as written by `--write-config`.
    fn to_config(&self) -> EmuConfig {
        EmuConfig {
            sample_rate: self.sample_rate,
            mute: self.mute,
            mute_channels: self.muted_channels.iter().map(|&i| i as u8 + 1).collect(),
            trace: self.trace,
            revision: Some(self.revision.name().to_string()),
        }
    }
}

// Status lines only exist while the CPU tracer is on.
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("pocket_emu::diag", LevelFilter::Trace)
        .init();
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn create_wav(path: &Path, sample_rate: u32) -> Result<WavOut, Box<dyn std::error::Error>> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    if let Some(parent) = path
        .parent()
        .and_then(|p| (!p.as_os_str().is_empty()).then_some(p))
    {
        fs::create_dir_all(parent)?;
    }
    Ok(hound::WavWriter::create(path, spec)?)
}

type WavOut = hound::WavWriter<std::io::BufWriter<fs::File>>;

/// Where drained frames go.
struct Sinks {
    wav: Option<WavOut>,
    #[cfg(feature = "playback")]
    playback: Option<audio::Playback>,
    frames: u64,
}

impl Sinks {
    fn drain(&mut self, consumer: &AudioConsumer) -> Result<(), hound::Error> {
        let mut buf = [[0.0f32; 2]; 512];
        loop {
            let n = consumer.pop_into(&mut buf);
            if n == 0 {
                return Ok(());
            }
            for &frame in &buf[..n] {
                self.write(frame)?;
            }
        }
    }

    fn write(&mut self, [left, right]: Frame) -> Result<(), hound::Error> {
        if let Some(wav) = self.wav.as_mut() {
            wav.write_sample(to_i16(left))?;
            wav.write_sample(to_i16(right))?;
        }
        self.play([left, right]);
        self.frames += 1;
        Ok(())
    }

    /// Blocks until the device queue has room, pacing emulation to playback.
    #[cfg(feature = "playback")]
    fn play(&self, frame: Frame) {
        if let Some(playback) = self.playback.as_ref() {
            while !playback.push(frame) {
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
        }
    }

    #[cfg(not(feature = "playback"))]
    fn play(&self, _frame: Frame) {}

    fn finish(self) -> Result<(), hound::Error> {
        match self.wav {
            Some(wav) => wav.finalize(),
            None => Ok(()),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    init_logging();

    let cfg_path = match &args.config {
        Some(path) => path.clone(),
        None => config::default_config_path(),
    };
    let cfg = config::load_from_file(&cfg_path);
    let settings = resolve(&args, &cfg)?;

    if args.write_config {
        config::save_to_file(&cfg_path, &settings.to_config())?;
        println!("wrote {}", cfg_path.display());
        return Ok(());
    }
    info!("Using config {}", cfg_path.display());

    let rom = args.rom.as_deref().ok_or("no ROM supplied")?;
    let cart = Cartridge::from_file(rom)?;
    let mut gb = GameBoy::new_with_revision(settings.revision);
    gb.load_cart(cart);
    gb.cpu.set_trace(settings.trace);

    #[cfg(feature = "playback")]
    let playback = if args.play {
        let latency_ms = pocket_emu_core::apu::AUDIO_LATENCY_MS * 2;
        Some(audio::Playback::open(latency_ms)?)
    } else {
        None
    };
    // The device dictates the rate when playing.
    #[cfg(feature = "playback")]
    let sample_rate = playback
        .as_ref()
        .map_or(settings.sample_rate, audio::Playback::sample_rate);
    #[cfg(not(feature = "playback"))]
    let sample_rate = {
        if args.play {
            warn!("built without the `playback` feature; --play ignored");
        }
        settings.sample_rate
    };

    let apu = &mut gb.mmu.apu;
    apu.set_mute(settings.mute);
    for &ch in &settings.muted_channels {
        apu.set_channel_mute(ch, true);
    }
    // A quarter second of slack; the queue is drained after every chunk.
    let consumer = apu.enable_output_with_capacity(sample_rate, sample_rate as usize / 4);

    let mut sinks = Sinks {
        wav: match args.wav.as_deref() {
            Some(path) => Some(create_wav(path, sample_rate)?),
            None => None,
        },
        #[cfg(feature = "playback")]
        playback,
        frames: 0,
    };

    let mut diag = LogDiagnostics::new();
    let mut spent = 0u64;
    let mut fault = None;
    while spent < settings.budget {
        let chunk = CHUNK_CYCLES.min(settings.budget - spent);
        let (ran, exit) = gb.run_for(chunk, &mut diag);
        spent += ran;
        sinks.drain(&consumer)?;
        match exit {
            RunExit::BudgetSpent => {}
            RunExit::Paused => {
                info!("Paused after {spent} cycles");
                break;
            }
            RunExit::Faulted(f) => {
                fault = Some(f);
                break;
            }
        }
    }
    sinks.drain(&consumer)?;

    let frames = sinks.frames;
    sinks.finish()?;

    let dropped = gb.mmu.apu.dropped_frames();
    if dropped > 0 {
        warn!("{dropped} audio frames dropped");
    }
    match args.wav.as_deref() {
        Some(path) => println!(
            "ran {spent} cycles; wrote {frames} stereo frames to {}",
            path.display()
        ),
        None => println!("ran {spent} cycles; produced {frames} stereo frames"),
    }

    match fault {
        Some(f) => Err(f.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["pocket-emu", "game.gb"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_run_three_seconds() {
        let s = resolve(&args(&[]), &EmuConfig::default()).unwrap();
        assert_eq!(s.budget, 3 * M_CYCLE_HZ);
        assert_eq!(s.revision, DmgRevision::RevC);
        assert!(!s.mute);
        assert!(s.muted_channels.is_empty());
    }

    #[test]
    fn flags_override_config() {
        let cfg = EmuConfig {
            sample_rate: 22_050,
            mute_channels: vec![2],
            revision: Some("A".into()),
            ..EmuConfig::default()
        };
        let s = resolve(
            &args(&[
                "--cycles",
                "1000",
                "--mute-channel",
                "4",
                "--mute-channel",
                "2",
                "--revision",
                "0",
                "--sample-rate",
                "48000",
            ]),
            &cfg,
        )
        .unwrap();
        assert_eq!(s.budget, 1000);
        assert_eq!(s.muted_channels, vec![1, 3]);
        assert_eq!(s.revision, DmgRevision::Rev0);
        assert_eq!(s.sample_rate, 48_000);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Args::try_parse_from(["pocket-emu", "a.gb", "--mute-channel", "5"]).is_err());
        assert!(
            Args::try_parse_from(["pocket-emu", "a.gb", "--cycles", "1", "--seconds", "1"])
                .is_err()
        );
        assert!(resolve(&args(&["--seconds", "0"]), &EmuConfig::default()).is_err());
        assert!(resolve(&args(&["--revision", "Z"]), &EmuConfig::default()).is_err());
    }

    #[test]
    fn written_config_reproduces_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = EmuConfig {
            sample_rate: 32_000,
            ..EmuConfig::default()
        };
        let wanted = resolve(&args(&["--mute-channel", "3", "--revision", "B"]), &cfg).unwrap();
        config::save_to_file(&path, &wanted.to_config()).unwrap();

        let reloaded = resolve(&args(&[]), &config::load_from_file(&path)).unwrap();
        assert_eq!(reloaded, wanted);
    }

    #[test]
    fn write_config_needs_no_rom() {
        let parsed = Args::try_parse_from(["pocket-emu", "--write-config", "--mute"]).unwrap();
        assert!(parsed.write_config);
        assert!(parsed.rom.is_none());
        assert!(Args::try_parse_from(["pocket-emu", "--mute"]).is_err());
    }

    #[test]
    fn sample_conversion_clamps() {
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(1.5), i16::MAX);
        assert_eq!(to_i16(-1.5), -i16::MAX);
    }
}
