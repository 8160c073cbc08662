use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{info, warn};
use pocket_emu_core::audio_queue::{AudioConsumer, AudioProducer, Frame, audio_queue};

/// Default output device fed from its own frame queue.
///
/// The run loop copies mixed frames in with [`Playback::push`]; the device
/// callback drains them and plays silence on underrun.
pub struct Playback {
    _stream: cpal::Stream,
    producer: AudioProducer,
    sample_rate: u32,
}

impl Playback {
    pub fn open(latency_ms: u32) -> Result<Self, Box<dyn std::error::Error>> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("no default audio output device")?;
        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let sample_rate = config.sample_rate.0;
        let channels = config.channels as usize;

        let frames = (sample_rate as usize * latency_ms as usize / 1000).max(64);
        let (producer, consumer) = audio_queue(frames);
        let err_fn = |err| warn!("cpal stream error: {err}");

        let stream = match sample_format {
            cpal::SampleFormat::I16 => device.build_output_stream(
                &config,
                move |data: &mut [i16], _| {
                    fill(data, channels, &consumer, |s| (s * i16::MAX as f32) as i16)
                },
                err_fn,
                None,
            )?,
            cpal::SampleFormat::U16 => device.build_output_stream(
                &config,
                move |data: &mut [u16], _| {
                    fill(data, channels, &consumer, |s| {
                        ((s * i16::MAX as f32) as i32 + 32768) as u16
                    })
                },
                err_fn,
                None,
            )?,
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config,
                move |data: &mut [f32], _| fill(data, channels, &consumer, |s| s),
                err_fn,
                None,
            )?,
            other => return Err(format!("unsupported sample format {other:?}").into()),
        };
        stream.play()?;
        info!("Audio output: {sample_rate} Hz, {channels} channel(s)");

        Ok(Self {
            _stream: stream,
            producer,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns false if the device queue is full.
    pub fn push(&self, frame: Frame) -> bool {
        self.producer.push_frame(frame)
    }
}

fn fill<T: Copy>(
    data: &mut [T],
    channels: usize,
    consumer: &AudioConsumer,
    convert: impl Fn(f32) -> T,
) {
    for out in data.chunks_mut(channels) {
        let [left, right] = consumer.pop_frame().unwrap_or([0.0, 0.0]);
        out[0] = convert(left.clamp(-1.0, 1.0));
        if let Some(slot) = out.get_mut(1) {
            *slot = convert(right.clamp(-1.0, 1.0));
        }
        for slot in out.iter_mut().skip(2) {
            *slot = convert(0.0);
        }
    }
}
