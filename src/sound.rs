//! Background music. Best effort: any audio failure is logged and play continues in silence.

use log::info;
#[cfg(feature = "audio")]
use log::warn;
use thiserror::Error;

#[cfg_attr(not(feature = "audio"), allow(dead_code))]
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoDevice,
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
    #[error("audio stream error: {0}")]
    Stream(String),
}

/// Music controls driven by the game lifecycle.
pub trait Music {
    fn play(&mut self);
    fn pause(&mut self);
    /// Stop for good; later calls are ignored.
    fn stop(&mut self);
}

/// No audio at all.
#[derive(Debug, Default)]
pub struct Silence;

impl Music for Silence {
    fn play(&mut self) {}
    fn pause(&mut self) {}
    fn stop(&mut self) {}
}

/// Open the background music, or silence when muted or when audio is unavailable.
pub fn open(muted: bool) -> Box<dyn Music> {
    if muted {
        info!("audio muted");
        return Box::new(Silence);
    }
    #[cfg(feature = "audio")]
    let music: Box<dyn Music> = Box::new(synth::Soundtrack::spawn());
    #[cfg(not(feature = "audio"))]
    let music: Box<dyn Music> = {
        info!("built without audio support; playing silently");
        Box::new(Silence)
    };
    music
}

/// Note frequencies (Hz) of the looping tune, one per beat; 0.0 is a rest.
#[cfg_attr(not(feature = "audio"), allow(dead_code))]
const MELODY: [f32; 16] = [
    659.25, 493.88, 523.25, 587.33, 523.25, 493.88, 440.0, 0.0, 440.0, 523.25, 659.25, 0.0,
    587.33, 523.25, 493.88, 0.0,
];

#[cfg_attr(not(feature = "audio"), allow(dead_code))]
const BEAT_SECS: f32 = 0.25;

/// Sample of the tune at time `t` seconds: a square-ish wave with a short decay per note.
#[cfg_attr(not(feature = "audio"), allow(dead_code))]
fn melody_sample(t: f32) -> f32 {
    let beat = (t / BEAT_SECS) as usize;
    let freq = MELODY[beat % MELODY.len()];
    if freq == 0.0 {
        return 0.0;
    }
    let in_note = t - beat as f32 * BEAT_SECS;
    let envelope = (1.0 - in_note / BEAT_SECS).max(0.0);
    let wave = (t * freq * std::f32::consts::TAU).sin();
    wave.signum() * 0.06 * envelope + wave * 0.04 * envelope
}

#[cfg(feature = "audio")]
mod synth {
    use super::{AudioError, BEAT_SECS, MELODY, Music, melody_sample, warn};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, SizedSample};
    use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
    use std::thread;

    enum Command {
        Play,
        Pause,
        Stop,
    }

    /// Owns a thread holding the cpal stream; the stream itself is not `Send`.
    pub struct Soundtrack {
        sender: Option<Sender<Command>>,
    }

    impl Soundtrack {
        pub fn spawn() -> Self {
            let (sender, receiver) = bounded(16);
            thread::spawn(move || {
                if let Err(e) = run_audio_thread(&receiver) {
                    warn!("audio disabled: {e}");
                }
            });
            Self::with_sender(sender)
        }

        fn with_sender(sender: Sender<Command>) -> Self {
            Self {
                sender: Some(sender),
            }
        }

        fn send(&mut self, command: Command) {
            let Some(sender) = &self.sender else {
                return;
            };
            match sender.try_send(command) {
                Ok(()) => {}
                // Thread still opening the device or falling behind; this command is lost.
                Err(TrySendError::Full(_)) => warn!("audio command queue full, dropping command"),
                // A dead audio thread closes the channel; stop talking to it.
                Err(TrySendError::Disconnected(_)) => self.sender = None,
            }
        }
    }

    impl Music for Soundtrack {
        fn play(&mut self) {
            self.send(Command::Play);
        }

        fn pause(&mut self) {
            self.send(Command::Pause);
        }

        fn stop(&mut self) {
            self.send(Command::Stop);
            self.sender = None;
        }
    }

    fn run_audio_thread(receiver: &Receiver<Command>) -> Result<(), AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into())?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into())?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into())?,
            other => return Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
        };

        while let Ok(command) = receiver.recv() {
            let result = match command {
                Command::Play => stream.play().map_err(|e| e.to_string()),
                Command::Pause => stream.pause().map_err(|e| e.to_string()),
                Command::Stop => break,
            };
            if let Err(e) = result {
                warn!("audio stream: {e}");
            }
        }
        Ok(())
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
    ) -> Result<cpal::Stream, AudioError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let sample_rate = config.sample_rate.0 as f32;
        let channels = config.channels as usize;
        let loop_secs = MELODY.len() as f32 * BEAT_SECS;
        let mut t = 0.0f32;

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let value = T::from_sample(melody_sample(t));
                        for sample in frame.iter_mut() {
                            *sample = value;
                        }
                        t = (t + 1.0 / sample_rate) % loop_secs;
                    }
                },
                |err| warn!("audio stream: {err}"),
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))?;
        // Created paused; the game calls play() on start.
        stream
            .pause()
            .map_err(|e| AudioError::Stream(e.to_string()))?;
        Ok(stream)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_full_queue_keeps_the_channel() {
            let (sender, receiver) = bounded(1);
            let mut music = Soundtrack::with_sender(sender);
            music.play();
            music.pause();
            music.play();
            assert!(music.sender.is_some());
            assert!(matches!(receiver.try_recv(), Ok(Command::Play)));
            music.pause();
            assert!(matches!(receiver.try_recv(), Ok(Command::Pause)));
        }

        #[test]
        fn test_dead_thread_closes_the_channel() {
            let (sender, receiver) = bounded(1);
            let mut music = Soundtrack::with_sender(sender);
            drop(receiver);
            music.play();
            assert!(music.sender.is_none());
            music.pause();
        }

        #[test]
        fn test_stop_sends_stop_and_goes_quiet() {
            let (sender, receiver) = bounded(4);
            let mut music = Soundtrack::with_sender(sender);
            music.stop();
            assert!(matches!(receiver.try_recv(), Ok(Command::Stop)));
            music.play();
            assert!(receiver.try_recv().is_err());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_muted_is_silent_and_safe() {
        let mut music = open(true);
        music.play();
        music.pause();
        music.stop();
        music.play();
    }

    #[test]
    fn test_melody_stays_in_range() {
        let mut t = 0.0;
        while t < 8.0 {
            let s = melody_sample(t);
            assert!((-0.11..=0.11).contains(&s), "sample {s} at {t}");
            t += 0.001;
        }
    }

    #[test]
    fn test_rests_are_silent() {
        // Beat 7 is a rest.
        assert_eq!(melody_sample(7.5 * BEAT_SECS), 0.0);
    }
}
