// Pcmwav -- A wav decoding and encoding library in Rust
// Copyright (C) 2015 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Exporting audio from an external decoder.
//!
//! Pcmwav does not decode compressed media itself. A media library that
//! indexes and decodes audio tracks can hand its output to Pcmwav by
//! implementing [`AudioSource`]; [`export`] then writes it as a wav file.
//! Such libraries typically need a process-wide initialization call before
//! first use, which [`initialize`] runs at most once.

use std::path;
use std::sync::OnceLock;
use log::debug;
use super::{AudioFormat, Error, Result, WavSpec};
use super::write;

/// Describes the audio that an `AudioSource` hands out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioProperties {
    /// The number of frames per second.
    pub sample_rate: u32,
    /// The number of interleaved channels.
    pub channels: u16,
    /// The number of bytes that one sample of one channel occupies.
    pub bytes_per_sample: u16,
    /// The length of the track in frames.
    pub num_samples: u64,
}

/// A decoded audio track provided by an external media library.
pub trait AudioSource {
    /// Returns the layout of the samples that `read_audio` produces.
    fn properties(&self) -> AudioProperties;

    /// Fills `buf` with `count` frames of interleaved samples, starting at
    /// frame `start`.
    ///
    /// Samples are in native byte order, `properties().bytes_per_sample`
    /// bytes each. `buf` is exactly `count * channels * bytes_per_sample`
    /// bytes long.
    fn read_audio(&mut self, buf: &mut [u8], start: u64, count: u64) -> Result<()>;
}

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Runs the media library's process-wide initialization, at most once.
///
/// Returns true if this call ran `init`. Concurrent callers block until the
/// first one has finished, so no caller proceeds before the library is
/// initialized.
pub fn initialize<F: FnOnce()>(init: F) -> bool {
    let mut ran = false;
    INITIALIZED.get_or_init(|| {
        init();
        ran = true;
    });
    ran
}

/// Returns whether `initialize` has completed.
pub fn is_initialized() -> bool {
    INITIALIZED.get().is_some()
}

/// Writes the complete track of `source` to a 16-bit PCM wav file.
///
/// The source must already produce 16-bit samples; converting other sample
/// formats is up to the source.
pub fn export<S, P>(source: &mut S, path: P) -> Result<()>
    where S: AudioSource + ?Sized,
          P: AsRef<path::Path>
{
    let props = source.properties();
    if props.bytes_per_sample != 2 {
        return Err(Error::UnsupportedBitDepth {
            format: AudioFormat::Pcm,
            bits: props.bytes_per_sample.saturating_mul(8),
        });
    }
    if props.num_samples > u32::MAX as u64 {
        return Err(Error::InvalidSpec("the track is too long for a wav file"));
    }

    let spec = WavSpec {
        channels: props.channels,
        sample_rate: props.sample_rate,
    };
    let num_frames = props.num_samples as u32;
    // The output must be writable before the source is asked for anything.
    write::data_len(spec, num_frames)?;
    let num_bytes = props.num_samples as usize * props.channels as usize * 2;
    debug!("exporting {} frames of {} channels at {} Hz",
           num_frames, props.channels, props.sample_rate);

    let mut buf = vec![0u8; num_bytes];
    source.read_audio(&mut buf, 0, props.num_samples)?;
    let samples: Vec<i16> = buf.chunks_exact(2)
                               .map(|b| i16::from_ne_bytes([b[0], b[1]]))
                               .collect();

    super::save(path, spec, num_frames, &samples)
}

#[cfg(test)]
struct RampSource {
    props: AudioProperties,
}

#[cfg(test)]
impl AudioSource for RampSource {
    fn properties(&self) -> AudioProperties {
        self.props
    }

    fn read_audio(&mut self, buf: &mut [u8], start: u64, count: u64) -> Result<()> {
        let channels = self.props.channels as u64;
        assert_eq!(buf.len() as u64, count * channels * 2);
        for (i, b) in buf.chunks_exact_mut(2).enumerate() {
            let value = ((start * channels + i as u64) as i16).wrapping_mul(100);
            b.copy_from_slice(&value.to_ne_bytes());
        }
        Ok(())
    }
}

#[test]
fn initialize_runs_once() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let count = AtomicUsize::new(0);
    let results: Vec<bool> = (0..3)
        .map(|_| initialize(|| { count.fetch_add(1, Ordering::SeqCst); }))
        .collect();

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(&results[..], &[true, false, false]);
    assert!(is_initialized());
}

#[test]
fn export_writes_source_samples() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.wav");

    let mut source = RampSource {
        props: AudioProperties {
            sample_rate: 22050,
            channels: 2,
            bytes_per_sample: 2,
            num_samples: 5,
        },
    };
    export(&mut source, &path).unwrap();

    let decoded = super::load(&path).unwrap();
    assert_eq!(decoded.spec, WavSpec { channels: 2, sample_rate: 22050 });
    assert_eq!(decoded.frames, 5);
    let expected: Vec<i16> = (0..10).map(|i| i * 100).collect();
    assert_eq!(decoded.samples, expected);
}

#[test]
fn export_rejects_wide_samples() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("float.wav");

    let mut source = RampSource {
        props: AudioProperties {
            sample_rate: 44100,
            channels: 1,
            bytes_per_sample: 4,
            num_samples: 1,
        },
    };
    match export(&mut source, &path) {
        Err(Error::UnsupportedBitDepth { bits: 32, .. }) => {}
        other => panic!("expected UnsupportedBitDepth, got {:?}", other),
    }
    assert!(!path.exists());
}

#[cfg(test)]
struct UnreadableSource {
    props: AudioProperties,
}

#[cfg(test)]
impl AudioSource for UnreadableSource {
    fn properties(&self) -> AudioProperties {
        self.props
    }

    fn read_audio(&mut self, _buf: &mut [u8], _start: u64, _count: u64) -> Result<()> {
        panic!("read_audio must not be called for an unwritable track");
    }
}

#[test]
fn export_checks_layout_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.wav");

    let layouts = [(40000, 44100, u32::MAX as u64),
                   (2, 44100, u32::MAX as u64),
                   (0, 44100, 1),
                   (1, 0, 1)];
    for &(channels, sample_rate, num_samples) in &layouts {
        let mut source = UnreadableSource {
            props: AudioProperties {
                sample_rate: sample_rate,
                channels: channels,
                bytes_per_sample: 2,
                num_samples: num_samples,
            },
        };
        match export(&mut source, &path) {
            Err(Error::InvalidSpec(..)) => {}
            other => panic!("expected InvalidSpec, got {:?}", other),
        };
    }
    assert!(!path.exists());
}
