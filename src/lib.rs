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

//! Pcmwav, a wav decoding library with a 16-bit PCM encoder.
//!
//! Any wav file with integer PCM, IEEE float, A-law or Mu-law samples (also
//! when wrapped in a `WAVE_FORMAT_EXTENSIBLE` header) is decoded into
//! interleaved signed 16-bit samples. Writing always produces the minimal
//! 44-byte-header 16-bit PCM layout.
//!
//! Examples
//! ========
//!
//! The following example renders a 440 Hz sine wave, and stores it as as a
//! mono wav file with a sample rate of 44.1 kHz.
//!
//! ```no_run
//! use std::f32::consts::PI;
//!
//! let spec = pcmwav::WavSpec {
//!     channels: 1,
//!     sample_rate: 44100,
//! };
//! let samples: Vec<i16> = (0 .. 44100)
//!     .map(|x| x as f32 / 44100.0)
//!     .map(|t| ((t * 440.0 * 2.0 * PI).sin() * i16::MAX as f32) as i16)
//!     .collect();
//! pcmwav::save("sine.wav", spec, 44100, &samples).unwrap();
//! ```
//!
//! The following example computes the root mean square (RMS) of an audio
//! file, whatever its encoding.
//!
//! ```no_run
//! let decoded = pcmwav::load("sine.wav").unwrap();
//! let sqr_sum = decoded.samples.iter()
//!                      .fold(0.0, |sqr_sum, &s| {
//!     let sample = s as f64;
//!     sqr_sum + sample * sample
//! });
//! println!("RMS is {}", (sqr_sum / decoded.samples.len() as f64).sqrt());
//! ```

#![warn(missing_docs)]

use std::io;
use std::result;

mod guid;
mod read;
mod sample;
pub mod source;
pub mod wav;
mod write;

pub use guid::Guid;
pub use read::{WavReader, WavIntoSamples, WavSamples, decode, load, read_until_data,
               read_wave_header};
pub use sample::{Encoding, decode_sample};
pub use write::{WavWriter, save, write_pcm16};

/// The format tag found in the fmt chunk.
///
/// The different format tag definitions can be found in mmreg.h that is part
/// of the Windows SDK. The vast majority are esoteric vendor-specific formats,
/// only the ones below are of interest here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioFormat {
    /// `WAVE_FORMAT_UNKNOWN`, a zero format tag.
    None,
    /// `WAVE_FORMAT_PCM`, integer samples.
    Pcm,
    /// `WAVE_FORMAT_ADPCM`, Microsoft ADPCM. Recognized but not decoded.
    AdPcm,
    /// `WAVE_FORMAT_IEEE_FLOAT`, floating point samples in the range [-1.0, 1.0].
    IeeeFloat,
    /// `WAVE_FORMAT_ALAW`, 8-bit G.711 A-law.
    ALaw,
    /// `WAVE_FORMAT_MULAW`, 8-bit G.711 µ-law.
    MuLaw,
    /// `WAVE_FORMAT_EXTENSIBLE`, the actual encoding is given by a sub-format GUID.
    Extensible,
    /// Any other format tag.
    Other(u16),
}

impl AudioFormat {
    /// Maps a raw format tag to the corresponding variant.
    pub fn from_code(code: u16) -> AudioFormat {
        match code {
            0x0000 => AudioFormat::None,
            0x0001 => AudioFormat::Pcm,
            0x0002 => AudioFormat::AdPcm,
            0x0003 => AudioFormat::IeeeFloat,
            0x0006 => AudioFormat::ALaw,
            0x0007 => AudioFormat::MuLaw,
            0xfffe => AudioFormat::Extensible,
            other => AudioFormat::Other(other),
        }
    }

    /// Returns the raw format tag.
    pub fn code(self) -> u16 {
        match self {
            AudioFormat::None => 0x0000,
            AudioFormat::Pcm => 0x0001,
            AudioFormat::AdPcm => 0x0002,
            AudioFormat::IeeeFloat => 0x0003,
            AudioFormat::ALaw => 0x0006,
            AudioFormat::MuLaw => 0x0007,
            AudioFormat::Extensible => 0xfffe,
            AudioFormat::Other(code) => code,
        }
    }
}

#[test]
fn audio_format_code_is_bijective() {
    for code in 0..=u16::MAX {
        assert_eq!(code, AudioFormat::from_code(code).code());
    }
    assert_eq!(AudioFormat::from_code(65534), AudioFormat::Extensible);
    assert_eq!(AudioFormat::from_code(0x55), AudioFormat::Other(0x55));
}

/// Specifies properties of the audio data.
///
/// Decoded samples are always 16-bit signed integers, so unlike the fmt
/// chunk this carries no bit depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavSpec {
    /// The number of channels.
    pub channels: u16,

    /// The number of samples per second.
    ///
    /// A common value is 44100, this is 44.1 kHz which is used for CD audio.
    pub sample_rate: u32,
}

/// The result of decoding a complete wav stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    /// Interleaved samples, frame by frame.
    pub samples: Vec<i16>,

    /// Channel count and sample rate as found in the fmt chunk.
    pub spec: WavSpec,

    /// The number of frames (samples per channel) that were decoded.
    pub frames: u32,
}

/// The error type for all operations in Pcmwav.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The stream does not start with a RIFF header of form type WAVE.
    #[error("not a RIFF WAVE stream: {0}")]
    BadContainer(&'static str),

    /// A chunk claims more bytes than remain in the stream.
    #[error("the stream ended before the end of a chunk")]
    TruncatedStream,

    /// A data chunk was encountered before any fmt chunk.
    #[error("the data chunk is not preceded by a fmt chunk")]
    MissingFormatChunk,

    /// There is no decoding rule for this bit depth in this format.
    #[error("{bits} bits per sample is not supported for {format:?} samples")]
    UnsupportedBitDepth {
        /// The format in which the samples are stored.
        format: AudioFormat,
        /// The declared bits per sample.
        bits: u16,
    },

    /// There is no decoding rule for this format.
    #[error("the wave format {0:?} is not supported")]
    UnsupportedFormat(AudioFormat),

    /// A GUID string is not `0x` followed by 32 hex digits.
    #[error("malformed GUID string")]
    MalformedGuid,

    /// Ill-formed chunk contents were encountered.
    #[error("ill-formed chunk: {0}")]
    MalformedChunk(&'static str),

    /// The parameters passed to the writer cannot describe a valid file.
    #[error("invalid wav spec: {0}")]
    InvalidSpec(&'static str),

    /// The number of samples does not match the declared frame count.
    #[error("expected {expected} samples, got {actual}")]
    SampleCountMismatch {
        /// The number of samples implied by the frame and channel count.
        expected: u64,
        /// The number of samples that was supplied.
        actual: u64,
    },

    /// The writer was finalized before all declared samples were written.
    #[error("the writer was finalized before all declared samples were written")]
    UnfinishedSample,

    /// An IO error occurred in the underlying reader or writer.
    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        // Running out of input in the middle of a chunk is a property of the
        // stream, not of the medium it came from.
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::TruncatedStream
        } else {
            Error::Io(err)
        }
    }
}

/// A type for results generated by Pcmwav where the error type is hard-wired.
pub type Result<T> = result::Result<T, Error>;

#[test]
fn unexpected_eof_becomes_truncated_stream() {
    let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "short read");
    assert!(matches!(Error::from(eof), Error::TruncatedStream));

    let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
    assert!(matches!(Error::from(denied), Error::Io(_)));
}

#[test]
fn write_read_i16_is_lossless() {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 44100,
    };
    let samples: Vec<i16> = (-1024_i16..1024).collect();

    let mut buffer = Vec::new();
    write_pcm16(&mut buffer, spec, 1024, &samples).unwrap();

    let decoded = decode(io::Cursor::new(buffer)).unwrap();
    assert_eq!(decoded.spec, spec);
    assert_eq!(decoded.frames, 1024);
    assert_eq!(decoded.samples, samples);
}

#[test]
fn write_read_extremes_is_lossless() {
    let spec = WavSpec {
        channels: 3,
        sample_rate: 8000,
    };
    let samples = [i16::MIN, 0, i16::MAX, -1, 1, i16::MIN + 1];

    let mut buffer = Vec::new();
    write_pcm16(&mut buffer, spec, 2, &samples).unwrap();

    let mut reader = WavReader::new(io::Cursor::new(buffer)).unwrap();
    assert_eq!(reader.spec(), spec);
    assert_eq!(reader.duration(), 2);
    assert_eq!(reader.len(), 6);
    let read: Vec<i16> = reader.samples().map(|s| s.unwrap()).collect();
    assert_eq!(&read[..], &samples[..]);
}

#[test]
fn stereo_48k_scenario_round_trips() {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 48000,
    };
    let samples: Vec<i16> = (0..100).flat_map(|_| vec![1000, -1000]).collect();

    let mut buffer = Vec::new();
    write_pcm16(&mut buffer, spec, 100, &samples).unwrap();

    // The data chunk header sits right after the 16-byte fmt chunk.
    assert_eq!(&buffer[36..40], b"data");
    assert_eq!(&buffer[40..44], &400_u32.to_le_bytes());
    assert_eq!(buffer.len(), 44 + 400);

    let decoded = decode(io::Cursor::new(buffer)).unwrap();
    assert_eq!(decoded.spec.sample_rate, 48000);
    assert_eq!(decoded.spec.channels, 2);
    assert_eq!(decoded.frames, 100);
    assert_eq!(decoded.samples, samples);
}
