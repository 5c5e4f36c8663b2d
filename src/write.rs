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

use std::fs;
use std::io;
use std::io::Write;
use std::path;
use log::debug;
use super::{Error, Result, WavSpec};
use super::wav::{ChunkHeader, FormatChunk, RiffHeader};

/// Extends the functionality of `io::Write` with additional methods.
///
/// The methods may be used on any type that implements `io::Write`.
pub trait WriteExt: io::Write {
    /// Writes a signed 16-bit integer in little endian format.
    fn write_le_i16(&mut self, x: i16) -> io::Result<()>;
}

impl<W> WriteExt for W where W: io::Write {
    #[inline(always)]
    fn write_le_i16(&mut self, x: i16) -> io::Result<()> {
        self.write_all(&x.to_le_bytes())
    }
}

/// The size of everything before the samples: RIFF header, 16-byte fmt chunk
/// and data chunk header.
const HEADER_LEN: u32 = 12 + 8 + 16 + 8;

/// Checks the spec and frame count, returns the size of the data chunk.
pub(crate) fn data_len(spec: WavSpec, num_frames: u32) -> Result<u32> {
    if spec.channels == 0 {
        return Err(Error::InvalidSpec("a file must have at least one channel"));
    }
    // The block align field is 16 bits wide.
    if spec.channels > u16::MAX / 2 {
        return Err(Error::InvalidSpec("too many channels for 16-bit samples"));
    }
    if spec.sample_rate == 0 {
        return Err(Error::InvalidSpec("the sample rate must be positive"));
    }
    // The byte rate field must fit as well.
    if spec.sample_rate.checked_mul(2 * spec.channels as u32).is_none() {
        return Err(Error::InvalidSpec("the byte rate does not fit in 32 bits"));
    }
    (num_frames as u64 * spec.channels as u64 * 2)
        .checked_add((HEADER_LEN - 8) as u64)
        .filter(|&len| len <= u32::MAX as u64)
        .map(|len| len as u32 - (HEADER_LEN - 8))
        .ok_or(Error::InvalidSpec("the data does not fit in a wav file"))
}

/// A writer that accepts samples and writes a 16-bit PCM wav stream.
///
/// The number of frames must be known up front, so the complete header is
/// written before the first sample and the underlying writer need not be
/// seekable. After all samples have been written, call `finalize` to flush
/// the stream and verify that the declared number of samples was written.
pub struct WavWriter<W> where W: io::Write {
    /// Specifies properties of the audio data.
    spec: WavSpec,

    /// The number of samples that the header declares, over all channels.
    num_samples: u64,

    /// The number of samples written so far.
    samples_written: u64,

    /// The writer that will be written to.
    writer: io::BufWriter<W>,
}

impl<W> WavWriter<W> where W: io::Write {
    /// Creates a writer that writes the WAVE format to the underlying writer.
    ///
    /// The header is written immediately. `WavWriter` employs buffering
    /// internally to avoid too many `write` calls to the underlying writer.
    pub fn new(writer: W, spec: WavSpec, num_frames: u32) -> Result<WavWriter<W>> {
        let data_len = data_len(spec, num_frames)?;
        let mut writer = WavWriter {
            spec: spec,
            num_samples: num_frames as u64 * spec.channels as u64,
            samples_written: 0,
            writer: io::BufWriter::new(writer),
        };
        writer.write_header(data_len)?;
        Ok(writer)
    }

    /// Writes the RIFF WAVE header, the fmt chunk and the data chunk header.
    fn write_header(&mut self, data_len: u32) -> io::Result<()> {
        let mut header = [0u8; HEADER_LEN as usize];

        // Write the header in-memory first.
        {
            let mut buffer: io::Cursor<&mut [u8]> = io::Cursor::new(&mut header);
            // The RIFF length counts everything after its own 8 bytes.
            buffer.write_all(&RiffHeader { inner_len: HEADER_LEN - 8 + data_len }.to_bytes())?;
            buffer.write_all(&FormatChunk::pcm16(self.spec).to_bytes())?;
            buffer.write_all(&ChunkHeader { id: *b"data", len: data_len }.to_bytes())?;
        }

        // Then write the entire header at once.
        self.writer.write_all(&header)
    }

    /// Returns the spec that the header was written with.
    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    /// Writes a single sample for one channel.
    ///
    /// WAVE interleaves channel data, so the channel that this writes the
    /// sample to depends on previous writes. Writing more samples than the
    /// header declares fails with `Error::SampleCountMismatch`.
    pub fn write_sample(&mut self, sample: i16) -> Result<()> {
        if self.samples_written == self.num_samples {
            return Err(Error::SampleCountMismatch {
                expected: self.num_samples,
                actual: self.num_samples + 1,
            });
        }
        self.writer.write_le_i16(sample)?;
        self.samples_written += 1;
        Ok(())
    }

    /// Flushes the stream and returns the underlying writer.
    ///
    /// This must be called after all samples have been written. If fewer
    /// samples were written than the header declares, the data is still
    /// flushed, but the stream is ill-formed, and `Error::UnfinishedSample`
    /// is returned.
    pub fn finalize(mut self) -> Result<W> {
        self.writer.flush()?;
        if self.samples_written != self.num_samples {
            return Err(Error::UnfinishedSample);
        }
        self.writer.into_inner().map_err(|err| Error::from(err.into_error()))
    }
}

/// Writes a complete 16-bit PCM wav stream.
///
/// `samples` holds `num_frames` frames of `spec.channels` interleaved samples.
pub fn write_pcm16<W: io::Write>(writer: W, spec: WavSpec, num_frames: u32, samples: &[i16])
                                 -> Result<()> {
    check_sample_count(spec, num_frames, samples)?;
    let mut writer = WavWriter::new(writer, spec, num_frames)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Writes a 16-bit PCM wav file.
///
/// `samples` holds `num_frames` frames of `spec.channels` interleaved samples.
/// The parameters are checked before the file is created, so invalid input
/// leaves no file behind. The file is overwritten if it exists, and it is
/// closed before this returns, whether writing succeeded or not.
pub fn save<P: AsRef<path::Path>>(filename: P, spec: WavSpec, num_frames: u32, samples: &[i16])
                                  -> Result<()> {
    check_sample_count(spec, num_frames, samples)?;
    data_len(spec, num_frames)?;
    let file = fs::File::create(filename.as_ref())?;
    write_pcm16(file, spec, num_frames, samples)?;
    debug!("wrote {} frames of {} channels at {} Hz to {}",
           num_frames, spec.channels, spec.sample_rate, filename.as_ref().display());
    Ok(())
}

fn check_sample_count(spec: WavSpec, num_frames: u32, samples: &[i16]) -> Result<()> {
    let expected = num_frames as u64 * spec.channels as u64;
    if samples.len() as u64 != expected {
        return Err(Error::SampleCountMismatch {
            expected: expected,
            actual: samples.len() as u64,
        });
    }
    Ok(())
}

#[test]
fn header_layout_is_minimal_pcm16() {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 48000,
    };
    let mut buffer = Vec::new();
    write_pcm16(&mut buffer, spec, 1, &[1, -1]).unwrap();

    assert_eq!(&buffer[..], &b"RIFF\x28\x00\x00\x00WAVE\
fmt \x10\x00\x00\x00\x01\x00\x02\x00\x80\xbb\x00\x00\x00\xee\x02\x00\x04\x00\x10\x00\
data\x04\x00\x00\x00\x01\x00\xff\xff"[..]);
}

#[test]
fn empty_file_is_valid() {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 8000,
    };
    let mut buffer = Vec::new();
    write_pcm16(&mut buffer, spec, 0, &[]).unwrap();
    assert_eq!(buffer.len(), 44);
    assert_eq!(&buffer[4..8], &36_u32.to_le_bytes());
    assert_eq!(&buffer[40..44], &[0, 0, 0, 0]);
}

#[test]
fn sample_count_must_match_frames() {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 44100,
    };
    let mut buffer = Vec::new();
    match write_pcm16(&mut buffer, spec, 3, &[1, 2, 3, 4, 5]) {
        Err(Error::SampleCountMismatch { expected: 6, actual: 5 }) => {}
        other => panic!("expected SampleCountMismatch, got {:?}", other),
    }
    assert!(buffer.is_empty());
}

#[test]
fn invalid_specs_are_rejected() {
    let specs = [WavSpec { channels: 0, sample_rate: 44100 },
                 WavSpec { channels: 1, sample_rate: 0 },
                 WavSpec { channels: 2, sample_rate: u32::MAX }];
    for &spec in &specs {
        let mut buffer = Vec::new();
        match WavWriter::new(&mut buffer, spec, 0) {
            Err(Error::InvalidSpec(..)) => {}
            Err(err) => panic!("expected InvalidSpec, got {:?}", err),
            Ok(..) => panic!("expected InvalidSpec for {:?}", spec),
        };
    }

    // 2^31 stereo frames need 2^33 bytes.
    let spec = WavSpec { channels: 2, sample_rate: 44100 };
    assert!(matches!(data_len(spec, 1 << 31), Err(Error::InvalidSpec(..))));
}

#[test]
fn short_write_should_signal_error() {
    let spec = WavSpec {
        channels: 17,
        sample_rate: 48000,
    };

    // Deliberately write one sample less than 17 * 5.
    let mut buffer = Vec::new();
    let mut writer = WavWriter::new(&mut buffer, spec, 5).unwrap();
    for s in 0..17 * 5 - 1 {
        writer.write_sample(s).unwrap();
    }
    match writer.finalize() {
        Err(Error::UnfinishedSample) => {}
        _ => panic!("UnfinishedSample error should have been returned."),
    }
}

#[test]
fn long_write_should_signal_error() {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 48000,
    };
    let mut writer = WavWriter::new(Vec::new(), spec, 2).unwrap();
    writer.write_sample(1).unwrap();
    writer.write_sample(2).unwrap();
    assert!(matches!(writer.write_sample(3),
                     Err(Error::SampleCountMismatch { expected: 2, actual: 3 })));
    let buffer = writer.finalize().unwrap();
    assert_eq!(buffer.len(), 44 + 4);
}
