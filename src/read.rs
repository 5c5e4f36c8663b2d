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

use std::cmp;
use std::fs;
use std::io;
use std::io::Read;
use std::path;
use log::{debug, trace, warn};
use super::{Decoded, Encoding, Error, Result, WavSpec};
use super::wav::{ChunkHeader, ChunkKind, FactChunk, FormatChunk, RiffHeader};

/// Extends the functionality of `io::Read` with additional methods.
///
/// The methods may be used on any type that implements `io::Read`.
pub trait ReadExt: io::Read {
    /// Reads as many bytes as `buf` is long.
    ///
    /// This may issue multiple `read` calls internally. An error of kind
    /// `UnexpectedEof` is returned if `read` read 0 bytes before the buffer is
    /// full.
    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Reads 4 bytes and returns them in an array.
    fn read_4_bytes(&mut self) -> io::Result<[u8; 4]>;

    /// Skip over `n` bytes.
    fn skip_bytes(&mut self, n: u64) -> io::Result<()>;
}

impl<R> ReadExt for R
    where R: io::Read
{
    #[inline(always)]
    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let mut n = 0;
        while n < buf.len() {
            let progress = match self.read(&mut buf[n..]) {
                Ok(progress) => progress,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            if progress > 0 {
                n += progress;
            } else {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "Failed to read enough bytes."));
            }
        }
        Ok(())
    }

    #[inline(always)]
    fn read_4_bytes(&mut self) -> io::Result<[u8; 4]> {
        let mut buf = [0_u8; 4];
        self.read_into(&mut buf[..])?;
        Ok(buf)
    }

    fn skip_bytes(&mut self, n: u64) -> io::Result<()> {
        // Read from the input in chunks of 1024 bytes at a time, and discard
        // the result. Skipping is not in a hot path, and this works for
        // readers that cannot seek.
        let mut n_read = 0;
        let mut buf = [0u8; 1024];
        while n_read < n {
            let end = cmp::min(n - n_read, 1024) as usize;
            let progress = match self.read(&mut buf[0..end]) {
                Ok(progress) => progress,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            if progress > 0 {
                n_read += progress as u64;
            } else {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "Failed to skip enough bytes."));
            }
        }
        Ok(())
    }
}

/// Reads the RIFF WAVE header, returns the supposed file size.
///
/// This function can be used to quickly check if the file could be a wav file
/// by reading 12 bytes of the header. If an `Ok` is returned, the file is
/// likely a wav file. If an `Err` is returned, it is definitely not a wav
/// file.
///
/// The returned file size cannot be larger than 2<sup>32</sup> + 7 bytes.
pub fn read_wave_header<R: io::Read>(reader: &mut R) -> Result<u64> {
    let mut bytes = [0u8; 12];
    reader.read_into(&mut bytes)?;
    let header = RiffHeader::from_bytes(bytes)?;

    // The stored file length does not include the "RIFF" magic and 4-byte
    // length field, so the total size is 8 bytes more than what is stored.
    Ok(header.inner_len as u64 + 8)
}

/// Reads chunks until a data chunk is encountered.
///
/// Returns the fmt chunk, the fact chunk if there was one, and the length of
/// the data chunk in bytes. Afterwards, the reader will be positioned at the
/// first content byte of the data chunk.
///
/// Chunks of odd length are followed by a pad byte, which is skipped. Chunks
/// other than fmt, fact and data are skipped entirely.
pub fn read_until_data<R: io::Read>(mut reader: R) -> Result<(FormatChunk, Option<FactChunk>, u32)> {
    let mut fmt_opt = None;
    let mut fact_opt = None;

    loop {
        let mut header_bytes = [0u8; 8];
        reader.read_into(&mut header_bytes)?;
        let header = ChunkHeader::from_bytes(header_bytes);

        match header.kind() {
            ChunkKind::Fmt => {
                // Only the first 40 bytes hold fields that we know of. Larger
                // chunks do occur, the remainder is skipped.
                let body_len = cmp::min(header.len as usize, FormatChunk::MAX_LEN);
                let mut body = [0u8; FormatChunk::MAX_LEN];
                reader.read_into(&mut body[..body_len])?;
                reader.skip_bytes(header.padded_len() - body_len as u64)?;
                fmt_opt = Some(FormatChunk::from_bytes(&body[..body_len])?);
            }
            ChunkKind::Fact => {
                // All (compressed) non-PCM formats must have a fact chunk
                // (Rev. 3 documentation). The chunk contains at least one
                // value, the number of sample frames in the file.
                if header.len < 4 {
                    return Err(Error::MalformedChunk("fact chunk is shorter than 4 bytes"));
                }
                let fact = FactChunk::from_bytes(reader.read_4_bytes()?);
                reader.skip_bytes(header.padded_len() - 4)?;
                fact_opt = Some(fact);
            }
            ChunkKind::Data => {
                // The "fmt" chunk must precede the "data" chunk. Any
                // chunks that come after the data chunk will be ignored.
                return match fmt_opt {
                    Some(fmt) => Ok((fmt, fact_opt, header.len)),
                    None => Err(Error::MissingFormatChunk),
                };
            }
            ChunkKind::Unknown => {
                trace!("skipping {:?} chunk of {} bytes",
                       String::from_utf8_lossy(&header.id), header.len);
                reader.skip_bytes(header.padded_len())?;
            }
        }
        // If no data chunk is ever encountered, the function will return
        // via one of the `?` operators, with a truncated stream error.
    }
}

/// Logs the contents of the fmt and fact chunks.
fn dump_format(fmt: &FormatChunk, fact: Option<FactChunk>, data_len: u32) {
    debug!("wav format: tag {:#06x} ({:?}), {} channels, {} Hz, {} bytes/s, \
            block align {}, {} bits per sample",
           fmt.audio_format, fmt.format(), fmt.channels, fmt.sample_rate,
           fmt.byte_rate, fmt.block_align, fmt.bits_per_sample);
    if let Some(extension) = fmt.extension {
        debug!("wav format extension: cbSize {}, {} valid bits, channel mask {:#x}, \
                sub-format {}",
               extension.size, extension.valid_bits_per_sample, extension.channel_mask,
               extension.sub_format.map_or_else(|| "none".to_string(), |g| g.to_hex_string()));
    }
    if let Some(fact) = fact {
        debug!("wav fact chunk: {} sample frames", fact.sample_frames);
    }
    debug!("wav data chunk: {} bytes", data_len);
}

/// A reader that reads the WAVE format from the underlying reader.
///
/// A `WavReader` is a streaming reader. It reads data from the underlying
/// reader on demand, and it reads no more than strictly necessary. No internal
/// buffering is performed on the underlying reader, but this can easily be
/// added by wrapping the reader in an `io::BufReader`. The `open` constructor
/// takes care of this for you.
///
/// Whatever the encoding in the file, samples are produced as `i16`.
pub struct WavReader<R> {
    /// The fmt chunk as found in the file.
    format: FormatChunk,

    /// The fact chunk, if the file has one.
    fact: Option<FactChunk>,

    /// How samples are stored, resolved from the fmt chunk.
    encoding: Encoding,

    /// The length of the data chunk in bytes.
    data_len: u32,

    /// The number of frames that will be decoded.
    num_frames: u32,

    /// The number of samples that will be decoded, over all channels.
    ///
    /// Every frame occupies at least one byte per channel of the data chunk,
    /// whose length is a 32-bit field, so this fits in a `u32`.
    num_samples: u32,

    /// The number of samples read so far.
    samples_read: u32,

    /// The number of frames read from the underlying reader so far.
    frames_loaded: u32,

    /// The frame that samples are currently taken from.
    frame: Vec<u8>,

    /// The reader from which the WAVE format is read.
    reader: R,
}

/// An iterator that yields samples read from a `WavReader`.
///
/// Samples are interleaved: all channels of the first frame come first.
pub struct WavSamples<'wr, R>
    where R: 'wr
{
    reader: &'wr mut WavReader<R>,
}

/// An iterator that yields samples read from a `WavReader` that it owns.
pub struct WavIntoSamples<R> {
    reader: WavReader<R>,
}

impl<R> WavReader<R>
    where R: io::Read
{
    /// Attempts to create a reader that reads the WAVE format.
    ///
    /// The header and all chunks up to the data chunk are read immediately.
    /// Reading the data will be done on demand. If the file uses an encoding
    /// that cannot be decoded, this fails before any sample is read.
    pub fn new(mut reader: R) -> Result<WavReader<R>> {
        read_wave_header(&mut reader)?;
        let (format, fact, data_len) = read_until_data(&mut reader)?;
        dump_format(&format, fact, data_len);

        if format.channels == 0 {
            return Err(Error::MalformedChunk("file contains zero channels"));
        }

        let encoding = Encoding::resolve(&format)?;

        // A frame may hold padding after the last channel, but it cannot be
        // smaller than the samples it contains.
        let block_align = format.block_align as u32;
        if block_align < format.channels as u32 * encoding.bytes_per_sample() as u32 {
            return Err(Error::MalformedChunk("block align is smaller than one frame"));
        }

        // This field is redundant, and may be ignored.
        if Some(format.byte_rate) != block_align.checked_mul(format.sample_rate) {
            warn!("wav byte rate {} does not match sample rate {} times block align {}",
                  format.byte_rate, format.sample_rate, block_align);
        }

        if fact.is_some() {
            if let Encoding::Pcm8 | Encoding::Pcm16 | Encoding::Pcm32 = encoding {
                warn!("wav file has a fact chunk, but its {:?} samples are uncompressed", encoding);
            }
        }

        let num_frames = match fact {
            Some(fact) => {
                // The fact chunk bounds the number of frames, but the frames
                // must still be present in the data chunk.
                if fact.sample_frames as u64 * block_align as u64 > data_len as u64 {
                    return Err(Error::TruncatedStream);
                }
                fact.sample_frames
            }
            None => data_len / block_align,
        };

        let trailing = data_len - num_frames * block_align;
        if trailing > 0 {
            warn!("ignoring {} bytes at the end of the data chunk", trailing);
        }

        Ok(WavReader {
            format: format,
            fact: fact,
            encoding: encoding,
            data_len: data_len,
            num_frames: num_frames,
            num_samples: num_frames * format.channels as u32,
            samples_read: 0,
            frames_loaded: 0,
            frame: vec![0u8; block_align as usize],
            reader: reader,
        })
    }

    /// Returns the channel count and sample rate of the file.
    pub fn spec(&self) -> WavSpec {
        WavSpec {
            channels: self.format.channels,
            sample_rate: self.format.sample_rate,
        }
    }

    /// Returns the fmt chunk as found in the file.
    pub fn format(&self) -> &FormatChunk {
        &self.format
    }

    /// Returns the fact chunk, if the file contains one.
    pub fn fact(&self) -> Option<FactChunk> {
        self.fact
    }

    /// Returns how the samples are stored in the data chunk.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Returns an iterator over all samples.
    ///
    /// The channel data is interleaved. The iterator is streaming. That is,
    /// if you call this method once, read a few samples, and call this method
    /// again, the second iterator will not start again from the beginning of
    /// the file, it will continue where the first iterator stopped.
    ///
    /// If the stream ends early, the iterator yields a single error and then
    /// stops.
    pub fn samples<'wr>(&'wr mut self) -> WavSamples<'wr, R> {
        WavSamples {
            reader: self,
        }
    }

    /// Same as `samples`, but takes ownership of the `WavReader`.
    ///
    /// See `samples()` for more info.
    pub fn into_samples(self) -> WavIntoSamples<R> {
        WavIntoSamples {
            reader: self,
        }
    }

    /// Decodes all remaining samples at once.
    ///
    /// The rest of the data chunk is read in full before anything is decoded.
    /// If the stream holds fewer bytes than the data chunk declares, this
    /// fails with `Error::TruncatedStream`, and no samples are returned.
    ///
    /// If samples were read through `samples()` already, decoding continues
    /// where that iterator stopped, and `frames` counts only the frames that
    /// had not been completely read yet.
    pub fn into_decoded(mut self) -> Result<Decoded> {
        let channels = self.format.channels as u32;
        let block_align = self.format.block_align as usize;
        let bytes_per_sample = self.encoding.bytes_per_sample();

        let frames = self.num_frames - self.samples_read / channels;
        let remaining_bytes = self.data_len as u64 - self.frames_loaded as u64 * block_align as u64;
        let mut data = Vec::new();
        (&mut self.reader).take(remaining_bytes).read_to_end(&mut data)?;
        if (data.len() as u64) < remaining_bytes {
            return Err(Error::TruncatedStream);
        }

        let mut samples = Vec::with_capacity((self.num_samples - self.samples_read) as usize);

        // Finish the frame that the streaming iterator was in the middle of.
        let mut channel = (self.samples_read % channels) as usize;
        while channel > 0 && channel < channels as usize {
            samples.push(self.encoding.decode(&self.frame[channel * bytes_per_sample..]));
            channel += 1;
        }

        // Frames that the iterator has not touched. This is not derived from
        // `frames_loaded`, a failed iterator read stops the iterator early.
        let started = (self.samples_read as u64 + channels as u64 - 1) / channels as u64;
        let frames_left = (self.num_frames as u64 - started) as usize;
        for frame in data.chunks_exact(block_align).take(frames_left) {
            for channel in 0..channels as usize {
                samples.push(self.encoding.decode(&frame[channel * bytes_per_sample..]));
            }
        }

        Ok(Decoded {
            samples: samples,
            spec: self.spec(),
            frames: frames,
        })
    }

    /// Returns the duration of the file in frames.
    ///
    /// The duration is independent of the number of channels. The duration in
    /// seconds can be obtained by dividing this number by the sample rate. The
    /// duration is independent of how many samples have been read already.
    pub fn duration(&self) -> u32 {
        self.num_frames
    }

    /// Returns the number of values that the sample iterator will yield.
    ///
    /// The length of the file is its duration (in frames) times the number of
    /// channels. The length is independent of how many samples have been read
    /// already. To get the number of samples left, use `len()` on the
    /// `samples()` iterator.
    pub fn len(&self) -> u32 {
        self.num_samples
    }

    /// Returns whether the file contains no samples at all.
    pub fn is_empty(&self) -> bool {
        self.num_samples == 0
    }

    /// Destroys the `WavReader` and returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl WavReader<io::BufReader<fs::File>> {
    /// Attempts to create a reader that reads from the specified file.
    ///
    /// This is a convenience constructor that opens a `File`, wraps it in a
    /// `BufReader` and then constructs a `WavReader` from it.
    pub fn open<P: AsRef<path::Path>>(filename: P) -> Result<WavReader<io::BufReader<fs::File>>> {
        let file = fs::File::open(filename)?;
        let buf_reader = io::BufReader::new(file);
        WavReader::new(buf_reader)
    }
}

/// Decodes a complete wav stream into interleaved 16-bit samples.
pub fn decode<R: io::Read>(reader: R) -> Result<Decoded> {
    WavReader::new(reader)?.into_decoded()
}

/// Decodes the wav file at `path` into interleaved 16-bit samples.
///
/// The file is closed before this returns, whether decoding succeeded or not.
pub fn load<P: AsRef<path::Path>>(path: P) -> Result<Decoded> {
    WavReader::open(path)?.into_decoded()
}

fn iter_next<R>(reader: &mut WavReader<R>) -> Option<Result<i16>>
    where R: io::Read
{
    if reader.samples_read >= reader.num_samples {
        return None;
    }

    let channel = (reader.samples_read % reader.format.channels as u32) as usize;
    if channel == 0 {
        if let Err(err) = reader.reader.read_into(&mut reader.frame) {
            // There is no way to recover from a short read, end the iteration.
            reader.samples_read = reader.num_samples;
            return Some(Err(Error::from(err)));
        }
        reader.frames_loaded += 1;
    }

    reader.samples_read += 1;
    let offset = channel * reader.encoding.bytes_per_sample();
    Some(Ok(reader.encoding.decode(&reader.frame[offset..])))
}

fn iter_size_hint<R>(reader: &WavReader<R>) -> (usize, Option<usize>) {
    let samples_left = reader.num_samples - reader.samples_read;
    (samples_left as usize, Some(samples_left as usize))
}

impl<'wr, R> Iterator for WavSamples<'wr, R>
    where R: io::Read
{
    type Item = Result<i16>;

    fn next(&mut self) -> Option<Result<i16>> {
        iter_next(&mut self.reader)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        iter_size_hint(&self.reader)
    }
}

impl<'wr, R> ExactSizeIterator for WavSamples<'wr, R>
    where R: io::Read
{
}

impl<R> Iterator for WavIntoSamples<R>
    where R: io::Read
{
    type Item = Result<i16>;

    fn next(&mut self) -> Option<Result<i16>> {
        iter_next(&mut self.reader)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        iter_size_hint(&self.reader)
    }
}

impl<R> ExactSizeIterator for WavIntoSamples<R>
    where R: io::Read
{
}

#[cfg(test)]
use super::{AudioFormat, Guid};
#[cfg(test)]
use super::wav::FormatExtension;

/// Assembles a wav file from a fmt chunk, extra chunks, and a data payload.
///
/// The RIFF length is computed from the actual contents, so a data chunk
/// header may claim more than `data` holds.
#[cfg(test)]
fn build_wav(fmt: &FormatChunk, extra: &[u8], data_len: u32, data: &[u8]) -> Vec<u8> {
    let mut body = b"WAVE".to_vec();
    body.extend_from_slice(&fmt.to_bytes());
    body.extend_from_slice(extra);
    body.extend_from_slice(&ChunkHeader { id: *b"data", len: data_len }.to_bytes());
    body.extend_from_slice(data);

    let mut file = b"RIFF".to_vec();
    file.extend_from_slice(&(body.len() as u32).to_le_bytes());
    file.extend_from_slice(&body);
    file
}

#[cfg(test)]
fn plain_fmt(format: AudioFormat, channels: u16, bits: u16) -> FormatChunk {
    let block_align = channels * bits / 8;
    FormatChunk {
        audio_format: format.code(),
        channels: channels,
        sample_rate: 8000,
        byte_rate: 8000 * block_align as u32,
        block_align: block_align,
        bits_per_sample: bits,
        extension: None,
    }
}

#[test]
fn read_wave_header_returns_file_size() {
    let mut cursor = io::Cursor::new(b"RIFF\x24\x00\x00\x00WAVE".to_vec());
    assert_eq!(read_wave_header(&mut cursor).unwrap(), 44);

    let mut cursor = io::Cursor::new(b"RIFF\x24\x00\x00\x00WAV".to_vec());
    assert!(matches!(read_wave_header(&mut cursor), Err(Error::TruncatedStream)));

    let mut cursor = io::Cursor::new(b"RIFF\x24\x00\x00\x00wave".to_vec());
    assert!(matches!(read_wave_header(&mut cursor), Err(Error::BadContainer(_))));
}

#[test]
fn read_pcm8_file() {
    let fmt = plain_fmt(AudioFormat::Pcm, 1, 8);
    let file = build_wav(&fmt, &[], 4, &[0x80, 0x00, 0xff, 0x81]);

    let decoded = decode(io::Cursor::new(file)).unwrap();
    assert_eq!(decoded.spec, WavSpec { channels: 1, sample_rate: 8000 });
    assert_eq!(decoded.frames, 4);
    assert_eq!(&decoded.samples[..], &[0, -32768, 32512, 256]);
}

#[test]
fn read_stereo_float_file() {
    let fmt = plain_fmt(AudioFormat::IeeeFloat, 2, 32);
    let mut data = Vec::new();
    for &x in &[0.0_f32, 1.0, -1.0, 0.5] {
        data.extend_from_slice(&x.to_le_bytes());
    }
    let file = build_wav(&fmt, &[], data.len() as u32, &data);

    let decoded = decode(io::Cursor::new(file)).unwrap();
    assert_eq!(decoded.frames, 2);
    assert_eq!(&decoded.samples[..], &[0, 32767, -32768, 16383]);
}

#[test]
fn read_alaw_file_with_fact_chunk() {
    let fmt = plain_fmt(AudioFormat::ALaw, 1, 8);
    // The data chunk holds 4 bytes, but only 3 frames are declared.
    let fact = FactChunk { sample_frames: 3 }.to_bytes();
    let file = build_wav(&fmt, &fact, 4, &[0xd5, 0x55, 0x2a, 0x2a]);

    let reader = WavReader::new(io::Cursor::new(file)).unwrap();
    assert_eq!(reader.fact(), Some(FactChunk { sample_frames: 3 }));
    assert_eq!(reader.encoding(), Encoding::ALaw);
    assert_eq!(reader.duration(), 3);

    let decoded = reader.into_decoded().unwrap();
    assert_eq!(decoded.frames, 3);
    assert_eq!(&decoded.samples[..], &[8, -8, -32256]);
}

#[test]
fn fact_beyond_data_is_truncated() {
    let fmt = plain_fmt(AudioFormat::MuLaw, 1, 8);
    let fact = FactChunk { sample_frames: 5 }.to_bytes();
    let file = build_wav(&fmt, &fact, 4, &[0, 0, 0, 0]);
    assert!(matches!(WavReader::new(io::Cursor::new(file)), Err(Error::TruncatedStream)));
}

#[test]
fn read_extensible_pcm32_file() {
    let mut fmt = plain_fmt(AudioFormat::Extensible, 2, 32);
    fmt.extension = Some(FormatExtension {
        size: 22,
        valid_bits_per_sample: 32,
        channel_mask: 0x3,
        sub_format: Some(Guid::SUBTYPE_PCM),
    });
    let mut data = Vec::new();
    for &x in &[0x1234_5678_i32, -1, i32::MIN, 0x0001_ffff] {
        data.extend_from_slice(&x.to_le_bytes());
    }
    let file = build_wav(&fmt, &[], data.len() as u32, &data);

    let reader = WavReader::new(io::Cursor::new(file)).unwrap();
    assert_eq!(reader.encoding(), Encoding::Pcm32);
    assert_eq!(reader.format().extension.unwrap().channel_mask, 0x3);
    let decoded = reader.into_decoded().unwrap();
    assert_eq!(&decoded.samples[..], &[0x1234, -1, i16::MIN, 1]);
}

#[test]
fn extensible_mpeg_is_unsupported() {
    let mut fmt = plain_fmt(AudioFormat::Extensible, 1, 16);
    fmt.extension = Some(FormatExtension {
        size: 22,
        valid_bits_per_sample: 16,
        channel_mask: 0x4,
        sub_format: Some(Guid::SUBTYPE_MPEG),
    });
    let file = build_wav(&fmt, &[], 2, &[0, 0]);
    assert!(matches!(WavReader::new(io::Cursor::new(file)),
                     Err(Error::UnsupportedFormat(_))));
}

#[test]
fn unsupported_encodings_fail_before_decoding() {
    let file = build_wav(&plain_fmt(AudioFormat::Pcm, 1, 24), &[], 3, &[1, 2, 3]);
    assert!(matches!(decode(io::Cursor::new(file)),
                     Err(Error::UnsupportedBitDepth { bits: 24, .. })));

    let file = build_wav(&plain_fmt(AudioFormat::AdPcm, 1, 4), &[], 2, &[1, 2]);
    assert!(matches!(decode(io::Cursor::new(file)),
                     Err(Error::UnsupportedFormat(AudioFormat::AdPcm))));
}

#[test]
fn data_before_fmt_is_rejected() {
    let file = b"RIFF\x10\x00\x00\x00WAVEdata\x02\x00\x00\x00\x00\x00".to_vec();
    assert!(matches!(decode(io::Cursor::new(file)), Err(Error::MissingFormatChunk)));
}

#[test]
fn declared_data_beyond_stream_is_truncated() {
    let fmt = plain_fmt(AudioFormat::Pcm, 2, 16);
    let file = build_wav(&fmt, &[], 400, &[0u8; 396]);
    assert!(matches!(decode(io::Cursor::new(file)), Err(Error::TruncatedStream)));
}

#[test]
fn truncated_stream_ends_sample_iteration() {
    let fmt = plain_fmt(AudioFormat::Pcm, 1, 16);
    let file = build_wav(&fmt, &[], 6, &[1, 0, 2, 0]);

    let mut reader = WavReader::new(io::Cursor::new(file)).unwrap();
    let mut samples = reader.samples();
    assert_eq!(samples.next().unwrap().unwrap(), 1);
    assert_eq!(samples.next().unwrap().unwrap(), 2);
    assert!(matches!(samples.next(), Some(Err(Error::TruncatedStream))));
    assert!(samples.next().is_none());
}

#[test]
fn unknown_chunks_are_skipped() {
    let fmt = plain_fmt(AudioFormat::Pcm, 1, 16);
    let data = [2, 0, 0xfd, 0xff, 5, 0, 0xf9, 0xff];
    let plain = decode(io::Cursor::new(build_wav(&fmt, &[], 8, &data))).unwrap();

    // An odd-sized chunk is followed by a pad byte.
    let mut extra = ChunkHeader { id: *b"LIST", len: 5 }.to_bytes().to_vec();
    extra.extend_from_slice(b"INFO\x01\x00");
    extra.extend_from_slice(&ChunkHeader { id: *b"junk", len: 4 }.to_bytes());
    extra.extend_from_slice(b"\xde\xad\xbe\xef");
    let with_extra = decode(io::Cursor::new(build_wav(&fmt, &extra, 8, &data))).unwrap();

    assert_eq!(plain, with_extra);
    assert_eq!(&plain.samples[..], &[2, -3, 5, -7]);
}

#[test]
fn oversized_fmt_chunk_is_skipped() {
    // A PCM format tag with the length of a WAVEFORMATEXTENSIBLE chunk, plus
    // two bytes that nobody knows the meaning of.
    let fmt = plain_fmt(AudioFormat::Pcm, 1, 16);
    let mut chunk = fmt.to_bytes();
    chunk[4] = 42;
    chunk.extend_from_slice(&[22, 0]);
    chunk.extend_from_slice(&[0u8; 24]);

    let mut file = b"RIFF\0\0\0\0WAVE".to_vec();
    file.extend_from_slice(&chunk);
    file.extend_from_slice(&ChunkHeader { id: *b"data", len: 2 }.to_bytes());
    file.extend_from_slice(&[0x10, 0x00]);

    let reader = WavReader::new(io::Cursor::new(file)).unwrap();
    assert_eq!(reader.format().extension.unwrap().size, 22);
    assert_eq!(&reader.into_decoded().unwrap().samples[..], &[16]);
}

#[test]
fn block_padding_is_skipped() {
    // Two 8-bit channels stored in 4-byte frames.
    let mut fmt = plain_fmt(AudioFormat::Pcm, 2, 8);
    fmt.block_align = 4;
    fmt.byte_rate = 32000;
    let data = [0x80, 0x81, 0xaa, 0xaa, 0x00, 0xff, 0xaa, 0xaa];
    let file = build_wav(&fmt, &[], 8, &data);

    let mut reader = WavReader::new(io::Cursor::new(file.clone())).unwrap();
    let streamed: Vec<i16> = reader.samples().map(|s| s.unwrap()).collect();
    assert_eq!(&streamed[..], &[0, 256, -32768, 32512]);

    let decoded = decode(io::Cursor::new(file)).unwrap();
    assert_eq!(decoded.samples, streamed);
}

#[test]
fn small_block_align_is_malformed() {
    let mut fmt = plain_fmt(AudioFormat::Pcm, 2, 16);
    fmt.block_align = 2;
    let file = build_wav(&fmt, &[], 4, &[0; 4]);
    assert!(matches!(decode(io::Cursor::new(file)), Err(Error::MalformedChunk(_))));

    let fmt = plain_fmt(AudioFormat::Pcm, 0, 16);
    let file = build_wav(&fmt, &[], 4, &[0; 4]);
    assert!(matches!(decode(io::Cursor::new(file)), Err(Error::MalformedChunk(_))));
}

#[test]
fn into_decoded_resumes_after_samples() {
    let fmt = plain_fmt(AudioFormat::Pcm, 2, 16);
    let mut data = Vec::new();
    for x in 1_i16..7 {
        data.extend_from_slice(&x.to_le_bytes());
    }
    let file = build_wav(&fmt, &[], data.len() as u32, &data);

    let mut reader = WavReader::new(io::Cursor::new(file)).unwrap();
    assert_eq!(reader.len(), 6);
    {
        let mut samples = reader.samples();
        assert_eq!(samples.size_hint(), (6, Some(6)));
        assert_eq!(samples.next().unwrap().unwrap(), 1);
        assert_eq!(samples.next().unwrap().unwrap(), 2);
        assert_eq!(samples.next().unwrap().unwrap(), 3);
        assert_eq!(samples.size_hint(), (3, Some(3)));
    }

    let decoded = reader.into_decoded().unwrap();
    assert_eq!(&decoded.samples[..], &[4, 5, 6]);
    assert_eq!(decoded.frames, 2);
}

#[test]
fn samples_equals_into_samples() {
    let fmt = plain_fmt(AudioFormat::MuLaw, 1, 8);
    let file = build_wav(&fmt, &[], 4, &[0x00, 0x7f, 0x80, 0xff]);

    let mut reader_ref = WavReader::new(io::Cursor::new(file.clone())).unwrap();
    let reader_val = WavReader::new(io::Cursor::new(file)).unwrap();

    let samples_ref: Vec<i16> = reader_ref.samples().map(|r| r.unwrap()).collect();
    let samples_val: Vec<i16> = reader_val.into_samples().map(|r| r.unwrap()).collect();

    assert_eq!(samples_val, samples_ref);
    assert_eq!(&samples_ref[..], &[-32124, 0, 32124, 0]);
}

/// Wraps the given chunks in a RIFF WAVE container.
#[cfg(test)]
fn riff_wave(chunks: &[u8]) -> Vec<u8> {
    let mut file = b"RIFF".to_vec();
    file.extend_from_slice(&(chunks.len() as u32 + 4).to_le_bytes());
    file.extend_from_slice(b"WAVE");
    file.extend_from_slice(chunks);
    file
}

#[test]
fn odd_fmt_chunk_is_padded() {
    // A 16-byte fmt body with one trailing byte, then the pad byte.
    let fmt = plain_fmt(AudioFormat::Pcm, 1, 16);
    let mut chunks = ChunkHeader { id: *b"fmt ", len: 17 }.to_bytes().to_vec();
    chunks.extend_from_slice(&fmt.to_bytes()[8..]);
    chunks.extend_from_slice(&[0x77, 0x00]);
    chunks.extend_from_slice(&ChunkHeader { id: *b"data", len: 4 }.to_bytes());
    chunks.extend_from_slice(&[1, 0, 0xff, 0xff]);

    let reader = WavReader::new(io::Cursor::new(riff_wave(&chunks))).unwrap();
    assert_eq!(reader.format(), &fmt);
    assert_eq!(&reader.into_decoded().unwrap().samples[..], &[1, -1]);
}

#[test]
fn odd_fact_chunk_is_padded() {
    let fmt = plain_fmt(AudioFormat::MuLaw, 1, 8);
    let mut chunks = fmt.to_bytes();
    chunks.extend_from_slice(&ChunkHeader { id: *b"fact", len: 5 }.to_bytes());
    chunks.extend_from_slice(&[2, 0, 0, 0, 0x55, 0x00]);
    chunks.extend_from_slice(&ChunkHeader { id: *b"data", len: 2 }.to_bytes());
    chunks.extend_from_slice(&[0x00, 0x80]);

    let reader = WavReader::new(io::Cursor::new(riff_wave(&chunks))).unwrap();
    assert_eq!(reader.fact(), Some(FactChunk { sample_frames: 2 }));
    assert_eq!(&reader.into_decoded().unwrap().samples[..], &[-32124, 32124]);
}

#[test]
fn short_fact_chunk_is_malformed() {
    let fmt = plain_fmt(AudioFormat::ALaw, 1, 8);
    let mut chunks = fmt.to_bytes();
    chunks.extend_from_slice(&ChunkHeader { id: *b"fact", len: 2 }.to_bytes());
    chunks.extend_from_slice(&[1, 0]);
    chunks.extend_from_slice(&ChunkHeader { id: *b"data", len: 1 }.to_bytes());
    chunks.extend_from_slice(&[0xd5]);

    assert!(matches!(decode(io::Cursor::new(riff_wave(&chunks))),
                     Err(Error::MalformedChunk(..))));
}

#[test]
fn fact_chunk_on_pcm_still_bounds_frames() {
    let fmt = plain_fmt(AudioFormat::Pcm, 1, 16);
    let fact = FactChunk { sample_frames: 1 }.to_bytes();
    let file = build_wav(&fmt, &fact, 4, &[3, 0, 4, 0]);

    let reader = WavReader::new(io::Cursor::new(file)).unwrap();
    assert_eq!(reader.encoding(), Encoding::Pcm16);
    assert_eq!(reader.duration(), 1);
    assert_eq!(&reader.into_decoded().unwrap().samples[..], &[3]);
}
