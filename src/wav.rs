// Pcmwav -- A wav decoding and encoding library in Rust
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Building blocks for working with the WAVE format.
//!
//! The WAVE format consists of a header, followed by _chunks_ of various
//! kinds. Every chunk starts with a 4-byte tag and a 32-bit little-endian
//! length of the body that follows. Pcmwav understands three kinds of chunks:
//!
//! * `fmt `, which describes how the samples are stored,
//! * `fact`, which holds the number of sample frames for non-PCM formats,
//! * `data`, which holds the interleaved samples themselves.
//!
//! Any other chunk is skipped. This module contains the fixed-layout
//! descriptors for the header and those chunks, and their conversion from and
//! to bytes. For reading whole files, see [`WavReader`](crate::WavReader).

use crate::{AudioFormat, Error, Guid, Result, WavSpec};

/// `RIFF` as a little-endian `u32`.
pub const ID_RIFF: u32 = 0x4646_4952;
/// `WAVE` as a little-endian `u32`.
pub const ID_WAVE: u32 = 0x4556_4157;
/// `fmt ` as a little-endian `u32`.
pub const ID_FMT: u32 = 0x2074_6d66;
/// `fact` as a little-endian `u32`.
pub const ID_FACT: u32 = 0x7463_6166;
/// `data` as a little-endian `u32`.
pub const ID_DATA: u32 = 0x6174_6164;

pub(crate) trait Bytes {
    fn read_4_bytes(&self) -> [u8; 4];
    fn read_le_u16(&self) -> u16;
    fn read_le_u32(&self) -> u32;

    fn write_le_u16(&mut self, x: u16);
    fn write_le_u32(&mut self, x: u32);
}

impl Bytes for [u8] {
    #[inline(always)]
    fn read_4_bytes(&self) -> [u8; 4] {
        [self[0], self[1], self[2], self[3]]
    }

    #[inline(always)]
    fn read_le_u16(&self) -> u16 {
        u16::from_le_bytes([self[0], self[1]])
    }

    #[inline(always)]
    fn read_le_u32(&self) -> u32 {
        u32::from_le_bytes(self.read_4_bytes())
    }

    #[inline(always)]
    fn write_le_u16(&mut self, x: u16) {
        self[..2].copy_from_slice(&x.to_le_bytes());
    }

    #[inline(always)]
    fn write_le_u32(&mut self, x: u32) {
        self[..4].copy_from_slice(&x.to_le_bytes());
    }
}

/// The outermost header of a wav file: the RIFF header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RiffHeader {
    /// The length in bytes of the data that follows the header.
    ///
    /// This does not include the length of the 8-byte RIFF header, but it does
    /// include the length of the 4-byte WAVE tag. Therefore the size of a wav
    /// file is 8 bytes more than this inner length.
    pub inner_len: u32,
}

impl RiffHeader {
    /// Parse the RIFF WAVE header.
    ///
    /// Aside from returning the length of the file, this can be used to test
    /// the magic bytes to see if a file might be a wav file at all.
    #[inline(always)]
    pub fn from_bytes(bytes: [u8; 12]) -> Result<RiffHeader> {
        if bytes.read_le_u32() != ID_RIFF {
            return Err(Error::BadContainer("expected RIFF tag"));
        }
        let result = RiffHeader {
            inner_len: bytes[4..].read_le_u32(),
        };
        if bytes[8..].read_le_u32() != ID_WAVE {
            return Err(Error::BadContainer("expected WAVE tag"));
        }
        Ok(result)
    }

    /// Serialize the header for writing to a file.
    #[inline(always)]
    pub fn to_bytes(self) -> [u8; 12] {
        let mut result: [u8; 12] = *b"RIFF\0\0\0\0WAVE";
        result[4..].write_le_u32(self.inner_len);
        result
    }
}

/// The different chunks that a WAVE file can contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkKind {
    /// The `fmt ` chunk.
    Fmt,
    /// The `fact` chunk.
    Fact,
    /// The `data` chunk.
    Data,
    /// Any other chunk, such as `LIST`.
    Unknown,
}

/// Describes the structure of a chunk in the WAVE file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    /// The four-character chunk tag.
    pub id: [u8; 4],
    /// The length of the chunk body, excluding this 8-byte header.
    pub len: u32,
}

impl ChunkHeader {
    /// Parse an 8-byte chunk header.
    #[inline(always)]
    pub fn from_bytes(bytes: [u8; 8]) -> ChunkHeader {
        ChunkHeader {
            id: bytes.read_4_bytes(),
            len: bytes[4..].read_le_u32(),
        }
    }

    /// Serialize the header for writing to a file.
    #[inline(always)]
    pub fn to_bytes(self) -> [u8; 8] {
        let mut result = [0u8; 8];
        result[..4].copy_from_slice(&self.id);
        result[4..].write_le_u32(self.len);
        result
    }

    /// Classifies the chunk by its tag.
    pub fn kind(&self) -> ChunkKind {
        match self.id[..].read_le_u32() {
            ID_FMT => ChunkKind::Fmt,
            ID_FACT => ChunkKind::Fact,
            ID_DATA => ChunkKind::Data,
            _ => ChunkKind::Unknown,
        }
    }

    /// The number of bytes the chunk occupies after its header, including the
    /// pad byte that follows a chunk of odd length.
    pub fn padded_len(&self) -> u64 {
        self.len as u64 + (self.len as u64 & 1)
    }
}

/// The fields of a `WAVEFORMATEX` or `WAVEFORMATEXTENSIBLE` struct beyond the
/// 16 bytes of `PCMWAVEFORMAT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatExtension {
    /// The field cbSize, the number of bytes that follow it.
    pub size: u16,
    /// The field wValidBitsPerSample, only present in a 40-byte chunk.
    pub valid_bits_per_sample: u16,
    /// The field dwChannelMask, only present in a 40-byte chunk.
    pub channel_mask: u32,
    /// The field SubFormat, only present in a 40-byte chunk.
    pub sub_format: Option<Guid>,
}

/// The contents of the `fmt ` chunk.
///
/// The minimal chunk is the `PCMWAVEFORMAT` struct:
///
/// ```text
/// typedef struct {
///     WORD  wFormatTag;
///     WORD  nChannels;
///     DWORD nSamplesPerSec;
///     DWORD nAvgBytesPerSec;
///     WORD  nBlockAlign;
///     WORD  wBitsPerSample;
/// } PCMWAVEFORMAT;
/// ```
///
/// `WAVEFORMATEX` adds the 2-byte `cbSize`, and `WAVEFORMATEXTENSIBLE` adds
/// another 22 bytes, which end in the sub-format GUID.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatChunk {
    /// The raw format tag.
    pub audio_format: u16,
    /// The number of interleaved channels.
    pub channels: u16,
    /// The number of frames per second.
    pub sample_rate: u32,
    /// The average number of bytes per second.
    pub byte_rate: u32,
    /// The number of bytes in one frame of all channels.
    pub block_align: u16,
    /// The number of bits used to store one sample.
    pub bits_per_sample: u16,
    /// Present when the chunk is longer than 16 bytes.
    pub extension: Option<FormatExtension>,
}

impl FormatChunk {
    /// The largest chunk body that carries fields Pcmwav knows about.
    pub const MAX_LEN: usize = 40;

    /// Builds the 16-byte fmt chunk of a 16-bit integer PCM file.
    ///
    /// The block align and byte rate wrap around if `spec` has more than
    /// 32767 channels, or a sample rate too high for its byte rate to fit in
    /// 32 bits. `WavWriter` rejects such specs before building this chunk.
    pub fn pcm16(spec: WavSpec) -> FormatChunk {
        let block_align = spec.channels.wrapping_mul(2);
        FormatChunk {
            audio_format: AudioFormat::Pcm.code(),
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            byte_rate: spec.sample_rate.wrapping_mul(block_align as u32),
            block_align: block_align,
            bits_per_sample: 16,
            extension: None,
        }
    }

    /// The format tag as an enum.
    pub fn format(&self) -> AudioFormat {
        AudioFormat::from_code(self.audio_format)
    }

    /// The number of bytes that a single sample of one channel occupies.
    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Parses the chunk body.
    ///
    /// `body` holds at most the first [`MAX_LEN`](Self::MAX_LEN) bytes of the
    /// chunk. Fields beyond those are not interpreted.
    pub fn from_bytes(body: &[u8]) -> Result<FormatChunk> {
        if body.len() < 16 {
            return Err(Error::MalformedChunk("fmt chunk is shorter than 16 bytes"));
        }

        let extension = if body.len() >= 18 {
            let mut extension = FormatExtension {
                size: body[16..].read_le_u16(),
                valid_bits_per_sample: 0,
                channel_mask: 0,
                sub_format: None,
            };
            if body.len() >= 40 {
                let mut guid = [0u8; 16];
                guid.copy_from_slice(&body[24..40]);
                extension.valid_bits_per_sample = body[18..].read_le_u16();
                extension.channel_mask = body[20..].read_le_u32();
                extension.sub_format = Some(Guid::from_bytes(guid));
            }
            Some(extension)
        } else {
            None
        };

        Ok(FormatChunk {
            audio_format: body[0..].read_le_u16(),
            channels: body[2..].read_le_u16(),
            sample_rate: body[4..].read_le_u32(),
            byte_rate: body[8..].read_le_u32(),
            block_align: body[12..].read_le_u16(),
            bits_per_sample: body[14..].read_le_u16(),
            extension: extension,
        })
    }

    /// Serializes the chunk, including its 8-byte chunk header.
    ///
    /// The body is 16 bytes without an extension, 18 bytes with an extension
    /// that has no sub-format, and 40 bytes otherwise.
    pub fn to_bytes(&self) -> Vec<u8> {
        let body_len = match self.extension {
            None => 16,
            Some(FormatExtension { sub_format: None, .. }) => 18,
            Some(_) => 40,
        };
        let mut result = vec![0u8; 8 + body_len];
        result[..8].copy_from_slice(&ChunkHeader { id: *b"fmt ", len: body_len as u32 }.to_bytes());

        let body = &mut result[8..];
        body[0..].write_le_u16(self.audio_format);
        body[2..].write_le_u16(self.channels);
        body[4..].write_le_u32(self.sample_rate);
        body[8..].write_le_u32(self.byte_rate);
        body[12..].write_le_u16(self.block_align);
        body[14..].write_le_u16(self.bits_per_sample);
        if let Some(ref extension) = self.extension {
            body[16..].write_le_u16(extension.size);
            if let Some(guid) = extension.sub_format {
                body[18..].write_le_u16(extension.valid_bits_per_sample);
                body[20..].write_le_u32(extension.channel_mask);
                body[24..40].copy_from_slice(guid.as_bytes());
            }
        }
        result
    }
}

/// The contents of the `fact` chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FactChunk {
    /// The number of sample frames (samples per channel) in the data chunk.
    pub sample_frames: u32,
}

impl FactChunk {
    /// Parses the first 4 bytes of the chunk body.
    pub fn from_bytes(body: [u8; 4]) -> FactChunk {
        FactChunk {
            sample_frames: body.read_le_u32(),
        }
    }

    /// Serializes the chunk, including its 8-byte chunk header.
    pub fn to_bytes(self) -> [u8; 12] {
        let mut result = [0u8; 12];
        result[..8].copy_from_slice(&ChunkHeader { id: *b"fact", len: 4 }.to_bytes());
        result[8..].write_le_u32(self.sample_frames);
        result
    }
}

#[test]
fn chunk_ids_match_their_tags() {
    assert_eq!(b"RIFF".read_le_u32(), ID_RIFF);
    assert_eq!(b"WAVE".read_le_u32(), ID_WAVE);
    assert_eq!(b"fmt ".read_le_u32(), ID_FMT);
    assert_eq!(b"fact".read_le_u32(), ID_FACT);
    assert_eq!(b"data".read_le_u32(), ID_DATA);
}

#[test]
fn riff_header_rejects_wrong_tags() {
    let header = RiffHeader { inner_len: 36 }.to_bytes();
    assert_eq!(&header, b"RIFF\x24\0\0\0WAVE");
    assert_eq!(RiffHeader::from_bytes(header).unwrap().inner_len, 36);

    match RiffHeader::from_bytes(*b"RIFX\x24\0\0\0WAVE") {
        Err(Error::BadContainer(..)) => {}
        other => panic!("expected BadContainer, got {:?}", other),
    }
    match RiffHeader::from_bytes(*b"RIFF\x24\0\0\0AVI ") {
        Err(Error::BadContainer(..)) => {}
        other => panic!("expected BadContainer, got {:?}", other),
    }
}

#[test]
fn chunk_header_kind_and_padding() {
    let header = ChunkHeader::from_bytes(*b"LIST\x05\0\0\0");
    assert_eq!(header.kind(), ChunkKind::Unknown);
    assert_eq!(header.len, 5);
    assert_eq!(header.padded_len(), 6);
    assert_eq!(&header.to_bytes(), b"LIST\x05\0\0\0");

    assert_eq!(ChunkHeader::from_bytes(*b"fmt \x10\0\0\0").kind(), ChunkKind::Fmt);
    assert_eq!(ChunkHeader::from_bytes(*b"fact\x04\0\0\0").kind(), ChunkKind::Fact);
    assert_eq!(ChunkHeader::from_bytes(*b"data\0\0\0\0").padded_len(), 0);
}

#[test]
fn pcm16_fmt_chunk_layout() {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 16000,
    };
    let bytes = FormatChunk::pcm16(spec).to_bytes();
    assert_eq!(&bytes[..], &b"fmt \x10\x00\x00\x00\x01\x00\x01\x00\x80\x3e\x00\x00\
\x00\x7d\x00\x00\x02\x00\x10\x00"[..]);
    assert_eq!(FormatChunk::from_bytes(&bytes[8..]).unwrap(), FormatChunk::pcm16(spec));
}

#[test]
fn pcm16_fmt_chunk_wraps_out_of_range_specs() {
    let spec = WavSpec {
        channels: 40000,
        sample_rate: u32::MAX,
    };
    let fmt = FormatChunk::pcm16(spec);
    assert_eq!(fmt.channels, 40000);
    assert_eq!(fmt.block_align, 80000_u32 as u16);
    assert_eq!(fmt.byte_rate, u32::MAX.wrapping_mul(80000_u32 as u16 as u32));
}

#[test]
fn extensible_fmt_chunk_layout() {
    // A 10-channel, 16-bit WAVEFORMATEXTENSIBLE chunk as written by most tools.
    let body = b"\xfe\xff\x0a\x00\x80\x3e\x00\x00\x00\xe2\x04\x00\
\x14\x00\x10\x00\x16\x00\x10\x00\xff\x03\x00\x00\x01\x00\x00\x00\
\x00\x00\x10\x00\x80\x00\x00\xaa\x00\x38\x9b\x71";
    let fmt = FormatChunk::from_bytes(&body[..]).unwrap();
    assert_eq!(fmt.format(), AudioFormat::Extensible);
    assert_eq!(fmt.channels, 10);
    assert_eq!(fmt.block_align, 20);
    assert_eq!(fmt.bytes_per_sample(), 2);

    let extension = fmt.extension.unwrap();
    assert_eq!(extension.size, 22);
    assert_eq!(extension.valid_bits_per_sample, 16);
    assert_eq!(extension.channel_mask, 0x3ff);
    assert_eq!(extension.sub_format, Some(Guid::SUBTYPE_PCM));

    assert_eq!(&fmt.to_bytes()[8..], &body[..]);
}

#[test]
fn wave_format_ex_has_no_sub_format() {
    let mut body = FormatChunk::pcm16(WavSpec { channels: 2, sample_rate: 44100 }).to_bytes();
    body.extend_from_slice(&[0, 0]);
    let fmt = FormatChunk::from_bytes(&body[8..]).unwrap();
    let extension = fmt.extension.unwrap();
    assert_eq!(extension.size, 0);
    assert_eq!(extension.sub_format, None);
    assert_eq!(fmt.to_bytes().len(), 8 + 18);
}

#[test]
fn short_fmt_chunk_is_malformed() {
    match FormatChunk::from_bytes(&[1, 0, 1, 0]) {
        Err(Error::MalformedChunk(..)) => {}
        other => panic!("expected MalformedChunk, got {:?}", other),
    }
}

#[test]
fn fact_chunk_layout() {
    let fact = FactChunk { sample_frames: 0x0102_0304 };
    let bytes = fact.to_bytes();
    assert_eq!(&bytes, b"fact\x04\0\0\0\x04\x03\x02\x01");
    assert_eq!(FactChunk::from_bytes([4, 3, 2, 1]), fact);
}
