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

use super::{AudioFormat, Error, Guid, Result};
use super::wav::FormatChunk;

/// The way a single sample is stored in the data chunk.
///
/// Every variant knows how to turn its stored bytes into a signed 16-bit
/// sample. The encoding is determined once, from the fmt chunk, before any
/// sample is read; a file for which no encoding exists is rejected as a whole.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// Unsigned 8-bit integers, centered around 128.
    Pcm8,
    /// Signed little-endian 16-bit integers.
    Pcm16,
    /// Signed little-endian 32-bit integers.
    Pcm32,
    /// Little-endian 32-bit IEEE floats.
    Float32,
    /// Little-endian 64-bit IEEE floats.
    Float64,
    /// 8-bit G.711 A-law.
    ALaw,
    /// 8-bit G.711 µ-law.
    MuLaw,
}

impl Encoding {
    /// Selects the encoding for a format tag and bit depth.
    ///
    /// `AudioFormat::Extensible` cannot be resolved without its sub-format;
    /// use [`resolve`](Self::resolve) for a complete fmt chunk.
    pub fn from_format(format: AudioFormat, bits: u16) -> Result<Encoding> {
        let unsupported_bits = Error::UnsupportedBitDepth { format: format, bits: bits };
        match format {
            AudioFormat::Pcm => match bits {
                8 => Ok(Encoding::Pcm8),
                16 => Ok(Encoding::Pcm16),
                32 => Ok(Encoding::Pcm32),
                _ => Err(unsupported_bits),
            },
            AudioFormat::IeeeFloat => match bits {
                32 => Ok(Encoding::Float32),
                64 => Ok(Encoding::Float64),
                _ => Err(unsupported_bits),
            },
            AudioFormat::ALaw => match bits {
                8 => Ok(Encoding::ALaw),
                _ => Err(unsupported_bits),
            },
            AudioFormat::MuLaw => match bits {
                8 => Ok(Encoding::MuLaw),
                _ => Err(unsupported_bits),
            },
            _ => Err(Error::UnsupportedFormat(format)),
        }
    }

    /// Selects the encoding described by a fmt chunk.
    ///
    /// For `WAVE_FORMAT_EXTENSIBLE`, the sub-format GUID determines the
    /// family, and `wBitsPerSample` (the container size) the bit depth.
    pub fn resolve(fmt: &FormatChunk) -> Result<Encoding> {
        let format = match fmt.format() {
            AudioFormat::Extensible => {
                let sub_format = fmt.extension
                    .and_then(|extension| extension.sub_format)
                    .ok_or(Error::MalformedChunk("extensible fmt chunk lacks a sub-format"))?;
                sub_format_family(sub_format)?
            }
            other => other,
        };
        Encoding::from_format(format, fmt.bits_per_sample)
    }

    /// The number of bytes one sample occupies in the data chunk.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Encoding::Pcm8 | Encoding::ALaw | Encoding::MuLaw => 1,
            Encoding::Pcm16 => 2,
            Encoding::Pcm32 | Encoding::Float32 => 4,
            Encoding::Float64 => 8,
        }
    }

    /// Decodes one sample.
    ///
    /// `bytes` must hold at least [`bytes_per_sample`](Self::bytes_per_sample)
    /// bytes; any bytes beyond those are ignored.
    #[inline]
    pub fn decode(self, bytes: &[u8]) -> i16 {
        match self {
            Encoding::Pcm8 => pcm8_to_i16(bytes[0]),
            Encoding::Pcm16 => i16::from_le_bytes([bytes[0], bytes[1]]),
            Encoding::Pcm32 => {
                let x = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                (x >> 16) as i16
            }
            Encoding::Float32 => {
                let x = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                f32_to_i16(x)
            }
            Encoding::Float64 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes[..8]);
                f64_to_i16(f64::from_le_bytes(buf))
            }
            Encoding::ALaw => ALAW_TABLE[bytes[0] as usize],
            Encoding::MuLaw => MULAW_TABLE[bytes[0] as usize],
        }
    }
}

/// Maps a `KSDATAFORMAT_SUBTYPE_*` GUID to the plain format tag it stands for.
fn sub_format_family(guid: Guid) -> Result<AudioFormat> {
    match guid {
        Guid::SUBTYPE_PCM => Ok(AudioFormat::Pcm),
        Guid::SUBTYPE_IEEE_FLOAT => Ok(AudioFormat::IeeeFloat),
        Guid::SUBTYPE_ALAW => Ok(AudioFormat::ALaw),
        Guid::SUBTYPE_MULAW => Ok(AudioFormat::MuLaw),
        Guid::SUBTYPE_ADPCM => Err(Error::UnsupportedFormat(AudioFormat::AdPcm)),
        _ => Err(Error::UnsupportedFormat(AudioFormat::Extensible)),
    }
}

/// Decodes one sample of the given format and bit depth.
///
/// The format must not be `AudioFormat::Extensible`; resolve the sub-format
/// first. Fails if no decoding rule exists, or if `bytes` is too short.
pub fn decode_sample(format: AudioFormat, bits: u16, bytes: &[u8]) -> Result<i16> {
    let encoding = Encoding::from_format(format, bits)?;
    if bytes.len() < encoding.bytes_per_sample() {
        return Err(Error::TruncatedStream);
    }
    Ok(encoding.decode(bytes))
}

/// Converts an unsigned 8-bit sample to a 16-bit one.
///
/// For all bit depths except 8, samples are stored as little-endian _signed_
/// integers. An 8-bit sample is instead stored _unsigned_, with 128 as the
/// zero level.
#[inline(always)]
fn pcm8_to_i16(x: u8) -> i16 {
    (x as i16 - 128) << 8
}

#[inline(always)]
fn f32_to_i16(x: f32) -> i16 {
    let scaled = ((x + 1.0) * 32767.5).round() - 32768.0;
    scaled.max(i16::MIN as f32).min(i16::MAX as f32) as i16
}

#[inline(always)]
fn f64_to_i16(x: f64) -> i16 {
    // The cast saturates, so out-of-range values clamp as well.
    (((x + 1.0) * 32767.5).round() - 32768.0) as i16
}

/// G.711 A-law expansion, indexed by the stored byte.
static ALAW_TABLE: [i16; 256] = [
     -5504,  -5248,  -6016,  -5760,  -4480,  -4224,  -4992,  -4736,
     -7552,  -7296,  -8064,  -7808,  -6528,  -6272,  -7040,  -6784,
     -2752,  -2624,  -3008,  -2880,  -2240,  -2112,  -2496,  -2368,
     -3776,  -3648,  -4032,  -3904,  -3264,  -3136,  -3520,  -3392,
    -22016, -20992, -24064, -23040, -17920, -16896, -19968, -18944,
    -30208, -29184, -32256, -31232, -26112, -25088, -28160, -27136,
    -11008, -10496, -12032, -11520,  -8960,  -8448,  -9984,  -9472,
    -15104, -14592, -16128, -15616, -13056, -12544, -14080, -13568,
      -344,   -328,   -376,   -360,   -280,   -264,   -312,   -296,
      -472,   -456,   -504,   -488,   -408,   -392,   -440,   -424,
       -88,    -72,   -120,   -104,    -24,     -8,    -56,    -40,
      -216,   -200,   -248,   -232,   -152,   -136,   -184,   -168,
     -1376,  -1312,  -1504,  -1440,  -1120,  -1056,  -1248,  -1184,
     -1888,  -1824,  -2016,  -1952,  -1632,  -1568,  -1760,  -1696,
      -688,   -656,   -752,   -720,   -560,   -528,   -624,   -592,
      -944,   -912,  -1008,   -976,   -816,   -784,   -880,   -848,
      5504,   5248,   6016,   5760,   4480,   4224,   4992,   4736,
      7552,   7296,   8064,   7808,   6528,   6272,   7040,   6784,
      2752,   2624,   3008,   2880,   2240,   2112,   2496,   2368,
      3776,   3648,   4032,   3904,   3264,   3136,   3520,   3392,
     22016,  20992,  24064,  23040,  17920,  16896,  19968,  18944,
     30208,  29184,  32256,  31232,  26112,  25088,  28160,  27136,
     11008,  10496,  12032,  11520,   8960,   8448,   9984,   9472,
     15104,  14592,  16128,  15616,  13056,  12544,  14080,  13568,
       344,    328,    376,    360,    280,    264,    312,    296,
       472,    456,    504,    488,    408,    392,    440,    424,
        88,     72,    120,    104,     24,      8,     56,     40,
       216,    200,    248,    232,    152,    136,    184,    168,
      1376,   1312,   1504,   1440,   1120,   1056,   1248,   1184,
      1888,   1824,   2016,   1952,   1632,   1568,   1760,   1696,
       688,    656,    752,    720,    560,    528,    624,    592,
       944,    912,   1008,    976,    816,    784,    880,    848,
];

/// G.711 µ-law expansion, indexed by the stored byte.
static MULAW_TABLE: [i16; 256] = [
    -32124, -31100, -30076, -29052, -28028, -27004, -25980, -24956,
    -23932, -22908, -21884, -20860, -19836, -18812, -17788, -16764,
    -15996, -15484, -14972, -14460, -13948, -13436, -12924, -12412,
    -11900, -11388, -10876, -10364,  -9852,  -9340,  -8828,  -8316,
     -7932,  -7676,  -7420,  -7164,  -6908,  -6652,  -6396,  -6140,
     -5884,  -5628,  -5372,  -5116,  -4860,  -4604,  -4348,  -4092,
     -3900,  -3772,  -3644,  -3516,  -3388,  -3260,  -3132,  -3004,
     -2876,  -2748,  -2620,  -2492,  -2364,  -2236,  -2108,  -1980,
     -1884,  -1820,  -1756,  -1692,  -1628,  -1564,  -1500,  -1436,
     -1372,  -1308,  -1244,  -1180,  -1116,  -1052,   -988,   -924,
      -876,   -844,   -812,   -780,   -748,   -716,   -684,   -652,
      -620,   -588,   -556,   -524,   -492,   -460,   -428,   -396,
      -372,   -356,   -340,   -324,   -308,   -292,   -276,   -260,
      -244,   -228,   -212,   -196,   -180,   -164,   -148,   -132,
      -120,   -112,   -104,    -96,    -88,    -80,    -72,    -64,
       -56,    -48,    -40,    -32,    -24,    -16,     -8,      0,
     32124,  31100,  30076,  29052,  28028,  27004,  25980,  24956,
     23932,  22908,  21884,  20860,  19836,  18812,  17788,  16764,
     15996,  15484,  14972,  14460,  13948,  13436,  12924,  12412,
     11900,  11388,  10876,  10364,   9852,   9340,   8828,   8316,
      7932,   7676,   7420,   7164,   6908,   6652,   6396,   6140,
      5884,   5628,   5372,   5116,   4860,   4604,   4348,   4092,
      3900,   3772,   3644,   3516,   3388,   3260,   3132,   3004,
      2876,   2748,   2620,   2492,   2364,   2236,   2108,   1980,
      1884,   1820,   1756,   1692,   1628,   1564,   1500,   1436,
      1372,   1308,   1244,   1180,   1116,   1052,    988,    924,
       876,    844,    812,    780,    748,    716,    684,    652,
       620,    588,    556,    524,    492,    460,    428,    396,
       372,    356,    340,    324,    308,    292,    276,    260,
       244,    228,    212,    196,    180,    164,    148,    132,
       120,    112,    104,     96,     88,     80,     72,     64,
        56,     48,     40,     32,     24,     16,      8,      0,
];

#[test]
fn pcm8_reference_values() {
    assert_eq!(decode_sample(AudioFormat::Pcm, 8, &[0x80]).unwrap(), 0);
    assert_eq!(decode_sample(AudioFormat::Pcm, 8, &[0x00]).unwrap(), -32768);
    assert_eq!(decode_sample(AudioFormat::Pcm, 8, &[0xff]).unwrap(), 32512);
}

#[test]
fn pcm8_is_monotonic() {
    let decoded: Vec<i16> = (0..=255_u8).map(|x| Encoding::Pcm8.decode(&[x])).collect();
    for pair in decoded.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
}

#[test]
fn pcm16_and_pcm32_read_little_endian() {
    assert_eq!(Encoding::Pcm16.decode(&[0x34, 0x12]), 0x1234);
    assert_eq!(Encoding::Pcm16.decode(&[0x00, 0x80]), i16::MIN);

    // The high 16 bits survive, the low 16 bits are dropped.
    assert_eq!(Encoding::Pcm32.decode(&[0xff, 0xff, 0x34, 0x12]), 0x1234);
    assert_eq!(Encoding::Pcm32.decode(&(-1_i32).to_le_bytes()), -1);
    assert_eq!(Encoding::Pcm32.decode(&i32::MIN.to_le_bytes()), i16::MIN);
    assert_eq!(Encoding::Pcm32.decode(&i32::MAX.to_le_bytes()), i16::MAX);
}

#[test]
fn float_reference_values() {
    let f32_cases = [(0.0_f32, 0_i16), (-1.0, -32768), (1.0, 32767), (2.0, 32767),
                     (-2.0, -32768), (0.5, 16383)];
    for &(x, expected) in &f32_cases {
        assert_eq!(Encoding::Float32.decode(&x.to_le_bytes()), expected, "f32 {}", x);
    }

    let f64_cases = [(0.0_f64, 0_i16), (-1.0, -32768), (1.0, 32767), (3.0, 32767),
                     (-0.5, -16384)];
    for &(x, expected) in &f64_cases {
        assert_eq!(Encoding::Float64.decode(&x.to_le_bytes()), expected, "f64 {}", x);
    }
}

#[test]
fn companding_tables_are_sign_symmetric() {
    for &encoding in &[Encoding::ALaw, Encoding::MuLaw] {
        for x in 0..=255_u8 {
            let a = encoding.decode(&[x]) as i32;
            let b = encoding.decode(&[x ^ 0x80]) as i32;
            assert_eq!(a, -b, "{:?} byte {:#04x}", encoding, x);
        }
    }
    assert_eq!(Encoding::MuLaw.decode(&[0x7f]), 0);
    assert_eq!(Encoding::MuLaw.decode(&[0xff]), 0);
    assert_eq!(Encoding::ALaw.decode(&[0xd5]), 8);
    assert_eq!(Encoding::ALaw.decode(&[0x55]), -8);
}

#[test]
fn unsupported_bit_depths_are_rejected() {
    let cases = [(AudioFormat::Pcm, 24), (AudioFormat::Pcm, 12), (AudioFormat::IeeeFloat, 16),
                 (AudioFormat::ALaw, 16), (AudioFormat::MuLaw, 4)];
    for &(format, bits) in &cases {
        match Encoding::from_format(format, bits) {
            Err(Error::UnsupportedBitDepth { format: f, bits: b }) => {
                assert_eq!((f, b), (format, bits));
            }
            other => panic!("expected UnsupportedBitDepth, got {:?}", other),
        }
    }
}

#[test]
fn unsupported_formats_are_rejected() {
    for &format in &[AudioFormat::None, AudioFormat::AdPcm, AudioFormat::Other(0x55),
                     AudioFormat::Extensible] {
        match Encoding::from_format(format, 16) {
            Err(Error::UnsupportedFormat(f)) => assert_eq!(f, format),
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
    }
}

#[test]
fn extensible_resolves_via_sub_format() {
    use super::wav::FormatExtension;

    let mut fmt = FormatChunk {
        audio_format: AudioFormat::Extensible.code(),
        channels: 1,
        sample_rate: 8000,
        byte_rate: 8000,
        block_align: 1,
        bits_per_sample: 8,
        extension: Some(FormatExtension {
            size: 22,
            valid_bits_per_sample: 8,
            channel_mask: 0x4,
            sub_format: Some(Guid::SUBTYPE_MULAW),
        }),
    };
    assert_eq!(Encoding::resolve(&fmt).unwrap(), Encoding::MuLaw);

    fmt.extension.as_mut().unwrap().sub_format = Some(Guid::SUBTYPE_PCM);
    assert_eq!(Encoding::resolve(&fmt).unwrap(), Encoding::Pcm8);

    fmt.extension.as_mut().unwrap().sub_format = Some(Guid::SUBTYPE_MPEG);
    assert!(matches!(Encoding::resolve(&fmt), Err(Error::UnsupportedFormat(_))));

    fmt.extension.as_mut().unwrap().sub_format = Some(Guid::SUBTYPE_ADPCM);
    assert!(matches!(Encoding::resolve(&fmt),
                     Err(Error::UnsupportedFormat(AudioFormat::AdPcm))));

    fmt.extension.as_mut().unwrap().sub_format = None;
    assert!(matches!(Encoding::resolve(&fmt), Err(Error::MalformedChunk(_))));
}

#[test]
fn short_input_is_truncated() {
    assert!(matches!(decode_sample(AudioFormat::Pcm, 16, &[0x01]),
                     Err(Error::TruncatedStream)));
    assert!(matches!(decode_sample(AudioFormat::IeeeFloat, 64, &[0; 4]),
                     Err(Error::TruncatedStream)));
}
