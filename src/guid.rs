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

use std::fmt;
use std::str;
use super::{Error, Result};

/// A 16-byte identifier, as used for the sub-format of a
/// `WAVE_FORMAT_EXTENSIBLE` fmt chunk.
///
/// The bytes are kept in the order in which they appear in the file. When
/// written to a wav file, the byte order of a GUID is native for the first
/// three sections, which is assumed to be little endian, and big endian for
/// the last 8-byte section. The hex notation used here is simply the bytes in
/// stream order, so `KSDATAFORMAT_SUBTYPE_PCM`
/// (00000001-0000-0010-8000-00aa00389b71) reads
/// `0x0100000000001000800000aa00389b71`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Guid([u8; 16]);

/// Builds a `KSDATAFORMAT_SUBTYPE_*` GUID, these differ only in the first byte.
const fn subtype(tag: u8) -> Guid {
    Guid([tag, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00,
          0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71])
}

impl Guid {
    /// Subformat type for PCM audio with integer samples.
    pub const SUBTYPE_PCM: Guid = subtype(0x01);
    /// Subformat type for Microsoft ADPCM audio.
    pub const SUBTYPE_ADPCM: Guid = subtype(0x02);
    /// Subformat type for IEEE_FLOAT audio with float samples.
    pub const SUBTYPE_IEEE_FLOAT: Guid = subtype(0x03);
    /// Subformat type for G.711 A-law audio.
    pub const SUBTYPE_ALAW: Guid = subtype(0x06);
    /// Subformat type for G.711 µ-law audio.
    pub const SUBTYPE_MULAW: Guid = subtype(0x07);
    /// Subformat type for MPEG-1 audio.
    pub const SUBTYPE_MPEG: Guid = subtype(0x50);

    /// Wraps 16 bytes in stream order.
    pub const fn from_bytes(bytes: [u8; 16]) -> Guid {
        Guid(bytes)
    }

    /// Returns the bytes in stream order.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Parses a `0x`-prefixed string of 32 hex digits.
    ///
    /// Every pair of digits becomes one byte, in stream order. Upper and lower
    /// case digits are both accepted.
    pub fn parse(hex: &str) -> Result<Guid> {
        let digits = match hex.as_bytes() {
            [b'0', b'x', rest @ ..] | [b'0', b'X', rest @ ..] => rest,
            _ => return Err(Error::MalformedGuid),
        };
        if digits.len() != 32 {
            return Err(Error::MalformedGuid);
        }

        let mut bytes = [0u8; 16];
        for (byte, pair) in bytes.iter_mut().zip(digits.chunks_exact(2)) {
            let high = hex_value(pair[0]).ok_or(Error::MalformedGuid)?;
            let low = hex_value(pair[1]).ok_or(Error::MalformedGuid)?;
            *byte = high << 4 | low;
        }
        Ok(Guid(bytes))
    }

    /// Formats the GUID as `0x` followed by 32 lowercase hex digits.
    pub fn to_hex_string(&self) -> String {
        let mut result = String::with_capacity(34);
        result.push_str("0x");
        for byte in &self.0 {
            result.push_str(&format!("{:02x}", byte));
        }
        result
    }
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

impl str::FromStr for Guid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Guid> {
        Guid::parse(s)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(&self.to_hex_string())
    }
}

#[test]
fn parse_known_subtype() {
    let guid = Guid::parse("0x0100000000001000800000aa00389b71").unwrap();
    assert_eq!(guid, Guid::SUBTYPE_PCM);
    assert_eq!(guid.as_bytes()[0], 0x01);
    assert_eq!(guid.as_bytes()[15], 0x71);

    let mpeg: Guid = "0x5000000000001000800000AA00389B71".parse().unwrap();
    assert_eq!(mpeg, Guid::SUBTYPE_MPEG);
}

#[test]
fn hex_string_round_trips() {
    let strings = ["0x0300000000001000800000aa00389b71",
                   "0x00000000000000000000000000000000",
                   "0xffffffffffffffffffffffffffffffff",
                   "0x0123456789abcdeffedcba9876543210"];
    for s in &strings {
        assert_eq!(&Guid::parse(s).unwrap().to_hex_string(), s);
    }

    for guid in &[Guid::SUBTYPE_ALAW, Guid::SUBTYPE_MULAW, Guid::SUBTYPE_ADPCM] {
        assert_eq!(Guid::parse(&guid.to_string()).unwrap(), *guid);
    }
}

#[test]
fn malformed_strings_are_rejected() {
    let bad = ["",
               "0x",
               "0100000000001000800000aa00389b71",
               "0x0100000000001000800000aa00389b7",
               "0x0100000000001000800000aa00389b7100",
               "0y0100000000001000800000aa00389b71",
               "0x0100000000001000800000aa00389bzz",
               "0x01000000000010008000+0aa00389b71",
               "0x01000000000010008000é0aa00389b7"];
    for s in &bad {
        match Guid::parse(s) {
            Err(Error::MalformedGuid) => {}
            other => panic!("expected MalformedGuid for {:?}, got {:?}", s, other),
        }
    }
}

#[test]
fn equality_is_byte_wise() {
    let mut bytes = *Guid::SUBTYPE_PCM.as_bytes();
    assert_eq!(Guid::from_bytes(bytes), Guid::SUBTYPE_PCM);
    bytes[15] ^= 1;
    assert!(Guid::from_bytes(bytes) != Guid::SUBTYPE_PCM);
    assert!(Guid::SUBTYPE_PCM != Guid::SUBTYPE_IEEE_FLOAT);
}
