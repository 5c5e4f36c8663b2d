// Pcmwav -- A wav decoding and encoding library in Rust
// Copyright 2018 Ruud van Asseldonk
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

use pcmwav::wav::{ChunkHeader, FormatChunk};
use pcmwav::{Error, WavReader, WavSpec};

fn assert_contents(fname: &std::path::Path, expected: &[i16]) {
    let mut reader = WavReader::open(fname).unwrap();
    let samples: Vec<i16> = reader.samples().map(|s| s.unwrap()).collect();
    assert_eq!(&samples[..], expected);
}

#[test]
fn save_then_load_stereo_48k() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");

    let spec = WavSpec {
        channels: 2,
        sample_rate: 48000,
    };
    let samples: Vec<i16> = (0..100).flat_map(|_| vec![1000, -1000]).collect();
    pcmwav::save(&path, spec, 100, &samples).unwrap();

    // 44 bytes of header, 400 bytes of data.
    assert_eq!(fs::metadata(&path).unwrap().len(), 444);

    let decoded = pcmwav::load(&path).unwrap();
    assert_eq!(decoded.spec.sample_rate, 48000);
    assert_eq!(decoded.spec.channels, 2);
    assert_eq!(decoded.frames, 100);
    assert_eq!(decoded.samples, samples);

    assert_contents(&path, &samples);
}

#[test]
fn save_round_trips_many_layouts() {
    let dir = tempfile::tempdir().unwrap();

    for &(channels, sample_rate, frames) in &[(1_u16, 8000_u32, 0_u32), (1, 44100, 257),
                                               (6, 96000, 31), (16, 11025, 3)] {
        let path = dir.path().join(format!("{}-{}-{}.wav", channels, sample_rate, frames));
        let spec = WavSpec {
            channels: channels,
            sample_rate: sample_rate,
        };
        let samples: Vec<i16> = (0..frames as i32 * channels as i32)
            .map(|i| (i * 7919 % 65536 - 32768) as i16)
            .collect();
        pcmwav::save(&path, spec, frames, &samples).unwrap();

        let decoded = pcmwav::load(&path).unwrap();
        assert_eq!(decoded.spec, spec);
        assert_eq!(decoded.frames, frames);
        assert_eq!(decoded.samples, samples);
    }
}

#[test]
fn save_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overwrite.wav");
    fs::write(&path, vec![0xaa; 4096]).unwrap();

    let spec = WavSpec {
        channels: 1,
        sample_rate: 44100,
    };
    pcmwav::save(&path, spec, 3, &[11, 13, 17]).unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 44 + 6);
    assert_contents(&path, &[11, 13, 17]);
}

#[test]
fn save_reports_unwritable_destination() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("out.wav");

    let spec = WavSpec {
        channels: 1,
        sample_rate: 44100,
    };
    match pcmwav::save(&path, spec, 1, &[0]) {
        Err(Error::Io(..)) => {}
        other => panic!("expected an IO error, got {:?}", other),
    }
}

#[test]
fn save_rejects_bad_input_without_creating_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.wav");

    let spec = WavSpec {
        channels: 2,
        sample_rate: 44100,
    };
    assert!(matches!(pcmwav::save(&path, spec, 2, &[1, 2, 3]),
                     Err(Error::SampleCountMismatch { expected: 4, actual: 3 })));

    let spec = WavSpec {
        channels: 0,
        sample_rate: 44100,
    };
    assert!(matches!(pcmwav::save(&path, spec, 0, &[]), Err(Error::InvalidSpec(..))));

    assert!(!path.exists());
}

#[test]
fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    match pcmwav::load(dir.path().join("nope.wav")) {
        Err(Error::Io(..)) => {}
        other => panic!("expected an IO error, got {:?}", other),
    }
}

#[test]
fn load_tolerates_list_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let plain_path = dir.path().join("plain.wav");
    let list_path = dir.path().join("list.wav");

    let spec = WavSpec {
        channels: 1,
        sample_rate: 16000,
    };
    let samples = [2, -3, 5, -7];
    pcmwav::save(&plain_path, spec, 4, &samples).unwrap();

    // Insert a LIST chunk between the fmt and data chunks.
    let plain = fs::read(&plain_path).unwrap();
    let fmt_end = 12 + FormatChunk::pcm16(spec).to_bytes().len();
    let list_body = b"INFOISFT\x06\x00\x00\x00hound\x00";
    let mut with_list = plain[..fmt_end].to_vec();
    with_list.extend_from_slice(&ChunkHeader { id: *b"LIST", len: list_body.len() as u32 }.to_bytes());
    with_list.extend_from_slice(list_body);
    with_list.extend_from_slice(&plain[fmt_end..]);
    let riff_len = (with_list.len() - 8) as u32;
    with_list[4..8].copy_from_slice(&riff_len.to_le_bytes());
    fs::write(&list_path, &with_list).unwrap();

    assert_eq!(pcmwav::load(&plain_path).unwrap(), pcmwav::load(&list_path).unwrap());
    assert_contents(&list_path, &samples);
}

#[test]
fn load_rejects_non_wave_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("avi.wav");
    fs::write(&path, b"RIFF\x04\x00\x00\x00AVI ").unwrap();

    match pcmwav::load(&path) {
        Err(Error::BadContainer(..)) => {}
        other => panic!("expected BadContainer, got {:?}", other),
    }
}
