//! Decoder for the TENMA "72-8705" capture format.
//!
//! A 124-byte main header carries the model signature and the channel
//! count. Each channel follows as a 62-byte sub-header and a run of
//! little-endian 16-bit samples, with `0xFFFF` acting as a "no data"
//! sentinel that is dropped from the output. An 8-byte trailer closes the
//! file. Scaling fields are stored in picoseconds and microvolts.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
};

use crate::{
    capture::{compact, ChannelMeta, ChannelRecord, WaveformCapture},
    error::{CorruptError, DecodeError},
    layout::{read_array, read_vec, FieldDef, FieldKind, Record},
};

pub const SIGNATURE: &[u8; 7] = b"72-8705";

/// Raw sample value meaning "no data captured at this point".
const SENTINEL: u16 = u16::MAX;

const TRAILER_SIZE: usize = 8;

/// Main file header.
mod header {
    use super::{FieldDef, FieldKind::*};

    pub const SIGNATURE: FieldDef = FieldDef::ascii("signature", 10, 7);
    pub const NUM_CHANNELS: FieldDef = FieldDef::new("num_channels", 97, U8);
    pub const SIZE: usize = 124;
}

/// Per-channel sub-header.
mod sub {
    use super::{FieldDef, FieldKind::*};

    pub const CHANNEL: FieldDef = FieldDef::new("channel", 0, U8);
    pub const COUPLING: FieldDef = FieldDef::new("coupling", 1, U8);
    pub const BANDWIDTH_LIMIT: FieldDef = FieldDef::new("bandwidth_limit", 2, U8);
    pub const PROBE_CODE: FieldDef = FieldDef::new("probe_code", 11, U8);
    pub const INVERT: FieldDef = FieldDef::new("invert", 12, U8);
    pub const ZERO_POINT: FieldDef = FieldDef::new("zero_point", 13, U16Le);
    /// Microvolts.
    pub const VOLTS_PER_DIV: FieldDef = FieldDef::new("volts_per_div", 15, U64Le);
    /// Picoseconds. The first channel block stores this signed, the second
    /// unsigned; the format is read as observed.
    pub const HOR_POS_SIGNED: FieldDef = FieldDef::new("hor_pos", 23, I64Le);
    pub const HOR_POS_UNSIGNED: FieldDef = FieldDef::new("hor_pos", 23, U64Le);
    /// Picoseconds.
    pub const TIME_PER_DIV: FieldDef = FieldDef::new("time_per_div", 31, U64Le);
    /// Picoseconds.
    pub const TIME_PER_POINT: FieldDef = FieldDef::new("time_per_point", 39, U64Le);
    pub const SAMPLE_LENGTH: FieldDef = FieldDef::new("sample_length", 47, U32Le);
    pub const HOR_POS_POINTS: FieldDef = FieldDef::new("hor_pos_points", 51, U32Le);
    pub const SIZE: usize = 62;
}

/// Probe switch codes as the scope stores them.
const PROBE_FACTORS: [(u8, f64); 4] = [(0, 1.0), (1, 10.0), (4, 100.0), (3, 1000.0)];

pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<WaveformCapture, DecodeError> {
    decode(File::open(path)?)
}

pub fn decode<R: Read + Seek>(mut reader: R) -> Result<WaveformCapture, DecodeError> {
    reader.seek(SeekFrom::Start(header::SIGNATURE.offset as u64))?;
    let mut signature = [0u8; 7];
    if reader.read_exact(&mut signature).is_err() || &signature != SIGNATURE {
        return Err(DecodeError::UnsupportedFormat { expected: "72-8705" });
    }

    let file_len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;
    let main = read_vec(&mut reader, header::SIZE, "main header")?;
    let main = Record::new(&main);
    let num_channels = main.u8(&header::NUM_CHANNELS);
    if !(1..=2).contains(&num_channels) {
        return Err(CorruptError::FieldRange {
            field: header::NUM_CHANNELS.name,
            value: i64::from(num_channels),
        }
        .into());
    }

    let first = read_channel(&mut reader, file_len, HorPos::Signed)?;
    let (channel_a, channel_b) = if num_channels == 2 {
        let second = read_channel(&mut reader, file_len, HorPos::Unsigned)?;
        (record(0, first), record(1, second))
    } else {
        synthesize_pair(first)
    };

    // Trailer content is ignored but its presence is part of the format.
    read_array::<TRAILER_SIZE, _>(&mut reader, "trailer")?;

    Ok(WaveformCapture {
        channel_a,
        channel_b,
    })
}

/// How a block stores its horizontal position field.
#[derive(Debug, Clone, Copy)]
enum HorPos {
    Signed,
    Unsigned,
}

struct Channel {
    /// Physical channel number from the sub-header, 0 or 1.
    index: u8,
    timestamps: Vec<f64>,
    voltages: Vec<f64>,
    meta: ChannelMeta,
}

fn read_channel<R: Read + Seek>(
    reader: &mut R,
    file_len: u64,
    hor_pos: HorPos,
) -> Result<Channel, DecodeError> {
    let buf = read_vec(reader, sub::SIZE, "channel header")?;
    let rec = Record::new(&buf);

    let index = rec.u8(&sub::CHANNEL);
    let zero_point = f64::from(rec.u16_le(&sub::ZERO_POINT));
    let volts_per_div = rec.u64_le(&sub::VOLTS_PER_DIV);
    let time_per_div = rec.u64_le(&sub::TIME_PER_DIV);
    let time_per_point = rec.u64_le(&sub::TIME_PER_POINT) as f64;
    let sample_length = rec.u32_le(&sub::SAMPLE_LENGTH) as usize;

    let probe_code = rec.u8(&sub::PROBE_CODE);
    let attenuation = PROBE_FACTORS
        .iter()
        .find(|(code, _)| *code == probe_code)
        .map(|(_, factor)| *factor)
        .ok_or(CorruptError::Lookup {
            table: sub::PROBE_CODE.name,
            code: i64::from(probe_code),
        })?;

    let hor_pos = match hor_pos {
        HorPos::Signed => rec.i64_le(&sub::HOR_POS_SIGNED),
        HorPos::Unsigned => rec.u64_le(&sub::HOR_POS_UNSIGNED) as i64,
    };
    log::debug!(
        "channel {}: coupling {}, bandwidth limit {}, invert {}, hpos {} pS ({} points)",
        index + 1,
        rec.u8(&sub::COUPLING),
        rec.u8(&sub::BANDWIDTH_LIMIT),
        rec.u8(&sub::INVERT),
        hor_pos,
        rec.u32_le(&sub::HOR_POS_POINTS),
    );

    // Checked against the file length up front so a corrupt length fails
    // before the sample buffer is allocated.
    let data_start = reader.stream_position()?;
    if data_start + 2 * sample_length as u64 > file_len {
        return Err(CorruptError::Truncated {
            section: "sample data",
            offset: data_start,
        }
        .into());
    }
    let data = read_vec(reader, sample_length * 2, "sample data")?;
    let mut timestamps = Vec::with_capacity(sample_length);
    let mut voltages = Vec::with_capacity(sample_length);
    for (point, pair) in data.chunks_exact(2).enumerate() {
        let raw = u16::from_le_bytes([pair[0], pair[1]]);
        if raw == SENTINEL {
            continue;
        }
        voltages.push((f64::from(raw) - zero_point) * volts_per_div as f64 / 256.0 / 1e5);
        // The dropped sentinels still advance the point index, so kept
        // samples keep their true positions on the time axis.
        timestamps.push(point as f64 * time_per_point / 1e12);
    }

    Ok(Channel {
        index,
        timestamps,
        voltages,
        meta: ChannelMeta {
            label: (index + 1).to_string(),
            sample_count: sample_length,
            time_per_div: time_string(time_per_div),
            volts_per_div: volt_string(volts_per_div),
            probe_attenuation: attenuation,
        },
    })
}

fn record(channel_index: u8, channel: Channel) -> ChannelRecord {
    ChannelRecord {
        channel_index,
        timestamps: channel.timestamps,
        voltages: channel.voltages,
        meta: Some(channel.meta),
    }
}

/// Builds both records from a single-channel file. The present channel is
/// whichever physical channel the sub-header names; the other takes the
/// same time base with all-zero voltages.
fn synthesize_pair(present: Channel) -> (ChannelRecord, ChannelRecord) {
    let zeros = ChannelRecord {
        channel_index: if present.index == 1 { 0 } else { 1 },
        timestamps: present.timestamps.clone(),
        voltages: vec![0.0; present.timestamps.len()],
        meta: None,
    };
    if present.index == 1 {
        (zeros, record(1, present))
    } else {
        (record(0, present), zeros)
    }
}

/// Renders a picosecond quantity with the unit the scope would display.
fn time_string(picoseconds: u64) -> String {
    let ps = picoseconds as f64;
    let (value, unit) = if ps < 1e3 {
        (ps, "pS")
    } else if ps < 1e6 {
        (ps / 1e3, "nS")
    } else if ps < 1e9 {
        (ps / 1e6, "uS")
    } else if ps < 1e12 {
        (ps / 1e9, "mS")
    } else {
        (ps / 1e12, "S")
    };
    format!("{} {unit}", compact(value))
}

fn volt_string(microvolts: u64) -> String {
    let uv = microvolts as f64;
    let (value, unit) = if uv < 1e3 {
        (uv, "uV")
    } else if uv < 1e6 {
        (uv / 1e3, "mV")
    } else {
        (uv / 1e6, "V")
    };
    format!("{} {unit}", compact(value))
}
