//! Decoder for the OWON "SPBV01" capture format.
//!
//! The file opens with a 6-byte model signature, then channel blocks from
//! offset 0x0A. Each block is a 3-byte `"CHx"` tag followed by a fixed
//! little-endian header and a run of signed 16-bit samples. Time and volt
//! per-division settings are stored as codes into fixed base/unit tables.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
};

use crate::{
    capture::{compact, ChannelMeta, ChannelRecord, WaveformCapture},
    error::{CorruptError, DecodeError},
    layout::{read_vec, FieldDef, FieldKind, Record},
};

pub const SIGNATURE: &[u8; 6] = b"SPBV01";

/// Offset of the first channel block tag.
const FIRST_BLOCK: u64 = 0x0A;

/// Channel block header, offsets relative to the block's `"CHx"` tag.
mod block {
    use super::{FieldDef, FieldKind::*};

    pub const TAG: FieldDef = FieldDef::ascii("tag", 0x00, 3);
    /// Stored without the tag; negative values are a sign quirk of some
    /// firmware revisions and are read as their absolute value.
    pub const BLOCK_SIZE: FieldDef = FieldDef::new("block_size", 0x03, I32Le);
    pub const SAMPLE_COUNT: FieldDef = FieldDef::new("sample_count", 0x0B, I32Le);
    pub const TIME_DIV_CODE: FieldDef = FieldDef::new("time_div_code", 0x13, I32Le);
    pub const ZERO_LEVEL: FieldDef = FieldDef::new("zero_level", 0x17, I32Le);
    pub const VOLT_DIV_CODE: FieldDef = FieldDef::new("volt_div_code", 0x1B, I32Le);
    pub const PROBE_INDEX: FieldDef = FieldDef::new("probe_index", 0x1F, I32Le);
    pub const FREQUENCY: FieldDef = FieldDef::new("frequency", 0x27, I32Le);
    pub const PERIOD: FieldDef = FieldDef::new("period", 0x2B, I32Le);
    pub const MV_PER_BIT: FieldDef = FieldDef::new("mv_per_bit", 0x2F, F32Le);
    /// Header bytes before the sample run.
    pub const SIZE: usize = 0x33;
}

const TIME_BASE: [f64; 9] = [1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0];
const TIME_UNITS: [(&str, f64); 4] = [("nS", 1e-9), ("uS", 1e-6), ("mS", 1e-3), ("S", 1.0)];
const VOLT_BASE: [f64; 9] = [1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0];
const VOLT_UNITS: [(&str, f64); 2] = [("mV", 1e-3), ("V", 1.0)];
const PROBE_ATTENUATION: [f64; 4] = [1.0, 10.0, 100.0, 1000.0];

pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<WaveformCapture, DecodeError> {
    decode(File::open(path)?)
}

pub fn decode<R: Read + Seek>(mut reader: R) -> Result<WaveformCapture, DecodeError> {
    let mut signature = [0u8; 6];
    if reader.read_exact(&mut signature).is_err() || &signature != SIGNATURE {
        return Err(DecodeError::UnsupportedFormat { expected: "SPBV01" });
    }
    let file_len = reader.seek(SeekFrom::End(0))?;

    let mut block_start = FIRST_BLOCK;
    let ch1 = channel_block(&mut reader, &mut block_start, file_len, "CH1")?;
    let ch2 = channel_block(&mut reader, &mut block_start, file_len, "CH2")?;
    Ok(pair(ch1, ch2))
}

struct Block {
    timestamps: Vec<f64>,
    voltages: Vec<f64>,
    meta: ChannelMeta,
}

/// Decodes the block at `block_start` if its tag matches, advancing
/// `block_start` past it. A missing or mismatched tag means the channel is
/// off; the scan stays at the same block start so the next tag can be tried
/// there.
fn channel_block<R: Read + Seek>(
    reader: &mut R,
    block_start: &mut u64,
    file_len: u64,
    tag: &'static str,
) -> Result<Option<Block>, DecodeError> {
    reader.seek(SeekFrom::Start(*block_start))?;
    let mut tag_buf = [0u8; 3];
    if reader.read_exact(&mut tag_buf).is_err() || tag_buf != *tag.as_bytes() {
        return Ok(None);
    }

    reader.seek(SeekFrom::Start(*block_start))?;
    let header = read_vec(reader, block::SIZE, "channel block header")?;
    let rec = Record::new(&header);
    debug_assert_eq!(rec.ascii(&block::TAG), tag.as_bytes());

    // +3 so the size covers the tag as well
    let block_size = u64::from(rec.i32_le(&block::BLOCK_SIZE).unsigned_abs()) + 3;
    if *block_start + block_size > file_len {
        return Err(CorruptError::BlockOverrun {
            declared: block_size,
            remaining: file_len - *block_start,
        }
        .into());
    }

    let raw_count = rec.i32_le(&block::SAMPLE_COUNT);
    let sample_count = usize::try_from(raw_count).map_err(|_| CorruptError::FieldRange {
        field: block::SAMPLE_COUNT.name,
        value: i64::from(raw_count),
    })?;

    let time_code = rec.i32_le(&block::TIME_DIV_CODE);
    let (time_per_div, time_str) = div_scale(
        time_code.saturating_add(2),
        &TIME_BASE,
        &TIME_UNITS,
        block::TIME_DIV_CODE.name,
    )?;
    let volt_code = rec.i32_le(&block::VOLT_DIV_CODE);
    let (_, volt_str) = div_scale(
        volt_code.saturating_add(1),
        &VOLT_BASE,
        &VOLT_UNITS,
        block::VOLT_DIV_CODE.name,
    )?;

    let probe_index = rec.i32_le(&block::PROBE_INDEX);
    let attenuation = usize::try_from(probe_index)
        .ok()
        .and_then(|i| PROBE_ATTENUATION.get(i).copied())
        .ok_or(CorruptError::Lookup {
            table: block::PROBE_INDEX.name,
            code: i64::from(probe_index),
        })?;
    let mv_per_bit = f64::from(rec.f32_le(&block::MV_PER_BIT));
    log::debug!(
        "{tag}: zero level {}, frequency {}, period {}, {} mV/bit",
        rec.i32_le(&block::ZERO_LEVEL),
        rec.i32_le(&block::FREQUENCY),
        rec.i32_le(&block::PERIOD),
        mv_per_bit,
    );

    // Checked against the file length up front so a corrupt count fails
    // before the sample buffer is allocated.
    let data_start = reader.stream_position()?;
    if data_start + 2 * sample_count as u64 > file_len {
        return Err(CorruptError::Truncated {
            section: "sample data",
            offset: data_start,
        }
        .into());
    }
    let data = read_vec(reader, sample_count * 2, "sample data")?;
    let secs_per_sample = time_per_div / sample_count as f64 * 10.0;
    let mut timestamps = Vec::with_capacity(sample_count);
    let mut voltages = Vec::with_capacity(sample_count);
    for (i, pair) in data.chunks_exact(2).enumerate() {
        let raw = f64::from(i16::from_le_bytes([pair[0], pair[1]]));
        voltages.push(raw * mv_per_bit / 1000.0 * attenuation);
        timestamps.push(secs_per_sample * i as f64);
    }

    *block_start += block_size;
    Ok(Some(Block {
        timestamps,
        voltages,
        meta: ChannelMeta {
            label: tag.to_string(),
            sample_count,
            time_per_div: time_str,
            volts_per_div: volt_str,
            probe_attenuation: attenuation,
        },
    }))
}

/// Decodes a per-division code into a physical scale and its display string.
///
/// The code (already offset by the caller) selects a base value by modulo
/// and a unit magnitude by integer division over the 9-entry base table.
fn div_scale(
    code: i32,
    base: &[f64],
    units: &[(&'static str, f64)],
    table: &'static str,
) -> Result<(f64, String), CorruptError> {
    let lookup_failure = CorruptError::Lookup {
        table,
        code: i64::from(code),
    };
    let index = usize::try_from(code).map_err(|_| lookup_failure.clone())?;
    let (label, magnitude) = units.get(index / base.len()).ok_or(lookup_failure)?;
    let value = base[index % base.len()];
    Ok((value * magnitude, format!("{}{label}/div", compact(value))))
}

/// Applies the borrow-time-base rule: an off channel takes the other
/// channel's timestamps with all-zero voltages, so both records always hold
/// equal-length, paired series.
fn pair(ch1: Option<Block>, ch2: Option<Block>) -> WaveformCapture {
    let (a, b) = match (ch1, ch2) {
        (Some(a), Some(b)) => (record(0, a), record(1, b)),
        (Some(a), None) => {
            let b = placeholder(1, &a.timestamps);
            (record(0, a), b)
        }
        (None, Some(b)) => {
            let a = placeholder(0, &b.timestamps);
            (a, record(1, b))
        }
        // Both channels off: a single zero sample each, as the original
        // vendor files are reported by their own tools.
        (None, None) => (placeholder(0, &[0.0]), placeholder(1, &[0.0])),
    };
    WaveformCapture {
        channel_a: a,
        channel_b: b,
    }
}

fn record(channel_index: u8, block: Block) -> ChannelRecord {
    ChannelRecord {
        channel_index,
        timestamps: block.timestamps,
        voltages: block.voltages,
        meta: Some(block.meta),
    }
}

fn placeholder(channel_index: u8, timestamps: &[f64]) -> ChannelRecord {
    ChannelRecord {
        channel_index,
        timestamps: timestamps.to_vec(),
        voltages: vec![0.0; timestamps.len()],
        meta: None,
    }
}
