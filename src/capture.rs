//! Decoded waveform captures.
//!
//! Both decoders produce the same shape: two channel records, each a pair of
//! index-aligned timestamp/voltage arrays plus the scaling parameters that
//! were decoded along the way. A channel that is off in the capture file is
//! still represented, carrying the other channel's time base and all-zero
//! voltages, so callers can always pair the two series without checking.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct WaveformCapture {
    pub channel_a: ChannelRecord,
    pub channel_b: ChannelRecord,
}

impl WaveformCapture {
    pub fn channels(&self) -> [&ChannelRecord; 2] {
        [&self.channel_a, &self.channel_b]
    }

    /// One diagnostic record per channel, mirroring the report the
    /// oscilloscope vendor tools print for a capture.
    pub fn diagnostics(&self) -> Vec<ChannelDiagnostic> {
        self.channels().iter().map(|ch| ch.diagnostic()).collect()
    }
}

/// One oscilloscope channel's captured trace.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRecord {
    /// Hardware channel identity, 0 or 1.
    pub channel_index: u8,
    /// Seconds, non-decreasing, index-aligned with `voltages`.
    pub timestamps: Vec<f64>,
    /// Volts.
    pub voltages: Vec<f64>,
    /// Decoded scaling parameters, `None` when the channel was off.
    pub meta: Option<ChannelMeta>,
}

impl ChannelRecord {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Whether this channel carried real data in the capture file.
    pub fn is_enabled(&self) -> bool {
        self.meta.is_some()
    }

    pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.voltages.iter().copied())
    }

    pub fn diagnostic(&self) -> ChannelDiagnostic {
        match &self.meta {
            Some(meta) => ChannelDiagnostic {
                channel: meta.label.clone(),
                enabled: true,
                sample_count: meta.sample_count,
                time_per_div: meta.time_per_div.clone(),
                volts_per_div: meta.volts_per_div.clone(),
            },
            None => ChannelDiagnostic {
                channel: format!("CH{}", self.channel_index + 1),
                enabled: false,
                sample_count: 0,
                time_per_div: String::new(),
                volts_per_div: String::new(),
            },
        }
    }
}

/// Scaling parameters decoded from a channel header, retained for
/// diagnostic reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMeta {
    /// Channel label as the capture names it, e.g. `"CH1"` or `"2"`.
    pub label: String,
    /// Sample count declared by the header. For TENMA this can exceed the
    /// array lengths when sentinel samples were dropped.
    pub sample_count: usize,
    pub time_per_div: String,
    pub volts_per_div: String,
    pub probe_attenuation: f64,
}

/// Structured form of the per-channel console report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDiagnostic {
    pub channel: String,
    pub enabled: bool,
    pub sample_count: usize,
    pub time_per_div: String,
    pub volts_per_div: String,
}

impl fmt::Display for ChannelDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.enabled {
            return write!(f, "{} is OFF", self.channel);
        }
        writeln!(f, "Channel: {}", self.channel)?;
        writeln!(f, "Number of Samples: {}", self.sample_count)?;
        writeln!(f, "Time per division: {}", self.time_per_div)?;
        write!(f, "Volt per division: {}", self.volts_per_div)
    }
}

/// Formats a scaled value the way the vendor reports read: integral values
/// without a decimal point ("500"), fractional ones as-is ("2.5").
pub(crate) fn compact(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn enabled_channel() -> ChannelRecord {
        ChannelRecord {
            channel_index: 0,
            timestamps: vec![0.0, 1e-6, 2e-6],
            voltages: vec![0.5, 1.0, -0.5],
            meta: Some(ChannelMeta {
                label: "CH1".to_string(),
                sample_count: 3,
                time_per_div: "2.5uS/div".to_string(),
                volts_per_div: "10mV/div".to_string(),
                probe_attenuation: 10.0,
            }),
        }
    }

    #[test]
    fn diagnostic_reports_enabled_channel() {
        let diag = enabled_channel().diagnostic();
        assert_eq!(
            diag,
            ChannelDiagnostic {
                channel: "CH1".to_string(),
                enabled: true,
                sample_count: 3,
                time_per_div: "2.5uS/div".to_string(),
                volts_per_div: "10mV/div".to_string(),
            }
        );
        assert_eq!(
            diag.to_string(),
            "Channel: CH1\nNumber of Samples: 3\nTime per division: 2.5uS/div\nVolt per division: 10mV/div"
        );
    }

    #[test]
    fn diagnostic_reports_off_channel() {
        let off = ChannelRecord {
            channel_index: 1,
            timestamps: vec![0.0; 3],
            voltages: vec![0.0; 3],
            meta: None,
        };
        let diag = off.diagnostic();
        assert!(!diag.enabled);
        assert_eq!(diag.to_string(), "CH2 is OFF");
    }

    #[test]
    fn samples_pairs_up_the_series() {
        let ch = enabled_channel();
        let pairs: Vec<_> = ch.samples().collect();
        assert_eq!(pairs, vec![(0.0, 0.5), (1e-6, 1.0), (2e-6, -0.5)]);
    }

    #[test]
    fn compact_formatting() {
        assert_eq!(compact(500.0), "500");
        assert_eq!(compact(2.5), "2.5");
        assert_eq!(compact(1.5), "1.5");
        assert_eq!(compact(1.0), "1");
    }
}
