//! Decoders for OWON and TENMA oscilloscope waveform captures.
//!
//! Two related fixed-layout binary formats are supported, selected by the
//! caller based on which file they have:
//!
//! - [`owon`] reads the legacy `"SPBV01"` signature format.
//! - [`tenma`] reads the `"72-8705"` `.sav` format.
//!
//! Both produce a [`WaveformCapture`]: two channel records of index-aligned
//! timestamp (seconds) and voltage (volts) arrays, plus the scaling
//! parameters decoded from the headers. An off channel is still present and
//! carries the other channel's time base with zero voltages.
//!
//! ```no_run
//! # fn main() -> Result<(), scopesav::DecodeError> {
//! let capture = scopesav::tenma::decode_file("captures/run01.sav")?;
//! for diag in capture.diagnostics() {
//!     println!("{diag}");
//! }
//! for (time, volts) in capture.channel_a.samples() {
//!     println!("{time}\t{volts}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod error;
pub mod layout;
pub mod owon;
pub mod tenma;

pub use capture::{ChannelDiagnostic, ChannelMeta, ChannelRecord, WaveformCapture};
pub use error::{CorruptError, DecodeError};
