//! Prints the per-channel report for a capture file, trying the TENMA
//! format first and falling back to OWON.

use std::{env, process::ExitCode};

use scopesav::{owon, tenma, DecodeError};

fn main() -> ExitCode {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: savdump <capture.sav>");
        return ExitCode::FAILURE;
    };

    let capture = match tenma::decode_file(&path) {
        Err(DecodeError::UnsupportedFormat { .. }) => owon::decode_file(&path),
        result => result,
    };
    match capture {
        Ok(capture) => {
            for diag in capture.diagnostics() {
                println!("{diag}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{path}: {err}");
            ExitCode::FAILURE
        }
    }
}
