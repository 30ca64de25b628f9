//! Interpretation of raw element values:
//! rendering to text, numeric conversion,
//! and conversion of DICOM dates and times to international notation.

use crate::header::VR;
use byteordered::byteorder::{ByteOrder, LittleEndian};
use chrono::{NaiveDate, NaiveTime};
use itertools::Itertools;
use snafu::{Backtrace, ResultExt, Snafu};
use std::num::{ParseFloatError, ParseIntError};

/// An error type for a failed attempt at converting a value
/// into another representation.
#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum ConvertValueError {
    /// The value representation cannot be converted to the requested type
    #[snafu(display("Cannot convert {} value to {}", vr, requested))]
    IncompatibleVr {
        vr: VR,
        requested: &'static str,
        backtrace: Backtrace,
    },
    /// The element has no value to convert
    #[snafu(display("Element has no value"))]
    NoValue { backtrace: Backtrace },
    /// The value is too short for the value representation
    #[snafu(display("{} value of {} bytes is too short", vr, len))]
    ShortValue {
        vr: VR,
        len: usize,
        backtrace: Backtrace,
    },
    /// Failed to parse an integer string
    #[snafu(display("Failed to parse integer string"))]
    ParseInteger {
        source: ParseIntError,
        backtrace: Backtrace,
    },
    /// Failed to parse a decimal string
    #[snafu(display("Failed to parse decimal string"))]
    ParseReal {
        source: ParseFloatError,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = ConvertValueError> = std::result::Result<T, E>;

/// Decode a textual value, removing the trailing padding.
pub fn trim_text(value: &[u8]) -> String {
    String::from_utf8_lossy(value)
        .trim_end_matches(|c: char| c == '\0' || c == ' ')
        .to_string()
}

/// Render a value of the given representation as text.
///
/// Numbers are printed in decimal notation and separated by backslashes
/// when there is more than one.
/// Value representations without a textual rendering yield `"na"`.
pub fn render(vr: VR, value: &[u8]) -> String {
    use VR::*;
    match vr {
        vr if vr.is_textual() => trim_text(value),
        AT => value
            .chunks_exact(4)
            .map(|c| {
                format!(
                    "0x{:04x},0x{:04x}",
                    LittleEndian::read_u16(&c[0..2]),
                    LittleEndian::read_u16(&c[2..4])
                )
            })
            .join("\\"),
        FL => value
            .chunks_exact(4)
            .map(LittleEndian::read_f32)
            .join("\\"),
        FD => value
            .chunks_exact(8)
            .map(LittleEndian::read_f64)
            .join("\\"),
        UL => value
            .chunks_exact(4)
            .map(LittleEndian::read_u32)
            .join("\\"),
        US => value
            .chunks_exact(2)
            .map(LittleEndian::read_u16)
            .join("\\"),
        SL => value
            .chunks_exact(4)
            .map(LittleEndian::read_i32)
            .join("\\"),
        SS => value
            .chunks_exact(2)
            .map(LittleEndian::read_i16)
            .join("\\"),
        SV => value
            .chunks_exact(8)
            .map(LittleEndian::read_i64)
            .join("\\"),
        UV => value
            .chunks_exact(8)
            .map(LittleEndian::read_u64)
            .join("\\"),
        _ => "na".to_string(),
    }
}

fn ensure_len(vr: VR, value: &[u8], size: usize) -> Result<()> {
    if value.len() < size {
        ShortValueSnafu {
            vr,
            len: value.len(),
        }
        .fail()
    } else {
        Ok(())
    }
}

fn first_text_value(value: &[u8]) -> String {
    let text = trim_text(value);
    text.split('\\').next().unwrap_or("").trim().to_string()
}

/// Interpret the first value as an integer.
/// Only UL, US, SL, SS and IS are admitted.
pub fn first_integer(vr: VR, value: &[u8]) -> Result<i64> {
    match vr {
        VR::UL => {
            ensure_len(vr, value, 4)?;
            Ok(LittleEndian::read_u32(value).into())
        }
        VR::US => {
            ensure_len(vr, value, 2)?;
            Ok(LittleEndian::read_u16(value).into())
        }
        VR::SL => {
            ensure_len(vr, value, 4)?;
            Ok(LittleEndian::read_i32(value).into())
        }
        VR::SS => {
            ensure_len(vr, value, 2)?;
            Ok(LittleEndian::read_i16(value).into())
        }
        VR::IS => first_text_value(value)
            .parse::<i64>()
            .context(ParseIntegerSnafu),
        vr => IncompatibleVrSnafu {
            vr,
            requested: "integer",
        }
        .fail(),
    }
}

/// Interpret the first value as a real number.
/// FL, FD and DS are admitted, as well as every VR admitted by
/// [`first_integer`].
pub fn first_real(vr: VR, value: &[u8]) -> Result<f64> {
    match vr {
        VR::FL => {
            ensure_len(vr, value, 4)?;
            Ok(LittleEndian::read_f32(value).into())
        }
        VR::FD => {
            ensure_len(vr, value, 8)?;
            Ok(LittleEndian::read_f64(value))
        }
        VR::DS => first_text_value(value)
            .parse::<f64>()
            .context(ParseRealSnafu),
        VR::UL | VR::US | VR::SL | VR::SS | VR::IS => first_integer(vr, value).map(|v| v as f64),
        vr => IncompatibleVrSnafu {
            vr,
            requested: "real",
        }
        .fail(),
    }
}

fn digits(s: &str, start: usize, len: usize) -> Option<u32> {
    let part = s.get(start..start + len)?;
    if !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.len() < 8 {
        return None;
    }
    let (y, m, d) = if s.as_bytes()[4].is_ascii_digit() {
        (digits(s, 0, 4)?, digits(s, 4, 2)?, digits(s, 6, 2)?)
    } else {
        // old notation, YYYY.MM.DD
        (digits(s, 0, 4)?, digits(s, 5, 2)?, digits(s, 8, 2)?)
    };
    NaiveDate::from_ymd_opt(y as i32, m, d)
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    if s.len() < 6 {
        return None;
    }
    let (h, m, sec) = if s.as_bytes()[2].is_ascii_digit() {
        (digits(s, 0, 2)?, digits(s, 2, 2)?, digits(s, 4, 2)?)
    } else {
        // old notation, hh.mm.ss
        (digits(s, 0, 2)?, digits(s, 3, 2)?, digits(s, 6, 2)?)
    };
    NaiveTime::from_hms_opt(h, m, sec)
}

/// Convert a DICOM date (`YYYYMMDD`, or the older `YYYY.MM.DD`)
/// to the international notation `YYYY-MM-DD`.
/// Returns `None` if the text is not a valid date.
///
/// ```
/// # use dcmtree_core::value::date_to_iso;
/// assert_eq!(date_to_iso("20240229").as_deref(), Some("2024-02-29"));
/// assert_eq!(date_to_iso("20230229"), None);
/// ```
pub fn date_to_iso(s: &str) -> Option<String> {
    parse_date(s.trim()).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Convert a DICOM time (`hhmmss` with optional fraction,
/// or the older `hh.mm.ss`) to the international notation `hh:mm:ss`.
pub fn time_to_iso(s: &str) -> Option<String> {
    parse_time(s.trim()).map(|t| t.format("%H:%M:%S").to_string())
}

/// Convert a DICOM date time (`YYYYMMDDhhmmss`, optionally followed by
/// a fraction and a UTC offset) to `YYYY-MM-DD hh:mm:ss`.
pub fn datetime_to_iso(s: &str) -> Option<String> {
    let s = s.trim();
    if s.len() < 14 {
        return None;
    }
    let date = parse_date(s.get(0..8)?)?;
    let time = parse_time(s.get(8..14)?)?;
    Some(format!(
        "{} {}",
        date.format("%Y-%m-%d"),
        time.format("%H:%M:%S")
    ))
}
