//! Text format for recorded sensor streams.
//!
//! One sample per line, fields separated by whitespace:
//!
//! ```text
//! # comment
//! mag  <x> <y> <z> [accuracy]
//! acc  <x> <y> <z> [accuracy]
//! gyro <timestamp_ns> <x> <y> <z> [accuracy]
//! ```
//!
//! `accuracy` is one of `unreliable`, `low`, `medium`, `high` (default).

use crate::types::{SensorAccuracy, SensorEvent, SensorKind, SensorReading};
use glam::Vec3;
use std::collections::VecDeque;
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("line {line}: unknown sensor tag {tag:?}")]
    UnknownTag { line: usize, tag: String },
    #[error("line {line}: expected {expected} numeric fields")]
    MissingField { line: usize, expected: usize },
    #[error("line {line}: invalid number {value:?}")]
    InvalidNumber { line: usize, value: String },
    #[error("line {line}: unknown accuracy {value:?}")]
    InvalidAccuracy { line: usize, value: String },
    #[error("line {line}: unexpected trailing field {value:?}")]
    TrailingField { line: usize, value: String },
    #[error("line {line}: not valid UTF-8")]
    InvalidUtf8 { line: usize },
}

/// Streaming parser for sensor recordings.
///
/// Feed raw bytes via `push_data`, then drain samples via `next_sample`.
/// Blank and comment lines are skipped; a final line without a trailing
/// newline is only parsed after `finish`.
pub struct RecordingParser {
    buffer: VecDeque<u8>,
    line: usize,
    finished: bool,
}

impl RecordingParser {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(8192),
            line: 0,
            finished: false,
        }
    }

    /// Append received bytes to the internal buffer.
    pub fn push_data(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    /// Mark end of input so a trailing unterminated line is parsed.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Extract the next sample, or `None` once no complete line is left.
    pub fn next_sample(&mut self) -> Option<Result<SensorEvent, ProtocolError>> {
        loop {
            let raw = self.take_line()?;
            self.line += 1;

            let Ok(text) = std::str::from_utf8(&raw) else {
                return Some(Err(ProtocolError::InvalidUtf8 { line: self.line }));
            };
            let text = text.split('#').next().unwrap_or("").trim();
            if text.is_empty() {
                continue;
            }
            return Some(parse_line(text, self.line));
        }
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        let buf = self.buffer.make_contiguous();
        match buf.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                let line = buf[..pos].to_vec();
                self.buffer.drain(..=pos);
                Some(line)
            }
            None if self.finished && !buf.is_empty() => {
                let line = buf.to_vec();
                self.buffer.clear();
                Some(line)
            }
            None => None,
        }
    }
}

impl Default for RecordingParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a complete recording held in memory, stopping at the first error.
pub fn parse_recording(text: &str) -> Result<Vec<SensorEvent>, ProtocolError> {
    let mut parser = RecordingParser::new();
    parser.push_data(text.as_bytes());
    parser.finish();
    std::iter::from_fn(|| parser.next_sample()).collect()
}

/// Render one sample as a recording line (without newline).
pub fn format_sample(event: &SensorEvent) -> String {
    let mut line = String::new();
    let v = match event.reading {
        SensorReading::MagneticField { values } => {
            line.push_str("mag");
            values
        }
        SensorReading::Accelerometer { values } => {
            line.push_str("acc");
            values
        }
        SensorReading::Gyroscope {
            values,
            timestamp_ns,
        } => {
            let _ = write!(line, "gyro {timestamp_ns}");
            values
        }
    };
    let _ = write!(line, " {} {} {}", v.x, v.y, v.z);
    if event.accuracy != SensorAccuracy::High {
        let _ = write!(line, " {}", accuracy_name(event.accuracy));
    }
    line
}

fn parse_line(text: &str, line: usize) -> Result<SensorEvent, ProtocolError> {
    let mut fields = text.split_whitespace();
    let tag = fields.next().unwrap_or_default();
    let kind = match tag {
        "mag" => SensorKind::MagneticField,
        "acc" => SensorKind::Accelerometer,
        "gyro" => SensorKind::Gyroscope,
        _ => {
            return Err(ProtocolError::UnknownTag {
                line,
                tag: tag.to_string(),
            })
        }
    };

    let expected = if kind == SensorKind::Gyroscope { 4 } else { 3 };
    let timestamp_ns = if kind == SensorKind::Gyroscope {
        let field = fields
            .next()
            .ok_or(ProtocolError::MissingField { line, expected })?;
        Some(field.parse::<u64>().map_err(|_| ProtocolError::InvalidNumber {
            line,
            value: field.to_string(),
        })?)
    } else {
        None
    };

    let mut xyz = [0.0_f32; 3];
    for slot in &mut xyz {
        let field = fields
            .next()
            .ok_or(ProtocolError::MissingField { line, expected })?;
        *slot = field.parse().map_err(|_| ProtocolError::InvalidNumber {
            line,
            value: field.to_string(),
        })?;
    }
    let values = Vec3::from_array(xyz);

    let accuracy = match fields.next() {
        None => SensorAccuracy::High,
        Some(field) => parse_accuracy(field).ok_or_else(|| ProtocolError::InvalidAccuracy {
            line,
            value: field.to_string(),
        })?,
    };
    if let Some(extra) = fields.next() {
        return Err(ProtocolError::TrailingField {
            line,
            value: extra.to_string(),
        });
    }

    let reading = match (kind, timestamp_ns) {
        (SensorKind::MagneticField, _) => SensorReading::MagneticField { values },
        (SensorKind::Accelerometer, _) => SensorReading::Accelerometer { values },
        (SensorKind::Gyroscope, ts) => SensorReading::Gyroscope {
            values,
            timestamp_ns: ts.unwrap_or_default(),
        },
    };
    Ok(SensorEvent { reading, accuracy })
}

fn parse_accuracy(field: &str) -> Option<SensorAccuracy> {
    match field {
        "unreliable" => Some(SensorAccuracy::Unreliable),
        "low" => Some(SensorAccuracy::Low),
        "medium" => Some(SensorAccuracy::Medium),
        "high" => Some(SensorAccuracy::High),
        _ => None,
    }
}

fn accuracy_name(accuracy: SensorAccuracy) -> &'static str {
    match accuracy {
        SensorAccuracy::Unreliable => "unreliable",
        SensorAccuracy::Low => "low",
        SensorAccuracy::Medium => "medium",
        SensorAccuracy::High => "high",
    }
}
