use crate::types::Sample;
use glam::DVec3;
use std::collections::VecDeque;
use thiserror::Error;

/// Record tag for accelerometer + gyroscope readings.
const SAMPLE_TAG: &str = "A";
/// Tag plus six integer fields.
const SAMPLE_FIELDS: usize = 7;
/// Lines longer than this without a newline are garbage; drop them.
const MAX_LINE_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("Unknown record type {0:?}")]
    UnknownRecord(String),
    #[error("Sample record has {0} fields, expected 7")]
    FieldCount(usize),
    #[error("Field {index} is not an integer: {value:?}")]
    InvalidField { index: usize, value: String },
    #[error("Line exceeded 256 bytes without a terminator")]
    Overflow,
}

/// Scaling applied by the device before transmission.
///
/// Each field on the wire is `round(raw * fixed_point)`; the raw accelerometer
/// reading is in LSB of `accel_lsb` per g and the raw gyro reading in LSB of
/// `gyro_lsb` per degree/second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub accel_lsb: f64,
    pub gyro_lsb: f64,
    pub fixed_point: f64,
}

impl Default for ScaleFactors {
    fn default() -> Self {
        Self {
            accel_lsb: 8192.0,
            gyro_lsb: 134.0,
            fixed_point: 100.0,
        }
    }
}

impl ScaleFactors {
    fn accel(&self, field: i64) -> f64 {
        field as f64 / self.fixed_point / self.accel_lsb
    }

    fn gyro(&self, field: i64) -> f64 {
        (field as f64 / self.fixed_point / self.gyro_lsb).to_radians()
    }
}

/// Parse one `A,ax,ay,az,gx,gy,gz` record into engine units.
pub fn parse_line(line: &str, scale: &ScaleFactors) -> Result<Sample, ProtocolError> {
    let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();

    if fields[0] != SAMPLE_TAG {
        return Err(ProtocolError::UnknownRecord(fields[0].to_string()));
    }
    if fields.len() != SAMPLE_FIELDS {
        return Err(ProtocolError::FieldCount(fields.len()));
    }

    let mut values = [0i64; SAMPLE_FIELDS - 1];
    for (index, (slot, field)) in values.iter_mut().zip(&fields[1..]).enumerate() {
        *slot = field.parse().map_err(|_| ProtocolError::InvalidField {
            index: index + 1,
            value: field.to_string(),
        })?;
    }

    let [ax, ay, az, gx, gy, gz] = values;
    Ok(Sample::imu(
        DVec3::new(scale.gyro(gx), scale.gyro(gy), scale.gyro(gz)),
        DVec3::new(scale.accel(ax), scale.accel(ay), scale.accel(az)),
    ))
}

/// Streaming parser for the newline-delimited sample protocol.
///
/// Feed raw bytes via `push_data`, then drain parsed samples via `next_sample`.
pub struct LineParser {
    buffer: VecDeque<u8>,
    scale: ScaleFactors,
}

impl LineParser {
    pub fn new(scale: ScaleFactors) -> Self {
        Self {
            buffer: VecDeque::with_capacity(1024),
            scale,
        }
    }

    /// Append received bytes to the internal buffer.
    pub fn push_data(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    /// Try to extract the next complete record from the buffer.
    /// Returns `None` if no complete line is available yet.
    pub fn next_sample(&mut self) -> Option<Result<Sample, ProtocolError>> {
        loop {
            let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') else {
                if self.buffer.len() > MAX_LINE_LEN {
                    self.buffer.clear();
                    return Some(Err(ProtocolError::Overflow));
                }
                return None;
            };

            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            return Some(parse_line(line, &self.scale));
        }
    }

    /// Bytes waiting for a line terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new(ScaleFactors::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn parse_single_line() {
        let mut parser = LineParser::default();
        // 1 g on Z, 134 * 100 raw units = 1 deg/s on X.
        parser.push_data(b"A,0,0,819200,13400,0,-26800\n");

        let sample = parser.next_sample().unwrap().unwrap();
        assert!(sample.accel.x.abs() < EPSILON);
        assert!((sample.accel.z - 1.0).abs() < EPSILON);
        assert!((sample.gyro.x - 1f64.to_radians()).abs() < EPSILON);
        assert!((sample.gyro.z + 2f64.to_radians()).abs() < EPSILON);
        assert!(sample.mag.is_none());

        assert!(parser.next_sample().is_none());
    }

    #[test]
    fn parse_fragmented_data() {
        let line = b"A,100,-200,819200,0,0,0\r\n";
        let mid = line.len() / 2;

        let mut parser = LineParser::default();

        // First half, no terminator yet.
        parser.push_data(&line[..mid]);
        assert!(parser.next_sample().is_none());
        assert_eq!(parser.pending(), mid);

        parser.push_data(&line[mid..]);
        let sample = parser.next_sample().unwrap().unwrap();
        assert!((sample.accel.x - 1.0 / 8192.0).abs() < EPSILON);
        assert!((sample.accel.y + 2.0 / 8192.0).abs() < EPSILON);
        assert_eq!(parser.pending(), 0);
    }

    #[test]
    fn parse_multiple_lines_and_skip_blank() {
        let mut parser = LineParser::default();
        parser.push_data(b"A,1,0,0,0,0,0\n\n\nA,2,0,0,0,0,0\n");

        let s1 = parser.next_sample().unwrap().unwrap();
        let s2 = parser.next_sample().unwrap().unwrap();
        assert!(s2.accel.x > s1.accel.x);
        assert!(parser.next_sample().is_none());
    }

    #[test]
    fn reports_bad_records() {
        let scale = ScaleFactors::default();
        assert_eq!(
            parse_line("B,9900", &scale),
            Err(ProtocolError::UnknownRecord("B".into()))
        );
        assert_eq!(
            parse_line("A,1,2,3", &scale),
            Err(ProtocolError::FieldCount(4))
        );
        assert_eq!(
            parse_line("A,1,2,x,4,5,6", &scale),
            Err(ProtocolError::InvalidField {
                index: 3,
                value: "x".into()
            })
        );
    }

    #[test]
    fn bad_record_does_not_block_following_lines() {
        let mut parser = LineParser::default();
        parser.push_data(b"Ready...\nA,0,0,819200,0,0,0\n");

        assert!(matches!(
            parser.next_sample(),
            Some(Err(ProtocolError::UnknownRecord(_)))
        ));
        assert!(parser.next_sample().unwrap().is_ok());
    }

    #[test]
    fn unterminated_garbage_is_dropped() {
        let mut parser = LineParser::default();
        parser.push_data(&[b'x'; MAX_LINE_LEN + 1]);
        assert_eq!(parser.next_sample(), Some(Err(ProtocolError::Overflow)));
        assert_eq!(parser.pending(), 0);
    }
}
