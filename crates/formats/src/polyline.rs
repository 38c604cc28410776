//! Delta-encoded polyline codec.
//!
//! The routing service encodes shapes with the usual polyline scheme
//! (zig-zag deltas, 5-bit groups, offset by 63) at precision 6; the classic
//! web-map encoders use precision 5. Output is `[lat, lng]` order.

use foundation::coords::LatLng;

/// Precision used by the routing service for `shape` strings.
pub const SERVICE_PRECISION: u32 = 6;
/// Precision of the classic web-map encoding.
pub const DEFAULT_PRECISION: u32 = 5;

const CHUNK_BITS: u32 = 5;
const CHUNK_MASK: i64 = 0x1f;
const CONTINUATION: i64 = 0x20;
const ASCII_OFFSET: u8 = 63;
// A coordinate at precision 6 needs ~29 bits; anything past this is garbage.
const MAX_SHIFT: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A byte outside the `?`..`~` alphabet.
    InvalidCharacter { position: usize, byte: u8 },
    /// Input ended in the middle of a value, or after a latitude with no longitude.
    Truncated { position: usize },
    /// A single value ran over too many continuation chunks.
    Overflow { position: usize },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::InvalidCharacter { position, byte } => {
                write!(f, "invalid polyline byte 0x{byte:02x} at position {position}")
            }
            DecodeError::Truncated { position } => {
                write!(f, "polyline truncated at position {position}")
            }
            DecodeError::Overflow { position } => {
                write!(f, "polyline value overflow at position {position}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decodes `encoded` into `[lat, lng]` points scaled by `10^precision`.
///
/// Empty input decodes to an empty vector. Malformed input is an error; the
/// decoder never returns a partial shape.
pub fn decode(encoded: &str, precision: u32) -> Result<Vec<LatLng>, DecodeError> {
    let bytes = encoded.as_bytes();
    let factor = 10f64.powi(precision as i32);

    // Every point needs at least two bytes.
    let mut out = Vec::with_capacity(bytes.len() / 2);
    let mut pos = 0usize;
    let mut lat = 0i64;
    let mut lng = 0i64;

    while pos < bytes.len() {
        let (dlat, next) = read_value(bytes, pos)?;
        if next >= bytes.len() {
            return Err(DecodeError::Truncated { position: next });
        }
        let (dlng, next) = read_value(bytes, next)?;
        pos = next;

        lat += dlat;
        lng += dlng;
        out.push(LatLng::new(lat as f64 / factor, lng as f64 / factor));
    }

    Ok(out)
}

/// Encodes `[lat, lng]` points at the given precision.
pub fn encode(points: &[LatLng], precision: u32) -> String {
    let factor = 10f64.powi(precision as i32);
    let mut out = String::with_capacity(points.len() * 8);
    let mut prev_lat = 0i64;
    let mut prev_lng = 0i64;

    for p in points {
        let lat = (p.lat * factor).round() as i64;
        let lng = (p.lng * factor).round() as i64;
        write_value(&mut out, lat - prev_lat);
        write_value(&mut out, lng - prev_lng);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn read_value(bytes: &[u8], start: usize) -> Result<(i64, usize), DecodeError> {
    let mut result = 0i64;
    let mut shift = 0u32;
    let mut pos = start;

    loop {
        let Some(&byte) = bytes.get(pos) else {
            return Err(DecodeError::Truncated { position: pos });
        };
        if !(ASCII_OFFSET..=b'~').contains(&byte) {
            return Err(DecodeError::InvalidCharacter {
                position: pos,
                byte,
            });
        }
        if shift > MAX_SHIFT {
            return Err(DecodeError::Overflow { position: pos });
        }

        let chunk = (byte - ASCII_OFFSET) as i64;
        result |= (chunk & CHUNK_MASK) << shift;
        shift += CHUNK_BITS;
        pos += 1;

        if chunk & CONTINUATION == 0 {
            break;
        }
    }

    let value = if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    };
    Ok((value, pos))
}

fn write_value(out: &mut String, delta: i64) {
    let mut v = if delta < 0 { !(delta << 1) } else { delta << 1 };
    while v >= CONTINUATION {
        out.push((((CONTINUATION | (v & CHUNK_MASK)) as u8) + ASCII_OFFSET) as char);
        v >>= CHUNK_BITS;
    }
    out.push(((v as u8) + ASCII_OFFSET) as char);
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_PRECISION, DecodeError, SERVICE_PRECISION, decode, encode};
    use foundation::coords::LatLng;

    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn reference_points() -> Vec<LatLng> {
        vec![
            LatLng::new(38.5, -120.2),
            LatLng::new(40.7, -120.95),
            LatLng::new(43.252, -126.453),
        ]
    }

    #[test]
    fn decodes_reference_vector() {
        let got = decode(REFERENCE, DEFAULT_PRECISION).unwrap();
        assert_eq!(got.len(), 3);
        for (g, e) in got.iter().zip(reference_points()) {
            assert_close(g.lat, e.lat, 1e-9);
            assert_close(g.lng, e.lng, 1e-9);
        }
    }

    #[test]
    fn encodes_reference_vector() {
        assert_eq!(encode(&reference_points(), DEFAULT_PRECISION), REFERENCE);
    }

    #[test]
    fn empty_string_is_empty_shape() {
        assert_eq!(decode("", SERVICE_PRECISION).unwrap(), Vec::new());
        assert_eq!(encode(&[], SERVICE_PRECISION), "");
    }

    #[test]
    fn rejects_bytes_outside_alphabet() {
        let err = decode("_p~iF ~ps|U", DEFAULT_PRECISION).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidCharacter {
                position: 5,
                byte: b' '
            }
        );
    }

    #[test]
    fn rejects_latitude_without_longitude() {
        // First full value of the reference string, nothing after it.
        let err = decode("_p~iF", DEFAULT_PRECISION).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { position: 5 });
    }

    #[test]
    fn rejects_value_cut_mid_chunk() {
        // `_` carries a continuation bit.
        let err = decode("_p~iF~ps|", DEFAULT_PRECISION).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }

    #[test]
    fn rejects_runaway_continuation() {
        let err = decode(&"~".repeat(40), SERVICE_PRECISION).unwrap_err();
        assert!(matches!(err, DecodeError::Overflow { .. }));
    }

    #[test]
    fn round_trips_through_reference_encoder() {
        let seq = vec![
            LatLng::new(52.517037, 13.388860),
            LatLng::new(52.529407, 13.397634),
            LatLng::new(-33.868820, 151.209296),
            LatLng::new(0.000001, -0.000001),
            LatLng::new(89.999999, -179.999999),
        ];
        let encoded = polyline::encode_coordinates(
            seq.iter().map(|p| geo_types::Coord { x: p.lng, y: p.lat }),
            SERVICE_PRECISION,
        )
        .unwrap();

        let decoded = decode(&encoded, SERVICE_PRECISION).unwrap();
        assert_eq!(decoded.len(), seq.len());
        for (d, e) in decoded.iter().zip(&seq) {
            assert_close(d.lat, e.lat, 1e-6);
            assert_close(d.lng, e.lng, 1e-6);
        }

        assert_eq!(encode(&seq, SERVICE_PRECISION), encoded);
    }
}
