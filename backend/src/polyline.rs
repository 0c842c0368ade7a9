//! Encoded polyline codec.
//!
//! Each coordinate component is stored as a delta from the previous point,
//! scaled by 1e5, zig-zag encoded and split into 5-bit chunks. Chunks are
//! offset by 63 so the result is printable ASCII; bit 0x20 marks that more
//! chunks follow.

use crate::models::Coordinate;

const PRECISION: f64 = 1e5;
const CHAR_OFFSET: u8 = 63;
const CHUNK_BITS: u32 = 5;
const CHUNK_MASK: i64 = 0x1f;
const CONTINUATION_BIT: i64 = 0x20;

/// Decode an encoded polyline into `(lat, lon)` coordinates.
///
/// Decoding never fails: it stops at the end of the input, at the first
/// byte below `'?'`, or when the running position overflows, and drops the
/// point it was reading.
pub fn decode(encoded: &str) -> Vec<Coordinate> {
    let bytes = encoded.as_bytes();
    let mut cursor = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;
    let mut path = Vec::new();

    while cursor < bytes.len() {
        let Some(delta_lat) = next_value(bytes, &mut cursor) else {
            break;
        };
        let Some(delta_lon) = next_value(bytes, &mut cursor) else {
            break;
        };
        let (Some(next_lat), Some(next_lon)) =
            (lat.checked_add(delta_lat), lon.checked_add(delta_lon))
        else {
            break;
        };
        lat = next_lat;
        lon = next_lon;
        path.push(Coordinate::new(lat as f64 / PRECISION, lon as f64 / PRECISION));
    }

    path
}

/// Encode coordinates using the same scheme `decode` reads.
pub fn encode(path: &[Coordinate]) -> String {
    let mut encoded = String::new();
    let mut prev_lat = 0;
    let mut prev_lon = 0;

    for coord in path {
        let lat = scale(coord.lat);
        let lon = scale(coord.lon);
        push_value(lat - prev_lat, &mut encoded);
        push_value(lon - prev_lon, &mut encoded);
        prev_lat = lat;
        prev_lon = lon;
    }

    encoded
}

/// Read one zig-zag varint, or `None` if the input ends before its last chunk.
fn next_value(bytes: &[u8], cursor: &mut usize) -> Option<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let chunk = i64::from(bytes.get(*cursor)?.checked_sub(CHAR_OFFSET)?);
        *cursor += 1;
        // Overlong runs from corrupt input would overflow the shift.
        if shift < i64::BITS - CHUNK_BITS {
            result |= (chunk & CHUNK_MASK) << shift;
        }
        shift += CHUNK_BITS;
        if chunk & CONTINUATION_BIT == 0 {
            break;
        }
    }

    Some(if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

fn push_value(delta: i64, out: &mut String) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };
    while value >= CONTINUATION_BIT {
        out.push(to_char((value & CHUNK_MASK) | CONTINUATION_BIT));
        value >>= CHUNK_BITS;
    }
    out.push(to_char(value));
}

fn to_char(chunk: i64) -> char {
    // chunk is always < 0x40 here
    char::from(chunk as u8 + CHAR_OFFSET)
}

fn scale(degrees: f64) -> i64 {
    (degrees * PRECISION).round() as i64
}
