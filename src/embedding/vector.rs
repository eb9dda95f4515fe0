//! Stored vector encoding and the `vec_distance_cosine` SQL function
//!
//! Vectors are stored as little-endian `f32` blobs, the layout sqlite-vec
//! uses, so a store that loads the real extension and one that relies on the
//! function registered here answer the same query identically.

use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use rusqlite::Connection;

/// SQL name of the vector-distance function
pub const DISTANCE_FUNCTION: &str = "vec_distance_cosine";

/// Encode a vector as a little-endian `f32` blob
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode a little-endian `f32` blob; `None` if the length is not a multiple of 4
pub fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

/// Cosine distance `1 - cos(a, b)`, in `[0, 2]`
///
/// Returns `None` for zero-norm input, where the angle is undefined.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f64> {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    let cosine = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    Some(1.0 - cosine)
}

#[derive(Debug)]
struct DistanceError(String);

impl std::fmt::Display for DistanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", DISTANCE_FUNCTION, self.0)
    }
}

impl std::error::Error for DistanceError {}

/// Decode argument `idx`; a NULL argument yields `None`
fn blob_arg(ctx: &Context<'_>, idx: usize) -> rusqlite::Result<Option<Vec<f32>>> {
    let raw = ctx.get_raw(idx);
    if matches!(raw, ValueRef::Null) {
        return Ok(None);
    }
    let bytes = raw.as_blob().map_err(|e| {
        rusqlite::Error::UserFunctionError(Box::new(DistanceError(format!(
            "argument {} is not a blob: {}",
            idx, e
        ))))
    })?;
    decode_vector(bytes).map(Some).ok_or_else(|| {
        rusqlite::Error::UserFunctionError(Box::new(DistanceError(format!(
            "argument {} is not an f32 vector",
            idx
        ))))
    })
}

/// Register `vec_distance_cosine(a, b)` on a connection
pub fn register_distance_function(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        DISTANCE_FUNCTION,
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let (a, b) = match (blob_arg(ctx, 0)?, blob_arg(ctx, 1)?) {
                (Some(a), Some(b)) => (a, b),
                _ => return Ok(None),
            };
            if a.len() != b.len() {
                return Err(rusqlite::Error::UserFunctionError(Box::new(DistanceError(
                    format!("dimension mismatch: {} vs {}", a.len(), b.len()),
                ))));
            }
            Ok(cosine_distance(&a, &b))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_layout_is_little_endian() {
        let bytes = encode_vector(&[1.0, -2.5]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(decode_vector(&bytes).unwrap(), vec![1.0, -2.5]);
        assert!(decode_vector(&bytes[..7]).is_none());
    }

    #[test]
    fn test_cosine_distance_bounds() {
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).unwrap().abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() - 2.0).abs() < 1e-12);
        assert!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]).is_none());
    }

    #[test]
    fn test_sql_function() {
        let conn = Connection::open_in_memory().unwrap();
        register_distance_function(&conn).unwrap();

        let distance: f64 = conn
            .query_row(
                "SELECT vec_distance_cosine(?1, ?2)",
                [encode_vector(&[1.0, 0.0]), encode_vector(&[0.0, 1.0])],
                |row| row.get(0),
            )
            .unwrap();
        assert!((distance - 1.0).abs() < 1e-9);

        let zero: Option<f64> = conn
            .query_row(
                "SELECT vec_distance_cosine(?1, ?2)",
                [encode_vector(&[0.0, 0.0]), encode_vector(&[0.0, 1.0])],
                |row| row.get(0),
            )
            .unwrap();
        assert!(zero.is_none());

        let null: Option<f64> = conn
            .query_row(
                "SELECT vec_distance_cosine(NULL, ?1)",
                [encode_vector(&[0.0, 1.0])],
                |row| row.get(0),
            )
            .unwrap();
        assert!(null.is_none());

        let mismatch = conn.query_row(
            "SELECT vec_distance_cosine(?1, ?2)",
            [encode_vector(&[1.0]), encode_vector(&[0.0, 1.0])],
            |row| row.get::<_, Option<f64>>(0),
        );
        assert!(mismatch.is_err());
    }
}
