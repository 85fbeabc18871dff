//! The `.ra` container format.
//!
//! Layout, all integers little-endian `u64`:
//!
//! | field         | value                                   |
//! |---------------|-----------------------------------------|
//! | magic         | `b"rawarray"` (8 bytes)                 |
//! | flags         | 0                                       |
//! | element type  | 4 (complex float)                       |
//! | element size  | 8                                       |
//! | payload bytes | product of extents × 8                  |
//! | ndim          | number of extents                       |
//! | extents       | `ndim` values                           |
//! | payload       | interleaved `f32` real/imaginary pairs  |

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::dense::DenseArray;
use crate::marshal::{bart_parts, decode};
use crate::pod_complex::ELEMENT_BYTES;
use crate::shape::checked_length;
use crate::store::{ArrayId, ArrayStore};
use crate::{BartError, Result};

pub const MAGIC: &[u8; 8] = b"rawarray";
pub const FLAGS: u64 = 0;
/// Element type tag for single-precision complex values.
pub const ELTYPE_COMPLEX_FLOAT: u64 = 4;
pub const ELBYTE: u64 = ELEMENT_BYTES as u64;
pub const EXTENSION: &str = ".ra";

/// Write `id` (in BART order) to `writer`.
pub fn write_to<W: Write>(store: &mut ArrayStore, id: ArrayId, writer: &mut W) -> Result<()> {
    let (shape, payload) = bart_parts(store, id)?;
    writer.write_all(MAGIC)?;
    for field in [FLAGS, ELTYPE_COMPLEX_FLOAT, ELBYTE, payload.len() as u64] {
        writer.write_all(&field.to_le_bytes())?;
    }
    writer.write_all(&(shape.len() as u64).to_le_bytes())?;
    for &extent in &shape {
        writer.write_all(&(extent as u64).to_le_bytes())?;
    }
    writer.write_all(&payload)?;
    Ok(())
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn reject(reason: String) -> BartError {
    warn!(%reason, "rejected rawarray header");
    BartError::Format(reason)
}

/// Read one array from `reader`.
pub fn read_from<R: Read>(reader: &mut R) -> Result<DenseArray> {
    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(reject(format!("bad magic {:?}", String::from_utf8_lossy(&magic))));
    }
    let flags = read_u64(reader)?;
    if flags != FLAGS {
        return Err(reject(format!("unsupported flags {flags}")));
    }
    let eltype = read_u64(reader)?;
    if eltype != ELTYPE_COMPLEX_FLOAT {
        return Err(reject(format!("unsupported element type {eltype}")));
    }
    let elbyte = read_u64(reader)?;
    if elbyte != ELBYTE {
        return Err(reject(format!("unsupported element size {elbyte}")));
    }
    let size = read_u64(reader)?;
    let ndim = read_u64(reader)?;
    if ndim == 0 {
        return Err(reject("no dimensions".to_string()));
    }

    let mut dims = Vec::with_capacity(ndim.min(64) as usize);
    for _ in 0..ndim {
        let extent = read_u64(reader)?;
        dims.push(
            usize::try_from(extent).map_err(|_| reject(format!("extent {extent} too large")))?,
        );
    }
    let expected = checked_length(&dims)
        .and_then(|len| len.checked_mul(ELEMENT_BYTES))
        .ok_or_else(|| reject(format!("dimensions {dims:?} overflow")))?;
    if expected as u64 != size {
        return Err(reject(format!(
            "payload size {size} does not match dimensions {dims:?}"
        )));
    }

    // Grows with the bytes actually present, never with the header's claim.
    let mut payload = Vec::new();
    reader.by_ref().take(size).read_to_end(&mut payload)?;
    if payload.len() != expected {
        return Err(BartError::PayloadLength {
            expected,
            actual: payload.len(),
        });
    }
    decode(&dims, &payload)
}

fn check_extension(path: &Path) -> Result<()> {
    let name = path.to_string_lossy();
    if !name.ends_with(EXTENSION) {
        return Err(BartError::InvalidName {
            name: name.into_owned(),
            extension: EXTENSION,
        });
    }
    Ok(())
}

/// Save `id` to a `.ra` file.
pub fn save<P: AsRef<Path>>(store: &mut ArrayStore, id: ArrayId, path: P) -> Result<()> {
    let path = path.as_ref();
    check_extension(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(store, id, &mut writer)?;
    writer.flush()?;
    info!(path = %path.display(), "saved rawarray");
    Ok(())
}

/// Load a `.ra` file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<DenseArray> {
    let path = path.as_ref();
    check_extension(path)?;
    let mut reader = BufReader::new(File::open(path)?);
    let array = read_from(&mut reader)?;
    info!(path = %path.display(), shape = ?array.shape(), "loaded rawarray");
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex32;
    use std::io::Cursor;

    fn header(fields: &[u64], dims: &[u64]) -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        for f in fields {
            bytes.extend_from_slice(&f.to_le_bytes());
        }
        bytes.extend_from_slice(&(dims.len() as u64).to_le_bytes());
        for d in dims {
            bytes.extend_from_slice(&d.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_write_layout() {
        let mut store = ArrayStore::new();
        let a = store
            .from_values(&[2], vec![Complex32::new(1.0, 2.0), Complex32::new(3.0, 4.0)])
            .unwrap();
        let mut buf = Vec::new();
        write_to(&mut store, a, &mut buf).unwrap();
        let mut expected = header(&[0, 4, 8, 16], &[2]);
        for x in [1.0f32, 2.0, 3.0, 4.0] {
            expected.extend_from_slice(&x.to_le_bytes());
        }
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_read_back() {
        let mut store = ArrayStore::new();
        let values = (0..6).map(|i| Complex32::new(i as f32, 0.5)).collect();
        let a = store.from_values(&[3, 2], values).unwrap();
        let mut buf = Vec::new();
        write_to(&mut store, a, &mut buf).unwrap();
        let back = read_from(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, store.to_dense(a).unwrap());
    }

    #[test]
    fn test_rejects_bad_headers() {
        let payload = vec![0u8; 16];
        let cases = [
            header(&[1, 4, 8, 16], &[2]),
            header(&[0, 5, 8, 16], &[2]),
            header(&[0, 4, 16, 16], &[2]),
            header(&[0, 4, 8, 24], &[2]),
        ];
        for mut bytes in cases {
            bytes.extend_from_slice(&payload);
            assert!(matches!(
                read_from(&mut Cursor::new(bytes)),
                Err(BartError::Format(_))
            ));
        }

        let mut bad_magic = header(&[0, 4, 8, 16], &[2]);
        bad_magic[0] = b'R';
        bad_magic.extend_from_slice(&payload);
        assert!(matches!(
            read_from(&mut Cursor::new(bad_magic)),
            Err(BartError::Format(_))
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let mut bytes = header(&[0, 4, 8, 16], &[2]);
        bytes.extend_from_slice(&[0u8; 10]);
        assert!(matches!(
            read_from(&mut Cursor::new(bytes)),
            Err(BartError::PayloadLength {
                expected: 16,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_huge_consistent_header_with_short_body() {
        let mut bytes = header(&[0, 4, 8, 1 << 43], &[1 << 40]);
        bytes.extend_from_slice(&[0u8; 64]);
        assert!(matches!(
            read_from(&mut Cursor::new(bytes)),
            Err(BartError::PayloadLength { actual: 64, .. })
        ));
    }

    #[test]
    fn test_overflowing_extents_rejected() {
        let bytes = header(&[0, 4, 8, 0], &[1 << 32, 1 << 32]);
        assert!(matches!(
            read_from(&mut Cursor::new(bytes)),
            Err(BartError::Format(_))
        ));
    }

    #[test]
    fn test_extension_required() {
        let mut store = ArrayStore::new();
        let a = store.zeros(&[1]).unwrap();
        assert!(matches!(
            save(&mut store, a, "out.cfl"),
            Err(BartError::InvalidName { .. })
        ));
        assert!(matches!(
            load("in.txt"),
            Err(BartError::InvalidName { .. })
        ));
    }
}
