//! Binary descriptor files (`.desc`).
//!
//! # File Format
//!
//! ```text
//! u64 n                      (little-endian)
//! f32 d[0][0] .. d[0][127]   (little-endian, row-major)
//! ...
//! f32 d[n-1][0] .. d[n-1][127]
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::CorpusError;
use super::types::{DESCRIPTOR_DIM, DescriptorVector};

const HEADER_BYTES: usize = std::mem::size_of::<u64>();
const ROW_BYTES: usize = DESCRIPTOR_DIM * std::mem::size_of::<f32>();

/// Load every descriptor declared by the header of a `.desc` file.
///
/// A file shorter than its header declares is rejected. Bytes past the
/// declared payload are ignored with a warning.
pub fn load_descriptors<P: AsRef<Path>>(path: P) -> Result<Vec<DescriptorVector>, CorpusError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| CorpusError::io(path, e))?;
    let file_len = file.metadata().map_err(|e| CorpusError::io(path, e))?.len();
    let mut reader = BufReader::new(file);

    let mut header = [0u8; HEADER_BYTES];
    reader.read_exact(&mut header).map_err(|_| CorpusError::TruncatedDescriptors {
        path: path.to_path_buf(),
        declared: 0,
        available_bytes: file_len,
    })?;
    let declared = u64::from_le_bytes(header);

    let payload = (file_len as u128).saturating_sub(HEADER_BYTES as u128);
    let required = declared as u128 * ROW_BYTES as u128;
    if payload < required {
        return Err(CorpusError::TruncatedDescriptors {
            path: path.to_path_buf(),
            declared,
            available_bytes: file_len,
        });
    }
    if payload > required {
        tracing::warn!(
            "{} has {} bytes past its {} declared descriptors",
            path.display(),
            payload - required,
            declared
        );
    }

    // Bounded by the file length check above.
    let count = declared as usize;
    let mut descriptors = Vec::with_capacity(count);
    let mut row = [0u8; ROW_BYTES];
    for _ in 0..count {
        reader.read_exact(&mut row).map_err(|e| CorpusError::io(path, e))?;
        descriptors.push(decode_row(&row));
    }

    Ok(descriptors)
}

/// Write descriptors in the `.desc` layout.
pub fn write_descriptors<P: AsRef<Path>>(
    path: P,
    descriptors: &[DescriptorVector],
) -> Result<(), CorpusError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| CorpusError::io(path, e))?;
    let mut w = BufWriter::new(file);

    w.write_all(&(descriptors.len() as u64).to_le_bytes())
        .map_err(|e| CorpusError::io(path, e))?;
    for desc in descriptors {
        for v in desc {
            w.write_all(&v.to_le_bytes()).map_err(|e| CorpusError::io(path, e))?;
        }
    }
    w.flush().map_err(|e| CorpusError::io(path, e))
}

fn decode_row(bytes: &[u8; ROW_BYTES]) -> DescriptorVector {
    let mut out = [0f32; DESCRIPTOR_DIM];
    for (dst, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
        *dst = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    out
}
