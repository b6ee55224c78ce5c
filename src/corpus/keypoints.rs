//! Keypoint text files (`.feat`).
//!
//! One keypoint per line, four whitespace-separated floats:
//!
//! ```text
//! x y size angle
//! ```
//!
//! There is no header; the file ends at EOF.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use super::CorpusError;
use super::types::Keypoint;

const FIELDS_PER_KEYPOINT: usize = 4;

/// Load every keypoint of a `.feat` file.
///
/// Values are read as a stream of quadruples, so line breaks are not
/// significant. A token that is not a number, or a trailing incomplete
/// quadruple, fails the whole file.
pub fn load_keypoints<P: AsRef<Path>>(path: P) -> Result<Vec<Keypoint>, CorpusError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| CorpusError::io(path, e))?;
    let reader = BufReader::new(file);

    let mut keypoints = Vec::new();
    let mut pending = [0f32; FIELDS_PER_KEYPOINT];
    let mut filled = 0usize;
    let mut pending_line = 0usize;

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CorpusError::io(path, e))?;
        for token in line.split_whitespace() {
            let value: f32 = token.parse().map_err(|_| CorpusError::MalformedKeypoints {
                path: path.to_path_buf(),
                line: line_idx + 1,
                reason: format!("'{}' is not a number", token),
            })?;
            if filled == 0 {
                pending_line = line_idx + 1;
            }
            pending[filled] = value;
            filled += 1;
            if filled == FIELDS_PER_KEYPOINT {
                keypoints.push(Keypoint::new(pending[0], pending[1], pending[2], pending[3]));
                filled = 0;
            }
        }
    }

    if filled != 0 {
        return Err(CorpusError::MalformedKeypoints {
            path: path.to_path_buf(),
            line: pending_line,
            reason: format!(
                "incomplete keypoint ({} of {} values)",
                filled, FIELDS_PER_KEYPOINT
            ),
        });
    }

    Ok(keypoints)
}

/// Write keypoints in the `.feat` layout.
pub fn write_keypoints<P: AsRef<Path>>(path: P, keypoints: &[Keypoint]) -> Result<(), CorpusError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| CorpusError::io(path, e))?;
    let mut w = BufWriter::new(file);
    for kp in keypoints {
        writeln!(w, "{} {} {} {}", kp.pt.x, kp.pt.y, kp.size, kp.angle)
            .map_err(|e| CorpusError::io(path, e))?;
    }
    w.flush().map_err(|e| CorpusError::io(path, e))
}
