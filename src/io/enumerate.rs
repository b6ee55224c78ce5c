//! Non-recursive directory listing filtered by file extension.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

/// Extensions accepted for query images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg"];

/// Extension of binary descriptor files.
pub const DESCRIPTOR_EXTENSION: &str = "desc";

/// Extension of keypoint text files.
pub const KEYPOINT_EXTENSION: &str = "feat";

#[derive(Error, Debug)]
pub enum EnumerateError {
    #[error("directory {path} cannot be read: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
}

/// How matching entries are reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryForm {
    /// `dir/name.ext`
    FullPath,
    /// `name.ext`
    FileName,
}

/// List the files of `dir` whose extension matches one of `extensions`
/// (compared case-insensitively). Subdirectories are not entered.
///
/// The order of the result is whatever the filesystem yields. An unreadable
/// directory is an error; an empty result is not.
pub fn list_files(
    dir: &Path,
    extensions: &[&str],
    form: EntryForm,
) -> Result<Vec<String>, EnumerateError> {
    let mut out = Vec::new();

    for entry in WalkDir::new(dir).min_depth(0).max_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            // Failing on the root itself means the directory is unusable.
            Err(e) if e.depth() == 0 => {
                return Err(EnumerateError::Unreadable {
                    path: dir.to_path_buf(),
                    source: std::io::Error::from(e),
                });
            }
            Err(e) => {
                tracing::debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        if entry.depth() == 0 {
            if !entry.file_type().is_dir() {
                return Err(EnumerateError::NotADirectory(dir.to_path_buf()));
            }
            continue;
        }

        // Symlinks are not followed by the walk; keep them only when they
        // resolve to a regular file.
        let is_file = if entry.path_is_symlink() {
            entry.path().is_file()
        } else {
            entry.file_type().is_file()
        };
        if !is_file {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            tracing::warn!("Skipping non UTF-8 file name {:?}", entry.file_name());
            continue;
        };

        if !has_extension(file_name, extensions) {
            continue;
        }

        match form {
            EntryForm::FileName => out.push(file_name.to_string()),
            EntryForm::FullPath => out.push(entry.path().to_string_lossy().into_owned()),
        }
    }

    Ok(out)
}

/// Case-insensitive extension test on the text after the last `.`.
pub fn has_extension(file_name: &str, extensions: &[&str]) -> bool {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)),
        None => false,
    }
}

/// Strip everything from the last `.` on. Names without a `.` are returned unchanged.
pub fn base_name(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(pos) => &file_name[..pos],
        None => file_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_has_extension_case_insensitive() {
        assert!(has_extension("img001.JPG", IMAGE_EXTENSIONS));
        assert!(has_extension("img001.png", IMAGE_EXTENSIONS));
        assert!(!has_extension("img001.jpeg", IMAGE_EXTENSIONS));
        assert!(!has_extension("README", IMAGE_EXTENSIONS));
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("img001.jpg"), "img001");
        assert_eq!(base_name("a.b.desc"), "a.b");
        assert_eq!(base_name("noext"), "noext");
    }

    #[test]
    fn test_list_files_filters_and_does_not_recurse() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.desc");
        touch(tmp.path(), "b.DESC");
        touch(tmp.path(), "a.feat");
        touch(tmp.path(), "notes.txt");
        fs::create_dir(tmp.path().join("nested.desc")).unwrap();
        touch(&tmp.path().join("nested.desc"), "c.desc");

        let mut names = list_files(tmp.path(), &[DESCRIPTOR_EXTENSION], EntryForm::FileName).unwrap();
        names.sort();
        assert_eq!(names, vec!["a.desc".to_string(), "b.DESC".to_string()]);
    }

    #[test]
    fn test_list_files_full_path() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "img.png");

        let paths = list_files(tmp.path(), IMAGE_EXTENSIONS, EntryForm::FullPath).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(Path::new(&paths[0]), tmp.path().join("img.png"));
    }

    #[test]
    fn test_list_files_empty_directory_is_ok() {
        let tmp = TempDir::new().unwrap();
        let names = list_files(tmp.path(), IMAGE_EXTENSIONS, EntryForm::FileName).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn test_missing_directory_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = list_files(&tmp.path().join("missing"), IMAGE_EXTENSIONS, EntryForm::FileName)
            .unwrap_err();
        assert!(matches!(err, EnumerateError::Unreadable { .. }));
    }

    #[test]
    fn test_file_instead_of_directory_is_error() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "list.txt");
        let err = list_files(&tmp.path().join("list.txt"), IMAGE_EXTENSIONS, EntryForm::FileName)
            .unwrap_err();
        assert!(matches!(err, EnumerateError::NotADirectory(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_listed_only_when_they_point_to_files() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().unwrap();
        let target_dir = tmp.path().join("target");
        fs::create_dir(&target_dir).unwrap();
        touch(tmp.path(), "real.bin");

        symlink(&target_dir, tmp.path().join("dir_link.desc")).unwrap();
        symlink(tmp.path().join("real.bin"), tmp.path().join("file_link.desc")).unwrap();
        symlink(tmp.path().join("gone"), tmp.path().join("dangling.desc")).unwrap();

        let names = list_files(tmp.path(), &[DESCRIPTOR_EXTENSION], EntryForm::FileName).unwrap();
        assert_eq!(names, vec!["file_link.desc".to_string()]);
    }
}
