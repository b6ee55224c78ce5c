//! File-level inputs of a run: directory listings, the image manifest and
//! the optional pose file.

pub mod enumerate;
pub mod manifest;
pub mod poses;

pub use enumerate::{EntryForm, EnumerateError, base_name, list_files};
pub use manifest::ImageManifest;
pub use poses::{Pose2, load_poses};
