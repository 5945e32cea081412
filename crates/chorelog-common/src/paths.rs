//! Filename utilities for uploaded images.
//!
//! Uploaded photos are stored under a random UUID key. The extension is
//! chosen by the caller, usually from the client's filename when it matches
//! the image format.

use std::path::Path;

use uuid::Uuid;

/// Extension of an uploaded filename, without the leading dot.
///
/// Returns `None` when the name has no extension or the extension is empty.
///
/// # Examples
///
/// ```
/// use chorelog_common::paths::extension_of;
///
/// assert_eq!(extension_of("kitchen.jpg"), Some("jpg"));
/// assert_eq!(extension_of("archive.tar.gz"), Some("gz"));
/// assert_eq!(extension_of("README"), None);
/// ```
pub fn extension_of(filename: &str) -> Option<&str> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
}

/// Generate a random object key for an upload.
///
/// The key is a UUID followed by `extension`; with no extension, the key is
/// a bare UUID.
///
/// # Examples
///
/// ```
/// use chorelog_common::paths::object_key_for;
///
/// let key = object_key_for(Some("png"));
/// assert!(key.ends_with(".png"));
/// assert_eq!(key.len(), 36 + 4);
/// ```
pub fn object_key_for(extension: Option<&str>) -> String {
    let id = Uuid::new_v4();
    match extension.filter(|ext| !ext.is_empty()) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}
