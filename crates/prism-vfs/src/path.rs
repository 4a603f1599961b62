//! Absolute, slash-delimited VFS paths.

use crate::{VfsError, VfsResult};

/// The root directory.
pub const ROOT: &str = "/";

/// Lexically normalizes an absolute VFS path.
///
/// Repeated and trailing slashes collapse and `.` segments are dropped.
/// Does NOT consult the store; purely computational.
///
/// # Errors
///
/// Returns `VfsError::InvalidPath` if the path is relative, contains a NUL
/// byte, or contains a `..` segment.
pub fn normalize(path: &str) -> VfsResult<String> {
    if !path.starts_with('/') {
        return Err(VfsError::InvalidPath(format!(
            "'{path}' is not an absolute path"
        )));
    }
    if path.contains('\0') {
        return Err(VfsError::InvalidPath("paths must not contain NUL".into()));
    }

    let mut normalized = String::with_capacity(path.len());
    for segment in path.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                return Err(VfsError::InvalidPath(format!(
                    "'{path}' traverses with '..'"
                )));
            },
            name => {
                normalized.push('/');
                normalized.push_str(name);
            },
        }
    }

    if normalized.is_empty() {
        normalized.push('/');
    }
    Ok(normalized)
}

/// Joins a relative path beneath an absolute base, refusing to escape it.
///
/// # Errors
///
/// Returns `VfsError::InvalidPath` if `relative` is empty, absolute, or
/// contains `..`.
pub fn join_under(base: &str, relative: &str) -> VfsResult<String> {
    if relative.starts_with('/') {
        return Err(VfsError::InvalidPath(format!(
            "'{relative}' must be relative to {base}"
        )));
    }
    let joined = normalize(&format!("{base}/{relative}"))?;
    let base = normalize(base)?;
    if joined == base {
        return Err(VfsError::InvalidPath(format!(
            "'{relative}' does not name an entry under {base}"
        )));
    }
    Ok(joined)
}

/// Whether `path` is the root directory.
#[must_use]
pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// Parent directory of a normalized path. The root is its own parent.
#[must_use]
pub fn dirname(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => ROOT.to_owned(),
        Some(idx) => path[..idx].to_owned(),
    }
}

/// Final segment of a normalized path; `/` for the root.
#[must_use]
pub fn basename(path: &str) -> &str {
    match path.rsplit('/').next() {
        Some("") | None => ROOT,
        Some(name) => name,
    }
}
