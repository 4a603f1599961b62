//! Application bundles.
//!
//! A bundle is a gzip-compressed tar archive stored as one binary file in the
//! VFS (conventionally `/home/applications/<name>.app`). It must contain a
//! `manifest.json`; `index.html` and `main.js` are optional.
//!
//! Unpacking guards against:
//! - Path traversal (`../` components) and absolute paths
//! - Links, devices and other non-regular entries
//! - Excessive entry counts and decompressed size (gzip bombs)

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Component, Path};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Archive, Builder, EntryType, Header};
use tracing::{debug, warn};

use crate::error::{CapsuleError, CapsuleResult};
use crate::manifest::Manifest;

/// Required manifest entry.
pub const MANIFEST_FILE: &str = "manifest.json";
/// Optional markup entry.
pub const INDEX_FILE: &str = "index.html";
/// Optional script entry.
pub const MAIN_FILE: &str = "main.js";

/// Maximum number of entries allowed in a bundle.
const MAX_ENTRY_COUNT: usize = 1_000;

/// Maximum total decompressed size (64 MiB).
const MAX_EXTRACTED_SIZE: u64 = 67_108_864;

/// Entry name to contents.
pub type BundleFiles = BTreeMap<String, Vec<u8>>;

/// Decompress a bundle into memory.
///
/// Directory entries are skipped; file names are relative with any leading
/// `./` removed.
///
/// # Errors
///
/// Returns [`CapsuleError::Bundle`] on decompression failures or exceeded
/// limits, [`CapsuleError::UnsafeEntryType`] or [`CapsuleError::PathTraversal`]
/// on hostile entries.
pub fn unpack_bundle(data: &[u8]) -> CapsuleResult<BundleFiles> {
    let mut archive = Archive::new(GzDecoder::new(data));
    let mut files = BundleFiles::new();
    let mut entry_count = 0usize;
    let mut total_size: u64 = 0;

    let entries = archive
        .entries()
        .map_err(|e| CapsuleError::Bundle(format!("failed to read archive entries: {e}")))?;

    for entry_result in entries {
        let mut entry = entry_result
            .map_err(|e| CapsuleError::Bundle(format!("failed to read archive entry: {e}")))?;

        entry_count = entry_count.saturating_add(1);
        if entry_count > MAX_ENTRY_COUNT {
            return Err(CapsuleError::Bundle(format!(
                "archive exceeds maximum entry count ({MAX_ENTRY_COUNT})"
            )));
        }

        let entry_type = entry.header().entry_type();
        let entry_path = entry
            .path()
            .map_err(|e| CapsuleError::Bundle(format!("failed to read entry path: {e}")))?
            .into_owned();

        if !is_safe_entry_type(entry_type) {
            return Err(CapsuleError::UnsafeEntryType {
                entry_type: format!("{entry_type:?}"),
                path: entry_path.display().to_string(),
            });
        }
        let name = entry_name(&entry_path)?;
        if entry_type.is_dir() || name.is_empty() {
            continue;
        }

        let entry_size = entry
            .header()
            .size()
            .map_err(|e| CapsuleError::Bundle(format!("failed to read entry size: {e}")))?;
        total_size = total_size.saturating_add(entry_size);
        if total_size > MAX_EXTRACTED_SIZE {
            return Err(CapsuleError::Bundle(format!(
                "archive exceeds maximum extracted size ({MAX_EXTRACTED_SIZE} bytes)"
            )));
        }

        let mut contents = Vec::with_capacity(usize::try_from(entry_size).unwrap_or(0));
        entry
            .read_to_end(&mut contents)
            .map_err(|e| CapsuleError::Bundle(format!("failed to read {name}: {e}")))?;
        files.insert(name, contents);
    }

    debug!(entries = files.len(), bytes = total_size, "Unpacked bundle");
    Ok(files)
}

/// Build a bundle from named entries. The inverse of [`unpack_bundle`].
///
/// # Errors
///
/// Returns [`CapsuleError::PathTraversal`] for unsafe names, or
/// [`CapsuleError::Io`] if the archive cannot be written.
pub fn pack_bundle<'a, I>(files: I) -> CapsuleResult<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(encoder);

    for (name, contents) in files {
        let name = entry_name(Path::new(name))?;
        if name.is_empty() {
            return Err(CapsuleError::Bundle("bundle entry names must not be empty".into()));
        }
        let mut header = Header::new_gnu();
        header.set_size(u64::try_from(contents.len()).unwrap_or(u64::MAX));
        header.set_mode(0o644);
        header.set_entry_type(EntryType::Regular);
        header.set_cksum();
        builder.append_data(&mut header, &name, contents)?;
    }

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

/// Regular files and directories, plus the metadata headers tar emits for
/// long names.
fn is_safe_entry_type(entry_type: EntryType) -> bool {
    matches!(
        entry_type,
        EntryType::Regular
            | EntryType::Directory
            | EntryType::GNULongName
            | EntryType::XHeader
            | EntryType::XGlobalHeader
    )
}

/// Normalize an entry path to a relative, slash-joined name.
fn entry_name(path: &Path) -> CapsuleResult<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {},
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(CapsuleError::PathTraversal {
                    path: path.display().to_string(),
                });
            },
        }
    }
    Ok(parts.join("/"))
}

/// A bundle whose manifest has been validated.
#[derive(Debug, Clone)]
pub struct AppBundle {
    /// Parsed manifest.
    pub manifest: Manifest,
    /// Markup for the document body; empty when the bundle has none.
    pub index_html: String,
    /// Application script; empty when the bundle has none.
    pub main_js: String,
}

impl AppBundle {
    /// Validate unpacked files.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::ManifestInvalid`] if `manifest.json` is absent
    /// or invalid.
    pub fn from_files(files: &BundleFiles) -> CapsuleResult<Self> {
        let raw = files.get(MANIFEST_FILE).ok_or_else(|| {
            CapsuleError::ManifestInvalid("bundle has no manifest.json".into())
        })?;
        let manifest = Manifest::parse(raw)?;

        Ok(Self {
            index_html: optional_text(files, INDEX_FILE, &manifest),
            main_js: optional_text(files, MAIN_FILE, &manifest),
            manifest,
        })
    }

    /// Unpack and validate in one step.
    ///
    /// # Errors
    ///
    /// See [`unpack_bundle`] and [`AppBundle::from_files`].
    pub fn from_archive(data: &[u8]) -> CapsuleResult<Self> {
        Self::from_files(&unpack_bundle(data)?)
    }
}

fn optional_text(files: &BundleFiles, name: &str, manifest: &Manifest) -> String {
    match files.get(name) {
        Some(raw) => String::from_utf8_lossy(raw).into_owned(),
        None => {
            warn!(global_id = %manifest.global_id, entry = name, "Bundle entry missing, using empty");
            String::new()
        },
    }
}
