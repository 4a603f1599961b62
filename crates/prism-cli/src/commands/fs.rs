//! Filesystem commands: `ls`, `cat`, `stat`, `mkdir`, `rm`, `put`, `search`.
//!
//! Every command acts with the `user` permission tag, the same one
//! applications get, so denials and missing paths look alike.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use prism_desktop::Desktop;
use prism_vfs::{Content, Meta, PermissionSet};

/// Print the children of a directory, one per line.
pub(crate) async fn ls(desktop: &Desktop, path: &str) -> Result<()> {
    let Some(children) = desktop
        .vfs()
        .list_dir(path, &PermissionSet::user())
        .await?
    else {
        bail!("{path}: no such directory");
    };
    for child in children {
        println!("{child}");
    }
    Ok(())
}

/// Write a file's content to stdout.
pub(crate) async fn cat(desktop: &Desktop, path: &str) -> Result<()> {
    let Some(content) = desktop
        .vfs()
        .get_file(path, &PermissionSet::user())
        .await?
    else {
        bail!("{path}: no such file");
    };
    let mut out = std::io::stdout().lock();
    match content {
        Content::Text(text) => writeln!(out, "{text}")?,
        Content::Json(value) => writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?,
        Content::Binary(bytes) => out.write_all(&bytes)?,
    }
    Ok(())
}

/// Print a node's record, without file content, as JSON.
pub(crate) async fn stat(desktop: &Desktop, path: &str) -> Result<()> {
    let Some(node) = desktop.vfs().stat(path, &PermissionSet::user()).await? else {
        bail!("{path}: no such file or directory");
    };
    println!("{}", serde_json::to_string_pretty(&node.without_content())?);
    Ok(())
}

/// Create a directory and any missing ancestors.
pub(crate) async fn mkdir(desktop: &Desktop, path: &str) -> Result<()> {
    desktop
        .vfs()
        .make_dir(path, &PermissionSet::user(), Meta::new())
        .await?;
    Ok(())
}

/// Remove a file or directory tree.
pub(crate) async fn rm(desktop: &Desktop, path: &str) -> Result<()> {
    desktop
        .vfs()
        .delete_file(path, &PermissionSet::user())
        .await?;
    Ok(())
}

/// Copy a host file into the VFS. UTF-8 files are stored as text.
pub(crate) async fn put(desktop: &Desktop, host_file: &Path, path: &str) -> Result<()> {
    let bytes = tokio::fs::read(host_file)
        .await
        .with_context(|| format!("reading {}", host_file.display()))?;
    let content = match String::from_utf8(bytes) {
        Ok(text) => Content::Text(text),
        Err(e) => Content::Binary(e.into_bytes()),
    };
    desktop
        .vfs()
        .write_file(path, content, &PermissionSet::user(), Meta::new())
        .await?;
    Ok(())
}

/// Print index entries whose name matches `query`.
pub(crate) fn search(desktop: &Desktop, query: &str) {
    for entry in desktop.search(query) {
        println!("{}\t{}\t{}", entry.kind, entry.mimetype, entry.path);
    }
}
