//! Application commands: `install`, `launch`, `pack`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use prism_capsule::pack_bundle;
use prism_desktop::Desktop;

/// Install a bundle file from the host under its file name.
pub(crate) async fn install(desktop: &Desktop, bundle: &Path) -> Result<()> {
    let name = bundle
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", bundle.display()))?;
    let bytes = tokio::fs::read(bundle)
        .await
        .with_context(|| format!("reading {}", bundle.display()))?;
    let path = desktop.install_bundle(name, bytes).await?;
    println!("{path}");
    Ok(())
}

/// Launch a bundle and report the process that ended up running.
pub(crate) async fn launch(desktop: &Desktop, path: &str) -> Result<()> {
    let id = desktop.launch(path).await?;
    for process in desktop.runtime().list() {
        if process.id == id {
            println!("{id}\t{}\t{}", process.global_id, process.path);
        }
    }
    Ok(())
}

/// Pack every regular file under `dir` into a bundle at `out`.
pub(crate) fn pack(dir: &Path, out: &Path) -> Result<()> {
    let files = collect_files(dir)?;
    if files.is_empty() {
        bail!("{} contains no files", dir.display());
    }
    let entries: Vec<(&str, &[u8])> = files
        .iter()
        .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
        .collect();
    let bundle = pack_bundle(entries)?;
    std::fs::write(out, bundle).with_context(|| format!("writing {}", out.display()))?;
    println!("{} ({} files)", out.display(), files.len());
    Ok(())
}

/// Files under `root` as `(slash-separated relative name, bytes)`, sorted.
fn collect_files(root: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::new();
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries =
            std::fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                let relative = path.strip_prefix(root)?;
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let bytes =
                    std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
                files.push((name, bytes));
            }
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_capsule::unpack_bundle;

    #[test]
    fn test_pack_collects_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("notes");
        std::fs::create_dir_all(src.join("img")).unwrap();
        std::fs::write(src.join("manifest.json"), r#"{"id":"notes"}"#).unwrap();
        std::fs::write(src.join("main.js"), "1").unwrap();
        std::fs::write(src.join("img").join("icon.png"), [0x89_u8, b'P']).unwrap();

        let out = dir.path().join("notes.app");
        pack(&src, &out).unwrap();

        let files = unpack_bundle(&std::fs::read(&out).unwrap()).unwrap();
        let names: Vec<_> = files.keys().cloned().collect();
        assert_eq!(names, vec!["img/icon.png", "main.js", "manifest.json"]);
    }

    #[test]
    fn test_pack_refuses_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(pack(dir.path(), &dir.path().join("x.app")).is_err());
    }
}
