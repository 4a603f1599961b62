//! Boot steps.
//!
//! Each step only touches the VFS and the asset source, so the sequence in
//! [`Desktop::boot`](crate::Desktop::boot) reads top to bottom.

use prism_capsule::bundle::MANIFEST_FILE;
use prism_capsule::{AssetSource, CapsuleError, Manifest, unpack_bundle};
use prism_vfs::{Content, Meta, PermissionSet, Vfs, path};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{BootError, BootResult};

/// Directory system files live in.
pub const SYSTEM_DIR: &str = "/system";
/// Directory default and installed applications live in.
pub const APPLICATIONS_DIR: &str = "/home/applications";
/// Stored desktop stylesheet.
pub const DESKTOP_STYLES: &str = "/system/desktop.css";
/// Stored copy of the default application list.
pub const APP_LIST: &str = "/system/applist.json";

const DESKTOP_STYLES_ASSET: &str = "css/desktop.css";
const APP_STYLES_ASSET: &str = "css/defaultapp.css";
const APP_LIST_ASSET: &str = "app/list.json";

/// Create `/` and `/system`, both tagged `user`.
pub(crate) async fn ensure_system_dirs(vfs: &Vfs) -> BootResult<()> {
    let user = PermissionSet::user();
    vfs.make_dir(path::ROOT, &user, Meta::new()).await?;
    vfs.make_dir(SYSTEM_DIR, &user, Meta::new()).await?;
    Ok(())
}

/// Fetch an asset, folding transport errors into `None` after logging.
async fn fetch(assets: &dyn AssetSource, asset: &str) -> Option<Vec<u8>> {
    match assets.fetch(asset).await {
        Ok(Some(bytes)) => Some(bytes),
        Ok(None) => {
            debug!(asset, "Asset source does not have asset");
            None
        },
        Err(e) => {
            error!(asset, error = %e, "Failed to fetch asset");
            None
        },
    }
}

/// Copy `asset` to `target` unless it is already stored (or `refresh`).
///
/// Returns whether `target` holds the asset afterwards.
async fn ensure_asset(
    vfs: &Vfs,
    assets: &dyn AssetSource,
    asset: &str,
    target: &str,
    refresh: bool,
) -> BootResult<bool> {
    let present = vfs.exists(target).await?;
    if present && !refresh {
        return Ok(true);
    }
    if !present {
        info!(path = %target, "System asset missing, might be first boot");
    }
    let Some(bytes) = fetch(assets, asset).await else {
        return Ok(present);
    };
    let text = String::from_utf8_lossy(&bytes).into_owned();
    vfs.write_file(target, text, &PermissionSet::user(), Meta::new())
        .await?;
    info!(path = %target, "System asset stored");
    Ok(true)
}

/// Store the desktop and application stylesheets.
///
/// # Errors
///
/// [`BootError::MissingAsset`] when the desktop stylesheet is neither stored
/// nor fetchable. A missing application stylesheet is only logged.
pub(crate) async fn ensure_system_assets(
    vfs: &Vfs,
    assets: &dyn AssetSource,
    app_styles_path: &str,
    refresh: bool,
) -> BootResult<()> {
    if !ensure_asset(vfs, assets, DESKTOP_STYLES_ASSET, DESKTOP_STYLES, refresh).await? {
        error!("Failed to get desktop stylesheet, system halted");
        return Err(BootError::MissingAsset {
            path: DESKTOP_STYLES_ASSET.to_owned(),
        });
    }
    if !ensure_asset(vfs, assets, APP_STYLES_ASSET, app_styles_path, refresh).await? {
        error!("Failed to get default application stylesheet");
    }
    Ok(())
}

/// Install every bundle named in the asset source's `app/list.json`,
/// unless the list was already installed (and `refresh` is off).
///
/// Returns the installed paths. Bundles that cannot be fetched or carry no
/// valid manifest are skipped with a log entry.
pub(crate) async fn install_default_apps(
    vfs: &Vfs,
    assets: &dyn AssetSource,
    refresh: bool,
) -> BootResult<Vec<String>> {
    if vfs.exists(APP_LIST).await? && !refresh {
        debug!("Default applications already installed");
        return Ok(Vec::new());
    }
    let Some(raw) = fetch(assets, APP_LIST_ASSET).await else {
        error!("Failed to fetch default app list");
        return Ok(Vec::new());
    };
    let text = String::from_utf8_lossy(&raw).into_owned();
    vfs.write_file(APP_LIST, text.as_str(), &PermissionSet::user(), Meta::new())
        .await?;

    let names = match parse_app_list(&text) {
        Ok(names) => names,
        Err(e) => {
            warn!(error = %e, "Failed to parse default app list");
            return Ok(Vec::new());
        },
    };

    let mut installed = Vec::with_capacity(names.len());
    for name in names {
        let Some(bundle) = fetch(assets, &format!("app/{name}")).await else {
            warn!(app = %name, "Failed to install app");
            continue;
        };
        match install_bundle(vfs, &name, bundle).await {
            Ok(path) => installed.push(path),
            Err(BootError::Capsule(e)) => {
                error!(app = %name, error = %e, "Malformed application, skipped");
            },
            Err(BootError::Vfs(prism_vfs::VfsError::InvalidPath(p))) => {
                error!(app = %name, path = %p, "Unusable application name, skipped");
            },
            Err(e) => return Err(e),
        }
    }
    info!(count = installed.len(), "Default apps installed");
    Ok(installed)
}

fn parse_app_list(text: &str) -> BootResult<Vec<String>> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| BootError::InvalidAppList(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(BootError::InvalidAppList("expected an array".into()));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(name) => Ok(name),
            other => Err(BootError::InvalidAppList(format!(
                "expected a bundle name, got {other}"
            ))),
        })
        .collect()
}

/// Validate `bundle` and store it as `/home/applications/<name>`.
///
/// The stored node carries `hidden = true` metadata when the manifest says
/// so.
///
/// # Errors
///
/// A capsule error if the bundle cannot be unpacked or its manifest is
/// missing or invalid; [`prism_vfs::VfsError::InvalidPath`] if `name` is not
/// a single path segment.
pub async fn install_bundle(vfs: &Vfs, name: &str, bundle: Vec<u8>) -> BootResult<String> {
    let target = path::join_under(APPLICATIONS_DIR, name)?;
    if path::dirname(&target) != APPLICATIONS_DIR {
        return Err(prism_vfs::VfsError::InvalidPath(name.to_owned()).into());
    }

    let files = unpack_bundle(&bundle)?;
    let raw = files.get(MANIFEST_FILE).ok_or_else(|| {
        CapsuleError::ManifestInvalid("bundle has no manifest.json".into())
    })?;
    let manifest = Manifest::parse(raw)?;

    let mut meta = Meta::new();
    if manifest.hidden {
        meta.insert("hidden".into(), Value::Bool(true));
    }
    vfs.write_file(&target, Content::Binary(bundle), &PermissionSet::user(), meta)
        .await?;
    info!(path = %target, global_id = %manifest.global_id, "Application installed");
    Ok(target)
}
