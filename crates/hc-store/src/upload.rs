//! Publishing a scratch directory to the artifact store.

use std::path::Path;

use crate::content_type::{content_type_for, is_manifest};
use crate::ArtifactStore;

/// Upload every regular file directly inside `local_dir` to `bucket` under
/// `key_prefix`, returning the uploaded keys in upload order.
///
/// - Files ending in `.<skip_extension>` (the downloaded source) are never
///   published.
/// - Segments go first in name order; files ending in
///   `.<manifest_extension>` go last, so an existence check on the manifest
///   key never observes a half-uploaded artifact.
/// - The first failed upload aborts the call. Objects uploaded before it
///   stay in the store.
pub async fn upload_folder(
    store: &dyn ArtifactStore,
    local_dir: &Path,
    bucket: &str,
    key_prefix: &str,
    skip_extension: &str,
    manifest_extension: &str,
) -> hc_core::Result<Vec<String>> {
    let skip_suffix = format!(".{skip_extension}");
    let mut names = Vec::new();

    let mut entries = tokio::fs::read_dir(local_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(&skip_suffix) {
            tracing::debug!("Skipping source file {name}");
            continue;
        }
        names.push(name);
    }

    // Sort by (is_manifest, name): segments in order, manifests at the end.
    names.sort_by_cached_key(|name| (is_manifest(name, manifest_extension), name.clone()));

    let mut uploaded = Vec::with_capacity(names.len());
    for name in names {
        let key = object_key(key_prefix, &name);
        let content_type = content_type_for(&name, manifest_extension);
        store
            .put_object(bucket, &key, &local_dir.join(&name), content_type)
            .await?;
        tracing::debug!("Uploaded {bucket}/{key} ({content_type})");
        uploaded.push(key);
    }

    Ok(uploaded)
}

/// Join a key prefix and a file name with exactly one `/`; an empty prefix
/// means the bucket root.
pub fn object_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
