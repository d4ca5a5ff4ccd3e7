// src/fetch/mod.rs
use anyhow::{Context, Result};
use reqwest::Client;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;
use zip::ZipArchive;

use crate::config::HubConfig;

static HUB_DOWNLOAD_BASE: &str = "https://www.kaggle.com/api/v1/datasets/download";

/// Written into the dataset directory once extraction finishes. A directory
/// without it is treated as a dead partial download and refetched.
static COMPLETE_MARKER: &str = ".complete";

/// Resolve `slug` (`owner/name`) to a local directory containing the
/// dataset's files, downloading and extracting on first use. Repeated calls
/// return the cached directory without touching the network.
pub async fn resolve_dataset(
    client: &Client,
    hub: &HubConfig,
    slug: &str,
    cache_root: &Path,
) -> Result<PathBuf> {
    let dataset_dir = cache_root.join(slug);
    let marker = dataset_dir.join(COMPLETE_MARKER);
    if marker.is_file() {
        debug!(slug, path = %dataset_dir.display(), "dataset cache hit");
        return Ok(dataset_dir);
    }

    fs::create_dir_all(&dataset_dir)
        .with_context(|| format!("creating {}", dataset_dir.display()))?;

    let url = Url::parse(&format!("{}/{}", HUB_DOWNLOAD_BASE, slug))
        .with_context(|| format!("bad dataset slug {:?}", slug))?;

    info!(slug, "downloading dataset archive");
    let resp = client
        .get(url.as_str())
        .basic_auth(&hub.username, Some(&hub.key))
        .send()
        .await
        .with_context(|| format!("requesting {}", url))?
        .error_for_status()
        .with_context(|| format!("downloading {}", url))?;
    let bytes = resp.bytes().await.context("reading archive body")?;
    info!(slug, bytes = bytes.len(), "archive downloaded");

    let mut archive = tempfile::NamedTempFile::new().context("creating scratch archive")?;
    archive.write_all(&bytes).context("spooling archive")?;

    // unzip on the blocking pool; the archive is tens of megabytes
    let archive_path = archive.into_temp_path();
    let dest = dataset_dir.clone();
    let extracted =
        tokio::task::spawn_blocking(move || extract_archive(&archive_path, &dest))
            .await
            .context("extraction task panicked")??;

    fs::write(&marker, b"").with_context(|| format!("writing {}", marker.display()))?;
    info!(slug, files = extracted, path = %dataset_dir.display(), "dataset ready");
    Ok(dataset_dir)
}

/// Unpack every file entry of `archive` into `dest`. Entries whose paths
/// would escape `dest` are skipped. Returns the number of files written.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize> {
    let file =
        File::open(archive).with_context(|| format!("opening {}", archive.display()))?;
    let mut zip = ZipArchive::new(file).context("reading zip archive")?;

    let mut written = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(rel) = entry.enclosed_name() else {
            debug!(name = entry.name(), "skipping entry with unsafe path");
            continue;
        };
        let target = dest.join(rel);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out =
            File::create(&target).with_context(|| format!("creating {}", target.display()))?;
        io::copy(&mut entry, &mut out)
            .with_context(|| format!("writing {}", target.display()))?;
        written += 1;
    }
    Ok(written)
}
