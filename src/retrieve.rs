//! Saving the finished file, the part a browser would do for a link click.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use reqwest::header::CONTENT_DISPOSITION;
use tokio::{io::AsyncWriteExt, runtime::Handle};

use crate::error::RetrieveError;

/// Fetches `url` in the background and saves it under `dir`.
/// Outcome is only logged.
pub fn spawn_retrieve(
    runtime: &Handle,
    client: reqwest::Client,
    url: String,
    dir: PathBuf,
    fallback_name: String,
) {
    runtime.spawn(async move {
        match save_to_dir(&client, &url, &dir, &fallback_name).await {
            Ok(path) => tracing::info!("saved {}", path.display()),
            Err(e) => tracing::error!("retrieving {} failed: {}", url, e),
        }
    });
}

pub async fn save_to_dir(
    client: &reqwest::Client,
    url: &str,
    dir: &Path,
    fallback_name: &str,
) -> Result<PathBuf, RetrieveError> {
    // Nothing touches the disk until the server says the file exists
    let mut resp = client.get(url).send().await?;
    if !resp.status().is_success() {
        return Err(RetrieveError::Status(resp.status().as_u16()));
    }

    // Prefer the server's name, keep only its last path component
    let name = resp
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_disposition)
        .and_then(|n| sanitize_filename(&n))
        .unwrap_or_else(|| fallback_name.to_string());

    tokio::fs::create_dir_all(dir).await?;
    let path = free_path(dir, &name).await?;
    let part = part_path(&path);

    // The body lands in `<name>.part` and only gets its real name once complete
    match write_body(&mut resp, &part).await {
        Ok(written) => {
            tokio::fs::rename(&part, &path).await?;
            tracing::debug!("{} bytes written to {}", written, path.display());
            Ok(path)
        }
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&part).await {
                tracing::warn!("could not remove {}: {}", part.display(), rm);
            }
            Err(e)
        }
    }
}

async fn write_body(resp: &mut reqwest::Response, part: &Path) -> Result<u64, RetrieveError> {
    let mut file = tokio::fs::File::create(part).await?;
    let mut written = 0u64;
    while let Some(chunk) = resp.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

fn part_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".part");
    PathBuf::from(os)
}

/// `name` inside `dir`, or `stem (1).ext`, `stem (2).ext`... when taken
async fn free_path(dir: &Path, name: &str) -> std::io::Result<PathBuf> {
    let candidate = dir.join(name);
    if !tokio::fs::try_exists(&candidate).await? {
        return Ok(candidate);
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let mut n = 1u32;
    loop {
        let file = match ext {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = dir.join(file);
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Filename from a `Content-Disposition` header. `filename*` (RFC 5987)
/// wins over plain `filename`.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for part in header.split(';').map(str::trim) {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                // charset'language'percent-encoded
                if let Some(encoded) = value.trim().splitn(3, '\'').nth(2) {
                    extended = percent_decode_str(encoded)
                        .decode_utf8()
                        .ok()
                        .map(Cow::into_owned);
                }
            }
            "filename" => {
                plain = Some(value.trim().trim_matches('"').to_string());
            }
            _ => {}
        }
    }
    extended.or(plain).filter(|n| !n.is_empty())
}

/// Keeps only the last path component so the server cannot pick the directory
fn sanitize_filename(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." || last.chars().any(char::is_control) {
        None
    } else {
        Some(last.to_string())
    }
}

/// Opens `folder` in the platform file manager
pub fn open_folder(folder: PathBuf) {
    std::thread::spawn(move || {
        #[cfg(target_os = "windows")]
        let result = std::process::Command::new("explorer").arg(&folder).spawn();
        #[cfg(target_os = "macos")]
        let result = std::process::Command::new("open").arg(&folder).spawn();
        #[cfg(all(unix, not(target_os = "macos")))]
        let result = std::process::Command::new("xdg-open").arg(&folder).spawn();
        if let Err(e) = result {
            tracing::warn!("could not open {}: {}", folder.display(), e);
        }
    });
}
