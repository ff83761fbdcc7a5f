use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

/// 10 MB upload limit for recipe images
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

const MAX_NAME_ATTEMPTS: usize = 8;

/// URL prefix the upload directory is served under.
pub const UPLOAD_URL_PREFIX: &str = "/uploads";

/// Manages recipe images on disk.
///
/// Each image is a flat file `{uploader_id}_{unix_millis}{.ext}` inside the
/// upload directory, suffixed when two uploads collide. Recipes store the
/// public path, `/uploads/{file}`.
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Image upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write an uploaded image and return its public path.
    pub async fn save(&self, uploader: Uuid, original_name: Option<&str>, bytes: &[u8]) -> Result<String> {
        let millis = chrono::Utc::now().timestamp_millis();
        let file_name = self
            .write_new(&image_file_name(uploader, millis, original_name), bytes)
            .await?;

        Ok(format!("{UPLOAD_URL_PREFIX}/{file_name}"))
    }

    /// Write `bytes` under `file_name` without replacing an existing file.
    /// A taken name is retried with a random suffix before the extension.
    /// Returns the name actually written.
    async fn write_new(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        let mut candidate = file_name.to_string();
        for _ in 0..MAX_NAME_ATTEMPTS {
            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.dir.join(&candidate))
                .await;
            match opened {
                Ok(mut file) => {
                    file.write_all(bytes).await?;
                    file.flush().await?;
                    return Ok(candidate);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    let suffix = Uuid::new_v4().simple().to_string();
                    candidate = with_suffix(file_name, &suffix[..8]);
                }
                Err(e) => return Err(e.into()),
            }
        }
        anyhow::bail!("no free file name for upload {file_name}")
    }

    /// Best-effort removal of a previously stored image. Paths outside the
    /// upload prefix are ignored.
    pub async fn delete(&self, public_path: &str) -> Result<()> {
        let Some(file_name) = stored_file_name(public_path) else {
            warn!("Not deleting image outside upload dir: {}", public_path);
            return Ok(());
        };

        match fs::remove_file(self.dir.join(file_name)).await {
            Ok(()) => {
                info!("Deleted image {}", file_name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Image {} already gone", file_name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub fn image_file_name(uploader: Uuid, millis: i64, original_name: Option<&str>) -> String {
    let extension = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("{uploader}_{millis}{extension}")
}

/// `name_1.png` + `ab12` -> `name_1_ab12.png`
fn with_suffix(file_name: &str, suffix: &str) -> String {
    match file_name.rfind('.') {
        Some(dot) => format!("{}_{suffix}{}", &file_name[..dot], &file_name[dot..]),
        None => format!("{file_name}_{suffix}"),
    }
}

/// File name part of `/uploads/{file}`, rejecting anything that could
/// escape the directory.
fn stored_file_name(public_path: &str) -> Option<&str> {
    let name = public_path.strip_prefix(UPLOAD_URL_PREFIX)?.strip_prefix('/')?;
    let safe = !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != "..";
    safe.then_some(name)
}
