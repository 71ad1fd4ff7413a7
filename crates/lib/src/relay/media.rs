//! Voice capture: download media, stage it in a scratch file and read it back as the upload body.
//!
//! The scratch file is owned by a guard that removes it on drop, so it never outlives
//! the capture whether the capture succeeds or fails.

use crate::channels::{ChannelHandle, InboundEvent};
use crate::relay::RelayError;
use std::path::{Path, PathBuf};

/// Temporary file removed when dropped.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Write `bytes` to `dir/name`, creating `dir` if needed.
    pub async fn create(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let file = Self {
            path: dir.join(name),
        };
        tokio::fs::write(&file.path, bytes).await?;
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("removing scratch file {} failed: {}", self.path.display(), e);
            }
        }
    }
}

/// Voice note ready for multipart upload.
#[derive(Debug, Clone)]
pub struct VoiceUpload {
    pub sender_id: String,
    pub message_kind: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl VoiceUpload {
    /// Multipart form with `from`, `messageType` and the `voice` file part.
    pub fn to_form(&self) -> Result<reqwest::multipart::Form, reqwest::Error> {
        let part = reqwest::multipart::Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.mime_type)?;
        Ok(reqwest::multipart::Form::new()
            .text("from", self.sender_id.clone())
            .text("messageType", self.message_kind.clone())
            .part("voice", part))
    }
}

/// Upload filename: `voice_<unix ms>.<mime subtype>`.
pub fn voice_file_name(now_ms: i64, extension: &str) -> String {
    format!("voice_{}.{}", now_ms, extension)
}

/// Fetch the event's media and stage it through the scratch directory.
pub async fn capture_voice(
    transport: &dyn ChannelHandle,
    event: &InboundEvent,
    scratch_dir: &Path,
) -> Result<VoiceUpload, RelayError> {
    let media = transport
        .download_media(event)
        .await
        .map_err(RelayError::MediaFetch)?
        .ok_or_else(|| RelayError::MediaFetch(format!("no media returned for {}", event.sender_id)))?;
    let bytes = media
        .decode()
        .map_err(|e| RelayError::MediaFetch(format!("invalid media encoding: {}", e)))?;

    let file_name = voice_file_name(chrono::Utc::now().timestamp_millis(), media.extension());
    // Unique on-disk name so concurrent captures in the same millisecond do not collide.
    let disk_name = format!("{}-{}", uuid::Uuid::new_v4().simple(), file_name);
    let scratch = ScratchFile::create(scratch_dir, &disk_name, &bytes).await?;
    let staged = tokio::fs::read(scratch.path()).await?;
    drop(scratch);

    Ok(VoiceUpload {
        sender_id: event.sender_id.clone(),
        message_kind: event.kind.as_str().to_string(),
        file_name,
        mime_type: media.mimetype,
        bytes: staged,
    })
}
