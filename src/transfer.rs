//! File-transfer bridge.
//!
//! Every operation opens its own transfer channel on the session's
//! connection, does one unit of work, and closes the channel before
//! returning. Failures are reported as `Transfer` and leave the session
//! usable.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::SshRelayError;
use crate::manager::SessionManager;
use crate::transport::{FileEntry, FileTransfer};
use crate::Result;

/// MIME type used for downloaded blobs.
const OCTET_STREAM: &str = "application/octet-stream";

/// A downloaded file, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Download {
    pub path: String,
    pub size: usize,
    /// Standard-alphabet base64 of the file contents.
    pub data: String,
    /// `data:application/octet-stream;base64,...`
    pub data_uri: String,
}

/// Decode an upload payload: plain base64 or a `data:<mime>;base64,` URI.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>> {
    let payload = payload.trim();
    let encoded = match payload.strip_prefix("data:") {
        Some(uri) => {
            let (meta, data) = uri
                .split_once(',')
                .ok_or_else(|| SshRelayError::InvalidInput("invalid data URI".into()))?;
            if !meta.ends_with(";base64") {
                return Err(SshRelayError::InvalidInput(
                    "data URI is not base64-encoded".into(),
                ));
            }
            data
        }
        None => payload,
    };

    BASE64
        .decode(encoded)
        .map_err(|e| SshRelayError::InvalidInput(format!("invalid base64 payload: {e}")))
}

impl SessionManager {
    async fn open_transfer(&self, id: &str) -> Result<Box<dyn FileTransfer>> {
        let session = self.session(id)?;
        session
            .transport()
            .open_file_transfer()
            .await
            .map_err(|e| match e {
                SshRelayError::Channel(msg) => SshRelayError::Transfer(msg),
                other => other,
            })
    }

    /// Close the channel an operation ran on and hand back its result.
    async fn finish<T>(
        &self,
        id: &str,
        transfer: Box<dyn FileTransfer>,
        result: Result<T>,
    ) -> Result<T> {
        if let Err(e) = transfer.close().await {
            debug!(session = %id, error = %e, "Transfer channel did not close cleanly");
        }
        result
    }

    /// List a directory. `.` and `..` are omitted.
    pub async fn list_directory(&self, id: &str, path: &str) -> Result<Vec<FileEntry>> {
        let transfer = self.open_transfer(id).await?;
        let result = transfer.read_dir(path).await;
        self.finish(id, transfer, result).await
    }

    /// Read a file as text. Invalid UTF-8 is replaced.
    pub async fn read_file(&self, id: &str, path: &str) -> Result<String> {
        let transfer = self.open_transfer(id).await?;
        let result = transfer.read(path).await;
        let bytes = self.finish(id, transfer, result).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Create or replace a file with text content.
    pub async fn write_file(&self, id: &str, path: &str, content: &str) -> Result<()> {
        self.write_bytes(id, path, content.as_bytes()).await
    }

    async fn write_bytes(&self, id: &str, path: &str, data: &[u8]) -> Result<()> {
        let transfer = self.open_transfer(id).await?;
        let result = transfer.write(path, data).await;
        self.finish(id, transfer, result).await?;
        debug!(session = %id, bytes = data.len(), "File written");
        Ok(())
    }

    pub async fn rename(&self, id: &str, from: &str, to: &str) -> Result<()> {
        let transfer = self.open_transfer(id).await?;
        let result = transfer.rename(from, to).await;
        self.finish(id, transfer, result).await
    }

    /// Remove a file or a whole directory tree.
    ///
    /// Needs no risky-command confirmation: the caller asked for this path
    /// to go.
    pub async fn delete(&self, id: &str, path: &str) -> Result<()> {
        let target = path.trim_end_matches('/');
        if target.is_empty() {
            return Err(SshRelayError::InvalidInput(
                "refusing to delete the filesystem root".into(),
            ));
        }
        let transfer = self.open_transfer(id).await?;
        let result = remove_tree(transfer.as_ref(), target).await;
        let removed = self.finish(id, transfer, result).await?;
        info!(session = %id, path = %path, removed, "Deleted");
        Ok(())
    }

    /// Write a base64 payload (or base64 data URI) to `path`.
    pub async fn upload(&self, id: &str, path: &str, payload: &str) -> Result<()> {
        self.session(id)?;
        let data = decode_payload(payload)?;
        self.write_bytes(id, path, &data).await
    }

    /// Fetch `path` as base64.
    pub async fn download(&self, id: &str, path: &str) -> Result<Download> {
        let transfer = self.open_transfer(id).await?;
        let result = transfer.read(path).await;
        let bytes = self.finish(id, transfer, result).await?;
        let data = BASE64.encode(&bytes);
        Ok(Download {
            path: path.to_string(),
            size: bytes.len(),
            data_uri: format!("data:{OCTET_STREAM};base64,{data}"),
            data,
        })
    }
}

/// Depth-first removal. Returns the number of entries removed.
async fn remove_tree(transfer: &dyn FileTransfer, path: &str) -> Result<u64> {
    if !transfer.is_dir(path).await? {
        transfer.remove_file(path).await?;
        return Ok(1);
    }
    remove_dir_contents(transfer, path).await
}

async fn remove_dir_contents(transfer: &dyn FileTransfer, path: &str) -> Result<u64> {
    let mut removed = 0;
    for entry in transfer.read_dir(path).await? {
        let child = format!("{}/{}", path.trim_end_matches('/'), entry.name);
        if entry.is_directory {
            removed += Box::pin(remove_dir_contents(transfer, &child)).await?;
        } else {
            transfer.remove_file(&child).await?;
            removed += 1;
        }
    }
    transfer.remove_dir(path).await?;
    Ok(removed + 1)
}
