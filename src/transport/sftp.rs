//! File-transfer channel backed by `russh-sftp`.

use async_trait::async_trait;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use tokio::io::AsyncWriteExt;

use super::{FileEntry, FileTransfer};
use crate::error::SshRelayError;
use crate::Result;

pub(super) struct SftpTransfer {
    sftp: SftpSession,
}

impl SftpTransfer {
    pub(super) fn new(sftp: SftpSession) -> Self {
        Self { sftp }
    }
}

fn transfer_err(path: &str, e: impl std::fmt::Display) -> SshRelayError {
    SshRelayError::Transfer(format!("{path}: {e}"))
}

#[async_trait]
impl FileTransfer for SftpTransfer {
    async fn read_dir(&self, path: &str) -> Result<Vec<FileEntry>> {
        let entries = self
            .sftp
            .read_dir(path)
            .await
            .map_err(|e| transfer_err(path, e))?;

        Ok(entries
            .map(|entry| {
                let metadata = entry.metadata();
                FileEntry {
                    name: entry.file_name(),
                    is_directory: metadata.is_dir(),
                    size: metadata.size.unwrap_or(0),
                    modified: metadata.mtime.map(u64::from),
                }
            })
            .filter(|entry| entry.name != "." && entry.name != "..")
            .collect())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.sftp.read(path).await.map_err(|e| transfer_err(path, e))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut file = self
            .sftp
            .open_with_flags(
                path,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await
            .map_err(|e| transfer_err(path, e))?;
        file.write_all(data)
            .await
            .map_err(|e| transfer_err(path, e))?;
        file.shutdown().await.map_err(|e| transfer_err(path, e))?;
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.sftp
            .rename(from, to)
            .await
            .map_err(|e| transfer_err(from, e))
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        self.sftp
            .remove_file(path)
            .await
            .map_err(|e| transfer_err(path, e))
    }

    async fn remove_dir(&self, path: &str) -> Result<()> {
        self.sftp
            .remove_dir(path)
            .await
            .map_err(|e| transfer_err(path, e))
    }

    async fn is_dir(&self, path: &str) -> Result<bool> {
        self.sftp
            .symlink_metadata(path)
            .await
            .map(|metadata| metadata.is_dir())
            .map_err(|e| transfer_err(path, e))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.sftp
            .close()
            .await
            .map_err(|e| SshRelayError::Transfer(format!("closing SFTP channel: {e}")))
    }
}
