//! Non-blocking file handle seam over `futures_io`.
//!
//! Runtime-agnostic: any handle implementing `futures_io::AsyncRead` and
//! `AsyncWrite` can be plugged in. [`OsFileSystem`] uses `async-fs`, which
//! runs blocking calls on its own thread pool.

use std::future::Future;
use std::io;
use std::path::Path;

use futures_io::{AsyncRead, AsyncWrite};

use super::{OpenOptions, OsFileSystem};

/// An open file for non-blocking transfers, owned by a single operation.
pub trait AsyncFileHandle: AsyncRead + AsyncWrite + Unpin + Send {
    /// Returns the advertised length of the file, if it has one.
    fn length(&mut self) -> impl Future<Output = io::Result<Option<u64>>> + Send;
}

impl AsyncFileHandle for async_fs::File {
    async fn length(&mut self) -> io::Result<Option<u64>> {
        let metadata = self.metadata().await?;
        Ok(metadata.is_file().then(|| metadata.len()))
    }
}

/// Opens files for non-blocking transfers.
pub trait AsyncFileSystem: Send + Sync {
    /// The handle type produced by [`AsyncFileSystem::open`].
    type Handle: AsyncFileHandle;

    /// Opens `path`. Errors are propagated to the caller unchanged.
    fn open(
        &self,
        path: &Path,
        options: &OpenOptions,
    ) -> impl Future<Output = io::Result<Self::Handle>> + Send;
}

impl AsyncFileSystem for OsFileSystem {
    type Handle = async_fs::File;

    fn open(
        &self,
        path: &Path,
        options: &OpenOptions,
    ) -> impl Future<Output = io::Result<async_fs::File>> + Send {
        let (read, write, append, truncate, create) = options.flags();
        let mut builder = async_fs::OpenOptions::new();
        builder
            .read(read)
            .write(write)
            .append(append)
            .truncate(truncate)
            .create(create);
        builder.open(path)
    }
}
