//! File handle seams.
//!
//! The transfer engine never opens files itself. It asks a [`FileSystem`]
//! (or [`AsyncFileSystem`] for the non-blocking API) for a handle, owns that
//! handle for the duration of one operation and drops it on every exit path.
//!
//! - [`OpenOptions`] - Open mode, access and sharing request
//! - [`FileHandle`] / [`FileSystem`] - Blocking seam over [`std::io::Read`] + [`std::io::Write`]
//! - [`OsFileSystem`] - The operating system's file system

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

#[cfg(feature = "async-io")]
mod nonblocking;

#[cfg(feature = "async-io")]
pub use nonblocking::{AsyncFileHandle, AsyncFileSystem};

/// How a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenMode {
    /// Open an existing file.
    Open,
    /// Create the file, truncating it if it exists.
    Create,
    /// Open or create the file and position every write at its end.
    Append,
    /// Open the file, creating it if it does not exist.
    OpenOrCreate,
}

/// Requested access to an opened file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Read only.
    Read,
    /// Write only.
    Write,
    /// Read and write.
    ReadWrite,
}

/// Sharing requested from other openers of the same file.
///
/// Recorded for [`FileSystem`] implementations that support it; the
/// [`OsFileSystem`] does not lock files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Share {
    /// No sharing.
    None,
    /// Others may read.
    #[default]
    Read,
    /// Others may write.
    Write,
    /// Others may read and write.
    ReadWrite,
}

/// Options passed to [`FileSystem::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpenOptions {
    mode: OpenMode,
    access: Access,
    share: Share,
}

impl OpenOptions {
    /// Creates options with the given mode and access and read sharing.
    pub fn new(mode: OpenMode, access: Access) -> Self {
        Self {
            mode,
            access,
            share: Share::default(),
        }
    }

    /// Open an existing file for reading.
    pub fn read() -> Self {
        Self::new(OpenMode::Open, Access::Read)
    }

    /// Create or truncate a file for writing.
    pub fn truncate() -> Self {
        Self::new(OpenMode::Create, Access::Write).with_share(Share::None)
    }

    /// Open or create a file for appending.
    pub fn append() -> Self {
        Self::new(OpenMode::Append, Access::Write)
    }

    /// Sets the sharing request.
    pub fn with_share(mut self, share: Share) -> Self {
        self.share = share;
        self
    }

    /// Returns the open mode.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Returns the requested access.
    pub fn access(&self) -> Access {
        self.access
    }

    /// Returns the sharing request.
    pub fn share(&self) -> Share {
        self.share
    }

    /// Returns `(read, write, append, truncate, create)` flags for this request.
    fn flags(&self) -> (bool, bool, bool, bool, bool) {
        let read = matches!(self.access, Access::Read | Access::ReadWrite);
        let write = matches!(self.access, Access::Write | Access::ReadWrite);
        match self.mode {
            OpenMode::Open => (read, write, false, false, false),
            OpenMode::Create => (read, write, false, true, true),
            OpenMode::Append => (read, false, true, false, true),
            OpenMode::OpenOrCreate => (read, write, false, false, true),
        }
    }

    fn to_std(self) -> std::fs::OpenOptions {
        let (read, write, append, truncate, create) = self.flags();
        let mut options = std::fs::OpenOptions::new();
        options
            .read(read)
            .write(write)
            .append(append)
            .truncate(truncate)
            .create(create);
        options
    }
}

/// An open file owned by a single operation.
///
/// Closing is dropping. `length` returns `None` when the size is unknown,
/// e.g. for pipes or character devices.
pub trait FileHandle: Read + Write {
    /// Returns the advertised length of the file, if it has one.
    fn length(&mut self) -> io::Result<Option<u64>>;
}

impl FileHandle for File {
    fn length(&mut self) -> io::Result<Option<u64>> {
        let metadata = self.metadata()?;
        Ok(metadata.is_file().then(|| metadata.len()))
    }
}

/// Opens files for blocking transfers.
pub trait FileSystem {
    /// The handle type produced by [`FileSystem::open`].
    type Handle: FileHandle;

    /// Opens `path`. Errors are propagated to the caller unchanged.
    fn open(&self, path: &Path, options: &OpenOptions) -> io::Result<Self::Handle>;
}

impl<T: FileSystem + ?Sized> FileSystem for &T {
    type Handle = T::Handle;

    fn open(&self, path: &Path, options: &OpenOptions) -> io::Result<Self::Handle> {
        (**self).open(path, options)
    }
}

/// The operating system's file system.
///
/// With the `async-io` feature it implements both [`FileSystem`] and
/// [`AsyncFileSystem`], so a bare `OsFileSystem.open(..)` call is ambiguous.
/// Name the trait instead:
///
/// ```no_run
/// use wholefile::{FileSystem, OpenOptions, OsFileSystem};
///
/// let _file = FileSystem::open(&OsFileSystem, "data.bin".as_ref(), &OpenOptions::read())?;
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    type Handle = File;

    fn open(&self, path: &Path, options: &OpenOptions) -> io::Result<File> {
        options.to_std().open(path)
    }
}
