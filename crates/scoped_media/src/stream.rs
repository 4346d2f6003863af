//! Native byte streams over files and memory

use std::path::Path;

use crate::context::Context;
use crate::error::{self, MediaError, MediaResult};
use crate::handle::StreamHandle;
use crate::platform::StreamId;

/// Reference point for [`Stream::seek`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekWhence {
    /// From the start of the stream
    Set,
    /// From the current position
    Current,
    /// From the end of the stream
    End,
}

impl SeekWhence {
    /// Native whence value
    pub const fn to_raw(self) -> i32 {
        match self {
            Self::Set => 0,
            Self::Current => 1,
            Self::End => 2,
        }
    }
}

/// Open a file with a C `fopen`-style mode such as `"rb"` or `"w+"`
pub fn rw_from_file<P: AsRef<Path>>(context: &Context, path: P, mode: &str) -> MediaResult<StreamHandle> {
    let path = path.as_ref();
    let platform = context.platform();
    let raw = error::non_null(platform, platform.stream_from_file(path, mode), MediaError::StreamOpen)?;
    log::debug!("Opened stream {} ({mode})", path.display());
    Ok(StreamHandle::adopt(context, raw))
}

/// Open a read/write stream over an owned buffer
pub fn rw_from_memory(context: &Context, data: Vec<u8>) -> MediaResult<StreamHandle> {
    let platform = context.platform();
    let raw = error::non_null(platform, platform.stream_from_memory(data), MediaError::StreamOpen)?;
    Ok(StreamHandle::adopt(context, raw))
}

/// Stream accessor
///
/// # Panics
/// All methods except [`Stream::close`] panic if the stream was closed.
#[derive(Debug, Default)]
pub struct Stream {
    handle: StreamHandle,
}

impl Stream {
    /// Open a file stream
    pub fn open<P: AsRef<Path>>(context: &Context, path: P, mode: &str) -> MediaResult<Self> {
        rw_from_file(context, path, mode).map(Self::from_handle)
    }

    /// Open a memory stream
    pub fn from_memory(context: &Context, data: Vec<u8>) -> MediaResult<Self> {
        rw_from_memory(context, data).map(Self::from_handle)
    }

    /// Wrap an owned handle
    pub const fn from_handle(handle: StreamHandle) -> Self {
        Self { handle }
    }

    /// The owned handle
    pub const fn handle(&self) -> &StreamHandle {
        &self.handle
    }

    /// Unwrap into the owned handle
    pub fn into_handle(self) -> StreamHandle {
        self.handle
    }

    /// Raw reference for borrowing
    pub fn raw(&self) -> Option<StreamId> {
        self.handle.as_raw()
    }

    /// Read up to `maxnum` objects of `size` bytes into `data`
    ///
    /// Returns the number of whole objects read. Reading nothing, including at
    /// end of stream, is reported as [`MediaError::StreamRead`].
    pub fn read(&self, size: usize, maxnum: usize, data: &mut [u8]) -> MediaResult<usize> {
        let (platform, raw) = self.handle.borrow();
        let count = platform.stream_read(raw, data, size, maxnum);
        error::non_zero(platform, count, MediaError::StreamRead)
    }

    /// Write `n` objects of `size` bytes from `data`
    pub fn write(&self, data: &[u8], size: usize, n: usize) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        if platform.stream_write(raw, data, size, n) < n {
            return Err(MediaError::StreamWrite(platform.last_error()));
        }
        Ok(())
    }

    /// Move the stream position; returns the new absolute offset
    pub fn seek(&self, offset: i64, whence: SeekWhence) -> MediaResult<i64> {
        let (platform, raw) = self.handle.borrow();
        let position = platform.stream_seek(raw, offset, whence.to_raw());
        error::non_negative_offset(platform, position, MediaError::StreamSeek)
    }

    /// Current absolute offset
    pub fn tell(&self) -> MediaResult<i64> {
        self.seek(0, SeekWhence::Current)
    }

    /// Total stream size in bytes
    pub fn size(&self) -> MediaResult<i64> {
        let (platform, raw) = self.handle.borrow();
        error::non_negative_offset(platform, platform.stream_size(raw), MediaError::StreamSeek)
    }

    /// Close the stream now; a no-op if already closed
    pub fn close(&mut self) {
        self.handle.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InitFlags;

    fn context() -> Context {
        Context::headless(InitFlags::EVENTS).expect("init")
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("scoped_media_{}_{name}", std::process::id()))
    }

    #[test]
    fn test_memory_read_counts_whole_objects() {
        let context = context();
        let stream = Stream::from_memory(&context, b"abcdefg".to_vec()).expect("stream");
        let mut buffer = [0_u8; 8];

        assert_eq!(stream.read(2, 4, &mut buffer), Ok(3));
        assert_eq!(&buffer[..6], b"abcdef");
        assert_eq!(stream.tell(), Ok(7));

        let error = stream.read(1, 1, &mut buffer).expect_err("end of stream");
        assert!(matches!(error, MediaError::StreamRead(_)));
    }

    #[test]
    fn test_seek_and_size() {
        let context = context();
        let stream = Stream::from_memory(&context, vec![0; 10]).expect("stream");

        assert_eq!(stream.size(), Ok(10));
        assert_eq!(stream.seek(-3, SeekWhence::End), Ok(7));
        assert_eq!(stream.seek(1, SeekWhence::Current), Ok(8));
        assert_eq!(stream.seek(2, SeekWhence::Set), Ok(2));

        let error = stream.seek(-5, SeekWhence::Set).expect_err("before start");
        assert!(matches!(error, MediaError::StreamSeek(_)));
    }

    #[test]
    fn test_file_write_then_read() {
        let context = context();
        let path = temp_path("stream.bin");
        {
            let mut writer = Stream::open(&context, &path, "wb").expect("open for write");
            writer.write(b"0123456789", 5, 2).expect("write");
            writer.close();
            writer.close();
        }

        let reader = Stream::open(&context, &path, "rb").expect("open for read");
        let mut buffer = [0_u8; 10];
        assert_eq!(reader.read(1, 10, &mut buffer), Ok(10));
        assert_eq!(&buffer, b"0123456789");

        let error = reader.write(b"x", 1, 1).expect_err("read-only");
        assert!(matches!(error, MediaError::StreamWrite(_)));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_short_write_reports_message() {
        let context = context();
        let stream = Stream::from_memory(&context, Vec::new()).expect("stream");
        context.clear_error();

        let error = stream.write(b"abc", 1, 5).expect_err("short buffer");
        assert!(matches!(error, MediaError::StreamWrite(_)));
        assert!(!error.message().is_empty());
        assert_eq!(error.message(), context.last_error());
        assert_eq!(stream.size(), Ok(0));
    }

    #[test]
    fn test_open_missing_file_fails() {
        let context = context();
        let error = Stream::open(&context, "/no/such/dir/file", "rb").expect_err("missing");
        assert!(matches!(error, MediaError::StreamOpen(_)));
        assert!(error.message().starts_with("Couldn't open"));
    }

    #[test]
    fn test_invalid_mode_fails() {
        let context = context();
        let error = Stream::open(&context, temp_path("mode"), "q").expect_err("bad mode");
        assert!(matches!(error, MediaError::StreamOpen(_)));
    }
}
