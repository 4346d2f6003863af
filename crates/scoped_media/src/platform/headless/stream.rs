//! File and memory byte streams for the headless platform

use std::fs::{File, OpenOptions};
use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Backing storage of an open stream
#[derive(Debug)]
pub(crate) enum StreamRecord {
    File { file: File, readable: bool, writable: bool },
    Memory(Cursor<Vec<u8>>),
}

/// Translate an `fopen` mode; the `b` flag is accepted and ignored
fn open_options(mode: &str) -> Option<(OpenOptions, bool, bool)> {
    let core: String = mode.chars().filter(|c| *c != 'b').collect();
    let mut options = OpenOptions::new();
    let (readable, writable) = match core.as_str() {
        "r" => {
            options.read(true);
            (true, false)
        }
        "r+" => {
            options.read(true).write(true);
            (true, true)
        }
        "w" => {
            options.write(true).create(true).truncate(true);
            (false, true)
        }
        "w+" => {
            options.read(true).write(true).create(true).truncate(true);
            (true, true)
        }
        "a" => {
            options.append(true).create(true);
            (false, true)
        }
        "a+" => {
            options.read(true).append(true).create(true);
            (true, true)
        }
        _ => return None,
    };
    Some((options, readable, writable))
}

impl StreamRecord {
    pub(crate) fn open(path: &Path, mode: &str) -> Result<Self, String> {
        let (options, readable, writable) =
            open_options(mode).ok_or_else(|| format!("Unknown file mode '{mode}'"))?;
        let file = options
            .open(path)
            .map_err(|error| format!("Couldn't open {}: {error}", path.display()))?;
        Ok(Self::File { file, readable, writable })
    }

    pub(crate) const fn memory(data: Vec<u8>) -> Self {
        Self::Memory(Cursor::new(data))
    }

    /// Fill `buffer` as far as possible; stops early only at end of stream
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, String> {
        let mut total = 0;
        while total < buffer.len() {
            let read = match self {
                Self::File { readable: false, .. } => return Err("Stream not opened for reading".to_string()),
                Self::File { file, .. } => file.read(&mut buffer[total..]),
                Self::Memory(cursor) => cursor.read(&mut buffer[total..]),
            };
            match read {
                Ok(0) => break,
                Ok(count) => total += count,
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => return Err(format!("Error reading from datastream: {error}")),
            }
        }
        Ok(total)
    }

    /// Read up to `maxnum` objects of `size` bytes; returns whole objects read
    ///
    /// A trailing partial object is consumed but not counted.
    pub(crate) fn read(&mut self, buffer: &mut [u8], size: usize, maxnum: usize) -> Result<usize, String> {
        if size == 0 || maxnum == 0 {
            return Err("Parameter 'size' is invalid".to_string());
        }
        let wanted = size.saturating_mul(maxnum).min(buffer.len());
        let bytes = self.read_bytes(&mut buffer[..wanted])?;
        let objects = bytes / size;
        if objects == 0 {
            return Err("End of stream reached".to_string());
        }
        Ok(objects)
    }

    /// Remaining bytes from the current position
    pub(crate) fn read_to_end(&mut self) -> Result<Vec<u8>, String> {
        let mut data = Vec::new();
        let result = match self {
            Self::File { readable: false, .. } => return Err("Stream not opened for reading".to_string()),
            Self::File { file, .. } => file.read_to_end(&mut data),
            Self::Memory(cursor) => cursor.read_to_end(&mut data),
        };
        result.map_err(|error| format!("Error reading from datastream: {error}"))?;
        Ok(data)
    }

    /// Write `num` objects of `size` bytes; returns whole objects written
    pub(crate) fn write(&mut self, data: &[u8], size: usize, num: usize) -> Result<usize, String> {
        if size == 0 || num == 0 {
            return Ok(0);
        }
        let length = size
            .checked_mul(num)
            .filter(|length| *length <= data.len())
            .ok_or_else(|| "Parameter 'data' is invalid".to_string())?;
        let result = match self {
            Self::File { writable: false, .. } => return Err("Error writing to datastream".to_string()),
            Self::File { file, .. } => file.write_all(&data[..length]),
            Self::Memory(cursor) => cursor.write_all(&data[..length]),
        };
        result.map_err(|error| format!("Error writing to datastream: {error}"))?;
        Ok(length / size)
    }

    pub(crate) fn seek(&mut self, offset: i64, whence: i32) -> Result<i64, String> {
        let target = match whence {
            0 => SeekFrom::Start(u64::try_from(offset).map_err(|_| "Error seeking in datastream".to_string())?),
            1 => SeekFrom::Current(offset),
            2 => SeekFrom::End(offset),
            _ => return Err("Unknown value for 'whence'".to_string()),
        };
        let position = match self {
            Self::File { file, .. } => file.seek(target),
            Self::Memory(cursor) => cursor.seek(target),
        };
        let position = position.map_err(|error| format!("Error seeking in datastream: {error}"))?;
        i64::try_from(position).map_err(|_| "Error seeking in datastream".to_string())
    }

    pub(crate) fn size(&self) -> Result<i64, String> {
        let length = match self {
            Self::File { file, .. } => file
                .metadata()
                .map_err(|error| format!("Error seeking in datastream: {error}"))?
                .len(),
            Self::Memory(cursor) => cursor.get_ref().len() as u64,
        };
        i64::try_from(length).map_err(|_| "Stream too large".to_string())
    }

    pub(crate) fn close(self) -> Result<(), String> {
        match self {
            Self::File { mut file, writable: true, .. } => {
                file.flush().map_err(|error| format!("Error writing to datastream: {error}"))
            }
            Self::File { .. } | Self::Memory(_) => Ok(()),
        }
    }
}
