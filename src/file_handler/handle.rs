//! Open file handles with optional compression on top.

use crate::error::{Result, StagehandError};
use crate::file_handler::compression::CompressionType;
use crate::file_handler::mode::{AccessKind, AccessMode};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Byte stream over a local file.
///
/// Read handles implement [`Read`], write and append handles implement
/// [`Write`]; the other direction fails with [`io::ErrorKind::Unsupported`].
/// Call [`FileHandle::close`] to finish a compressed stream and surface
/// flush errors. Dropping the handle closes it too, but errors are lost.
pub struct FileHandle {
    stream: Stream,
    path: PathBuf,
    mode: AccessMode,
    compression: CompressionType,
}

enum Stream {
    PlainReader(BufReader<File>),
    PlainWriter(BufWriter<File>),
    GzipReader(MultiGzDecoder<BufReader<File>>),
    GzipWriter(GzEncoder<BufWriter<File>>),
    ZstdReader(zstd::Decoder<'static, BufReader<File>>),
    ZstdWriter(zstd::Encoder<'static, BufWriter<File>>),
}

/// Open `path` in `mode`, layering a codec chosen from the file name.
///
/// Read mode requires the file to exist. Write mode truncates or creates it;
/// append mode creates it if missing. Appending to a compressed file adds a
/// new frame, which readers decode as one continuous stream.
pub fn open(path: &Path, mode: AccessMode) -> Result<FileHandle> {
    let compression = CompressionType::from_path(path);
    let file = match mode.kind() {
        AccessKind::Read => File::open(path),
        AccessKind::Write => File::create(path),
        AccessKind::Append => OpenOptions::new().append(true).create(true).open(path),
    }
    .map_err(|e| {
        StagehandError::file_error(
            format!("Failed to open {} in mode {}", path.display(), mode),
            e,
        )
    })?;

    let stream = match (mode.kind(), compression) {
        (AccessKind::Read, CompressionType::None) => Stream::PlainReader(BufReader::new(file)),
        (AccessKind::Read, CompressionType::Gzip) => {
            Stream::GzipReader(MultiGzDecoder::new(BufReader::new(file)))
        }
        (AccessKind::Read, CompressionType::Zstd) => Stream::ZstdReader(
            zstd::Decoder::new(file)
                .map_err(|e| StagehandError::file_error("Failed to start zstd decoder", e))?,
        ),
        (_, CompressionType::None) => Stream::PlainWriter(BufWriter::new(file)),
        (_, CompressionType::Gzip) => Stream::GzipWriter(GzEncoder::new(
            BufWriter::new(file),
            Compression::default(),
        )),
        (_, CompressionType::Zstd) => Stream::ZstdWriter(
            zstd::Encoder::new(BufWriter::new(file), 0)
                .map_err(|e| StagehandError::file_error("Failed to start zstd encoder", e))?,
        ),
    };

    Ok(FileHandle {
        stream,
        path: path.to_path_buf(),
        mode,
        compression,
    })
}

impl FileHandle {
    /// Local path backing this handle
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    /// Finish any compressed frame and flush everything to disk
    pub fn close(self) -> Result<()> {
        let flushed = match self.stream {
            Stream::PlainReader(_) | Stream::GzipReader(_) | Stream::ZstdReader(_) => Ok(()),
            Stream::PlainWriter(writer) => writer
                .into_inner()
                .map(drop)
                .map_err(|e| e.into_error()),
            Stream::GzipWriter(encoder) => encoder.finish().and_then(|mut w| w.flush()),
            Stream::ZstdWriter(encoder) => encoder.finish().and_then(|mut w| w.flush()),
        };
        flushed.map_err(|e| {
            StagehandError::file_error(format!("Failed to close {}", self.path.display()), e)
        })
    }
}

fn wrong_direction(action: &str, mode: AccessMode) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot {action} a handle opened in mode {mode}"),
    )
}

impl Read for FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.stream {
            Stream::PlainReader(reader) => reader.read(buf),
            Stream::GzipReader(reader) => reader.read(buf),
            Stream::ZstdReader(reader) => reader.read(buf),
            _ => Err(wrong_direction("read from", self.mode)),
        }
    }
}

impl Write for FileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.stream {
            Stream::PlainWriter(writer) => writer.write(buf),
            Stream::GzipWriter(writer) => writer.write(buf),
            Stream::ZstdWriter(writer) => writer.write(buf),
            _ => Err(wrong_direction("write to", self.mode)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.stream {
            Stream::PlainWriter(writer) => writer.flush(),
            Stream::GzipWriter(writer) => writer.flush(),
            Stream::ZstdWriter(writer) => writer.flush(),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("compression", &self.compression)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_with(path: &Path, mode: &str, content: &[u8]) {
        let mut handle = open(path, AccessMode::parse(mode).unwrap()).unwrap();
        handle.write_all(content).unwrap();
        handle.close().unwrap();
    }

    fn read_all(path: &Path) -> Vec<u8> {
        let mut handle = open(path, AccessMode::READ).unwrap();
        let mut content = Vec::new();
        handle.read_to_end(&mut content).unwrap();
        content
    }

    #[test]
    fn test_plain_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.txt");

        write_with(&path, "w", b"hello");
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert_eq!(read_all(&path), b"hello");
    }

    #[test]
    fn test_gzip_is_transparent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt.gz");

        write_with(&path, "wt", b"compressed line\n");
        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        assert_eq!(read_all(&path), b"compressed line\n");
    }

    #[test]
    fn test_gzip_append_reads_as_one_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.gz");

        write_with(&path, "wb", b"first\n");
        write_with(&path, "ab", b"second\n");
        assert_eq!(read_all(&path), b"first\nsecond\n");
    }

    #[test]
    fn test_zstd_append_reads_as_one_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.zst");

        write_with(&path, "w", b"one ");
        write_with(&path, "a", b"two");
        assert_eq!(read_all(&path), b"one two");
    }

    #[test]
    fn test_append_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.txt");

        write_with(&path, "at", b"x");
        assert_eq!(std::fs::read(&path).unwrap(), b"x");
    }

    #[test]
    fn test_read_missing_file_is_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = open(&dir.path().join("absent.txt"), AccessMode::READ);
        assert!(matches!(result, Err(StagehandError::FileError { .. })));
    }

    #[test]
    fn test_wrong_direction_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        write_with(&path, "w", b"abc");

        let mut reader = open(&path, AccessMode::READ).unwrap();
        let err = reader.write(b"nope").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
