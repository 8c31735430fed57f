//! Sequential stream wrapper that adds or strips the compression header.
//!
//! The compress direction buffers everything written to it and emits
//! `[magic][length][payload]` on [`CompressionStream::finish`], because the
//! header carries the total uncompressed length. The decompress direction
//! parses the header at construction and decodes the payload on first read.

use crate::compression::{
    compress_payload, decompress_payload, CompressionType, StreamConfiguration, StreamHeader,
};
use crate::error::{CompressionError, Result};

use std::io::{self, Read, Seek, SeekFrom, Write};
use tracing::{debug, warn};

/// Which way data flows through a [`CompressionStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Compress,
    Decompress,
}

/// A `Read`/`Write` wrapper over a headed compression stream.
pub struct CompressionStream<S> {
    stream: S,
    mode: StreamMode,
    compression: CompressionType,
    config: StreamConfiguration,
    /// Compress: pending input. Decompress: decoded output.
    buffer: Vec<u8>,
    position: usize,
    /// Decompress: length from the header.
    declared_size: Option<usize>,
    finished: bool,
}

impl<S> CompressionStream<S> {
    /// Wrap `stream` for writing `compression` data.
    pub fn compress(stream: S, compression: CompressionType) -> Result<Self> {
        Self::compress_with(stream, compression, StreamConfiguration::default())
    }

    /// [`CompressionStream::compress`] with explicit settings.
    pub fn compress_with(
        stream: S,
        compression: CompressionType,
        config: StreamConfiguration,
    ) -> Result<Self> {
        compression.validate()?;
        Ok(Self {
            stream,
            mode: StreamMode::Compress,
            compression,
            config,
            buffer: Vec::new(),
            position: 0,
            declared_size: None,
            finished: false,
        })
    }

    /// Format of the wrapped stream.
    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    pub fn can_read(&self) -> bool {
        self.mode == StreamMode::Decompress
    }

    pub fn can_write(&self) -> bool {
        self.mode == StreamMode::Compress && !self.finished
    }

    /// Compression streams are strictly sequential.
    pub fn can_seek(&self) -> bool {
        false
    }

    /// Get a reference to the inner stream.
    pub fn inner(&self) -> &S {
        &self.stream
    }

    /// Get a mutable reference to the inner stream.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Consume the wrapper and return the inner stream.
    ///
    /// Pending compressed output is discarded; use [`CompressionStream::finish`]
    /// to write it.
    pub fn into_inner(self) -> S {
        if self.mode == StreamMode::Compress && !self.finished && !self.buffer.is_empty() {
            warn!(
                pending = self.buffer.len(),
                "compression stream released without finish; output discarded"
            );
        }
        self.stream
    }
}

impl<R: Read> CompressionStream<R> {
    /// Wrap `stream` for reading; the header is parsed immediately.
    pub fn decompress(stream: R) -> Result<Self> {
        Self::decompress_with(stream, StreamConfiguration::default())
    }

    /// [`CompressionStream::decompress`] with explicit settings.
    pub fn decompress_with(mut stream: R, config: StreamConfiguration) -> Result<Self> {
        let header = StreamHeader::read(&mut stream)?;
        if !header.compression.is_implemented() {
            return Err(CompressionError::NotImplemented(format!(
                "{} compression",
                header.compression
            )));
        }
        let declared = header.uncompressed_size as usize;
        if declared > config.max_uncompressed_size {
            return Err(CompressionError::CapacityExceeded {
                limit: config.max_uncompressed_size,
                requested: declared,
            });
        }
        debug!(compression = %header.compression, size = declared, "opened compressed stream");
        Ok(Self {
            stream,
            mode: StreamMode::Decompress,
            compression: header.compression,
            config,
            buffer: Vec::new(),
            position: 0,
            declared_size: Some(declared),
            finished: false,
        })
    }

    /// Uncompressed length announced by the header.
    pub fn uncompressed_size(&self) -> Option<usize> {
        self.declared_size
    }

    fn fill(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let size = self.declared_size.unwrap_or(0);
        let limit = self.config.payload_limit(size);
        let mut payload = Vec::new();
        (&mut self.stream)
            .take(limit as u64)
            .read_to_end(&mut payload)?;
        self.buffer = decompress_payload(&payload, self.compression, size, &self.config)?;
        self.position = 0;
        self.finished = true;
        Ok(())
    }
}

impl<W: Write> CompressionStream<W> {
    /// Compress everything written so far, write header and payload, and
    /// return the inner stream.
    pub fn finish(mut self) -> Result<W> {
        if self.mode != StreamMode::Compress {
            return Err(CompressionError::Compression(
                "finish called on a decompressing stream".into(),
            ));
        }
        self.write_out()?;
        Ok(self.into_inner())
    }

    fn write_out(&mut self) -> Result<()> {
        let input = std::mem::take(&mut self.buffer);
        self.finished = true;

        let payload = compress_payload(&input, self.compression, &self.config)?;
        if self.compression != CompressionType::None {
            StreamHeader::new(self.compression, input.len())?.write(&mut self.stream)?;
        }
        self.stream.write_all(&payload)?;
        self.stream.flush()?;
        debug!(
            compression = %self.compression,
            input = input.len(),
            output = payload.len(),
            "finished compressed stream"
        );
        Ok(())
    }
}

impl<R: Read> Read for CompressionStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.mode != StreamMode::Decompress {
            return Err(unsupported("stream is open for compression"));
        }
        self.fill()?;
        let available = &self.buffer[self.position..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n;
        Ok(n)
    }
}

impl<W: Write> Write for CompressionStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.can_write() {
            return Err(unsupported("stream is not open for compression"));
        }
        let limit = self.config.max_uncompressed_size;
        if self.buffer.len() + buf.len() > limit {
            return Err(CompressionError::CapacityExceeded {
                limit,
                requested: self.buffer.len() + buf.len(),
            }
            .into());
        }
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    /// Flushes the inner stream only; the payload is written by `finish`.
    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl<S> Seek for CompressionStream<S> {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(unsupported("compression streams cannot seek"))
    }
}

fn unsupported(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, message.to_string())
}
