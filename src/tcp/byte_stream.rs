use std::collections::VecDeque;
use std::io;
use std::io::{Read, Write};

/// A flow-controlled in-memory byte stream.
///
/// The writer pushes bytes in at one end and the reader drains them from the
/// other; at most `capacity` bytes sit in the buffer at any time. Writes never
/// block and never fail: whatever does not fit is truncated and the caller
/// sees a short count.
#[derive(Debug)]
pub struct ByteStream {
    buffer: VecDeque<u8>,
    capacity: usize,
    input_ended: bool,
    error: bool,
    bytes_written: u64,
    bytes_read: u64,
}

impl ByteStream {
    pub fn new(capacity: usize) -> Self {
        ByteStream {
            buffer: VecDeque::new(),
            capacity,
            input_ended: false,
            error: false,
            bytes_written: 0,
            bytes_read: 0,
        }
    }

    /// Push bytes into the stream, up to the remaining capacity.
    /// Returns how many bytes were accepted.
    pub fn write(&mut self, data: &[u8]) -> usize {
        if self.input_ended || self.error {
            return 0;
        }
        let to_write = data.len().min(self.remaining_capacity());
        self.buffer.extend(&data[..to_write]);
        self.bytes_written += to_write as u64;
        to_write
    }

    /// Copy up to `len` bytes from the front of the stream without consuming them.
    pub fn peek(&self, len: usize) -> Vec<u8> {
        let to_peek = len.min(self.buffer.len());
        self.buffer.iter().take(to_peek).copied().collect()
    }

    /// Discard up to `len` bytes from the front of the stream.
    pub fn pop(&mut self, len: usize) {
        let to_pop = len.min(self.buffer.len());
        self.buffer.drain(..to_pop);
        self.bytes_read += to_pop as u64;
    }

    /// Peek and pop combined: consume and return up to `len` bytes.
    pub fn read(&mut self, len: usize) -> Vec<u8> {
        let to_read = len.min(self.buffer.len());
        self.bytes_read += to_read as u64;
        self.buffer.drain(..to_read).collect()
    }

    /// Signal that nothing more will ever be written.
    pub fn end_input(&mut self) {
        self.input_ended = true;
    }

    /// Latch the stream into a permanent error state.
    pub fn set_error(&mut self) {
        self.error = true;
    }

    pub fn input_ended(&self) -> bool {
        self.input_ended
    }

    pub fn error(&self) -> bool {
        self.error
    }

    /// The number of bytes currently buffered and not yet read.
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffer_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Input has ended and every written byte has been read out.
    pub fn eof(&self) -> bool {
        self.input_ended && self.buffer.is_empty()
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity - self.buffer.len()
    }
}

impl Read for ByteStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let drained = ByteStream::read(self, buf.len());
        buf[..drained.len()].copy_from_slice(&drained);
        Ok(drained.len())
    }
}

impl Write for ByteStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(ByteStream::write(self, buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// -- Unit tests --
