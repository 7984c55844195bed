use std::{
    io::{self, ErrorKind, Read, Write},
    string::FromUtf8Error,
};

use log::trace;
use thiserror::Error;

use super::Message;

/// Size of a single read from the underlying stream. Lines longer than this
/// are assembled from several reads.
pub const READ_CHUNK_SIZE: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed by peer")]
    Closed,
    #[error("received message is not valid UTF-8: {0}")]
    Encoding(#[from] FromUtf8Error),
    #[error("refusing to send message containing a newline: {0:?}")]
    EmbeddedNewline(String),
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
}

/// Newline-delimited framing over a bidirectional byte stream.
pub struct ProtocolTransport<T: Read + Write> {
    stream: T,
    buffer: Vec<u8>,
}

impl<T: Read + Write> ProtocolTransport<T> {
    pub fn new(stream: T) -> Self {
        Self {
            stream,
            buffer: Vec::with_capacity(READ_CHUNK_SIZE),
        }
    }

    /// Reads the next line, without its terminating `\n` (or `\r\n`).
    ///
    /// Bytes received after the newline are kept for the following call.
    pub fn read_line(&mut self) -> Result<String, TransportError> {
        let mut chunk = vec![0; READ_CHUNK_SIZE];
        let mut scanned = 0;

        loop {
            if let Some(pos) = self.buffer[scanned..].iter().position(|&b| b == b'\n') {
                let end = scanned + pos;
                let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(String::from_utf8(line)?);
            }
            scanned = self.buffer.len();

            let n = match self.stream.read(&mut chunk) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            trace!("read {n} bytes, {} buffered", self.buffer.len() + n);
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Writes `message` followed by a single newline and flushes the stream.
    pub fn write_message(&mut self, message: &Message) -> Result<(), TransportError> {
        let mut line = message.to_string();
        if line.contains('\n') {
            return Err(TransportError::EmbeddedNewline(line));
        }

        line.push('\n');
        self.stream.write_all(line.as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> T {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Seek};

    use super::*;
    use crate::protocol::Tag;

    /// Hands out its input at most `chunk` bytes per read.
    struct Chunked {
        input: Cursor<Vec<u8>>,
        chunk: usize,
    }

    impl Chunked {
        fn new(input: &[u8], chunk: usize) -> Self {
            Self {
                input: Cursor::new(input.to_vec()),
                chunk,
            }
        }
    }

    impl Read for Chunked {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(self.chunk);
            self.input.read(&mut buf[..len])
        }
    }

    impl Write for Chunked {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_message_appends_one_newline() {
        let mut transport = ProtocolTransport::new(Cursor::new(Vec::new()));

        transport.write_message(&Message::hello("abc")).unwrap();
        let written = transport.into_inner().into_inner();
        assert_eq!(written, b"cs5700spring2022 HELLO abc\n");
    }

    #[test]
    fn write_then_read_line() {
        let mut transport = ProtocolTransport::new(Cursor::new(Vec::new()));

        transport.write_message(&Message::division_error()).unwrap();
        transport.stream.seek(std::io::SeekFrom::Start(0)).unwrap();
        let line = transport.read_line().unwrap();
        let message: Message = line.as_str().try_into().unwrap();
        assert_eq!(message.tag, Tag::Err);
    }

    #[test]
    fn write_message_rejects_embedded_newline() {
        let mut transport = ProtocolTransport::new(Cursor::new(Vec::new()));

        let res = transport.write_message(&Message::hello("abc\ndef"));
        assert!(matches!(res, Err(TransportError::EmbeddedNewline(_))));
        assert!(transport.into_inner().into_inner().is_empty());
    }

    #[test]
    fn read_line_across_chunk_boundaries() {
        let input = b"cs5700spring2022 EVAL ( ( 3 + 4 ) * 2 )\n";
        let expected = "cs5700spring2022 EVAL ( ( 3 + 4 ) * 2 )";

        for chunk in [1, 2, 3, 7, 16, input.len(), READ_CHUNK_SIZE] {
            let mut transport = ProtocolTransport::new(Chunked::new(input, chunk));
            assert_eq!(transport.read_line().unwrap(), expected, "chunk {chunk}");
        }
    }

    #[test]
    fn read_line_keeps_following_lines() {
        let input = b"first\nsecond\r\nthird\n";
        let mut transport = ProtocolTransport::new(Chunked::new(input, READ_CHUNK_SIZE));

        assert_eq!(transport.read_line().unwrap(), "first");
        assert_eq!(transport.read_line().unwrap(), "second");
        assert_eq!(transport.read_line().unwrap(), "third");
        assert!(matches!(transport.read_line(), Err(TransportError::Closed)));
    }

    #[test]
    fn read_line_longer_than_chunk() {
        let mut input = "x".repeat(READ_CHUNK_SIZE * 3 + 5).into_bytes();
        input.push(b'\n');
        let mut transport = ProtocolTransport::new(Chunked::new(&input, READ_CHUNK_SIZE));

        assert_eq!(transport.read_line().unwrap().len(), READ_CHUNK_SIZE * 3 + 5);
    }

    #[test]
    fn read_line_partial_at_eof() {
        let mut transport = ProtocolTransport::new(Chunked::new(b"no newline", 4));

        assert!(matches!(transport.read_line(), Err(TransportError::Closed)));
    }

    #[test]
    fn read_line_invalid_utf8() {
        let mut transport = ProtocolTransport::new(Chunked::new(b"\xff\xfe\n", 1));

        assert!(matches!(
            transport.read_line(),
            Err(TransportError::Encoding(_))
        ));
    }
}
