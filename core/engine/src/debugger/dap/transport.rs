//! Transport layer for DAP communication
//!
//! This module provides different transport mechanisms for the DAP protocol.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};

/// A trait for transporting DAP messages
pub trait Transport: Read + Write {
    /// Reads a message from the transport
    fn read_message(&mut self) -> io::Result<String>;

    /// Writes a message to the transport
    fn write_message(&mut self, message: &str) -> io::Result<()>;

    /// A cheaply-cloneable handle onto this transport's write half, usable
    /// from another thread. The DAP session pumps engine events (`stopped`,
    /// `continued`, `output`, ...) onto this handle from a background
    /// thread while the main loop blocks reading the next client request on
    /// the same underlying stream.
    fn writer_handle(&self) -> Box<dyn MessageWriter>;
}

/// The write half of a [`Transport`], detached so it can be shared with a
/// background event-pumping thread without taking the reader hostage.
pub trait MessageWriter: Send {
    /// Frame and write one message.
    fn write_message(&mut self, message: &str) -> io::Result<()>;
}

fn write_framed<W: Write>(writer: &mut W, message: &str) -> io::Result<()> {
    write!(writer, "Content-Length: {}\r\n\r\n{}", message.len(), message)?;
    writer.flush()
}

/// Standard I/O transport (stdin/stdout)
pub struct StdioTransport {
    stdin: io::Stdin,
    stdout: io::Stdout,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            stdin: io::stdin(),
            stdout: io::stdout(),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Read for StdioTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stdin.read(buf)
    }
}

impl Write for StdioTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdout.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }
}

impl Transport for StdioTransport {
    fn read_message(&mut self) -> io::Result<String> {
        // Read Content-Length header
        let mut header = String::new();
        let mut buf = [0u8; 1];

        loop {
            self.stdin.read_exact(&mut buf)?;
            header.push(buf[0] as char);
            if header.ends_with("\r\n\r\n") {
                break;
            }
        }

        // Parse content length
        let content_length: usize = header
            .lines()
            .find(|line| line.starts_with("Content-Length:"))
            .and_then(|line| line.split(':').nth(1))
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Missing Content-Length"))?;

        // Read message body
        let mut body = vec![0u8; content_length];
        self.stdin.read_exact(&mut body)?;

        String::from_utf8(body).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn write_message(&mut self, message: &str) -> io::Result<()> {
        write_framed(&mut self.stdout, message)
    }

    fn writer_handle(&self) -> Box<dyn MessageWriter> {
        Box::new(StdioWriter(io::stdout()))
    }
}

/// `io::Stdout` is internally a shared handle guarded by its own lock, so
/// cloning one just means asking for another handle to the same stream.
struct StdioWriter(io::Stdout);

impl MessageWriter for StdioWriter {
    fn write_message(&mut self, message: &str) -> io::Result<()> {
        write_framed(&mut self.0, message)
    }
}

/// A loopback TCP transport: one client connection, framed the same way as
/// [`StdioTransport`]. The `--dap --port <n>` launch mode uses this instead
/// of stdio; `4711` is the conventional default DAP adapters bind to when
/// reachable over a socket instead of a spawned subprocess.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// The default loopback port.
    pub const DEFAULT_PORT: u16 = 4711;

    /// Bind `127.0.0.1:<port>` and block until exactly one client connects.
    pub fn listen(port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))?;
        let (stream, _addr) = listener.accept()?;
        Ok(Self { stream })
    }
}

impl Read for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Transport for TcpTransport {
    fn read_message(&mut self) -> io::Result<String> {
        let mut header = String::new();
        let mut buf = [0u8; 1];
        loop {
            self.stream.read_exact(&mut buf)?;
            header.push(buf[0] as char);
            if header.ends_with("\r\n\r\n") {
                break;
            }
        }

        let content_length: usize = header
            .lines()
            .find(|line| line.starts_with("Content-Length:"))
            .and_then(|line| line.split(':').nth(1))
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Missing Content-Length"))?;

        let mut body = vec![0u8; content_length];
        self.stream.read_exact(&mut body)?;
        String::from_utf8(body).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn write_message(&mut self, message: &str) -> io::Result<()> {
        write_framed(&mut self.stream, message)
    }

    fn writer_handle(&self) -> Box<dyn MessageWriter> {
        Box::new(TcpWriter(
            self.stream
                .try_clone()
                .expect("TCP stream handle can always be duplicated"),
        ))
    }
}

struct TcpWriter(TcpStream);

impl MessageWriter for TcpWriter {
    fn write_message(&mut self, message: &str) -> io::Result<()> {
        write_framed(&mut self.0, message)
    }
}
