//! Trait abstraction for serial port writes to enable testing

use async_trait::async_trait;
use std::io;

/// Trait for the outbound half of the receiver UART
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;
}

/// Wrapper around the write half of a `tokio_serial::SerialStream`
pub struct TokioSerialPort {
    port: tokio::io::WriteHalf<tokio_serial::SerialStream>,
}

impl TokioSerialPort {
    pub fn new(port: tokio::io::WriteHalf<tokio_serial::SerialStream>) -> Self {
        Self { port }
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }
}
