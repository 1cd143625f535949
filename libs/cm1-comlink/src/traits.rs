//! Core Communication Traits
//!
//! The poll controller talks to the station only through [`Transport`]. The
//! Modbus-RTU adapter, the in-memory simulator and test doubles all implement
//! it.

use async_trait::async_trait;

use crate::error::Result;
use crate::window::RegisterWindow;

/// Holding-register transport for a single station
///
/// Methods take `&mut self`: a serial link is half duplex, so one owner issues
/// one request at a time and awaits its response before the next.
#[async_trait]
pub trait Transport: Send {
    /// Read `count` holding registers starting at `start_address`
    ///
    /// Implementations must return a window of exactly `count` words, or an
    /// error (see [`RegisterWindow::from_response`]).
    async fn read_registers(&mut self, start_address: u16, count: u16) -> Result<RegisterWindow>;

    /// Write `words` to consecutive holding registers starting at `start_address`
    async fn write_registers(&mut self, start_address: u16, words: &[u16]) -> Result<()>;

    /// Short name for log lines
    fn name(&self) -> &str {
        "transport"
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn read_registers(&mut self, start_address: u16, count: u16) -> Result<RegisterWindow> {
        (**self).read_registers(start_address, count).await
    }

    async fn write_registers(&mut self, start_address: u16, words: &[u16]) -> Result<()> {
        (**self).write_registers(start_address, words).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    struct Fixed(Vec<u16>);

    #[async_trait]
    impl Transport for Fixed {
        async fn read_registers(&mut self, start: u16, count: u16) -> Result<RegisterWindow> {
            let words = self.0.iter().copied().take(usize::from(count)).collect();
            RegisterWindow::from_response(start, count, words)
        }

        async fn write_registers(&mut self, _start: u16, words: &[u16]) -> Result<()> {
            self.0 = words.to_vec();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_boxed_transport_delegates() {
        let mut transport: Box<dyn Transport> = Box::new(Fixed(vec![1, 2, 3]));
        let window = transport.read_registers(10, 3).await.unwrap();
        assert_eq!(window.words(), &[1, 2, 3]);

        transport.write_registers(10, &[9]).await.unwrap();
        let err = transport.read_registers(10, 3).await.unwrap_err();
        assert!(matches!(err, TransportError::ShortRead { actual: 1, .. }));
        assert_eq!(transport.name(), "transport");
    }
}
