//! In-memory transport for exercising the drivers without hardware
//!
//! `MockTransport` plays the firmware side of a connection: bytes written by
//! the host are split into lines, and each complete line can trigger a
//! scripted reply that becomes readable immediately.
//!
//! This is test support. It is public so the unit tests of crates layered on
//! top of the drivers (`kitcommander-kit`) can share it; nothing in the
//! command-line tool uses it.

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::Result;
use crate::transport::Transport;

type Responder = Box<dyn FnMut(&str) -> Option<Vec<u8>>>;

/// Scripted firmware peer for tests
pub struct MockTransport {
    rx: VecDeque<u8>,
    line: Vec<u8>,
    written: Vec<u8>,
    responders: Vec<Responder>,
    endless: Option<u8>,
    timeout: Duration,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a silent peer with a 50 ms read timeout
    pub fn new() -> Self {
        Self {
            rx: VecDeque::new(),
            line: Vec::new(),
            written: Vec::new(),
            responders: Vec::new(),
            endless: None,
            timeout: Duration::from_millis(50),
        }
    }

    /// Make `data` readable right away
    pub fn queue(&mut self, data: &[u8]) {
        self.rx.extend(data.iter().copied());
    }

    /// Reply with `response` every time the host sends `line`
    ///
    /// `line` is compared without its line terminator.
    pub fn respond(&mut self, line: &str, response: &[u8]) {
        let line = line.to_string();
        let response = response.to_vec();
        self.responders.push(Box::new(move |received: &str| {
            (received == line).then(|| response.clone())
        }));
    }

    /// Reply with whatever `responder` returns for a received line
    ///
    /// Responders are tried in registration order; the first one returning
    /// `Some` wins.
    pub fn respond_with<F>(&mut self, responder: F)
    where
        F: FnMut(&str) -> Option<Vec<u8>> + 'static,
    {
        self.responders.push(Box::new(responder));
    }

    /// Answer `MC+PING=<n>` with `MC+PONG=<n>` and `OK`
    pub fn answer_pings(&mut self) {
        self.respond_with(|line| {
            line.strip_prefix("MC+PING=")
                .map(|seq| format!("MC+PONG={}\r\nOK\r\n", seq).into_bytes())
        });
    }

    /// Once the queued data is consumed, keep producing `byte` forever
    pub fn stream_forever(&mut self, byte: u8) {
        self.endless = Some(byte);
    }

    /// Everything the host has written so far
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Lines the host has written, terminators stripped
    pub fn sent_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.written)
            .split('\n')
            .filter(|l| !l.is_empty())
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect()
    }

    fn handle_line(&mut self) {
        let raw = std::mem::take(&mut self.line);
        let text = String::from_utf8_lossy(&raw);
        let line = text.trim_end_matches(['\r', '\n']);

        for responder in self.responders.iter_mut() {
            if let Some(reply) = responder(line) {
                self.rx.extend(reply);
                return;
            }
        }
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.written.extend_from_slice(data);
        for &b in data {
            self.line.push(b);
            if b == b'\n' {
                self.handle_line();
            }
        }
        Ok(())
    }

    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.rx.is_empty() {
            if let Some(byte) = self.endless {
                buf.fill(byte);
                return Ok(buf.len());
            }
            // Stand in for the port blocking until its timeout
            std::thread::sleep(Duration::from_millis(1));
            return Ok(0);
        }

        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        Ok(self.rx.len())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_scripted_reply() {
        let mut mock = MockTransport::new();
        mock.respond("MC+VERSION=FIRMWARE", b"0.4.9\r\nOK\r\n");

        mock.write(b"MC+VERSION=FIRMWARE\r\n").unwrap();
        assert_eq!(mock.read_until(b"\r\n").unwrap(), b"0.4.9\r\n");
        assert_eq!(mock.read_until(b"\r\n").unwrap(), b"OK\r\n");
        assert_eq!(mock.sent_lines(), vec!["MC+VERSION=FIRMWARE"]);
    }

    #[test]
    fn test_read_until_times_out_on_endless_stream() {
        let mut mock = MockTransport::new();
        mock.stream_forever(b'x');
        mock.set_timeout(Duration::from_millis(20)).unwrap();

        let start = Instant::now();
        let data = mock.read_until(b"\r\n").unwrap();
        assert!(!data.is_empty());
        assert!(!data.ends_with(b"\r\n"));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_drain() {
        let mut mock = MockTransport::new();
        mock.queue(b"garbage");
        assert_eq!(mock.drain().unwrap(), b"garbage");
        assert_eq!(mock.bytes_available().unwrap(), 0);
    }
}
