//! IPC transports (component I): sockets and local files the rule engine's
//! `write`/`socket`/`server_socket` actions target, plus the framing modes
//! used to split a byte stream into discrete `receive` selector firings.

pub mod file;
pub mod framing;
pub mod socket;

pub use framing::Framing;

/// The two socket transports `socket()`/`server_socket()` can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
}

/// A named, writable endpoint registered on an [`crate::instance::Instance`]
/// under a rule-facing `fd` string (`write(fd, data)`, `close(fd)`).
pub trait FileDescriptor: Send + Sync {
    fn write(&self, data: &[u8]) -> Result<(), crate::Error>;
    fn close(&self);
}

/// How often a reader thread polls its underlying transport for new data.
/// Matches the original poller's coarse tick — this is firing `receive`
/// rules, not a hot path.
pub const READER_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);
