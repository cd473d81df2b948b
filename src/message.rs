//! Application payload carried by the queues.

use bytes::Bytes;
use std::ops::Deref;

/// One unit of application payload.
///
/// Inbound messages are exactly one received chunk; no framing is
/// interpreted. Cloning is cheap (reference counted).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Message(Bytes);

impl Message {
    /// Create a message that copies `data`.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Message(Bytes::copy_from_slice(data))
    }

    /// Payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the message, returning the underlying buffer.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl Deref for Message {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Bytes> for Message {
    fn from(bytes: Bytes) -> Self {
        Message(bytes)
    }
}

impl From<Vec<u8>> for Message {
    fn from(data: Vec<u8>) -> Self {
        Message(Bytes::from(data))
    }
}

impl From<&'static [u8]> for Message {
    fn from(data: &'static [u8]) -> Self {
        Message(Bytes::from_static(data))
    }
}

impl From<&'static str> for Message {
    fn from(data: &'static str) -> Self {
        Message(Bytes::from_static(data.as_bytes()))
    }
}
