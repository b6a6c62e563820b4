//! Request body buffer replayed on every attempt.

use axum::body::Body;
use bastion_types::ProxyError;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;

/// Inbound body, read once and handed byte-for-byte to each attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayBody {
    bytes: Bytes,
}

impl ReplayBody {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Buffer an inbound body, refusing anything over `limit_bytes`.
    ///
    /// Exceeding the limit is `PayloadTooLarge`; any other read failure
    /// (client abort, malformed chunked encoding) is `InvalidRequest`.
    pub async fn read(body: Body, limit_bytes: usize) -> Result<Self, ProxyError> {
        let mut stream = body.into_data_stream();
        let mut buffer = BytesMut::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ProxyError::InvalidRequest {
                message: format!("failed to read request body: {e}"),
            })?;
            if buffer.len().saturating_add(chunk.len()) > limit_bytes {
                return Err(ProxyError::PayloadTooLarge { limit_bytes });
            }
            buffer.extend_from_slice(&chunk);
        }
        Ok(Self { bytes: buffer.freeze() })
    }

    /// A fresh handle on the buffered bytes (reference counted, no copy).
    pub fn replay(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
