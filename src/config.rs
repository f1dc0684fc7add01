//! Per-exchange configuration: identifiers and the boundary the request body
//! will be framed with.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::{is_boundary_char, MAX_BOUNDARY_LEN};
use crate::decoder::{MimeResponseDecoder, SharedResponseSink};
use crate::encoder::{MimeRequestEncoder, SharedRequestSource};
use crate::error::Error;

/// Hands out exchange identifiers.
///
/// Injected into whatever constructs exchanges rather than living as a
/// process-wide counter, so independent transports and tests each get their
/// own sequence.
#[derive(Debug)]
pub struct IdSequence {
    prefix: String,
    next: AtomicU64,
}

impl IdSequence {
    pub fn new<P: Into<String>>(prefix: P) -> Self {
        IdSequence {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }

    /// The next identifier in this sequence.
    pub fn next_id(&self) -> String {
        format!("{}-{}", self.prefix, self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Everything fixed about one request/response exchange: its identifier and
/// its multipart boundary.
///
/// One encoder and one decoder exist per exchange; neither is reused once the
/// exchange finishes.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    id: String,
    boundary: String,
}

impl ExchangeConfig {
    /// Mints a config with an identifier drawn from `ids`. The boundary must
    /// satisfy the same token rules enforced on receive.
    pub fn new<B: Into<String>>(ids: &IdSequence, boundary: B) -> crate::Result<Self> {
        let boundary = boundary.into();
        if boundary.is_empty()
            || boundary.len() > MAX_BOUNDARY_LEN
            || !boundary.bytes().all(is_boundary_char)
        {
            return Err(Error::InvalidBoundary { boundary });
        }
        Ok(ExchangeConfig {
            id: ids.next_id(),
            boundary,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// An encoder for this exchange's request body.
    pub fn encoder(&self, source: Option<SharedRequestSource>) -> MimeRequestEncoder {
        MimeRequestEncoder::new(self.boundary.clone(), source)
    }

    /// A decoder for this exchange's response body.
    pub fn decoder(&self, sink: Option<SharedResponseSink>) -> MimeResponseDecoder {
        MimeResponseDecoder::new(sink)
    }
}
