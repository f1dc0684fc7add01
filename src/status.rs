//! The status vocabulary shared by every codec operation.
//!
//! These types carry no behavior beyond equality and a readable name; they
//! exist so the encoder, the decoder, and their collaborators can signal
//! dispositions type-safely. Payload-bearing outcomes carry their payload in
//! the variant itself, so a byte count or header list cannot be paired with
//! the wrong status.

use std::fmt::{self, Display, Formatter};

/// Disposition of an operation that produces bytes for the transport.
///
/// `Pause` means nothing was produced and the caller must retry the same
/// request later; it is never mixed with a partial byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendDataResult {
    /// Bytes were written into the caller's buffer; call again for more.
    Continue(usize),
    /// Nothing is available right now; retry later with the same buffer.
    Pause,
    /// The body is fully serialized; no further bytes will be produced.
    Complete,
    /// Terminal failure; every subsequent call reports `Abort` again.
    Abort,
}

impl SendDataResult {
    /// Bytes produced by this call; zero for anything but `Continue`.
    pub fn size(&self) -> usize {
        match self {
            SendDataResult::Continue(size) => *size,
            _ => 0,
        }
    }
}

impl Display for SendDataResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SendDataResult::Continue(size) => write!(f, "CONTINUE({})", size),
            SendDataResult::Pause => f.write_str("PAUSE"),
            SendDataResult::Complete => f.write_str("COMPLETE"),
            SendDataResult::Abort => f.write_str("ABORT"),
        }
    }
}

/// Result of asking a request source for the next part's header lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeHeadersResult {
    /// Header lines for the next part, one string per line, no CRLFs.
    Continue(Vec<String>),
    /// The next part is not ready yet; ask again later.
    Pause,
    /// No parts remain.
    Complete,
    /// Terminal failure.
    Abort,
}

impl Display for MimeHeadersResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MimeHeadersResult::Continue(lines) => write!(f, "CONTINUE({} lines)", lines.len()),
            MimeHeadersResult::Pause => f.write_str("PAUSE"),
            MimeHeadersResult::Complete => f.write_str("COMPLETE"),
            MimeHeadersResult::Abort => f.write_str("ABORT"),
        }
    }
}

/// Disposition of an operation that consumes bytes from the transport.
///
/// There is no `Complete` variant: the decoder never decides that a response
/// is logically over. That is signaled separately through
/// [`on_response_finished`](crate::MimeResponseSink::on_response_finished).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveDataStatus {
    /// The chunk was consumed in full.
    Success,
    /// Nothing was consumed; deliver the identical chunk again later.
    Pause,
    /// Terminal failure; every subsequent call reports `Abort` again.
    Abort,
}

impl Display for ReceiveDataStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ReceiveDataStatus::Success => f.write_str("SUCCESS"),
            ReceiveDataStatus::Pause => f.write_str("PAUSE"),
            ReceiveDataStatus::Abort => f.write_str("ABORT"),
        }
    }
}

/// Terminal disposition of a whole response, decided by the transport and
/// passed through to the sink untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFinishedStatus {
    Complete,
    Timeout,
    Cancelled,
    InternalError,
}

impl Display for ResponseFinishedStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ResponseFinishedStatus::Complete => f.write_str("COMPLETE"),
            ResponseFinishedStatus::Timeout => f.write_str("TIMEOUT"),
            ResponseFinishedStatus::Cancelled => f.write_str("CANCELLED"),
            ResponseFinishedStatus::InternalError => f.write_str("INTERNAL_ERROR"),
        }
    }
}
