use std::fmt::{self, Debug, Display, Formatter};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur while parsing boundary header lines and
/// scanning a multipart body.
///
/// The codec's streaming operations report their disposition through status
/// values, not through `Result`; these errors surface from the fallible
/// parsing helpers and internally from the scanning engine, where the decoder
/// turns them into a sticky `Abort`.
#[non_exhaustive]
pub enum Error {
    /// No `boundary=` parameter was present in the header line.
    NoBoundary,

    /// A boundary value was present but empty, too long, or outside the
    /// allowed token set.
    InvalidBoundary { boundary: String },

    /// The body did not open with the configured boundary.
    BoundaryMismatch,

    /// A boundary was followed by neither CRLF nor the terminating dashes.
    InvalidBoundaryEnd,

    /// Failed to read a part's headers.
    ReadHeaderFailed(httparse::Error),

    /// A part's header block ended before its terminating empty line.
    IncompleteHeaders,

    /// Failed to decode a raw header name to a
    /// [`HeaderName`](http::header::HeaderName).
    DecodeHeaderName { name: String, cause: BoxError },

    /// Failed to decode a raw header value to a
    /// [`HeaderValue`](http::header::HeaderValue).
    DecodeHeaderValue { value: Vec<u8>, cause: BoxError },

    /// The scanning engine was fed again after it had already failed.
    ScanAlreadyFailed,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoBoundary => f.write_str("multipart boundary not found in header line"),
            Error::InvalidBoundary { boundary } => {
                write!(f, "invalid multipart boundary: {:?}", boundary)
            }
            Error::BoundaryMismatch => {
                f.write_str("body did not start with the configured boundary")
            }
            Error::InvalidBoundaryEnd => {
                f.write_str("boundary not followed by CRLF or terminating dashes")
            }
            Error::ReadHeaderFailed(err) => write!(f, "failed to read part headers: {}", err),
            Error::IncompleteHeaders => f.write_str("failed to read complete part headers"),
            Error::DecodeHeaderName { name, cause } => {
                write!(f, "failed to decode raw header name: {:?} {}", name, cause)
            }
            Error::DecodeHeaderValue { value, cause } => {
                write!(f, "failed to decode raw header value: {:?} {}", value, cause)
            }
            Error::ScanAlreadyFailed => f.write_str("multipart scan already failed"),
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}
