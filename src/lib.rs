//! An incremental MIME multipart codec for chunked request/response
//! transports.
//!
//! Ordinary multipart libraries operate on a complete in-memory message. This
//! crate targets transports that deliver or accept body bytes in chunks of
//! unpredictable size, may stall under backpressure, and may terminate
//! abnormally at any point (an HTTP/2 stream, for instance):
//!
//! - [`MimeRequestEncoder`] pulls part headers and payload bytes from a
//!   [`MimeRequestSource`] and serializes them, boundary-delimited, into
//!   whatever output buffer the transport offers.
//! - [`MimeResponseDecoder`] accepts raw body chunks as they arrive, splits
//!   them along the boundary announced in a response header line, and
//!   forwards decoded parts to a [`MimeResponseSink`].
//!
//! Neither half performs I/O and neither blocks. Backpressure travels through
//! `Pause` dispositions that the caller retries with identical arguments, and
//! failure is a sticky `Abort`.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use spin::Mutex;
//! use partwise::{
//!     MimeHeadersResult, MimeRequestEncoder, MimeRequestSource, SendDataResult,
//!     SharedRequestSource,
//! };
//!
//! struct OnePart {
//!     sent_headers: bool,
//!     payload: &'static [u8],
//!     offset: usize,
//! }
//!
//! impl MimeRequestSource for OnePart {
//!     fn request_header_lines(&mut self) -> Vec<String> {
//!         vec!["Host: example.com".to_owned()]
//!     }
//!
//!     fn mime_part_header_lines(&mut self) -> MimeHeadersResult {
//!         if self.sent_headers {
//!             return MimeHeadersResult::Complete;
//!         }
//!         self.sent_headers = true;
//!         MimeHeadersResult::Continue(vec!["Content-Type: application/json".to_owned()])
//!     }
//!
//!     fn send_mime_part_data(&mut self, buffer: &mut [u8]) -> SendDataResult {
//!         let remaining = &self.payload[self.offset..];
//!         if remaining.is_empty() {
//!             return SendDataResult::Complete;
//!         }
//!         let size = remaining.len().min(buffer.len());
//!         buffer[..size].copy_from_slice(&remaining[..size]);
//!         self.offset += size;
//!         SendDataResult::Continue(size)
//!     }
//! }
//!
//! let source: SharedRequestSource = Arc::new(Mutex::new(OnePart {
//!     sent_headers: false,
//!     payload: b"{}",
//!     offset: 0,
//! }));
//! let mut encoder = MimeRequestEncoder::new("zzz", Some(source));
//!
//! let mut body = Vec::new();
//! let mut buffer = [0u8; 16];
//! loop {
//!     match encoder.on_send_data(&mut buffer) {
//!         SendDataResult::Continue(size) => body.extend_from_slice(&buffer[..size]),
//!         SendDataResult::Complete => break,
//!         status => panic!("unexpected {}", status),
//!     }
//! }
//!
//! assert_eq!(
//!     body,
//!     b"\r\n--zzz\r\nContent-Type: application/json\r\n\r\n{}\r\n--zzz--\r\n"
//! );
//! ```

pub use config::{ExchangeConfig, IdSequence};
pub use decoder::{MimeResponseDecoder, MimeResponseSink, SharedResponseSink};
pub use encoder::{MimeRequestEncoder, MimeRequestSource, SharedRequestSource};
pub use error::Error;
pub use status::{MimeHeadersResult, ReceiveDataStatus, ResponseFinishedStatus, SendDataResult};

mod config;
mod constants;
mod decoder;
mod encoder;
mod error;
mod helpers;
mod scanner;
mod status;
mod writer;

/// A `Result` type often returned from methods that can have `partwise`
/// errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Extracts and validates the boundary announced by a response header line.
///
/// The first `boundary=` parameter wins (case-sensitive token, any preceding
/// `;`-delimited parameters are tolerated). A value opening with `"` runs to
/// the next `"`, and anything after the closing quote is ignored; an unquoted
/// value runs to the next `;` or the end of the line. The boundary must be
/// 1 to 70 characters from the token set `0-9 A-Z a-z ' ( ) + _ , - . : = ?`.
///
/// # Examples
///
/// ```
/// let line = "content-type: multipart/related; boundary=wooohooo";
/// assert_eq!(partwise::parse_boundary(line), Ok("wooohooo".to_owned()));
/// ```
pub fn parse_boundary<T: AsRef<str>>(header_line: T) -> Result<String> {
    let line = header_line.as_ref();
    let start = match line.find(constants::BOUNDARY_PARAM) {
        Some(idx) => idx + constants::BOUNDARY_PARAM.len(),
        None => return Err(Error::NoBoundary),
    };
    let value = &line[start..];

    let boundary = if let Some(quoted) = value.strip_prefix('"') {
        match quoted.find('"') {
            Some(end) => &quoted[..end],
            None => {
                return Err(Error::InvalidBoundary {
                    boundary: quoted.to_owned(),
                })
            }
        }
    } else {
        match value.find(';') {
            Some(end) => &value[..end],
            None => value,
        }
    };

    if boundary.is_empty()
        || boundary.len() > constants::MAX_BOUNDARY_LEN
        || !boundary.bytes().all(constants::is_boundary_char)
    {
        return Err(Error::InvalidBoundary {
            boundary: boundary.to_owned(),
        });
    }

    Ok(boundary.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_boundary() {
        let line = "Content-Type: multipart/form-data; boundary=ABCDEFG";
        assert_eq!(parse_boundary(line), Ok("ABCDEFG".to_owned()));

        let line = "content-type:mixed/multipart;boundary=84109348-943b-4446-85e6-e73eda9fac43";
        assert_eq!(
            parse_boundary(line),
            Ok("84109348-943b-4446-85e6-e73eda9fac43".to_owned())
        );

        let line = "content-type: multipart/related; boundary=this-b:nd; charset=utf-8";
        assert_eq!(parse_boundary(line), Ok("this-b:nd".to_owned()));

        assert!(parse_boundary("content-type: text/plain").is_err());
    }

    #[test]
    fn test_parse_boundary_quoted() {
        let line = "content-type: multipart/related; boundary=\"abc.123\";type=application/json";
        assert_eq!(parse_boundary(line), Ok("abc.123".to_owned()));

        // Unterminated quote.
        assert!(parse_boundary("content-type: x; boundary=\"abc").is_err());
    }

    #[test]
    fn test_parse_boundary_is_case_sensitive() {
        assert_eq!(
            parse_boundary("content-type: x; BOUNDARY=abc"),
            Err(Error::NoBoundary)
        );
    }

    #[test]
    fn test_parse_boundary_rejects_bad_tokens() {
        assert!(parse_boundary("content-type: x; boundary=").is_err());
        assert!(parse_boundary("content-type: x; boundary=\"\"").is_err());
        assert!(parse_boundary("content-type: x; boundary=has space").is_err());
        assert!(parse_boundary("content-type: x; boundary=bad/slash").is_err());

        let long = format!("content-type: x; boundary={}", "a".repeat(71));
        assert!(parse_boundary(long).is_err());
        let max = format!("content-type: x; boundary={}", "a".repeat(70));
        assert!(parse_boundary(max).is_ok());
    }
}
