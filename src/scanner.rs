use bytes::BytesMut;
use http::HeaderMap;
use log::debug;
use memchr::{memchr_iter, memmem};

use crate::constants::{CR, CRLF, CRLF_CRLF, MAX_HEADERS, TWO_DASHES};
use crate::error::Error;
use crate::helpers;

/// Callbacks fired by [`MultipartScanner::feed`] as parts are recognized,
/// synchronously and in order.
pub(crate) trait ScanVisitor {
    fn on_part_begin(&mut self, headers: &HeaderMap);
    fn on_part_data(&mut self, data: &[u8]);
    fn on_part_end(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Expecting `--boundary` at the very start of the body.
    OpeningBoundary,
    /// Expecting CRLF (another part follows) or `--` (final boundary).
    BoundaryEnd,
    /// Expecting a part's header block, terminated by an empty line.
    PartHeaders,
    /// Expecting part payload, terminated by `CRLF--boundary`.
    PartData,
    /// Past the final boundary; remaining bytes are ignored.
    Epilogue,
}

/// Incremental multipart splitter.
///
/// Bytes are pushed in with [`feed`](Self::feed); whatever cannot be
/// classified yet (a partial delimiter, an unfinished header block) is
/// carried in `buf` until the next feed. Cloning the scanner snapshots the
/// whole scan position, which is how the response decoder checkpoints before
/// a feed it may have to replay.
#[derive(Debug, Clone)]
pub(crate) struct MultipartScanner {
    /// `CRLF--boundary`, the delimiter terminating a part's payload.
    delimiter: Vec<u8>,
    /// `--boundaryCRLF`, a full boundary line.
    boundary_line: Vec<u8>,
    buf: BytesMut,
    stage: Stage,
    failed: bool,
}

impl MultipartScanner {
    pub fn new(boundary: &str) -> Self {
        let delimiter = format!("{}{}{}", CRLF, TWO_DASHES, boundary).into_bytes();
        let boundary_line = format!("{}{}{}", TWO_DASHES, boundary, CRLF).into_bytes();
        MultipartScanner {
            delimiter,
            boundary_line,
            buf: BytesMut::new(),
            stage: Stage::OpeningBoundary,
            failed: false,
        }
    }

    /// Pushes the next chunk through the scanner, firing visitor callbacks
    /// for everything that becomes classifiable. Errors are sticky.
    pub fn feed(&mut self, data: &[u8], visitor: &mut dyn ScanVisitor) -> crate::Result<()> {
        if self.failed {
            return Err(Error::ScanAlreadyFailed);
        }
        self.buf.extend_from_slice(data);
        match self.scan(visitor) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.failed = true;
                Err(err)
            }
        }
    }

    fn scan(&mut self, visitor: &mut dyn ScanVisitor) -> crate::Result<()> {
        loop {
            match self.stage {
                Stage::OpeningBoundary => {
                    // "--boundary", without the trailing CRLF handled by
                    // BoundaryEnd.
                    let line_len = self.boundary_line.len() - CRLF.len();
                    if self.buf.len() < line_len {
                        if !self.boundary_line[..line_len].starts_with(&self.buf) {
                            return Err(Error::BoundaryMismatch);
                        }
                        return Ok(());
                    }
                    if self.buf[..line_len] != self.boundary_line[..line_len] {
                        return Err(Error::BoundaryMismatch);
                    }
                    let _ = self.buf.split_to(line_len);
                    self.stage = Stage::BoundaryEnd;
                }

                Stage::BoundaryEnd => {
                    if self.buf.len() < 2 {
                        return Ok(());
                    }
                    if self.buf.starts_with(CRLF.as_bytes()) {
                        let _ = self.buf.split_to(CRLF.len());
                        self.stage = Stage::PartHeaders;
                    } else if self.buf.starts_with(TWO_DASHES.as_bytes()) {
                        let _ = self.buf.split_to(TWO_DASHES.len());
                        self.stage = Stage::Epilogue;
                    } else {
                        return Err(Error::InvalidBoundaryEnd);
                    }
                }

                Stage::PartHeaders => {
                    if !self.skip_duplicate_boundaries() {
                        return Ok(());
                    }
                    if self.buf.starts_with(CRLF.as_bytes()) {
                        // An immediate empty line: this part carries no
                        // headers at all.
                        let _ = self.buf.split_to(CRLF.len());
                        visitor.on_part_begin(&HeaderMap::new());
                        self.stage = Stage::PartData;
                        continue;
                    }
                    let block_end = match memmem::find(&self.buf, CRLF_CRLF.as_bytes()) {
                        Some(idx) => idx + CRLF_CRLF.len(),
                        None => return Ok(()),
                    };
                    let block = self.buf.split_to(block_end);
                    let mut raw = [httparse::EMPTY_HEADER; MAX_HEADERS];
                    let headers = match httparse::parse_headers(&block, &mut raw) {
                        Ok(httparse::Status::Complete((_, parsed))) => {
                            helpers::raw_headers_to_header_map(parsed)?
                        }
                        Ok(httparse::Status::Partial) => return Err(Error::IncompleteHeaders),
                        Err(err) => return Err(Error::ReadHeaderFailed(err)),
                    };
                    visitor.on_part_begin(&headers);
                    self.stage = Stage::PartData;
                }

                Stage::PartData => match memmem::find(&self.buf, &self.delimiter) {
                    Some(idx) => {
                        if idx > 0 {
                            let data = self.buf.split_to(idx);
                            visitor.on_part_data(&data);
                        }
                        let _ = self.buf.split_to(self.delimiter.len());
                        visitor.on_part_end();
                        self.stage = Stage::BoundaryEnd;
                    }
                    None => {
                        let keep = suffix_overlap(&self.buf, &self.delimiter);
                        let emit = self.buf.len() - keep;
                        if emit > 0 {
                            let data = self.buf.split_to(emit);
                            visitor.on_part_data(&data);
                        }
                        return Ok(());
                    }
                },

                Stage::Epilogue => {
                    self.buf.clear();
                    return Ok(());
                }
            }
        }
    }

    /// Skips `--boundaryCRLF` and `CRLF--boundaryCRLF` lines repeated where a
    /// part's headers should start. Some servers duplicate boundary lines;
    /// they delimit nothing and must not produce parts.
    ///
    /// Returns `false` while the buffer is still a prefix of one of those
    /// forms and more input is needed to decide.
    fn skip_duplicate_boundaries(&mut self) -> bool {
        loop {
            if self.buf.starts_with(&self.boundary_line) {
                let skip = self.boundary_line.len();
                let _ = self.buf.split_to(skip);
                debug!("skipped duplicate boundary line");
                continue;
            }
            if self.buf.len() >= 2
                && self.buf.starts_with(CRLF.as_bytes())
                && self.buf[CRLF.len()..].starts_with(&self.boundary_line)
            {
                let skip = CRLF.len() + self.boundary_line.len();
                let _ = self.buf.split_to(skip);
                debug!("skipped duplicate boundary line");
                continue;
            }
            if is_strict_prefix(&self.buf, &self.boundary_line) {
                return false;
            }
            if self.buf.starts_with(CRLF.as_bytes())
                && is_strict_prefix(&self.buf[CRLF.len()..], &self.boundary_line)
            {
                return false;
            }
            if self.buf.len() < CRLF.len() && CRLF.as_bytes().starts_with(&self.buf) {
                return false;
            }
            return true;
        }
    }
}

fn is_strict_prefix(buf: &[u8], pattern: &[u8]) -> bool {
    buf.len() < pattern.len() && pattern[..buf.len()] == *buf
}

/// Length of the longest tail of `buf` that is a prefix of `delimiter`.
/// Those bytes cannot be emitted as part data until more input disambiguates
/// them.
fn suffix_overlap(buf: &[u8], delimiter: &[u8]) -> usize {
    let window = buf.len().min(delimiter.len() - 1);
    let start = buf.len() - window;
    for pos in memchr_iter(CR, &buf[start..]) {
        let len = window - pos;
        if buf[start + pos..] == delimiter[..len] {
            return len;
        }
    }
    0
}
