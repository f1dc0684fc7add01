use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use log::{debug, error};
use spin::Mutex;

use crate::constants::{CR, LEADING_CRLF_LEN, LF};
use crate::error::Error;
use crate::scanner::{MultipartScanner, ScanVisitor};
use crate::status::{ReceiveDataStatus, ResponseFinishedStatus};

/// Receives everything the decoder extracts from a response: the code, raw
/// header lines, decoded mime parts (or opaque non-mime bytes), and the
/// transport's terminal disposition.
///
/// `bool`-returning notifications decline further participation by returning
/// `false`; data deliveries answer with a [`ReceiveDataStatus`], where
/// `Pause` promises that the same bytes will be offered again later.
pub trait MimeResponseSink {
    /// The response's status code, seen before any header line or body byte.
    fn on_receive_response_code(&mut self, code: StatusCode) -> bool;

    /// One response header line, without its line terminator.
    fn on_receive_header_line(&mut self, line: &str) -> bool;

    /// A new mime part, described by its header multimap.
    fn on_begin_mime_part(&mut self, headers: &HeaderMap) -> bool;

    /// The next slice of the current part's payload. A part's payload may be
    /// split across any number of these calls.
    fn on_receive_mime_data(&mut self, data: &[u8]) -> ReceiveDataStatus;

    /// The current part's payload is complete.
    fn on_end_mime_part(&mut self) -> bool;

    /// Body bytes of a response that is not being mime-parsed.
    fn on_receive_non_mime_data(&mut self, data: &[u8]) -> ReceiveDataStatus;

    /// The exchange is over; no further notifications will follow.
    fn on_response_finished(&mut self, status: ResponseFinishedStatus);
}

/// A response sink shared between the decoder and the owning transport.
pub type SharedResponseSink = Arc<Mutex<dyn MimeResponseSink + Send>>;

/// Splits an incoming response body into mime parts as its bytes arrive.
///
/// The boundary is discovered from a response header line; bodies of
/// non-success responses are forwarded opaquely instead of parsed. When the
/// sink pauses mid-chunk the decoder rewinds to the state it held before the
/// chunk, so the transport can deliver the identical chunk again once the
/// sink is ready.
pub struct MimeResponseDecoder {
    sink: Option<SharedResponseSink>,
    /// Present once a boundary has been configured.
    scanner: Option<MultipartScanner>,
    response_code: Option<StatusCode>,
    last_status: ReceiveDataStatus,
    /// Index of the last part-data callback the sink accepted, carried across
    /// a paused chunk so its replay resumes at exactly the right slice.
    last_success_index: usize,
    leading_crlf_left: u8,
}

impl MimeResponseDecoder {
    pub fn new(sink: Option<SharedResponseSink>) -> Self {
        MimeResponseDecoder {
            sink,
            scanner: None,
            response_code: None,
            last_status: ReceiveDataStatus::Success,
            last_success_index: 0,
            leading_crlf_left: LEADING_CRLF_LEN,
        }
    }

    /// Records the response code and forwards it to the sink. Any code other
    /// than `200 OK` turns the rest of the body into opaque non-mime data.
    pub fn on_receive_response_code(&mut self, code: StatusCode) -> bool {
        debug!("response code {}", code);
        self.response_code = Some(code);
        match &self.sink {
            Some(sink) => sink.lock().on_receive_response_code(code),
            None => {
                debug!("no sink to notify of response code");
                true
            }
        }
    }

    /// Forwards a response header line to the sink and, until one succeeds,
    /// inspects it for the `boundary=` parameter that configures mime
    /// parsing.
    ///
    /// A line carrying an invalid boundary returns `false` and configures
    /// nothing; a later valid line may still configure the boundary. Lines
    /// after a successful configuration are forwarded but otherwise ignored.
    pub fn on_receive_header_line(&mut self, line: &str) -> bool {
        let forwarded = match &self.sink {
            Some(sink) => sink.lock().on_receive_header_line(line),
            None => {
                debug!("no sink to notify of header line");
                true
            }
        };
        if !forwarded {
            return false;
        }

        if self.scanner.is_none() {
            match crate::parse_boundary(line) {
                Ok(boundary) => {
                    debug!("configured boundary {:?} from response headers", boundary);
                    self.scanner = Some(MultipartScanner::new(&boundary));
                }
                Err(Error::NoBoundary) => {}
                Err(err) => {
                    error!("rejected boundary header line: {}", err);
                    return false;
                }
            }
        }
        true
    }

    /// Consumes the next chunk of response body bytes.
    ///
    /// `Pause` means no byte of `bytes` was (logically) consumed and the
    /// identical chunk must be delivered again; `Abort` is sticky.
    pub fn on_receive_data(&mut self, bytes: &[u8]) -> ReceiveDataStatus {
        if self.last_status == ReceiveDataStatus::Abort {
            return ReceiveDataStatus::Abort;
        }

        let sink = match &self.sink {
            Some(sink) => Arc::clone(sink),
            None => {
                error!("received body data with no sink attached");
                return self.abort();
            }
        };

        if self.response_code != Some(StatusCode::OK) {
            let status = sink.lock().on_receive_non_mime_data(bytes);
            if status == ReceiveDataStatus::Abort {
                self.last_status = ReceiveDataStatus::Abort;
            }
            return status;
        }

        if self.scanner.is_none() {
            error!("received body data before a boundary was configured");
            return self.abort();
        }

        // Checkpoint before any byte of this chunk is consumed; a PAUSE below
        // restores both so the chunk replays byte-for-byte.
        let crlf_checkpoint = self.leading_crlf_left;

        let mut data = bytes;
        if self.leading_crlf_left > 0 {
            if self.leading_crlf_left == LEADING_CRLF_LEN {
                match data.first() {
                    Some(&CR) => {
                        data = &data[1..];
                        self.leading_crlf_left = 1;
                    }
                    Some(_) => self.leading_crlf_left = 0,
                    None => return ReceiveDataStatus::Success,
                }
            }
            if self.leading_crlf_left == 1 {
                match data.first() {
                    Some(&LF) => {
                        data = &data[1..];
                        self.leading_crlf_left = 0;
                    }
                    Some(_) => {
                        error!("response body began with a bare CR");
                        return self.abort();
                    }
                    None => return ReceiveDataStatus::Success,
                }
            }
            if data.is_empty() {
                return ReceiveDataStatus::Success;
            }
        }

        let scanner = match self.scanner.as_mut() {
            Some(scanner) => scanner,
            None => return ReceiveDataStatus::Abort,
        };
        let scanner_checkpoint = scanner.clone();

        let mut gate = SinkGate {
            sink,
            status: self.last_status,
            index: 0,
            last_success_index: self.last_success_index,
        };

        let fed = scanner.feed(data, &mut gate);
        if let Err(err) = fed {
            error!("multipart scan failed: {}", err);
            gate.status = ReceiveDataStatus::Abort;
        }

        self.last_status = gate.status;
        self.last_success_index = gate.last_success_index;

        match self.last_status {
            ReceiveDataStatus::Success => {
                self.last_success_index = 0;
            }
            ReceiveDataStatus::Pause => {
                *scanner = scanner_checkpoint;
                self.leading_crlf_left = crlf_checkpoint;
            }
            ReceiveDataStatus::Abort => {}
        }

        self.last_status
    }

    /// Forwards the transport's terminal disposition for the exchange.
    pub fn on_response_finished(&mut self, status: ResponseFinishedStatus) {
        debug!("response finished: {}", status);
        match &self.sink {
            Some(sink) => sink.lock().on_response_finished(status),
            None => debug!("no sink to notify of response finish"),
        }
    }

    fn abort(&mut self) -> ReceiveDataStatus {
        self.last_status = ReceiveDataStatus::Abort;
        ReceiveDataStatus::Abort
    }
}

/// Gates scanner callbacks on the sink's most recent disposition.
///
/// While paused, every callback is swallowed until the part-data slice whose
/// index immediately follows the last accepted one; that slice flips the
/// disposition back to `Success`, which is how a paused part resumes with
/// the next piece of its own data rather than an unrelated later one.
struct SinkGate {
    sink: SharedResponseSink,
    status: ReceiveDataStatus,
    index: usize,
    last_success_index: usize,
}

impl ScanVisitor for SinkGate {
    fn on_part_begin(&mut self, headers: &HeaderMap) {
        if self.status == ReceiveDataStatus::Success
            && !self.sink.lock().on_begin_mime_part(headers)
        {
            self.status = ReceiveDataStatus::Abort;
        }
    }

    fn on_part_data(&mut self, data: &[u8]) {
        self.index += 1;
        if self.status == ReceiveDataStatus::Pause && self.index == self.last_success_index + 1 {
            self.status = ReceiveDataStatus::Success;
        }
        if self.status == ReceiveDataStatus::Success {
            self.status = self.sink.lock().on_receive_mime_data(data);
            if self.status == ReceiveDataStatus::Success {
                self.last_success_index = self.index;
            }
        }
    }

    fn on_part_end(&mut self) {
        if self.status == ReceiveDataStatus::Success && !self.sink.lock().on_end_mime_part() {
            self.status = ReceiveDataStatus::Abort;
        }
    }
}
