use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use log::{debug, error};
use spin::Mutex;

use crate::constants::{BOUNDARY_HEADER_PREFIX, CRLF, TWO_DASHES};
use crate::status::{MimeHeadersResult, SendDataResult};
use crate::writer::TextWriter;

/// Supplies the outgoing request: its own header lines, then one mime part
/// after another.
///
/// Implementations are driven by [`MimeRequestEncoder`] and may report
/// backpressure (`Pause`), exhaustion (`Complete`), or terminal failure
/// (`Abort`) through their result types.
pub trait MimeRequestSource {
    /// Header lines for the request itself, not for any mime part.
    fn request_header_lines(&mut self) -> Vec<String>;

    /// Header lines for the next mime part, or `Complete` when no parts
    /// remain.
    fn mime_part_header_lines(&mut self) -> MimeHeadersResult;

    /// Writes the next bytes of the current part's payload into `buffer` and
    /// reports how many, or `Complete` when the part's payload is exhausted.
    fn send_mime_part_data(&mut self, buffer: &mut [u8]) -> SendDataResult;
}

/// A request source shared between the encoder and the owning transport.
pub type SharedRequestSource = Arc<Mutex<dyn MimeRequestSource + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    New,
    Getting1stPartHeaders,
    Sending1stBoundary,
    SendingPartHeaders,
    SendingPartData,
    SendingEndBoundary,
    GettingNthPartHeaders,
    SendingCrlfAfterBoundary,
    SendingTerminatingDashes,
    Done,
    Abort,
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::New => "NEW",
            State::Getting1stPartHeaders => "GETTING_1ST_PART_HEADERS",
            State::Sending1stBoundary => "SENDING_1ST_BOUNDARY",
            State::SendingPartHeaders => "SENDING_PART_HEADERS",
            State::SendingPartData => "SENDING_PART_DATA",
            State::SendingEndBoundary => "SENDING_END_BOUNDARY",
            State::GettingNthPartHeaders => "GETTING_NTH_PART_HEADERS",
            State::SendingCrlfAfterBoundary => "SENDING_CRLF_AFTER_BOUNDARY",
            State::SendingTerminatingDashes => "SENDING_TERMINATING_DASHES",
            State::Done => "DONE",
            State::Abort => "ABORT",
        };
        f.write_str(name)
    }
}

fn transition_allowed(from: State, to: State) -> bool {
    use State::*;
    matches!(
        (from, to),
        (New, Getting1stPartHeaders)
            | (Getting1stPartHeaders, Sending1stBoundary)
            | (Getting1stPartHeaders, Done)
            | (Getting1stPartHeaders, Abort)
            | (Sending1stBoundary, SendingPartHeaders)
            | (SendingPartHeaders, SendingPartData)
            | (SendingPartData, SendingEndBoundary)
            | (SendingPartData, Abort)
            | (SendingEndBoundary, GettingNthPartHeaders)
            | (GettingNthPartHeaders, SendingCrlfAfterBoundary)
            | (GettingNthPartHeaders, SendingTerminatingDashes)
            | (GettingNthPartHeaders, Abort)
            | (SendingCrlfAfterBoundary, SendingPartHeaders)
            | (SendingTerminatingDashes, Done)
    )
}

/// Serializes a multipart request body incrementally into the output buffers
/// offered by the transport.
///
/// Each [`on_send_data`](Self::on_send_data) call resumes exactly where the
/// previous one stopped; a string interrupted mid-copy by a full buffer is
/// continued byte-for-byte on the next call. Calls are never concurrent on
/// one instance.
pub struct MimeRequestEncoder {
    state: State,
    raw_boundary: String,
    /// `CRLF--boundary`, emitted verbatim wherever a boundary line starts.
    prefixed_boundary: String,
    source: Option<SharedRequestSource>,
    part_headers: Vec<String>,
    header_index: usize,
    writer: TextWriter,
}

impl MimeRequestEncoder {
    /// Creates an encoder that frames parts pulled from `source` with
    /// `boundary`. An absent source encodes as an immediately complete,
    /// empty body.
    pub fn new<B: Into<String>>(boundary: B, source: Option<SharedRequestSource>) -> Self {
        let raw_boundary = boundary.into();
        let prefixed_boundary = format!("{}{}{}", CRLF, TWO_DASHES, raw_boundary);
        debug!("new encoder with boundary {:?}", raw_boundary);
        MimeRequestEncoder {
            state: State::New,
            raw_boundary,
            prefixed_boundary,
            source,
            part_headers: Vec::new(),
            header_index: 0,
            writer: TextWriter::default(),
        }
    }

    /// The request's header lines with the multipart content type appended,
    /// or nothing when there is no source.
    pub fn request_header_lines(&self) -> Vec<String> {
        match &self.source {
            Some(source) => {
                let mut lines = source.lock().request_header_lines();
                lines.push(format!("{}{}", BOUNDARY_HEADER_PREFIX, self.raw_boundary));
                lines
            }
            None => Vec::new(),
        }
    }

    /// Serializes the next stretch of the request body into `buffer`.
    ///
    /// A partially filled buffer is reported as `Continue` with the byte
    /// count; `Pause` is only returned when nothing at all was written this
    /// call. Once `Complete` or `Abort` has been returned, every subsequent
    /// call returns it again without consulting the source.
    pub fn on_send_data(&mut self, buffer: &mut [u8]) -> SendDataResult {
        let source = match &self.source {
            Some(source) => Arc::clone(source),
            None => return SendDataResult::Complete,
        };

        self.writer.begin_chunk();

        loop {
            match self.state {
                State::New => self.set_state(State::Getting1stPartHeaders),

                State::Getting1stPartHeaders => match source.lock().mime_part_header_lines() {
                    MimeHeadersResult::Continue(lines) => {
                        self.part_headers = lines;
                        self.writer.begin_string();
                        self.set_state(State::Sending1stBoundary);
                    }
                    MimeHeadersResult::Pause => {
                        if self.writer.copied() != 0 {
                            return self.continue_result();
                        }
                        return SendDataResult::Pause;
                    }
                    MimeHeadersResult::Complete => {
                        self.set_state(State::Done);
                        return self.continue_result();
                    }
                    MimeHeadersResult::Abort => {
                        self.set_state(State::Abort);
                        return SendDataResult::Abort;
                    }
                },

                State::Sending1stBoundary => {
                    if !self.writer.write_with_crlf(buffer, self.prefixed_boundary.as_bytes()) {
                        return self.continue_result();
                    }
                    self.header_index = 0;
                    self.writer.begin_string();
                    self.set_state(State::SendingPartHeaders);
                }

                State::SendingPartHeaders => {
                    while self.header_index < self.part_headers.len() {
                        if self
                            .writer
                            .write_with_crlf(buffer, self.part_headers[self.header_index].as_bytes())
                        {
                            self.header_index += 1;
                            self.writer.begin_string();
                        } else {
                            return self.continue_result();
                        }
                    }
                    if self.writer.write(buffer, CRLF.as_bytes()) {
                        self.set_state(State::SendingPartData);
                    } else {
                        return self.continue_result();
                    }
                }

                State::SendingPartData => {
                    let copied = self.writer.copied();
                    match source.lock().send_mime_part_data(&mut buffer[copied..]) {
                        SendDataResult::Continue(size) => {
                            if size > buffer.len() - copied {
                                error!(
                                    "source claimed {} bytes with only {} remaining",
                                    size,
                                    buffer.len() - copied
                                );
                                self.set_state(State::Abort);
                                return SendDataResult::Abort;
                            }
                            self.writer.note_external_write(size);
                            if self.writer.copied() == buffer.len() {
                                return self.continue_result();
                            }
                        }
                        SendDataResult::Pause => {
                            if copied != 0 {
                                return self.continue_result();
                            }
                            return SendDataResult::Pause;
                        }
                        SendDataResult::Complete => {
                            self.writer.begin_string();
                            self.set_state(State::SendingEndBoundary);
                        }
                        SendDataResult::Abort => {
                            self.set_state(State::Abort);
                            return SendDataResult::Abort;
                        }
                    }
                }

                State::SendingEndBoundary => {
                    if !self.writer.write(buffer, self.prefixed_boundary.as_bytes()) {
                        return self.continue_result();
                    }
                    self.set_state(State::GettingNthPartHeaders);
                }

                State::GettingNthPartHeaders => match source.lock().mime_part_header_lines() {
                    MimeHeadersResult::Continue(lines) => {
                        self.part_headers = lines;
                        self.writer.begin_string();
                        self.set_state(State::SendingCrlfAfterBoundary);
                    }
                    MimeHeadersResult::Pause => {
                        if self.writer.copied() != 0 {
                            return self.continue_result();
                        }
                        return SendDataResult::Pause;
                    }
                    MimeHeadersResult::Complete => {
                        self.writer.begin_string();
                        self.set_state(State::SendingTerminatingDashes);
                    }
                    MimeHeadersResult::Abort => {
                        self.set_state(State::Abort);
                        return SendDataResult::Abort;
                    }
                },

                State::SendingCrlfAfterBoundary => {
                    if !self.writer.write(buffer, CRLF.as_bytes()) {
                        return self.continue_result();
                    }
                    self.header_index = 0;
                    self.writer.begin_string();
                    self.set_state(State::SendingPartHeaders);
                }

                State::SendingTerminatingDashes => {
                    if self.writer.write_with_crlf(buffer, TWO_DASHES.as_bytes()) {
                        self.set_state(State::Done);
                    }
                    return self.continue_result();
                }

                State::Done => return SendDataResult::Complete,

                State::Abort => return SendDataResult::Abort,
            }
        }
    }

    fn continue_result(&self) -> SendDataResult {
        SendDataResult::Continue(self.writer.copied())
    }

    fn set_state(&mut self, new_state: State) {
        if new_state == self.state {
            return;
        }
        if transition_allowed(self.state, new_state) {
            debug!("encoder state {} -> {}", self.state, new_state);
            self.state = new_state;
        } else {
            error!("encoder state {} -> {} not allowed, aborting", self.state, new_state);
            self.state = State::Abort;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disallowed_transition_aborts() {
        let mut encoder = MimeRequestEncoder::new("bnd", None);
        encoder.set_state(State::Done);
        assert_eq!(encoder.state, State::Abort);
    }

    #[test]
    fn test_allowed_transitions() {
        assert!(transition_allowed(State::New, State::Getting1stPartHeaders));
        assert!(transition_allowed(State::SendingPartData, State::SendingEndBoundary));
        assert!(transition_allowed(State::SendingTerminatingDashes, State::Done));
        assert!(!transition_allowed(State::Done, State::New));
        assert!(!transition_allowed(State::SendingPartHeaders, State::Done));
    }

    #[test]
    fn test_absent_source() {
        let mut encoder = MimeRequestEncoder::new("bnd", None);
        assert!(encoder.request_header_lines().is_empty());
        let mut buffer = [0u8; 8];
        assert_eq!(encoder.on_send_data(&mut buffer), SendDataResult::Complete);
    }
}
