#![no_main]

use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use libfuzzer_sys::fuzz_target;
use spin::Mutex;

use partwise::{
    MimeResponseDecoder, MimeResponseSink, ReceiveDataStatus, ResponseFinishedStatus,
    SharedResponseSink,
};

struct NullSink;

impl MimeResponseSink for NullSink {
    fn on_receive_response_code(&mut self, _code: StatusCode) -> bool {
        true
    }

    fn on_receive_header_line(&mut self, _line: &str) -> bool {
        true
    }

    fn on_begin_mime_part(&mut self, _headers: &HeaderMap) -> bool {
        true
    }

    fn on_receive_mime_data(&mut self, _data: &[u8]) -> ReceiveDataStatus {
        ReceiveDataStatus::Success
    }

    fn on_end_mime_part(&mut self) -> bool {
        true
    }

    fn on_receive_non_mime_data(&mut self, _data: &[u8]) -> ReceiveDataStatus {
        ReceiveDataStatus::Success
    }

    fn on_response_finished(&mut self, _status: ResponseFinishedStatus) {}
}

fuzz_target!(|data: &[u8]| {
    let sink: SharedResponseSink = Arc::new(Mutex::new(NullSink));
    let mut decoder = MimeResponseDecoder::new(Some(sink));
    let _ = decoder.on_receive_response_code(StatusCode::OK);
    let _ = decoder.on_receive_header_line("content-type: multipart/related; boundary=X-BOUNDARY");

    for chunk in data.chunks(7) {
        if decoder.on_receive_data(chunk) == ReceiveDataStatus::Abort {
            break;
        }
    }
    decoder.on_response_finished(ResponseFinishedStatus::Complete);
});
