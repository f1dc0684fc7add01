use std::cmp;

use crate::constants::CRLF;

/// Resumable copier that serializes one string at a time into the output
/// buffers handed to [`on_send_data`](crate::MimeRequestEncoder::on_send_data).
///
/// `string_index` is the progress within the current string and survives
/// across calls, so a string interrupted by a full buffer picks up where it
/// stopped. `copied` is the write cursor into the buffer for the current call
/// only and is reset by [`begin_chunk`](Self::begin_chunk).
#[derive(Debug, Default)]
pub(crate) struct TextWriter {
    string_index: usize,
    copied: usize,
}

impl TextWriter {
    /// Starts a fresh output buffer.
    pub fn begin_chunk(&mut self) {
        self.copied = 0;
    }

    /// Starts a fresh string.
    pub fn begin_string(&mut self) {
        self.string_index = 0;
    }

    /// Bytes written into the current buffer so far.
    pub fn copied(&self) -> usize {
        self.copied
    }

    /// Accounts for bytes a collaborator wrote into the buffer directly.
    pub fn note_external_write(&mut self, size: usize) {
        self.copied += size;
    }

    /// Copies as much of `text` as fits into `out`, advancing both cursors.
    ///
    /// Returns `true` once the whole string has been emitted with buffer room
    /// to spare; `false` means the buffer is now full and the same string must
    /// be continued into a fresh buffer.
    pub fn write(&mut self, out: &mut [u8], text: &[u8]) -> bool {
        let buffer_remaining = out.len() - self.copied;
        let text_remaining = text.len() - self.string_index;
        let done = buffer_remaining > text_remaining;
        let size = cmp::min(buffer_remaining, text_remaining);
        out[self.copied..self.copied + size]
            .copy_from_slice(&text[self.string_index..self.string_index + size]);
        self.copied += size;
        self.string_index += size;
        done
    }

    /// Like [`write`](Self::write) with a trailing CRLF; `string_index` runs
    /// past `text.len()` while the CRLF itself is being emitted.
    pub fn write_with_crlf(&mut self, out: &mut [u8], text: &[u8]) -> bool {
        if self.string_index < text.len() && !self.write(out, text) {
            return false;
        }
        let crlf = CRLF.as_bytes();
        let crlf_copied = self.string_index - text.len();
        let buffer_remaining = out.len() - self.copied;
        let crlf_remaining = crlf.len() - crlf_copied;
        let done = buffer_remaining > crlf_remaining;
        let size = cmp::min(buffer_remaining, crlf_remaining);
        out[self.copied..self.copied + size].copy_from_slice(&crlf[crlf_copied..crlf_copied + size]);
        self.copied += size;
        self.string_index += size;
        done
    }
}
