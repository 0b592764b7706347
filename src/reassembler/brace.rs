// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Balanced-brace framing for streamed JSON arrays.
//
// The upstream sends `[{...},\r\n{...}\r\n]` in arbitrary slices. Anything
// outside a top-level object (`[`, `,`, whitespace, `]`) is discarded. The
// scan state survives across feeds so each byte is looked at once.

use super::types::{FramingError, FramingUnit, MAX_FRAME_BYTES};
use super::Framed;

#[derive(Debug, Default)]
pub(super) struct BraceFramer {
    /// Bytes of the pending object, always starting at its `{` when
    /// non-empty.
    buf: Vec<u8>,
    /// Next index of `buf` to scan.
    cursor: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    /// Inside an object already reported as oversized. Its bytes are
    /// scanned for the closing brace and dropped as they arrive.
    discarding: bool,
}

enum Scan {
    Closed(usize),
    Oversized(usize),
    Open,
}

impl BraceFramer {
    pub(super) fn feed(&mut self, chunk: &[u8], out: &mut Vec<Framed>) {
        self.buf.extend_from_slice(chunk);

        loop {
            if self.discarding && !self.skip_oversized() {
                return;
            }
            if self.depth == 0 && !self.align_to_open_brace() {
                return;
            }

            match self.scan() {
                Scan::Closed(end) => {
                    let span: Vec<u8> = self.buf.drain(..end).collect();
                    self.reset_scan();
                    out.push(parse_object(&span));
                }
                Scan::Oversized(end) => {
                    self.buf.drain(..end);
                    self.cursor = 0;
                    self.discarding = true;
                    out.push(Err(FramingError::Oversized {
                        limit: MAX_FRAME_BYTES,
                    }));
                }
                Scan::Open => return,
            }
        }
    }

    pub(super) fn finish(&mut self, out: &mut Vec<Framed>) {
        // An unfinished oversized object was already reported.
        if !self.buf.is_empty() && !self.discarding {
            out.push(Err(FramingError::Truncated {
                pending: self.buf.len(),
            }));
        }
        self.buf.clear();
        self.reset_scan();
    }

    pub(super) fn pending_bytes(&self) -> usize {
        self.buf.len()
    }

    /// Drop everything before the first `{`. With no `{` at all the whole
    /// buffer is garbage and is cleared.
    fn align_to_open_brace(&mut self) -> bool {
        match self.buf.iter().position(|&b| b == b'{') {
            Some(0) => true,
            Some(start) => {
                self.buf.drain(..start);
                true
            }
            None => {
                self.buf.clear();
                false
            }
        }
    }

    fn scan(&mut self) -> Scan {
        while self.cursor < self.buf.len() {
            let i = self.cursor;
            self.cursor += 1;

            if self.step(self.buf[i]) {
                return Scan::Closed(i + 1);
            }

            // Still open at the limit: the finished object could only be larger.
            if i + 1 >= MAX_FRAME_BYTES {
                return Scan::Oversized(i + 1);
            }
        }
        Scan::Open
    }

    /// Consume the rest of an oversized object, nested objects and strings
    /// included. Returns true once its closing brace has been dropped.
    fn skip_oversized(&mut self) -> bool {
        let pending = std::mem::take(&mut self.buf);
        match pending.iter().position(|&b| self.step(b)) {
            Some(i) => {
                self.buf = pending[i + 1..].to_vec();
                self.reset_scan();
                true
            }
            None => false,
        }
    }

    /// Advance the quote-aware brace state by one byte. Returns true when
    /// the byte closes the top-level object.
    fn step(&mut self, b: u8) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if b == b'\\' {
                self.escaped = true;
            } else if b == b'"' {
                self.in_string = false;
            }
            return false;
        }
        match b {
            b'"' => self.in_string = true,
            b'{' => self.depth += 1,
            b'}' => {
                self.depth = self.depth.saturating_sub(1);
                return self.depth == 0;
            }
            _ => {}
        }
        false
    }

    fn reset_scan(&mut self) {
        self.cursor = 0;
        self.depth = 0;
        self.in_string = false;
        self.escaped = false;
        self.discarding = false;
    }
}

fn parse_object(span: &[u8]) -> Framed {
    serde_json::from_slice::<serde_json::Value>(span)
        .map(FramingUnit::Json)
        .map_err(|e| FramingError::MalformedJson(e.to_string()))
}
