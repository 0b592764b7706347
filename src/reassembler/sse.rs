// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Line framing for server-sent events.
//
// Only `data:` lines carry units; `event:`, `id:`, comments, and blank
// separators are dropped.

use super::types::{FramingError, FramingUnit, MAX_FRAME_BYTES};
use super::Framed;

#[derive(Debug, Default)]
pub(super) struct SseFramer {
    /// Partial line (no `\n` seen yet).
    buf: Vec<u8>,
    /// Set after an oversized partial line was dropped; bytes are skipped
    /// until the next `\n`.
    discarding: bool,
}

impl SseFramer {
    pub(super) fn feed(&mut self, chunk: &[u8], out: &mut Vec<Framed>) {
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos);
            rest = &tail[1..];

            if self.discarding {
                self.discarding = false;
                continue;
            }

            if self.buf.len() + head.len() > MAX_FRAME_BYTES {
                self.buf.clear();
                out.push(Err(FramingError::Oversized {
                    limit: MAX_FRAME_BYTES,
                }));
                continue;
            }

            self.buf.extend_from_slice(head);
            let line = std::mem::take(&mut self.buf);
            if let Some(unit) = parse_line(&line) {
                out.push(unit);
            }
        }

        if self.discarding {
            return;
        }
        if self.buf.len() + rest.len() > MAX_FRAME_BYTES {
            self.buf.clear();
            self.discarding = true;
            out.push(Err(FramingError::Oversized {
                limit: MAX_FRAME_BYTES,
            }));
            return;
        }
        self.buf.extend_from_slice(rest);
    }

    pub(super) fn finish(&mut self, out: &mut Vec<Framed>) {
        let line = std::mem::take(&mut self.buf);
        if !self.discarding && !line.is_empty() {
            if let Some(unit) = parse_line(&line) {
                out.push(unit);
            }
        }
        self.discarding = false;
    }

    pub(super) fn pending_bytes(&self) -> usize {
        self.buf.len()
    }
}

/// Decode one line (without its `\n`). `None` for lines that carry no data.
fn parse_line(line: &[u8]) -> Option<Framed> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text,
        Err(_) => return Some(Err(FramingError::InvalidUtf8)),
    };

    let trimmed = text.trim();
    let payload = trimmed.strip_prefix("data:")?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    if payload.is_empty() {
        return None;
    }
    Some(Ok(FramingUnit::Data(payload.to_string())))
}
