// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Chunk reassembly
//
// Responsibilities:
// - Accumulate raw upstream bytes with no assumption about chunk boundaries
// - Yield complete framing units: balanced-brace JSON objects (Gemini) or
//   `data:` SSE payloads (OpenAI-compatible)
// - Keep the unconsumed remainder for the next feed
// - Memory-bounded: 1MB max per pending unit
// - Same unit sequence for any chunking of the same bytes

mod brace;
mod sse;
mod types;

pub use types::{FramingError, FramingMode, FramingUnit, MAX_FRAME_BYTES};

use brace::BraceFramer;
use sse::SseFramer;

/// Result of one framing step. Errors are per-unit and never poison the
/// reassembler.
pub type Framed = Result<FramingUnit, FramingError>;

/// Stateful reassembler for one upstream stream.
#[derive(Debug)]
pub struct ChunkReassembler {
    framer: Framer,
}

#[derive(Debug)]
enum Framer {
    Brace(BraceFramer),
    Sse(SseFramer),
}

impl ChunkReassembler {
    pub fn new(mode: FramingMode) -> Self {
        let framer = match mode {
            FramingMode::BraceJson => Framer::Brace(BraceFramer::default()),
            FramingMode::SseLine => Framer::Sse(SseFramer::default()),
        };
        Self { framer }
    }

    pub fn mode(&self) -> FramingMode {
        match self.framer {
            Framer::Brace(_) => FramingMode::BraceJson,
            Framer::Sse(_) => FramingMode::SseLine,
        }
    }

    /// Append `chunk` and return every unit it completes, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Framed> {
        let mut out = Vec::new();
        match &mut self.framer {
            Framer::Brace(framer) => framer.feed(chunk, &mut out),
            Framer::Sse(framer) => framer.feed(chunk, &mut out),
        }
        out
    }

    /// Signal end of stream and flush whatever is still pending.
    pub fn finish(&mut self) -> Vec<Framed> {
        let mut out = Vec::new();
        match &mut self.framer {
            Framer::Brace(framer) => framer.finish(&mut out),
            Framer::Sse(framer) => framer.finish(&mut out),
        }
        out
    }

    /// Bytes held back waiting for more input.
    pub fn pending_bytes(&self) -> usize {
        match &self.framer {
            Framer::Brace(framer) => framer.pending_bytes(),
            Framer::Sse(framer) => framer.pending_bytes(),
        }
    }
}

#[cfg(test)]
mod tests;
