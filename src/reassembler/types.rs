// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Framing types: modes, units, and per-unit errors.

/// Maximum size of a single pending framing unit in bytes.
pub const MAX_FRAME_BYTES: usize = 1_048_576; // 1 MB

/// How an upstream body is cut into units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// A JSON array streamed as a sequence of top-level objects
    /// (`[{...},\r\n{...}]`). Each balanced `{...}` is one unit.
    BraceJson,
    /// Server-sent events. Each `data:` line is one unit.
    SseLine,
}

/// One complete unit cut from the byte stream.
#[derive(Debug, Clone, PartialEq)]
pub enum FramingUnit {
    /// A parsed top-level JSON object.
    Json(serde_json::Value),
    /// The payload of one `data:` line, prefix and surrounding whitespace
    /// removed.
    Data(String),
}

/// A unit that could not be produced. Non-fatal: the reassembler skips the
/// offending bytes and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    #[error("balanced object is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    #[error("pending unit exceeds {limit} bytes")]
    Oversized { limit: usize },

    #[error("stream ended inside an object ({pending} bytes pending)")]
    Truncated { pending: usize },
}
