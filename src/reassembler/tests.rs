// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Reassembler tests
//
// Cover:
//  1. Gemini-style arrays split at arbitrary points yield the same objects
//  2. Byte-at-a-time feeding matches a single feed
//  3. Garbage before/between objects is discarded
//  4. Braces and quotes inside JSON strings do not affect framing
//  5. Multi-byte UTF-8 split across chunks survives intact
//  6. A malformed balanced object does not stop later objects
//  7. SSE `data:` lines with and without the space, CRLF, and noise lines
//  8. Oversized units are dropped and framing recovers
//  9. finish() flushes or reports truncation

use super::*;
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Feed `payload` in pieces of `size` bytes and collect everything, finish
/// included.
fn feed_in_pieces(mode: FramingMode, payload: &[u8], size: usize) -> Vec<Framed> {
    let mut reassembler = ChunkReassembler::new(mode);
    let mut out = Vec::new();
    for piece in payload.chunks(size) {
        out.extend(reassembler.feed(piece));
    }
    out.extend(reassembler.finish());
    out
}

fn feed_once(mode: FramingMode, payload: &[u8]) -> Vec<Framed> {
    feed_in_pieces(mode, payload, payload.len().max(1))
}

fn units(framed: Vec<Framed>) -> Vec<FramingUnit> {
    framed.into_iter().map(|f| f.unwrap()).collect()
}

const GEMINI_ARRAY: &str = concat!(
    "[{\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"The sky\"}]}}]}\r\n",
    ",\r\n",
    "{\"candidates\": [{\"content\": {\"parts\": [{\"text\": \" is blue.\"}]}}]}\r\n",
    "]"
);

const SSE_STREAM: &str = concat!(
    ": keep-alive\n",
    "event: message\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"The sky\"}}]}\r\n",
    "\r\n",
    "data:{\"choices\":[{\"delta\":{\"content\":\" is blue.\"}}]}\n",
    "\n",
    "data: [DONE]\n",
);

// ---------------------------------------------------------------------------
// Brace-JSON
// ---------------------------------------------------------------------------

#[test]
fn brace_single_feed_yields_each_object() {
    let out = units(feed_once(FramingMode::BraceJson, GEMINI_ARRAY.as_bytes()));
    assert_eq!(out.len(), 2);
    assert_eq!(
        out[0],
        FramingUnit::Json(json!({"candidates": [{"content": {"parts": [{"text": "The sky"}]}}]}))
    );
}

#[test]
fn brace_any_chunking_matches_single_feed() {
    let expected = feed_once(FramingMode::BraceJson, GEMINI_ARRAY.as_bytes());
    for size in 1..=GEMINI_ARRAY.len() {
        assert_eq!(
            feed_in_pieces(FramingMode::BraceJson, GEMINI_ARRAY.as_bytes(), size),
            expected,
            "chunk size {size}"
        );
    }
}

#[test]
fn brace_discards_leading_garbage() {
    let out = units(feed_once(FramingMode::BraceJson, b"  [ ,\n{\"a\":1}"));
    assert_eq!(out, vec![FramingUnit::Json(json!({"a": 1}))]);
}

#[test]
fn brace_clears_buffer_without_open_brace() {
    let mut reassembler = ChunkReassembler::new(FramingMode::BraceJson);
    assert!(reassembler.feed(b"[\r\n,\r\n").is_empty());
    assert_eq!(reassembler.pending_bytes(), 0);
}

#[test]
fn brace_retains_partial_object() {
    let mut reassembler = ChunkReassembler::new(FramingMode::BraceJson);
    assert!(reassembler.feed(b"[{\"text\": \"hal").is_empty());
    assert_eq!(reassembler.pending_bytes(), "{\"text\": \"hal".len());

    let out = units(reassembler.feed(b"f\"}"));
    assert_eq!(out, vec![FramingUnit::Json(json!({"text": "half"}))]);
    assert_eq!(reassembler.pending_bytes(), 0);
}

#[test]
fn brace_nested_objects_frame_at_top_level() {
    let out = units(feed_once(
        FramingMode::BraceJson,
        b"{\"a\":{\"b\":{\"c\":1}}}{\"d\":2}",
    ));
    assert_eq!(
        out,
        vec![
            FramingUnit::Json(json!({"a": {"b": {"c": 1}}})),
            FramingUnit::Json(json!({"d": 2})),
        ]
    );
}

#[test]
fn brace_ignores_braces_inside_strings() {
    let payload = br#"{"text": "use } and { freely"}{"text": "quote \" then }"}"#;
    for size in [1, 3, payload.len()] {
        let out = units(feed_in_pieces(FramingMode::BraceJson, payload, size));
        assert_eq!(
            out,
            vec![
                FramingUnit::Json(json!({"text": "use } and { freely"})),
                FramingUnit::Json(json!({"text": "quote \" then }"})),
            ],
            "chunk size {size}"
        );
    }
}

#[test]
fn brace_escaped_backslash_before_quote_closes_string() {
    let payload = br#"{"path": "C:\\"}{"n": 1}"#;
    let out = units(feed_in_pieces(FramingMode::BraceJson, payload, 1));
    assert_eq!(
        out,
        vec![
            FramingUnit::Json(json!({"path": "C:\\"})),
            FramingUnit::Json(json!({"n": 1})),
        ]
    );
}

#[test]
fn brace_multibyte_utf8_split_across_chunks() {
    let payload = "{\"text\": \"Le ciel est bleu \u{1F30D} \u{00E9}t\u{00E9}\"}".as_bytes();
    let out = units(feed_in_pieces(FramingMode::BraceJson, payload, 1));
    assert_eq!(
        out,
        vec![FramingUnit::Json(json!({"text": "Le ciel est bleu \u{1F30D} \u{00E9}t\u{00E9}"}))]
    );
}

#[test]
fn brace_malformed_object_does_not_block_next() {
    let out = feed_once(FramingMode::BraceJson, b"[{not json},\r\n{\"ok\": true}]");
    assert_eq!(out.len(), 2);
    assert!(matches!(out[0], Err(FramingError::MalformedJson(_))));
    assert_eq!(out[1], Ok(FramingUnit::Json(json!({"ok": true}))));
}

#[test]
fn brace_finish_reports_truncated_object() {
    let mut reassembler = ChunkReassembler::new(FramingMode::BraceJson);
    assert!(reassembler.feed(b"[{\"text\": \"cut").is_empty());
    let out = reassembler.finish();
    assert_eq!(out, vec![Err(FramingError::Truncated { pending: 13 })]);
    assert_eq!(reassembler.pending_bytes(), 0);
}

#[test]
fn brace_finish_after_clean_end_is_empty() {
    let mut reassembler = ChunkReassembler::new(FramingMode::BraceJson);
    reassembler.feed(GEMINI_ARRAY.as_bytes());
    assert!(reassembler.finish().is_empty());
}

#[test]
fn brace_oversized_object_dropped_and_scanning_recovers() {
    let mut payload = b"{\"text\": \"".to_vec();
    payload.extend(std::iter::repeat(b'x').take(MAX_FRAME_BYTES));
    payload.extend_from_slice(b"\"}");
    payload.extend_from_slice(b",{\"after\": 1}");

    for size in [64 * 1024, payload.len()] {
        let out = feed_in_pieces(FramingMode::BraceJson, &payload, size);
        assert_eq!(
            out,
            vec![
                Err(FramingError::Oversized {
                    limit: MAX_FRAME_BYTES
                }),
                Ok(FramingUnit::Json(json!({"after": 1}))),
            ],
            "chunk size {size}"
        );
    }
}

#[test]
fn brace_oversized_object_tail_never_resurfaces() {
    // Nested objects and quoted braces past the limit belong to the dropped
    // object and must not come back out as units of their own.
    let mut payload = b"{\"pad\": \"".to_vec();
    payload.extend(std::iter::repeat(b'x').take(MAX_FRAME_BYTES));
    payload.extend_from_slice(
        br#"", "tail": {"candidates": [{"content": {"parts": [{"text": "leak } {"}]}}]}}"#,
    );
    payload.extend_from_slice(b",\r\n{\"after\": 1}\r\n]");

    for size in [7, 64 * 1024, payload.len()] {
        let out = feed_in_pieces(FramingMode::BraceJson, &payload, size);
        assert_eq!(
            out,
            vec![
                Err(FramingError::Oversized {
                    limit: MAX_FRAME_BYTES
                }),
                Ok(FramingUnit::Json(json!({"after": 1}))),
            ],
            "chunk size {size}"
        );
    }
}

#[test]
fn brace_oversized_object_cut_off_reports_once() {
    let mut payload = b"[{\"pad\": {\"deep\": \"".to_vec();
    payload.extend(std::iter::repeat(b'z').take(MAX_FRAME_BYTES + 10));

    let mut reassembler = ChunkReassembler::new(FramingMode::BraceJson);
    let mut out = reassembler.feed(&payload);
    assert!(reassembler.pending_bytes() < MAX_FRAME_BYTES);
    out.extend(reassembler.finish());
    assert_eq!(
        out,
        vec![Err(FramingError::Oversized {
            limit: MAX_FRAME_BYTES
        })]
    );
}

// ---------------------------------------------------------------------------
// SSE-Line
// ---------------------------------------------------------------------------

#[test]
fn sse_yields_data_payloads_only() {
    let out = units(feed_once(FramingMode::SseLine, SSE_STREAM.as_bytes()));
    assert_eq!(
        out,
        vec![
            FramingUnit::Data("{\"choices\":[{\"delta\":{\"content\":\"The sky\"}}]}".into()),
            FramingUnit::Data("{\"choices\":[{\"delta\":{\"content\":\" is blue.\"}}]}".into()),
            FramingUnit::Data("[DONE]".into()),
        ]
    );
}

#[test]
fn sse_any_chunking_matches_single_feed() {
    let expected = feed_once(FramingMode::SseLine, SSE_STREAM.as_bytes());
    for size in 1..=SSE_STREAM.len() {
        assert_eq!(
            feed_in_pieces(FramingMode::SseLine, SSE_STREAM.as_bytes(), size),
            expected,
            "chunk size {size}"
        );
    }
}

#[test]
fn sse_multibyte_utf8_split_across_chunks() {
    let payload = "data: caf\u{00E9} \u{2615}\n".as_bytes();
    let out = units(feed_in_pieces(FramingMode::SseLine, payload, 1));
    assert_eq!(out, vec![FramingUnit::Data("caf\u{00E9} \u{2615}".into())]);
}

#[test]
fn sse_invalid_utf8_reported_and_skipped() {
    let out = feed_once(FramingMode::SseLine, b"data: \xff\xfe\ndata: ok\n");
    assert_eq!(
        out,
        vec![
            Err(FramingError::InvalidUtf8),
            Ok(FramingUnit::Data("ok".into())),
        ]
    );
}

#[test]
fn sse_finish_flushes_unterminated_line() {
    let mut reassembler = ChunkReassembler::new(FramingMode::SseLine);
    assert!(reassembler.feed(b"data: tail").is_empty());
    assert_eq!(reassembler.finish(), vec![Ok(FramingUnit::Data("tail".into()))]);
}

#[test]
fn sse_empty_data_lines_dropped() {
    let out = feed_once(FramingMode::SseLine, b"data:\ndata: \ndata: x\n");
    assert_eq!(out, vec![Ok(FramingUnit::Data("x".into()))]);
}

#[test]
fn sse_oversized_line_dropped_and_framing_recovers() {
    let mut payload = b"data: ".to_vec();
    payload.extend(std::iter::repeat(b'y').take(MAX_FRAME_BYTES));
    payload.extend_from_slice(b"\ndata: next\n");

    for size in [1000, payload.len()] {
        let out = feed_in_pieces(FramingMode::SseLine, &payload, size);
        assert_eq!(
            out,
            vec![
                Err(FramingError::Oversized {
                    limit: MAX_FRAME_BYTES
                }),
                Ok(FramingUnit::Data("next".into())),
            ],
            "chunk size {size}"
        );
    }
}

#[test]
fn mode_is_reported() {
    assert_eq!(
        ChunkReassembler::new(FramingMode::SseLine).mode(),
        FramingMode::SseLine
    );
    assert_eq!(
        ChunkReassembler::new(FramingMode::BraceJson).mode(),
        FramingMode::BraceJson
    );
}
