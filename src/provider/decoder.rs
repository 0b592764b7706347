// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// One reassembler coupled to one adapter for the lifetime of one stream.

use super::{ProviderAdapter, ProviderError};
use crate::reassembler::{ChunkReassembler, Framed};

/// Counters reported when a stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub fragments: usize,
    /// Units dropped by framing or extraction.
    pub malformed: usize,
}

/// Turns raw upstream bytes into text fragments.
pub struct FragmentDecoder<'a> {
    adapter: &'a dyn ProviderAdapter,
    reassembler: ChunkReassembler,
    stats: DecodeStats,
    done: bool,
}

impl<'a> FragmentDecoder<'a> {
    pub fn new(adapter: &'a dyn ProviderAdapter) -> Self {
        Self {
            adapter,
            reassembler: ChunkReassembler::new(adapter.framing()),
            stats: DecodeStats::default(),
            done: false,
        }
    }

    /// Feed one upstream chunk. Returns the fragments it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.done {
            return Vec::new();
        }
        let framed = self.reassembler.feed(chunk);
        self.decode(framed)
    }

    /// Upstream closed: flush the reassembler.
    pub fn finish(&mut self) -> Vec<String> {
        if self.done {
            return Vec::new();
        }
        let framed = self.reassembler.finish();
        self.decode(framed)
    }

    /// The upstream sent its end-of-stream marker; later bytes are ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    fn decode(&mut self, framed: Vec<Framed>) -> Vec<String> {
        let mut out = Vec::new();
        for item in framed {
            if self.done {
                break;
            }

            let unit = match item {
                Ok(unit) => unit,
                Err(e) => {
                    self.stats.malformed += 1;
                    tracing::warn!(
                        provider = self.adapter.name(),
                        error = %e,
                        "dropping unframeable upstream bytes"
                    );
                    continue;
                }
            };

            match self.adapter.extract(&unit) {
                Ok(extraction) => {
                    self.stats.fragments += extraction.fragments.len();
                    out.extend(extraction.fragments);
                    self.done = extraction.done;
                }
                Err(ProviderError::Upstream(message)) => {
                    self.stats.malformed += 1;
                    tracing::warn!(
                        provider = self.adapter.name(),
                        upstream_error = %message,
                        "upstream sent an in-band error"
                    );
                }
                Err(e) => {
                    self.stats.malformed += 1;
                    tracing::debug!(
                        provider = self.adapter.name(),
                        error = %e,
                        "skipping malformed unit"
                    );
                }
            }
        }
        out
    }
}
