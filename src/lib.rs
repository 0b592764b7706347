// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

pub mod config;
pub mod handshake;
pub mod provider;
pub mod reassembler;
pub mod relay;
pub mod telemetry;
