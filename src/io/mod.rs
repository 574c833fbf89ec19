// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O: media sources, the remote zone service, its tracking and stats
//! streams, and zone export.

pub mod client;
pub mod feed;
pub mod media;
pub mod request;
pub mod serialization;
pub mod stats;
