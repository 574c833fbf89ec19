// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data model: zones, sources and tracking sessions.

pub mod source;
pub mod zone;
