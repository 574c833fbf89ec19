// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components for the zone editor.

pub mod canvas;
pub mod dialogs;
pub mod overlay;
pub mod toolbar;
pub mod zones_panel;
