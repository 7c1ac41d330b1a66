// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components for the segmentation viewer.

pub mod canvas;
pub mod cases;
pub mod notice;
pub mod properties;
pub mod results;
pub mod toolbar;
