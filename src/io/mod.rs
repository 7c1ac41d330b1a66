// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O: service client, background worker, image decoding and config files.

pub mod api;
pub mod media;
pub mod serialization;
pub mod worker;
