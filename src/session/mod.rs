// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Interactive segmentation session core.
//!
//! Everything in here runs on the UI thread and is driven by user actions,
//! timer ticks and replies from the I/O worker.

pub mod controller;
pub mod notify;
pub mod points;
pub mod poller;
pub mod presenter;
pub mod request;
