// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Messages exchanged between the session controller and the I/O worker.
//!
//! The controller never performs I/O itself. It queues [`Request`]s, the
//! worker executes them off the UI thread, and each one comes back as
//! exactly one [`Reply`] carrying enough context to detect staleness.

use crate::error::SessionError;
use crate::io::media::DecodedImage;
use crate::models::case::{Case, JobStatus, SegmentationStats, VolumeInfo};
use crate::models::point::InteractionPoint;
use crate::session::presenter::ImageTicket;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    ListCases,
    VolumeInfo {
        case: String,
    },
    SliceImage(ImageTicket),
    InteractionPoints {
        case: String,
        slice: u32,
        /// Store revision when the listing was requested
        revision: u64,
    },
    Interact {
        case: String,
        point: InteractionPoint,
    },
    ClearSegmentation {
        case: String,
    },
    StartProcessing {
        case: String,
    },
    JobStatus {
        case: String,
    },
    Logs {
        case: String,
    },
    DeleteCase {
        case: String,
    },
    DownloadResults {
        case: String,
        destination: PathBuf,
    },
}

#[derive(Debug)]
pub enum Reply {
    Cases(Result<Vec<Case>, SessionError>),
    VolumeInfo {
        case: String,
        result: Result<VolumeInfo, SessionError>,
    },
    SliceImage {
        ticket: ImageTicket,
        result: Result<DecodedImage, SessionError>,
    },
    InteractionPoints {
        case: String,
        slice: u32,
        revision: u64,
        result: Result<Vec<InteractionPoint>, SessionError>,
    },
    Interact {
        case: String,
        point: InteractionPoint,
        result: Result<SegmentationStats, SessionError>,
    },
    ClearSegmentation {
        case: String,
        result: Result<(), SessionError>,
    },
    StartProcessing {
        case: String,
        result: Result<(), SessionError>,
    },
    JobStatus {
        case: String,
        result: Result<JobStatus, SessionError>,
    },
    Logs {
        case: String,
        result: Result<Vec<String>, SessionError>,
    },
    DeleteCase {
        case: String,
        result: Result<(), SessionError>,
    },
    DownloadResults {
        case: String,
        result: Result<PathBuf, SessionError>,
    },
}
