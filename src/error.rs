// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error taxonomy for the segmentation session.
//!
//! Local conditions (`NotReady`, `InvalidSlice`, `Busy`, `OutOfBounds`) reject
//! the triggering action without touching session state. Remote conditions
//! surface as notifications and leave the session at its last good state.

use thiserror::Error;

/// Errors raised by the session controller and the service client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// A prerequisite (selected case, volume info) is missing
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Requested slice is outside `0..=max_slice`
    #[error("Slice {index} is out of range (0..={max})")]
    InvalidSlice {
        /// The rejected index
        index: i64,
        /// Largest valid index for the volume
        max: u32,
    },

    /// A segmentation request for this case is already in flight
    #[error("A request for {0} is already in progress")]
    Busy(String),

    /// Click mapped to a voxel outside the slice plane
    #[error("Point ({x}, {y}) lies outside the {width}x{height} slice")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },

    /// Network or HTTP-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a structured failure
    #[error("{0}")]
    RemoteRejected(String),

    /// Both the overlay and the original slice image failed to load
    #[error("Failed to load slice {slice} of {case}")]
    ImageLoadFailure { case: String, slice: u32 },

    /// Fetched bytes could not be decoded as an image
    #[error("Image decode error: {0}")]
    Decode(String),
}

impl SessionError {
    /// True for conditions that are handled without contacting the service.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            SessionError::NotReady(_)
                | SessionError::InvalidSlice { .. }
                | SessionError::Busy(_)
                | SessionError::OutOfBounds { .. }
        )
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Transport(err.to_string())
    }
}

impl From<image::ImageError> for SessionError {
    fn from(err: image::ImageError) -> Self {
        SessionError::Decode(err.to_string())
    }
}
