// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Interaction point data structures.

use serde::{Deserialize, Serialize};

/// Polarity applied to newly clicked points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    /// Include the clicked region
    #[default]
    Positive,
    /// Exclude the clicked region
    Negative,
}

impl InteractionMode {
    pub fn is_positive(&self) -> bool {
        matches!(self, InteractionMode::Positive)
    }

    pub fn label(&self) -> &'static str {
        match self {
            InteractionMode::Positive => "Positive",
            InteractionMode::Negative => "Negative",
        }
    }
}

/// A positive or negative hint at a voxel of one slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionPoint {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub positive: bool,
}

/// Points of one case as written by File > Export Points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsExport {
    pub case: String,
    pub points: Vec<InteractionPoint>,
}

impl InteractionPoint {
    pub fn new(x: u32, y: u32, z: u32, mode: InteractionMode) -> Self {
        Self {
            x,
            y,
            z,
            positive: mode.is_positive(),
        }
    }
}
