// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Case and volume data structures.
//!
//! This module defines the uploaded cases, the metadata of their CT
//! volumes, and the job/segmentation summaries reported by the service.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Processing status of an uploaded case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    #[default]
    Uploaded,
    Running,
    Completed,
    Error,
    /// Reported for cases the service has never processed
    #[serde(other)]
    Unknown,
}

impl CaseStatus {
    /// Whether a job in this status will not change any more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseStatus::Completed | CaseStatus::Error)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CaseStatus::Uploaded => "uploaded",
            CaseStatus::Running => "running",
            CaseStatus::Completed => "completed",
            CaseStatus::Error => "error",
            CaseStatus::Unknown => "unknown",
        }
    }
}

/// One uploaded volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    #[serde(rename = "case_name")]
    pub name: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub status: CaseStatus,
    #[serde(default)]
    pub message: String,
}

impl Case {
    /// Create a freshly uploaded case.
    pub fn new(name: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            name: name.into(),
            files,
            status: CaseStatus::Uploaded,
            message: String::new(),
        }
    }
}

/// Shape and spacing of a case's CT volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeInfo {
    /// Voxel counts along x, y, z
    pub shape: [u32; 3],
    /// Physical voxel spacing in millimetres
    pub spacing: [f64; 3],
    /// Largest valid slice index (z extent - 1)
    pub max_slice: u32,
}

impl VolumeInfo {
    pub fn new(shape: [u32; 3], spacing: [f64; 3]) -> Self {
        Self {
            shape,
            spacing,
            max_slice: shape[2].saturating_sub(1),
        }
    }

    pub fn width(&self) -> u32 {
        self.shape[0]
    }

    pub fn height(&self) -> u32 {
        self.shape[1]
    }

    pub fn slice_count(&self) -> u32 {
        self.max_slice + 1
    }

    /// The slice shown when a case is first opened.
    pub fn mid_slice(&self) -> u32 {
        self.max_slice / 2
    }

    /// Make `max_slice` agree with the z extent.
    pub fn normalized(mut self) -> Self {
        let expected = self.shape[2].saturating_sub(1);
        if self.max_slice != expected {
            log::warn!(
                "Service reported max_slice {} for z extent {}, using {}",
                self.max_slice,
                self.shape[2],
                expected
            );
            self.max_slice = expected;
        }
        self
    }
}

/// Summary of the current mask after an interaction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SegmentationStats {
    pub total_voxels: u64,
    #[serde(default)]
    pub unique_values: BTreeSet<i64>,
}

/// Job state as reported by the status call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub status: CaseStatus,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mid_slice() {
        let info = VolumeInfo::new([512, 512, 121], [0.8, 0.8, 2.5]);
        assert_eq!(info.max_slice, 120);
        assert_eq!(info.mid_slice(), 60);
        assert_eq!(info.slice_count(), 121);
    }

    #[test]
    fn test_normalized_fixes_max_slice() {
        let info = VolumeInfo {
            shape: [64, 64, 10],
            spacing: [1.0, 1.0, 1.0],
            max_slice: 42,
        };
        assert_eq!(info.normalized().max_slice, 9);
    }

    #[test]
    fn test_job_status_parsing() {
        let status: JobStatus =
            serde_json::from_str(r#"{"status": "running", "message": "Loading data..."}"#).unwrap();
        assert_eq!(status.status, CaseStatus::Running);
        assert!(!status.status.is_terminal());

        let status: JobStatus =
            serde_json::from_str(r#"{"status": "unknown", "message": "Case not found"}"#).unwrap();
        assert_eq!(status.status, CaseStatus::Unknown);
    }

    #[test]
    fn test_case_from_listing() {
        let case: Case =
            serde_json::from_str(r#"{"case_name": "case_00001", "files": ["ct.nii.gz"]}"#).unwrap();
        assert_eq!(case.name, "case_00001");
        assert_eq!(case.status, CaseStatus::Uploaded);
        assert!(case.message.is_empty());
    }
}
