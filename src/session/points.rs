// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Client-side cache of accepted interaction points.
//!
//! Points are kept per case and per slice in insertion order. The service
//! owns the authoritative mask; this store only mirrors points it has
//! already accepted, so callers add a point only after the interaction call
//! succeeded.

use crate::models::point::InteractionPoint;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct CasePoints {
    slices: BTreeMap<u32, Vec<InteractionPoint>>,
    /// Bumped on every local add or clear
    revision: u64,
}

/// Interaction points keyed by (case, slice).
#[derive(Debug, Default)]
pub struct InteractionPointStore {
    cases: HashMap<String, CasePoints>,
}

impl InteractionPointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point to the sequence of its slice.
    pub fn add_point(&mut self, case: &str, point: InteractionPoint) {
        let entry = self.cases.entry(case.to_string()).or_default();
        entry.slices.entry(point.z).or_default().push(point);
        entry.revision += 1;
    }

    /// Points recorded for one slice, in insertion order.
    pub fn get_points(&self, case: &str, slice: u32) -> &[InteractionPoint] {
        self.cases
            .get(case)
            .and_then(|c| c.slices.get(&slice))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of points across every slice of a case.
    pub fn total_points(&self, case: &str) -> usize {
        self.cases
            .get(case)
            .map(|c| c.slices.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Every point of a case, ordered by slice then insertion.
    pub fn all_points(&self, case: &str) -> Vec<InteractionPoint> {
        self.cases
            .get(case)
            .map(|c| c.slices.values().flatten().copied().collect())
            .unwrap_or_default()
    }

    /// Drop every point of a case.
    pub fn clear(&mut self, case: &str) {
        let entry = self.cases.entry(case.to_string()).or_default();
        entry.slices.clear();
        entry.revision += 1;
    }

    /// Forget a case entirely, e.g. after it was deleted.
    pub fn remove_case(&mut self, case: &str) {
        self.cases.remove(case);
    }

    /// Counter of local mutations for a case.
    pub fn revision(&self, case: &str) -> u64 {
        self.cases.get(case).map(|c| c.revision).unwrap_or(0)
    }

    /// Replace one slice with the list reported by the service.
    ///
    /// Ignored if the case was mutated locally after `revision` was read,
    /// so a listing that raced with an interaction cannot drop its point.
    /// Returns whether the replacement was applied.
    pub fn replace_slice(
        &mut self,
        case: &str,
        slice: u32,
        points: Vec<InteractionPoint>,
        revision: u64,
    ) -> bool {
        if self.revision(case) != revision {
            log::debug!(
                "Discarding stale point listing for {} slice {} (revision {} != {})",
                case,
                slice,
                revision,
                self.revision(case)
            );
            return false;
        }
        let entry = self.cases.entry(case.to_string()).or_default();
        if points.is_empty() {
            entry.slices.remove(&slice);
        } else {
            entry.slices.insert(slice, points);
        }
        true
    }
}
