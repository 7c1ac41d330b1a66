// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Settings file serialization and deserialization.
//!
//! This module reads and writes serde types as YAML or JSON, chosen by
//! file extension.

use anyhow::{bail, Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

/// Export data to YAML or JSON depending on the extension of `path`.
pub fn export<T: Serialize>(data: &T, path: &Path) -> Result<()> {
    let text = match extension(path) {
        Some("yaml") | Some("yml") => serde_yaml::to_string(data)?,
        Some("json") => serde_json::to_string_pretty(data)?,
        other => bail!("Unsupported file extension: {:?}", other),
    };
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Import data from a YAML or JSON file.
pub fn import<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let data = match extension(path) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&text)
            .with_context(|| format!("parsing YAML {}", path.display()))?,
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("parsing JSON {}", path.display()))?,
        other => bail!("Unsupported file extension: {:?}", other),
    };
    Ok(data)
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|s| s.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::point::InteractionPoint;

    #[test]
    fn test_yaml_and_json_roundtrip() {
        let points = vec![
            InteractionPoint { x: 100, y: 150, z: 60, positive: true },
            InteractionPoint { x: 7, y: 9, z: 61, positive: false },
        ];
        let dir = std::env::temp_dir();
        for name in ["segview_points.yaml", "segview_points.json"] {
            let path = dir.join(format!("{}_{}", std::process::id(), name));
            export(&points, &path).unwrap();
            let back: Vec<InteractionPoint> = import(&path).unwrap();
            assert_eq!(back, points);
            let _ = std::fs::remove_file(&path);
        }
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let path = std::env::temp_dir().join("segview_points.toml");
        assert!(export(&vec![1, 2, 3], &path).is_err());
    }
}
