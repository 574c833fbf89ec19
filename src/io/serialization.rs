// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Zone set export.
//!
//! This module writes the current zone set to YAML or JSON so it can be
//! archived or handed to other tools. The zone service remains the
//! source of truth; nothing here is read back into the workbench.

use crate::models::zone::Zone;
use crate::util::geometry::NativeSize;
use anyhow::{bail, Result};
use serde::Serialize;
use std::path::Path;

/// Exported snapshot of the zones drawn on one source.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneExport<'a> {
    pub source: &'a str,
    pub frame_width: u32,
    pub frame_height: u32,
    pub zones: &'a [Zone],
}

impl<'a> ZoneExport<'a> {
    pub fn new(source: &'a str, native: NativeSize, zones: &'a [Zone]) -> Self {
        Self {
            source,
            frame_width: native.width,
            frame_height: native.height,
            zones,
        }
    }
}

/// Export zones to YAML format.
pub fn export_yaml(data: &ZoneExport<'_>, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export zones to JSON format.
pub fn export_json(data: &ZoneExport<'_>, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Export zones, picking the format from the file extension.
pub fn export(data: &ZoneExport<'_>, path: &Path) -> Result<()> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => export_yaml(data, path),
        Some("json") => export_json(data, path),
        other => bail!("Unsupported file extension: {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones() -> Vec<Zone> {
        vec![Zone {
            label: "Entrance".into(),
            top_left_x: 223,
            top_left_y: 223,
            bottom_right_x: 447,
            bottom_right_y: 335,
            source_id: "/static/uploads/hall.mp4".into(),
        }]
    }

    #[test]
    fn test_export_json_and_yaml() {
        let zones = zones();
        let data = ZoneExport::new("/static/uploads/hall.mp4", NativeSize::new(1920, 1080), &zones);
        let dir = std::env::temp_dir().join(format!("zonewatch-export-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let json_path = dir.join("zones.json");
        export(&data, &json_path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["frame_width"], 1920);
        assert_eq!(json["zones"][0]["label"], "Entrance");
        assert_eq!(json["zones"][0]["bottomRightX"], 447);

        let yaml_path = dir.join("zones.yaml");
        export(&data, &yaml_path).unwrap();
        let yaml = std::fs::read_to_string(&yaml_path).unwrap();
        assert!(yaml.contains("label: Entrance"));

        assert!(export(&data, &dir.join("zones.txt")).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
