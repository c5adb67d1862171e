//! Écriture GeoJSON des acquisitions
//!
//! La sortie est une FeatureCollection unique : une entité par
//! acquisition, identifiée par sa clé d'ère, géométrie en
//! MultiPolygon quelle que soit sa forme. Les artefacts d'inspection
//! (`dump_steps`) passent par le même module.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geo::MultiPolygon;
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};

use crate::pipeline::AcquisitionFeature;

/// Convertit une acquisition en Feature GeoJSON
fn to_feature(acquisition: &AcquisitionFeature) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("era".to_string(), JsonValue::from(acquisition.era.clone()));
    properties.insert("step".to_string(), JsonValue::from(acquisition.step as u64));
    properties.insert(
        "label".to_string(),
        JsonValue::from(acquisition.label.clone()),
    );
    if let Some(year) = &acquisition.year {
        properties.insert("year".to_string(), JsonValue::from(year.clone()));
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&acquisition.geometry))),
        id: Some(Id::String(acquisition.era.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Assemble la FeatureCollection de sortie
pub fn to_feature_collection(acquisitions: &[AcquisitionFeature]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: acquisitions.iter().map(to_feature).collect(),
        foreign_members: None,
    }
}

/// Écrit la FeatureCollection des acquisitions
pub fn write_collection(acquisitions: &[AcquisitionFeature], path: &Path) -> Result<()> {
    let collection = to_feature_collection(acquisitions);

    let file =
        File::create(path).context(format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &collection)
        .context("Failed to serialize FeatureCollection")?;
    writer.flush()?;

    Ok(())
}

/// Dépose une géométrie seule en Feature GeoJSON, pour inspection
pub fn write_multi_polygon(geometry: &MultiPolygon<f64>, path: &Path) -> Result<()> {
    let feature = Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(geometry))),
        id: None,
        properties: None,
        foreign_members: None,
    };

    let file =
        File::create(path).context(format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &feature).context("Failed to serialize feature")?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, LineString, Polygon};

    fn acquisition(era: &str, step: usize) -> AcquisitionFeature {
        AcquisitionFeature {
            era: era.to_string(),
            step,
            label: format!("Acquisition {era}"),
            year: Some("1803".to_string()),
            geometry: MultiPolygon::new(vec![Polygon::new(
                LineString::new(vec![
                    Coord { x: 0.0, y: 0.0 },
                    Coord { x: 0.0, y: 1.0 },
                    Coord { x: 1.0, y: 1.0 },
                    Coord { x: 1.0, y: 0.0 },
                    Coord { x: 0.0, y: 0.0 },
                ]),
                vec![],
            )]),
        }
    }

    #[test]
    fn test_to_feature_properties() {
        let feature = to_feature(&acquisition("louisiana", 1));

        assert_eq!(feature.id, Some(Id::String("louisiana".to_string())));
        let properties = feature.properties.unwrap();
        assert_eq!(properties.get("era").unwrap(), "louisiana");
        assert_eq!(*properties.get("step").unwrap(), 1);
        assert_eq!(properties.get("year").unwrap(), "1803");
    }

    #[test]
    fn test_to_feature_without_year() {
        let mut input = acquisition("original", 0);
        input.year = None;
        let feature = to_feature(&input);
        assert!(feature.properties.unwrap().get("year").is_none());
    }

    #[test]
    fn test_write_collection() {
        let acquisitions = vec![acquisition("original", 0), acquisition("louisiana", 1)];

        let path = std::env::temp_dir().join(format!(
            "acq_writer_{}.geojson",
            std::process::id()
        ));
        write_collection(&acquisitions, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(content.contains(r#""type":"FeatureCollection""#));
        assert!(content.contains(r#""id":"louisiana""#));
        assert!(content.contains(r#""type":"MultiPolygon""#));
    }
}
