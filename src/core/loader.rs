//! Catalog file loading
//!
//! Catalogs come as YAML, JSON or CSV. Structured files are checked against
//! the embedded catalog schema before they are deserialized. CSV files carry
//! one row per (point, size):
//!
//! ```text
//! point_id,name_eng,name_local,tolerance_key,size,nominal,tol_minus,tol_plus
//! P01,Chest 1/2,,1,S,20,1/4,1/4
//! P01,Chest 1/2,,1,M,21,1/4,1/4
//! ```

use miette::Diagnostic;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::core::catalog::SpecCatalog;
use crate::core::fraction::Fraction;
use crate::entities::spec::{RawCatalog, RawPoint, RawSizeSpec};
use crate::schema::{SchemaRegistry, CATALOG_SCHEMA};
use crate::yaml::{parse_yaml, YamlError};

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Yaml(#[from] YamlError),

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid CSV in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("{path} does not match the catalog schema:\n  {}", .errors.join("\n  "))]
    #[diagnostic(code(qcm::catalog::schema))]
    Schema { path: PathBuf, errors: Vec<String> },

    #[error("Unsupported catalog format '{0}' (expected .yaml, .yml, .json or .csv)")]
    UnsupportedFormat(String),
}

/// Catalog file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    Yaml,
    Json,
    Csv,
}

impl CatalogFormat {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "yaml" | "yml" => Ok(CatalogFormat::Yaml),
            "json" => Ok(CatalogFormat::Json),
            "csv" => Ok(CatalogFormat::Csv),
            _ => Err(LoadError::UnsupportedFormat(ext)),
        }
    }
}

/// Read and validate a catalog file without grouping it
pub fn read_raw_catalog(path: &Path) -> Result<RawCatalog, LoadError> {
    let format = CatalogFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let filename = path.display().to_string();
    debug!(path = %filename, ?format, "reading catalog");
    parse_raw_catalog(&content, &filename, format)
}

/// Parse catalog text in a known format
pub fn parse_raw_catalog(
    content: &str,
    filename: &str,
    format: CatalogFormat,
) -> Result<RawCatalog, LoadError> {
    let path = PathBuf::from(filename);
    let value: serde_json::Value = match format {
        CatalogFormat::Csv => return parse_csv(content, &path),
        CatalogFormat::Yaml => parse_yaml(content, filename)?,
        CatalogFormat::Json => serde_json::from_str(content).map_err(|source| LoadError::Json {
            path: path.clone(),
            source,
        })?,
    };

    SchemaRegistry::default()
        .validate(CATALOG_SCHEMA, &value)
        .map_err(|errors| LoadError::Schema {
            path: path.clone(),
            errors,
        })?;

    serde_json::from_value(value).map_err(|source| LoadError::Json { path, source })
}

/// Load a catalog file into a grouped catalog
pub fn load_catalog(path: &Path) -> Result<SpecCatalog, LoadError> {
    Ok(SpecCatalog::load(read_raw_catalog(path)?))
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    point_id: Option<String>,
    #[serde(alias = "name")]
    name_eng: String,
    #[serde(default)]
    name_local: Option<String>,
    #[serde(default, alias = "k_value")]
    tolerance_key: Option<String>,
    size: String,
    #[serde(default)]
    nominal: Option<String>,
    #[serde(default)]
    tol_minus: Option<String>,
    #[serde(default)]
    tol_plus: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Rows sharing a point id (or name, when ids are absent) and key form one point
fn parse_csv(content: &str, path: &Path) -> Result<RawCatalog, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut catalog = RawCatalog::default();
    for row in reader.deserialize::<CsvRow>() {
        let row = row.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let point_id = non_blank(row.point_id);
        let tolerance_key = non_blank(row.tolerance_key);

        let position = catalog.points.iter().position(|p| {
            let same_point = match (&p.point_id, &point_id) {
                (Some(a), Some(b)) => a == b,
                (None, None) => p.name_eng == row.name_eng,
                _ => false,
            };
            same_point && p.tolerance_key == tolerance_key
        });
        let index = match position {
            Some(index) => index,
            None => {
                catalog.points.push(RawPoint {
                    point_id,
                    name_eng: row.name_eng,
                    name_local: non_blank(row.name_local),
                    tolerance_key,
                    ..RawPoint::default()
                });
                catalog.points.len() - 1
            }
        };

        catalog.points[index].sizes.push(RawSizeSpec {
            size: row.size,
            nominal: Fraction::parse(non_blank(row.nominal).unwrap_or_else(|| "-".into())),
            tol_minus: non_blank(row.tol_minus).map(Fraction::parse),
            tol_plus: non_blank(row.tol_plus).map(Fraction::parse),
        });
    }
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::spec::ToleranceKey;

    const YAML: &str = r#"
sizes: [S, M]
points:
  - point_id: P01
    name_eng: Chest 1/2
    tolerance_key: 1
    tol_minus: 1/4
    tol_plus: 1/4
    sizes:
      - { size: S, nominal: "20" }
      - { size: M, nominal: 21, tol_plus: 3/8 }
  - name: Hip
    tolerance_key: NA
    sizes:
      - { size: M, nominal: 22 1/2, tol_minus: 1/2, tol_plus: 1/2 }
"#;

    #[test]
    fn test_yaml_catalog() {
        let raw = parse_raw_catalog(YAML, "catalog.yaml", CatalogFormat::Yaml).unwrap();
        assert_eq!(raw.points.len(), 2);
        assert_eq!(raw.points[1].name_eng, "Hip");

        let catalog = SpecCatalog::load(raw);
        assert_eq!(catalog.available_keys(), vec![ToleranceKey::new("1")]);
        let chest = &catalog.flat()[0];
        assert_eq!(chest.size_spec("M").unwrap().tol_plus.value(), Some(0.375));
        assert_eq!(chest.size_spec("S").unwrap().tol_plus.value(), Some(0.25));
        assert_eq!(catalog.flat()[1].size_spec("M").unwrap().nominal.value(), Some(22.5));
    }

    #[test]
    fn test_json_catalog_schema_errors() {
        let json = r#"{"points": [{"name_eng": "Chest", "colour": "red"}]}"#;
        match parse_raw_catalog(json, "catalog.json", CatalogFormat::Json) {
            Err(LoadError::Schema { errors, .. }) => assert_eq!(errors.len(), 1),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_csv_rows_group_into_points() {
        let csv = "\
point_id,name_eng,name_local,tolerance_key,size,nominal,tol_minus,tol_plus
P01,Chest,,1,S,20,1/4,1/4
P01,Chest,,1,M,21,1/4,1/4
P01,Chest,,2,M,21,1/2,1/2
,Hip,Cadera,,M,22,,
";
        let raw = parse_raw_catalog(csv, "catalog.csv", CatalogFormat::Csv).unwrap();
        assert_eq!(raw.points.len(), 3);
        assert_eq!(raw.points[0].sizes.len(), 2);
        assert_eq!(raw.points[1].tolerance_key.as_deref(), Some("2"));
        assert_eq!(raw.points[2].name_local.as_deref(), Some("Cadera"));

        let catalog = SpecCatalog::load(raw);
        // Hip has no key, so it applies to both groups
        assert_eq!(catalog.point_count(&ToleranceKey::new("1")), 2);
        assert_eq!(catalog.point_count(&ToleranceKey::new("2")), 2);
        let hip = &catalog.flat()[2];
        assert_eq!(hip.size_spec("M").unwrap().tol_minus.value(), Some(0.0));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            CatalogFormat::from_path(Path::new("catalog.xlsx")),
            Err(LoadError::UnsupportedFormat(ext)) if ext == "xlsx"
        ));
    }

    #[test]
    fn test_load_catalog_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("spec.yml");
        std::fs::write(&path, YAML).unwrap();
        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.sizes(), &["S".to_string(), "M".to_string()]);
        assert!(matches!(
            load_catalog(&tmp.path().join("missing.yaml")),
            Err(LoadError::Io { .. })
        ));
    }
}
