//! JSON-lines feature store format
//!
//! ```text
//! {"format":"osmcache-features","version":1,"generation":4,"crs":"EPSG:4326","layers":{"osm_schools":12}}
//! {"layer":"osm_schools","features":[...]}
//! ```

use osmcache_core::error::DiskError;
use osmcache_core::models::{Category, Crs, Feature};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::StoreError;

/// Format tag in the header line
pub const STORE_FORMAT: &str = "osmcache-features";

/// Current format version
pub const STORE_FORMAT_VERSION: u32 = 1;

/// First line of the store file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreHeader {
    pub format: String,
    pub version: u32,
    /// Incremented on every commit; matches `CacheMetadata::generation`
    pub generation: u64,
    /// CRS of every feature in every layer
    pub crs: Crs,
    /// Feature count per layer name
    pub layers: BTreeMap<String, usize>,
}

impl StoreHeader {
    pub fn new(generation: u64, crs: Crs) -> Self {
        Self {
            format: STORE_FORMAT.to_string(),
            version: STORE_FORMAT_VERSION,
            generation,
            crs,
            layers: BTreeMap::new(),
        }
    }
}

/// One layer line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub layer: String,
    pub features: Vec<Feature>,
}

fn open_store(path: &Path) -> Result<BufReader<File>, StoreError> {
    match File::open(path) {
        Ok(file) => Ok(BufReader::new(file)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(StoreError::NotFound { path: path.to_path_buf() })
        }
        Err(e) => Err(DiskError::from_io(path, e).into()),
    }
}

fn parse_header(path: &Path, line: &str) -> Result<StoreHeader, StoreError> {
    let header: StoreHeader = serde_json::from_str(line)
        .map_err(|e| DiskError::corrupt(path, format!("invalid header: {}", e)))?;

    if header.format != STORE_FORMAT {
        return Err(DiskError::corrupt(path, format!("unknown format '{}'", header.format)).into());
    }
    if header.version != STORE_FORMAT_VERSION {
        return Err(DiskError::corrupt(
            path,
            format!("unsupported format version {}", header.version),
        )
        .into());
    }
    Ok(header)
}

/// Read only the header line
pub fn read_header(path: &Path) -> Result<StoreHeader, StoreError> {
    let mut reader = open_store(path)?;
    let mut line = String::new();
    reader.read_line(&mut line).map_err(|e| DiskError::from_io(path, e))?;
    if line.trim().is_empty() {
        return Err(DiskError::corrupt(path, "empty store file").into());
    }
    parse_header(path, line.trim_end())
}

/// Read the whole store, checking every layer against the header
pub fn read_store(path: &Path) -> Result<(StoreHeader, BTreeMap<Category, Vec<Feature>>), StoreError> {
    let reader = open_store(path)?;
    let mut lines = reader.lines();

    let header_line = match lines.next() {
        Some(line) => line.map_err(|e| DiskError::from_io(path, e))?,
        None => return Err(DiskError::corrupt(path, "empty store file").into()),
    };
    let header = parse_header(path, &header_line)?;

    let mut layers = BTreeMap::new();
    for line in lines {
        let line = line.map_err(|e| DiskError::from_io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }

        let record: LayerRecord = serde_json::from_str(&line)
            .map_err(|e| DiskError::corrupt(path, format!("invalid layer line: {}", e)))?;

        let category = Category::from_layer_name(&record.layer)
            .ok_or_else(|| DiskError::corrupt(path, format!("unknown layer '{}'", record.layer)))?;

        if let Some(stray) = record.features.iter().find(|f| f.category != category) {
            return Err(DiskError::corrupt(
                path,
                format!("feature {} of {} is tagged {}", stray.osm_id, record.layer, stray.category),
            )
            .into());
        }

        match header.layers.get(&record.layer) {
            Some(&count) if count == record.features.len() => {}
            Some(&count) => {
                return Err(DiskError::corrupt(
                    path,
                    format!(
                        "layer {} holds {} features, header declares {}",
                        record.layer,
                        record.features.len(),
                        count
                    ),
                )
                .into())
            }
            None => {
                return Err(DiskError::corrupt(
                    path,
                    format!("layer {} missing from header", record.layer),
                )
                .into())
            }
        }

        if layers.insert(category, record.features).is_some() {
            return Err(DiskError::corrupt(path, format!("duplicate layer {}", record.layer)).into());
        }
    }

    if layers.len() != header.layers.len() {
        return Err(DiskError::corrupt(path, "header declares layers that are not present").into());
    }

    Ok((header, layers))
}

/// Write a header line and one line per layer
pub fn write_store<W: Write>(
    out: &mut W,
    header: &StoreHeader,
    layers: &BTreeMap<Category, Vec<Feature>>,
) -> serde_json::Result<()> {
    serde_json::to_writer(&mut *out, header)?;
    out.write_all(b"\n").map_err(serde_json::Error::io)?;

    for (category, features) in layers {
        let record = LayerRecordRef { layer: category.layer_name(), features };
        serde_json::to_writer(&mut *out, &record)?;
        out.write_all(b"\n").map_err(serde_json::Error::io)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct LayerRecordRef<'a> {
    layer: String,
    features: &'a [Feature],
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmcache_core::models::{ElementKind, Geometry};
    use std::io::Write as _;

    fn school(id: i64) -> Feature {
        Feature {
            osm_id: id,
            osm_type: ElementKind::Node,
            category: Category::Schools,
            name: Some(format!("School {}", id)),
            geometry: Geometry::point(id as f64, 0.0),
        }
    }

    fn write_tmp(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    fn encode(header: &StoreHeader, layers: &BTreeMap<Category, Vec<Feature>>) -> Vec<u8> {
        let mut buf = Vec::new();
        write_store(&mut buf, header, layers).unwrap();
        buf
    }

    #[test]
    fn test_write_then_read() {
        let mut header = StoreHeader::new(2, Crs::wgs84());
        header.layers.insert("osm_schools".to_string(), 2);
        let layers = BTreeMap::from([(Category::Schools, vec![school(1), school(2)])]);

        let file = write_tmp(&encode(&header, &layers));
        let (read_header, read_layers) = read_store(file.path()).unwrap();

        assert_eq!(read_header, header);
        assert_eq!(read_layers, layers);
        assert_eq!(super::read_header(file.path()).unwrap().generation, 2);
    }

    #[test]
    fn test_count_mismatch_is_corrupt() {
        let mut header = StoreHeader::new(1, Crs::wgs84());
        header.layers.insert("osm_schools".to_string(), 3);
        let layers = BTreeMap::from([(Category::Schools, vec![school(1)])]);

        let file = write_tmp(&encode(&header, &layers));
        assert!(read_store(file.path()).unwrap_err().is_corrupt());
    }

    #[test]
    fn test_truncated_store_is_corrupt() {
        let mut header = StoreHeader::new(1, Crs::wgs84());
        header.layers.insert("osm_schools".to_string(), 1);
        let layers = BTreeMap::from([(Category::Schools, vec![school(1)])]);

        let mut bytes = encode(&header, &layers);
        bytes.truncate(bytes.len() - 20);
        let file = write_tmp(&bytes);
        assert!(read_store(file.path()).unwrap_err().is_corrupt());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_header(&dir.path().join("osm_data.jsonl")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_unknown_format_is_corrupt() {
        let file = write_tmp(b"{\"format\":\"gpkg\",\"version\":1,\"generation\":1,\"crs\":\"EPSG:4326\",\"layers\":{}}\n");
        assert!(read_header(file.path()).unwrap_err().is_corrupt());
    }
}
