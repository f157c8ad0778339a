//! Polygon annotation records to binary masks.
//!
//! A record is JSON with `info.width`, `info.height` and
//! `objects[].segmentation` as `[[x, y], ...]`. Every polygon is closed and
//! filled into one shared canvas; overlapping objects simply stay set.

pub mod decode;

use crate::image::Image;
use crate::pool::{PoolSummary, WorkerPool};
use crate::raster::{close_polygon, fill_polygon};
use crate::store::{FileStore, ANNOTATION_EXTENSIONS};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{PrepError, PrepResult};
use decode::{candidate_chain, decode_with};
use crate::BinaryMask;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// One annotated object.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationObject {
    /// Polygon vertices `[x, y]` in pixel coordinates.
    pub polygon: Vec<[f64; 2]>,
}

/// Parsed annotation record.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationRecord {
    pub width: u32,
    pub height: u32,
    pub objects: Vec<AnnotationObject>,
}

/// Largest mask, in pixels, a record may describe.
pub const MAX_MASK_PIXELS: u64 = 1 << 28;

#[derive(Deserialize)]
struct RawObject {
    segmentation: Vec<[f64; 2]>,
}

fn dimension(info: &Value, key: &str) -> PrepResult<u32> {
    let value = info.get(key).and_then(Value::as_u64).unwrap_or(0);
    if value == 0 {
        return Err(PrepError::MissingMetadata("valid width/height"));
    }
    u32::try_from(value).map_err(|_| PrepError::MalformedRecord {
        reason: format!("{key} {value} is too large"),
    })
}

/// Converts parsed JSON into a record.
///
/// Fails with `MissingMetadata` when `info` is absent or empty or when either
/// dimension is missing or zero, and with `MalformedRecord` when the mask
/// would exceed [`MAX_MASK_PIXELS`] or `objects` does not have the expected
/// shape. A missing `objects` field means no objects; an explicit `null` is
/// malformed.
pub fn record_from_value(value: &Value) -> PrepResult<AnnotationRecord> {
    let info = value
        .get("info")
        .filter(|info| info.as_object().is_some_and(|map| !map.is_empty()))
        .ok_or(PrepError::MissingMetadata("info field"))?;
    let width = dimension(info, "width")?;
    let height = dimension(info, "height")?;
    let pixels = u64::from(width) * u64::from(height);
    if pixels > MAX_MASK_PIXELS {
        return Err(PrepError::MalformedRecord {
            reason: format!("mask of {width}x{height} exceeds {MAX_MASK_PIXELS} pixels"),
        });
    }

    let objects = match value.get("objects") {
        None => Vec::new(),
        Some(Value::Null) => {
            return Err(PrepError::MalformedRecord {
                reason: "objects is null".to_string(),
            })
        }
        Some(objects) => Vec::<RawObject>::deserialize(objects)
            .map_err(|err| PrepError::MalformedRecord {
                reason: err.to_string(),
            })?
            .into_iter()
            .map(|raw| AnnotationObject {
                polygon: raw.segmentation,
            })
            .collect(),
    };

    Ok(AnnotationRecord {
        width,
        height,
        objects,
    })
}

/// Parses record text that is already decoded.
pub fn parse_record(text: &str) -> PrepResult<AnnotationRecord> {
    let value: Value = serde_json::from_str(text).map_err(|err| PrepError::MalformedRecord {
        reason: err.to_string(),
    })?;
    record_from_value(&value)
}

/// Decodes raw record bytes and parses them.
///
/// An encoding candidate is accepted only when its text is valid JSON, so
/// bytes that no candidate turns into JSON fail with `UndecodableFile`.
pub fn decode_record(bytes: &[u8]) -> PrepResult<AnnotationRecord> {
    let (value, encoding) = decode_with(&candidate_chain(bytes), bytes, |text| {
        serde_json::from_str::<Value>(text).ok()
    })?;
    trace_event!("decoded", encoding = encoding.name());
    record_from_value(&value)
}

/// Rasterizes every object polygon into one 0/255 mask of the record size.
///
/// Empty polygons are skipped; open polygons are closed before filling.
pub fn rasterize(record: &AnnotationRecord) -> BinaryMask {
    let mut mask = BinaryMask::new(record.width, record.height);
    for object in &record.objects {
        if object.polygon.is_empty() {
            continue;
        }
        fill_polygon(&mut mask, &close_polygon(&object.polygon), 255);
    }
    mask
}

/// Mask file name for a record: its base name up to the first `.`, plus `.png`.
pub fn mask_file_name(source: &Path) -> PrepResult<String> {
    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or(PrepError::InvalidInput("annotation path has no file name"))?;
    let stem = name.split('.').next().unwrap_or(name);
    Ok(format!("{stem}.png"))
}

/// Mask conversion settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskConfig {
    /// Maximum annotation files processed at once.
    pub worker_count: usize,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self { worker_count: 4 }
    }
}

/// Converts annotation files into mask images through a `FileStore`.
pub struct MaskRasterizer<'a, S: FileStore> {
    store: &'a S,
    mask_dir: PathBuf,
}

impl<'a, S: FileStore> MaskRasterizer<'a, S> {
    pub fn new(store: &'a S, mask_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            mask_dir: mask_dir.into(),
        }
    }

    /// Reads, decodes, rasterizes and writes one record; returns the mask path.
    pub fn try_process_file(&self, source: &Path) -> PrepResult<PathBuf> {
        let bytes = self.store.read_bytes(source)?;
        let record = decode_record(&bytes)?;
        let mask = rasterize(&record);
        let output = self.mask_dir.join(mask_file_name(source)?);
        self.store.write_image(&output, &Image::from_mask(&mask)?)?;
        Ok(output)
    }

    /// Like [`try_process_file`](Self::try_process_file) but never fails:
    /// errors are logged with the file name and reported as `false`.
    pub fn process_file(&self, source: &Path) -> bool {
        let _span = trace_span!("rasterize_file").entered();
        match self.try_process_file(source) {
            Ok(_) => true,
            Err(err) => {
                let file = source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let reason = err.to_string();
                trace_warn!("mask_failed", file = file.as_str(), reason = reason.as_str());
                false
            }
        }
    }
}

/// Converts every `*.json` record in `json_dir` into a mask in `mask_dir`
/// using at most `cfg.worker_count` concurrent workers.
///
/// Returns an error only when the pool cannot be built or the directory
/// cannot be listed.
pub fn convert_annotations<S: FileStore>(
    store: &S,
    json_dir: &Path,
    mask_dir: &Path,
    cfg: &MaskConfig,
) -> PrepResult<PoolSummary> {
    let files = store.list_files(json_dir, ANNOTATION_EXTENSIONS)?;
    let pool = WorkerPool::new(cfg.worker_count)?;
    let rasterizer = MaskRasterizer::new(store, mask_dir);
    Ok(pool.run(&files, |file| rasterizer.process_file(file)))
}
