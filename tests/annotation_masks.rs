mod common;

use common::MemoryStore;
use std::path::{Path, PathBuf};
use vesselprep::annotation::decode::{decode_text, TextEncoding};
use vesselprep::annotation::{convert_annotations, decode_record, parse_record, rasterize};
use vesselprep::util::{PrepError, PrepResult};
use vesselprep::{AnnotationObject, AnnotationRecord, FileStore, Image, MaskConfig, PoolSummary};

fn square(x: f64, y: f64, side: f64) -> Vec<[f64; 2]> {
    vec![[x, y], [x + side, y], [x + side, y + side], [x, y + side]]
}

fn record_json(width: u32, height: u32, polygons: &[Vec<[f64; 2]>]) -> String {
    let objects: Vec<String> = polygons
        .iter()
        .map(|p| {
            let pts: Vec<String> = p.iter().map(|v| format!("[{}, {}]", v[0], v[1])).collect();
            format!(r#"{{"segmentation": [{}]}}"#, pts.join(", "))
        })
        .collect();
    format!(
        r#"{{"info": {{"width": {width}, "height": {height}}}, "objects": [{}]}}"#,
        objects.join(", ")
    )
}

#[test]
fn latin1_record_decodes_through_fallback() {
    let mut bytes = br#"{"info": {"width": 6, "height": 5, "author": "Jos"#.to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(br#""}, "objects": []}"#);
    assert!(std::str::from_utf8(&bytes).is_err());

    let record = decode_record(&bytes).unwrap();
    assert_eq!((record.width, record.height), (6, 5));
    assert!(record.objects.is_empty());
}

#[test]
fn gbk_record_decodes() {
    let (encoded, _, had_errors) =
        encoding_rs::GBK.encode(r#"{"info": {"width": 3, "height": 2, "name": "青花瓷碗"}}"#);
    assert!(!had_errors);
    let record = decode_record(&encoded).unwrap();
    assert_eq!((record.width, record.height), (3, 2));
}

#[test]
fn utf8_text_keeps_its_characters() {
    let (text, encoding) = decode_text("碗 bowl".as_bytes()).unwrap();
    assert_eq!(text, "碗 bowl");
    assert_ne!(encoding, TextEncoding::Latin1);
}

#[test]
fn binary_garbage_is_undecodable() {
    let bytes = [0xFFu8, 0xFE, 0x00, 0x81, 0x7F, 0x10];
    assert_eq!(decode_record(&bytes).unwrap_err(), PrepError::UndecodableFile);
}

#[test]
fn disjoint_squares_rasterize_to_their_union() {
    let a = square(1.0, 1.0, 3.0);
    let b = square(6.0, 2.0, 3.0);
    let record = parse_record(&record_json(12, 8, &[a.clone(), b.clone()])).unwrap();
    let mask = rasterize(&record);

    let single = |polygon: Vec<[f64; 2]>| {
        rasterize(&AnnotationRecord {
            width: 12,
            height: 8,
            objects: vec![AnnotationObject { polygon }],
        })
    };
    let (ma, mb) = (single(a), single(b));
    for ((m, pa), pb) in mask.as_raw().iter().zip(ma.as_raw()).zip(mb.as_raw()) {
        assert_eq!(*m, (*pa).max(*pb));
    }

    let set: Vec<(u32, u32)> = mask
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] == 255)
        .map(|(x, y, _)| (x, y))
        .collect();
    assert_eq!(set.len(), 18);
    assert!(set.contains(&(1, 1)) && set.contains(&(3, 3)));
    assert!(set.contains(&(6, 2)) && set.contains(&(8, 4)));
    assert!(!set.contains(&(4, 1)) && !set.contains(&(9, 2)));
}

#[test]
fn empty_object_list_gives_blank_mask() {
    let record = parse_record(&record_json(7, 3, &[])).unwrap();
    let mask = rasterize(&record);
    assert_eq!(mask.dimensions(), (7, 3));
    assert!(mask.as_raw().iter().all(|&v| v == 0));
}

#[test]
fn polygon_outside_canvas_is_clipped() {
    let record = parse_record(&record_json(4, 4, &[square(-2.0, -2.0, 4.0)])).unwrap();
    let mask = rasterize(&record);
    let set = mask.as_raw().iter().filter(|&&v| v == 255).count();
    assert_eq!(set, 4);
}

#[test]
fn pool_converts_every_record_once_and_counts_failures() {
    let store = MemoryStore::default();
    for i in 0..6 {
        let json = record_json(10, 10, &[square(i as f64, 1.0, 3.0)]);
        store.insert_bytes(format!("labels/img_{i}.json"), json.into_bytes());
    }
    store.insert_bytes("labels/broken.json", br#"{"objects": []}"#.to_vec());
    store.insert_bytes("labels/readme.md", b"ignored".to_vec());

    let summary = convert_annotations(
        &store,
        Path::new("labels"),
        Path::new("masks"),
        &MaskConfig { worker_count: 2 },
    )
    .unwrap();
    assert_eq!(
        summary,
        PoolSummary {
            succeeded: 6,
            failed: 1
        }
    );

    let mut reads = store.reads();
    reads.sort();
    let mut expected: Vec<PathBuf> = (0..6)
        .map(|i| PathBuf::from(format!("labels/img_{i}.json")))
        .collect();
    expected.push(PathBuf::from("labels/broken.json"));
    expected.sort();
    assert_eq!(reads, expected);

    assert_eq!(store.written_count(), 6);
    let mask = store.written("masks/img_3.png").unwrap();
    assert_eq!((mask.width(), mask.height(), mask.channels()), (10, 10, 1));
    assert_eq!(mask.pixel(3, 1).unwrap(), &[255][..]);
    assert_eq!(mask.pixel(0, 0).unwrap(), &[0][..]);
    assert!(store.written("masks/broken.png").is_none());
}

fn store_with_good_records(count: usize) -> MemoryStore {
    let store = MemoryStore::default();
    for i in 0..count {
        let json = record_json(8, 8, &[square(1.0, 1.0, 2.0 + i as f64)]);
        store.insert_bytes(format!("labels/good_{i}.json"), json.into_bytes());
    }
    store
}

#[test]
fn oversized_record_fails_alone() {
    let store = store_with_good_records(3);
    store.insert_bytes(
        "labels/huge.json",
        br#"{"info": {"width": 4294967295, "height": 4294967295}, "objects": []}"#.to_vec(),
    );

    let summary = convert_annotations(
        &store,
        Path::new("labels"),
        Path::new("masks"),
        &MaskConfig { worker_count: 2 },
    )
    .unwrap();
    assert_eq!(
        summary,
        PoolSummary {
            succeeded: 3,
            failed: 1
        }
    );
    assert_eq!(store.written_count(), 3);
    assert!(store.written("masks/huge.png").is_none());
}

/// Store whose reads of one file panic.
struct PanicOnRead {
    inner: MemoryStore,
    poisoned: PathBuf,
}

impl FileStore for PanicOnRead {
    fn read_image(&self, path: &Path) -> PrepResult<Image> {
        self.inner.read_image(path)
    }

    fn write_image(&self, path: &Path, image: &Image) -> PrepResult<()> {
        self.inner.write_image(path, image)
    }

    fn list_files(&self, dir: &Path, extensions: &[&str]) -> PrepResult<Vec<PathBuf>> {
        self.inner.list_files(dir, extensions)
    }

    fn read_bytes(&self, path: &Path) -> PrepResult<Vec<u8>> {
        if path == self.poisoned {
            panic!("read of {} blew up", path.display());
        }
        self.inner.read_bytes(path)
    }
}

#[test]
fn panicking_file_does_not_abort_the_others() {
    let inner = store_with_good_records(4);
    inner.insert_bytes("labels/good_9.json", record_json(8, 8, &[]).into_bytes());
    let store = PanicOnRead {
        inner,
        poisoned: PathBuf::from("labels/good_9.json"),
    };

    let summary = convert_annotations(
        &store,
        Path::new("labels"),
        Path::new("masks"),
        &MaskConfig { worker_count: 2 },
    )
    .unwrap();
    assert_eq!(
        summary,
        PoolSummary {
            succeeded: 4,
            failed: 1
        }
    );
    assert_eq!(store.inner.written_count(), 4);
}

#[test]
fn zero_workers_is_an_error() {
    let store = MemoryStore::default();
    let err = convert_annotations(
        &store,
        Path::new("labels"),
        Path::new("masks"),
        &MaskConfig { worker_count: 0 },
    )
    .unwrap_err();
    assert!(matches!(err, PrepError::InvalidInput(_)));
}
