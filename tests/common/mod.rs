#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use vesselprep::store::has_extension;
use vesselprep::{FileStore, Image, PrepError, PrepResult};

/// In-memory `FileStore` that also records every read.
#[derive(Default)]
pub struct MemoryStore {
    images: Mutex<HashMap<PathBuf, Image>>,
    bytes: Mutex<HashMap<PathBuf, Vec<u8>>>,
    written: Mutex<HashMap<PathBuf, Image>>,
    reads: Mutex<Vec<PathBuf>>,
}

impl MemoryStore {
    pub fn insert_image(&self, path: impl Into<PathBuf>, image: Image) {
        self.images.lock().unwrap().insert(path.into(), image);
    }

    pub fn insert_bytes(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.bytes.lock().unwrap().insert(path.into(), bytes.into());
    }

    pub fn written(&self, path: impl AsRef<Path>) -> Option<Image> {
        self.written.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn written_count(&self) -> usize {
        self.written.lock().unwrap().len()
    }

    pub fn reads(&self) -> Vec<PathBuf> {
        self.reads.lock().unwrap().clone()
    }
}

impl FileStore for MemoryStore {
    fn read_image(&self, path: &Path) -> PrepResult<Image> {
        self.reads.lock().unwrap().push(path.to_path_buf());
        self.images
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or(PrepError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn write_image(&self, path: &Path, image: &Image) -> PrepResult<()> {
        self.written
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), image.clone());
        Ok(())
    }

    fn list_files(&self, dir: &Path, extensions: &[&str]) -> PrepResult<Vec<PathBuf>> {
        let images = self.images.lock().unwrap();
        let bytes = self.bytes.lock().unwrap();
        let mut files: Vec<PathBuf> = images
            .keys()
            .chain(bytes.keys())
            .filter(|p| p.parent() == Some(dir) && has_extension(p, extensions))
            .cloned()
            .collect();
        files.sort();
        files.dedup();
        Ok(files)
    }

    fn read_bytes(&self, path: &Path) -> PrepResult<Vec<u8>> {
        self.reads.lock().unwrap().push(path.to_path_buf());
        self.bytes
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or(PrepError::NotFound {
                path: path.to_path_buf(),
            })
    }
}

/// Dark color photograph with a bright disk.
pub fn disk_photo(
    width: usize,
    height: usize,
    center: (f64, f64),
    radius: f64,
    disk: [u8; 3],
    background: [u8; 3],
) -> Image {
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let dx = x as f64 - center.0;
            let dy = y as f64 - center.1;
            let px = if dx * dx + dy * dy <= radius * radius {
                disk
            } else {
                background
            };
            data.extend_from_slice(&px);
        }
    }
    Image::new(data, width, height, 3).unwrap()
}
