//! File access seam used by the batch drivers.
//!
//! The pipelines never touch the filesystem directly; they go through a
//! `FileStore`. `FsStore` is the disk-backed implementation (feature
//! `image-io`); tests substitute in-memory stores.

use crate::image::Image;
use crate::util::PrepResult;
use std::path::{Path, PathBuf};

/// Extensions recognized as input photographs.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Extension of annotation records.
pub const ANNOTATION_EXTENSIONS: &[&str] = &["json"];

/// Storage operations the pipelines depend on.
///
/// Implementations must be shareable across worker threads.
pub trait FileStore: Sync {
    /// Reads and decodes an image, failing with `NotFound` or `Unreadable`.
    fn read_image(&self, path: &Path) -> PrepResult<Image>;

    /// Encodes and writes an image.
    fn write_image(&self, path: &Path, image: &Image) -> PrepResult<()>;

    /// Lists files in `dir` whose extension matches one of `extensions`
    /// (case-insensitive), in a stable order.
    fn list_files(&self, dir: &Path, extensions: &[&str]) -> PrepResult<Vec<PathBuf>>;

    /// Reads a file's raw bytes.
    fn read_bytes(&self, path: &Path) -> PrepResult<Vec<u8>>;
}

/// Returns `true` when `path` has one of `extensions`, ignoring ASCII case.
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

#[cfg(feature = "image-io")]
pub use fs::FsStore;

#[cfg(feature = "image-io")]
mod fs {
    use super::{has_extension, FileStore};
    use crate::image::io::{load_image, save_image};
    use crate::image::Image;
    use crate::util::{PrepError, PrepResult};
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    /// Disk-backed store using the `image` crate codecs.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct FsStore;

    fn io_error(path: &Path, err: std::io::Error) -> PrepError {
        if err.kind() == ErrorKind::NotFound {
            PrepError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            PrepError::Unreadable {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        }
    }

    impl FileStore for FsStore {
        fn read_image(&self, path: &Path) -> PrepResult<Image> {
            load_image(path)
        }

        fn write_image(&self, path: &Path, image: &Image) -> PrepResult<()> {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|err| PrepError::WriteFailed {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                })?;
            }
            save_image(path, image)
        }

        fn list_files(&self, dir: &Path, extensions: &[&str]) -> PrepResult<Vec<PathBuf>> {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(dir).map_err(|err| io_error(dir, err))? {
                let path = entry.map_err(|err| io_error(dir, err))?.path();
                if path.is_file() && has_extension(&path, extensions) {
                    files.push(path);
                }
            }
            files.sort();
            Ok(files)
        }

        fn read_bytes(&self, path: &Path) -> PrepResult<Vec<u8>> {
            std::fs::read(path).map_err(|err| io_error(path, err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{has_extension, IMAGE_EXTENSIONS};
    use std::path::Path;

    #[test]
    fn extension_match_ignores_case() {
        assert!(has_extension(Path::new("a/b/c.JPG"), IMAGE_EXTENSIONS));
        assert!(has_extension(Path::new("bowl.bmp"), IMAGE_EXTENSIONS));
        assert!(!has_extension(Path::new("bowl.tiff"), IMAGE_EXTENSIONS));
        assert!(!has_extension(Path::new("png"), IMAGE_EXTENSIONS));
    }
}
