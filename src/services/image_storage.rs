use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Image formats accepted by the upload endpoint, detected from the payload
/// itself rather than from the declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageKind {
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]) {
            Some(ImageKind::Png)
        } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
            Some(ImageKind::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }
}

/// The file-storage collaborator: one optional attached blob per recipe,
/// replaced wholesale on each upload. References handed out are relative to
/// the media root, e.g. `recipe/<uuid>.png`.
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ImageStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self, bytes: &[u8], kind: ImageKind) -> io::Result<String> {
        let reference = format!("recipe/{}.{}", Uuid::new_v4(), kind.extension());
        let full = self.root.join(&reference);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, bytes)?;
        Ok(reference)
    }

    pub fn delete(&self, reference: &str) -> io::Result<()> {
        fs::remove_file(self.root.join(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00];

    #[test]
    fn detects_known_formats() {
        assert_eq!(ImageKind::detect(PNG_HEADER), Some(ImageKind::Png));
        assert_eq!(
            ImageKind::detect(&[0xff, 0xd8, 0xff, 0xe0]),
            Some(ImageKind::Jpeg)
        );
        assert_eq!(ImageKind::detect(b"GIF89a trailing"), Some(ImageKind::Gif));
        assert_eq!(
            ImageKind::detect(b"RIFF\x00\x00\x00\x00WEBPVP8 "),
            Some(ImageKind::Webp)
        );
    }

    #[test]
    fn rejects_non_image_payloads() {
        assert_eq!(ImageKind::detect(b"not an image"), None);
        assert_eq!(ImageKind::detect(b""), None);
    }

    #[test]
    fn store_and_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let reference = store.store(PNG_HEADER, ImageKind::Png).unwrap();
        assert!(reference.starts_with("recipe/"));
        assert!(reference.ends_with(".png"));
        assert!(dir.path().join(&reference).exists());

        store.delete(&reference).unwrap();
        assert!(!dir.path().join(&reference).exists());
    }
}
