// src/present/assets.rs

//! Asset requests and handles.
//!
//! Each asset kind is its own variant carrying its own payload. Images are
//! fully decoded with `image` so that a truncated or corrupt thumbnail is
//! caught at scan time and replaced by the shared fallback. Sounds and fonts
//! only have to exist and be non-empty.

use std::fmt::Debug;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::fs::FileSystem;

/// What to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRequest {
    Image { path: PathBuf, alpha: bool },
    Sound(PathBuf),
    Font { path: PathBuf, size: u16 },
    /// Resolve a path against the asset directory without reading it.
    Path(PathBuf),
}

/// A loaded asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Image(ImageHandle),
    Sound(SoundHandle),
    Font(FontHandle),
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub path: PathBuf,
    pub format: image::ImageFormat,
    pub width: u32,
    pub height: u32,
    pub alpha: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundHandle {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontHandle {
    pub path: PathBuf,
    pub size: u16,
}

pub trait AssetLoader: Send + Sync + Debug {
    fn load(&self, request: &AssetRequest) -> Result<Asset>;

    fn load_image(&self, path: &Path) -> Result<ImageHandle> {
        match self.load(&AssetRequest::Image {
            path: path.to_path_buf(),
            alpha: true,
        })? {
            Asset::Image(img) => Ok(img),
            other => bail!("expected an image from {:?}, got {:?}", path, other),
        }
    }

    fn load_sound(&self, path: &Path) -> Result<SoundHandle> {
        match self.load(&AssetRequest::Sound(path.to_path_buf()))? {
            Asset::Sound(sound) => Ok(sound),
            other => bail!("expected a sound from {:?}, got {:?}", path, other),
        }
    }
}

/// Loader backed by a [`FileSystem`]. Relative paths resolve against `base`.
#[derive(Debug, Clone)]
pub struct FsAssetLoader {
    fs: Arc<dyn FileSystem>,
    base: PathBuf,
}

impl FsAssetLoader {
    pub fn new(fs: Arc<dyn FileSystem>, base: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            base: base.into(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.base.join(path)
    }

    fn read_non_empty(&self, path: &Path) -> Result<Vec<u8>> {
        let bytes = self.fs.read(path)?;
        if bytes.is_empty() {
            bail!("asset {:?} is empty", path);
        }
        Ok(bytes)
    }
}

impl AssetLoader for FsAssetLoader {
    fn load(&self, request: &AssetRequest) -> Result<Asset> {
        match request {
            AssetRequest::Image { path, alpha } => {
                let path = self.resolve(path);
                let bytes = self.read_non_empty(&path)?;
                let (format, width, height) = decode_image(&bytes)
                    .with_context(|| format!("decoding image {:?}", path))?;
                Ok(Asset::Image(ImageHandle {
                    path,
                    format,
                    width,
                    height,
                    alpha: *alpha,
                }))
            }
            AssetRequest::Sound(path) => {
                let path = self.resolve(path);
                self.read_non_empty(&path)?;
                Ok(Asset::Sound(SoundHandle { path }))
            }
            AssetRequest::Font { path, size } => {
                let path = self.resolve(path);
                self.read_non_empty(&path)?;
                Ok(Asset::Font(FontHandle { path, size: *size }))
            }
            AssetRequest::Path(path) => Ok(Asset::Path(self.resolve(path))),
        }
    }
}

fn decode_image(bytes: &[u8]) -> Result<(image::ImageFormat, u32, u32)> {
    let reader = image::ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader.format().context("unrecognized image format")?;
    let decoded = reader.decode()?;
    Ok((format, decoded.width(), decoded.height()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn loader(fs: &MockFileSystem) -> FsAssetLoader {
        FsAssetLoader::new(Arc::new(fs.clone()), "/assets")
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::new_rgba8(width, height)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn images_are_decoded() {
        let fs = MockFileSystem::new();
        fs.add_file("/assets/logo.png", png(4, 3));
        fs.add_file("/assets/notes.txt", "hello");

        let img = loader(&fs).load_image(Path::new("logo.png")).unwrap();
        assert_eq!(img.format, image::ImageFormat::Png);
        assert_eq!((img.width, img.height), (4, 3));
        assert_eq!(img.path, PathBuf::from("/assets/logo.png"));

        assert!(loader(&fs).load_image(Path::new("notes.txt")).is_err());
        assert!(loader(&fs).load_image(Path::new("missing.png")).is_err());
    }

    #[test]
    fn truncated_image_is_rejected() {
        let fs = MockFileSystem::new();
        let mut bytes = png(8, 8);
        bytes.truncate(bytes.len() / 2);
        fs.add_file("/assets/half.png", bytes);
        fs.add_file("/assets/garbage.png", b"\x89PNG\r\n\x1a\ntruncated-garbage".to_vec());

        assert!(loader(&fs).load_image(Path::new("half.png")).is_err());
        assert!(loader(&fs).load_image(Path::new("garbage.png")).is_err());
    }

    #[test]
    fn absolute_paths_ignore_base() {
        let fs = MockFileSystem::new();
        fs.add_file("/games/pong/thumb.png", png(2, 2));
        let img = loader(&fs)
            .load_image(Path::new("/games/pong/thumb.png"))
            .unwrap();
        assert_eq!(img.path, PathBuf::from("/games/pong/thumb.png"));
    }

    #[test]
    fn sounds_must_not_be_empty() {
        let fs = MockFileSystem::new();
        fs.add_file("/assets/boot.wav", "");
        assert!(loader(&fs).load_sound(Path::new("boot.wav")).is_err());
    }
}
