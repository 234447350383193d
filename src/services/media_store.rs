//! MediaStore — local-disk storage for photo originals and their derived
//! variants. Payloads live beneath `base_path/{kind}/{shard}/{shard}/{file}`;
//! metadata stays on the photo row. Writes stream through a temporary file,
//! compute an MD5 etag on the way, and rename into place.

use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use image::{GenericImageView, ImageFormat, imageops::FilterType};
use md5::Context;
use std::{
    io::{self, Cursor, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

/// Maximum edge of the optimized web variant.
const OPTIMIZED_MAX_EDGE: u32 = 2048;
/// Maximum edge of the watermarked proofing variant.
const WATERMARKED_MAX_EDGE: u32 = 1600;
/// Maximum edge of the thumbnail.
const THUMBNAIL_MAX_EDGE: u32 = 400;

/// Derived-variant kinds and their directory names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Original,
    Optimized,
    Watermarked,
    Thumbnail,
}

impl MediaKind {
    fn dir(self) -> &'static str {
        match self {
            MediaKind::Original => "originals",
            MediaKind::Optimized => "optimized",
            MediaKind::Watermarked => "watermarked",
            MediaKind::Thumbnail => "thumbs",
        }
    }
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media file `{0}` not found")]
    NotFound(String),
    #[error("image processing failed: {0}")]
    Image(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;

/// Result of streaming an original to disk.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub relative_path: String,
    pub size_bytes: i64,
    pub etag: String,
}

/// Relative paths and dimensions produced by variant generation.
#[derive(Debug, Clone)]
pub struct Variants {
    pub optimized: String,
    pub watermarked: String,
    pub thumbnail: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone)]
pub struct MediaStore {
    pub base_path: PathBuf,
}

impl MediaStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Two-level shard identifiers for a filename: first two bytes of
    /// MD5(filename) as lowercase hex. Keeps per-directory file counts low.
    fn shards(filename: &str) -> (String, String) {
        let digest = md5::compute(filename);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Relative path for a variant of `filename`, e.g.
    /// `originals/3f/a1/9b2e….jpg`.
    pub fn relative_path(kind: MediaKind, filename: &str) -> String {
        let (a, b) = Self::shards(filename);
        format!("{}/{}/{}/{}", kind.dir(), a, b, filename)
    }

    fn absolute(&self, relative: &str) -> PathBuf {
        self.base_path.join(relative)
    }

    /// Stream an uploaded original to disk.
    ///
    /// Writes incrementally to a temp file, computes MD5 and size while
    /// streaming, fsyncs, then renames into the sharded location. Temp files
    /// are removed on every error path.
    pub async fn write_original_stream<S>(&self, filename: &str, stream: S) -> MediaResult<StoredFile>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let relative = Self::relative_path(MediaKind::Original, filename);
        let file_path = self.absolute(&relative);
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| MediaError::Io(io::Error::other("media path missing parent")))?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: i64 = 0;
        let mut digest = Context::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(MediaError::Io(err));
                }
            };
            size_bytes += chunk.len() as i64;
            digest.consume(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(MediaError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(MediaError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(MediaError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(MediaError::Io(err));
        }

        Ok(StoredFile {
            relative_path: relative,
            size_bytes,
            etag: format!("{:x}", digest.compute()),
        })
    }

    /// Open a stored file for streaming out. Returns the handle and its size.
    pub async fn open(&self, relative: &str) -> MediaResult<(File, i64)> {
        let path = self.absolute(relative);
        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                MediaError::NotFound(relative.to_string())
            } else {
                MediaError::Io(err)
            }
        })?;
        let len = file.metadata().await?.len() as i64;
        Ok((file, len))
    }

    /// Best-effort removal of a stored file plus empty parent directories.
    pub async fn remove(&self, relative: &str) {
        let path = self.absolute(relative);
        match fs::remove_file(&path).await {
            Ok(_) => debug!("removed media file {}", path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("media file {} already missing", path.display());
            }
            Err(err) => {
                debug!("failed to remove media file {}: {}", path.display(), err);
                return;
            }
        }
        if let Some(parent) = path.parent() {
            self.prune_empty_dirs(parent).await;
        }
    }

    /// Recursively remove empty shard directories up to the media root.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }

    /// Generate the optimized, watermarked and thumbnail variants for an
    /// uploaded original. Blocking (CPU-bound); run on a blocking task.
    pub fn generate_variants(&self, original_relative: &str, stem: &str) -> MediaResult<Variants> {
        let original = self.absolute(original_relative);
        let img = image::open(&original).map_err(|e| MediaError::Image(e.to_string()))?;
        let (width, height) = img.dimensions();

        let optimized_name = format!("{stem}.jpg");
        let optimized_rel = Self::relative_path(MediaKind::Optimized, &optimized_name);
        let optimized = img.resize(OPTIMIZED_MAX_EDGE, OPTIMIZED_MAX_EDGE, FilterType::Lanczos3);
        self.write_jpeg(&optimized_rel, &optimized)?;

        let thumb_name = format!("{stem}.webp");
        let thumb_rel = Self::relative_path(MediaKind::Thumbnail, &thumb_name);
        let thumb = img.thumbnail(THUMBNAIL_MAX_EDGE, THUMBNAIL_MAX_EDGE);
        self.write_webp(&thumb_rel, &thumb)?;

        let wm_name = format!("{stem}.jpg");
        let wm_rel = Self::relative_path(MediaKind::Watermarked, &wm_name);
        let wm = watermark(optimized.resize(
            WATERMARKED_MAX_EDGE,
            WATERMARKED_MAX_EDGE,
            FilterType::Lanczos3,
        ));
        self.write_jpeg(&wm_rel, &wm)?;

        Ok(Variants {
            optimized: optimized_rel,
            watermarked: wm_rel,
            thumbnail: thumb_rel,
            width,
            height,
        })
    }

    fn write_jpeg(&self, relative: &str, img: &image::DynamicImage) -> MediaResult<()> {
        // The JPEG encoder rejects alpha channels.
        let rgb = image::DynamicImage::ImageRgb8(img.to_rgb8());
        let mut buffer = Cursor::new(Vec::new());
        rgb.write_to(&mut buffer, ImageFormat::Jpeg)
            .map_err(|e| MediaError::Image(e.to_string()))?;
        self.write_bytes(relative, buffer.into_inner())
    }

    fn write_webp(&self, relative: &str, img: &image::DynamicImage) -> MediaResult<()> {
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::WebP)
            .map_err(|e| MediaError::Image(e.to_string()))?;
        self.write_bytes(relative, buffer.into_inner())
    }

    fn write_bytes(&self, relative: &str, bytes: Vec<u8>) -> MediaResult<()> {
        let path = self.absolute(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        Ok(())
    }
}

/// Overlay repeating translucent diagonal bands across the image.
fn watermark(img: image::DynamicImage) -> image::DynamicImage {
    let mut rgb = img.to_rgb8();
    for (x, y, px) in rgb.enumerate_pixels_mut() {
        if (x + y) % 400 < 24 {
            for c in px.0.iter_mut() {
                *c = ((u32::from(*c) * 13 + 255 * 3) / 16) as u8;
            }
        }
    }
    image::DynamicImage::ImageRgb8(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_are_sharded_and_stable() {
        let a = MediaStore::relative_path(MediaKind::Original, "abc.jpg");
        let b = MediaStore::relative_path(MediaKind::Original, "abc.jpg");
        assert_eq!(a, b);
        assert!(a.starts_with("originals/"));
        // kind prefix + two shard levels + filename
        assert_eq!(a.split('/').count(), 4);
        assert!(a.ends_with("/abc.jpg"));
    }

    #[test]
    fn variant_kinds_use_distinct_roots() {
        let orig = MediaStore::relative_path(MediaKind::Original, "x.jpg");
        let thumb = MediaStore::relative_path(MediaKind::Thumbnail, "x.webp");
        assert!(orig.starts_with("originals/"));
        assert!(thumb.starts_with("thumbs/"));
    }

    #[tokio::test]
    async fn write_stream_computes_size_and_etag() {
        let dir = std::env::temp_dir().join(format!("media-test-{}", Uuid::new_v4()));
        let store = MediaStore::new(&dir);
        let chunks: Vec<io::Result<Bytes>> =
            vec![Ok(Bytes::from_static(b"hello ")), Ok(Bytes::from_static(b"world"))];
        let stored = store
            .write_original_stream("greeting.txt", futures::stream::iter(chunks))
            .await
            .unwrap();
        assert_eq!(stored.size_bytes, 11);
        assert_eq!(stored.etag, format!("{:x}", md5::compute(b"hello world")));

        let (_, len) = store.open(&stored.relative_path).await.unwrap();
        assert_eq!(len, 11);

        store.remove(&stored.relative_path).await;
        assert!(store.open(&stored.relative_path).await.is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
