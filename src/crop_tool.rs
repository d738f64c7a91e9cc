//! Leaf image acquisition and crop-to-224 rasterization.
//!
//! A selected image owns a JPEG preview written to a temp file (the
//! terminal analogue of a browser object URL). Replacing or dropping
//! the image deletes the preview, so handles never leak across
//! selections.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, WorkflowError};

/// Side length of the square payload the prediction service expects.
pub const CROP_TARGET_SIZE: u32 = 224;

/// JPEG quality used for both the artifact and the preview.
pub const JPEG_QUALITY: u8 = 95;

/// Fraction of the frame covered by the default crop rectangle.
const DEFAULT_CROP_AREA: f64 = 0.8;

/// Crop rectangle in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The fixed-size compressed payload exchanged with the prediction
/// service. Exactly one exists per image at a time.
#[derive(Debug, Clone)]
pub struct CroppedArtifact {
    bytes: Vec<u8>,
}

impl CroppedArtifact {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A user-selected leaf image plus its on-disk preview handle.
pub struct LeafImage {
    source_path: PathBuf,
    decoded: DynamicImage,
    preview: NamedTempFile,
}

impl LeafImage {
    /// Load and decode an image file, writing a JPEG preview to a temp
    /// file. The previous image's preview (if any) is released when the
    /// old `LeafImage` is dropped.
    pub async fn select(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| WorkflowError::Image(format!("Failed to read {:?}: {}", path, e)))?;

        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| WorkflowError::Image(format!("Failed to decode {:?}: {}", path, e)))?;

        let preview_jpeg = encode_jpeg(&decoded)?;
        let mut preview = tempfile::Builder::new()
            .prefix("leaf-preview-")
            .suffix(".jpg")
            .tempfile()
            .map_err(|e| WorkflowError::Image(format!("Failed to create preview: {}", e)))?;
        preview
            .write_all(&preview_jpeg)
            .and_then(|_| preview.flush())
            .map_err(|e| WorkflowError::Image(format!("Failed to write preview: {}", e)))?;

        debug!(
            "Selected image {:?} ({}x{}), preview at {:?}",
            path,
            decoded.width(),
            decoded.height(),
            preview.path()
        );

        Ok(Self {
            source_path: path.to_path_buf(),
            decoded,
            preview,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn preview_path(&self) -> &Path {
        self.preview.path()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.decoded.dimensions()
    }

    /// Region covering the whole frame.
    pub fn full_region(&self) -> CropRegion {
        let (width, height) = self.dimensions();
        CropRegion {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Centered region covering 80% of the frame, matching the initial
    /// rectangle an interactive crop widget would offer.
    pub fn default_region(&self) -> CropRegion {
        let (width, height) = self.dimensions();
        let w = ((width as f64) * DEFAULT_CROP_AREA).round().max(1.0) as u32;
        let h = ((height as f64) * DEFAULT_CROP_AREA).round().max(1.0) as u32;
        CropRegion {
            x: (width - w) / 2,
            y: (height - h) / 2,
            width: w,
            height: h,
        }
    }

    /// Rasterize `region` into a 224x224 JPEG artifact. The region is
    /// clamped to the image bounds; a region entirely outside the frame
    /// is an error.
    pub fn crop_to_artifact(&self, region: &CropRegion) -> Result<CroppedArtifact> {
        let (img_w, img_h) = self.dimensions();

        let x = region.x.min(img_w.saturating_sub(1));
        let y = region.y.min(img_h.saturating_sub(1));
        let width = region.width.min(img_w - x);
        let height = region.height.min(img_h - y);

        if width == 0 || height == 0 {
            return Err(WorkflowError::Image(
                "Crop region is empty after clamping to the image".to_string(),
            ));
        }

        let cropped = self.decoded.crop_imm(x, y, width, height);
        let resized = cropped.resize_exact(CROP_TARGET_SIZE, CROP_TARGET_SIZE, FilterType::Triangle);
        let bytes = encode_jpeg(&resized)?;

        debug!(
            "Cropped {}x{}+{}+{} -> {} byte artifact",
            width,
            height,
            x,
            y,
            bytes.len()
        );

        Ok(CroppedArtifact { bytes })
    }
}

fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>> {
    // JPEG has no alpha channel; flatten first.
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| WorkflowError::Image(format!("JPEG encoding failed: {}", e)))?;
    Ok(out)
}
