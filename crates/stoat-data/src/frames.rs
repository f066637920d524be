// Frame decoding — image files to planar CHW float data

use std::path::Path;

use image::imageops::FilterType;
use image::GenericImageView;

use crate::{ProviderError, Result};

/// Supported frame extensions (case-insensitive).
const EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "tif", "webp"];

/// Whether a path looks like a decodable frame file.
pub fn is_frame(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Load and decode one frame.
///
/// Returns pixel data in `[C, H, W]` planar layout. Pixel values are raw
/// `0..=255` unless `rescale` is set, in which case each value is
/// multiplied by it (e.g. `1.0 / 255.0` for unit-range inputs).
///
/// `target_size` is (height, width); when set the frame is resized with a
/// Lanczos3 filter before conversion.
pub fn load_frame(
    path: &Path,
    target_size: Option<(u32, u32)>,
    grayscale: bool,
    rescale: Option<f64>,
) -> Result<(Vec<f64>, [usize; 3])> {
    let img = image::open(path).map_err(|e| ProviderError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let img = match target_size {
        Some((h, w)) => img.resize_exact(w, h, FilterType::Lanczos3),
        None => img,
    };

    let (w, h) = img.dimensions();
    let scale = rescale.unwrap_or(1.0);

    let (data, c) = if grayscale {
        let gray = img.to_luma8();
        let data: Vec<f64> = gray.as_raw().iter().map(|&v| v as f64 * scale).collect();
        (data, 1usize)
    } else {
        let rgb = img.to_rgb8();
        let raw = rgb.as_raw();
        // Interleaved [H, W, C] to planar [C, H, W]
        let npix = (w * h) as usize;
        let mut data = vec![0.0f64; 3 * npix];
        for i in 0..npix {
            data[i] = raw[i * 3] as f64 * scale;
            data[npix + i] = raw[i * 3 + 1] as f64 * scale;
            data[2 * npix + i] = raw[i * 3 + 2] as f64 * scale;
        }
        (data, 3usize)
    };

    Ok((data, [c, h as usize, w as usize]))
}
