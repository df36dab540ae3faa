//! Block pixelation of a single image, from locator to PNG data URI.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageError, ImageFormat, Rgba, RgbaImage};
use shared::protocol::TransformResult;
use thiserror::Error;
use tracing::{debug, trace};

pub mod loader;

pub use loader::{
    decode_data_uri, DataUriLoader, FileLoader, HttpLoader, ImageLoader, LoadError, MemoryLoader,
    SchemeLoader,
};

/// Edge of every sampled block, in pixels.
pub const BLOCK_SIZE: u32 = 20;
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("failed to decode image: {0}")]
    Decode(#[source] ImageError),
    #[error("failed to encode image: {0}")]
    Encode(#[source] ImageError),
    #[error("raster worker stopped: {0}")]
    Worker(String),
}

/// `#rrggbb`, two lowercase digits per channel.
pub fn hex_color([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Repaints `source` as a grid of `BLOCK_SIZE` squares, each filled with the opaque
/// colour of its top-left pixel. Blocks on the right and bottom edges are clipped.
pub fn pixelate(source: &RgbaImage) -> RgbaImage {
    let (width, height) = source.dimensions();
    let mut canvas = source.clone();

    for row in (0..height).step_by(BLOCK_SIZE as usize) {
        for col in (0..width).step_by(BLOCK_SIZE as usize) {
            // Alpha is dropped, not premultiplied: a fully transparent pixel keeps its
            // stored rgb instead of reading back as black.
            let Rgba([r, g, b, _]) = *source.get_pixel(col, row);
            trace!(x = col, y = row, color = %hex_color([r, g, b]), "pixelate: fill block");
            let fill = Rgba([r, g, b, u8::MAX]);
            for y in row..(row + BLOCK_SIZE).min(height) {
                for x in col..(col + BLOCK_SIZE).min(width) {
                    canvas.put_pixel(x, y, fill);
                }
            }
        }
    }

    canvas
}

pub fn decode_raster(bytes: &[u8]) -> Result<RgbaImage, PipelineError> {
    let image = image::load_from_memory(bytes).map_err(PipelineError::Decode)?;
    Ok(image.to_rgba8())
}

pub fn encode_png_data_uri(raster: &RgbaImage) -> Result<String, PipelineError> {
    let mut png = Vec::new();
    raster
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(PipelineError::Encode)?;
    Ok(format!("{PNG_DATA_URI_PREFIX}{}", STANDARD.encode(png)))
}

/// Load, pixelate and re-encode. Errors are returned for callers that want them;
/// message handlers use [`transform`].
pub async fn try_transform(
    loader: &dyn ImageLoader,
    locator: &str,
) -> Result<String, PipelineError> {
    let bytes = loader.load(locator).await?;
    tokio::task::spawn_blocking(move || {
        let raster = decode_raster(&bytes)?;
        debug!(
            width = raster.width(),
            height = raster.height(),
            "pixelate: image decoded"
        );
        encode_png_data_uri(&pixelate(&raster))
    })
    .await
    .map_err(|err| PipelineError::Worker(err.to_string()))?
}

/// Never fails: any problem becomes an `ERROR` result carrying the old locator.
/// A loader that never finishes leaves this future pending forever.
pub async fn transform(loader: &dyn ImageLoader, locator: &str) -> TransformResult {
    match try_transform(loader, locator).await {
        Ok(data_uri) => TransformResult::ok(locator, data_uri),
        Err(err) => {
            debug!(locator, error = %err, "pixelate: transform failed");
            TransformResult::error(locator)
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
