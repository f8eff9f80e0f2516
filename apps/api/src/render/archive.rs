//! ZIP packaging of rasterized pages.

use std::io::{Cursor, Write};

use image::{ImageError, ImageFormat, RgbaImage};
use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::render::raster::RasterOutcome;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("png encoding error: {0}")]
    Image(#[from] ImageError),
}

/// Packs the outcome into a ZIP: `page_001.png`, `page_002.png`, … or, for a
/// placeholder, `error.png` plus `error.txt`.
pub fn build_zip(outcome: &RasterOutcome) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    // PNG data is already deflated.
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    match outcome {
        RasterOutcome::Pages(pages) => {
            for (idx, page) in pages.iter().enumerate() {
                writer.start_file(format!("page_{:03}.png", idx + 1), options)?;
                writer.write_all(&encode_png(page)?)?;
            }
        }
        RasterOutcome::Placeholder { image, message } => {
            writer.start_file("error.png", options)?;
            writer.write_all(&encode_png(image)?)?;
            writer.start_file("error.txt", options)?;
            writer.write_all(message.as_bytes())?;
        }
    }

    Ok(writer.finish()?.into_inner())
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ImageError> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}
