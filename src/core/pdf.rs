use std::io::Cursor;

use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage, RgbImage};

use super::errors::RenderError;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

pub struct RenderedPage {
    pub number: u32,
    pub image: DynamicImage,
}

impl RenderedPage {
    pub fn decode(number: u32, png_bytes: &[u8]) -> Result<Self, RenderError> {
        let image = image::load_from_memory(png_bytes).map_err(|err| RenderError::Rasterize {
            page: number,
            reason: format!("unreadable page image: {err}"),
        })?;
        Ok(Self { number, image })
    }
}

/// Stacks pages top to bottom in the given order on an opaque white canvas
/// as wide as the widest page.
pub fn stitch_vertically(pages: &[RenderedPage]) -> RgbImage {
    let width = pages.iter().map(|p| p.image.width()).max().unwrap_or(0);
    let height = pages.iter().map(|p| p.image.height()).sum::<u32>();

    let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);
    let mut offset = 0_i64;
    for page in pages {
        imageops::overlay(&mut canvas, &page.image.to_rgba8(), 0, offset);
        offset += i64::from(page.image.height());
    }

    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, RenderError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|err| RenderError::Image(format!("PNG encode failed: {err}")))?;
    Ok(buffer.into_inner())
}
