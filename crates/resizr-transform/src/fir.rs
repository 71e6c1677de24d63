//! CPU transformer: `image` for decode and encode, `fast_image_resize`
//! (SIMD-accelerated Lanczos3) for crop-and-scale. RGBA8 throughout.

use fast_image_resize as fir;
use fir::images::Image;
use fir::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageError, ImageReader, RgbaImage};
use resizr_core::ports::ImageTransformer;
use resizr_core::{CropRect, Error, OutputFormat, ResizePlan, Result, Size};
use std::io::Cursor;

/// Production [`ImageTransformer`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FirTransformer;

impl FirTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl ImageTransformer for FirTransformer {
    fn source_size(&self, source: &[u8]) -> Result<Size> {
        let reader = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| Error::Decode(e.to_string()))?;
        if reader.format().is_none() {
            return Err(Error::Decode("unrecognized source image data".to_string()));
        }
        let (width, height) = reader.into_dimensions().map_err(decode_error)?;
        Ok(Size::new(width, height))
    }

    fn apply(
        &self,
        source: &[u8],
        plan: &ResizePlan,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>> {
        let decoded = image::load_from_memory(source).map_err(decode_error)?;
        let rgba = decoded.into_rgba8();
        let decoded_size = Size::new(rgba.width(), rgba.height());
        if decoded_size != plan.source {
            return Err(Error::Transform(format!(
                "planned for {} but decoded {}",
                plan.source, decoded_size
            )));
        }

        // Pixels pass through untouched when no scaling is needed.
        if plan.is_identity_scale() {
            let region = match plan.crop {
                Some(c) => {
                    image::imageops::crop_imm(&rgba, c.x, c.y, c.width, c.height).to_image()
                }
                None => rgba,
            };
            return encode(region, format, quality);
        }

        encode(resample(rgba, plan.crop, plan.output)?, format, quality)
    }
}

/// Crop and scale in one pass, reading the crop box straight from `source`.
fn resample(source: RgbaImage, crop: Option<CropRect>, output: Size) -> Result<RgbaImage> {
    let (width, height) = source.dimensions();
    let src = Image::from_vec_u8(width, height, source.into_raw(), PixelType::U8x4)
        .map_err(|e| Error::Transform(e.to_string()))?;
    let mut dst = Image::new(output.width, output.height, PixelType::U8x4);

    let mut options =
        ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
    if let Some(c) = crop {
        options = options.crop(
            f64::from(c.x),
            f64::from(c.y),
            f64::from(c.width),
            f64::from(c.height),
        );
    }
    Resizer::new()
        .resize(&src, &mut dst, &options)
        .map_err(|e| Error::Transform(e.to_string()))?;

    RgbaImage::from_raw(output.width, output.height, dst.into_vec())
        .ok_or_else(|| Error::Transform("resampled buffer has the wrong length".to_string()))
}

fn encode(image: RgbaImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let (width, height) = image.dimensions();
    let written = match format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image).into_rgb8();
            JpegEncoder::new_with_quality(&mut out, quality).write_image(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )
        }
        OutputFormat::Png => PngEncoder::new(&mut out).write_image(
            image.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
    };
    written.map_err(encode_error)?;
    Ok(out)
}

/// Anything that goes wrong reading the source means it is unreadable.
fn decode_error(err: ImageError) -> Error {
    Error::Decode(err.to_string())
}

fn encode_error(err: ImageError) -> Error {
    match err {
        ImageError::Unsupported(e) => Error::UnsupportedFormat(e.to_string()),
        other => Error::Transform(other.to_string()),
    }
}
