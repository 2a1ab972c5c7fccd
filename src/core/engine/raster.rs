//! JPEG/PNG/TIFF transform engine: eager per-operation execution backed by
//! `image` for decode/crop/encode and `fast_image_resize` for resampling.

use fast_image_resize as fir;
use image::{DynamicImage, GenericImageView};

use crate::core::engine::EngineError;
use crate::core::handle::ImageHandle;
use crate::core::point::Point;

/// Decodes the handle's current bytes. Every mutating operation decodes,
/// transforms, and re-encodes — there is no persistent decoded buffer kept
/// across operations, trading a little CPU for not having to smuggle a
/// `DynamicImage` through the handle's otherwise format-agnostic bytes field.
fn decode(handle: &ImageHandle) -> Result<DynamicImage, EngineError> {
	image::load_from_memory(&handle.bytes).map_err(|e| EngineError::Transform(e.to_string()))
}

fn encode(img: &DynamicImage, format: image::ImageFormat, quality: i64) -> Result<Vec<u8>, EngineError> {
	let mut out = Vec::new();
	let mut cursor = std::io::Cursor::new(&mut out);
	match format {
		image::ImageFormat::Jpeg => {
			let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality.clamp(1, 100) as u8);
			img.write_with_encoder(encoder).map_err(|e| EngineError::Transform(e.to_string()))?;
		}
		_ => img.write_to(&mut cursor, format).map_err(|e| EngineError::Transform(e.to_string()))?,
	}
	Ok(out)
}

fn resize_to(img: &DynamicImage, new_w: i64, new_h: i64, bicubic_threshold: i64) -> Result<DynamicImage, EngineError> {
	let (src_w, src_h) = (img.width(), img.height());
	// Bicubic for smaller targets (sharper on the common thumbnail case),
	// bilinear above the threshold where the extra sharpness cost isn't
	// worth it — mirrors the original engine's bicubic/bilinear split.
	let filter = if new_w <= bicubic_threshold { fir::FilterType::CatmullRom } else { fir::FilterType::Bilinear };
	let alg = fir::ResizeAlg::Convolution(filter);

	let rgba = img.to_rgba8();
	let src_image =
		fir::Image::from_vec_u8(src_w, src_h, rgba.into_raw(), fir::PixelType::U8x4).map_err(|e| EngineError::Transform(e.to_string()))?;
	let mut dst_image = fir::Image::new(new_w as u32, new_h as u32, fir::PixelType::U8x4);
	let mut resizer = fir::Resizer::new(alg);
	resizer.resize(&src_image.view(), &mut dst_image.view_mut()).map_err(|e| EngineError::Transform(e.to_string()))?;

	let buffer =
		image::RgbaImage::from_raw(new_w as u32, new_h as u32, dst_image.buffer().to_vec()).ok_or_else(|| EngineError::Transform("buffer size mismatch after resize".to_string()))?;
	Ok(DynamicImage::ImageRgba8(buffer))
}

pub fn resize(handle: &mut ImageHandle, new_width: i64, new_height: i64) -> Result<(), EngineError> {
	let img = decode(handle)?;
	let bicubic_threshold = match &handle.engine {
		crate::core::handle::EngineState::Raster(state) => state.bicubic_threshold,
		_ => 300,
	};
	let resized = resize_to(&img, new_width, new_height, bicubic_threshold)?;
	let format = image::ImageFormat::from_mime_type(handle.mime.mime()).unwrap_or(image::ImageFormat::Jpeg);
	handle.bytes = encode(&resized, format, 100)?;
	handle.width = new_width;
	handle.height = new_height;
	Ok(())
}

/// Crops at `(x, y, w, h)`. The operation builder doesn't pre-filter crop
/// validity — an out-of-bounds or zero-size crop reaches this function,
/// which is where it's rejected.
///
/// The source-library degenerate case this engine is modeled on (a crop
/// whose area equals the source and nudges `top` to a sentinel value to
/// avoid a library-specific zero-offset bug) doesn't apply to
/// `image::DynamicImage::crop_imm`, which accepts a full-size crop directly
/// — so the workaround itself is dropped, while its observable effect (the
/// crop succeeds and returns the source unchanged) is preserved.
pub fn crop(handle: &mut ImageHandle, new_width: i64, new_height: i64, position: Point) -> Result<(), EngineError> {
	let img = decode(handle)?;
	let x = position.x.pixels();
	let y = position.y.pixels();

	if new_width <= 0 || new_height <= 0 || new_width > img.width() as i64 || new_height > img.height() as i64 {
		return Err(EngineError::Transform(format!("Crop [{new_width}x{new_height}] @ ({x}, {y}) is out of bounds.")));
	}

	let cropped = img.crop_imm(x as u32, y as u32, new_width as u32, new_height as u32);
	let format = image::ImageFormat::from_mime_type(handle.mime.mime()).unwrap_or(image::ImageFormat::Jpeg);
	handle.bytes = encode(&cropped, format, 100)?;
	handle.width = new_width;
	handle.height = new_height;
	Ok(())
}

/// Re-encodes with the deferred quality/density, normalising colourspace to
/// RGB and forcing JPEG output — TIFF inputs leave Apply as JPEG, matching
/// the other engine's "everything non-animated converges on a single output
/// codec" behaviour.
pub fn apply_changes(handle: &mut ImageHandle) -> Result<(), EngineError> {
	let (quality, density) = match &handle.engine {
		crate::core::handle::EngineState::Raster(state) => (state.quality, state.density),
		_ => (95, 1),
	};

	let img = decode(handle)?;
	let img = if density == 2 {
		resize_to(&img, handle.width * 2, handle.height * 2, i64::MAX)?
	} else {
		img
	};

	let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
	handle.bytes = encode(&rgb, image::ImageFormat::Jpeg, quality)?;
	handle.mime = crate::core::format::ImageKind::Jpeg;
	handle.width = rgb.width() as i64;
	handle.height = rgb.height() as i64;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::core::handle::{make_handle, Options};

	fn sample_jpeg(w: u32, h: u32) -> Vec<u8> {
		let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(w, h, image::Rgb([10, 20, 30])));
		let mut bytes = Vec::new();
		img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Jpeg).unwrap();
		bytes
	}

	#[test]
	fn resize_produces_requested_dimensions() {
		let mut handle = make_handle(sample_jpeg(375, 500), "id", "").unwrap();
		handle.set_defaults(Options { default_quality: 90, default_density: 1, bicubic_threshold: 300 });
		resize(&mut handle, 200, 100).unwrap();
		assert_eq!((handle.width, handle.height), (200, 100));
	}

	#[test]
	fn crop_out_of_bounds_is_rejected() {
		let mut handle = make_handle(sample_jpeg(100, 100), "id", "").unwrap();
		let position = Point::new(crate::core::point::Coord::Pixel(0), crate::core::point::Coord::Pixel(0));
		let err = crop(&mut handle, 500, 500, position).unwrap_err();
		assert!(err.to_string().contains("out of bounds"));
	}

	#[test]
	fn crop_zero_size_is_rejected() {
		let mut handle = make_handle(sample_jpeg(100, 100), "id", "").unwrap();
		let position = Point::new(crate::core::point::Coord::Pixel(0), crate::core::point::Coord::Pixel(0));
		let err = crop(&mut handle, 0, 50, position).unwrap_err();
		assert!(err.to_string().contains("out of bounds"));
	}

	#[test]
	fn apply_changes_normalises_to_jpeg() {
		let mut handle = make_handle(sample_jpeg(50, 50), "id", "").unwrap();
		handle.set_defaults(Options { default_quality: 80, default_density: 1, bicubic_threshold: 300 });
		apply_changes(&mut handle).unwrap();
		assert_eq!(handle.mime, crate::core::format::ImageKind::Jpeg);
	}

	#[test]
	fn apply_changes_doubles_on_density_two() {
		let mut handle = make_handle(sample_jpeg(50, 60), "id", "").unwrap();
		handle.set_defaults(Options { default_quality: 80, default_density: 2, bicubic_threshold: 300 });
		apply_changes(&mut handle).unwrap();
		assert_eq!((handle.width, handle.height), (100, 120));
	}
}
