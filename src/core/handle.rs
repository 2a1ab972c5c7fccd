//! The mutable image handle that flows through a pipeline run, and the
//! factory that classifies raw bytes into the right engine.

use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;

use crate::core::format::ImageKind;

#[derive(Debug, thiserror::Error)]
pub enum HandleError {
	#[error("No image data retrieved.")]
	Empty,
	#[error("Invalid image type [{0}]")]
	UnknownType(String),
	#[error("gif decode error [{0}]")]
	GifDecode(String),
	#[error("image decode error [{0}]")]
	Decode(String),
	#[error("image encode error [{0}]")]
	Encode(String),
}

/// Per-engine transient state. Raster operations execute eagerly and only
/// need to remember the deferred quality/density for the final Apply. GIF
/// operations accumulate flags because the external tool that performs them
/// is frame-aware and must run exactly once.
#[derive(Debug, Clone)]
pub enum EngineState {
	Raster(RasterState),
	Gif(GifState),
}

#[derive(Debug, Clone, Copy)]
pub struct RasterState {
	pub quality: i64,
	pub density: i64,
	pub bicubic_threshold: i64,
}

impl Default for RasterState {
	fn default() -> Self {
		Self { quality: 95, density: 1, bicubic_threshold: 300 }
	}
}

#[derive(Debug, Clone, Default)]
pub struct GifState {
	pub crop: Option<(i64, i64, crate::core::point::Point)>,
	pub resize: Option<(i64, i64)>,
	pub colors: Option<i64>,
}

/// Options applied to a handle right after construction, before any
/// operation runs.
#[derive(Debug, Clone, Copy)]
pub struct Options {
	pub default_quality: i64,
	pub default_density: i64,
	pub bicubic_threshold: i64,
}

pub struct ImageHandle {
	pub bytes: Vec<u8>,
	pub mime: ImageKind,
	pub animated: bool,
	pub width: i64,
	pub height: i64,
	pub source_width: i64,
	pub source_height: i64,
	pub pipeline_id: String,
	pub engine: EngineState,
}

impl ImageHandle {
	pub fn set_defaults(&mut self, options: Options) {
		if let EngineState::Raster(state) = &mut self.engine {
			state.quality = options.default_quality;
			state.density = options.default_density;
			state.bicubic_threshold = options.bicubic_threshold;
		}
	}
}

/// Builds an [`ImageHandle`] from raw upstream bytes.
///
/// `raw_query` is consulted only for `frame=1`: when present on a GIF, the
/// first frame is re-encoded as a quality-100 JPEG and the handle loses its
/// animated flag, exactly as if a JPEG had been fetched in the first place.
pub fn make_handle(data: Vec<u8>, pipeline_id: &str, raw_query: &str) -> Result<ImageHandle, HandleError> {
	if data.is_empty() {
		return Err(HandleError::Empty);
	}

	let kind = ImageKind::detect(&data).ok_or_else(|| HandleError::UnknownType("application/octet-stream".to_string()))?;

	if kind == ImageKind::Gif {
		let decoder = GifDecoder::new(std::io::Cursor::new(&data[..])).map_err(|e| HandleError::GifDecode(e.to_string()))?;
		let frames = decoder.into_frames();
		let first = frames
			.into_iter()
			.next()
			.ok_or_else(|| HandleError::GifDecode("no frames".to_string()))?
			.map_err(|e| HandleError::GifDecode(e.to_string()))?;

		if is_first_frame_requested(raw_query) {
			let rgb = image::DynamicImage::ImageRgba8(first.into_buffer()).to_rgb8();
			let mut jpeg_bytes = Vec::new();
			image::DynamicImage::ImageRgb8(rgb)
				.write_to(&mut std::io::Cursor::new(&mut jpeg_bytes), image::ImageFormat::Jpeg)
				.map_err(|e| HandleError::Encode(e.to_string()))?;
			return make_handle(jpeg_bytes, pipeline_id, raw_query);
		}

		let (width, height) = {
			let buffer = first.buffer();
			(buffer.width() as i64, buffer.height() as i64)
		};

		return Ok(ImageHandle {
			bytes: data,
			mime: ImageKind::Gif,
			animated: true,
			width,
			height,
			source_width: width,
			source_height: height,
			pipeline_id: pipeline_id.to_string(),
			engine: EngineState::Gif(GifState::default()),
		});
	}

	let decoded = image::load_from_memory(&data).map_err(|e| HandleError::Decode(e.to_string()))?;
	let (width, height) = (decoded.width() as i64, decoded.height() as i64);

	Ok(ImageHandle {
		bytes: data,
		mime: kind,
		animated: false,
		width,
		height,
		source_width: width,
		source_height: height,
		pipeline_id: pipeline_id.to_string(),
		engine: EngineState::Raster(RasterState::default()),
	})
}

fn is_first_frame_requested(raw_query: &str) -> bool {
	raw_query.contains("frame=1")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_bytes_rejected() {
		assert!(matches!(make_handle(Vec::new(), "id", ""), Err(HandleError::Empty)));
	}

	#[test]
	fn unknown_magic_rejected() {
		assert!(matches!(make_handle(b"not an image".to_vec(), "id", ""), Err(HandleError::UnknownType(_))));
	}
}
