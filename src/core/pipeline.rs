//! The driver that ties the rest of `core` together: given raw upstream
//! bytes and a request's raw query string, build a handle, resolve its
//! operations, execute them in order, and hand back the transformed bytes.

use md5::{Digest, Md5};

use crate::core::dsl::Reference;
use crate::core::engine::{self, EngineError};
use crate::core::format::ImageKind;
use crate::core::handle::{self, HandleError, ImageHandle, Options};
use crate::core::ops::{self, Operation, OpsError};
use crate::core::point::{Coord, Point};
use crate::core::smartcrop;

/// Errors from running a single transform, before they're mapped onto an
/// HTTP status by [`crate::error::PipelineError`].
#[derive(Debug, thiserror::Error)]
pub enum RunError {
	#[error(transparent)]
	Handle(#[from] HandleError),
	#[error(transparent)]
	Ops(#[from] OpsError),
	#[error(transparent)]
	Engine(#[from] EngineError),
}

impl From<RunError> for crate::error::PipelineError {
	fn from(err: RunError) -> Self {
		match err {
			RunError::Handle(HandleError::Empty) => Self::DecodeFailed(HandleError::Empty.to_string()),
			RunError::Handle(e) => Self::DecodeFailed(e.to_string()),
			RunError::Ops(e) => Self::ParseFailed(e.to_string()),
			RunError::Engine(e) => Self::TransformFailed(e.to_string()),
		}
	}
}

/// `md5(site + " " + path + " " + rawQuery)`, matching the original
/// pipeline's request-identity hash — used only for log correlation and the
/// eventual cache key of a future on-disk cache, never exposed to clients.
pub fn pipeline_id(site: &str, path: &str, raw_query: &str) -> String {
	let mut hasher = Md5::new();
	hasher.update(site.as_bytes());
	hasher.update(b" ");
	hasher.update(path.as_bytes());
	hasher.update(b" ");
	hasher.update(raw_query.as_bytes());
	hex::encode(hasher.finalize())
}

pub struct Transformed {
	pub bytes: Vec<u8>,
	pub mime: ImageKind,
	pub animated: bool,
	pub width: i64,
	pub height: i64,
	pub source_width: i64,
	pub source_height: i64,
}

/// Runs the full transform: classify, resolve operations against the
/// handle's current size, execute each in order, resolving any
/// smart-crop-deferred position the moment it's needed by a `Crop`.
pub fn run(data: Vec<u8>, site: &str, path: &str, raw_query: &str, options: Options, face_model_path: Option<&str>) -> Result<Transformed, RunError> {
	let id = pipeline_id(site, path, raw_query);
	let mut image = handle::make_handle(data, &id, raw_query)?;
	image.set_defaults(options);

	let reference = Reference { width: image.width, height: image.height };
	let operations = ops::build_operations(raw_query, reference)?;

	for op in operations {
		execute(&mut image, op, face_model_path)?;
	}

	Ok(Transformed {
		bytes: image.bytes,
		mime: image.mime,
		animated: image.animated,
		width: image.width,
		height: image.height,
		source_width: image.source_width,
		source_height: image.source_height,
	})
}

fn execute(image: &mut ImageHandle, op: Operation, face_model_path: Option<&str>) -> Result<(), RunError> {
	match op {
		Operation::Resize { new_width, new_height } => engine::resize(image, new_width, new_height)?,
		Operation::Crop { new_width, new_height, position } => {
			let resolved = resolve_position(image, new_width, new_height, position, face_model_path)?;
			engine::crop(image, new_width, new_height, resolved)?;
		}
		Operation::Quality { new_quality } => engine::quality(image, new_quality),
		Operation::Density { new_density } => engine::density(image, new_density),
		Operation::Apply => engine::apply_changes(image)?,
	}
	Ok(())
}

/// A crop position with an `Auto` axis is resolved by running the
/// smart-crop analyzer against the handle's *current* decoded pixels, then
/// substituting the analyzer's pick for whichever axis asked for it.
fn resolve_position(image: &ImageHandle, new_width: i64, new_height: i64, position: Point, face_model_path: Option<&str>) -> Result<Point, RunError> {
	if !position.needs_auto_crop() {
		return Ok(position);
	}

	let decoded = image::load_from_memory(&image.bytes).map_err(|e| RunError::Engine(EngineError::Transform(e.to_string())))?;
	let candidate = smartcrop::find_best_crop(&decoded, new_width, new_height, face_model_path);

	// Clamp to the legal top-left range for a box of this size inside the
	// current image, per the smart-crop caller contract: the analyzer's
	// pick is a candidate, not a guarantee, and rounding in the downscaled
	// analysis pass can push it a pixel past the edge.
	let max_x = (image.width - new_width).max(0);
	let max_y = (image.height - new_height).max(0);

	let x = if position.x.is_auto() { Coord::Pixel(candidate.x.clamp(0, max_x)) } else { position.x };
	let y = if position.y.is_auto() { Coord::Pixel(candidate.y.clamp(0, max_y)) } else { position.y };
	Ok(Point::new(x, y))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pipeline_id_is_deterministic() {
		let a = pipeline_id("cosmopolitan", "/foo.jpg", "resize=100:*");
		let b = pipeline_id("cosmopolitan", "/foo.jpg", "resize=100:*");
		assert_eq!(a, b);
		assert_eq!(a.len(), 32);
	}

	#[test]
	fn pipeline_id_changes_with_query() {
		let a = pipeline_id("cosmopolitan", "/foo.jpg", "resize=100:*");
		let b = pipeline_id("cosmopolitan", "/foo.jpg", "resize=200:*");
		assert_ne!(a, b);
	}
}
