//! Turns a request's raw query string into an ordered, validated list of
//! image operations, tracking the running `(width, height)` that each
//! successive operation is resolved against.

use crate::core::dsl::{self, DslError, Reference};
use crate::core::point::Point;

pub const MAX_OPERATIONS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum OpsError {
	#[error("too many operations [{0}]")]
	TooManyOperations(usize),
	#[error("invalid parameter [{0}]")]
	InvalidParameter(String),
	#[error("invalid operation {0}")]
	InvalidOperation(String),
	#[error("at least one dimension is required")]
	MissingDimension,
	#[error("resize must have dimensions parameter")]
	ResizeMissingDimensions,
	#[error("resize must have two dimensions")]
	ResizeNeedsTwoDimensions,
	#[error("too many parameters for crop")]
	CropTooManyParams,
	#[error("crop size must have two dimensions")]
	CropNeedsTwoDimensions,
	#[error("crop position must have two coordinates")]
	CropNeedsTwoCoords,
	#[error("too many parameters for fill")]
	FillTooManyParams,
	#[error("aspect ratio to fill must have two dimensions")]
	FillNeedsTwoDimensions,
	#[error("fill position must have two coordinates")]
	FillNeedsTwoCoords,
	#[error("fill aspect width must be integer, not {0}")]
	FillWidthNotInteger(String),
	#[error("fill aspect height must be integer, not {0}")]
	FillHeightNotInteger(String),
	#[error("too many dimensions. Maximum number of dimensions for quality is 1")]
	QualityTooManyParams,
	#[error("invalid quality [{0}]")]
	InvalidQuality(String),
	#[error("too many dimensions. Maximum number of dimensions for density is 1")]
	DensityTooManyParams,
	#[error("invalid density [{0}]")]
	InvalidDensity(String),
	#[error(transparent)]
	Dsl(#[from] DslError),
}

/// A single validated operation, already resolved to absolute pixels
/// against the dimensions its predecessor produced.
#[derive(Debug, Clone)]
pub enum Operation {
	Resize { new_width: i64, new_height: i64 },
	Crop { new_width: i64, new_height: i64, position: Point },
	Quality { new_quality: i64 },
	Density { new_density: i64 },
	Apply,
}

impl Operation {
	/// The dimensions this op would produce, used to advance the running
	/// `(width, height)` reference regardless of whether the op ultimately
	/// executes — a later operation in the same query resolves against the
	/// size this one *requested*, not the size it ends up producing.
	fn new_dims(&self) -> Option<(i64, i64)> {
		match *self {
			Operation::Resize { new_width, new_height } => Some((new_width, new_height)),
			Operation::Crop { new_width, new_height, .. } => Some((new_width, new_height)),
			_ => None,
		}
	}
}

/// A resize that would upscale is silently skipped (not an error) — mirrors
/// `IsValid()` on the original's resize operation. Crop has no builder-side
/// validity check: an out-of-bounds or zero-size crop is left to the engine,
/// which errors for raster images and silently skips for GIFs.
fn resize_is_valid(new_w: i64, new_h: i64, current: Reference) -> bool {
	new_w <= current.width && new_h <= current.height
}

fn parse_resize(params: &[&str], current: Reference) -> Result<Operation, OpsError> {
	if params.len() != 1 {
		return Err(OpsError::ResizeMissingDimensions);
	}
	let dims: Vec<&str> = params[0].split(':').collect();
	if dims.len() != 2 {
		return Err(OpsError::ResizeNeedsTwoDimensions);
	}
	let (w, h) = dsl::dims2px(dims[0], dims[1], current)?;
	Ok(Operation::Resize { new_width: w, new_height: h })
}

fn parse_crop_position(coords: &[&str], current: Reference, crop_w: i64, crop_h: i64) -> Result<Point, OpsError> {
	if coords.len() != 2 {
		return Err(OpsError::CropNeedsTwoCoords);
	}
	let x = dsl::x_position(coords[0], current, crop_w)?;
	let y = dsl::y_position(coords[1], current, crop_h)?;
	Ok(Point::new(x, y))
}

fn parse_crop(params: &[&str], current: Reference) -> Result<Operation, OpsError> {
	if params.len() > 2 {
		return Err(OpsError::CropTooManyParams);
	}
	let dims: Vec<&str> = params[0].split(':').collect();
	if dims.len() != 2 {
		return Err(OpsError::CropNeedsTwoDimensions);
	}
	let (w, h) = dsl::dims2px(dims[0], dims[1], current)?;

	let coords: Vec<&str> = if params.len() == 2 { params[1].split(',').collect() } else { vec!["center", "top"] };
	let position = parse_crop_position(&coords, current, w, h)?;

	Ok(Operation::Crop { new_width: w, new_height: h, position })
}

/// `fill=AW:AH` picks the largest sub-rectangle of that aspect ratio that
/// fits inside the reference image, then crops to it. The four-decimal
/// floor-truncation on the derived ratio keeps the result from exceeding
/// the source by a stray pixel from naive float rounding.
fn parse_fill(params: &[&str], current: Reference) -> Result<Operation, OpsError> {
	if params.len() > 2 {
		return Err(OpsError::FillTooManyParams);
	}
	let dims: Vec<&str> = params[0].split(':').collect();
	if dims.len() != 2 {
		return Err(OpsError::FillNeedsTwoDimensions);
	}
	let aspect_w: i64 = dims[0].parse().map_err(|_| OpsError::FillWidthNotInteger(dims[0].to_string()))?;
	let aspect_h: i64 = dims[1].parse().map_err(|_| OpsError::FillHeightNotInteger(dims[1].to_string()))?;
	if aspect_h == 0 {
		return Err(DslError::ZeroDenominator.into());
	}
	let aspect_ratio = aspect_w as f64 / aspect_h as f64;
	if current.height == 0 {
		return Err(DslError::ZeroDenominator.into());
	}
	let image_ratio = current.width as f64 / current.height as f64;

	let (w_tok, h_tok) = if aspect_ratio > image_ratio {
		(format!("{:.6}xw", 1.0), format!("{:.6}xw", dsl::round_down(1.0 / aspect_ratio, 4)))
	} else {
		(format!("{:.6}xh", dsl::round_down(aspect_ratio, 4)), format!("{:.6}xh", 1.0))
	};
	let (w, h) = dsl::dims2px(&w_tok, &h_tok, current)?;

	let coords: Vec<&str> = if params.len() == 2 { params[1].split(',').collect() } else { vec!["center", "top"] };
	let position = parse_crop_position(&coords, current, w, h)?;

	Ok(Operation::Crop { new_width: w, new_height: h, position })
}

fn parse_quality(params: &[&str]) -> Result<Operation, OpsError> {
	if params.len() != 1 {
		return Err(OpsError::QualityTooManyParams);
	}
	let q: i64 = params[0].parse().map_err(|_| OpsError::InvalidQuality(params[0].to_string()))?;
	if !(0..=100).contains(&q) {
		return Err(OpsError::InvalidQuality(params[0].to_string()));
	}
	Ok(Operation::Quality { new_quality: q })
}

fn parse_density(params: &[&str]) -> Result<Operation, OpsError> {
	if params.len() != 1 {
		return Err(OpsError::DensityTooManyParams);
	}
	match params[0] {
		"1" => Ok(Operation::Density { new_density: 1 }),
		"2" => Ok(Operation::Density { new_density: 2 }),
		other => Err(OpsError::InvalidDensity(other.to_string())),
	}
}

/// Builds the validated, ordered operation list for a request.
///
/// `current` is the handle's dimensions at the moment parsing starts; it is
/// updated in place as each operation is resolved, so later operations in
/// the same query see the effective size their predecessor would produce
/// (this mirrors the original pipeline's running-width/height bookkeeping —
/// it does not require the operations to have actually executed yet).
pub fn build_operations(raw_query: &str, mut current: Reference) -> Result<Vec<Operation>, OpsError> {
	let mut operations = Vec::with_capacity(MAX_OPERATIONS + 1);

	if raw_query.is_empty() {
		return Ok(operations);
	}

	let segments: Vec<&str> = raw_query.split('&').collect();
	if segments.len() > MAX_OPERATIONS {
		return Err(OpsError::TooManyOperations(segments.len()));
	}

	for segment in segments {
		let split: Vec<&str> = segment.split('=').collect();
		if split.len() != 2 {
			return Err(OpsError::InvalidParameter(segment.to_string()));
		}
		let (action, args) = (split[0], split[1]);
		let params: Vec<&str> = args.split(';').collect();
		if params.is_empty() || params[0].is_empty() {
			return Err(OpsError::MissingDimension);
		}

		let op = match action {
			"resize" => Some(parse_resize(&params, current)?),
			"crop" => Some(parse_crop(&params, current)?),
			"fill" => Some(parse_fill(&params, current)?),
			"output-quality" => Some(parse_quality(&params)?),
			"density" => Some(parse_density(&params)?),
			// Already consumed at handle-construction time (frame=1 selects
			// the first GIF frame and rebuilds the handle as a JPEG); the
			// segment still counts toward MAX_OPERATIONS above, but yields
			// no operation here.
			"frame" => None,
			other => return Err(OpsError::InvalidOperation(other.to_string())),
		};

		let Some(op) = op else { continue };

		// The reference for the next operation advances from every parsed
		// op's requested dimensions, even a resize that's about to be
		// skipped as an upscale — mirrors the original's running
		// width/height bookkeeping, which updates before validity is
		// checked.
		let before = current;
		if let Some((w, h)) = op.new_dims() {
			if w > 0 {
				current.width = w;
			}
			if h > 0 {
				current.height = h;
			}
		}

		if let Operation::Resize { new_width, new_height } = op {
			if !resize_is_valid(new_width, new_height, before) {
				// Silently skipped — not an error, mirrors IsValid()==false.
				continue;
			}
		}

		operations.push(op);
	}

	if !operations.is_empty() {
		operations.push(Operation::Apply);
	}

	Ok(operations)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::core::point::Coord;

	fn reference(w: i64, h: i64) -> Reference {
		Reference { width: w, height: h }
	}

	#[test]
	fn empty_query_yields_empty_list() {
		assert!(build_operations("", reference(375, 500)).unwrap().is_empty());
	}

	#[test]
	fn single_resize_gets_trailing_apply() {
		let ops = build_operations("resize=200:100", reference(375, 500)).unwrap();
		assert_eq!(ops.len(), 2);
		assert!(matches!(ops[1], Operation::Apply));
	}

	#[test]
	fn resize_refuses_upscale() {
		let ops = build_operations("resize=1000:*", reference(375, 500)).unwrap();
		assert!(ops.is_empty());
	}

	#[test]
	fn skipped_resize_still_advances_the_reference_for_later_ops() {
		// resize=1000:* is an upscale and gets skipped, but it still
		// advances the running reference to (1000, 1333) before the
		// skip check runs — so the following ratio-based crop resolves
		// against the requested resize target, not the source size.
		let ops = build_operations("resize=1000:*&crop=0.5xw:0.5xh;0,0", reference(375, 500)).unwrap();
		assert_eq!(ops.len(), 2);
		match &ops[0] {
			Operation::Crop { new_width, new_height, .. } => {
				assert_eq!((*new_width, *new_height), (500, 666));
			}
			_ => panic!("expected crop"),
		}
	}

	#[test]
	fn out_of_bounds_crop_is_emitted_not_filtered() {
		// The builder no longer pre-filters crop validity — an
		// out-of-bounds crop still reaches the operation list so the
		// raster engine can raise `TransformFailed` at execution time.
		let ops = build_operations("crop=400:400;0,0", reference(375, 500)).unwrap();
		assert_eq!(ops.len(), 2);
		assert!(matches!(ops[0], Operation::Crop { new_width: 400, new_height: 400, .. }));
	}

	#[test]
	fn crop_then_resize_tracks_running_dimensions() {
		let ops = build_operations("crop=200:200;0,0&resize=200:100", reference(375, 500)).unwrap();
		assert_eq!(ops.len(), 3);
		match &ops[0] {
			Operation::Crop { new_width, new_height, .. } => {
				assert_eq!((*new_width, *new_height), (200, 200));
			}
			_ => panic!("expected crop"),
		}
		match &ops[1] {
			Operation::Resize { new_width, new_height } => assert_eq!((*new_width, *new_height), (200, 100)),
			_ => panic!("expected resize"),
		}
	}

	#[test]
	fn auto_position_is_deferred() {
		let ops = build_operations("crop=200:100;auto,auto", reference(375, 500)).unwrap();
		match &ops[0] {
			Operation::Crop { position, .. } => {
				assert_eq!(position.x, Coord::Auto);
				assert_eq!(position.y, Coord::Auto);
			}
			_ => panic!("expected crop"),
		}
	}

	#[test]
	fn too_many_operations_rejected() {
		let q = "resize=1:1&resize=1:1&resize=1:1&resize=1:1&resize=1:1&resize=1:1";
		assert!(matches!(build_operations(q, reference(375, 500)), Err(OpsError::TooManyOperations(6))));
	}

	#[test]
	fn invalid_operation_name_rejected() {
		assert!(matches!(build_operations("sepia=1", reference(10, 10)), Err(OpsError::InvalidOperation(_))));
	}

	#[test]
	fn bad_pair_rejected() {
		assert!(matches!(build_operations("resize=100=bad:10", reference(10, 10)), Err(OpsError::InvalidParameter(_))));
	}

	#[test]
	fn invalid_quality_rejected() {
		assert!(matches!(build_operations("output-quality=200", reference(10, 10)), Err(OpsError::InvalidQuality(_))));
	}

	#[test]
	fn invalid_density_rejected() {
		assert!(matches!(build_operations("density=4", reference(10, 10)), Err(OpsError::InvalidDensity(_))));
	}

	#[test]
	fn fill_stays_within_source_bounds() {
		let ops = build_operations("fill=16:9", reference(1920, 1080)).unwrap();
		match &ops[0] {
			Operation::Crop { new_width, new_height, .. } => {
				assert!(*new_width <= 1920);
				assert!(*new_height <= 1080);
				assert_eq!(*new_height, 1080);
				assert_eq!(*new_width, 1919);
			}
			_ => panic!("expected crop"),
		}
	}
}
