//! The dimension/position token grammar used inside `resize`, `crop` and
//! `fill` operation arguments.
//!
//! Three token shapes are accepted everywhere a "dimension" is expected:
//!   - `*`               wildcard — "whatever preserves aspect ratio"
//!   - `<int>`            an absolute pixel count
//!   - `<float>x<dir>`    a ratio of a reference length, `dir` ∈ {w,h,g,l}
//!
//! Position tokens additionally accept the named anchors `left`/`center`/
//! `right`/`auto` (x-axis) and `top`/`center`/`bottom`/`auto` (y-axis).

use crate::core::point::Coord;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DslError {
	#[error("height and width cannot both be '*'")]
	BothWildcard,
	#[error("dimension must be ratio, number, or '*', not '{0}'")]
	BadDimension(String),
	#[error("explicit position must be ratio or number, not '{0}'")]
	BadPosition(String),
	#[error("ratio must be non-zero float, not '{0}'")]
	BadRatio(String),
	#[error("dimension must be 'w', 'h', 'g', or 'l', not '{0}'")]
	BadDirection(char),
	#[error("denominator of ratio can't be zero")]
	ZeroDenominator,
	#[error("crop X position not 'left', 'center', 'right' or 'auto', and {0}")]
	BadXPosition(Box<DslError>),
	#[error("crop Y position not 'top', 'center', 'bottom' or 'auto', and {0}")]
	BadYPosition(Box<DslError>),
	#[error("crop X position is outside image: {0}")]
	XOutsideImage(i64),
	#[error("crop Y position is outside image: {0}")]
	YOutsideImage(i64),
}

/// Reference dimensions a DSL token is resolved against — the image's
/// *current* width/height at the point the operation is parsed.
#[derive(Debug, Clone, Copy)]
pub struct Reference {
	pub width: i64,
	pub height: i64,
}

fn ratio(num: i64, denom: i64) -> Result<f64, DslError> {
	if denom == 0 {
		return Err(DslError::ZeroDenominator);
	}
	Ok(num as f64 / denom as f64)
}

/// Resolves `'w'|'h'|'g'|'l'` against a reference to a pixel length.
fn direction_length(reference: Reference, dir: char) -> Result<i64, DslError> {
	match dir {
		'l' if reference.width < reference.height => Ok(reference.width),
		'g' if reference.width > reference.height => Ok(reference.width),
		'w' => Ok(reference.width),
		'h' | 'l' | 'g' => Ok(reference.height),
		other => Err(DslError::BadDirection(other)),
	}
}

/// Parses a `<float>x<dir>` ratio token into a pixel length.
fn ratio_to_px(token: &str, reference: Reference) -> Result<i64, DslError> {
	let (num_str, dir) = token.split_at(token.len() - 2);
	let dir = dir.as_bytes()[1] as char;
	let factor: f64 = num_str.parse().map_err(|_| DslError::BadRatio(token.to_string()))?;
	if factor == 0.0 {
		return Err(DslError::BadRatio(token.to_string()));
	}
	let length = direction_length(reference, dir)?;
	Ok((factor * length as f64) as i64)
}

fn is_ratio_token(token: &str) -> bool {
	token.len() > 2 && token.as_bytes()[token.len() - 2] == b'x'
}

/// One axis of a `resize`/`crop`/`fill` dimension pair: pixels, or the
/// wildcard sentinel that must be filled in by `dims2px`.
enum Dim {
	Pixels(i64),
	Wildcard,
}

/// Parses a single axis token (width or height half of a `W:H` pair).
fn dim_to_px(token: &str, reference: Reference) -> Result<Dim, DslError> {
	if token == "*" {
		return Ok(Dim::Wildcard);
	}
	if is_ratio_token(token) {
		return Ok(Dim::Pixels(ratio_to_px(token, reference)?));
	}
	if let Ok(n) = token.parse::<i64>() {
		return Ok(Dim::Pixels(n));
	}
	Err(DslError::BadDimension(token.to_string()))
}

/// Resolves a `W:H` token pair into absolute pixel dimensions, filling in at
/// most one wildcard axis by preserving the source aspect ratio.
pub fn dims2px(width_tok: &str, height_tok: &str, reference: Reference) -> Result<(i64, i64), DslError> {
	let w = dim_to_px(width_tok, reference)?;
	let h = dim_to_px(height_tok, reference)?;

	match (w, h) {
		(Dim::Wildcard, Dim::Wildcard) => Err(DslError::BothWildcard),
		(Dim::Wildcard, Dim::Pixels(new_h)) => {
			let r = ratio(new_h, reference.height)?;
			Ok(((reference.width as f64 * r) as i64, new_h))
		}
		(Dim::Pixels(new_w), Dim::Wildcard) => {
			let r = ratio(new_w, reference.width)?;
			Ok((new_w, (reference.height as f64 * r) as i64))
		}
		(Dim::Pixels(new_w), Dim::Pixels(new_h)) => Ok((new_w, new_h)),
	}
}

/// Parses a single explicit-position token (no wildcard, no named anchor —
/// those are handled by the caller before falling through to this).
fn pos_to_px(token: &str, reference: Reference) -> Result<i64, DslError> {
	if is_ratio_token(token) {
		return ratio_to_px(token, reference);
	}
	token.parse::<i64>().map_err(|_| DslError::BadPosition(token.to_string()))
}

/// Resolves the named/ratio/numeric X position token of a crop, given the
/// size of the crop box already decided by `dims2px`. `Coord::Auto` is
/// returned verbatim for `"auto"` — the caller resolves it via smart-crop.
pub fn x_position(token: &str, reference: Reference, crop_w: i64) -> Result<Coord, DslError> {
	let px = match token {
		"left" => 0,
		"center" => (reference.width - crop_w) / 2,
		"right" => reference.width - crop_w,
		"auto" => return Ok(Coord::Auto),
		other => {
			let px = pos_to_px(other, reference).map_err(|e| DslError::BadXPosition(Box::new(e)))?;
			if px > reference.width {
				return Err(DslError::XOutsideImage(px));
			}
			px
		}
	};
	Ok(Coord::Pixel(px.max(0)))
}

/// Y-axis counterpart of [`x_position`].
pub fn y_position(token: &str, reference: Reference, crop_h: i64) -> Result<Coord, DslError> {
	let px = match token {
		"top" => 0,
		"center" => (reference.height - crop_h) / 2,
		"bottom" => reference.height - crop_h,
		"auto" => return Ok(Coord::Auto),
		other => {
			let px = pos_to_px(other, reference).map_err(|e| DslError::BadYPosition(Box::new(e)))?;
			if px > reference.height {
				return Err(DslError::YOutsideImage(px));
			}
			px
		}
	};
	Ok(Coord::Pixel(px.max(0)))
}

/// Rounds a float down, truncated to `decimals` significant decimal places.
/// Used by `fill` to guarantee a computed aspect-ratio crop never exceeds
/// the source image by a stray pixel from naive rounding.
pub fn round_down(value: f64, decimals: u32) -> f64 {
	let factor = 10f64.powi(decimals as i32);
	(value * factor).floor() / factor
}

#[cfg(test)]
mod tests {
	use super::*;

	fn reference(w: i64, h: i64) -> Reference {
		Reference { width: w, height: h }
	}

	#[test]
	fn both_wildcard_rejected() {
		assert_eq!(dims2px("*", "*", reference(375, 500)), Err(DslError::BothWildcard));
	}

	#[test]
	fn wildcard_width_preserves_aspect() {
		let (w, h) = dims2px("*", "250", reference(375, 500)).unwrap();
		assert_eq!(h, 250);
		assert_eq!(w, 187); // 375 * (250/500)
	}

	#[test]
	fn wildcard_height_preserves_aspect() {
		let (w, h) = dims2px("200", "*", reference(400, 800)).unwrap();
		assert_eq!(w, 200);
		assert_eq!(h, 400);
	}

	#[test]
	fn absolute_pixels() {
		assert_eq!(dims2px("200", "100", reference(375, 500)).unwrap(), (200, 100));
	}

	#[test]
	fn ratio_token_by_width() {
		let (w, _) = dims2px("0.5xw", "10", reference(400, 200)).unwrap();
		assert_eq!(w, 200);
	}

	#[test]
	fn ratio_token_by_greater_dimension() {
		let (w, _) = dims2px("1xg", "10", reference(400, 200)).unwrap();
		assert_eq!(w, 400);
	}

	#[test]
	fn named_positions() {
		let r = reference(375, 500);
		assert_eq!(x_position("left", r, 100).unwrap(), Coord::Pixel(0));
		assert_eq!(x_position("right", r, 100).unwrap(), Coord::Pixel(275));
		assert_eq!(x_position("center", r, 75).unwrap(), Coord::Pixel(150));
		assert_eq!(y_position("auto", r, 100).unwrap(), Coord::Auto);
	}

	#[test]
	fn position_outside_image_rejected() {
		let r = reference(100, 100);
		assert_eq!(x_position("500", r, 10), Err(DslError::XOutsideImage(500)));
	}

	#[test]
	fn round_down_floors_to_four_decimals() {
		assert_eq!(round_down(1.777_777, 4), 1.7777);
	}

	#[test]
	fn bad_dimension_rejected() {
		assert!(matches!(dims2px("abc", "10", reference(10, 10)), Err(DslError::BadDimension(_))));
	}
}
