//! Polymorphism over image kind: raster (JPEG/PNG/TIFF) and animated GIF
//! share one capability surface — crop, resize, quality, density, apply —
//! dispatched here by matching on the handle's [`EngineState`] rather than
//! through a `dyn` trait object, since there are exactly two shapes and
//! neither is added to at runtime.

pub mod gif;
pub mod raster;

use crate::core::handle::{EngineState, ImageHandle};
use crate::core::point::Point;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
	#[error("{0}")]
	Transform(String),
	#[error("gif decode error [{0}]")]
	GifDecode(String),
}

pub fn resize(handle: &mut ImageHandle, new_width: i64, new_height: i64) -> Result<(), EngineError> {
	match &handle.engine {
		EngineState::Raster(_) => raster::resize(handle, new_width, new_height),
		EngineState::Gif(_) => gif::resize(handle, new_width, new_height),
	}
}

pub fn crop(handle: &mut ImageHandle, new_width: i64, new_height: i64, position: Point) -> Result<(), EngineError> {
	match &handle.engine {
		EngineState::Raster(_) => raster::crop(handle, new_width, new_height, position),
		EngineState::Gif(_) => gif::crop(handle, new_width, new_height, position),
	}
}

pub fn quality(handle: &mut ImageHandle, new_quality: i64) {
	if matches!(handle.engine, EngineState::Gif(_)) {
		gif::quality(handle, new_quality);
	} else if let EngineState::Raster(state) = &mut handle.engine {
		state.quality = new_quality;
	}
}

pub fn density(handle: &mut ImageHandle, new_density: i64) {
	// GIFs don't support density doubling — accepted and ignored, per the
	// original engine's no-op `Density` implementation for animated images.
	if let EngineState::Raster(state) = &mut handle.engine {
		state.density = new_density;
	}
}

pub fn apply_changes(handle: &mut ImageHandle) -> Result<(), EngineError> {
	match &handle.engine {
		EngineState::Raster(_) => raster::apply_changes(handle),
		EngineState::Gif(_) => gif::apply_changes(handle),
	}
}
