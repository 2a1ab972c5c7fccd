//! Animated GIF transform engine: accumulates crop/resize/colour-quantise
//! flags and performs them in a single external `gifsicle` invocation on
//! Apply, since the tool operates frame-aware and re-running it per
//! operation would be both slow and semantically wrong.

use std::io::Write;
use std::process::{Command, Stdio};

use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;

use crate::core::engine::EngineError;
use crate::core::handle::{EngineState, GifState, ImageHandle};
use crate::core::point::Point;

pub fn resize(handle: &mut ImageHandle, new_width: i64, new_height: i64) -> Result<(), EngineError> {
	if let EngineState::Gif(state) = &mut handle.engine {
		state.resize = Some((new_width, new_height));
	}
	Ok(())
}

/// Unlike the raster engine, an out-of-bounds or zero-size crop is silently
/// skipped here rather than raised as an error — the builder doesn't
/// pre-filter crop validity, so each engine is responsible for its own
/// behavior on an invalid request.
pub fn crop(handle: &mut ImageHandle, new_width: i64, new_height: i64, position: Point) -> Result<(), EngineError> {
	if new_width <= 0 || new_height <= 0 || new_width > handle.width || new_height > handle.height {
		return Ok(());
	}
	if let EngineState::Gif(state) = &mut handle.engine {
		state.crop = Some((new_width, new_height, position));
	}
	Ok(())
}

pub fn quality(handle: &mut ImageHandle, new_quality: i64) {
	if let EngineState::Gif(state) = &mut handle.engine {
		// 1-100 maps onto gifsicle's 2-256 colour palette size.
		let colors = ((new_quality as f64) * 2.56).round().clamp(2.0, 256.0) as i64;
		state.colors = Some(colors);
	}
}

fn build_args(state: &GifState) -> Vec<String> {
	let mut args = Vec::new();
	if let Some((w, h, pos)) = &state.crop {
		args.push(format!("--crop={},{}+{}x{}", pos.x.pixels(), pos.y.pixels(), w, h));
	}
	if let Some((w, h)) = state.resize {
		args.push(format!("--resize={w}x{h}"));
	}
	if let Some(colors) = state.colors {
		args.push(format!("--colors={colors}"));
	}
	args
}

/// Runs the accumulated flags through `gifsicle` once. A non-zero exit is
/// logged but does not fail the pipeline — gifsicle warns on a number of
/// harmless degenerate inputs (e.g. a crop equal to the full frame) without
/// actually failing to produce output.
pub fn apply_changes(handle: &mut ImageHandle) -> Result<(), EngineError> {
	let state = match &handle.engine {
		EngineState::Gif(state) => state.clone(),
		_ => return Ok(()),
	};
	let args = build_args(&state);
	if args.is_empty() {
		return Ok(());
	}

	let mut child = Command::new("gifsicle")
		.args(&args)
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.spawn()
		.map_err(|e| EngineError::Transform(format!("failed to launch gifsicle: {e}")))?;

	child
		.stdin
		.take()
		.expect("piped stdin")
		.write_all(&handle.bytes)
		.map_err(|e| EngineError::Transform(format!("failed to write to gifsicle stdin: {e}")))?;

	let output = child.wait_with_output().map_err(|e| EngineError::Transform(format!("gifsicle failed to run: {e}")))?;

	if !output.status.success() {
		tracing::warn!(
			pipeline_id = %handle.pipeline_id,
			status = ?output.status.code(),
			stderr = %String::from_utf8_lossy(&output.stderr),
			"gifsicle exited non-zero; using its output anyway"
		);
	}

	handle.bytes = output.stdout;

	let decoder = GifDecoder::new(std::io::Cursor::new(&handle.bytes[..])).map_err(|e| EngineError::GifDecode(e.to_string()))?;
	let mut frames = decoder.into_frames();
	let first = frames
		.next()
		.ok_or_else(|| EngineError::GifDecode("no frames".to_string()))?
		.map_err(|e| EngineError::GifDecode(e.to_string()))?;
	let buffer = first.buffer();
	handle.width = buffer.width() as i64;
	handle.height = buffer.height() as i64;

	Ok(())
}
