//! Saliency-based auto-positioning: picks the crop rectangle of a requested
//! size that best preserves the "interesting" part of an image, for use
//! when a crop's x or y position is `auto`.
//!
//! Scoring combines three heuristics — edge energy, saturation, and a skin
//! tone approximation — with an optional boost from face detection. There
//! is no published `smartcrop`-equivalent crate in this codebase's
//! dependency graph, so the heuristic itself is hand-rolled here; face
//! detection is delegated to `rustface`, a pure-Rust SEETA/Viola-Jones
//! style detector.

use image::{DynamicImage, GenericImageView};

const ANALYSIS_MAX_SIDE: u32 = 160;
const WINDOW_STEPS: u32 = 12;
const FACE_BONUS: f64 = 8.0;

#[derive(Debug, Clone, Copy)]
pub struct CropCandidate {
	pub x: i64,
	pub y: i64,
}

struct Face {
	cx: f64,
	cy: f64,
}

/// Finds the `(target_w, target_h)`-sized window of `img` with the highest
/// saliency score, returned in the coordinate space of `img` itself.
pub fn find_best_crop(img: &DynamicImage, target_w: i64, target_h: i64, face_model_path: Option<&str>) -> CropCandidate {
	let (full_w, full_h) = (img.width() as f64, img.height() as f64);
	let scale = (ANALYSIS_MAX_SIDE as f64 / full_w.max(full_h)).min(1.0);
	let (an_w, an_h) = ((full_w * scale).round().max(1.0) as u32, (full_h * scale).round().max(1.0) as u32);

	let analysis = img.resize_exact(an_w, an_h, image::imageops::FilterType::Triangle).to_rgb8();
	let faces = detect_faces(&analysis, face_model_path);

	let win_w = ((target_w as f64) * scale).round().max(1.0) as u32;
	let win_h = ((target_h as f64) * scale).round().max(1.0) as u32;
	let win_w = win_w.min(an_w);
	let win_h = win_h.min(an_h);

	let x_range = an_w.saturating_sub(win_w);
	let y_range = an_h.saturating_sub(win_h);
	let x_step = (x_range / WINDOW_STEPS.max(1)).max(1);
	let y_step = (y_range / WINDOW_STEPS.max(1)).max(1);

	let mut best = (0u32, 0u32, f64::MIN);
	let mut x = 0;
	while x <= x_range {
		let mut y = 0;
		while y <= y_range {
			let score = score_window(&analysis, x, y, win_w, win_h, &faces);
			if score > best.2 {
				best = (x, y, score);
			}
			y += y_step;
			if y_step == 0 {
				break;
			}
		}
		x += x_step;
		if x_step == 0 {
			break;
		}
	}

	CropCandidate { x: (best.0 as f64 / scale).round() as i64, y: (best.1 as f64 / scale).round() as i64 }
}

fn score_window(img: &image::RgbImage, x: u32, y: u32, w: u32, h: u32, faces: &[Face]) -> f64 {
	let mut saturation_sum = 0.0;
	let mut skin_sum = 0.0;
	let mut edge_sum = 0.0;

	for py in y..(y + h).min(img.height()) {
		for px in x..(x + w).min(img.width()) {
			let p = img.get_pixel(px, py);
			let (r, g, b) = (p[0] as f64, p[1] as f64, p[2] as f64);

			let max = r.max(g).max(b);
			let min = r.min(g).min(b);
			saturation_sum += if max > 0.0 { (max - min) / max } else { 0.0 };

			if is_skin_tone(r, g, b) {
				skin_sum += 1.0;
			}

			if px + 1 < img.width() && py + 1 < img.height() {
				let right = img.get_pixel(px + 1, py);
				let down = img.get_pixel(px, py + 1);
				let dx = (r - right[0] as f64).abs() + (g - right[1] as f64).abs() + (b - right[2] as f64).abs();
				let dy = (r - down[0] as f64).abs() + (g - down[1] as f64).abs() + (b - down[2] as f64).abs();
				edge_sum += dx + dy;
			}
		}
	}

	let area = (w * h).max(1) as f64;
	let mut score = saturation_sum / area + (skin_sum / area) * 2.0 + edge_sum / (area * 768.0);

	let (cx, cy) = (x as f64 + w as f64 / 2.0, y as f64 + h as f64 / 2.0);
	for face in faces {
		let dist = ((face.cx - cx).powi(2) + (face.cy - cy).powi(2)).sqrt();
		let radius = (w.max(h)) as f64;
		if dist < radius {
			score += FACE_BONUS * (1.0 - dist / radius);
		}
	}

	score
}

/// Crude RGB skin-tone heuristic (not colour-space accurate, just a cheap
/// discriminator): skin pixels tend to have R > G > B with R dominant.
fn is_skin_tone(r: f64, g: f64, b: f64) -> bool {
	r > 95.0 && g > 40.0 && b > 20.0 && (r - g).abs() > 15.0 && r > g && r > b
}

/// Runs face detection against the downscaled analysis frame. Any failure
/// to load the model (unset path, missing file, bad format) degrades to
/// "no faces found" rather than failing the crop — auto-positioning should
/// never be worse than falling back to the heuristic alone.
fn detect_faces(img: &image::RgbImage, model_path: Option<&str>) -> Vec<Face> {
	let Some(path) = model_path else { return Vec::new() };

	let mut detector = match rustface::create_detector(path) {
		Ok(d) => d,
		Err(e) => {
			tracing::warn!(error = %e, "smartcrop: failed to load face detection model, skipping");
			return Vec::new();
		}
	};
	detector.set_min_face_size(20);
	detector.set_score_thresh(2.0);
	detector.set_pyramid_scale_factor(0.8);
	detector.set_slide_window_step(4, 4);

	let gray: Vec<u8> = img.pixels().map(|p| ((p[0] as u32 * 299 + p[1] as u32 * 587 + p[2] as u32 * 114) / 1000) as u8).collect();
	let mut image_data = rustface::ImageData::new(&gray, img.width(), img.height());
	detector
		.detect(&mut image_data)
		.into_iter()
		.map(|info| {
			let bbox = info.bbox();
			Face { cx: bbox.x() as f64 + bbox.width() as f64 / 2.0, cy: bbox.y() as f64 + bbox.height() as f64 / 2.0 }
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn finds_a_window_within_bounds() {
		let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(200, 100, |x, y| {
			if x > 150 {
				image::Rgb([220, 80, 60])
			} else {
				image::Rgb([30, 30, 30])
			}
		}));
		let crop = find_best_crop(&img, 50, 50, None);
		assert!(crop.x >= 0 && crop.x <= 150);
		assert!(crop.y >= 0 && crop.y <= 50);
	}

	#[test]
	fn no_model_path_skips_face_detection() {
		let img = image::RgbImage::from_pixel(10, 10, image::Rgb([0, 0, 0]));
		assert!(detect_faces(&img, None).is_empty());
	}
}
