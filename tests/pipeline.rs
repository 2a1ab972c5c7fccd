//! End-to-end coverage of the transform pipeline against synthetic images,
//! exercising the scenarios the operation DSL and engines are meant to
//! handle without needing a real upstream origin.

use lensproxy::core::handle::Options;
use lensproxy::core::pipeline;

const DEFAULT_OPTIONS: Options = Options { default_quality: 95, default_density: 1, bicubic_threshold: 300 };

fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
	let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(width, height, image::Rgb([120, 140, 160])));
	let mut bytes = Vec::new();
	img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Jpeg).unwrap();
	bytes
}

fn sample_gif(width: u32, height: u32, frames: u32) -> Vec<u8> {
	use image::codecs::gif::GifEncoder;
	use image::Delay;
	use image::Frame;

	let mut bytes = Vec::new();
	{
		let mut encoder = GifEncoder::new(&mut bytes);
		for i in 0..frames {
			let shade = (i * 40) as u8;
			let buffer = image::RgbaImage::from_pixel(width, height, image::Rgba([shade, shade, shade, 255]));
			encoder.encode_frame(Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(100, 1))).unwrap();
		}
	}
	bytes
}

#[test]
fn plain_resize_shrinks_to_exact_target() {
	let data = sample_jpeg(375, 500);
	let result = pipeline::run(data, "cosmopolitan", "/a.jpg", "resize=200:100", DEFAULT_OPTIONS, None).unwrap();
	assert_eq!((result.width, result.height), (200, 100));
	assert_eq!(result.mime.mime(), "image/jpeg");
	assert!(!result.animated);
}

#[test]
fn resize_refuses_to_upscale() {
	let data = sample_jpeg(375, 500);
	let result = pipeline::run(data, "cosmopolitan", "/a.jpg", "resize=1000:*", DEFAULT_OPTIONS, None).unwrap();
	assert_eq!((result.width, result.height), (375, 500));
}

#[test]
fn crop_larger_than_source_fails_instead_of_passing_through() {
	let data = sample_jpeg(375, 500);
	let err = pipeline::run(data, "cosmopolitan", "/a.jpg", "crop=400:400;0,0", DEFAULT_OPTIONS, None).unwrap_err();
	assert!(matches!(err, pipeline::RunError::Engine(_)));
	assert!(err.to_string().contains("out of bounds"));
}

#[test]
fn crop_then_resize_runs_in_order() {
	let data = sample_jpeg(375, 500);
	let result = pipeline::run(data, "cosmopolitan", "/a.jpg", "crop=200:200;0,0&resize=200:100", DEFAULT_OPTIONS, None).unwrap();
	assert_eq!((result.width, result.height), (200, 100));
}

#[test]
fn auto_position_crop_stays_within_source_bounds() {
	let data = sample_jpeg(375, 500);
	let result = pipeline::run(data, "cosmopolitan", "/a.jpg", "crop=200:100;auto,auto", DEFAULT_OPTIONS, None).unwrap();
	assert_eq!((result.width, result.height), (200, 100));
}

#[test]
fn fill_floors_to_avoid_over_cropping() {
	let data = sample_jpeg(1920, 1080);
	let result = pipeline::run(data, "cosmopolitan", "/a.jpg", "fill=16:9", DEFAULT_OPTIONS, None).unwrap();
	assert_eq!((result.width, result.height), (1919, 1080));
}

#[test]
fn animated_gif_resize_preserves_animated_flag() {
	let data = sample_gif(900, 450, 3);
	let result = pipeline::run(data, "cosmopolitan", "/a.gif", "resize=200:100", DEFAULT_OPTIONS, None).unwrap();
	assert!(result.animated);
	assert_eq!(result.mime.mime(), "image/gif");
}

#[test]
fn frame_one_degrades_gif_to_static_jpeg() {
	let data = sample_gif(900, 450, 3);
	let result = pipeline::run(data, "cosmopolitan", "/a.gif", "frame=1&resize=200:*", DEFAULT_OPTIONS, None).unwrap();
	assert!(!result.animated);
	assert_eq!(result.mime.mime(), "image/jpeg");
	assert_eq!(result.width, 200);
}

#[test]
fn both_wildcards_are_rejected() {
	let data = sample_jpeg(375, 500);
	let err = pipeline::run(data, "cosmopolitan", "/a.jpg", "resize=*:*", DEFAULT_OPTIONS, None).unwrap_err();
	assert!(err.to_string().contains("both") || matches!(err, pipeline::RunError::Ops(_)));
}

#[test]
fn too_many_operations_is_rejected() {
	let data = sample_jpeg(375, 500);
	let query = "a=1&b=1&c=1&d=1&e=1&f=1&g=1&h=1";
	let err = pipeline::run(data, "cosmopolitan", "/a.jpg", query, DEFAULT_OPTIONS, None).unwrap_err();
	assert!(matches!(err, pipeline::RunError::Ops(_)));
}

#[test]
fn invalid_density_is_rejected() {
	let data = sample_jpeg(375, 500);
	let err = pipeline::run(data, "cosmopolitan", "/a.jpg", "density=4", DEFAULT_OPTIONS, None).unwrap_err();
	assert!(matches!(err, pipeline::RunError::Ops(_)));
}

#[test]
fn invalid_quality_is_rejected() {
	let data = sample_jpeg(375, 500);
	let err = pipeline::run(data, "cosmopolitan", "/a.jpg", "output-quality=200", DEFAULT_OPTIONS, None).unwrap_err();
	assert!(matches!(err, pipeline::RunError::Ops(_)));
}

#[test]
fn density_two_doubles_final_dimensions() {
	let data = sample_jpeg(375, 500);
	let result = pipeline::run(data, "cosmopolitan", "/a.jpg", "resize=100:100&density=2", DEFAULT_OPTIONS, None).unwrap();
	assert_eq!((result.width, result.height), (200, 200));
}
