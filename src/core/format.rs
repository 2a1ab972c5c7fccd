//! Source-image format detection by magic bytes.
//!
//! We deliberately don't lean on `image::guess_format` here: it walks a
//! longer signature table than this proxy supports, and we want an explicit
//! reject for anything outside the four formats we know how to transform.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
	Jpeg,
	Png,
	Gif,
	Tiff,
}

impl ImageKind {
	pub const fn mime(self) -> &'static str {
		match self {
			ImageKind::Jpeg => "image/jpeg",
			ImageKind::Png => "image/png",
			ImageKind::Gif => "image/gif",
			ImageKind::Tiff => "image/tiff",
		}
	}

	/// Classify a buffer by its first two bytes. `None` means "not one of
	/// the four formats this proxy transforms."
	pub fn detect(data: &[u8]) -> Option<Self> {
		if data.len() < 2 {
			return None;
		}
		match &data[..2] {
			[0xff, 0xd8] => Some(ImageKind::Jpeg),
			[0x89, 0x50] => Some(ImageKind::Png),
			[0x47, 0x49] => Some(ImageKind::Gif),
			[0x49, 0x49] => Some(ImageKind::Tiff),
			_ => None,
		}
	}
}

impl fmt::Display for ImageKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.mime())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn detects_jpeg() {
		assert_eq!(ImageKind::detect(&[0xff, 0xd8, 0xff, 0xe0]), Some(ImageKind::Jpeg));
	}

	#[test]
	fn detects_png() {
		assert_eq!(ImageKind::detect(&[0x89, 0x50, 0x4e, 0x47]), Some(ImageKind::Png));
	}

	#[test]
	fn detects_gif() {
		assert_eq!(ImageKind::detect(b"GIF89a"), Some(ImageKind::Gif));
	}

	#[test]
	fn detects_tiff() {
		assert_eq!(ImageKind::detect(&[0x49, 0x49, 0x2a, 0x00]), Some(ImageKind::Tiff));
	}

	#[test]
	fn rejects_unknown() {
		assert_eq!(ImageKind::detect(b"<html"), None);
	}

	#[test]
	fn rejects_short_buffer() {
		assert_eq!(ImageKind::detect(&[0xff]), None);
	}
}
