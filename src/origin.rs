//! Origin resolution: mapping a request's leading path segment to an
//! upstream base URL.
//!
//! Grounded on the original service's `config.GetSite` / `IsSupportedSite`:
//! a static table of known site keys, falling back to treating an unknown
//! key as a literal hostname rather than rejecting it outright.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct OriginEntry {
	pub base_host: String,
	pub use_ssl: bool,
}

impl OriginEntry {
	pub fn base_url(&self) -> String {
		let scheme = if self.use_ssl { "https" } else { "http" };
		format!("{scheme}://{}", self.base_host)
	}
}

/// Resolves an origin key to a base URL. Site keys present in `known` map
/// directly to their configured host; any other key is treated as a literal
/// hostname, matching the fallback in the system this proxy is modeled on.
#[derive(Debug, Clone)]
pub struct OriginResolver {
	known: HashMap<String, String>,
	use_ssl: bool,
}

impl OriginResolver {
	pub fn new(known: HashMap<String, String>, use_ssl: bool) -> Self {
		Self { known, use_ssl }
	}

	/// `cosmo` and `cosmopolitan` are both accepted as aliases for the same
	/// upstream bucket — a quirk of this system's naming history that
	/// predates this proxy and is preserved verbatim.
	pub fn normalize(site: &str) -> &str {
		match site {
			"cosmo" | "cosmopolitan" => "cosmopolitan",
			other => other,
		}
	}

	pub fn resolve(&self, site: &str) -> OriginEntry {
		let host = self.known.get(site).cloned().unwrap_or_else(|| site.to_string());
		OriginEntry { base_host: host, use_ssl: self.use_ssl }
	}

	pub fn is_known(&self, site: &str) -> bool {
		self.known.contains_key(site) || self.known.values().any(|v| v == site)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unknown_site_is_treated_as_literal_host() {
		let resolver = OriginResolver::new(HashMap::new(), true);
		assert_eq!(resolver.resolve("images.example.com").base_url(), "https://images.example.com");
	}

	#[test]
	fn cosmo_alias_normalizes() {
		assert_eq!(OriginResolver::normalize("cosmo"), "cosmopolitan");
		assert_eq!(OriginResolver::normalize("cosmopolitan"), "cosmopolitan");
		assert_eq!(OriginResolver::normalize("delish"), "delish");
	}

	#[test]
	fn known_site_maps_to_configured_host() {
		let mut known = HashMap::new();
		known.insert("cosmopolitan".to_string(), "amv-prod-cos.s3.amazonaws.com".to_string());
		let resolver = OriginResolver::new(known, false);
		assert_eq!(resolver.resolve("cosmopolitan").base_url(), "http://amv-prod-cos.s3.amazonaws.com");
	}
}
