//! Cache key generation utilities.
//!
//! A key is the CRC-32 (IEEE) of an identity string rendered in base 36,
//! followed by the extension: `/100x0/http://host/a.jpg` + `.jpg` becomes
//! something like `1q2w3e.jpg`. CRC-32 is not collision free; two distinct
//! identities can share an entry. Keeping it preserves existing cache
//! directories.

use flate2::Crc;
use resizr_core::ResizeRequest;
use std::fmt;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Which tier a key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    /// The unmodified image as fetched from the origin.
    Original,
    /// A resized (and possibly re-encoded) variant.
    Variant,
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => write!(f, "original"),
            Self::Variant => write!(f, "variant"),
        }
    }
}

/// File name of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key of the original-tier entry for a request.
    pub fn original(request: &ResizeRequest) -> Self {
        derive_key(&request.origin_url, &request.extension)
    }

    /// Key of the resized-tier entry for a request. Uses the effective
    /// extension so re-encoded outputs never share a slot with native ones.
    pub fn variant(request: &ResizeRequest) -> Self {
        derive_key(&request.path, request.effective_extension())
    }

    pub fn for_tier(tier: CacheTier, request: &ResizeRequest) -> Self {
        match tier {
            CacheTier::Original => Self::original(request),
            CacheTier::Variant => Self::variant(request),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the cache key for an identity string.
pub fn derive_key(identity: &str, extension: &str) -> CacheKey {
    let mut crc = Crc::new();
    crc.update(identity.as_bytes());
    let mut key = to_base36(u64::from(crc.sum()));
    key.push_str(extension);
    CacheKey(key)
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(13);
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use resizr_core::parse_request;

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u64::from(u32::MAX)), "1z141z3");
    }

    #[test]
    fn test_derive_key_known_value() {
        // crc32("123456789") = 0xCBF43926 = 3421780262
        let key = derive_key("123456789", ".jpg");
        assert_eq!(key.as_str(), "1kl8mjq.jpg");
    }

    #[test]
    fn test_derive_key_is_deterministic() {
        let a = derive_key("http://host/img.jpg", ".jpg");
        let b = derive_key("http://host/img.jpg", ".jpg");
        assert_eq!(a, b);
        assert!(a.as_str().ends_with(".jpg"));
    }

    #[test]
    fn test_derive_key_distinguishes_identities() {
        let a = derive_key("/100x0/http://host/img.jpg", ".jpg");
        let b = derive_key("/100x1/http://host/img.jpg", ".jpg");
        assert_ne!(a, b);
    }

    #[test]
    fn test_derive_key_keeps_extension_case() {
        let key = derive_key("https://host/img.JPEG", ".JPEG");
        assert!(key.as_str().ends_with(".JPEG"));
    }

    #[test]
    fn test_tiers_use_different_identities() {
        let req = parse_request("/100x0/http://host/img.jpg").unwrap();
        let original = CacheKey::original(&req);
        let variant = CacheKey::variant(&req);
        assert_eq!(original, derive_key("http://host/img.jpg", ".jpg"));
        assert_eq!(variant, derive_key("/100x0/http://host/img.jpg", ".jpg"));
        assert_ne!(original, variant);
    }

    #[test]
    fn test_sizes_of_one_source_coexist() {
        let small = parse_request("/10x0/http://host/img.jpg").unwrap();
        let large = parse_request("/20x0/http://host/img.jpg").unwrap();
        assert_eq!(CacheKey::original(&small), CacheKey::original(&large));
        assert_ne!(CacheKey::variant(&small), CacheKey::variant(&large));
    }

    #[test]
    fn test_format_marker_changes_variant_extension() {
        let req = parse_request("/10x10/jpg/http://host/logo.png").unwrap();
        assert!(CacheKey::original(&req).as_str().ends_with(".png"));
        assert!(CacheKey::variant(&req).as_str().ends_with(".jpg"));
        assert_eq!(
            CacheKey::for_tier(CacheTier::Variant, &req),
            CacheKey::variant(&req)
        );
    }
}
