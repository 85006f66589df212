//! Content-derived identifiers

use sha2::Digest as _;

/// Lowercase hex SHA-256 of `bytes`
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Uuid-shaped identifier derived from a key
///
/// The same key always yields the same identifier, so re-exporting an
/// unchanged graph produces identical output.
pub fn stable_uuid(key: &str) -> String {
    let hex = sha256_hex(key.as_bytes()).to_uppercase();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_stable_uuid_shape_and_stability() {
        let a = stable_uuid("Layer/Truss 1");
        assert_eq!(a, stable_uuid("Layer/Truss 1"));
        assert_ne!(a, stable_uuid("Layer/Truss 2"));
        assert_eq!(a.len(), 36);
        assert_eq!(a.matches('-').count(), 4);
    }
}
