//! Content hashing and the override cache (component A).
//!
//! Hashing is the one place the layer touches raw asset bytes before they
//! are attached to a shadow record; everything downstream (dump paths,
//! override lookups, mark queries) is keyed off the hex string this module
//! produces.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Lower-case 64-character hex SHA-256 digest of a byte range.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// The three asset kinds that have their own override/dump subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideKind {
    Image,
    Buffer,
    Shader,
}

impl OverrideKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            OverrideKind::Image => "images",
            OverrideKind::Buffer => "buffers",
            OverrideKind::Shader => "shaders",
        }
    }
}

/// The in-memory set of content hashes for which a replacement asset file
/// exists on disk, one [`HashSet`] per [`OverrideKind`].
#[derive(Debug, Default)]
pub struct OverrideCache {
    known: HashMap<OverrideKind, HashSet<String>>,
}

impl OverrideCache {
    /// Populates the cache by enumerating `<root>/<kind-dir>` for each kind
    /// and collecting the file stem of every entry. Called once at instance
    /// bootstrap; the cache is read-only for the rest of the instance's
    /// lifetime (§5).
    pub fn load(root: &Path) -> Self {
        let mut known: HashMap<OverrideKind, HashSet<String>> = HashMap::new();
        for kind in [OverrideKind::Image, OverrideKind::Buffer, OverrideKind::Shader] {
            let mut hashes = HashSet::new();
            let dir = root.join(kind.dir_name());
            if let Ok(entries) = std::fs::read_dir(&dir) {
                for entry in entries.flatten() {
                    if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                        hashes.insert(stem.to_owned());
                    }
                }
            } else {
                log::debug!("no override directory for {:?} at {:?}", kind, dir);
            }
            known.insert(kind, hashes);
        }
        OverrideCache { known }
    }

    /// The sole query: does a replacement asset exist for this hash?
    pub fn has_override(&self, kind: OverrideKind, hash: &str) -> bool {
        self.known
            .get(&kind)
            .map(|set| set.contains(hash))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hash_is_correct_length_and_value() {
        let h = sha256_hex(b"");
        assert_eq!(h.len(), 64);
        assert_eq!(h, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85");
    }

    #[test]
    fn override_cache_missing_dir_is_empty_not_error() {
        let cache = OverrideCache::load(Path::new("/nonexistent/root/for/test"));
        assert!(!cache.has_override(OverrideKind::Image, "deadbeef"));
    }

    #[test]
    fn override_cache_finds_file_stem() {
        let dir = std::env::temp_dir().join(format!("wiretap-hash-test-{:?}", std::thread::current().id()));
        let images = dir.join("images");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("abc123.image"), b"replacement").unwrap();

        let cache = OverrideCache::load(&dir);
        assert!(cache.has_override(OverrideKind::Image, "abc123"));
        assert!(!cache.has_override(OverrideKind::Buffer, "abc123"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
