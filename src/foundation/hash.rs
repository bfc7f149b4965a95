use std::path::Path;

const DJB2_SEED: u32 = 5381;

/// Order-sensitive djb2 hash (`h = h * 33 + byte`, seeded at 5381) of a path's bytes.
///
/// Paths are hashed exactly as given; `a/b.png` and `./a/b.png` produce different keys.
pub fn hash_path(path: impl AsRef<Path>) -> u32 {
    hash_bytes(path.as_ref().as_os_str().as_encoded_bytes())
}

pub(crate) fn hash_bytes(bytes: &[u8]) -> u32 {
    bytes.iter().fold(DJB2_SEED, |h, &c| {
        (h << 5).wrapping_add(h).wrapping_add(u32::from(c))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/hash.rs"]
mod tests;
