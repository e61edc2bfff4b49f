use sha2::{Digest, Sha256};

/// Order-sensitive fingerprint of a pack list, lowercase hex.
pub(crate) fn hash_pack_names<S: AsRef<str>>(names_in_order: &[S]) -> String {
    let mut hasher = Sha256::new();
    for name in names_in_order {
        hasher.update(name.as_ref().as_bytes());
        hasher.update([0u8]);
    }
    to_hex_lower(&hasher.finalize())
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_hash_is_order_sensitive() {
        let a = hash_pack_names(&["builtin", "file/a", "file/b"]);
        let b = hash_pack_names(&["builtin", "file/b", "file/a"]);
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn separator_prevents_concatenation_collisions() {
        assert_ne!(hash_pack_names(&["ab", "c"]), hash_pack_names(&["a", "bc"]));
    }
}
