use std::fmt::{Debug, Display};

use camino::Utf8PathBuf;

/// A 32-byte BLAKE3 digest of an ordered list of classpath entries.
///
/// Consumers use it to tell whether a classpath changed between two
/// evaluations without comparing the entries one by one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub(crate) fn of_paths(paths: &[Utf8PathBuf]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for path in paths {
            hasher.update(path.as_str().as_bytes());
            // separator, so that ["ab"] and ["a", "b"] differ
            hasher.update(&[0]);
        }
        Fingerprint(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(self) -> String {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut acc = String::with_capacity(64);

        for &byte in &self.0 {
            acc.push(HEX[(byte >> 4) as usize] as char);
            acc.push(HEX[(byte & 0xF) as usize] as char);
        }

        acc
    }
}

impl Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_and_boundaries_matter() {
        let ab = Fingerprint::of_paths(&["a".into(), "b".into()]);
        let ba = Fingerprint::of_paths(&["b".into(), "a".into()]);
        let joined = Fingerprint::of_paths(&["ab".into()]);

        assert_ne!(ab, ba);
        assert_ne!(ab, joined);
        assert_eq!(ab, Fingerprint::of_paths(&["a".into(), "b".into()]));
        assert_eq!(ab.to_hex().len(), 64);
    }
}
