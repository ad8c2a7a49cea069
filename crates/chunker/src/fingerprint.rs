use crate::error::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Incremental content hash over serializable sections.
///
/// Each section is length-prefixed so that moving bytes between adjacent
/// sections changes the digest.
pub struct Fingerprinter {
    hasher: Sha256,
}

impl Fingerprinter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    /// Feed one labelled section
    pub fn section<T: Serialize + ?Sized>(&mut self, label: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.hasher.update(label.as_bytes());
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(&bytes);
        Ok(())
    }

    /// Hex digest
    #[must_use]
    pub fn finish(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(parts: &[(&str, &str)]) -> String {
        let mut fp = Fingerprinter::new();
        for (label, value) in parts {
            fp.section(label, value).unwrap();
        }
        fp.finish()
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(digest(&[("a", "x")]), digest(&[("a", "x")]));
        assert_eq!(digest(&[("a", "x")]).len(), 64);
    }

    #[test]
    fn test_section_boundaries_matter() {
        assert_ne!(
            digest(&[("a", "xy"), ("b", "z")]),
            digest(&[("a", "x"), ("b", "yz")])
        );
    }
}
