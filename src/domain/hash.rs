use std::fmt::Display;

use blake3::Hash;

/// Content address of an uploaded asset.
///
/// Uploading the same bytes twice yields the same digest, and therefore the
/// same stored file and URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetDigest(pub Hash);

impl AssetDigest {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    pub fn from_hex(hex: &str) -> anyhow::Result<Self> {
        Ok(Self(Hash::from_hex(hex)?))
    }
}

impl Display for AssetDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::AssetDigest;

    #[test]
    fn same_bytes_same_digest() {
        let a = AssetDigest::from_bytes(b"lofi loop");
        let b = AssetDigest::from_bytes(b"lofi loop");
        let c = AssetDigest::from_bytes(b"ambient pad");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hex_round_trip_and_rejects_garbage() -> anyhow::Result<()> {
        let digest = AssetDigest::from_bytes(&[1, 2, 3]);
        assert_eq!(AssetDigest::from_hex(&digest.to_hex())?, digest);
        assert!(AssetDigest::from_hex("not-a-digest").is_err());
        Ok(())
    }
}
