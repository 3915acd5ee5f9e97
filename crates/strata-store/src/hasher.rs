use strata_types::ObjectId;

/// Domain-separated BLAKE3 hasher for stored objects.
///
/// The domain tag is mixed in ahead of the payload so that a blob and a tree
/// with identical serialized bytes never share an ID.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    pub const BLOB: Self = Self::new("strata-blob-v1");
    pub const TREE: Self = Self::new("strata-tree-v1");

    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash `data` under this hasher's domain.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Returns `true` if `data` hashes to `expected` under this domain.
    pub fn verify(&self, data: &[u8], expected: &ObjectId) -> bool {
        self.hash(data) == *expected
    }

    pub fn domain(&self) -> &str {
        self.domain
    }
}
