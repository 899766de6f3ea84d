use std::collections::BTreeMap;

/// SHA-1 fingerprints of release source tarballs, keyed by version.
const SOURCE_FINGERPRINTS: &[(&str, &str)] = &[
    ("1.1", "a464704ebbbdd552a39b5f9429b059c117d165b3"),
    ("1.1.1", "f365aed8183e487a48a66ace7bf36e5974dffbb3"),
    ("1.1.2", "f5ab02bbfb0281b6c19520f44f7bc26f9da563fb"),
    ("1.2", "7dd2408d40471aeb30a9e0b502c6717b5bf383a5"),
    ("1.2.1", "6a4b9991eddd8039438438d6aa25126ab7e07f2f"),
    ("1.2.2", "3ce0ac4db434fc1546fec074841ff40dc48c1167"),
    ("1.3", "9f9dfcbcb4fa126b2b66c0830dc733215f2f056e"),
    ("1.3.1", "bc296c9c305bacfbd7bff9e1b54f6f66ae421e6e"),
    ("1.3.2", "67d3a692588c259f9fe9dca5b80109e5b99271df"),
    ("1.3.3", "b54b7deb7b7afe9f5d9a3f5dd830c7dede35393a"),
    ("1.3rc1", "6a9dac2e65c07627fe51899e0031e298560b0097"),
    ("1.3rc2", "53a5b75c8bb2399c36ed8fe14f64bd2df34ca4d9"),
    ("1.4beta1", "f2fece0c9f9cdc6e8a85ab56b7f1ffcb57c3e7cd"),
];

/// SHA-1 fingerprints of prebuilt archives, keyed by binary version name.
const BINARY_FINGERPRINTS: &[(&str, &str)] = &[
    ("1.2.2.linux-386", "d16f892173b0589945d141cefb22adce57e3be9c"),
    ("1.2.2.linux-amd64", "6bd151ca49c435462c8bf019477a6244b958ebb5"),
    ("1.3.linux-amd64", "b6b154933039987056ac307e20c25fa508a06ba6"),
    ("1.3.1.linux-amd64", "3af011cc19b21c7180f2604fd85fbc4ddde97143"),
    ("1.3.2.darwin-amd64-osx10.8", "323bf8088614d58fee2b4d2cb07d837063d7d77e"),
    ("1.3.2.linux-386", "3cbfd62d401a6ca70779856fa8ad8c4d6c35c8cc"),
    ("1.3.2.linux-amd64", "0e4b6120eee6d45e2e4374dac4fe7607df4cbe42"),
    ("1.3.2.windows-amd64", "7f7147484b1bc9e52cf034de816146977d0137f6"),
    ("1.3.3.darwin-amd64-osx10.8", "be686ec7ba68d588735cc2094ccab8bdd651de9e"),
    ("1.3.3.linux-amd64", "14068fbe349db34b838853a7878621bbd2b24646"),
    ("1.4beta1.linux-amd64", "d2712acdaa4469ce2dc57c112a70900667269ca0"),
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{version} is not a supported version; you must download and compile it yourself")]
pub struct UnknownVersion {
    pub version: String,
}

/// Known-good download fingerprints. Lookups fail closed.
#[derive(Clone, Debug, Default)]
pub struct FingerprintTable {
    sources: BTreeMap<String, String>,
    binaries: BTreeMap<String, String>,
}

impl FingerprintTable {
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_entries(SOURCE_FINGERPRINTS, BINARY_FINGERPRINTS)
    }

    #[must_use]
    pub fn from_entries(sources: &[(&str, &str)], binaries: &[(&str, &str)]) -> Self {
        let collect = |entries: &[(&str, &str)]| {
            entries
                .iter()
                .map(|(version, sha)| ((*version).to_string(), sha.to_ascii_lowercase()))
                .collect()
        };
        Self {
            sources: collect(sources),
            binaries: collect(binaries),
        }
    }

    /// Expected fingerprint for a source version or binary version name.
    ///
    /// # Errors
    /// Returns [`UnknownVersion`] when the name is absent from both tables.
    pub fn lookup(&self, version: &str) -> Result<&str, UnknownVersion> {
        self.sources
            .get(version)
            .or_else(|| self.binaries.get(version))
            .map(String::as_str)
            .ok_or_else(|| UnknownVersion {
                version: version.to_string(),
            })
    }

    #[must_use]
    pub fn is_source(&self, version: &str) -> bool {
        self.sources.contains_key(version)
    }

    #[must_use]
    pub fn is_binary(&self, version: &str) -> bool {
        self.binaries.contains_key(version)
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn binaries(&self) -> impl Iterator<Item = &str> {
        self.binaries.keys().map(String::as_str)
    }
}
