mod raw {
    // See https://docs.rs/built/latest/built/index.html for the full list of constants in built.rs.
    // We only use a few of them.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// genheap crate version such as 0.1.0
pub const GENHEAP_PKG_VERSION: &str = raw::PKG_VERSION;

/// Comma separated features enabled for this build
pub const GENHEAP_FEATURES: &str = raw::FEATURES_STR;

/// `release` for release builds, `debug` for other builds.
pub const GENHEAP_PROFILE: &str = raw::PROFILE;

lazy_static! {
    /// Git version such as a96e8f991c91a81df51e7975849441f52fdbcdcc, or a96e8f991c91a81df51e7975849441f52fdbcdcc-dirty,
    /// or unknown-git-version if genheap is not built from a git repo.
    pub static ref GENHEAP_GIT_VERSION: &'static str = &GENHEAP_GIT_VERSION_STRING;

    // Owned string
    static ref GENHEAP_GIT_VERSION_STRING: String = match (raw::GIT_COMMIT_HASH, raw::GIT_DIRTY) {
        (Some(hash), Some(true)) => format!("{}-dirty", hash),
        (Some(hash), _) => hash.to_string(),
        (None, _) => "unknown-git-version".to_string(),
    };

    /// Full build info, such as "0.1.0 (debug, a96e8f991c91a81df51e7975849441f52fdbcdcc)"
    pub static ref GENHEAP_FULL_BUILD_INFO: String = format!(
        "{} ({}, {})",
        GENHEAP_PKG_VERSION, GENHEAP_PROFILE, *GENHEAP_GIT_VERSION
    );
}
