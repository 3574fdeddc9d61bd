//! Small traits shared by the molecule and scoring crates.

/// Stable identity computed from a value's content.
///
/// Two values with the same content hash are treated as duplicates by the
/// input loader.
pub trait ContentAddressable {
    /// Lowercase hex digest.
    fn content_hash(&self) -> String;
}

/// Anything reduced to a single similarity score in `[0, 1]`.
pub trait Scored {
    fn score(&self) -> f64;
}

/// Values that carry a display name.
pub trait Annotated {
    /// Name used in logs and output tables; may be empty.
    fn name(&self) -> &str;
}

/// One-line description for log output.
pub trait Summarizable {
    fn summary(&self) -> String;
}
