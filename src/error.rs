//! Error classification shared by the crate's error enums.

/// Grepable error codes for errors that cross the engine boundary.
///
/// Each error enum maps its variants to a stable `E_*` string so hosts can
/// branch on failures without matching on display text.
pub trait ErrorCode {
    /// Stable machine-readable code.
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same operation may succeed.
    fn retryable(&self) -> bool {
        false
    }
}
