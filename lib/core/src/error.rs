//! Error handling foundation for pathway.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own domain-specific error types in its own
//! error module and converts them into reports as they propagate.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_alias_carries_typed_context() {
        #[derive(Debug)]
        struct Rejected;

        impl std::fmt::Display for Rejected {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("rejected")
            }
        }

        impl std::error::Error for Rejected {}

        let failed: Result<i32, Rejected> = Err(Rejected.into());
        let report = failed.expect_err("should fail");
        assert_eq!(report.current_context().to_string(), "rejected");
    }
}
