//! Unified error interface.
//!
//! Every public error type in the workspace implements [`ErrorCode`]
//! so that errors can be matched, logged and transmitted by a stable
//! machine-readable code rather than by display text.
//!
//! # Code Format
//!
//! - UPPER_SNAKE_CASE, prefixed by layer: `PROTO_`, `GRAPH_`, `SCHED_`,
//!   `TRANSPORT_`, `COMPILE_`, `CONFIG_`
//! - Stable once defined (changing a code is a breaking change)
//!
//! # Example
//!
//! ```
//! use tentacle_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     NotFound,
//!     Timeout,
//! }
//!
//! impl ErrorCode for MyError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::NotFound => "MY_NOT_FOUND",
//!             Self::Timeout => "MY_TIMEOUT",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Timeout)
//!     }
//! }
//!
//! assert_eq!(MyError::Timeout.code(), "MY_TIMEOUT");
//! ```

/// Machine-readable error code interface.
pub trait ErrorCode {
    /// Returns a stable UPPER_SNAKE_CASE code for this error.
    fn code(&self) -> &'static str;

    /// Returns whether retrying the operation may succeed.
    ///
    /// Recoverable: transient conditions (timeouts, full buffers).
    /// Not recoverable: malformed input, invalid references — the
    /// request will not become valid on retry.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error code follows workspace conventions:
/// non-empty, UPPER_SNAKE_CASE, and carrying the expected prefix.
///
/// # Panics
///
/// Panics with a descriptive message if validation fails.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Validates every variant of an error enum at once.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum TestError {
        Transient,
        Permanent,
    }

    impl ErrorCode for TestError {
        fn code(&self) -> &'static str {
            match self {
                Self::Transient => "TEST_TRANSIENT",
                Self::Permanent => "TEST_PERMANENT",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Transient)
        }
    }

    #[test]
    fn error_code_trait() {
        assert_eq!(TestError::Transient.code(), "TEST_TRANSIENT");
        assert!(TestError::Transient.is_recoverable());
        assert!(!TestError::Permanent.is_recoverable());
    }

    #[test]
    fn assert_error_codes_all_variants() {
        assert_error_codes(&[TestError::Transient, TestError::Permanent], "TEST_");
    }

    #[test]
    #[should_panic(expected = "must start with prefix")]
    fn wrong_prefix_panics() {
        assert_error_code(&TestError::Transient, "WRONG_");
    }

    #[test]
    fn upper_snake_case_rules() {
        assert!(is_upper_snake_case("A_B_C"));
        assert!(is_upper_snake_case("ERROR_2"));
        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("_A"));
        assert!(!is_upper_snake_case("A__B"));
        assert!(!is_upper_snake_case("lower"));
    }
}
