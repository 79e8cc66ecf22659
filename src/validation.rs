//! # Validation
//!
//! Every documented precondition of the slice types runs through [`require!`]. Violations are
//! programmer error: continuing after one would silently corrupt the contour data, so a failed
//! check panics with a descriptive message rather than returning an error value.
//!
//! The checks are evaluated in debug builds, and in every build when the `strict-checks`
//! feature is enabled (the default). Disabling the feature in a release build removes them from
//! the inner loops entirely.

/// Whether precondition checks are evaluated in this build
pub(crate) const CHECKS_ENABLED: bool = cfg!(any(debug_assertions, feature = "strict-checks"));

/// Panics with the formatted message when `cond` is false and checks are enabled
macro_rules! require {
    ($cond:expr, $($arg:tt)+) => {
        if $crate::validation::CHECKS_ENABLED && !($cond) {
            panic!("precondition failed: {}: {}", stringify!($cond), format_args!($($arg)+));
        }
    };
}

#[cfg(test)]
mod test {
    #[test]
    #[should_panic(expected = "precondition failed")]
    fn failed_requirement_panics_with_context() {
        let tstp = 3;
        require!(tstp == 2, "expected the slice at tstp 2, found {}", tstp);
    }

    #[test]
    fn satisfied_requirement_is_silent() {
        require!(1 + 1 == 2, "arithmetic");
    }
}
