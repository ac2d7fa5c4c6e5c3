//! Utility macros shared by the exchange implementation.

/// Returns early with `Err($error)` when `$predicate` does not hold.
///
/// This behaves like `assert!`, except that it hands the error back to the
/// caller instead of panicking.
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
