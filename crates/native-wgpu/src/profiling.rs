//! Profiling hooks based on the `puffin` crate.
//!
//! Scopes are only recorded with the `profiling` feature; without it the
//! macros expand to nothing.

#[cfg(feature = "profiling")]
pub use puffin::{GlobalProfiler, profile_function, profile_scope};

#[cfg(not(feature = "profiling"))]
#[macro_export]
#[doc(hidden)]
macro_rules! __profile_function_disabled {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "profiling"))]
pub use crate::__profile_function_disabled as profile_function;

#[cfg(not(feature = "profiling"))]
pub use crate::__profile_function_disabled as profile_scope;

/// Turn puffin scope collection on or off.
#[cfg(feature = "profiling")]
pub fn set_enabled(enabled: bool) {
    puffin::set_scopes_on(enabled);
}

/// Mark the start of a new frame for profiling.
#[cfg(feature = "profiling")]
#[inline]
pub fn new_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}
