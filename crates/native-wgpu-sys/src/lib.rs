//! Raw bindings to the wgpu-native C ABI.
//!
//! This crate only describes memory layouts and the function table; it
//! performs no validation. Safe wrappers live in the `native-wgpu` crate.
//!
//! - [`handles`] - opaque object pointers
//! - [`enums`] - C enums as transparent `u32` newtypes
//! - [`chained`] - extension-chain header and extension layouts
//! - [`descriptors`] - descriptor structs
//! - [`callbacks`] - `extern "C"` callback signatures
//! - [`api`] - the [`NativeApi`] function table (and `LinkedNative` with the
//!   `link` feature)

pub mod api;
pub mod callbacks;
pub mod chained;
pub mod descriptors;
pub mod enums;
pub mod handles;

pub use api::*;
pub use callbacks::*;
pub use chained::*;
pub use descriptors::*;
pub use enums::*;
pub use handles::*;
