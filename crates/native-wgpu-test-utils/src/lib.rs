//! Test utilities for native-wgpu.
//!
//! This crate provides a stand-in for the native library so the safe wrapper
//! can be tested without a GPU or the `wgpu_native` shared library.
//!
//! # Overview
//!
//! The main components are:
//!
//! - [`chain_walk`] - Decodes raw extension chains into owned [`ChainEntry`] values
//! - `MockNative` - [`NativeApi`](native_wgpu_sys::NativeApi) implementation that
//!   records calls and audits handle ownership (requires `mock` feature)
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use native_wgpu_sys::{self as sys, NativeApi};
//! use native_wgpu_test_utils::{MockKind, MockNative};
//!
//! let mock = MockNative::new();
//! let device: sys::Device = mock.fake_handle();
//!
//! let queue = unsafe { mock.device_get_queue(device) };
//! assert_eq!(queue, unsafe { mock.device_get_queue(device) });
//!
//! unsafe { mock.queue_drop(queue) };
//! assert_eq!(mock.count_releases(MockKind::Queue), 1);
//! assert!(mock.violations().is_empty());
//! # }
//! ```
//!
//! # Handle auditing
//!
//! Every handle the mock issues stays in its ledger after release, so tests
//! can ask how often a handle was released or destroyed and whether a
//! released handle was passed back in. Misuse is collected as `Violation`s
//! rather than panicking inside an `extern "C"` path.

pub mod chain_walk;
#[cfg(feature = "mock")]
pub mod mock_native;

pub use chain_walk::*;
#[cfg(feature = "mock")]
pub use mock_native::*;
