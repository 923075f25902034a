//! `extern "C"` trampolines for native callbacks.
//!
//! One-shot callbacks (adapter and device requests, async pipeline creation,
//! error scope pops, buffer maps, queue work-done notifications, shader
//! compilation info) box the Rust closure and pass the box
//! as `userdata`. The trampoline takes the box back exactly once and runs the
//! closure. If the native side never calls back, the box leaks; it is never
//! freed early.
//!
//! Long-lived callbacks (uncaptured errors, device loss) are stored in a
//! [`CallbackKeeper`] owned by the device. The native side only borrows them.

use std::any::Any;
use std::ffi::{c_char, c_void};
use std::ptr;

use native_wgpu_sys as sys;
use parking_lot::Mutex;

use crate::marshal::message_to_string;
use crate::shader::CompilationMessage;

/// Box `value` for the trip through the native side.
fn into_userdata<T>(value: T) -> *mut c_void {
    Box::into_raw(Box::new(value)).cast()
}

/// # Safety
///
/// `userdata` must come from `into_userdata::<T>` and not have been taken yet.
unsafe fn take_userdata<T>(userdata: *mut c_void) -> Box<T> {
    unsafe { Box::from_raw(userdata.cast::<T>()) }
}

// ============================================================================
// One-shot callbacks
// ============================================================================

/// Trampoline and userdata for an adapter request.
pub(crate) fn request_adapter<F>(callback: F) -> (sys::RequestAdapterCallback, *mut c_void)
where
    F: FnOnce(sys::RequestAdapterStatus, sys::Adapter, String) + Send + 'static,
{
    (Some(request_adapter_trampoline::<F>), into_userdata(callback))
}

unsafe extern "C" fn request_adapter_trampoline<F>(
    status: sys::RequestAdapterStatus,
    adapter: sys::Adapter,
    message: *const c_char,
    userdata: *mut c_void,
) where
    F: FnOnce(sys::RequestAdapterStatus, sys::Adapter, String),
{
    let callback = unsafe { take_userdata::<F>(userdata) };
    let message = unsafe { message_to_string(message) };
    callback(status, adapter, message);
}

pub(crate) fn request_device<F>(callback: F) -> (sys::RequestDeviceCallback, *mut c_void)
where
    F: FnOnce(sys::RequestDeviceStatus, sys::Device, String) + Send + 'static,
{
    (Some(request_device_trampoline::<F>), into_userdata(callback))
}

unsafe extern "C" fn request_device_trampoline<F>(
    status: sys::RequestDeviceStatus,
    device: sys::Device,
    message: *const c_char,
    userdata: *mut c_void,
) where
    F: FnOnce(sys::RequestDeviceStatus, sys::Device, String),
{
    let callback = unsafe { take_userdata::<F>(userdata) };
    let message = unsafe { message_to_string(message) };
    callback(status, device, message);
}

/// Signature shared by the compute and render pipeline creation callbacks.
pub(crate) type CreatePipelineCallback<H> =
    Option<unsafe extern "C" fn(sys::CreatePipelineAsyncStatus, *mut H, *const c_char, *mut c_void)>;

/// Trampoline and userdata for async pipeline creation of handle type `H`.
pub(crate) fn create_pipeline<H, F>(callback: F) -> (CreatePipelineCallback<H>, *mut c_void)
where
    H: 'static,
    F: FnOnce(sys::CreatePipelineAsyncStatus, *mut H, String) + Send + 'static,
{
    (Some(create_pipeline_trampoline::<H, F>), into_userdata(callback))
}

unsafe extern "C" fn create_pipeline_trampoline<H, F>(
    status: sys::CreatePipelineAsyncStatus,
    pipeline: *mut H,
    message: *const c_char,
    userdata: *mut c_void,
) where
    F: FnOnce(sys::CreatePipelineAsyncStatus, *mut H, String),
{
    let callback = unsafe { take_userdata::<F>(userdata) };
    let message = unsafe { message_to_string(message) };
    callback(status, pipeline, message);
}

/// Trampoline and userdata for a single error report (error scope pop).
pub(crate) fn error_once<F>(callback: F) -> (sys::ErrorCallback, *mut c_void)
where
    F: FnOnce(sys::ErrorType, String) + Send + 'static,
{
    (Some(error_once_trampoline::<F>), into_userdata(callback))
}

unsafe extern "C" fn error_once_trampoline<F>(
    error_type: sys::ErrorType,
    message: *const c_char,
    userdata: *mut c_void,
) where
    F: FnOnce(sys::ErrorType, String),
{
    let callback = unsafe { take_userdata::<F>(userdata) };
    let message = unsafe { message_to_string(message) };
    callback(error_type, message);
}

pub(crate) fn buffer_map<F>(callback: F) -> (sys::BufferMapCallback, *mut c_void)
where
    F: FnOnce(sys::BufferMapAsyncStatus) + Send + 'static,
{
    (Some(buffer_map_trampoline::<F>), into_userdata(callback))
}

unsafe extern "C" fn buffer_map_trampoline<F>(status: sys::BufferMapAsyncStatus, userdata: *mut c_void)
where
    F: FnOnce(sys::BufferMapAsyncStatus),
{
    let callback = unsafe { take_userdata::<F>(userdata) };
    callback(status);
}

pub(crate) fn work_done<F>(callback: F) -> (sys::QueueWorkDoneCallback, *mut c_void)
where
    F: FnOnce(sys::QueueWorkDoneStatus) + Send + 'static,
{
    (Some(work_done_trampoline::<F>), into_userdata(callback))
}

unsafe extern "C" fn work_done_trampoline<F>(status: sys::QueueWorkDoneStatus, userdata: *mut c_void)
where
    F: FnOnce(sys::QueueWorkDoneStatus),
{
    let callback = unsafe { take_userdata::<F>(userdata) };
    callback(status);
}

/// The messages are copied out before `callback` runs; the native info is
/// only borrowed for the duration of the call.
pub(crate) fn compilation_info<F>(callback: F) -> (sys::CompilationInfoCallback, *mut c_void)
where
    F: FnOnce(sys::CompilationInfoRequestStatus, Vec<CompilationMessage>) + Send + 'static,
{
    (Some(compilation_info_trampoline::<F>), into_userdata(callback))
}

unsafe extern "C" fn compilation_info_trampoline<F>(
    status: sys::CompilationInfoRequestStatus,
    info: *const sys::CompilationInfo,
    userdata: *mut c_void,
) where
    F: FnOnce(sys::CompilationInfoRequestStatus, Vec<CompilationMessage>),
{
    let callback = unsafe { take_userdata::<F>(userdata) };
    let messages = match unsafe { info.as_ref() } {
        Some(info) if !info.messages.is_null() && info.message_count > 0 => {
            unsafe { std::slice::from_raw_parts(info.messages, info.message_count) }
                .iter()
                .map(|message| unsafe { CompilationMessage::from_native(message) })
                .collect()
        }
        _ => Vec::new(),
    };
    callback(status, messages);
}

// ============================================================================
// Long-lived callbacks
// ============================================================================

unsafe extern "C" fn uncaptured_error<F>(error_type: sys::ErrorType, message: *const c_char, userdata: *mut c_void)
where
    F: Fn(sys::ErrorType, String) + Send + Sync + 'static,
{
    // SAFETY: the keeper holds the closure until it is replaced or the device
    // is gone, and the device unregisters it before dropping it.
    let callback = unsafe { &*userdata.cast::<F>() };
    callback(error_type, unsafe { message_to_string(message) });
}

unsafe extern "C" fn device_lost<F>(reason: sys::DeviceLostReason, message: *const c_char, userdata: *mut c_void)
where
    F: Fn(sys::DeviceLostReason, String) + Send + Sync + 'static,
{
    let callback = unsafe { &*userdata.cast::<F>() };
    callback(reason, unsafe { message_to_string(message) });
}

type Kept = Box<dyn Any + Send + Sync>;

/// Storage for callbacks the native side may invoke for the lifetime of a
/// device.
#[derive(Default)]
pub(crate) struct CallbackKeeper {
    uncaptured_error: Mutex<Option<Kept>>,
    device_lost: Mutex<Option<Kept>>,
}

impl CallbackKeeper {
    /// Store `callback` and return the trampoline and userdata to register.
    /// The previous callback, if any, is returned so the caller can drop it
    /// after the native side stopped pointing at it.
    pub fn keep_uncaptured_error<F>(&self, callback: F) -> (sys::ErrorCallback, *mut c_void, Option<Kept>)
    where
        F: Fn(sys::ErrorType, String) + Send + Sync + 'static,
    {
        let boxed = Box::new(callback);
        let userdata = ptr::from_ref::<F>(&boxed).cast_mut().cast::<c_void>();
        let previous = self.uncaptured_error.lock().replace(boxed);
        (Some(uncaptured_error::<F>), userdata, previous)
    }

    pub fn keep_device_lost<F>(&self, callback: F) -> (sys::DeviceLostCallback, *mut c_void, Option<Kept>)
    where
        F: Fn(sys::DeviceLostReason, String) + Send + Sync + 'static,
    {
        let boxed = Box::new(callback);
        let userdata = ptr::from_ref::<F>(&boxed).cast_mut().cast::<c_void>();
        let previous = self.device_lost.lock().replace(boxed);
        (Some(device_lost::<F>), userdata, previous)
    }

    pub fn has_uncaptured_error(&self) -> bool {
        self.uncaptured_error.lock().is_some()
    }

    pub fn has_device_lost(&self) -> bool {
        self.device_lost.lock().is_some()
    }
}

// ============================================================================
// Native log forwarding
// ============================================================================

/// Target used for events forwarded from the native library.
pub const NATIVE_LOG_TARGET: &str = "native_wgpu::native";

pub(crate) unsafe extern "C" fn forward_native_log(level: sys::LogLevel, message: *const c_char, _userdata: *mut c_void) {
    let message = unsafe { message_to_string(message) };
    match level {
        sys::LogLevel::ERROR => tracing::error!(target: NATIVE_LOG_TARGET, "{}", message),
        sys::LogLevel::WARN => tracing::warn!(target: NATIVE_LOG_TARGET, "{}", message),
        sys::LogLevel::INFO => tracing::info!(target: NATIVE_LOG_TARGET, "{}", message),
        sys::LogLevel::DEBUG => tracing::debug!(target: NATIVE_LOG_TARGET, "{}", message),
        _ => tracing::trace!(target: NATIVE_LOG_TARGET, "{}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_one_shot_runs_with_status() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let (callback, userdata) = buffer_map(move |status| {
            *sink.lock() = Some(status);
        });

        unsafe { callback.unwrap()(sys::BufferMapAsyncStatus::SUCCESS, userdata) };
        assert_eq!(*seen.lock(), Some(sys::BufferMapAsyncStatus::SUCCESS));
        assert_eq!(Arc::strong_count(&seen), 1);
    }

    #[test]
    fn test_one_shot_copies_message() {
        let seen = Arc::new(Mutex::new(String::new()));
        let sink = seen.clone();
        let (callback, userdata) = request_device(move |status, device, message| {
            assert_eq!(status, sys::RequestDeviceStatus::ERROR);
            assert!(device.is_null());
            *sink.lock() = message;
        });

        unsafe {
            callback.unwrap()(
                sys::RequestDeviceStatus::ERROR,
                ptr::null_mut(),
                c"no device".as_ptr(),
                userdata,
            )
        };
        assert_eq!(*seen.lock(), "no device");
    }

    #[test]
    fn test_compilation_info_copies_messages() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let (callback, userdata) = compilation_info(move |status, messages| {
            assert_eq!(status, sys::CompilationInfoRequestStatus::SUCCESS);
            *sink.lock() = messages;
        });

        let native = [sys::CompilationMessage {
            next_in_chain: ptr::null(),
            message: c"unused variable".as_ptr(),
            type_: sys::CompilationMessageType::WARNING,
            line_num: 3,
            line_pos: 9,
            offset: 41,
            length: 4,
        }];
        let info = sys::CompilationInfo {
            next_in_chain: ptr::null(),
            message_count: native.len(),
            messages: native.as_ptr(),
        };
        unsafe { callback.unwrap()(sys::CompilationInfoRequestStatus::SUCCESS, &info, userdata) };

        let messages = seen.lock();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "unused variable");
        assert_eq!(messages[0].ty, sys::CompilationMessageType::WARNING);
        assert_eq!((messages[0].line_num, messages[0].line_pos), (3, 9));
    }

    #[test]
    fn test_pipeline_callback_passes_handle_through() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let (callback, userdata) = create_pipeline::<sys::ComputePipelineImpl, _>(move |status, pipeline, message| {
            *sink.lock() = Some((status, pipeline.addr(), message));
        });

        let pipeline: sys::ComputePipeline = ptr::without_provenance_mut(0x40);
        unsafe { callback.unwrap()(sys::CreatePipelineAsyncStatus::SUCCESS, pipeline, ptr::null(), userdata) };
        assert_eq!(
            *seen.lock(),
            Some((sys::CreatePipelineAsyncStatus::SUCCESS, 0x40, String::new()))
        );
    }

    #[test]
    fn test_keeper_callback_fires_repeatedly() {
        let keeper = CallbackKeeper::default();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let (callback, userdata, previous) = keeper.keep_uncaptured_error(move |error_type, message| {
            assert_eq!(error_type, sys::ErrorType::VALIDATION);
            assert_eq!(message, "bad binding");
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(previous.is_none());

        let callback = callback.unwrap();
        for _ in 0..2 {
            unsafe { callback(sys::ErrorType::VALIDATION, c"bad binding".as_ptr(), userdata) };
        }
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(keeper.has_uncaptured_error());
    }

    #[test]
    fn test_keeper_returns_previous() {
        let keeper = CallbackKeeper::default();
        let _ = keeper.keep_device_lost(|_, _| {});
        let (_, _, previous) = keeper.keep_device_lost(|_, _| {});
        assert!(previous.is_some());
        assert!(keeper.has_device_lost());
    }
}
