//! Mock implementation of [`NativeApi`] for testing.
//!
//! `MockNative` hands out fake, never-dereferenced handles and records every
//! call so tests can check what the wrapper layer sent across the ABI. It also
//! keeps a ledger of every handle it issued and reports protocol violations:
//! releasing a handle twice, releasing a handle the native side already took
//! ownership of, or passing a released handle to another call.

use std::ffi::{CString, c_char, c_void};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ahash::HashMap;
use native_wgpu_sys::{self as sys, NativeApi};
use parking_lot::Mutex;

use crate::chain_walk::{ChainEntry, decode_chain, read_c_str, read_slice};

const FIRST_HANDLE: usize = 0x1000;
const HANDLE_STRIDE: usize = 0x10;

/// Object kinds the mock distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockKind {
    Instance,
    Adapter,
    Surface,
    Device,
    Queue,
    Buffer,
    Texture,
    TextureView,
    Sampler,
    BindGroupLayout,
    BindGroup,
    PipelineLayout,
    ShaderModule,
    ComputePipeline,
    RenderPipeline,
    CommandEncoder,
    CommandBuffer,
    ComputePass,
    RenderPass,
    QuerySet,
    SwapChain,
}

/// Opaque sys types the mock can issue handles for.
pub trait MockHandle {
    const KIND: MockKind;
}

macro_rules! mock_handles {
    ($($opaque:ident => $kind:ident,)*) => {
        $(
            impl MockHandle for sys::$opaque {
                const KIND: MockKind = MockKind::$kind;
            }
        )*
    };
}

mock_handles! {
    InstanceImpl => Instance,
    AdapterImpl => Adapter,
    SurfaceImpl => Surface,
    DeviceImpl => Device,
    QueueImpl => Queue,
    BufferImpl => Buffer,
    TextureImpl => Texture,
    TextureViewImpl => TextureView,
    SamplerImpl => Sampler,
    BindGroupLayoutImpl => BindGroupLayout,
    BindGroupImpl => BindGroup,
    PipelineLayoutImpl => PipelineLayout,
    ShaderModuleImpl => ShaderModule,
    ComputePipelineImpl => ComputePipeline,
    RenderPipelineImpl => RenderPipeline,
    CommandEncoderImpl => CommandEncoder,
    CommandBufferImpl => CommandBuffer,
    ComputePassEncoderImpl => ComputePass,
    RenderPassEncoderImpl => RenderPass,
    QuerySetImpl => QuerySet,
    SwapChainImpl => SwapChain,
}

// ============================================================================
// Recorded calls
// ============================================================================

/// A successful create call.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedObject {
    pub kind: MockKind,
    pub handle: usize,
    pub label: Option<String>,
    /// Decoded extension chain of the descriptor. For render pipelines the
    /// primitive state's chain follows the descriptor's own.
    pub chain: Vec<ChainEntry>,
}

/// An adapter or device request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    pub kind: MockKind,
    pub label: Option<String>,
    pub chain: Vec<ChainEntry>,
    /// Chain hanging off the required limits (device requests only).
    pub limits_chain: Vec<ChainEntry>,
    pub features: Vec<sys::FeatureName>,
}

/// Records a native call for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    Create(CreatedObject),
    CreateFailed { kind: MockKind },
    /// A lookup that returns a handle the caller does not own exclusively.
    Get { kind: MockKind, handle: usize },
    Request(RequestRecord),
    Destroy { kind: MockKind, handle: usize },
    Release { kind: MockKind, handle: usize },
    Submit { command_buffers: Vec<usize> },
    WriteBuffer { buffer: usize, offset: u64, data: Vec<u8> },
    MapAsync { buffer: usize, mode: sys::Flags, offset: usize, size: usize },
    Unmap { buffer: usize },
    PushErrorScope { device: usize, filter: sys::ErrorFilter },
    PopErrorScope { device: usize },
    SetLogLevel(sys::LogLevel),
    SetLogCallback { installed: bool },
    Present { swap_chain: usize },
    /// Any other call, by native function name.
    Command { name: &'static str, target: usize },
}

/// A misuse of the native protocol detected by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    DoubleRelease { kind: MockKind, handle: usize },
    /// The handle was released after a call that took ownership of it.
    ReleaseOfConsumed { kind: MockKind, handle: usize },
    UseAfterRelease { function: &'static str, kind: MockKind, handle: usize },
    UnknownHandle { function: &'static str, handle: usize },
}

/// When the mock invokes request, map and error scope callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallbackMode {
    /// Inside the call that registered the callback.
    #[default]
    Immediate,
    /// On [`MockNative::flush_pending`], `instance_process_events` or
    /// `device_poll`.
    Deferred,
}

// ============================================================================
// Internal state
// ============================================================================

/// Raw pointer that may cross threads inside a pending callback.
struct SendPtr<T>(*mut T);

impl<T> SendPtr<T> {
    fn get(self) -> *mut T {
        self.0
    }
}

impl<T> Clone for SendPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SendPtr<T> {}

// SAFETY: the mock never dereferences these pointers itself; it only hands
// them back to the callback they were registered with.
unsafe impl<T> Send for SendPtr<T> {}
unsafe impl<T> Sync for SendPtr<T> {}

type ErrorFn = unsafe extern "C" fn(sys::ErrorType, *const c_char, *mut c_void);
type LostFn = unsafe extern "C" fn(sys::DeviceLostReason, *const c_char, *mut c_void);
type LogFn = unsafe extern "C" fn(sys::LogLevel, *const c_char, *mut c_void);
type PendingCallback = Box<dyn FnOnce() + Send>;

#[derive(Debug)]
struct MockObject {
    kind: MockKind,
    releases: usize,
    destroys: usize,
    consumed: bool,
}

impl MockObject {
    fn new(kind: MockKind) -> Self {
        Self {
            kind,
            releases: 0,
            destroys: 0,
            consumed: false,
        }
    }

    fn is_live(&self) -> bool {
        self.releases == 0 && !self.consumed
    }
}

struct MockBuffer {
    data: Vec<u8>,
    mapped: bool,
}

#[derive(Default)]
struct State {
    objects: HashMap<usize, MockObject>,
    violations: Vec<Violation>,
    queues: HashMap<usize, usize>,
    pipeline_layouts: HashMap<(usize, u32), usize>,
    current_views: HashMap<usize, usize>,
    buffers: HashMap<usize, MockBuffer>,
    adapter_backends: HashMap<usize, sys::BackendType>,
    error_sinks: HashMap<usize, (ErrorFn, SendPtr<c_void>)>,
    lost_sinks: HashMap<usize, (LostFn, SendPtr<c_void>)>,
    error_scopes: HashMap<usize, Vec<sys::ErrorFilter>>,
    next_scope_error: Option<(sys::ErrorType, String)>,
    request_failure: Option<String>,
    compilation_messages: Vec<(sys::CompilationMessageType, String, u64, u64)>,
    log_sink: Option<(LogFn, SendPtr<c_void>)>,
    log_level: Option<sys::LogLevel>,
}

impl State {
    /// A stable handle stays valid until it is released.
    fn live_stable(&self, handle: Option<&usize>) -> Option<usize> {
        let handle = *handle?;
        self.objects.get(&handle).filter(|object| object.is_live()).map(|_| handle)
    }
}

/// Limits reported by the mock for adapters and devices.
pub fn default_limits() -> sys::Limits {
    sys::Limits {
        max_texture_dimension_1d: 8192,
        max_texture_dimension_2d: 8192,
        max_texture_dimension_3d: 2048,
        max_texture_array_layers: 256,
        max_bind_groups: 4,
        max_uniform_buffer_binding_size: 64 << 10,
        max_storage_buffer_binding_size: 128 << 20,
        max_vertex_buffers: 8,
        max_vertex_attributes: 16,
        ..sys::Limits::UNDEFINED
    }
}

/// Mock implementation of [`NativeApi`] for testing.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use native_wgpu_sys::{self as sys, NativeApi};
/// use native_wgpu_test_utils::{MockKind, MockNative};
///
/// let mock = Arc::new(MockNative::new());
/// let instance = unsafe {
///     mock.create_instance(&sys::InstanceDescriptor { next_in_chain: std::ptr::null() })
/// };
/// assert!(!instance.is_null());
/// assert_eq!(mock.count_creates(MockKind::Instance), 1);
///
/// unsafe { mock.instance_drop(instance) };
/// assert!(mock.violations().is_empty());
/// ```
pub struct MockNative {
    /// Recorded calls for verification
    calls: Mutex<Vec<NativeCall>>,

    /// Handle ledger and per-object data
    state: Mutex<State>,

    /// Callbacks waiting for `flush_pending` in deferred mode
    pending: Mutex<Vec<PendingCallback>>,
    mode: Mutex<CallbackMode>,

    next_handle: AtomicUsize,
    fail_next_creation: AtomicBool,

    features: Vec<sys::FeatureName>,
    limits: sys::Limits,
}

impl MockNative {
    /// Create a new mock with default features and limits.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            state: Mutex::new(State::default()),
            pending: Mutex::new(Vec::new()),
            mode: Mutex::new(CallbackMode::Immediate),
            next_handle: AtomicUsize::new(FIRST_HANDLE),
            fail_next_creation: AtomicBool::new(false),
            features: vec![sys::FeatureName::DEPTH_CLIP_CONTROL, sys::FeatureName::TIMESTAMP_QUERY],
            limits: default_limits(),
        }
    }

    /// Replace the feature list reported by adapters and devices.
    pub fn with_features(mut self, features: &[sys::FeatureName]) -> Self {
        self.features = features.to_vec();
        self
    }

    // ========================================================================
    // Test controls
    // ========================================================================

    /// Make the next create call return null.
    pub fn fail_next_creation(&self) {
        self.fail_next_creation.store(true, Ordering::Release);
    }

    /// Make the next adapter or device request complete with an error.
    pub fn fail_next_request(&self, message: impl Into<String>) {
        self.state.lock().request_failure = Some(message.into());
    }

    /// Report `error_type` from the next error scope pop.
    pub fn set_next_scope_error(&self, error_type: sys::ErrorType, message: impl Into<String>) {
        self.state.lock().next_scope_error = Some((error_type, message.into()));
    }

    /// Messages reported by every later shader compilation info request,
    /// as `(type, text, line, column)`.
    pub fn set_compilation_messages(&self, messages: &[(sys::CompilationMessageType, &str, u64, u64)]) {
        self.state.lock().compilation_messages = messages
            .iter()
            .map(|&(ty, text, line, column)| (ty, text.to_owned(), line, column))
            .collect();
    }

    /// Move the swap chain on to a new image, so the next current view
    /// request returns a different handle.
    pub fn advance_current_view(&self, swap_chain: usize) {
        self.state.lock().current_views.remove(&swap_chain);
    }

    pub fn set_callback_mode(&self, mode: CallbackMode) {
        *self.mode.lock() = mode;
    }

    pub fn pending_callbacks(&self) -> usize {
        self.pending.lock().len()
    }

    /// Run every deferred callback, returning how many ran.
    pub fn flush_pending(&self) -> usize {
        let pending = std::mem::take(&mut *self.pending.lock());
        let count = pending.len();
        for callback in pending {
            callback();
        }
        count
    }

    /// Issue a live handle without recording a create call.
    pub fn fake_handle<T: MockHandle>(&self) -> *mut T {
        self.allocate::<T>()
    }

    /// Invoke the device's uncaptured-error callback. Returns `false` if none
    /// is registered.
    pub fn raise_uncaptured_error(&self, device: usize, error_type: sys::ErrorType, message: &str) -> bool {
        let sink = self.state.lock().error_sinks.get(&device).copied();
        let Some((callback, userdata)) = sink else {
            return false;
        };
        let message = CString::new(message).unwrap_or_default();
        unsafe { callback(error_type, message.as_ptr(), userdata.get()) };
        true
    }

    /// Invoke the device-lost callback. Returns `false` if none is registered.
    pub fn lose_device(&self, device: usize, reason: sys::DeviceLostReason, message: &str) -> bool {
        let sink = self.state.lock().lost_sinks.get(&device).copied();
        let Some((callback, userdata)) = sink else {
            return false;
        };
        let message = CString::new(message).unwrap_or_default();
        unsafe { callback(reason, message.as_ptr(), userdata.get()) };
        true
    }

    /// Send a log line through the installed log callback.
    pub fn emit_log(&self, level: sys::LogLevel, message: &str) -> bool {
        let sink = self.state.lock().log_sink;
        let Some((callback, userdata)) = sink else {
            return false;
        };
        let message = CString::new(message).unwrap_or_default();
        unsafe { callback(level, message.as_ptr(), userdata.get()) };
        true
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<NativeCall> {
        self.calls.lock().clone()
    }

    /// Clear recorded calls (useful between test steps).
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Get total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn count_calls(&self, predicate: impl Fn(&NativeCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    pub fn count_creates(&self, kind: MockKind) -> usize {
        self.count_calls(|call| matches!(call, NativeCall::Create(created) if created.kind == kind))
    }

    pub fn count_releases(&self, kind: MockKind) -> usize {
        self.count_calls(|call| matches!(call, NativeCall::Release { kind: released, .. } if *released == kind))
    }

    /// Count `Command` calls with the given native function name.
    pub fn count_commands(&self, name: &str) -> usize {
        self.count_calls(|call| matches!(call, NativeCall::Command { name: called, .. } if *called == name))
    }

    /// Every successful create of `kind`, oldest first.
    pub fn created(&self, kind: MockKind) -> Vec<CreatedObject> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                NativeCall::Create(created) if created.kind == kind => Some(created.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_created(&self, kind: MockKind) -> Option<CreatedObject> {
        self.created(kind).pop()
    }

    pub fn last_request(&self, kind: MockKind) -> Option<RequestRecord> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            NativeCall::Request(record) if record.kind == kind => Some(record.clone()),
            _ => None,
        })
    }

    /// Whether `handle` was issued and is neither released nor consumed.
    pub fn is_live(&self, handle: usize) -> bool {
        self.state.lock().objects.get(&handle).is_some_and(MockObject::is_live)
    }

    /// Whether a native call took ownership of `handle`.
    pub fn is_consumed(&self, handle: usize) -> bool {
        self.state.lock().objects.get(&handle).is_some_and(|object| object.consumed)
    }

    pub fn release_count(&self, handle: usize) -> usize {
        self.state.lock().objects.get(&handle).map_or(0, |object| object.releases)
    }

    pub fn destroy_count(&self, handle: usize) -> usize {
        self.state.lock().objects.get(&handle).map_or(0, |object| object.destroys)
    }

    /// Number of live handles of `kind`.
    pub fn live_count(&self, kind: MockKind) -> usize {
        self.state
            .lock()
            .objects
            .values()
            .filter(|object| object.kind == kind && object.is_live())
            .count()
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.state.lock().violations.clone()
    }

    /// Current contents of a buffer (zero-initialised at creation).
    pub fn buffer_contents(&self, buffer: usize) -> Option<Vec<u8>> {
        self.state.lock().buffers.get(&buffer).map(|buffer| buffer.data.clone())
    }

    pub fn is_mapped(&self, buffer: usize) -> bool {
        self.state.lock().buffers.get(&buffer).is_some_and(|buffer| buffer.mapped)
    }

    pub fn error_scope_depth(&self, device: usize) -> usize {
        self.state.lock().error_scopes.get(&device).map_or(0, Vec::len)
    }

    pub fn has_uncaptured_error_callback(&self, device: usize) -> bool {
        self.state.lock().error_sinks.contains_key(&device)
    }

    pub fn has_device_lost_callback(&self, device: usize) -> bool {
        self.state.lock().lost_sinks.contains_key(&device)
    }

    pub fn has_log_callback(&self) -> bool {
        self.state.lock().log_sink.is_some()
    }

    pub fn log_level(&self) -> Option<sys::LogLevel> {
        self.state.lock().log_level
    }

    // ========================================================================
    // Handle ledger
    // ========================================================================

    fn record(&self, call: NativeCall) {
        self.calls.lock().push(call);
    }

    fn allocate<T: MockHandle>(&self) -> *mut T {
        let handle = self.next_handle.fetch_add(HANDLE_STRIDE, Ordering::Relaxed);
        self.state.lock().objects.insert(handle, MockObject::new(T::KIND));
        ptr::without_provenance_mut(handle)
    }

    fn create<T: MockHandle>(&self, label: Option<String>, chain: Vec<ChainEntry>) -> *mut T {
        if self.fail_next_creation.swap(false, Ordering::AcqRel) {
            self.record(NativeCall::CreateFailed { kind: T::KIND });
            return ptr::null_mut();
        }
        let raw = self.allocate::<T>();
        self.record(NativeCall::Create(CreatedObject {
            kind: T::KIND,
            handle: raw.addr(),
            label,
            chain,
        }));
        raw
    }

    fn release<T: MockHandle>(&self, raw: *mut T) {
        let handle = raw.addr();
        self.record(NativeCall::Release { kind: T::KIND, handle });

        let mut guard = self.state.lock();
        let state = &mut *guard;
        match state.objects.get_mut(&handle) {
            None => state.violations.push(Violation::UnknownHandle {
                function: "release",
                handle,
            }),
            Some(object) => {
                object.releases += 1;
                if object.consumed {
                    state.violations.push(Violation::ReleaseOfConsumed {
                        kind: object.kind,
                        handle,
                    });
                } else if object.releases > 1 {
                    state.violations.push(Violation::DoubleRelease {
                        kind: object.kind,
                        handle,
                    });
                }
            }
        }
    }

    fn destroy<T: MockHandle>(&self, raw: *mut T) {
        let handle = raw.addr();
        self.touch("destroy", handle);
        self.record(NativeCall::Destroy { kind: T::KIND, handle });
        if let Some(object) = self.state.lock().objects.get_mut(&handle) {
            object.destroys += 1;
        }
    }

    /// The native call took ownership of `handle`.
    fn consume(&self, function: &'static str, handle: usize) {
        self.command(function, handle);
        if let Some(object) = self.state.lock().objects.get_mut(&handle) {
            object.consumed = true;
        }
    }

    /// Check that `handle` may be passed to `function`. Null is allowed.
    fn touch(&self, function: &'static str, handle: usize) {
        if handle == 0 {
            return;
        }
        let mut guard = self.state.lock();
        let state = &mut *guard;
        match state.objects.get(&handle) {
            None => state.violations.push(Violation::UnknownHandle { function, handle }),
            Some(object) if !object.is_live() => state.violations.push(Violation::UseAfterRelease {
                function,
                kind: object.kind,
                handle,
            }),
            Some(_) => {}
        }
    }

    fn command(&self, name: &'static str, target: usize) {
        self.touch(name, target);
        self.record(NativeCall::Command { name, target });
    }

    fn dispatch(&self, callback: impl FnOnce() + Send + 'static) {
        let mode = *self.mode.lock();
        match mode {
            CallbackMode::Immediate => callback(),
            CallbackMode::Deferred => self.pending.lock().push(Box::new(callback)),
        }
    }

    /// Handle returned on every call until released.
    fn stable<T: MockHandle>(&self, slot: impl Fn(&mut State) -> &mut HashMap<usize, usize>, key: usize) -> *mut T {
        let existing = {
            let mut state = self.state.lock();
            let known = slot(&mut *state).get(&key).copied();
            state.live_stable(known.as_ref())
        };
        let handle = match existing {
            Some(handle) => handle,
            None => {
                let handle = self.allocate::<T>().addr();
                slot(&mut *self.state.lock()).insert(key, handle);
                handle
            }
        };
        self.record(NativeCall::Get { kind: T::KIND, handle });
        ptr::without_provenance_mut(handle)
    }

    fn take_request_failure(&self) -> Option<String> {
        self.state.lock().request_failure.take()
    }

    fn mapped_range(&self, buffer: usize, offset: usize, size: usize) -> *mut u8 {
        let mut state = self.state.lock();
        let Some(buffer) = state.buffers.get_mut(&buffer) else {
            return ptr::null_mut();
        };
        if !buffer.mapped || offset > buffer.data.len() {
            return ptr::null_mut();
        }
        let size = if size == sys::WHOLE_MAP_SIZE { buffer.data.len() - offset } else { size };
        if size > buffer.data.len() - offset {
            return ptr::null_mut();
        }
        // The vector is never resized, so the pointer stays valid after the
        // lock is dropped.
        buffer.data[offset..].as_mut_ptr()
    }
}

impl Default for MockNative {
    fn default() -> Self {
        Self::new()
    }
}

/// Deliver a status/handle/message triple through a request callback.
fn deliver<S, H>(
    callback: unsafe extern "C" fn(S, *mut H, *const c_char, *mut c_void),
    status: S,
    handle: *mut H,
    message: String,
    userdata: *mut c_void,
) -> impl FnOnce() + Send + 'static
where
    S: Send + 'static,
    H: 'static,
{
    let handle = SendPtr(handle);
    let userdata = SendPtr(userdata);
    move || {
        let message = CString::new(message).unwrap_or_default();
        unsafe { callback(status, handle.get(), message.as_ptr(), userdata.get()) };
    }
}

fn chain_of(head: *const sys::ChainedStruct) -> Vec<ChainEntry> {
    unsafe { decode_chain(head) }
}

// ============================================================================
// NativeApi
// ============================================================================

impl NativeApi for MockNative {
    unsafe fn create_instance(&self, descriptor: *const sys::InstanceDescriptor) -> sys::Instance {
        let chain = unsafe { descriptor.as_ref() }.map_or_else(Vec::new, |desc| chain_of(desc.next_in_chain));
        self.create(None, chain)
    }

    unsafe fn set_log_callback(&self, callback: sys::LogCallback, userdata: *mut c_void) {
        self.record(NativeCall::SetLogCallback {
            installed: callback.is_some(),
        });
        self.state.lock().log_sink = callback.map(|callback| (callback, SendPtr(userdata)));
    }

    unsafe fn set_log_level(&self, level: sys::LogLevel) {
        self.record(NativeCall::SetLogLevel(level));
        self.state.lock().log_level = Some(level);
    }

    unsafe fn instance_create_surface(
        &self,
        instance: sys::Instance,
        descriptor: *const sys::SurfaceDescriptor,
    ) -> sys::Surface {
        self.touch("instance_create_surface", instance.addr());
        let desc = unsafe { &*descriptor };
        self.create(unsafe { read_c_str(desc.label) }, chain_of(desc.next_in_chain))
    }

    unsafe fn instance_request_adapter(
        &self,
        instance: sys::Instance,
        options: *const sys::RequestAdapterOptions,
        callback: sys::RequestAdapterCallback,
        userdata: *mut c_void,
    ) {
        self.touch("instance_request_adapter", instance.addr());
        let options = unsafe { options.as_ref() };
        if let Some(surface) = options.map(|options| options.compatible_surface) {
            self.touch("instance_request_adapter", surface.addr());
        }
        let chain = options.map_or_else(Vec::new, |options| chain_of(options.next_in_chain));
        let backend = chain.iter().find_map(|entry| match entry {
            ChainEntry::AdapterExtras { backend } => Some(*backend),
            _ => None,
        });
        self.record(NativeCall::Request(RequestRecord {
            kind: MockKind::Adapter,
            label: None,
            chain,
            limits_chain: Vec::new(),
            features: Vec::new(),
        }));

        let (status, adapter, message) = match self.take_request_failure() {
            Some(message) => (sys::RequestAdapterStatus::ERROR, ptr::null_mut(), message),
            None => {
                let adapter: sys::Adapter = self.allocate();
                if let Some(backend) = backend {
                    self.state.lock().adapter_backends.insert(adapter.addr(), backend);
                }
                (sys::RequestAdapterStatus::SUCCESS, adapter, String::new())
            }
        };
        if let Some(callback) = callback {
            self.dispatch(deliver(callback, status, adapter, message, userdata));
        }
    }

    unsafe fn instance_process_events(&self, instance: sys::Instance) {
        self.command("instance_process_events", instance.addr());
        self.flush_pending();
    }

    unsafe fn instance_drop(&self, instance: sys::Instance) {
        self.release(instance);
    }

    unsafe fn adapter_get_properties(&self, adapter: sys::Adapter, properties: *mut sys::AdapterProperties) {
        self.command("adapter_get_properties", adapter.addr());
        let backend = self
            .state
            .lock()
            .adapter_backends
            .get(&adapter.addr())
            .copied()
            .unwrap_or(sys::BackendType::VULKAN);
        if let Some(properties) = unsafe { properties.as_mut() } {
            properties.vendor_id = 0x1af4;
            properties.device_id = 0x1050;
            properties.name = c"Mock Adapter".as_ptr();
            properties.driver_description = c"native-wgpu mock".as_ptr();
            properties.adapter_type = sys::AdapterType::CPU;
            properties.backend_type = backend;
        }
    }

    unsafe fn adapter_get_limits(&self, adapter: sys::Adapter, limits: *mut sys::SupportedLimits) -> bool {
        self.command("adapter_get_limits", adapter.addr());
        match unsafe { limits.as_mut() } {
            Some(limits) => {
                limits.limits = self.limits;
                true
            }
            None => false,
        }
    }

    unsafe fn adapter_has_feature(&self, adapter: sys::Adapter, feature: sys::FeatureName) -> bool {
        self.command("adapter_has_feature", adapter.addr());
        self.features.contains(&feature)
    }

    unsafe fn adapter_enumerate_features(&self, adapter: sys::Adapter, features: *mut sys::FeatureName) -> usize {
        self.command("adapter_enumerate_features", adapter.addr());
        if !features.is_null() {
            unsafe { ptr::copy_nonoverlapping(self.features.as_ptr(), features, self.features.len()) };
        }
        self.features.len()
    }

    unsafe fn adapter_request_device(
        &self,
        adapter: sys::Adapter,
        descriptor: *const sys::DeviceDescriptor,
        callback: sys::RequestDeviceCallback,
        userdata: *mut c_void,
    ) {
        self.touch("adapter_request_device", adapter.addr());
        let record = match unsafe { descriptor.as_ref() } {
            Some(desc) => RequestRecord {
                kind: MockKind::Device,
                label: unsafe { read_c_str(desc.label) },
                chain: chain_of(desc.next_in_chain),
                limits_chain: unsafe { desc.required_limits.as_ref() }
                    .map_or_else(Vec::new, |limits| chain_of(limits.next_in_chain)),
                features: unsafe { read_slice(desc.required_features, desc.required_features_count as usize) },
            },
            None => RequestRecord {
                kind: MockKind::Device,
                label: None,
                chain: Vec::new(),
                limits_chain: Vec::new(),
                features: Vec::new(),
            },
        };
        self.record(NativeCall::Request(record));

        let (status, device, message) = match self.take_request_failure() {
            Some(message) => (sys::RequestDeviceStatus::ERROR, ptr::null_mut(), message),
            None => (
                sys::RequestDeviceStatus::SUCCESS,
                self.allocate::<sys::DeviceImpl>(),
                String::new(),
            ),
        };
        if let Some(callback) = callback {
            self.dispatch(deliver(callback, status, device, message, userdata));
        }
    }

    unsafe fn adapter_drop(&self, adapter: sys::Adapter) {
        self.release(adapter);
    }

    unsafe fn surface_get_preferred_format(&self, surface: sys::Surface, adapter: sys::Adapter) -> sys::TextureFormat {
        self.touch("surface_get_preferred_format", adapter.addr());
        self.command("surface_get_preferred_format", surface.addr());
        sys::TextureFormat::BGRA8_UNORM_SRGB
    }

    unsafe fn surface_drop(&self, surface: sys::Surface) {
        self.release(surface);
    }

    unsafe fn swap_chain_get_current_texture_view(&self, swap_chain: sys::SwapChain) -> sys::TextureView {
        self.touch("swap_chain_get_current_texture_view", swap_chain.addr());
        self.stable(|state| &mut state.current_views, swap_chain.addr())
    }

    unsafe fn swap_chain_present(&self, swap_chain: sys::SwapChain) {
        self.touch("swap_chain_present", swap_chain.addr());
        self.record(NativeCall::Present {
            swap_chain: swap_chain.addr(),
        });
        self.state.lock().current_views.remove(&swap_chain.addr());
    }

    unsafe fn swap_chain_drop(&self, swap_chain: sys::SwapChain) {
        self.release(swap_chain);
    }

    unsafe fn device_create_buffer(&self, device: sys::Device, descriptor: *const sys::BufferDescriptor) -> sys::Buffer {
        self.touch("device_create_buffer", device.addr());
        let desc = unsafe { &*descriptor };
        let buffer: sys::Buffer = self.create(unsafe { read_c_str(desc.label) }, chain_of(desc.next_in_chain));
        if !buffer.is_null() {
            self.state.lock().buffers.insert(
                buffer.addr(),
                MockBuffer {
                    data: vec![0; desc.size as usize],
                    mapped: desc.mapped_at_creation,
                },
            );
        }
        buffer
    }

    unsafe fn device_create_texture(
        &self,
        device: sys::Device,
        descriptor: *const sys::TextureDescriptor,
    ) -> sys::Texture {
        self.touch("device_create_texture", device.addr());
        let desc = unsafe { &*descriptor };
        self.create(unsafe { read_c_str(desc.label) }, chain_of(desc.next_in_chain))
    }

    unsafe fn device_create_sampler(
        &self,
        device: sys::Device,
        descriptor: *const sys::SamplerDescriptor,
    ) -> sys::Sampler {
        self.touch("device_create_sampler", device.addr());
        let desc = unsafe { &*descriptor };
        self.create(unsafe { read_c_str(desc.label) }, chain_of(desc.next_in_chain))
    }

    unsafe fn device_create_bind_group_layout(
        &self,
        device: sys::Device,
        descriptor: *const sys::BindGroupLayoutDescriptor,
    ) -> sys::BindGroupLayout {
        self.touch("device_create_bind_group_layout", device.addr());
        let desc = unsafe { &*descriptor };
        self.create(unsafe { read_c_str(desc.label) }, chain_of(desc.next_in_chain))
    }

    unsafe fn device_create_bind_group(
        &self,
        device: sys::Device,
        descriptor: *const sys::BindGroupDescriptor,
    ) -> sys::BindGroup {
        self.touch("device_create_bind_group", device.addr());
        let desc = unsafe { &*descriptor };
        self.touch("device_create_bind_group", desc.layout.addr());
        for entry in unsafe { read_slice(desc.entries, desc.entry_count as usize) } {
            self.touch("device_create_bind_group", entry.buffer.addr());
            self.touch("device_create_bind_group", entry.sampler.addr());
            self.touch("device_create_bind_group", entry.texture_view.addr());
        }
        self.create(unsafe { read_c_str(desc.label) }, chain_of(desc.next_in_chain))
    }

    unsafe fn device_create_pipeline_layout(
        &self,
        device: sys::Device,
        descriptor: *const sys::PipelineLayoutDescriptor,
    ) -> sys::PipelineLayout {
        self.touch("device_create_pipeline_layout", device.addr());
        let desc = unsafe { &*descriptor };
        for layout in unsafe { read_slice(desc.bind_group_layouts, desc.bind_group_layout_count as usize) } {
            self.touch("device_create_pipeline_layout", layout.addr());
        }
        self.create(unsafe { read_c_str(desc.label) }, chain_of(desc.next_in_chain))
    }

    unsafe fn device_create_shader_module(
        &self,
        device: sys::Device,
        descriptor: *const sys::ShaderModuleDescriptor,
    ) -> sys::ShaderModule {
        self.touch("device_create_shader_module", device.addr());
        let desc = unsafe { &*descriptor };
        self.create(unsafe { read_c_str(desc.label) }, chain_of(desc.next_in_chain))
    }

    unsafe fn device_create_compute_pipeline(
        &self,
        device: sys::Device,
        descriptor: *const sys::ComputePipelineDescriptor,
    ) -> sys::ComputePipeline {
        self.touch("device_create_compute_pipeline", device.addr());
        let desc = unsafe { &*descriptor };
        self.touch("device_create_compute_pipeline", desc.layout.addr());
        self.touch("device_create_compute_pipeline", desc.compute.module.addr());
        self.create(unsafe { read_c_str(desc.label) }, chain_of(desc.next_in_chain))
    }

    unsafe fn device_create_render_pipeline(
        &self,
        device: sys::Device,
        descriptor: *const sys::RenderPipelineDescriptor,
    ) -> sys::RenderPipeline {
        self.touch("device_create_render_pipeline", device.addr());
        let desc = unsafe { &*descriptor };
        self.touch("device_create_render_pipeline", desc.layout.addr());
        self.touch("device_create_render_pipeline", desc.vertex.module.addr());
        if let Some(fragment) = unsafe { desc.fragment.as_ref() } {
            self.touch("device_create_render_pipeline", fragment.module.addr());
        }
        let mut chain = chain_of(desc.next_in_chain);
        chain.extend(chain_of(desc.primitive.next_in_chain));
        self.create(unsafe { read_c_str(desc.label) }, chain)
    }

    unsafe fn device_create_compute_pipeline_async(
        &self,
        device: sys::Device,
        descriptor: *const sys::ComputePipelineDescriptor,
        callback: sys::CreateComputePipelineAsyncCallback,
        userdata: *mut c_void,
    ) {
        self.touch("device_create_compute_pipeline_async", device.addr());
        let desc = unsafe { &*descriptor };
        self.touch("device_create_compute_pipeline_async", desc.layout.addr());
        self.touch("device_create_compute_pipeline_async", desc.compute.module.addr());
        let (status, pipeline, message) = match self.take_request_failure() {
            Some(message) => (sys::CreatePipelineAsyncStatus::VALIDATION_ERROR, ptr::null_mut(), message),
            None => (
                sys::CreatePipelineAsyncStatus::SUCCESS,
                self.create(unsafe { read_c_str(desc.label) }, chain_of(desc.next_in_chain)),
                String::new(),
            ),
        };
        if let Some(callback) = callback {
            self.dispatch(deliver(callback, status, pipeline, message, userdata));
        }
    }

    unsafe fn device_create_render_pipeline_async(
        &self,
        device: sys::Device,
        descriptor: *const sys::RenderPipelineDescriptor,
        callback: sys::CreateRenderPipelineAsyncCallback,
        userdata: *mut c_void,
    ) {
        self.touch("device_create_render_pipeline_async", device.addr());
        let desc = unsafe { &*descriptor };
        self.touch("device_create_render_pipeline_async", desc.layout.addr());
        self.touch("device_create_render_pipeline_async", desc.vertex.module.addr());
        if let Some(fragment) = unsafe { desc.fragment.as_ref() } {
            self.touch("device_create_render_pipeline_async", fragment.module.addr());
        }
        let mut chain = chain_of(desc.next_in_chain);
        chain.extend(chain_of(desc.primitive.next_in_chain));
        let (status, pipeline, message) = match self.take_request_failure() {
            Some(message) => (sys::CreatePipelineAsyncStatus::VALIDATION_ERROR, ptr::null_mut(), message),
            None => (
                sys::CreatePipelineAsyncStatus::SUCCESS,
                self.create(unsafe { read_c_str(desc.label) }, chain),
                String::new(),
            ),
        };
        if let Some(callback) = callback {
            self.dispatch(deliver(callback, status, pipeline, message, userdata));
        }
    }

    unsafe fn device_create_command_encoder(
        &self,
        device: sys::Device,
        descriptor: *const sys::CommandEncoderDescriptor,
    ) -> sys::CommandEncoder {
        self.touch("device_create_command_encoder", device.addr());
        let desc = unsafe { &*descriptor };
        self.create(unsafe { read_c_str(desc.label) }, chain_of(desc.next_in_chain))
    }

    unsafe fn device_create_query_set(
        &self,
        device: sys::Device,
        descriptor: *const sys::QuerySetDescriptor,
    ) -> sys::QuerySet {
        self.touch("device_create_query_set", device.addr());
        let desc = unsafe { &*descriptor };
        self.create(unsafe { read_c_str(desc.label) }, chain_of(desc.next_in_chain))
    }

    unsafe fn device_create_swap_chain(
        &self,
        device: sys::Device,
        surface: sys::Surface,
        descriptor: *const sys::SwapChainDescriptor,
    ) -> sys::SwapChain {
        self.touch("device_create_swap_chain", device.addr());
        self.touch("device_create_swap_chain", surface.addr());
        let desc = unsafe { &*descriptor };
        self.create(unsafe { read_c_str(desc.label) }, chain_of(desc.next_in_chain))
    }

    unsafe fn device_get_queue(&self, device: sys::Device) -> sys::Queue {
        self.touch("device_get_queue", device.addr());
        self.stable(|state| &mut state.queues, device.addr())
    }

    unsafe fn device_get_limits(&self, device: sys::Device, limits: *mut sys::SupportedLimits) -> bool {
        self.command("device_get_limits", device.addr());
        match unsafe { limits.as_mut() } {
            Some(limits) => {
                limits.limits = self.limits;
                true
            }
            None => false,
        }
    }

    unsafe fn device_has_feature(&self, device: sys::Device, feature: sys::FeatureName) -> bool {
        self.command("device_has_feature", device.addr());
        self.features.contains(&feature)
    }

    unsafe fn device_push_error_scope(&self, device: sys::Device, filter: sys::ErrorFilter) {
        self.touch("device_push_error_scope", device.addr());
        self.record(NativeCall::PushErrorScope {
            device: device.addr(),
            filter,
        });
        self.state.lock().error_scopes.entry(device.addr()).or_default().push(filter);
    }

    unsafe fn device_pop_error_scope(
        &self,
        device: sys::Device,
        callback: sys::ErrorCallback,
        userdata: *mut c_void,
    ) -> bool {
        self.touch("device_pop_error_scope", device.addr());
        self.record(NativeCall::PopErrorScope { device: device.addr() });

        let (popped, error_type, message) = {
            let mut state = self.state.lock();
            let popped = state
                .error_scopes
                .get_mut(&device.addr())
                .and_then(Vec::pop)
                .is_some();
            if popped {
                let (error_type, message) = state
                    .next_scope_error
                    .take()
                    .unwrap_or((sys::ErrorType::NO_ERROR, String::new()));
                (true, error_type, message)
            } else {
                (false, sys::ErrorType::UNKNOWN, "no error scope to pop".to_string())
            }
        };

        if let Some(callback) = callback {
            let userdata = SendPtr(userdata);
            self.dispatch(move || {
                let message = CString::new(message).unwrap_or_default();
                unsafe { callback(error_type, message.as_ptr(), userdata.get()) };
            });
        }
        popped
    }

    unsafe fn device_set_uncaptured_error_callback(
        &self,
        device: sys::Device,
        callback: sys::ErrorCallback,
        userdata: *mut c_void,
    ) {
        self.command("device_set_uncaptured_error_callback", device.addr());
        let mut state = self.state.lock();
        match callback {
            Some(callback) => state.error_sinks.insert(device.addr(), (callback, SendPtr(userdata))),
            None => state.error_sinks.remove(&device.addr()),
        };
    }

    unsafe fn device_set_device_lost_callback(
        &self,
        device: sys::Device,
        callback: sys::DeviceLostCallback,
        userdata: *mut c_void,
    ) {
        self.command("device_set_device_lost_callback", device.addr());
        let mut state = self.state.lock();
        match callback {
            Some(callback) => state.lost_sinks.insert(device.addr(), (callback, SendPtr(userdata))),
            None => state.lost_sinks.remove(&device.addr()),
        };
    }

    unsafe fn device_poll(&self, device: sys::Device, _wait: bool) -> bool {
        self.command("device_poll", device.addr());
        self.flush_pending();
        true
    }

    unsafe fn device_destroy(&self, device: sys::Device) {
        self.destroy(device);
        self.lose_device(device.addr(), sys::DeviceLostReason::DESTROYED, "device destroyed");
    }

    unsafe fn device_drop(&self, device: sys::Device) {
        self.release(device);
        let mut state = self.state.lock();
        state.error_sinks.remove(&device.addr());
        state.lost_sinks.remove(&device.addr());
    }

    unsafe fn queue_submit(&self, queue: sys::Queue, command_count: u32, commands: *const sys::CommandBuffer) {
        self.touch("queue_submit", queue.addr());
        let command_buffers: Vec<usize> = unsafe { read_slice(commands, command_count as usize) }
            .into_iter()
            .map(|buffer| buffer.addr())
            .collect();
        for &buffer in &command_buffers {
            self.touch("queue_submit", buffer);
            if let Some(object) = self.state.lock().objects.get_mut(&buffer) {
                object.consumed = true;
            }
        }
        self.record(NativeCall::Submit { command_buffers });
    }

    unsafe fn queue_write_buffer(
        &self,
        queue: sys::Queue,
        buffer: sys::Buffer,
        buffer_offset: u64,
        data: *const c_void,
        size: usize,
    ) {
        self.touch("queue_write_buffer", queue.addr());
        self.touch("queue_write_buffer", buffer.addr());
        let bytes = unsafe { read_slice(data.cast::<u8>(), size) };
        if let Some(target) = self.state.lock().buffers.get_mut(&buffer.addr()) {
            let start = buffer_offset as usize;
            if let Some(window) = target.data.get_mut(start..start + bytes.len()) {
                window.copy_from_slice(&bytes);
            }
        }
        self.record(NativeCall::WriteBuffer {
            buffer: buffer.addr(),
            offset: buffer_offset,
            data: bytes,
        });
    }

    unsafe fn queue_write_texture(
        &self,
        queue: sys::Queue,
        destination: *const sys::ImageCopyTexture,
        _data: *const c_void,
        _data_size: usize,
        _data_layout: *const sys::TextureDataLayout,
        _write_size: *const sys::Extent3d,
    ) {
        if let Some(destination) = unsafe { destination.as_ref() } {
            self.touch("queue_write_texture", destination.texture.addr());
        }
        self.command("queue_write_texture", queue.addr());
    }

    unsafe fn queue_on_submitted_work_done(
        &self,
        queue: sys::Queue,
        callback: sys::QueueWorkDoneCallback,
        userdata: *mut c_void,
    ) {
        self.command("queue_on_submitted_work_done", queue.addr());
        if let Some(callback) = callback {
            let userdata = SendPtr(userdata);
            self.dispatch(move || unsafe { callback(sys::QueueWorkDoneStatus::SUCCESS, userdata.get()) });
        }
    }

    unsafe fn queue_drop(&self, queue: sys::Queue) {
        self.release(queue);
    }

    unsafe fn buffer_map_async(
        &self,
        buffer: sys::Buffer,
        mode: sys::Flags,
        offset: usize,
        size: usize,
        callback: sys::BufferMapCallback,
        userdata: *mut c_void,
    ) {
        self.touch("buffer_map_async", buffer.addr());
        self.record(NativeCall::MapAsync {
            buffer: buffer.addr(),
            mode,
            offset,
            size,
        });

        let status = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            match (state.objects.get(&buffer.addr()), state.buffers.get_mut(&buffer.addr())) {
                (Some(object), _) if object.destroys > 0 => sys::BufferMapAsyncStatus::DESTROYED_BEFORE_CALLBACK,
                (Some(object), Some(contents)) if object.is_live() => {
                    contents.mapped = true;
                    sys::BufferMapAsyncStatus::SUCCESS
                }
                _ => sys::BufferMapAsyncStatus::ERROR,
            }
        };
        if let Some(callback) = callback {
            let userdata = SendPtr(userdata);
            self.dispatch(move || unsafe { callback(status, userdata.get()) });
        }
    }

    unsafe fn buffer_get_mapped_range(&self, buffer: sys::Buffer, offset: usize, size: usize) -> *mut c_void {
        self.command("buffer_get_mapped_range", buffer.addr());
        self.mapped_range(buffer.addr(), offset, size).cast()
    }

    unsafe fn buffer_get_const_mapped_range(&self, buffer: sys::Buffer, offset: usize, size: usize) -> *const c_void {
        self.command("buffer_get_const_mapped_range", buffer.addr());
        self.mapped_range(buffer.addr(), offset, size).cast_const().cast()
    }

    unsafe fn buffer_unmap(&self, buffer: sys::Buffer) {
        self.touch("buffer_unmap", buffer.addr());
        self.record(NativeCall::Unmap { buffer: buffer.addr() });
        if let Some(contents) = self.state.lock().buffers.get_mut(&buffer.addr()) {
            contents.mapped = false;
        }
    }

    unsafe fn buffer_destroy(&self, buffer: sys::Buffer) {
        self.destroy(buffer);
        if let Some(contents) = self.state.lock().buffers.get_mut(&buffer.addr()) {
            contents.mapped = false;
        }
    }

    unsafe fn buffer_drop(&self, buffer: sys::Buffer) {
        self.release(buffer);
    }

    unsafe fn texture_create_view(
        &self,
        texture: sys::Texture,
        descriptor: *const sys::TextureViewDescriptor,
    ) -> sys::TextureView {
        self.touch("texture_create_view", texture.addr());
        match unsafe { descriptor.as_ref() } {
            Some(desc) => self.create(unsafe { read_c_str(desc.label) }, chain_of(desc.next_in_chain)),
            None => self.create(None, Vec::new()),
        }
    }

    unsafe fn texture_destroy(&self, texture: sys::Texture) {
        self.destroy(texture);
    }

    unsafe fn texture_drop(&self, texture: sys::Texture) {
        self.release(texture);
    }

    unsafe fn texture_view_drop(&self, texture_view: sys::TextureView) {
        self.release(texture_view);
    }

    unsafe fn sampler_drop(&self, sampler: sys::Sampler) {
        self.release(sampler);
    }

    unsafe fn bind_group_layout_drop(&self, bind_group_layout: sys::BindGroupLayout) {
        self.release(bind_group_layout);
    }

    unsafe fn bind_group_drop(&self, bind_group: sys::BindGroup) {
        self.release(bind_group);
    }

    unsafe fn pipeline_layout_drop(&self, pipeline_layout: sys::PipelineLayout) {
        self.release(pipeline_layout);
    }

    unsafe fn shader_module_get_compilation_info(
        &self,
        shader_module: sys::ShaderModule,
        callback: sys::CompilationInfoCallback,
        userdata: *mut c_void,
    ) {
        self.command("shader_module_get_compilation_info", shader_module.addr());
        let Some(callback) = callback else {
            return;
        };
        let failure = self.take_request_failure();
        let messages = self.state.lock().compilation_messages.clone();
        let userdata = SendPtr(userdata);
        self.dispatch(move || {
            if failure.is_some() {
                unsafe { callback(sys::CompilationInfoRequestStatus::ERROR, ptr::null(), userdata.get()) };
                return;
            }
            let texts: Vec<CString> = messages
                .iter()
                .map(|(_, text, _, _)| CString::new(text.as_str()).unwrap_or_default())
                .collect();
            let native: Vec<sys::CompilationMessage> = messages
                .iter()
                .zip(&texts)
                .map(|(&(type_, _, line_num, line_pos), text)| sys::CompilationMessage {
                    next_in_chain: ptr::null(),
                    message: text.as_ptr(),
                    type_,
                    line_num,
                    line_pos,
                    offset: 0,
                    length: text.as_bytes().len() as u64,
                })
                .collect();
            let info = sys::CompilationInfo {
                next_in_chain: ptr::null(),
                message_count: native.len(),
                messages: native.as_ptr(),
            };
            unsafe { callback(sys::CompilationInfoRequestStatus::SUCCESS, &info, userdata.get()) };
        });
    }

    unsafe fn shader_module_drop(&self, shader_module: sys::ShaderModule) {
        self.release(shader_module);
    }

    unsafe fn compute_pipeline_get_bind_group_layout(
        &self,
        pipeline: sys::ComputePipeline,
        group_index: u32,
    ) -> sys::BindGroupLayout {
        self.touch("compute_pipeline_get_bind_group_layout", pipeline.addr());
        self.stable_layout(pipeline.addr(), group_index)
    }

    unsafe fn compute_pipeline_drop(&self, pipeline: sys::ComputePipeline) {
        self.release(pipeline);
    }

    unsafe fn render_pipeline_get_bind_group_layout(
        &self,
        pipeline: sys::RenderPipeline,
        group_index: u32,
    ) -> sys::BindGroupLayout {
        self.touch("render_pipeline_get_bind_group_layout", pipeline.addr());
        self.stable_layout(pipeline.addr(), group_index)
    }

    unsafe fn render_pipeline_drop(&self, pipeline: sys::RenderPipeline) {
        self.release(pipeline);
    }

    unsafe fn query_set_destroy(&self, query_set: sys::QuerySet) {
        self.destroy(query_set);
    }

    unsafe fn query_set_drop(&self, query_set: sys::QuerySet) {
        self.release(query_set);
    }

    unsafe fn command_encoder_begin_compute_pass(
        &self,
        encoder: sys::CommandEncoder,
        descriptor: *const sys::ComputePassDescriptor,
    ) -> sys::ComputePassEncoder {
        self.touch("command_encoder_begin_compute_pass", encoder.addr());
        let label = unsafe { descriptor.as_ref() }.and_then(|desc| unsafe { read_c_str(desc.label) });
        self.create(label, Vec::new())
    }

    unsafe fn command_encoder_begin_render_pass(
        &self,
        encoder: sys::CommandEncoder,
        descriptor: *const sys::RenderPassDescriptor,
    ) -> sys::RenderPassEncoder {
        self.touch("command_encoder_begin_render_pass", encoder.addr());
        let desc = unsafe { &*descriptor };
        for attachment in unsafe { read_slice(desc.color_attachments, desc.color_attachment_count as usize) } {
            self.touch("command_encoder_begin_render_pass", attachment.view.addr());
            self.touch("command_encoder_begin_render_pass", attachment.resolve_target.addr());
        }
        if let Some(depth) = unsafe { desc.depth_stencil_attachment.as_ref() } {
            self.touch("command_encoder_begin_render_pass", depth.view.addr());
        }
        self.create(unsafe { read_c_str(desc.label) }, chain_of(desc.next_in_chain))
    }

    unsafe fn command_encoder_copy_buffer_to_buffer(
        &self,
        encoder: sys::CommandEncoder,
        source: sys::Buffer,
        _source_offset: u64,
        destination: sys::Buffer,
        _destination_offset: u64,
        _size: u64,
    ) {
        self.touch("command_encoder_copy_buffer_to_buffer", source.addr());
        self.touch("command_encoder_copy_buffer_to_buffer", destination.addr());
        self.command("command_encoder_copy_buffer_to_buffer", encoder.addr());
    }

    unsafe fn command_encoder_clear_buffer(&self, encoder: sys::CommandEncoder, buffer: sys::Buffer, _offset: u64, _size: u64) {
        self.touch("command_encoder_clear_buffer", buffer.addr());
        self.command("command_encoder_clear_buffer", encoder.addr());
    }

    unsafe fn command_encoder_copy_buffer_to_texture(
        &self,
        encoder: sys::CommandEncoder,
        source: *const sys::ImageCopyBuffer,
        destination: *const sys::ImageCopyTexture,
        _copy_size: *const sys::Extent3d,
    ) {
        self.touch("command_encoder_copy_buffer_to_texture", unsafe { (*source).buffer.addr() });
        self.touch("command_encoder_copy_buffer_to_texture", unsafe { (*destination).texture.addr() });
        self.command("command_encoder_copy_buffer_to_texture", encoder.addr());
    }

    unsafe fn command_encoder_copy_texture_to_buffer(
        &self,
        encoder: sys::CommandEncoder,
        source: *const sys::ImageCopyTexture,
        destination: *const sys::ImageCopyBuffer,
        _copy_size: *const sys::Extent3d,
    ) {
        self.touch("command_encoder_copy_texture_to_buffer", unsafe { (*source).texture.addr() });
        self.touch("command_encoder_copy_texture_to_buffer", unsafe { (*destination).buffer.addr() });
        self.command("command_encoder_copy_texture_to_buffer", encoder.addr());
    }

    unsafe fn command_encoder_copy_texture_to_texture(
        &self,
        encoder: sys::CommandEncoder,
        source: *const sys::ImageCopyTexture,
        destination: *const sys::ImageCopyTexture,
        _copy_size: *const sys::Extent3d,
    ) {
        self.touch("command_encoder_copy_texture_to_texture", unsafe { (*source).texture.addr() });
        self.touch("command_encoder_copy_texture_to_texture", unsafe { (*destination).texture.addr() });
        self.command("command_encoder_copy_texture_to_texture", encoder.addr());
    }

    unsafe fn command_encoder_write_timestamp(
        &self,
        encoder: sys::CommandEncoder,
        query_set: sys::QuerySet,
        _query_index: u32,
    ) {
        self.touch("command_encoder_write_timestamp", query_set.addr());
        self.command("command_encoder_write_timestamp", encoder.addr());
    }

    unsafe fn command_encoder_resolve_query_set(
        &self,
        encoder: sys::CommandEncoder,
        query_set: sys::QuerySet,
        _first_query: u32,
        _query_count: u32,
        destination: sys::Buffer,
        _destination_offset: u64,
    ) {
        self.touch("command_encoder_resolve_query_set", query_set.addr());
        self.touch("command_encoder_resolve_query_set", destination.addr());
        self.command("command_encoder_resolve_query_set", encoder.addr());
    }

    unsafe fn command_encoder_insert_debug_marker(&self, encoder: sys::CommandEncoder, _marker_label: *const c_char) {
        self.command("command_encoder_insert_debug_marker", encoder.addr());
    }

    unsafe fn command_encoder_push_debug_group(&self, encoder: sys::CommandEncoder, _group_label: *const c_char) {
        self.command("command_encoder_push_debug_group", encoder.addr());
    }

    unsafe fn command_encoder_pop_debug_group(&self, encoder: sys::CommandEncoder) {
        self.command("command_encoder_pop_debug_group", encoder.addr());
    }

    unsafe fn command_encoder_finish(
        &self,
        encoder: sys::CommandEncoder,
        descriptor: *const sys::CommandBufferDescriptor,
    ) -> sys::CommandBuffer {
        self.consume("command_encoder_finish", encoder.addr());
        let label = unsafe { descriptor.as_ref() }.and_then(|desc| unsafe { read_c_str(desc.label) });
        self.create(label, Vec::new())
    }

    unsafe fn command_encoder_drop(&self, encoder: sys::CommandEncoder) {
        self.release(encoder);
    }

    unsafe fn command_buffer_drop(&self, command_buffer: sys::CommandBuffer) {
        self.release(command_buffer);
    }

    unsafe fn compute_pass_encoder_set_pipeline(&self, pass: sys::ComputePassEncoder, pipeline: sys::ComputePipeline) {
        self.touch("compute_pass_encoder_set_pipeline", pipeline.addr());
        self.command("compute_pass_encoder_set_pipeline", pass.addr());
    }

    unsafe fn compute_pass_encoder_set_bind_group(
        &self,
        pass: sys::ComputePassEncoder,
        _group_index: u32,
        group: sys::BindGroup,
        _dynamic_offset_count: u32,
        _dynamic_offsets: *const u32,
    ) {
        self.touch("compute_pass_encoder_set_bind_group", group.addr());
        self.command("compute_pass_encoder_set_bind_group", pass.addr());
    }

    unsafe fn compute_pass_encoder_dispatch(
        &self,
        pass: sys::ComputePassEncoder,
        _workgroup_count_x: u32,
        _workgroup_count_y: u32,
        _workgroup_count_z: u32,
    ) {
        self.command("compute_pass_encoder_dispatch", pass.addr());
    }

    unsafe fn compute_pass_encoder_dispatch_indirect(
        &self,
        pass: sys::ComputePassEncoder,
        indirect_buffer: sys::Buffer,
        _indirect_offset: u64,
    ) {
        self.touch("compute_pass_encoder_dispatch_indirect", indirect_buffer.addr());
        self.command("compute_pass_encoder_dispatch_indirect", pass.addr());
    }

    unsafe fn compute_pass_encoder_begin_pipeline_statistics_query(
        &self,
        pass: sys::ComputePassEncoder,
        query_set: sys::QuerySet,
        _query_index: u32,
    ) {
        self.touch("compute_pass_encoder_begin_pipeline_statistics_query", query_set.addr());
        self.command("compute_pass_encoder_begin_pipeline_statistics_query", pass.addr());
    }

    unsafe fn compute_pass_encoder_end_pipeline_statistics_query(&self, pass: sys::ComputePassEncoder) {
        self.command("compute_pass_encoder_end_pipeline_statistics_query", pass.addr());
    }

    unsafe fn compute_pass_encoder_end(&self, pass: sys::ComputePassEncoder) {
        self.consume("compute_pass_encoder_end", pass.addr());
    }

    unsafe fn compute_pass_encoder_drop(&self, pass: sys::ComputePassEncoder) {
        self.release(pass);
    }

    unsafe fn render_pass_encoder_set_pipeline(&self, pass: sys::RenderPassEncoder, pipeline: sys::RenderPipeline) {
        self.touch("render_pass_encoder_set_pipeline", pipeline.addr());
        self.command("render_pass_encoder_set_pipeline", pass.addr());
    }

    unsafe fn render_pass_encoder_set_bind_group(
        &self,
        pass: sys::RenderPassEncoder,
        _group_index: u32,
        group: sys::BindGroup,
        _dynamic_offset_count: u32,
        _dynamic_offsets: *const u32,
    ) {
        self.touch("render_pass_encoder_set_bind_group", group.addr());
        self.command("render_pass_encoder_set_bind_group", pass.addr());
    }

    unsafe fn render_pass_encoder_set_vertex_buffer(
        &self,
        pass: sys::RenderPassEncoder,
        _slot: u32,
        buffer: sys::Buffer,
        _offset: u64,
        _size: u64,
    ) {
        self.touch("render_pass_encoder_set_vertex_buffer", buffer.addr());
        self.command("render_pass_encoder_set_vertex_buffer", pass.addr());
    }

    unsafe fn render_pass_encoder_set_index_buffer(
        &self,
        pass: sys::RenderPassEncoder,
        buffer: sys::Buffer,
        _format: sys::IndexFormat,
        _offset: u64,
        _size: u64,
    ) {
        self.touch("render_pass_encoder_set_index_buffer", buffer.addr());
        self.command("render_pass_encoder_set_index_buffer", pass.addr());
    }

    unsafe fn render_pass_encoder_draw(
        &self,
        pass: sys::RenderPassEncoder,
        _vertex_count: u32,
        _instance_count: u32,
        _first_vertex: u32,
        _first_instance: u32,
    ) {
        self.command("render_pass_encoder_draw", pass.addr());
    }

    unsafe fn render_pass_encoder_draw_indexed(
        &self,
        pass: sys::RenderPassEncoder,
        _index_count: u32,
        _instance_count: u32,
        _first_index: u32,
        _base_vertex: i32,
        _first_instance: u32,
    ) {
        self.command("render_pass_encoder_draw_indexed", pass.addr());
    }

    unsafe fn render_pass_encoder_draw_indirect(
        &self,
        pass: sys::RenderPassEncoder,
        indirect_buffer: sys::Buffer,
        _indirect_offset: u64,
    ) {
        self.touch("render_pass_encoder_draw_indirect", indirect_buffer.addr());
        self.command("render_pass_encoder_draw_indirect", pass.addr());
    }

    unsafe fn render_pass_encoder_draw_indexed_indirect(
        &self,
        pass: sys::RenderPassEncoder,
        indirect_buffer: sys::Buffer,
        _indirect_offset: u64,
    ) {
        self.touch("render_pass_encoder_draw_indexed_indirect", indirect_buffer.addr());
        self.command("render_pass_encoder_draw_indexed_indirect", pass.addr());
    }

    unsafe fn render_pass_encoder_set_viewport(
        &self,
        pass: sys::RenderPassEncoder,
        _x: f32,
        _y: f32,
        _width: f32,
        _height: f32,
        _min_depth: f32,
        _max_depth: f32,
    ) {
        self.command("render_pass_encoder_set_viewport", pass.addr());
    }

    unsafe fn render_pass_encoder_set_scissor_rect(
        &self,
        pass: sys::RenderPassEncoder,
        _x: u32,
        _y: u32,
        _width: u32,
        _height: u32,
    ) {
        self.command("render_pass_encoder_set_scissor_rect", pass.addr());
    }

    unsafe fn render_pass_encoder_set_blend_constant(&self, pass: sys::RenderPassEncoder, _color: *const sys::Color) {
        self.command("render_pass_encoder_set_blend_constant", pass.addr());
    }

    unsafe fn render_pass_encoder_set_stencil_reference(&self, pass: sys::RenderPassEncoder, _reference: u32) {
        self.command("render_pass_encoder_set_stencil_reference", pass.addr());
    }

    unsafe fn render_pass_encoder_set_push_constants(
        &self,
        pass: sys::RenderPassEncoder,
        _stages: sys::Flags,
        _offset: u32,
        _size_bytes: u32,
        _data: *const c_void,
    ) {
        self.command("render_pass_encoder_set_push_constants", pass.addr());
    }

    unsafe fn render_pass_encoder_begin_occlusion_query(&self, pass: sys::RenderPassEncoder, _query_index: u32) {
        self.command("render_pass_encoder_begin_occlusion_query", pass.addr());
    }

    unsafe fn render_pass_encoder_end_occlusion_query(&self, pass: sys::RenderPassEncoder) {
        self.command("render_pass_encoder_end_occlusion_query", pass.addr());
    }

    unsafe fn render_pass_encoder_begin_pipeline_statistics_query(
        &self,
        pass: sys::RenderPassEncoder,
        query_set: sys::QuerySet,
        _query_index: u32,
    ) {
        self.touch("render_pass_encoder_begin_pipeline_statistics_query", query_set.addr());
        self.command("render_pass_encoder_begin_pipeline_statistics_query", pass.addr());
    }

    unsafe fn render_pass_encoder_end_pipeline_statistics_query(&self, pass: sys::RenderPassEncoder) {
        self.command("render_pass_encoder_end_pipeline_statistics_query", pass.addr());
    }

    unsafe fn render_pass_encoder_end(&self, pass: sys::RenderPassEncoder) {
        self.consume("render_pass_encoder_end", pass.addr());
    }

    unsafe fn render_pass_encoder_drop(&self, pass: sys::RenderPassEncoder) {
        self.release(pass);
    }
}

impl MockNative {
    fn stable_layout(&self, pipeline: usize, group_index: u32) -> sys::BindGroupLayout {
        let existing = {
            let state = self.state.lock();
            let known = state.pipeline_layouts.get(&(pipeline, group_index)).copied();
            state.live_stable(known.as_ref())
        };
        let handle = match existing {
            Some(handle) => handle,
            None => {
                let handle = self.allocate::<sys::BindGroupLayoutImpl>().addr();
                self.state.lock().pipeline_layouts.insert((pipeline, group_index), handle);
                handle
            }
        };
        self.record(NativeCall::Get {
            kind: MockKind::BindGroupLayout,
            handle,
        });
        ptr::without_provenance_mut(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(mock: &MockNative) -> sys::Device {
        mock.fake_handle()
    }

    fn buffer_descriptor(size: u64, mapped_at_creation: bool) -> sys::BufferDescriptor {
        sys::BufferDescriptor {
            next_in_chain: ptr::null(),
            label: c"staging".as_ptr(),
            usage: 0,
            size,
            mapped_at_creation,
        }
    }

    #[test]
    fn test_mock_buffer_creation() {
        let mock = MockNative::new();
        let device = device(&mock);

        let buffer = unsafe { mock.device_create_buffer(device, &buffer_descriptor(64, false)) };

        assert!(!buffer.is_null());
        assert_eq!(mock.count_creates(MockKind::Buffer), 1);
        let created = mock.last_created(MockKind::Buffer).unwrap();
        assert_eq!(created.label.as_deref(), Some("staging"));
        assert_eq!(mock.buffer_contents(buffer.addr()).unwrap().len(), 64);
    }

    #[test]
    fn test_fail_next_creation() {
        let mock = MockNative::new();
        let device = device(&mock);
        mock.fail_next_creation();

        let failed = unsafe { mock.device_create_buffer(device, &buffer_descriptor(4, false)) };
        let created = unsafe { mock.device_create_buffer(device, &buffer_descriptor(4, false)) };

        assert!(failed.is_null());
        assert!(!created.is_null());
        assert_eq!(mock.count_calls(|call| matches!(call, NativeCall::CreateFailed { .. })), 1);
    }

    #[test]
    fn test_double_release_is_reported() {
        let mock = MockNative::new();
        let sampler: sys::Sampler = mock.fake_handle();

        unsafe {
            mock.sampler_drop(sampler);
            mock.sampler_drop(sampler);
        }

        assert_eq!(mock.release_count(sampler.addr()), 2);
        assert_eq!(
            mock.violations(),
            vec![Violation::DoubleRelease {
                kind: MockKind::Sampler,
                handle: sampler.addr()
            }]
        );
    }

    #[test]
    fn test_use_after_release_is_reported() {
        let mock = MockNative::new();
        let device = device(&mock);
        unsafe {
            mock.device_drop(device);
            mock.device_get_queue(device);
        }

        assert!(matches!(
            mock.violations().as_slice(),
            [Violation::UseAfterRelease {
                function: "device_get_queue",
                kind: MockKind::Device,
                ..
            }]
        ));
    }

    #[test]
    fn test_queue_is_stable() {
        let mock = MockNative::new();
        let device = device(&mock);

        let first = unsafe { mock.device_get_queue(device) };
        let second = unsafe { mock.device_get_queue(device) };
        assert_eq!(first, second);

        unsafe { mock.queue_drop(first) };
        let third = unsafe { mock.device_get_queue(device) };
        assert_ne!(first, third);
    }

    #[test]
    fn test_mapped_range_bounds() {
        let mock = MockNative::new();
        let device = device(&mock);
        let buffer = unsafe { mock.device_create_buffer(device, &buffer_descriptor(16, true)) };

        assert!(!unsafe { mock.buffer_get_mapped_range(buffer, 0, 16) }.is_null());
        assert!(!unsafe { mock.buffer_get_mapped_range(buffer, 8, sys::WHOLE_MAP_SIZE) }.is_null());
        assert!(unsafe { mock.buffer_get_mapped_range(buffer, 8, 9) }.is_null());

        unsafe { mock.buffer_unmap(buffer) };
        assert!(unsafe { mock.buffer_get_mapped_range(buffer, 0, 4) }.is_null());
    }

    #[test]
    fn test_deferred_callbacks_wait_for_flush() {
        use std::sync::Arc;
        use std::sync::atomic::AtomicUsize;

        unsafe extern "C" fn on_done(_: sys::QueueWorkDoneStatus, userdata: *mut c_void) {
            let counter = unsafe { &*userdata.cast::<AtomicUsize>() };
            counter.fetch_add(1, Ordering::SeqCst);
        }

        let mock = MockNative::new();
        mock.set_callback_mode(CallbackMode::Deferred);
        let queue: sys::Queue = mock.fake_handle();
        let counter = Arc::new(AtomicUsize::new(0));

        unsafe {
            mock.queue_on_submitted_work_done(queue, Some(on_done), Arc::as_ptr(&counter).cast_mut().cast());
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(mock.pending_callbacks(), 1);

        assert_eq!(mock.flush_pending(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_calls() {
        let mock = MockNative::new();
        let device = device(&mock);
        unsafe { mock.device_create_buffer(device, &buffer_descriptor(4, false)) };

        assert_eq!(mock.call_count(), 1);
        mock.clear_calls();
        assert_eq!(mock.call_count(), 0);
    }
}
