//! Callback signatures.
//!
//! Messages are borrowed for the duration of the call only. `userdata` is
//! handed back untouched.

use core::ffi::{c_char, c_void};

use crate::descriptors::CompilationInfo;
use crate::enums::*;
use crate::handles::*;

pub type RequestAdapterCallback = Option<
    unsafe extern "C" fn(status: RequestAdapterStatus, adapter: Adapter, message: *const c_char, userdata: *mut c_void),
>;

pub type RequestDeviceCallback = Option<
    unsafe extern "C" fn(status: RequestDeviceStatus, device: Device, message: *const c_char, userdata: *mut c_void),
>;

pub type CreateComputePipelineAsyncCallback = Option<
    unsafe extern "C" fn(
        status: CreatePipelineAsyncStatus,
        pipeline: ComputePipeline,
        message: *const c_char,
        userdata: *mut c_void,
    ),
>;

pub type CreateRenderPipelineAsyncCallback = Option<
    unsafe extern "C" fn(
        status: CreatePipelineAsyncStatus,
        pipeline: RenderPipeline,
        message: *const c_char,
        userdata: *mut c_void,
    ),
>;

pub type CompilationInfoCallback = Option<
    unsafe extern "C" fn(status: CompilationInfoRequestStatus, info: *const CompilationInfo, userdata: *mut c_void),
>;

pub type ErrorCallback =
    Option<unsafe extern "C" fn(error_type: ErrorType, message: *const c_char, userdata: *mut c_void)>;

pub type DeviceLostCallback =
    Option<unsafe extern "C" fn(reason: DeviceLostReason, message: *const c_char, userdata: *mut c_void)>;

pub type BufferMapCallback = Option<unsafe extern "C" fn(status: BufferMapAsyncStatus, userdata: *mut c_void)>;

pub type QueueWorkDoneCallback = Option<unsafe extern "C" fn(status: QueueWorkDoneStatus, userdata: *mut c_void)>;

pub type LogCallback = Option<unsafe extern "C" fn(level: LogLevel, message: *const c_char, userdata: *mut c_void)>;
