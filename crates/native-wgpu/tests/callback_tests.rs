//! Callback tests.
//!
//! Request, error scope, device loss, work-done and log callbacks all cross
//! the ABI as a trampoline plus userdata; these tests drive them through the
//! mock in both immediate and deferred mode.

mod common;

use std::io;
use std::sync::Arc;

use native_wgpu::callback::NATIVE_LOG_TARGET;
use native_wgpu::{
    CompilationMessageType, ComputePipelineDescriptor, Config, DeviceDescriptor, DeviceLostReason, ErrorFilter,
    ErrorType, GpuError, HandleState, MultisampleState, NativeLogLevel, PrimitiveState,
    QueueWorkDoneStatus, RenderPipelineDescriptor, RequestAdapterOptions, ResourceKind, ShaderModuleDescriptor,
    ShaderSource, VertexState,
};
use native_wgpu_test_utils::{CallbackMode, MockKind, NativeCall};
use parking_lot::Mutex;

use common::{device_addr, fixture, instance_with};

#[test]
fn test_deferred_adapter_request_completes_on_process_events() {
    let (mock, instance) = instance_with(&Config::default());
    mock.set_callback_mode(CallbackMode::Deferred);

    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    instance
        .request_adapter(&RequestAdapterOptions::default(), move |result| {
            *sink.lock() = Some(result);
        })
        .unwrap();
    assert!(slot.lock().is_none());
    assert_eq!(mock.pending_callbacks(), 1);

    instance.process_events().unwrap();
    let adapter = slot.lock().take().unwrap().unwrap();
    assert_eq!(adapter.properties().unwrap().name, "Mock Adapter");
    assert_eq!(mock.pending_callbacks(), 0);
}

#[test]
fn test_sync_requests_drive_deferred_callbacks() {
    let (mock, instance) = instance_with(&Config::default());
    mock.set_callback_mode(CallbackMode::Deferred);

    let adapter = instance.request_adapter_sync(&RequestAdapterOptions::default()).unwrap();
    let device = adapter.request_device_sync(&DeviceDescriptor::default()).unwrap();
    assert_eq!(device.label(), None);
    assert_eq!(mock.count_commands("instance_process_events"), 2);
}

#[test]
fn test_failed_requests_carry_status_and_message() {
    let (mock, instance) = instance_with(&Config::default());
    mock.fail_next_request("no suitable adapter");
    assert_eq!(
        instance.request_adapter_sync(&RequestAdapterOptions::default()),
        Err(GpuError::RequestFailed {
            kind: ResourceKind::Adapter,
            status: "ERROR".to_string(),
            message: "no suitable adapter".to_string(),
        })
    );

    let adapter = instance.request_adapter_sync(&RequestAdapterOptions::default()).unwrap();
    mock.fail_next_request("out of devices");
    assert_eq!(
        adapter.request_device_sync(&DeviceDescriptor::default()),
        Err(GpuError::RequestFailed {
            kind: ResourceKind::Device,
            status: "ERROR".to_string(),
            message: "out of devices".to_string(),
        })
    );
    assert!(mock.violations().is_empty());
}

#[test]
fn test_error_scope_reports_captured_error() {
    let fx = fixture();
    let seen = Arc::new(Mutex::new(Vec::new()));

    fx.device.push_error_scope(ErrorFilter::VALIDATION).unwrap();
    assert_eq!(fx.mock.error_scope_depth(device_addr(&fx.mock, &fx.device)), 1);
    fx.mock.set_next_scope_error(ErrorType::VALIDATION, "binding 0 is missing");

    let sink = Arc::clone(&seen);
    let popped = fx
        .device
        .pop_error_scope(move |error_type, message| sink.lock().push((error_type, message)))
        .unwrap();
    assert!(popped);

    let sink = Arc::clone(&seen);
    let popped = fx
        .device
        .pop_error_scope(move |error_type, message| sink.lock().push((error_type, message)))
        .unwrap();
    assert!(!popped);

    assert_eq!(
        *seen.lock(),
        vec![
            (ErrorType::VALIDATION, "binding 0 is missing".to_string()),
            (ErrorType::UNKNOWN, "no error scope to pop".to_string()),
        ]
    );
}

#[test]
fn test_uncaptured_errors_reach_handler() {
    let fx = fixture();
    let device = device_addr(&fx.mock, &fx.device);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    fx.device
        .on_uncaptured_error(move |error_type, message| sink.lock().push((error_type, message)))
        .unwrap();
    assert!(fx.mock.has_uncaptured_error_callback(device));

    assert!(fx.mock.raise_uncaptured_error(device, ErrorType::OUT_OF_MEMORY, "heap exhausted"));
    assert_eq!(
        *seen.lock(),
        vec![(ErrorType::OUT_OF_MEMORY, "heap exhausted".to_string())]
    );

    // A replacement handler takes over.
    let replaced = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&replaced);
    fx.device
        .on_uncaptured_error(move |_, _| *counter.lock() += 1)
        .unwrap();
    fx.mock.raise_uncaptured_error(device, ErrorType::VALIDATION, "again");
    assert_eq!(seen.lock().len(), 1);
    assert_eq!(*replaced.lock(), 1);

    assert!(fx.device.release());
    assert!(!fx.mock.has_uncaptured_error_callback(device));
}

#[test]
fn test_device_destroy_reports_loss_once() {
    let fx = fixture();
    let lost = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lost);
    fx.device
        .on_device_lost(move |reason, message| sink.lock().push((reason, message)))
        .unwrap();

    assert_eq!(fx.device.destroy(), Ok(true));
    assert_eq!(fx.device.destroy(), Ok(false));
    assert_eq!(
        *lost.lock(),
        vec![(DeviceLostReason::DESTROYED, "device destroyed".to_string())]
    );
    assert_eq!(
        fx.device.queue(),
        Err(GpuError::Destroyed {
            kind: ResourceKind::Device
        })
    );
    let destroys = fx.mock.count_calls(|call| {
        matches!(
            call,
            NativeCall::Destroy {
                kind: MockKind::Device,
                ..
            }
        )
    });
    assert_eq!(destroys, 1);
}

#[test]
fn test_work_done_callback() {
    let fx = fixture();
    let queue = fx.device.queue().unwrap();
    fx.mock.set_callback_mode(CallbackMode::Deferred);

    let status = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&status);
    queue
        .on_submitted_work_done(move |result| *sink.lock() = Some(result))
        .unwrap();
    assert!(status.lock().is_none());

    assert!(fx.device.poll(true).unwrap());
    assert_eq!(*status.lock(), Some(QueueWorkDoneStatus::SUCCESS));
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_native_logs_are_forwarded_to_tracing() {
    let (mock, _instance) = instance_with(&Config {
        native_log_level: NativeLogLevel::INFO,
        ..Default::default()
    });
    assert!(mock.has_log_callback());
    assert_eq!(mock.log_level(), Some(NativeLogLevel::INFO));

    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        assert!(mock.emit_log(NativeLogLevel::WARN, "surface is outdated"));
    });

    let output = String::from_utf8(captured.0.lock().clone()).unwrap();
    assert!(output.contains("surface is outdated"));
    assert!(output.contains("WARN"));
    assert!(output.contains(NATIVE_LOG_TARGET));
}

#[test]
fn test_log_forwarding_can_be_disabled() {
    let (mock, _instance) = instance_with(&Config {
        forward_native_logs: false,
        ..Default::default()
    });
    assert!(!mock.has_log_callback());
    assert_eq!(mock.log_level(), Some(NativeLogLevel::WARN));
    assert_eq!(mock.count_creates(MockKind::Instance), 1);
}

const TRIANGLE_WGSL: &str = "@vertex fn vs_main() -> @builtin(position) vec4f { return vec4f(); }";

#[test]
fn test_async_compute_pipeline_completes_immediately() {
    let fx = fixture();
    let shader = fx
        .device
        .create_shader_module(&ShaderModuleDescriptor {
            label: Some("reduce"),
            source: ShaderSource::Wgsl("@compute @workgroup_size(64) fn main() {}"),
        })
        .unwrap();

    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    fx.device
        .create_compute_pipeline_async(
            &ComputePipelineDescriptor {
                label: Some("reduce"),
                layout: None,
                module: &shader,
                entry_point: "main",
                constants: &[],
            },
            move |result| *sink.lock() = Some(result),
        )
        .unwrap();

    let pipeline = slot.lock().take().unwrap().unwrap();
    assert_eq!(pipeline.label(), Ok(Some("reduce")));
    assert_eq!(pipeline.state(), HandleState::Live);
    let handle = fx.mock.last_created(MockKind::ComputePipeline).unwrap().handle;

    drop(pipeline);
    assert_eq!(fx.mock.release_count(handle), 1);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_async_render_pipeline_waits_for_events() {
    let fx = fixture();
    fx.mock.set_callback_mode(CallbackMode::Deferred);
    let shader = fx
        .device
        .create_shader_module(&ShaderModuleDescriptor {
            label: None,
            source: ShaderSource::Wgsl(TRIANGLE_WGSL),
        })
        .unwrap();

    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    fx.device
        .create_render_pipeline_async(
            &RenderPipelineDescriptor {
                label: Some("triangle"),
                layout: None,
                vertex: VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    constants: &[],
                    buffers: &[],
                },
                primitive: PrimitiveState::default(),
                depth_stencil: None,
                multisample: MultisampleState::default(),
                fragment: None,
            },
            move |result| *sink.lock() = Some(result),
        )
        .unwrap();
    assert!(slot.lock().is_none());
    assert_eq!(fx.mock.pending_callbacks(), 1);

    fx.instance.process_events().unwrap();
    let pipeline = slot.lock().take().unwrap().unwrap();
    assert_eq!(pipeline.label(), Ok(Some("triangle")));
    assert!(pipeline.bind_group_layout(0).is_ok());
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_failed_async_pipeline_reports_request_failure() {
    let fx = fixture();
    let shader = fx
        .device
        .create_shader_module(&ShaderModuleDescriptor {
            label: None,
            source: ShaderSource::Wgsl("@compute @workgroup_size(1) fn main() {}"),
        })
        .unwrap();
    fx.mock.fail_next_request("entry point `main` not found");

    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    fx.device
        .create_compute_pipeline_async(
            &ComputePipelineDescriptor {
                label: None,
                layout: None,
                module: &shader,
                entry_point: "main",
                constants: &[],
            },
            move |result| *sink.lock() = Some(result),
        )
        .unwrap();

    assert_eq!(
        slot.lock().take().unwrap(),
        Err(GpuError::RequestFailed {
            kind: ResourceKind::ComputePipeline,
            status: "VALIDATION_ERROR".to_string(),
            message: "entry point `main` not found".to_string(),
        })
    );
    assert_eq!(fx.mock.count_creates(MockKind::ComputePipeline), 0);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_async_pipeline_on_released_device_fails_up_front() {
    let fx = fixture();
    let shader = fx
        .device
        .create_shader_module(&ShaderModuleDescriptor {
            label: None,
            source: ShaderSource::Wgsl("@compute @workgroup_size(1) fn main() {}"),
        })
        .unwrap();
    fx.device.destroy().unwrap();

    let called = Arc::new(Mutex::new(false));
    let sink = Arc::clone(&called);
    let result = fx.device.create_compute_pipeline_async(
        &ComputePipelineDescriptor {
            label: None,
            layout: None,
            module: &shader,
            entry_point: "main",
            constants: &[],
        },
        move |_| *sink.lock() = true,
    );
    assert_eq!(result, Err(GpuError::Destroyed { kind: ResourceKind::Device }));
    assert!(!*called.lock());
}

#[test]
fn test_compilation_info_lists_messages() {
    let fx = fixture();
    fx.mock.set_callback_mode(CallbackMode::Deferred);
    fx.mock.set_compilation_messages(&[
        (CompilationMessageType::WARNING, "unused variable `x`", 2, 5),
        (CompilationMessageType::INFO, "entry point `main`", 1, 1),
    ]);
    let shader = fx
        .device
        .create_shader_module(&ShaderModuleDescriptor {
            label: Some("lint"),
            source: ShaderSource::Wgsl("@compute @workgroup_size(1) fn main() { let x = 1; }"),
        })
        .unwrap();

    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    shader.compilation_info(move |result| *sink.lock() = Some(result)).unwrap();
    assert!(slot.lock().is_none());

    fx.instance.process_events().unwrap();
    let messages = slot.lock().take().unwrap().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].ty, CompilationMessageType::WARNING);
    assert_eq!(messages[0].message, "unused variable `x`");
    assert_eq!((messages[0].line_num, messages[0].line_pos), (2, 5));
    assert_eq!(messages[1].ty, CompilationMessageType::INFO);
}

#[test]
fn test_compilation_info_failure_and_stale_module() {
    let fx = fixture();
    let shader = fx
        .device
        .create_shader_module(&ShaderModuleDescriptor {
            label: None,
            source: ShaderSource::Wgsl("@compute @workgroup_size(1) fn main() {}"),
        })
        .unwrap();

    fx.mock.fail_next_request("device lost");
    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    shader.compilation_info(move |result| *sink.lock() = Some(result)).unwrap();
    assert_eq!(
        slot.lock().take().unwrap(),
        Err(GpuError::RequestFailed {
            kind: ResourceKind::ShaderModule,
            status: "ERROR".to_string(),
            message: String::new(),
        })
    );

    shader.release();
    assert_eq!(
        shader.compilation_info(|_| {}),
        Err(GpuError::UseAfterRelease {
            kind: ResourceKind::ShaderModule
        })
    );
    assert_eq!(fx.mock.count_commands("shader_module_get_compilation_info"), 1);
    assert!(fx.mock.violations().is_empty());
}
