//! Handle lifetime tests.
//!
//! Checks that every native handle is released exactly once, that destroyed
//! and released wrappers refuse further use, and that calls which hand a
//! handle to the native side never free it again.

mod common;

use std::sync::Arc;

use native_wgpu::sys::{self, NativeApi};
use native_wgpu::{
    BufferDescriptor, BufferUsages, GpuError, HandleState, MapMode, ResourceKind, TextureDimension,
    TextureViewDescriptor,
};
use native_wgpu_test_utils::{MockKind, MockNative, NativeCall};
use parking_lot::Mutex;

use common::{fixture, texture_descriptor};

fn buffer_descriptor(label: &str, usage: BufferUsages) -> BufferDescriptor<'_> {
    BufferDescriptor {
        label: Some(label),
        size: 64,
        usage,
        mapped_at_creation: false,
    }
}

#[test]
fn test_null_handle_is_creation_failure() {
    let mock = Arc::new(MockNative::new());
    let api: Arc<dyn NativeApi> = mock.clone();
    let result = native_wgpu::Buffer::from_raw(
        api,
        std::ptr::null_mut(),
        &buffer_descriptor("orphan", BufferUsages::UNIFORM),
    );
    assert_eq!(
        result.unwrap_err(),
        GpuError::CreationFailed {
            kind: ResourceKind::Buffer
        }
    );
}

#[test]
fn test_failed_native_creation_is_reported() {
    let fx = fixture();
    fx.mock.fail_next_creation();

    let result = fx.device.create_buffer(&buffer_descriptor("vertices", BufferUsages::VERTEX));
    assert_eq!(
        result.unwrap_err(),
        GpuError::CreationFailed {
            kind: ResourceKind::Buffer
        }
    );
    assert_eq!(fx.mock.count_creates(MockKind::Buffer), 0);

    // The failure is one-shot.
    assert!(fx.device.create_buffer(&buffer_descriptor("vertices", BufferUsages::VERTEX)).is_ok());
}

#[test]
fn test_release_is_idempotent() {
    let fx = fixture();
    let buffer = fx
        .device
        .create_buffer(&buffer_descriptor("uniforms", BufferUsages::UNIFORM))
        .unwrap();
    let handle = fx.mock.last_created(MockKind::Buffer).unwrap().handle;

    assert_eq!(buffer.size(), Ok(64));
    assert!(buffer.release());
    assert!(!buffer.release());
    assert_eq!(buffer.state(), HandleState::Released);
    assert_eq!(
        buffer.size(),
        Err(GpuError::UseAfterRelease {
            kind: ResourceKind::Buffer
        })
    );

    drop(buffer);
    assert_eq!(fx.mock.release_count(handle), 1);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_clones_share_one_handle() {
    let fx = fixture();
    let buffer = fx
        .device
        .create_buffer(&buffer_descriptor("shared", BufferUsages::STORAGE))
        .unwrap();
    let handle = fx.mock.last_created(MockKind::Buffer).unwrap().handle;

    let other = buffer.clone();
    assert_eq!(buffer, other);
    drop(buffer);
    assert!(fx.mock.is_live(handle));

    drop(other);
    assert_eq!(fx.mock.release_count(handle), 1);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_destroyed_buffer_keeps_metadata() {
    let fx = fixture();
    let buffer = fx
        .device
        .create_buffer(&buffer_descriptor("staging", BufferUsages::MAP_READ | BufferUsages::COPY_DST))
        .unwrap();
    let handle = fx.mock.last_created(MockKind::Buffer).unwrap().handle;

    assert_eq!(buffer.destroy(), Ok(true));
    assert_eq!(buffer.destroy(), Ok(false));
    assert_eq!(buffer.state(), HandleState::Destroyed);
    assert_eq!(buffer.label(), Ok(Some("staging")));

    let result = buffer.map_async(MapMode::READ, 0, 64, |_| {});
    assert_eq!(
        result,
        Err(GpuError::Destroyed {
            kind: ResourceKind::Buffer
        })
    );

    drop(buffer);
    assert_eq!(fx.mock.destroy_count(handle), 1);
    assert_eq!(fx.mock.release_count(handle), 1);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_buffer_map_read_back() {
    let fx = fixture();
    let buffer = fx
        .device
        .create_buffer(&buffer_descriptor("readback", BufferUsages::MAP_READ | BufferUsages::COPY_DST))
        .unwrap();
    let queue = fx.device.queue().unwrap();
    queue.write_buffer_pod(&buffer, 0, &[1u32, 2, 3, 4]).unwrap();

    let status = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&status);
    buffer
        .map_async(MapMode::READ, 0, 16, move |result| {
            *sink.lock() = Some(result);
        })
        .unwrap();
    assert_eq!(*status.lock(), Some(Ok(())));

    let bytes = buffer.read_mapped(0, 16).unwrap();
    let words: &[u32] = bytemuck::cast_slice(&bytes);
    assert_eq!(words, &[1, 2, 3, 4]);

    buffer.unmap().unwrap();
    assert!(matches!(buffer.read_mapped(0, 16), Err(GpuError::InvalidArgument(_))));
}

#[test]
fn test_mapped_at_creation_write() {
    let fx = fixture();
    let buffer = fx
        .device
        .create_buffer(&BufferDescriptor {
            label: Some("upload"),
            size: 8,
            usage: BufferUsages::MAP_WRITE | BufferUsages::COPY_SRC,
            mapped_at_creation: true,
        })
        .unwrap();
    let handle = fx.mock.last_created(MockKind::Buffer).unwrap().handle;

    buffer.write_mapped(4, &[9, 9, 9, 9]).unwrap();
    buffer.unmap().unwrap();

    assert_eq!(fx.mock.buffer_contents(handle), Some(vec![0, 0, 0, 0, 9, 9, 9, 9]));
    assert!(!fx.mock.is_mapped(handle));
}

#[test]
fn test_texture_release_cascades_to_views() {
    let fx = fixture();
    let texture = fx.device.create_texture(&texture_descriptor(Some("albedo"))).unwrap();
    let texture_handle = fx.mock.last_created(MockKind::Texture).unwrap().handle;

    let full = texture.create_default_view().unwrap();
    let first_mip = texture
        .create_view(&TextureViewDescriptor {
            label: Some("albedo mip 0"),
            mip_level_count: Some(1),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(texture.view_count(), Ok(2));
    assert_eq!(full.owner(), Ok(Some(texture.clone())));

    let view_handles: Vec<usize> = fx
        .mock
        .created(MockKind::TextureView)
        .iter()
        .map(|view| view.handle)
        .collect();
    assert_eq!(view_handles.len(), 2);

    assert!(texture.release());
    assert_eq!(full.state(), HandleState::Released);
    assert_eq!(first_mip.state(), HandleState::Released);
    for handle in &view_handles {
        assert_eq!(fx.mock.release_count(*handle), 1);
    }
    assert_eq!(fx.mock.destroy_count(texture_handle), 1);
    assert_eq!(fx.mock.release_count(texture_handle), 1);
    assert_eq!(
        texture.view_count(),
        Err(GpuError::UseAfterRelease {
            kind: ResourceKind::Texture
        })
    );

    drop((full, first_mip, texture));
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_dropping_texture_releases_views() {
    let fx = fixture();
    let texture = fx.device.create_texture(&texture_descriptor(Some("shadow"))).unwrap();
    let view = texture.create_default_view().unwrap();
    let view_handle = fx.mock.last_created(MockKind::TextureView).unwrap().handle;

    drop(texture);
    assert_eq!(view.state(), HandleState::Released);
    assert_eq!(fx.mock.release_count(view_handle), 1);
    assert_eq!(view.owner(), Err(GpuError::UseAfterRelease {
        kind: ResourceKind::TextureView
    }));

    drop(view);
    assert_eq!(fx.mock.live_count(MockKind::TextureView), 0);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_destroyed_texture_is_released_without_second_destroy() {
    let fx = fixture();
    let texture = fx.device.create_texture(&texture_descriptor(None)).unwrap();
    let handle = fx.mock.last_created(MockKind::Texture).unwrap().handle;

    assert_eq!(texture.destroy(), Ok(true));
    assert!(texture.create_default_view().is_err());
    assert!(texture.release());

    assert_eq!(fx.mock.destroy_count(handle), 1);
    assert_eq!(fx.mock.release_count(handle), 1);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_default_view_follows_texture() {
    let fx = fixture();
    let mut descriptor = texture_descriptor(Some("volume"));
    descriptor.dimension = TextureDimension::D3;
    descriptor.size.depth_or_array_layers = 32;
    let texture = fx.device.create_texture(&descriptor).unwrap();

    let view = texture.create_default_view().unwrap();
    assert_eq!(view.label(), Ok(Some("volume View")));
    assert_eq!(
        fx.mock.last_created(MockKind::TextureView).unwrap().label.as_deref(),
        Some("volume View")
    );

    let unlabeled = fx.device.create_texture(&texture_descriptor(None)).unwrap();
    assert_eq!(unlabeled.create_default_view().unwrap().label(), Ok(None));
}

#[test]
fn test_remove_view_rejects_foreign_view() {
    let fx = fixture();
    let albedo = fx.device.create_texture(&texture_descriptor(Some("albedo"))).unwrap();
    let normal = fx.device.create_texture(&texture_descriptor(Some("normal"))).unwrap();
    let view = albedo.create_default_view().unwrap();

    assert_eq!(
        normal.remove_view(&view),
        Err(GpuError::OwnershipViolation {
            view: "albedo View".to_string(),
            expected_owner: "normal".to_string(),
        })
    );
    assert_eq!(albedo.view_count(), Ok(1));

    albedo.remove_view(&view).unwrap();
    assert_eq!(albedo.view_count(), Ok(0));
    assert_eq!(view.owner(), Ok(None));

    // A removed view survives its former owner.
    let view_handle = fx.mock.last_created(MockKind::TextureView).unwrap().handle;
    albedo.release();
    assert_eq!(view.state(), HandleState::Live);
    assert!(fx.mock.is_live(view_handle));

    assert!(view.release());
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_removed_view_is_released_when_dropped() {
    let fx = fixture();
    let texture = fx.device.create_texture(&texture_descriptor(Some("shadow"))).unwrap();
    let view = texture.create_default_view().unwrap();
    let view_handle = fx.mock.last_created(MockKind::TextureView).unwrap().handle;

    texture.remove_view(&view).unwrap();
    let copy = view.clone();
    drop(view);
    assert!(fx.mock.is_live(view_handle));

    drop(copy);
    assert!(!fx.mock.is_live(view_handle));
    assert_eq!(fx.mock.release_count(view_handle), 1);

    // Nothing left for the device to release.
    assert!(fx.device.release());
    assert_eq!(fx.mock.release_count(view_handle), 1);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_device_release_cascades_to_registered_wrappers() {
    let fx = fixture();
    let queue = fx.device.queue().unwrap();
    let texture = fx.device.create_texture(&texture_descriptor(Some("target"))).unwrap();
    let view = texture.create_default_view().unwrap();

    assert!(fx.device.release());
    assert!(!fx.device.release());
    assert_eq!(queue.state(), HandleState::Released);
    assert_eq!(view.state(), HandleState::Released);
    assert_eq!(fx.mock.count_releases(MockKind::Queue), 1);
    assert_eq!(fx.mock.count_releases(MockKind::TextureView), 1);
    assert_eq!(fx.mock.count_releases(MockKind::Device), 1);
    assert_eq!(
        fx.device.create_buffer(&buffer_descriptor("late", BufferUsages::UNIFORM)),
        Err(GpuError::UseAfterRelease {
            kind: ResourceKind::Device
        })
    );

    // The texture itself is not registered; it is released on drop.
    assert_eq!(texture.state(), HandleState::Live);
    drop((queue, view, texture));
    assert_eq!(fx.mock.count_releases(MockKind::Texture), 1);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_submit_hands_command_buffers_to_native_side() {
    let fx = fixture();
    let queue = fx.device.queue().unwrap();
    let encoder = fx.device.create_command_encoder(Some("frame")).unwrap();
    let encoder_handle = fx.mock.last_created(MockKind::CommandEncoder).unwrap().handle;

    let commands = encoder.finish(Some("frame commands")).unwrap();
    let commands_handle = fx.mock.last_created(MockKind::CommandBuffer).unwrap().handle;
    assert_eq!(encoder.state(), HandleState::Released);
    assert_eq!(
        encoder.finish(None).unwrap_err(),
        GpuError::UseAfterRelease {
            kind: ResourceKind::CommandEncoder
        }
    );

    queue.submit(std::slice::from_ref(&commands)).unwrap();
    assert_eq!(commands.state(), HandleState::Released);
    assert!(fx.mock.is_consumed(commands_handle));
    assert_eq!(
        queue.submit(std::slice::from_ref(&commands)),
        Err(GpuError::UseAfterRelease {
            kind: ResourceKind::CommandBuffer
        })
    );

    drop((encoder, commands));
    assert_eq!(fx.mock.release_count(encoder_handle), 0);
    assert_eq!(fx.mock.release_count(commands_handle), 0);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_submit_checks_every_buffer_first() {
    let fx = fixture();
    let queue = fx.device.queue().unwrap();
    let good = fx.device.create_command_encoder(None).unwrap().finish(None).unwrap();
    let stale = fx.device.create_command_encoder(None).unwrap().finish(None).unwrap();
    stale.release();

    assert!(queue.submit(&[good.clone(), stale]).is_err());
    assert_eq!(good.state(), HandleState::Live);
    queue.submit(&[good]).unwrap();
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_submit_rejects_repeated_buffer() {
    let fx = fixture();
    let queue = fx.device.queue().unwrap();
    let commands = fx.device.create_command_encoder(None).unwrap().finish(Some("frame")).unwrap();
    let handle = fx.mock.last_created(MockKind::CommandBuffer).unwrap().handle;

    assert!(matches!(
        queue.submit(&[commands.clone(), commands.clone()]),
        Err(GpuError::InvalidArgument(_))
    ));
    assert_eq!(commands.state(), HandleState::Live);
    assert!(!fx.mock.is_consumed(handle));
    assert_eq!(fx.mock.count_calls(|call| matches!(call, NativeCall::Submit { .. })), 0);

    queue.submit(&[commands.clone()]).unwrap();
    assert!(fx.mock.is_consumed(handle));
    drop(commands);
    assert_eq!(fx.mock.release_count(handle), 0);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_ended_pass_is_not_released_again() {
    let fx = fixture();
    let encoder = fx.device.create_command_encoder(Some("compute")).unwrap();
    let pass = encoder.begin_compute_pass(Some("blur")).unwrap();
    let pass_handle = fx.mock.last_created(MockKind::ComputePass).unwrap().handle;

    pass.dispatch(8, 8, 1).unwrap();
    pass.end().unwrap();
    assert_eq!(pass.state(), HandleState::Released);
    assert_eq!(
        pass.dispatch(1, 1, 1),
        Err(GpuError::UseAfterRelease {
            kind: ResourceKind::ComputePass
        })
    );

    let commands = encoder.finish(None).unwrap();
    fx.device.queue().unwrap().submit(&[commands]).unwrap();

    drop(pass);
    assert_eq!(fx.mock.count_commands("compute_pass_encoder_dispatch"), 1);
    assert_eq!(fx.mock.release_count(pass_handle), 0);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_stale_resource_never_reaches_native_side() {
    let fx = fixture();
    let buffer = fx
        .device
        .create_buffer(&buffer_descriptor("scratch", BufferUsages::COPY_DST))
        .unwrap();
    let encoder = fx.device.create_command_encoder(None).unwrap();
    buffer.release();

    assert_eq!(
        encoder.clear_buffer(&buffer, 0, None),
        Err(GpuError::UseAfterRelease {
            kind: ResourceKind::Buffer
        })
    );
    assert_eq!(fx.mock.count_commands("command_encoder_clear_buffer"), 0);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_query_set_destroy_then_release() {
    let fx = fixture();
    let query_set = fx
        .device
        .create_query_set(&native_wgpu::QuerySetDescriptor {
            label: Some("timestamps"),
            ty: sys::QueryType::TIMESTAMP,
            count: 4,
            pipeline_statistics: &[],
        })
        .unwrap();
    let handle = fx.mock.last_created(MockKind::QuerySet).unwrap().handle;

    assert_eq!(query_set.count(), Ok(4));
    assert_eq!(query_set.destroy(), Ok(true));
    assert_eq!(query_set.query_type(), Ok(sys::QueryType::TIMESTAMP));
    assert!(query_set.release());

    assert_eq!(fx.mock.destroy_count(handle), 1);
    assert_eq!(fx.mock.release_count(handle), 1);
    assert!(fx.mock.violations().is_empty());
}
