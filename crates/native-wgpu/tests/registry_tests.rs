//! Identity registry tests.
//!
//! Handles the native side returns repeatedly must always map to one wrapper
//! until that wrapper is released.

mod common;

use native_wgpu::{
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, BufferBindingType, ComputePipelineDescriptor,
    HandleState, PresentMode, ShaderModuleDescriptor, ShaderSource, ShaderStages, SurfaceSource, SwapChainDescriptor,
    TextureUsages,
};
use native_wgpu_test_utils::{MockKind, NativeCall};

use common::fixture;

const BLUR_WGSL: &str = "@compute @workgroup_size(8, 8) fn main() {}";

#[test]
fn test_queue_wrapper_is_shared() {
    let fx = fixture();
    let first = fx.device.queue().unwrap();
    let second = fx.device.queue().unwrap();
    assert_eq!(first, second);
    assert_eq!(fx.mock.live_count(MockKind::Queue), 1);

    assert!(first.release());
    assert_eq!(second.state(), HandleState::Released);

    let fresh = fx.device.queue().unwrap();
    assert_ne!(fresh, first);
    assert_eq!(fresh.state(), HandleState::Live);
    assert_eq!(fx.mock.count_releases(MockKind::Queue), 1);

    drop((first, second, fresh));
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_pipeline_bind_group_layouts_are_shared_per_index() {
    let fx = fixture();
    let shader = fx
        .device
        .create_shader_module(&ShaderModuleDescriptor {
            label: Some("blur"),
            source: ShaderSource::Wgsl(BLUR_WGSL),
        })
        .unwrap();
    let pipeline = fx
        .device
        .create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some("blur"),
            layout: None,
            module: &shader,
            entry_point: "main",
            constants: &[("radius", 4.0)],
        })
        .unwrap();

    let group0 = pipeline.bind_group_layout(0).unwrap();
    let again = pipeline.bind_group_layout(0).unwrap();
    let group1 = pipeline.bind_group_layout(1).unwrap();
    assert_eq!(group0, again);
    assert_ne!(group0, group1);
    assert_eq!(fx.mock.live_count(MockKind::BindGroupLayout), 2);

    assert!(group0.release());
    let replacement = pipeline.bind_group_layout(0).unwrap();
    assert_ne!(replacement, group0);
    assert_eq!(replacement.state(), HandleState::Live);

    drop((group0, again, group1, replacement, pipeline, shader));
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_created_layout_is_released_with_device() {
    let fx = fixture();
    let layout = fx
        .device
        .create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("globals"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::UNIFORM,
                    has_dynamic_offset: false,
                    min_binding_size: 0,
                },
            }],
        })
        .unwrap();
    assert_eq!(layout.label(), Ok(Some("globals")));

    assert!(fx.device.release());
    assert_eq!(layout.state(), HandleState::Released);
    assert_eq!(fx.mock.count_releases(MockKind::BindGroupLayout), 1);

    drop(layout);
    assert_eq!(fx.mock.count_releases(MockKind::BindGroupLayout), 1);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_swap_chain_view_is_shared_until_present() {
    let fx = fixture();
    let surface = unsafe {
        fx.instance.create_surface(
            SurfaceSource::XlibWindow {
                display: std::ptr::without_provenance_mut(0x42),
                window: 7,
            },
            Some("window"),
        )
    }
    .unwrap();
    let format = surface.preferred_format(&fx.adapter).unwrap();
    let swap_chain = fx
        .device
        .create_swap_chain(
            &surface,
            &SwapChainDescriptor {
                label: Some("swap chain"),
                usage: TextureUsages::RENDER_ATTACHMENT,
                format,
                width: 800,
                height: 600,
                present_mode: PresentMode::FIFO,
            },
        )
        .unwrap();

    let frame = swap_chain.current_texture_view().unwrap();
    let same = swap_chain.current_texture_view().unwrap();
    assert_eq!(frame, same);
    assert_eq!(frame.owner(), Ok(None));

    swap_chain.present().unwrap();
    assert_eq!(frame.state(), HandleState::Released);
    assert_eq!(
        fx.mock.count_calls(|call| matches!(call, NativeCall::Present { .. })),
        1
    );

    let next = swap_chain.current_texture_view().unwrap();
    assert_ne!(next, frame);
    assert_eq!(next.state(), HandleState::Live);

    drop((frame, same, next, swap_chain, surface));
    assert_eq!(fx.mock.live_count(MockKind::TextureView), 0);
    assert_eq!(fx.mock.count_releases(MockKind::SwapChain), 1);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_swap_chain_releases_superseded_view() {
    let fx = fixture();
    let surface = unsafe {
        fx.instance.create_surface(
            SurfaceSource::XlibWindow {
                display: std::ptr::without_provenance_mut(0x42),
                window: 9,
            },
            None,
        )
    }
    .unwrap();
    let swap_chain = fx
        .device
        .create_swap_chain(
            &surface,
            &SwapChainDescriptor {
                label: Some("resized"),
                usage: TextureUsages::RENDER_ATTACHMENT,
                format: surface.preferred_format(&fx.adapter).unwrap(),
                width: 640,
                height: 480,
                present_mode: PresentMode::FIFO,
            },
        )
        .unwrap();
    let swap_chain_handle = fx.mock.last_created(MockKind::SwapChain).unwrap().handle;

    let old = swap_chain.current_texture_view().unwrap();
    fx.mock.advance_current_view(swap_chain_handle);
    let new = swap_chain.current_texture_view().unwrap();

    assert_ne!(old, new);
    assert_eq!(old.state(), HandleState::Released);
    assert_eq!(new.state(), HandleState::Live);
    assert_eq!(fx.mock.count_releases(MockKind::TextureView), 1);

    swap_chain.present().unwrap();
    assert_eq!(new.state(), HandleState::Released);
    drop((old, new, swap_chain, surface));
    assert_eq!(fx.mock.live_count(MockKind::TextureView), 0);
    assert_eq!(fx.mock.count_releases(MockKind::TextureView), 2);
    assert!(fx.mock.violations().is_empty());
}
