//! Command recording tests.
//!
//! Copies, queries and pass state all check every resource they reference
//! before anything reaches the native side.

mod common;

use native_wgpu::{
    BufferDescriptor, BufferUsages, Color, CommandEncoder, Extent3d, GpuError, ImageCopyBuffer, ImageCopyTexture,
    LoadOp, Origin3d, PipelineStatisticName, QuerySetDescriptor, QueryType, RenderPassColorAttachment,
    RenderPassDescriptor, ResourceKind, ShaderStages, StoreOp, TextureAspect, TextureDataLayout, TextureUsages,
};
use native_wgpu_test_utils::NativeCall;

use common::{Fixture, fixture, texture_descriptor};

const TILE: Extent3d = Extent3d {
    width: 16,
    height: 16,
    depth_or_array_layers: 1,
};

fn buffer(fx: &Fixture, label: &str, usage: BufferUsages) -> native_wgpu::Buffer {
    fx.device
        .create_buffer(&BufferDescriptor {
            label: Some(label),
            size: 1024,
            usage,
            mapped_at_creation: false,
        })
        .unwrap()
}

fn encoder(fx: &Fixture) -> CommandEncoder {
    fx.device.create_command_encoder(Some("frame")).unwrap()
}

#[test]
fn test_texture_copies_are_recorded() {
    let fx = fixture();
    let staging = buffer(&fx, "staging", BufferUsages::COPY_SRC | BufferUsages::COPY_DST);
    let atlas = fx.device.create_texture(&texture_descriptor(Some("atlas"))).unwrap();
    let scratch = fx.device.create_texture(&texture_descriptor(Some("scratch"))).unwrap();

    let layout = TextureDataLayout {
        offset: 0,
        bytes_per_row: Some(64),
        rows_per_image: None,
    };
    let staging_copy = ImageCopyBuffer {
        buffer: &staging,
        layout,
    };
    let atlas_tile = ImageCopyTexture {
        texture: &atlas,
        mip_level: 0,
        origin: Origin3d { x: 16, y: 32, z: 0 },
        aspect: TextureAspect::ALL,
    };

    let encoder = encoder(&fx);
    encoder.copy_buffer_to_texture(&staging_copy, &atlas_tile, TILE).unwrap();
    encoder.copy_texture_to_texture(&atlas_tile, &ImageCopyTexture::whole(&scratch), TILE).unwrap();
    encoder.copy_texture_to_buffer(&ImageCopyTexture::whole(&scratch), &staging_copy, TILE).unwrap();
    fx.device.queue().unwrap().submit(&[encoder.finish(None).unwrap()]).unwrap();

    assert_eq!(fx.mock.count_commands("command_encoder_copy_buffer_to_texture"), 1);
    assert_eq!(fx.mock.count_commands("command_encoder_copy_texture_to_texture"), 1);
    assert_eq!(fx.mock.count_commands("command_encoder_copy_texture_to_buffer"), 1);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_copy_with_destroyed_texture_is_refused() {
    let fx = fixture();
    let staging = buffer(&fx, "staging", BufferUsages::COPY_SRC);
    let atlas = fx.device.create_texture(&texture_descriptor(Some("atlas"))).unwrap();
    atlas.destroy().unwrap();

    let encoder = encoder(&fx);
    assert_eq!(
        encoder.copy_buffer_to_texture(
            &ImageCopyBuffer {
                buffer: &staging,
                layout: TextureDataLayout::default(),
            },
            &ImageCopyTexture::whole(&atlas),
            TILE,
        ),
        Err(GpuError::Destroyed {
            kind: ResourceKind::Texture
        })
    );
    assert_eq!(fx.mock.count_commands("command_encoder_copy_buffer_to_texture"), 0);

    let scratch = fx.device.create_texture(&texture_descriptor(Some("scratch"))).unwrap();
    staging.release();
    assert_eq!(
        encoder.copy_texture_to_buffer(
            &ImageCopyTexture::whole(&scratch),
            &ImageCopyBuffer {
                buffer: &staging,
                layout: TextureDataLayout::default(),
            },
            TILE,
        ),
        Err(GpuError::UseAfterRelease {
            kind: ResourceKind::Buffer
        })
    );
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_write_texture() {
    let fx = fixture();
    let queue = fx.device.queue().unwrap();
    let texture = fx.device.create_texture(&texture_descriptor(Some("font"))).unwrap();
    let texels = vec![0xFFu8; 16 * 16 * 4];
    let layout = TextureDataLayout {
        offset: 0,
        bytes_per_row: Some(16 * 4),
        rows_per_image: Some(16),
    };

    queue.write_texture(&ImageCopyTexture::whole(&texture), &texels, layout, TILE).unwrap();
    assert_eq!(fx.mock.count_commands("queue_write_texture"), 1);

    texture.release();
    assert_eq!(
        queue.write_texture(&ImageCopyTexture::whole(&texture), &texels, layout, TILE),
        Err(GpuError::UseAfterRelease {
            kind: ResourceKind::Texture
        })
    );
    assert_eq!(fx.mock.count_commands("queue_write_texture"), 1);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_timestamps_resolve_into_buffer() {
    let fx = fixture();
    let timestamps = fx
        .device
        .create_query_set(&QuerySetDescriptor {
            label: Some("timestamps"),
            ty: QueryType::TIMESTAMP,
            count: 2,
            pipeline_statistics: &[],
        })
        .unwrap();
    let resolve = buffer(&fx, "resolve", BufferUsages::QUERY_RESOLVE | BufferUsages::COPY_SRC);

    let encoder = encoder(&fx);
    encoder.write_timestamp(&timestamps, 0).unwrap();
    encoder.write_timestamp(&timestamps, 1).unwrap();
    encoder.resolve_query_set(&timestamps, 0..2, &resolve, 0).unwrap();
    assert_eq!(fx.mock.count_commands("command_encoder_write_timestamp"), 2);
    assert_eq!(fx.mock.count_commands("command_encoder_resolve_query_set"), 1);

    timestamps.destroy().unwrap();
    assert_eq!(
        encoder.write_timestamp(&timestamps, 0),
        Err(GpuError::Destroyed {
            kind: ResourceKind::QuerySet
        })
    );
    assert_eq!(fx.mock.count_commands("command_encoder_write_timestamp"), 2);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_compute_pass_indirect_and_statistics() {
    let fx = fixture();
    let args = buffer(&fx, "dispatch args", BufferUsages::INDIRECT | BufferUsages::STORAGE);
    let statistics = fx
        .device
        .create_query_set(&QuerySetDescriptor {
            label: Some("stats"),
            ty: QueryType::PIPELINE_STATISTICS,
            count: 1,
            pipeline_statistics: &[PipelineStatisticName::COMPUTE_SHADER_INVOCATIONS],
        })
        .unwrap();

    let encoder = encoder(&fx);
    let pass = encoder.begin_compute_pass(Some("cull")).unwrap();
    pass.begin_pipeline_statistics_query(&statistics, 0).unwrap();
    pass.dispatch_indirect(&args, 0).unwrap();
    pass.end_pipeline_statistics_query().unwrap();

    args.destroy().unwrap();
    assert_eq!(
        pass.dispatch_indirect(&args, 0),
        Err(GpuError::Destroyed {
            kind: ResourceKind::Buffer
        })
    );
    pass.end().unwrap();
    assert!(pass.dispatch_indirect(&args, 0).is_err());

    assert_eq!(fx.mock.count_commands("compute_pass_encoder_dispatch_indirect"), 1);
    assert_eq!(
        fx.mock.count_commands("compute_pass_encoder_begin_pipeline_statistics_query"),
        1
    );
    assert_eq!(fx.mock.count_commands("compute_pass_encoder_end_pipeline_statistics_query"), 1);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_render_pass_state_and_indirect_draws() {
    let fx = fixture();
    let target = fx.device.create_texture(&texture_descriptor(Some("target"))).unwrap();
    let view = target.create_default_view().unwrap();
    let args = buffer(&fx, "draw args", BufferUsages::INDIRECT);
    let occlusion = fx
        .device
        .create_query_set(&QuerySetDescriptor {
            label: Some("occlusion"),
            ty: QueryType::OCCLUSION,
            count: 4,
            pipeline_statistics: &[],
        })
        .unwrap();

    let encoder = encoder(&fx);
    let attachments = [RenderPassColorAttachment {
        view: &view,
        resolve_target: None,
        load_op: LoadOp::CLEAR,
        store_op: StoreOp::STORE,
        clear_value: Color::default(),
    }];
    let pass = encoder
        .begin_render_pass(&RenderPassDescriptor {
            label: Some("main"),
            color_attachments: &attachments,
            depth_stencil_attachment: None,
            occlusion_query_set: Some(&occlusion),
        })
        .unwrap();

    pass.set_viewport(0.0, 0.0, 256.0, 256.0, 0.0..1.0).unwrap();
    pass.set_scissor_rect(8, 8, 240, 240).unwrap();
    pass.set_blend_constant(Color {
        r: 1.0,
        g: 0.5,
        b: 0.25,
        a: 1.0,
    })
    .unwrap();
    pass.set_stencil_reference(0x80).unwrap();
    pass.set_push_constants(ShaderStages::VERTEX_FRAGMENT, 0, &[0u8; 16]).unwrap();
    pass.begin_occlusion_query(3).unwrap();
    pass.draw_indirect(&args, 0).unwrap();
    pass.draw_indexed_indirect(&args, 16).unwrap();
    pass.end_occlusion_query().unwrap();
    pass.end().unwrap();

    assert_eq!(
        pass.set_viewport(0.0, 0.0, 1.0, 1.0, 0.0..1.0),
        Err(GpuError::UseAfterRelease {
            kind: ResourceKind::RenderPass
        })
    );

    for name in [
        "render_pass_encoder_set_viewport",
        "render_pass_encoder_set_scissor_rect",
        "render_pass_encoder_set_blend_constant",
        "render_pass_encoder_set_stencil_reference",
        "render_pass_encoder_set_push_constants",
        "render_pass_encoder_begin_occlusion_query",
        "render_pass_encoder_draw_indirect",
        "render_pass_encoder_draw_indexed_indirect",
        "render_pass_encoder_end_occlusion_query",
    ] {
        assert_eq!(fx.mock.count_commands(name), 1, "{name}");
    }

    fx.device.queue().unwrap().submit(&[encoder.finish(None).unwrap()]).unwrap();
    assert_eq!(fx.mock.count_calls(|call| matches!(call, NativeCall::Submit { .. })), 1);
    assert!(fx.mock.violations().is_empty());
}

#[test]
fn test_render_pass_statistics_query_needs_live_set() {
    let fx = fixture();
    let target = fx
        .device
        .create_texture(&native_wgpu::TextureDescriptor {
            usage: TextureUsages::RENDER_ATTACHMENT,
            ..texture_descriptor(Some("offscreen"))
        })
        .unwrap();
    let view = target.create_default_view().unwrap();
    let statistics = fx
        .device
        .create_query_set(&QuerySetDescriptor {
            label: None,
            ty: QueryType::PIPELINE_STATISTICS,
            count: 1,
            pipeline_statistics: &[PipelineStatisticName::FRAGMENT_SHADER_INVOCATIONS],
        })
        .unwrap();

    let encoder = encoder(&fx);
    let attachments = [RenderPassColorAttachment {
        view: &view,
        resolve_target: None,
        load_op: LoadOp::LOAD,
        store_op: StoreOp::STORE,
        clear_value: Color::default(),
    }];
    let pass = encoder
        .begin_render_pass(&RenderPassDescriptor {
            color_attachments: &attachments,
            ..Default::default()
        })
        .unwrap();

    pass.begin_pipeline_statistics_query(&statistics, 0).unwrap();
    pass.end_pipeline_statistics_query().unwrap();
    statistics.release();
    assert_eq!(
        pass.begin_pipeline_statistics_query(&statistics, 0),
        Err(GpuError::UseAfterRelease {
            kind: ResourceKind::QuerySet
        })
    );
    assert_eq!(
        fx.mock.count_commands("render_pass_encoder_begin_pipeline_statistics_query"),
        1
    );
    pass.end().unwrap();
    assert!(fx.mock.violations().is_empty());
}
