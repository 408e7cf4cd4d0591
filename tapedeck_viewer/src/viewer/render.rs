//! Draw passes. The frame is built as a clear pass followed by load passes
//! for the model, the video screen plane, and the HUD panels, so each layer
//! stays independent of whether the earlier ones drew anything.

use bytemuck::cast_slice;
use wgpu::SurfaceError;

use super::ViewerState;
use super::shaders::CameraUniforms;
use crate::scene::OrbitCamera;

pub(super) fn render(state: &mut ViewerState) -> Result<(), SurfaceError> {
    let frame = state.surface.get_current_texture()?;
    let view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    state.loading_panel.upload(&state.queue);
    state.now_playing_panel.upload(&state.queue);
    state.progress_panel.upload(&state.queue);

    // Mid focus animation the override pose drives the camera instead of the
    // orbit parameters.
    let (view_proj, eye) = match state.focus_override {
        Some(pose) => (
            OrbitCamera::pose_view_projection(pose.eye, pose.target, state.size),
            pose.eye,
        ),
        None => (state.camera.view_projection(state.size), state.camera.eye()),
    };
    let uniforms = CameraUniforms {
        view_proj: view_proj.to_cols_array_2d(),
        eye: [eye.x, eye.y, eye.z, 1.0],
    };
    state
        .queue
        .write_buffer(&state.camera_buffer, 0, cast_slice(&[uniforms]));

    let mut encoder = state
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame-encoder"),
        });

    {
        let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("clear-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(state.background),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &state.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }

    if let Some(assets) = state.model.as_ref() {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("model-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &state.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&state.model_pipeline);
        pass.set_bind_group(0, &state.camera_bind_group, &[]);
        pass.set_bind_group(1, &state.environment_bind_group, &[]);
        pass.set_vertex_buffer(0, assets.geometry.vertex_buffer.slice(..));
        pass.set_index_buffer(
            assets.geometry.index_buffer.slice(..),
            wgpu::IndexFormat::Uint32,
        );
        pass.draw_indexed(0..assets.geometry.index_count, 0, 0..1);
    }

    if state.overlay_visible {
        if let (Some(quad), Some(texture)) =
            (state.screen_quad.as_ref(), state.video_texture.as_ref())
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("screen-plane-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &state.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&state.plane_pipeline);
            pass.set_bind_group(0, &state.camera_bind_group, &[]);
            pass.set_bind_group(1, texture.bind_group(), &[]);
            pass.set_vertex_buffer(0, quad.vertex_buffer.slice(..));
            pass.set_index_buffer(state.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(0..state.quad_index_count, 0, 0..1);
        }
    }

    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("hud-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&state.hud_pipeline);
        pass.set_index_buffer(state.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        for panel in [
            &state.loading_panel,
            &state.now_playing_panel,
            &state.progress_panel,
        ] {
            if !panel.is_visible() {
                continue;
            }
            pass.set_bind_group(0, panel.bind_group(), &[]);
            pass.set_vertex_buffer(0, panel.vertex_buffer().slice(..));
            pass.draw_indexed(0..state.quad_index_count, 0, 0..1);
        }
    }

    state.queue.submit(std::iter::once(encoder.finish()));
    frame.present();
    Ok(())
}
