use anyhow::{Result, anyhow};
use backend::{Extent, GraphicsBackend};
use context::{Buffer, BufferInfo, Context, RasterPipeline, RasterPipelineInfo};
use error::SetupError;
use frame::{FrameDriver, FrameInputs, FrameOutcome, FrameState};
use native::NativeWindowHandle;
use std::sync::Arc;
use vulkanalia::vk;
use winit::window::Window;

use crate::config::RendererConfig;

pub mod backend;
pub mod context;
pub mod error;
pub mod frame;
pub mod native;
pub mod triangle;

#[cfg(test)]
mod mock;

/// Draws the triangle every tick and owns what it draws with.
pub struct Renderer<B: GraphicsBackend> {
    backend: B,
    pipeline: Option<B::Pipeline>,
    vertex_buffer: Option<B::Buffer>,
    frame_state: FrameState,
    driver: FrameDriver,
}

impl<B: GraphicsBackend> Renderer<B> {
    pub fn from_parts(backend: B, pipeline: B::Pipeline, vertex_buffer: B::Buffer) -> Self {
        Self {
            backend,
            pipeline: Some(pipeline),
            vertex_buffer: Some(vertex_buffer),
            frame_state: FrameState::default(),
            driver: FrameDriver::new(),
        }
    }

    pub fn frame_state(&self) -> FrameState {
        self.frame_state
    }

    pub fn frames_presented(&self) -> u64 {
        self.driver.frames_presented()
    }

    /// Runs one frame. Does nothing once resources are released.
    pub fn tick(&mut self, window_size: Extent) -> Result<FrameOutcome> {
        let (Some(pipeline), Some(vertex_buffer)) =
            (self.pipeline.as_ref(), self.vertex_buffer.as_ref())
        else {
            return Ok(FrameOutcome::Skipped);
        };
        let vertex_buffer_address = self.backend.buffer_device_address(vertex_buffer)?;

        let (frame_state, outcome) = self.driver.tick(
            &mut self.backend,
            self.frame_state,
            FrameInputs {
                pipeline,
                vertex_buffer_address,
                window_size,
            },
        )?;
        self.frame_state = frame_state;
        Ok(outcome)
    }

    /// The next tick resizes instead of drawing.
    pub fn viewport_changed(&mut self) {
        self.frame_state = self.frame_state.mark_out_of_date();
    }

    /// Waits for the device, then releases the vertex buffer and the pipeline.
    pub fn shutdown(&mut self) -> Result<()> {
        self.backend.wait_idle()?;
        self.backend.collect_garbage()?;
        if let Some(vertex_buffer) = self.vertex_buffer.take() {
            self.backend.destroy_buffer(vertex_buffer);
        }
        self.pipeline = None;
        Ok(())
    }
}

impl Renderer<Context> {
    pub fn new(window: &Window, config: &RendererConfig) -> Result<Self> {
        let native_window = NativeWindowHandle::from_window(window)?;
        let size = window.inner_size();

        // SAFETY: the window outlives the renderer; `destroy` releases the context.
        let mut context = unsafe {
            Context::create(
                &native_window,
                Extent::new(size.width, size.height),
                config,
            )?
        };

        match Self::create_resources(&mut context) {
            Ok((pipeline, vertex_buffer)) => Ok(Self::from_parts(context, pipeline, vertex_buffer)),
            Err(error) => {
                unsafe { context.destroy() };
                Err(error)
            }
        }
    }

    fn create_resources(context: &mut Context) -> Result<(Arc<RasterPipeline>, Buffer)> {
        let color_format = context.swapchain_format();
        let pipeline = context
            .add_raster_pipeline(RasterPipelineInfo {
                source: triangle::SHADER_SOURCE,
                color_format,
                push_constant_size: size_of::<vk::DeviceAddress>() as u32,
                name: triangle::SHADER_NAME,
            })
            .map_err(SetupError::from)?;

        let vertices = triangle::triangle_vertices();
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        let vertex_buffer = context.create_buffer(&BufferInfo {
            size: bytes.len() as u64,
            name: "triangle vertices",
        })?;
        if vertex_buffer.size() < bytes.len() as u64 {
            let size = vertex_buffer.size();
            context.destroy_buffer(vertex_buffer);
            return Err(anyhow!("Vertex buffer holds {} bytes, need {}.", size, bytes.len()));
        }
        // SAFETY: the mapping is host-visible, coherent and at least `bytes.len()` long.
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                vertex_buffer.host_address().cast::<u8>(),
                bytes.len(),
            );
        }

        Ok((pipeline, vertex_buffer))
    }

    /// Shuts down, then releases the graphics context itself.
    pub fn destroy(mut self) {
        if let Err(error) = self.shutdown() {
            tracing::error!("Renderer shutdown failed: {}", error);
        }
        let Self { backend, .. } = self;
        // SAFETY: nothing created from the context is still referenced.
        unsafe { backend.destroy() };
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
