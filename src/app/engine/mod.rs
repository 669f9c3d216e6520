use anyhow::Result;
use renderer::Renderer;
use renderer::backend::Extent;
use renderer::context::Context;
use std::sync::Arc;
use timeline::Timeline;
use winit::dpi::LogicalSize;
use winit::{
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

use crate::config::AppConfig;

pub mod renderer;
mod timeline;

/// One window and the renderer drawing into it.
pub struct Engine {
    window: Arc<Window>,
    renderer: Option<Renderer<Context>>,
    timeline: Timeline,
}

impl Engine {
    pub fn new(event_loop: &ActiveEventLoop, config: &AppConfig) -> Result<Self> {
        let attributes = Window::default_attributes()
            .with_title(config.window.title.as_str())
            .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
            .with_resizable(config.window.resizable);
        let window = Arc::new(event_loop.create_window(attributes)?);

        let renderer = Renderer::new(&window, &config.renderer)?;
        let mut timeline = Timeline::default();
        timeline.start();

        Ok(Self {
            window,
            renderer: Some(renderer),
            timeline,
        })
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn tick(&mut self) -> Result<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        let size = self.window.inner_size();
        renderer.tick(Extent::new(size.width, size.height))?;

        self.timeline.next_frame();
        tracing::trace!(
            "frame {} took {:?}",
            self.timeline.frame_count(),
            self.timeline.previous_frame_duration()
        );
        Ok(())
    }

    pub fn window_event(&mut self, event: &WindowEvent) {
        if let WindowEvent::Resized(size) = event {
            tracing::trace!("Window resized to {}x{}.", size.width, size.height);
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.viewport_changed();
            }
        }
    }

    /// Releases every GPU resource. Later ticks do nothing.
    pub fn exit(&mut self) {
        if let Some(renderer) = self.renderer.take() {
            tracing::info!("Presented {} frames.", renderer.frames_presented());
            renderer.destroy();
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.exit();
    }
}
