mod engine;
use crate::app::engine::Engine;
use crate::app::engine::renderer::error::SetupError;
use crate::config::AppConfig;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow},
    window::WindowId,
};

pub struct App {
    config: AppConfig,
    engine: Option<Engine>,
    closing: bool,
    exit_code: Option<i32>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            engine: None,
            closing: false,
            exit_code: None,
        }
    }

    /// Set when the application stopped because of a fatal error.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{:#}", error);
        self.exit_code = Some(SetupError::exit_code_of(&error));
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.closing = true;
        if let Some(mut engine) = self.engine.take() {
            engine.exit();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_some() || self.closing {
            return;
        }
        event_loop.set_control_flow(ControlFlow::Poll);

        match Engine::new(event_loop, &self.config) {
            Ok(engine) => self.engine = Some(engine),
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if engine.window_id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            event => engine.window_event(&event),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.closing {
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if let Err(error) = engine.tick() {
            self.fail(event_loop, error);
        }
    }

    fn suspended(&mut self, event_loop: &ActiveEventLoop) {
        self.shutdown(event_loop);
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut engine) = self.engine.take() {
            engine.exit();
        }
    }
}
