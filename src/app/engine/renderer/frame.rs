use anyhow::Result;

use super::backend::{
    AcquireResult, CommandRecorder, CommandSubmitInfo, DrawInfo, Extent, GraphicsBackend,
    PresentInfo, RenderPassInfo,
};

pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

pub const TRIANGLE_VERTEX_COUNT: u32 = 3;

/// Cross-event state carried from one tick to the next.
///
/// A viewport change only marks the swapchain out of date. The flag is cleared
/// by the frame driver once it has resized, so several resize notifications
/// between two ticks collapse into a single resize.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameState {
    pub swapchain_out_of_date: bool,
}

impl FrameState {
    pub fn mark_out_of_date(self) -> Self {
        Self {
            swapchain_out_of_date: true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Acquiring,
    Recording,
    Submitted,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// The swapchain was resized instead of drawing.
    Resized,
    /// No image was available.
    Skipped,
}

/// Everything a tick needs besides the backend.
pub struct FrameInputs<'a, P> {
    pub pipeline: &'a P,
    pub vertex_buffer_address: u64,
    pub window_size: Extent,
}

#[derive(Debug)]
pub struct FrameDriver {
    phase: FramePhase,
    frames_presented: u64,
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDriver {
    pub fn new() -> Self {
        Self {
            phase: FramePhase::Idle,
            frames_presented: 0,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    fn enter(&mut self, phase: FramePhase) {
        tracing::trace!("frame phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Runs one frame pass and returns the state to carry into the next tick.
    pub fn tick<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        state: FrameState,
        inputs: FrameInputs<'_, B::Pipeline>,
    ) -> Result<(FrameState, FrameOutcome)> {
        debug_assert_eq!(self.phase, FramePhase::Idle);
        self.enter(FramePhase::Acquiring);

        let acquired = match backend.acquire_next_image() {
            Ok(acquired) => acquired,
            Err(error) => {
                self.enter(FramePhase::Idle);
                return Err(error);
            }
        };

        let image = match acquired {
            AcquireResult::OutOfDate | AcquireResult::Suboptimal => {
                return self.resize(backend, inputs.window_size);
            }
            _ if state.swapchain_out_of_date => {
                return self.resize(backend, inputs.window_size);
            }
            AcquireResult::Empty => {
                self.enter(FramePhase::Idle);
                return Ok((state, FrameOutcome::Skipped));
            }
            AcquireResult::Image(image) => image,
        };

        // Once recording starts the frame always reaches submission.
        self.enter(FramePhase::Recording);
        let result = self.record_and_submit(backend, &image, &inputs);
        self.enter(FramePhase::Idle);
        result?;

        self.frames_presented += 1;
        Ok((state, FrameOutcome::Presented))
    }

    fn resize<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        window_size: Extent,
    ) -> Result<(FrameState, FrameOutcome)> {
        tracing::trace!(
            "Resizing swapchain to {}x{}.",
            window_size.width,
            window_size.height
        );
        let result = backend.resize(window_size);
        self.enter(FramePhase::Idle);
        result?;
        Ok((FrameState::default(), FrameOutcome::Resized))
    }

    fn record_and_submit<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        image: &B::Image,
        inputs: &FrameInputs<'_, B::Pipeline>,
    ) -> Result<()> {
        let mut recorder = backend.create_command_recorder()?;

        recorder.begin_render_pass(RenderPassInfo {
            color_attachment: image,
            clear_color: CLEAR_COLOR,
            render_area: inputs.window_size,
        })?;
        recorder.set_pipeline(inputs.pipeline)?;
        recorder.push_constant(&inputs.vertex_buffer_address)?;
        recorder.draw(DrawInfo {
            vertex_count: TRIANGLE_VERTEX_COUNT,
            ..Default::default()
        })?;
        recorder.end_render_pass()?;

        let commands = recorder.complete_current_commands()?;

        let acquire_semaphore = backend.current_acquire_semaphore();
        let present_semaphore = backend.current_present_semaphore();
        let timeline_pair = backend.current_timeline_pair();
        backend.submit_commands(CommandSubmitInfo {
            command_lists: vec![commands],
            wait_binary_semaphores: &[acquire_semaphore],
            signal_binary_semaphores: &[present_semaphore],
            signal_timeline_semaphores: &[timeline_pair],
        })?;
        backend.present_frame(PresentInfo {
            wait_binary_semaphores: &[present_semaphore],
        })?;
        self.enter(FramePhase::Submitted);

        backend.collect_garbage()
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
