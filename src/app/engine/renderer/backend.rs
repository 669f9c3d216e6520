use anyhow::Result;

/// Pixel dimensions of a window or render area.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Result of asking the swapchain for the next presentable image.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AcquireResult<I> {
    Image(I),
    OutOfDate,
    Suboptimal,
    /// No image is available right now; the frame is skipped.
    Empty,
}

/// One color attachment, cleared to `clear_color` when the pass begins.
pub struct RenderPassInfo<'a, I> {
    pub color_attachment: &'a I,
    pub clear_color: [f32; 4],
    pub render_area: Extent,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DrawInfo {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl Default for DrawInfo {
    fn default() -> Self {
        Self {
            vertex_count: 0,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        }
    }
}

pub struct CommandSubmitInfo<'a, C, S> {
    pub command_lists: Vec<C>,
    pub wait_binary_semaphores: &'a [S],
    pub signal_binary_semaphores: &'a [S],
    pub signal_timeline_semaphores: &'a [(S, u64)],
}

pub struct PresentInfo<'a, S> {
    pub wait_binary_semaphores: &'a [S],
}

/// Records commands for one submission.
pub trait CommandRecorder {
    type Image;
    type Pipeline;
    type Commands;

    fn begin_render_pass(&mut self, info: RenderPassInfo<'_, Self::Image>) -> Result<()>;

    fn set_pipeline(&mut self, pipeline: &Self::Pipeline) -> Result<()>;

    /// Pushes `value` at offset zero of the bound pipeline's push-constant range.
    fn push_constant<T: bytemuck::Pod>(&mut self, value: &T) -> Result<()>;

    fn draw(&mut self, info: DrawInfo) -> Result<()>;

    fn end_render_pass(&mut self) -> Result<()>;

    /// Finishes recording and hands back a submittable command list.
    fn complete_current_commands(self) -> Result<Self::Commands>;
}

/// The device, swapchain and allocator operations the frame loop and
/// shutdown sequence depend on.
pub trait GraphicsBackend {
    type Image;
    type Pipeline;
    type Buffer;
    type Semaphore: Copy;
    type Commands;
    type Recorder: CommandRecorder<
            Image = Self::Image,
            Pipeline = Self::Pipeline,
            Commands = Self::Commands,
        >;

    fn acquire_next_image(&mut self) -> Result<AcquireResult<Self::Image>>;

    fn resize(&mut self, size: Extent) -> Result<()>;

    fn create_command_recorder(&mut self) -> Result<Self::Recorder>;

    fn current_acquire_semaphore(&self) -> Self::Semaphore;

    fn current_present_semaphore(&self) -> Self::Semaphore;

    fn current_timeline_pair(&self) -> (Self::Semaphore, u64);

    fn submit_commands(
        &mut self,
        info: CommandSubmitInfo<'_, Self::Commands, Self::Semaphore>,
    ) -> Result<()>;

    fn present_frame(&mut self, info: PresentInfo<'_, Self::Semaphore>) -> Result<()>;

    /// Reclaims resources the device has finished with. Never blocks.
    fn collect_garbage(&mut self) -> Result<()>;

    /// Blocks until all submitted work has completed.
    fn wait_idle(&mut self) -> Result<()>;

    fn buffer_device_address(&self, buffer: &Self::Buffer) -> Result<u64>;

    fn destroy_buffer(&mut self, buffer: Self::Buffer);
}
