//! Recording backend for unit tests (no GPU required).

use anyhow::{Result, anyhow};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::backend::{
    AcquireResult, CommandRecorder, CommandSubmitInfo, DrawInfo, Extent, GraphicsBackend,
    PresentInfo, RenderPassInfo,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Acquire,
    Resize(Extent),
    CreateRecorder,
    BeginRenderPass {
        image: u32,
        clear_color: [f32; 4],
        render_area: Extent,
    },
    SetPipeline(&'static str),
    PushConstant(Vec<u8>),
    Draw(DrawInfo),
    EndRenderPass,
    Complete,
    /// A recorder was dropped without completing its commands.
    DiscardCommands,
    Submit {
        wait_binary: Vec<u32>,
        signal_binary: Vec<u32>,
        signal_timeline: Vec<(u32, u64)>,
    },
    Present {
        wait_binary: Vec<u32>,
    },
    CollectGarbage,
    WaitIdle,
    DestroyBuffer(u64),
    ReleasePipeline(&'static str),
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MockImage(pub u32);

/// Logs its release so tests can check teardown ordering.
#[derive(Debug)]
pub struct MockPipeline {
    pub name: &'static str,
    log: CallLog,
}

impl MockPipeline {
    pub fn new(name: &'static str, log: CallLog) -> Self {
        Self { name, log }
    }
}

impl Drop for MockPipeline {
    fn drop(&mut self) {
        self.log.borrow_mut().push(Call::ReleasePipeline(self.name));
    }
}

#[derive(Debug)]
pub struct MockBuffer {
    pub address: u64,
}

pub struct MockRecorder {
    log: CallLog,
    fail_draw: bool,
    completed: bool,
}

impl Drop for MockRecorder {
    fn drop(&mut self) {
        if !self.completed {
            self.log.borrow_mut().push(Call::DiscardCommands);
        }
    }
}

impl CommandRecorder for MockRecorder {
    type Image = MockImage;
    type Pipeline = MockPipeline;
    type Commands = ();

    fn begin_render_pass(&mut self, info: RenderPassInfo<'_, MockImage>) -> Result<()> {
        self.log.borrow_mut().push(Call::BeginRenderPass {
            image: info.color_attachment.0,
            clear_color: info.clear_color,
            render_area: info.render_area,
        });
        Ok(())
    }

    fn set_pipeline(&mut self, pipeline: &MockPipeline) -> Result<()> {
        self.log.borrow_mut().push(Call::SetPipeline(pipeline.name));
        Ok(())
    }

    fn push_constant<T: bytemuck::Pod>(&mut self, value: &T) -> Result<()> {
        self.log
            .borrow_mut()
            .push(Call::PushConstant(bytemuck::bytes_of(value).to_vec()));
        Ok(())
    }

    fn draw(&mut self, info: DrawInfo) -> Result<()> {
        if self.fail_draw {
            return Err(anyhow!("out of device memory"));
        }
        self.log.borrow_mut().push(Call::Draw(info));
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.log.borrow_mut().push(Call::EndRenderPass);
        Ok(())
    }

    fn complete_current_commands(mut self) -> Result<()> {
        self.completed = true;
        self.log.borrow_mut().push(Call::Complete);
        Ok(())
    }
}

pub struct MockBackend {
    pub log: CallLog,
    /// Scripted acquisition results; an empty script yields image 0.
    pub acquire_script: VecDeque<AcquireResult<MockImage>>,
    pub fail_acquire: bool,
    pub fail_draw: bool,
    pub size: Extent,
    pub resize_count: u32,
    /// Frames submitted with the swapchain timeline pair.
    pub frame: u64,
}

impl MockBackend {
    pub fn new(size: Extent) -> Self {
        Self {
            log: CallLog::default(),
            acquire_script: VecDeque::new(),
            fail_acquire: false,
            fail_draw: false,
            size,
            resize_count: 0,
            frame: 0,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.log.borrow().iter().filter(|call| matches(call)).count()
    }

    pub fn draw_count(&self) -> usize {
        self.count(|call| matches!(call, Call::Draw(_)))
    }

    pub fn submit_count(&self) -> usize {
        self.count(|call| matches!(call, Call::Submit { .. }))
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.log.borrow().iter().position(|logged| logged == call)
    }
}

const ACQUIRE_SEMAPHORE: u32 = 10;
const PRESENT_SEMAPHORE: u32 = 20;
const TIMELINE_SEMAPHORE: u32 = 30;

impl GraphicsBackend for MockBackend {
    type Image = MockImage;
    type Pipeline = MockPipeline;
    type Buffer = MockBuffer;
    type Semaphore = u32;
    type Commands = ();
    type Recorder = MockRecorder;

    fn acquire_next_image(&mut self) -> Result<AcquireResult<MockImage>> {
        self.log.borrow_mut().push(Call::Acquire);
        if self.fail_acquire {
            return Err(anyhow!("device lost"));
        }
        Ok(self
            .acquire_script
            .pop_front()
            .unwrap_or(AcquireResult::Image(MockImage(0))))
    }

    fn resize(&mut self, size: Extent) -> Result<()> {
        self.log.borrow_mut().push(Call::Resize(size));
        self.size = size;
        self.resize_count += 1;
        Ok(())
    }

    fn create_command_recorder(&mut self) -> Result<MockRecorder> {
        self.log.borrow_mut().push(Call::CreateRecorder);
        Ok(MockRecorder {
            log: self.log.clone(),
            fail_draw: self.fail_draw,
            completed: false,
        })
    }

    fn current_acquire_semaphore(&self) -> u32 {
        ACQUIRE_SEMAPHORE
    }

    fn current_present_semaphore(&self) -> u32 {
        PRESENT_SEMAPHORE
    }

    fn current_timeline_pair(&self) -> (u32, u64) {
        (TIMELINE_SEMAPHORE, self.frame + 1)
    }

    fn submit_commands(&mut self, info: CommandSubmitInfo<'_, (), u32>) -> Result<()> {
        self.log.borrow_mut().push(Call::Submit {
            wait_binary: info.wait_binary_semaphores.to_vec(),
            signal_binary: info.signal_binary_semaphores.to_vec(),
            signal_timeline: info.signal_timeline_semaphores.to_vec(),
        });
        if info
            .signal_timeline_semaphores
            .iter()
            .any(|(semaphore, _)| *semaphore == TIMELINE_SEMAPHORE)
        {
            self.frame += 1;
        }
        Ok(())
    }

    fn present_frame(&mut self, info: PresentInfo<'_, u32>) -> Result<()> {
        self.log.borrow_mut().push(Call::Present {
            wait_binary: info.wait_binary_semaphores.to_vec(),
        });
        Ok(())
    }

    fn collect_garbage(&mut self) -> Result<()> {
        self.log.borrow_mut().push(Call::CollectGarbage);
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.log.borrow_mut().push(Call::WaitIdle);
        Ok(())
    }

    fn buffer_device_address(&self, buffer: &MockBuffer) -> Result<u64> {
        Ok(buffer.address)
    }

    fn destroy_buffer(&mut self, buffer: MockBuffer) {
        self.log
            .borrow_mut()
            .push(Call::DestroyBuffer(buffer.address));
    }
}

pub const SEMAPHORES: (u32, u32, u32) = (ACQUIRE_SEMAPHORE, PRESENT_SEMAPHORE, TIMELINE_SEMAPHORE);
