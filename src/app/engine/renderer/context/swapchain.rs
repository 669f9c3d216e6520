use anyhow::{Result, anyhow};
use vulkanalia::prelude::v1_3::*;
use vulkanalia::vk::{KhrSurfaceExtension, KhrSwapchainExtension};

use crate::app::engine::renderer::backend::{AcquireResult, Extent};

const ACQUIRE_TIMEOUT_NS: u64 = 1_000_000_000;

/// Score used when nothing overrides it. Higher wins; zero means "acceptable".
pub fn default_format_score(format: vk::Format) -> i32 {
    match format {
        vk::Format::B8G8R8A8_UNORM => 90,
        vk::Format::R8G8B8A8_UNORM => 80,
        vk::Format::B8G8R8A8_SRGB => 70,
        vk::Format::R8G8B8A8_SRGB => 60,
        _ => 0,
    }
}

/// Prefers R8G8B8A8_UNORM over everything the default scorer ranks.
pub fn preferred_format_score(format: vk::Format) -> i32 {
    match format {
        vk::Format::R8G8B8A8_UNORM => 100,
        _ => default_format_score(format),
    }
}

/// Highest scoring format; ties keep the first one offered.
pub fn select_surface_format(
    formats: &[vk::SurfaceFormatKHR],
    score: impl Fn(vk::Format) -> i32,
) -> Option<vk::SurfaceFormatKHR> {
    let mut best: Option<(i32, vk::SurfaceFormatKHR)> = None;
    for format in formats {
        let candidate = score(format.format);
        if best.is_none_or(|(best_score, _)| candidate > best_score) {
            best = Some((candidate, *format));
        }
    }
    best.map(|(_, format)| format)
}

pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, size: Extent) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    vk::Extent2D {
        width: size.width.clamp(min.width, max.width),
        height: size.height.clamp(min.height, max.height),
    }
}

pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count != 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

fn choose_composite_alpha(supported: vk::CompositeAlphaFlagsKHR) -> vk::CompositeAlphaFlagsKHR {
    [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::INHERIT,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
    ]
    .into_iter()
    .find(|mode| supported.contains(*mode))
    .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

/// Frames-in-flight accounting against the swapchain timeline semaphore.
///
/// Only submitted frames count: a frame that was acquired but then skipped
/// never signals the timeline, so it must not advance the counter either.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameCounter {
    submitted: u64,
    frames_in_flight: u64,
}

impl FrameCounter {
    pub fn new(frames_in_flight: u32) -> Self {
        Self {
            submitted: 0,
            frames_in_flight: u64::from(frames_in_flight.max(1)),
        }
    }

    /// Timeline value the next submission signals.
    pub fn next_frame(&self) -> u64 {
        self.submitted + 1
    }

    /// Timeline value to wait for before the next frame may be recorded.
    /// Never exceeds the number of submitted frames.
    pub fn wait_target(&self) -> Option<u64> {
        self.next_frame()
            .checked_sub(self.frames_in_flight)
            .filter(|target| *target > 0)
    }

    /// Per-frame resource slot of the next frame.
    pub fn slot(&self) -> usize {
        (self.next_frame() % self.frames_in_flight) as usize
    }

    pub fn frames_in_flight(&self) -> u64 {
        self.frames_in_flight
    }

    pub fn submitted(&mut self) {
        self.submitted += 1;
    }
}

#[derive(Copy, Clone, Debug)]
pub struct SwapchainImage {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub extent: vk::Extent2D,
}

pub struct Swapchain {
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    handle: vk::SwapchainKHR,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    /// One per frame in flight, indexed by the CPU frame value.
    acquire_semaphores: Vec<vk::Semaphore>,
    /// One per swapchain image.
    present_semaphores: Vec<vk::Semaphore>,
    gpu_timeline: vk::Semaphore,
    frames: FrameCounter,
    current_image: u32,
    minimized: bool,
    stale: bool,
}

impl Swapchain {
    pub unsafe fn create(
        instance: &Instance,
        device: &Device,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        size: Extent,
        frames_in_flight: u32,
    ) -> Result<Self> {
        let formats = instance.get_physical_device_surface_formats_khr(physical_device, surface)?;
        let format = select_surface_format(&formats, preferred_format_score)
            .ok_or_else(|| anyhow!("Surface reports no formats."))?;

        let mut timeline_info = vk::SemaphoreTypeCreateInfo::builder()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(0);
        let info = vk::SemaphoreCreateInfo::builder().push_next(&mut timeline_info);
        let gpu_timeline = device.create_semaphore(&info, None)?;

        let mut swapchain = Self {
            physical_device,
            surface,
            handle: vk::SwapchainKHR::null(),
            format,
            extent: vk::Extent2D::default(),
            images: Vec::new(),
            views: Vec::new(),
            acquire_semaphores: Vec::new(),
            present_semaphores: Vec::new(),
            gpu_timeline,
            frames: FrameCounter::new(frames_in_flight),
            current_image: 0,
            minimized: false,
            stale: false,
        };
        if let Err(error) = swapchain.build(instance, device, size) {
            swapchain.destroy(device);
            return Err(error);
        }

        tracing::info!(
            "Created swapchain ({:?}, {}x{}, {} images).",
            swapchain.format.format,
            swapchain.extent.width,
            swapchain.extent.height,
            swapchain.images.len()
        );
        Ok(swapchain)
    }

    pub fn format(&self) -> vk::Format {
        self.format.format
    }

    unsafe fn build(&mut self, instance: &Instance, device: &Device, size: Extent) -> Result<()> {
        let capabilities = instance
            .get_physical_device_surface_capabilities_khr(self.physical_device, self.surface)?;
        let extent = choose_extent(&capabilities, size);
        if extent.width == 0 || extent.height == 0 {
            self.minimized = true;
            return Ok(());
        }

        let info = vk::SwapchainCreateInfoKHR::builder()
            .surface(self.surface)
            .min_image_count(choose_image_count(&capabilities))
            .image_format(self.format.format)
            .image_color_space(self.format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(choose_composite_alpha(capabilities.supported_composite_alpha))
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true)
            .old_swapchain(self.handle);

        let handle = device.create_swapchain_khr(&info, None)?;
        self.destroy_image_resources(device);
        if !self.handle.is_null() {
            device.destroy_swapchain_khr(self.handle, None);
        }

        self.handle = handle;
        self.extent = extent;
        self.images = device.get_swapchain_images_khr(handle)?;
        self.views = self
            .images
            .iter()
            .map(|image| {
                let subresource_range = vk::ImageSubresourceRange::builder()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1);
                let info = vk::ImageViewCreateInfo::builder()
                    .image(*image)
                    .view_type(vk::ImageViewType::_2D)
                    .format(self.format.format)
                    .subresource_range(subresource_range);
                device.create_image_view(&info, None)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        self.acquire_semaphores = (0..self.frames.frames_in_flight())
            .map(|_| device.create_semaphore(&semaphore_info, None))
            .collect::<Result<Vec<_>, _>>()?;
        self.present_semaphores = (0..self.images.len())
            .map(|_| device.create_semaphore(&semaphore_info, None))
            .collect::<Result<Vec<_>, _>>()?;

        self.minimized = false;
        self.stale = false;
        Ok(())
    }

    /// Recreates every size-dependent resource. Waits for the device first.
    pub unsafe fn resize(&mut self, instance: &Instance, device: &Device, size: Extent) -> Result<()> {
        device.device_wait_idle()?;
        self.build(instance, device, size)?;
        tracing::trace!(
            "Swapchain resized to {}x{} (minimized: {}).",
            self.extent.width,
            self.extent.height,
            self.minimized
        );
        Ok(())
    }

    pub unsafe fn acquire_next_image(
        &mut self,
        device: &Device,
    ) -> Result<AcquireResult<SwapchainImage>> {
        if self.minimized || self.handle.is_null() {
            return Ok(AcquireResult::Empty);
        }
        if self.stale {
            return Ok(AcquireResult::OutOfDate);
        }

        // Throttle the CPU to `frames_in_flight` frames ahead of the GPU.
        if let Some(target) = self.frames.wait_target() {
            let semaphores = [self.gpu_timeline];
            let values = [target];
            let info = vk::SemaphoreWaitInfo::builder()
                .semaphores(&semaphores)
                .values(&values);
            device.wait_semaphores(&info, u64::MAX)?;
        }

        let semaphore = self.acquire_semaphores[self.frames.slot()];
        match device.acquire_next_image_khr(
            self.handle,
            ACQUIRE_TIMEOUT_NS,
            semaphore,
            vk::Fence::null(),
        ) {
            Ok((_, vk::SuccessCode::SUBOPTIMAL_KHR)) => Ok(AcquireResult::Suboptimal),
            Ok((_, vk::SuccessCode::TIMEOUT | vk::SuccessCode::NOT_READY)) => {
                Ok(AcquireResult::Empty)
            }
            Ok((index, _)) => {
                self.current_image = index;
                Ok(AcquireResult::Image(SwapchainImage {
                    image: self.images[index as usize],
                    view: self.views[index as usize],
                    extent: self.extent,
                }))
            }
            Err(vk::ErrorCode::OUT_OF_DATE_KHR) => Ok(AcquireResult::OutOfDate),
            Err(error) => Err(anyhow!(error)),
        }
    }

    pub fn current_acquire_semaphore(&self) -> vk::Semaphore {
        self.acquire_semaphores[self.frames.slot()]
    }

    pub fn current_present_semaphore(&self) -> vk::Semaphore {
        self.present_semaphores[self.current_image as usize]
    }

    pub fn current_timeline_pair(&self) -> (vk::Semaphore, u64) {
        (self.gpu_timeline, self.frames.next_frame())
    }

    /// Called once a submission signalling `current_timeline_pair` was queued.
    pub fn frame_submitted(&mut self) {
        self.frames.submitted();
    }

    pub fn timeline_semaphore(&self) -> vk::Semaphore {
        self.gpu_timeline
    }

    /// Presents the last acquired image. A suboptimal or out-of-date result
    /// makes the next acquisition report out-of-date.
    pub unsafe fn present(
        &mut self,
        device: &Device,
        queue: vk::Queue,
        wait_semaphores: &[vk::Semaphore],
    ) -> Result<()> {
        let swapchains = [self.handle];
        let image_indices = [self.current_image];
        let info = vk::PresentInfoKHR::builder()
            .wait_semaphores(wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match device.queue_present_khr(queue, &info) {
            Ok(vk::SuccessCode::SUBOPTIMAL_KHR) | Err(vk::ErrorCode::OUT_OF_DATE_KHR) => {
                self.stale = true;
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(error) => Err(anyhow!(error)),
        }
    }

    unsafe fn destroy_image_resources(&mut self, device: &Device) {
        for view in self.views.drain(..) {
            device.destroy_image_view(view, None);
        }
        for semaphore in self
            .acquire_semaphores
            .drain(..)
            .chain(self.present_semaphores.drain(..))
        {
            device.destroy_semaphore(semaphore, None);
        }
        self.images.clear();
    }

    /// Device must be idle.
    pub unsafe fn destroy(&mut self, device: &Device) {
        self.destroy_image_resources(device);
        if !self.handle.is_null() {
            device.destroy_swapchain_khr(self.handle, None);
            self.handle = vk::SwapchainKHR::null();
        }
        device.destroy_semaphore(self.gpu_timeline, None);
    }
}

#[cfg(test)]
#[path = "swapchain_tests.rs"]
mod tests;
