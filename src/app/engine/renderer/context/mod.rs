use anyhow::{Result, anyhow};
use std::collections::HashSet;
use std::ffi::CStr;
use std::os::raw::c_void;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;
use vulkanalia::Version;
use vulkanalia::loader::{LIBRARY, LibloadingLoader};
use vulkanalia::prelude::v1_3::*;
use vulkanalia::vk::{
    ExtDebugUtilsExtension, KhrSurfaceExtension, KhrWaylandSurfaceExtension,
    KhrWin32SurfaceExtension, KhrXlibSurfaceExtension,
};

use super::backend::{AcquireResult, CommandSubmitInfo, Extent, GraphicsBackend, PresentInfo};
use super::error::SetupError;
use super::native::NativeWindowHandle;
use crate::config::RendererConfig;
use garbage::GarbageQueue;
use recorder::VulkanRecorder;
use swapchain::Swapchain;

mod buffer;
mod garbage;
mod pipeline;
mod recorder;
mod swapchain;

pub use buffer::{Buffer, BufferInfo};
pub use pipeline::{
    PipelineError, PipelineManager, RasterPipeline, RasterPipelineInfo, ShaderCompileOptions,
};
pub use swapchain::SwapchainImage;

/// Owns the instance, device, swapchain and everything created from them.
pub struct Context {
    pub entry: Entry,
    pub instance: Instance,
    pub data: AppData,
    pub device: Rc<Device>,
    swapchain: Swapchain,
    pipeline_manager: PipelineManager,
    garbage: GarbageQueue<Zombie>,
}

pub struct AppData {
    pub messenger: vk::DebugUtilsMessengerEXT,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
    graphics_family: u32,
    graphics_queue: vk::Queue,
    command_pool: vk::CommandPool,
    /// Signalled with `submit_index` by every submission.
    submit_timeline: vk::Semaphore,
    submit_index: u64,
    validation: bool,
}

/// A resource retired while the device may still be using it.
#[derive(Debug)]
enum Zombie {
    CommandBuffer(vk::CommandBuffer),
    Buffer(vk::Buffer, vk::DeviceMemory),
    Pipeline(vk::Pipeline, vk::PipelineLayout),
}

const VALIDATION_LAYER: vk::ExtensionName =
    vk::ExtensionName::from_bytes(b"VK_LAYER_KHRONOS_validation");

const PORTABILITY_MACOS_VERSION: Version = Version::new(1, 3, 216);

/// Ranking among suitable devices; the highest wins.
pub fn device_type_score(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 10_000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 1_000,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 100,
        vk::PhysicalDeviceType::CPU => 10,
        _ => 1,
    }
}

impl Context {
    pub unsafe fn create(
        native_window: &NativeWindowHandle,
        size: Extent,
        config: &RendererConfig,
    ) -> Result<Self> {
        let Some(surface_extension) = native_window.platform().surface_extension() else {
            return Err(SetupError::UnsupportedPlatform.into());
        };

        let loader = LibloadingLoader::new(LIBRARY)?;
        let mut data = AppData {
            messenger: vk::DebugUtilsMessengerEXT::null(),
            surface: vk::SurfaceKHR::null(),
            physical_device: vk::PhysicalDevice::null(),
            graphics_family: 0,
            graphics_queue: vk::Queue::null(),
            command_pool: vk::CommandPool::null(),
            submit_timeline: vk::Semaphore::null(),
            submit_index: 0,
            validation: config.validation,
        };
        let entry = Entry::new(loader).map_err(|e| anyhow!("{}", e))?;
        let instance = Self::create_instance(&entry, surface_extension, &mut data)?;

        let (device, swapchain, pipeline_manager) = match Self::create_device_objects(
            &entry,
            &instance,
            native_window,
            size,
            config,
            &mut data,
        ) {
            Ok(objects) => objects,
            Err(error) => {
                Self::destroy_instance_objects(&instance, &data);
                return Err(error);
            }
        };

        Ok(Self {
            entry,
            instance,
            data,
            device,
            swapchain,
            pipeline_manager,
            garbage: GarbageQueue::new(),
        })
    }

    /// Creates everything between the instance and the frame loop. On error,
    /// whatever was created here is destroyed again.
    unsafe fn create_device_objects(
        entry: &Entry,
        instance: &Instance,
        native_window: &NativeWindowHandle,
        size: Extent,
        config: &RendererConfig,
        data: &mut AppData,
    ) -> Result<(Rc<Device>, Swapchain, PipelineManager)> {
        data.surface = Self::create_surface(instance, native_window)?;
        Self::pick_physical_device(instance, data)?;

        let device = Rc::new(Self::create_logical_device(entry, instance, data)?);
        match Self::create_frame_objects(instance, &device, size, config, data) {
            Ok((swapchain, pipeline_manager)) => Ok((device, swapchain, pipeline_manager)),
            Err(error) => {
                if !data.submit_timeline.is_null() {
                    device.destroy_semaphore(data.submit_timeline, None);
                }
                if !data.command_pool.is_null() {
                    device.destroy_command_pool(data.command_pool, None);
                }
                device.destroy_device(None);
                Err(error)
            }
        }
    }

    unsafe fn create_frame_objects(
        instance: &Instance,
        device: &Rc<Device>,
        size: Extent,
        config: &RendererConfig,
        data: &mut AppData,
    ) -> Result<(Swapchain, PipelineManager)> {
        let pool_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::TRANSIENT)
            .queue_family_index(data.graphics_family);
        data.command_pool = device.create_command_pool(&pool_info, None)?;

        let mut timeline_info = vk::SemaphoreTypeCreateInfo::builder()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(0);
        let semaphore_info = vk::SemaphoreCreateInfo::builder().push_next(&mut timeline_info);
        data.submit_timeline = device.create_semaphore(&semaphore_info, None)?;

        let pipeline_manager = PipelineManager::new(
            device.clone(),
            ShaderCompileOptions {
                root_paths: config.shader_include_dirs.clone(),
                enable_debug_info: config.shader_debug_info,
            },
            "triangle pipeline manager",
        )
        .map_err(SetupError::from)?;

        // Destroys its own partial state on failure.
        let swapchain = Swapchain::create(
            instance,
            device,
            data.physical_device,
            data.surface,
            size,
            config.frames_in_flight,
        )?;

        Ok((swapchain, pipeline_manager))
    }

    /// Surface, messenger and instance; the device must already be gone.
    unsafe fn destroy_instance_objects(instance: &Instance, data: &AppData) {
        if !data.surface.is_null() {
            instance.destroy_surface_khr(data.surface, None);
        }
        if !data.messenger.is_null() {
            instance.destroy_debug_utils_messenger_ext(data.messenger, None);
        }
        instance.destroy_instance(None);
    }

    unsafe fn create_instance(
        entry: &Entry,
        surface_extension: vk::ExtensionName,
        data: &mut AppData,
    ) -> Result<Instance> {
        let app_info = vk::ApplicationInfo::builder()
            .application_name(b"Vulkan Triangle\0")
            .application_version(vk::make_version(1, 0, 0))
            .engine_name(b"No Engine\0")
            .engine_version(vk::make_version(1, 0, 0))
            .api_version(vk::make_version(1, 3, 0));

        let available_layers = entry
            .enumerate_instance_layer_properties()?
            .iter()
            .map(|l| l.layer_name)
            .collect::<HashSet<_>>();

        tracing::debug!("Available layers:");
        for layer in &available_layers {
            let name = unsafe { CStr::from_ptr(layer.as_ptr()) };
            tracing::debug!("  {}", name.to_string_lossy());
        }

        if data.validation && !available_layers.contains(&VALIDATION_LAYER) {
            tracing::warn!("Validation layer requested but not supported; continuing without it.");
            data.validation = false;
        }

        let layers = if data.validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            Vec::new()
        };

        let mut extensions = vec![
            vk::KHR_SURFACE_EXTENSION.name.as_ptr(),
            surface_extension.as_ptr(),
        ];

        if data.validation {
            extensions.push(vk::EXT_DEBUG_UTILS_EXTENSION.name.as_ptr());
        }

        // Enable portability extensions for MoltenVK on macOS
        let flags = if cfg!(target_os = "macos") && entry.version()? >= PORTABILITY_MACOS_VERSION {
            extensions.push(
                vk::KHR_GET_PHYSICAL_DEVICE_PROPERTIES2_EXTENSION
                    .name
                    .as_ptr(),
            );
            extensions.push(vk::KHR_PORTABILITY_ENUMERATION_EXTENSION.name.as_ptr());
            vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        } else {
            vk::InstanceCreateFlags::empty()
        };

        let mut info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions)
            .flags(flags);

        let mut debug_info = Self::debug_messenger_info();
        if data.validation {
            info = info.push_next(&mut debug_info);
        }

        let instance = entry.create_instance(&info, None)?;

        if data.validation {
            let debug_info = Self::debug_messenger_info();
            match instance.create_debug_utils_messenger_ext(&debug_info, None) {
                Ok(messenger) => data.messenger = messenger,
                Err(error) => {
                    instance.destroy_instance(None);
                    return Err(error.into());
                }
            }
        }

        Ok(instance)
    }

    fn debug_messenger_info() -> vk::DebugUtilsMessengerCreateInfoEXTBuilder<'static> {
        vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(vk::DebugUtilsMessageSeverityFlagsEXT::all())
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .user_callback(Some(Self::debug_callback))
    }

    pub extern "system" fn debug_callback(
        severity: vk::DebugUtilsMessageSeverityFlagsEXT,
        type_: vk::DebugUtilsMessageTypeFlagsEXT,
        data: *const vk::DebugUtilsMessengerCallbackDataEXT,
        _: *mut c_void,
    ) -> vk::Bool32 {
        let data = unsafe { *data };
        let message = unsafe { CStr::from_ptr(data.message) }.to_string_lossy();

        if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
            tracing::error!("({:?}) {}", type_, message);
        } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
            tracing::warn!("({:?}) {}", type_, message);
        } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::INFO {
            tracing::debug!("({:?}) {}", type_, message);
        } else {
            tracing::trace!("({:?}) {}", type_, message);
        }

        vk::FALSE
    }

    unsafe fn create_surface(
        instance: &Instance,
        native_window: &NativeWindowHandle,
    ) -> Result<vk::SurfaceKHR> {
        let surface = match *native_window {
            NativeWindowHandle::Win32 { hinstance, hwnd } => {
                let info = vk::Win32SurfaceCreateInfoKHR::builder()
                    .hinstance(hinstance as _)
                    .hwnd(hwnd as _);
                instance.create_win32_surface_khr(&info, None)?
            }
            NativeWindowHandle::Xlib { display, window } => {
                let info = vk::XlibSurfaceCreateInfoKHR::builder()
                    .dpy(unsafe { &mut *display.cast::<vk::Display>() })
                    .window(window as _);
                instance.create_xlib_surface_khr(&info, None)?
            }
            NativeWindowHandle::Wayland { display, surface } => {
                let info = vk::WaylandSurfaceCreateInfoKHR::builder()
                    .display(display.cast())
                    .surface(surface.cast());
                instance.create_wayland_surface_khr(&info, None)?
            }
            NativeWindowHandle::Unknown => return Err(SetupError::UnsupportedPlatform.into()),
        };
        Ok(surface)
    }

    unsafe fn check_physical_device(
        instance: &Instance,
        data: &AppData,
        physical_device: vk::PhysicalDevice,
    ) -> Result<QueueFamilyIndices> {
        let properties = instance.get_physical_device_properties(physical_device);
        if properties.api_version < vk::make_version(1, 3, 0) {
            return Err(anyhow!(SuitabilityError("Vulkan 1.3 support")));
        }

        let indices = QueueFamilyIndices::get(instance, data, physical_device)?;

        let extensions = instance
            .enumerate_device_extension_properties(physical_device, None)?
            .iter()
            .map(|e| e.extension_name)
            .collect::<HashSet<_>>();
        if !extensions.contains(&vk::KHR_SWAPCHAIN_EXTENSION.name) {
            return Err(anyhow!(SuitabilityError("VK_KHR_swapchain")));
        }

        let mut features12 = vk::PhysicalDeviceVulkan12Features::builder();
        let mut features13 = vk::PhysicalDeviceVulkan13Features::builder();
        let mut features = vk::PhysicalDeviceFeatures2::builder()
            .push_next(&mut features12)
            .push_next(&mut features13);
        instance.get_physical_device_features2(physical_device, &mut features);

        let required = [
            (features12.buffer_device_address, "bufferDeviceAddress"),
            (features12.scalar_block_layout, "scalarBlockLayout"),
            (features12.timeline_semaphore, "timelineSemaphore"),
            (features13.dynamic_rendering, "dynamicRendering"),
            (features13.synchronization2, "synchronization2"),
        ];
        if let Some((_, name)) = required.iter().find(|(supported, _)| *supported != vk::TRUE) {
            return Err(anyhow!(SuitabilityError(*name)));
        }

        if instance
            .get_physical_device_surface_formats_khr(physical_device, data.surface)?
            .is_empty()
        {
            return Err(anyhow!(SuitabilityError("surface formats")));
        }

        Ok(indices)
    }

    unsafe fn pick_physical_device(instance: &Instance, data: &mut AppData) -> Result<()> {
        let mut best: Option<(u32, vk::PhysicalDevice, QueueFamilyIndices)> = None;

        for physical_device in instance.enumerate_physical_devices()? {
            let properties = instance.get_physical_device_properties(physical_device);

            match Self::check_physical_device(instance, data, physical_device) {
                Err(error) => {
                    tracing::warn!(
                        "Skipping physical device (`{}`): {}",
                        properties.device_name,
                        error
                    );
                }
                Ok(indices) => {
                    let score = device_type_score(properties.device_type);
                    tracing::debug!(
                        "Physical device (`{}`) scored {}.",
                        properties.device_name,
                        score
                    );
                    if best.is_none_or(|(best_score, ..)| score > best_score) {
                        best = Some((score, physical_device, indices));
                    }
                }
            }
        }

        let Some((_, physical_device, indices)) = best else {
            return Err(SetupError::NoPhysicalDevice.into());
        };

        let properties = instance.get_physical_device_properties(physical_device);
        tracing::info!("Selected physical device (`{}`).", properties.device_name);
        data.physical_device = physical_device;
        data.graphics_family = indices.graphics;
        Ok(())
    }

    unsafe fn create_logical_device(
        entry: &Entry,
        instance: &Instance,
        data: &mut AppData,
    ) -> Result<Device> {
        let queue_priorities = &[1.0];
        let queue_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(data.graphics_family)
            .queue_priorities(queue_priorities);

        let layers = if data.validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let mut extensions = vec![vk::KHR_SWAPCHAIN_EXTENSION.name.as_ptr()];

        // Required by Vulkan SDK on macOS since 1.3.216.
        if cfg!(target_os = "macos") && entry.version()? >= PORTABILITY_MACOS_VERSION {
            extensions.push(vk::KHR_PORTABILITY_SUBSET_EXTENSION.name.as_ptr());
        }
        let features = vk::PhysicalDeviceFeatures::builder();
        let mut features12 = vk::PhysicalDeviceVulkan12Features::builder()
            .buffer_device_address(true)
            .scalar_block_layout(true)
            .timeline_semaphore(true);
        let mut features13 = vk::PhysicalDeviceVulkan13Features::builder()
            .dynamic_rendering(true)
            .synchronization2(true);

        let queue_infos = &[queue_info];
        let info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(queue_infos)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions)
            .enabled_features(&features)
            .push_next(&mut features12)
            .push_next(&mut features13);

        let device = instance.create_device(data.physical_device, &info, None)?;
        data.graphics_queue = device.get_device_queue(data.graphics_family, 0);
        Ok(device)
    }

    pub fn swapchain_format(&self) -> vk::Format {
        self.swapchain.format()
    }

    pub fn add_raster_pipeline(
        &mut self,
        info: RasterPipelineInfo<'_>,
    ) -> Result<Arc<RasterPipeline>, PipelineError> {
        self.pipeline_manager.add_raster_pipeline(info)
    }

    pub fn create_buffer(&mut self, info: &BufferInfo<'_>) -> Result<Buffer> {
        unsafe {
            Buffer::create(
                &self.instance,
                &self.device,
                self.data.physical_device,
                info,
            )
        }
    }

    unsafe fn destroy_zombie(&self, zombie: Zombie) {
        match zombie {
            Zombie::CommandBuffer(command_buffer) => {
                self.device
                    .free_command_buffers(self.data.command_pool, &[command_buffer]);
            }
            Zombie::Buffer(buffer, memory) => {
                self.device.destroy_buffer(buffer, None);
                self.device.free_memory(memory, None);
            }
            Zombie::Pipeline(pipeline, layout) => {
                self.device.destroy_pipeline(pipeline, None);
                self.device.destroy_pipeline_layout(layout, None);
            }
        }
    }

    /// Queues pipelines nothing outside the manager refers to anymore.
    fn retire_released_pipelines(&mut self) {
        for pipeline in self.pipeline_manager.take_released() {
            tracing::debug!("Retiring pipeline `{}`.", pipeline.name());
            self.garbage.retire(
                self.data.submit_index,
                Zombie::Pipeline(pipeline.handle, pipeline.layout),
            );
        }
    }

    /// Releases everything in reverse order of creation: retired resources,
    /// pipelines, swapchain, device, surface, instance.
    pub unsafe fn destroy(mut self) {
        if let Err(error) = self.device.device_wait_idle() {
            tracing::error!("Failed to wait for device idle during teardown: {}", error);
        }
        self.retire_released_pipelines();
        for zombie in self.garbage.collect(u64::MAX) {
            self.destroy_zombie(zombie);
        }

        self.pipeline_manager.destroy();
        self.swapchain.destroy(&self.device);
        self.device.destroy_semaphore(self.data.submit_timeline, None);
        self.device.destroy_command_pool(self.data.command_pool, None);
        self.device.destroy_device(None);

        Self::destroy_instance_objects(&self.instance, &self.data);
        tracing::debug!("Graphics context destroyed.");
    }
}

impl GraphicsBackend for Context {
    type Image = SwapchainImage;
    type Pipeline = Arc<RasterPipeline>;
    type Buffer = Buffer;
    type Semaphore = vk::Semaphore;
    type Commands = vk::CommandBuffer;
    type Recorder = VulkanRecorder;

    fn acquire_next_image(&mut self) -> Result<AcquireResult<SwapchainImage>> {
        unsafe { self.swapchain.acquire_next_image(&self.device) }
    }

    fn resize(&mut self, size: Extent) -> Result<()> {
        unsafe { self.swapchain.resize(&self.instance, &self.device, size) }
    }

    fn create_command_recorder(&mut self) -> Result<VulkanRecorder> {
        let info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.data.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        unsafe {
            let command_buffer = self.device.allocate_command_buffers(&info)?[0];
            VulkanRecorder::begin(self.device.clone(), self.data.command_pool, command_buffer)
        }
    }

    fn current_acquire_semaphore(&self) -> vk::Semaphore {
        self.swapchain.current_acquire_semaphore()
    }

    fn current_present_semaphore(&self) -> vk::Semaphore {
        self.swapchain.current_present_semaphore()
    }

    fn current_timeline_pair(&self) -> (vk::Semaphore, u64) {
        self.swapchain.current_timeline_pair()
    }

    fn submit_commands(
        &mut self,
        info: CommandSubmitInfo<'_, vk::CommandBuffer, vk::Semaphore>,
    ) -> Result<()> {
        let submit_index = self.data.submit_index + 1;

        let command_buffer_infos = info
            .command_lists
            .iter()
            .map(|command_buffer| vk::CommandBufferSubmitInfo::builder().command_buffer(*command_buffer))
            .collect::<Vec<_>>();
        let wait_infos = info
            .wait_binary_semaphores
            .iter()
            .map(|semaphore| {
                vk::SemaphoreSubmitInfo::builder()
                    .semaphore(*semaphore)
                    .stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
            })
            .collect::<Vec<_>>();
        let signal_infos = info
            .signal_binary_semaphores
            .iter()
            .map(|semaphore| (*semaphore, 0))
            .chain(info.signal_timeline_semaphores.iter().copied())
            .chain([(self.data.submit_timeline, submit_index)])
            .map(|(semaphore, value)| {
                vk::SemaphoreSubmitInfo::builder()
                    .semaphore(semaphore)
                    .value(value)
                    .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
            })
            .collect::<Vec<_>>();

        let submit_info = vk::SubmitInfo2::builder()
            .wait_semaphore_infos(&wait_infos)
            .command_buffer_infos(&command_buffer_infos)
            .signal_semaphore_infos(&signal_infos);
        let submitted = unsafe {
            self.device
                .queue_submit2(self.data.graphics_queue, &[submit_info], vk::Fence::null())
        };
        if let Err(error) = submitted {
            // Never pending, so they can be freed right away.
            unsafe {
                self.device
                    .free_command_buffers(self.data.command_pool, &info.command_lists);
            }
            return Err(error.into());
        }

        self.data.submit_index = submit_index;
        let swapchain_timeline = self.swapchain.timeline_semaphore();
        if info
            .signal_timeline_semaphores
            .iter()
            .any(|(semaphore, _)| *semaphore == swapchain_timeline)
        {
            self.swapchain.frame_submitted();
        }
        for command_buffer in info.command_lists {
            self.garbage
                .retire(submit_index, Zombie::CommandBuffer(command_buffer));
        }
        Ok(())
    }

    fn present_frame(&mut self, info: PresentInfo<'_, vk::Semaphore>) -> Result<()> {
        unsafe {
            self.swapchain.present(
                &self.device,
                self.data.graphics_queue,
                info.wait_binary_semaphores,
            )
        }
    }

    fn collect_garbage(&mut self) -> Result<()> {
        self.retire_released_pipelines();
        let completed = unsafe {
            self.device
                .get_semaphore_counter_value(self.data.submit_timeline)?
        };
        for zombie in self.garbage.collect(completed) {
            unsafe { self.destroy_zombie(zombie) };
        }
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    fn buffer_device_address(&self, buffer: &Buffer) -> Result<u64> {
        Ok(buffer.device_address())
    }

    fn destroy_buffer(&mut self, buffer: Buffer) {
        self.garbage.retire(
            self.data.submit_index,
            Zombie::Buffer(buffer.handle, buffer.memory),
        );
    }
}

#[derive(Debug, Error)]
#[error("Missing {0}.")]
pub struct SuitabilityError(pub &'static str);

#[derive(Copy, Clone, Debug)]
struct QueueFamilyIndices {
    graphics: u32,
}

impl QueueFamilyIndices {
    /// Finds one family that can both draw and present to the surface.
    unsafe fn get(
        instance: &Instance,
        data: &AppData,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Self> {
        let properties = instance.get_physical_device_queue_family_properties(physical_device);

        for (index, family) in properties.iter().enumerate() {
            let index = index as u32;
            if family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
                && instance.get_physical_device_surface_support_khr(
                    physical_device,
                    index,
                    data.surface,
                )?
            {
                return Ok(Self { graphics: index });
            }
        }

        Err(anyhow!(SuitabilityError(
            "graphics queue family with present support"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discrete_outranks_integrated() {
        assert!(
            device_type_score(vk::PhysicalDeviceType::DISCRETE_GPU)
                > device_type_score(vk::PhysicalDeviceType::INTEGRATED_GPU)
        );
        assert!(
            device_type_score(vk::PhysicalDeviceType::INTEGRATED_GPU)
                > device_type_score(vk::PhysicalDeviceType::VIRTUAL_GPU)
        );
        assert!(
            device_type_score(vk::PhysicalDeviceType::CPU)
                > device_type_score(vk::PhysicalDeviceType::OTHER)
        );
    }

    #[test]
    fn test_suitability_message() {
        assert_eq!(
            SuitabilityError("VK_KHR_swapchain").to_string(),
            "Missing VK_KHR_swapchain."
        );
    }
}
