use anyhow::{Result, anyhow};
use std::rc::Rc;
use std::sync::Arc;
use vulkanalia::prelude::v1_3::*;

use super::pipeline::RasterPipeline;
use super::swapchain::SwapchainImage;
use crate::app::engine::renderer::backend::{CommandRecorder, DrawInfo, RenderPassInfo};

fn color_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Records into a one-shot primary command buffer. Dropping it before
/// `complete_current_commands` succeeds frees the command buffer.
pub struct VulkanRecorder {
    device: Rc<Device>,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    layout: vk::PipelineLayout,
    target: Option<vk::Image>,
}

impl VulkanRecorder {
    pub(super) unsafe fn begin(
        device: Rc<Device>,
        command_pool: vk::CommandPool,
        command_buffer: vk::CommandBuffer,
    ) -> Result<Self> {
        let recorder = Self {
            device,
            command_pool,
            command_buffer,
            layout: vk::PipelineLayout::null(),
            target: None,
        };
        let info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        recorder
            .device
            .begin_command_buffer(recorder.command_buffer, &info)?;
        Ok(recorder)
    }

    unsafe fn transition(
        &self,
        image: vk::Image,
        (src_stage, src_access, old_layout): (vk::PipelineStageFlags2, vk::AccessFlags2, vk::ImageLayout),
        (dst_stage, dst_access, new_layout): (vk::PipelineStageFlags2, vk::AccessFlags2, vk::ImageLayout),
    ) {
        let barriers = [vk::ImageMemoryBarrier2::builder()
            .src_stage_mask(src_stage)
            .src_access_mask(src_access)
            .dst_stage_mask(dst_stage)
            .dst_access_mask(dst_access)
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(color_range())];
        let info = vk::DependencyInfo::builder().image_memory_barriers(&barriers);
        self.device.cmd_pipeline_barrier2(self.command_buffer, &info);
    }
}

impl CommandRecorder for VulkanRecorder {
    type Image = SwapchainImage;
    type Pipeline = Arc<RasterPipeline>;
    type Commands = vk::CommandBuffer;

    fn begin_render_pass(&mut self, info: RenderPassInfo<'_, SwapchainImage>) -> Result<()> {
        let image = info.color_attachment;
        // The render area may not exceed the attachment.
        let extent = vk::Extent2D {
            width: info.render_area.width.min(image.extent.width),
            height: info.render_area.height.min(image.extent.height),
        };
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let clear_value = vk::ClearValue {
            color: vk::ClearColorValue {
                float32: info.clear_color,
            },
        };

        let attachments = [vk::RenderingAttachmentInfo::builder()
            .image_view(image.view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(clear_value)];
        let rendering_info = vk::RenderingInfo::builder()
            .render_area(render_area)
            .layer_count(1)
            .color_attachments(&attachments);

        let viewports = [vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }];

        // SAFETY: the command buffer is in the recording state until
        // `complete_current_commands` consumes the recorder.
        unsafe {
            self.transition(
                image.image,
                (
                    vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
                    vk::AccessFlags2::empty(),
                    vk::ImageLayout::UNDEFINED,
                ),
                (
                    vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
                    vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
                    vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                ),
            );
            self.device.cmd_begin_rendering(self.command_buffer, &rendering_info);
            self.device.cmd_set_viewport(self.command_buffer, 0, &viewports);
            self.device.cmd_set_scissor(self.command_buffer, 0, &[render_area]);
        }
        self.target = Some(image.image);
        Ok(())
    }

    fn set_pipeline(&mut self, pipeline: &Arc<RasterPipeline>) -> Result<()> {
        // SAFETY: see `begin_render_pass`.
        unsafe {
            self.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.handle,
            );
        }
        self.layout = pipeline.layout;
        Ok(())
    }

    fn push_constant<T: bytemuck::Pod>(&mut self, value: &T) -> Result<()> {
        if self.layout.is_null() {
            return Err(anyhow!("Push constant recorded before a pipeline was bound."));
        }
        // SAFETY: see `begin_render_pass`.
        unsafe {
            self.device.cmd_push_constants(
                self.command_buffer,
                self.layout,
                vk::ShaderStageFlags::ALL_GRAPHICS,
                0,
                bytemuck::bytes_of(value),
            );
        }
        Ok(())
    }

    fn draw(&mut self, info: DrawInfo) -> Result<()> {
        // SAFETY: see `begin_render_pass`.
        unsafe {
            self.device.cmd_draw(
                self.command_buffer,
                info.vertex_count,
                info.instance_count,
                info.first_vertex,
                info.first_instance,
            );
        }
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        let image = self
            .target
            .take()
            .ok_or_else(|| anyhow!("No render pass in progress."))?;
        // SAFETY: see `begin_render_pass`.
        unsafe {
            self.device.cmd_end_rendering(self.command_buffer);
            self.transition(
                image,
                (
                    vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
                    vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
                    vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                ),
                (
                    vk::PipelineStageFlags2::BOTTOM_OF_PIPE,
                    vk::AccessFlags2::empty(),
                    vk::ImageLayout::PRESENT_SRC_KHR,
                ),
            );
        }
        Ok(())
    }

    fn complete_current_commands(mut self) -> Result<vk::CommandBuffer> {
        // SAFETY: see `begin_render_pass`.
        unsafe { self.device.end_command_buffer(self.command_buffer)? };
        Ok(std::mem::replace(
            &mut self.command_buffer,
            vk::CommandBuffer::null(),
        ))
    }
}

impl Drop for VulkanRecorder {
    fn drop(&mut self) {
        if self.command_buffer.is_null() {
            return;
        }
        // SAFETY: the command buffer was never submitted.
        unsafe {
            self.device
                .free_command_buffers(self.command_pool, &[self.command_buffer]);
        }
    }
}
