// Gpu - the seam between the frame engine and the driver
//
// Every native call the swapchain and renderer make goes through this trait.
// VulkanDevice implements it over ash; tests implement it with a recording
// mock. Handles are plain ash handles so both sides speak the same types.

use ash::prelude::VkResult;
use ash::vk;

use crate::error::RenderResult;

/// What the surface supports, queried fresh on every swapchain build
#[derive(Debug, Clone, Default)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

/// Negotiated swapchain parameters
#[derive(Debug, Clone, Copy)]
pub struct SwapchainDesc {
    pub min_image_count: u32,
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

/// One graphics queue submission
#[derive(Debug, Clone, Copy)]
pub struct Submission {
    pub command_buffer: vk::CommandBuffer,
    pub wait_semaphore: vk::Semaphore,
    pub wait_stage: vk::PipelineStageFlags,
    pub signal_semaphore: vk::Semaphore,
    pub fence: vk::Fence,
}

pub trait Gpu {
    // Synchronization
    fn create_semaphore(&self) -> RenderResult<vk::Semaphore>;
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);
    fn create_fence(&self, signaled: bool) -> RenderResult<vk::Fence>;
    fn destroy_fence(&self, fence: vk::Fence);
    fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> RenderResult<()>;
    fn reset_fence(&self, fence: vk::Fence) -> RenderResult<()>;
    /// Blocks until no GPU work of any kind is in flight
    fn wait_idle(&self) -> RenderResult<()>;

    // Surface and swapchain
    fn surface_support(&self) -> RenderResult<SurfaceSupport>;
    fn create_swapchain(&self, desc: &SwapchainDesc) -> RenderResult<vk::SwapchainKHR>;
    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> RenderResult<Vec<vk::Image>>;
    fn create_image_view(&self, image: vk::Image, format: vk::Format) -> RenderResult<vk::ImageView>;
    fn destroy_image_view(&self, view: vk::ImageView);
    fn create_render_pass(&self, format: vk::Format) -> RenderResult<vk::RenderPass>;
    fn destroy_render_pass(&self, render_pass: vk::RenderPass);
    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> RenderResult<vk::Framebuffer>;
    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);
    /// Raw driver result: `Ok((index, suboptimal))` or the failing code
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
        timeout: u64,
    ) -> VkResult<(u32, bool)>;
    /// Raw driver result: `Ok(suboptimal)` or the failing code
    fn queue_present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool>;

    // Commands
    fn create_command_pool(&self) -> RenderResult<vk::CommandPool>;
    fn destroy_command_pool(&self, pool: vk::CommandPool);
    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> RenderResult<Vec<vk::CommandBuffer>>;
    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> RenderResult<()>;
    fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> RenderResult<()>;
    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> RenderResult<()>;
    fn queue_submit(&self, submission: &Submission) -> RenderResult<()>;

    // Recording
    fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_color: [f32; 4],
    );
    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer);
    fn cmd_set_viewport(&self, cmd: vk::CommandBuffer, viewport: vk::Viewport);
    fn cmd_set_scissor(&self, cmd: vk::CommandBuffer, scissor: vk::Rect2D);
    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline);
    fn cmd_push_constants(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        data: &[u8],
    );
    fn cmd_bind_vertex_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer);
    fn cmd_bind_index_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer);
    fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32);
    fn cmd_draw_indexed(&self, cmd: vk::CommandBuffer, index_count: u32);

    // Pipeline
    fn create_graphics_pipeline(
        &self,
        render_pass: vk::RenderPass,
        vertex_spirv: &[u32],
        fragment_spirv: &[u32],
    ) -> RenderResult<(vk::Pipeline, vk::PipelineLayout)>;
    fn destroy_pipeline(&self, pipeline: vk::Pipeline, layout: vk::PipelineLayout);
}
