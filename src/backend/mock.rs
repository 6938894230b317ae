// Recording stand-in for the GPU, used by the frame engine tests
//
// Fences model a GPU that finishes work only when the host waits for it:
// submitting un-signals a fence, and waiting on it (or on device idle)
// signals it again. Each wait records whether the fence was still pending,
// which is how tests observe host blocking.

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};

use super::gpu::{Gpu, Submission, SurfaceSupport, SwapchainDesc};
use crate::error::{RenderError, RenderResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    WaitFence { fence: vk::Fence, blocked: bool },
    ResetFence(vk::Fence),
    WaitIdle,
    CreateSwapchain { swapchain: vk::SwapchainKHR, desc_extent: (u32, u32), min_images: u32 },
    DestroySwapchain(vk::SwapchainKHR),
    Acquire { signal: vk::Semaphore, result: Result<u32, vk::Result> },
    Present { image_index: u32, wait: vk::Semaphore },
    ResetCommandBuffer(vk::CommandBuffer),
    BeginCommandBuffer(vk::CommandBuffer),
    EndCommandBuffer(vk::CommandBuffer),
    Submit(SubmitRecord),
    BeginRenderPass { framebuffer: vk::Framebuffer, clear_color: [f32; 4] },
    EndRenderPass,
    SetViewport { width: f32, height: f32 },
    SetScissor { width: u32, height: u32 },
    BindPipeline(vk::Pipeline),
    PushConstants { stages: vk::ShaderStageFlags, data: Vec<u8> },
    BindVertexBuffer(vk::Buffer),
    BindIndexBuffer(vk::Buffer),
    Draw(u32),
    DrawIndexed(u32),
    CreatePipeline(vk::Pipeline),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitRecord {
    pub command_buffer: vk::CommandBuffer,
    pub wait_semaphore: vk::Semaphore,
    pub signal_semaphore: vk::Semaphore,
    pub fence: vk::Fence,
}

/// Scripted outcome for the next acquire or present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Suboptimal,
    Failure(vk::Result),
}

struct State {
    next_handle: u64,
    live: HashSet<u64>,
    fences: HashMap<vk::Fence, bool>,
    calls: Vec<Call>,
    support: SurfaceSupport,
    next_image: u32,
    acquire_script: VecDeque<Outcome>,
    present_script: VecDeque<Outcome>,
    fail_create: Option<&'static str>,
}

pub struct MockGpu {
    state: Mutex<State>,
}

impl MockGpu {
    /// A surface whose driver hands out exactly `image_count` images
    pub fn new(image_count: u32) -> Self {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: image_count.saturating_sub(1).max(1),
            max_image_count: image_count,
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        };
        let support = SurfaceSupport {
            capabilities,
            formats: vec![
                vk::SurfaceFormatKHR {
                    format: vk::Format::R8G8B8A8_UNORM,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        };
        Self {
            state: Mutex::new(State {
                next_handle: 1,
                live: HashSet::new(),
                fences: HashMap::new(),
                calls: Vec::new(),
                support,
                next_image: 0,
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                fail_create: None,
            }),
        }
    }

    pub fn set_support(&self, support: SurfaceSupport) {
        self.state.lock().support = support;
    }

    pub fn script_acquire(&self, outcomes: &[Outcome]) {
        self.state.lock().acquire_script.extend(outcomes.iter().copied());
    }

    pub fn script_present(&self, outcomes: &[Outcome]) {
        self.state.lock().present_script.extend(outcomes.iter().copied());
    }

    /// Make the next create call for `resource` fail
    pub fn fail_next_create(&self, resource: &'static str) {
        self.state.lock().fail_create = Some(resource);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    pub fn is_live(&self, raw: u64) -> bool {
        self.state.lock().live.contains(&raw)
    }

    pub fn fence_signaled(&self, fence: vk::Fence) -> bool {
        self.state.lock().fences.get(&fence).copied().unwrap_or(false)
    }

    fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }

    fn create<H: Handle>(&self, resource: &'static str) -> RenderResult<H> {
        let mut state = self.state.lock();
        if state.fail_create == Some(resource) {
            state.fail_create = None;
            return Err(RenderError::creation(
                resource,
                vk::Result::ERROR_OUT_OF_DEVICE_MEMORY,
            ));
        }
        let raw = state.next_handle;
        state.next_handle += 1;
        state.live.insert(raw);
        Ok(H::from_raw(raw))
    }

    fn destroy<H: Handle>(&self, handle: H) {
        let raw = handle.as_raw();
        let removed = self.state.lock().live.remove(&raw);
        assert!(removed, "destroyed unknown or already destroyed handle {raw:#x}");
    }
}

impl Gpu for MockGpu {
    fn create_semaphore(&self) -> RenderResult<vk::Semaphore> {
        self.create("semaphore")
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.destroy(semaphore);
    }

    fn create_fence(&self, signaled: bool) -> RenderResult<vk::Fence> {
        let fence: vk::Fence = self.create("fence")?;
        self.state.lock().fences.insert(fence, signaled);
        Ok(fence)
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        self.state.lock().fences.remove(&fence);
        self.destroy(fence);
    }

    fn wait_for_fence(&self, fence: vk::Fence, _timeout: u64) -> RenderResult<()> {
        let mut state = self.state.lock();
        let signaled = state
            .fences
            .get_mut(&fence)
            .expect("waited on an unknown fence");
        let blocked = !*signaled;
        *signaled = true;
        state.calls.push(Call::WaitFence { fence, blocked });
        Ok(())
    }

    fn reset_fence(&self, fence: vk::Fence) -> RenderResult<()> {
        let mut state = self.state.lock();
        *state.fences.get_mut(&fence).expect("reset an unknown fence") = false;
        state.calls.push(Call::ResetFence(fence));
        Ok(())
    }

    fn wait_idle(&self) -> RenderResult<()> {
        let mut state = self.state.lock();
        for signaled in state.fences.values_mut() {
            *signaled = true;
        }
        state.calls.push(Call::WaitIdle);
        Ok(())
    }

    fn surface_support(&self) -> RenderResult<SurfaceSupport> {
        Ok(self.state.lock().support.clone())
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> RenderResult<vk::SwapchainKHR> {
        let swapchain: vk::SwapchainKHR = self.create("swapchain")?;
        let mut state = self.state.lock();
        state.next_image = 0;
        state.calls.push(Call::CreateSwapchain {
            swapchain,
            desc_extent: (desc.extent.width, desc.extent.height),
            min_images: desc.min_image_count,
        });
        Ok(swapchain)
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        self.destroy(swapchain);
        self.record(Call::DestroySwapchain(swapchain));
    }

    fn swapchain_images(&self, _swapchain: vk::SwapchainKHR) -> RenderResult<Vec<vk::Image>> {
        // Images belong to the swapchain, so they are not tracked as live
        let mut state = self.state.lock();
        let count = state.support.capabilities.max_image_count;
        let first = state.next_handle;
        state.next_handle += count as u64;
        Ok((0..count as u64).map(|i| vk::Image::from_raw(first + i)).collect())
    }

    fn create_image_view(&self, _image: vk::Image, _format: vk::Format) -> RenderResult<vk::ImageView> {
        self.create("image view")
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.destroy(view);
    }

    fn create_render_pass(&self, _format: vk::Format) -> RenderResult<vk::RenderPass> {
        self.create("render pass")
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.destroy(render_pass);
    }

    fn create_framebuffer(
        &self,
        _render_pass: vk::RenderPass,
        _view: vk::ImageView,
        _extent: vk::Extent2D,
    ) -> RenderResult<vk::Framebuffer> {
        self.create("framebuffer")
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.destroy(framebuffer);
    }

    fn acquire_next_image(
        &self,
        _swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
        _timeout: u64,
    ) -> VkResult<(u32, bool)> {
        let mut state = self.state.lock();
        let outcome = state.acquire_script.pop_front().unwrap_or(Outcome::Success);
        let result = match outcome {
            Outcome::Failure(code) => Err(code),
            outcome => {
                let count = state.support.capabilities.max_image_count;
                let index = state.next_image % count;
                state.next_image += 1;
                Ok((index, outcome == Outcome::Suboptimal))
            }
        };
        state.calls.push(Call::Acquire {
            signal,
            result: result.map(|(index, _)| index),
        });
        result
    }

    fn queue_present(
        &self,
        _swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool> {
        let mut state = self.state.lock();
        state.calls.push(Call::Present { image_index, wait });
        match state.present_script.pop_front().unwrap_or(Outcome::Success) {
            Outcome::Success => Ok(false),
            Outcome::Suboptimal => Ok(true),
            Outcome::Failure(code) => Err(code),
        }
    }

    fn create_command_pool(&self) -> RenderResult<vk::CommandPool> {
        self.create("command pool")
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        self.destroy(pool);
    }

    fn allocate_command_buffers(
        &self,
        _pool: vk::CommandPool,
        count: u32,
    ) -> RenderResult<Vec<vk::CommandBuffer>> {
        // Freed with their pool, so not tracked as live
        let mut state = self.state.lock();
        let first = state.next_handle;
        state.next_handle += count as u64;
        Ok((0..count as u64)
            .map(|i| vk::CommandBuffer::from_raw(first + i))
            .collect())
    }

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> RenderResult<()> {
        self.record(Call::ResetCommandBuffer(cmd));
        Ok(())
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> RenderResult<()> {
        self.record(Call::BeginCommandBuffer(cmd));
        Ok(())
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> RenderResult<()> {
        self.record(Call::EndCommandBuffer(cmd));
        Ok(())
    }

    fn queue_submit(&self, submission: &Submission) -> RenderResult<()> {
        let mut state = self.state.lock();
        let signaled = *state
            .fences
            .get(&submission.fence)
            .expect("submitted with an unknown fence");
        // Submitting with a signaled fence is invalid usage
        if signaled {
            return Err(RenderError::call(
                "queue submit",
                vk::Result::ERROR_VALIDATION_FAILED_EXT,
            ));
        }
        state.calls.push(Call::Submit(SubmitRecord {
            command_buffer: submission.command_buffer,
            wait_semaphore: submission.wait_semaphore,
            signal_semaphore: submission.signal_semaphore,
            fence: submission.fence,
        }));
        Ok(())
    }

    fn cmd_begin_render_pass(
        &self,
        _cmd: vk::CommandBuffer,
        _render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        _extent: vk::Extent2D,
        clear_color: [f32; 4],
    ) {
        self.record(Call::BeginRenderPass {
            framebuffer,
            clear_color,
        });
    }

    fn cmd_end_render_pass(&self, _cmd: vk::CommandBuffer) {
        self.record(Call::EndRenderPass);
    }

    fn cmd_set_viewport(&self, _cmd: vk::CommandBuffer, viewport: vk::Viewport) {
        self.record(Call::SetViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }

    fn cmd_set_scissor(&self, _cmd: vk::CommandBuffer, scissor: vk::Rect2D) {
        self.record(Call::SetScissor {
            width: scissor.extent.width,
            height: scissor.extent.height,
        });
    }

    fn cmd_bind_pipeline(&self, _cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        self.record(Call::BindPipeline(pipeline));
    }

    fn cmd_push_constants(
        &self,
        _cmd: vk::CommandBuffer,
        _layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        data: &[u8],
    ) {
        self.record(Call::PushConstants {
            stages,
            data: data.to_vec(),
        });
    }

    fn cmd_bind_vertex_buffer(&self, _cmd: vk::CommandBuffer, buffer: vk::Buffer) {
        self.record(Call::BindVertexBuffer(buffer));
    }

    fn cmd_bind_index_buffer(&self, _cmd: vk::CommandBuffer, buffer: vk::Buffer) {
        self.record(Call::BindIndexBuffer(buffer));
    }

    fn cmd_draw(&self, _cmd: vk::CommandBuffer, vertex_count: u32) {
        self.record(Call::Draw(vertex_count));
    }

    fn cmd_draw_indexed(&self, _cmd: vk::CommandBuffer, index_count: u32) {
        self.record(Call::DrawIndexed(index_count));
    }

    fn create_graphics_pipeline(
        &self,
        _render_pass: vk::RenderPass,
        _vertex_spirv: &[u32],
        _fragment_spirv: &[u32],
    ) -> RenderResult<(vk::Pipeline, vk::PipelineLayout)> {
        let layout: vk::PipelineLayout = self.create("pipeline layout")?;
        let pipeline: vk::Pipeline = match self.create("pipeline") {
            Ok(pipeline) => pipeline,
            Err(e) => {
                self.destroy(layout);
                return Err(e);
            }
        };
        self.record(Call::CreatePipeline(pipeline));
        Ok((pipeline, layout))
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline, layout: vk::PipelineLayout) {
        self.destroy(pipeline);
        self.destroy(layout);
    }
}
