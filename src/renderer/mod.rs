// Renderer - frame orchestration
//
// Drives the begin/record/end protocol over a fixed set of frame slots.
// Each slot owns a command buffer, an image-available semaphore and a
// fence; waiting on that fence before reuse is the only back-pressure.
// Surface invalidation (out-of-date, suboptimal, resize) is absorbed here
// by rebuilding the swapchain and the pipeline that targets it.

pub mod draw;
pub mod frame;

use ash::vk;
use std::sync::Arc;

use crate::backend::gpu::Submission;
use crate::backend::pipeline::PUSH_CONSTANT_STAGES;
use crate::backend::swapchain::{Acquire, SurfaceStatus};
use crate::backend::{CommandPool, FrameSync, Gpu, Pipeline, ShaderSet, Swapchain, SwapchainConfig};
use crate::error::{RenderError, RenderResult};
use draw::{DrawItem, PushConstants};
use frame::FrameState;

/// What the renderer needs from the window it presents to
pub trait SurfaceSource {
    /// Current drawable size in pixels; zero while minimized
    fn drawable_extent(&self) -> vk::Extent2D;
    /// Whether a resize happened since the last call. Reading clears it.
    fn take_resize_request(&self) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct RendererConfig {
    pub max_frames_in_flight: usize,
    pub clear_color: [f32; 4],
    pub swapchain: SwapchainConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_frames_in_flight: 2,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            swapchain: SwapchainConfig::default(),
        }
    }
}

pub struct Renderer<G: Gpu, S: SurfaceSource> {
    // Fields drop in order, after Drop has waited for idle
    pipeline: Pipeline<G>,
    command_pool: CommandPool<G>,
    frames: Vec<FrameSync<G>>,
    swapchain: Swapchain<G>,
    frame: FrameState,
    shaders: ShaderSet,
    clear_color: [f32; 4],
    /// Set while the surface is zero-sized and recreation has to wait
    recreate_pending: bool,
    surface: Arc<S>,
    gpu: Arc<G>,
}

impl<G: Gpu, S: SurfaceSource> Renderer<G, S> {
    pub fn new(
        gpu: Arc<G>,
        surface: Arc<S>,
        config: RendererConfig,
        shaders: ShaderSet,
    ) -> RenderResult<Self> {
        let slot_count = config.max_frames_in_flight.max(1);
        log::info!("Creating renderer with {} frames in flight", slot_count);

        let swapchain = Swapchain::new(gpu.clone(), surface.drawable_extent(), config.swapchain)?;
        let frames = FrameSync::pool(&gpu, slot_count)?;
        let command_pool = CommandPool::new(&gpu, slot_count)?;
        let pipeline = Pipeline::new(&gpu, swapchain.render_pass(), &shaders)?;
        log::debug!(
            "Renderer ready: {:?} / {:?}, {} command buffers",
            swapchain.format(),
            swapchain.present_mode(),
            command_pool.len()
        );

        Ok(Self {
            pipeline,
            command_pool,
            frames,
            swapchain,
            frame: FrameState::new(slot_count),
            shaders,
            clear_color: config.clear_color,
            recreate_pending: false,
            surface,
            gpu,
        })
    }

    /// Start a frame on the current slot.
    ///
    /// Returns `None` when there is nothing to render into this tick: the
    /// surface is minimized, or the swapchain went out of date and was
    /// rebuilt. Callers simply skip the frame.
    pub fn begin_frame(&mut self) -> RenderResult<Option<vk::CommandBuffer>> {
        if self.frame.is_recording() {
            return Err(RenderError::PreconditionViolation(
                "begin_frame called while a frame is recording",
            ));
        }

        if self.recreate_pending && !self.recreate_swapchain()? {
            return Ok(None);
        }

        let slot = self.frame.slot();
        let image_index = match self.swapchain.acquire(&self.frames[slot])? {
            Acquire::Ready(index) | Acquire::Suboptimal(index) => index,
            Acquire::OutOfDate => {
                log::debug!("Swapchain out of date on acquire, skipping frame");
                self.recreate_swapchain()?;
                return Ok(None);
            }
        };

        let cmd = self.command_pool.buffer(slot);
        self.gpu.reset_command_buffer(cmd)?;
        self.gpu.begin_command_buffer(cmd)?;
        self.frame.begin(image_index)?;

        Ok(Some(cmd))
    }

    /// Clear the acquired image and cover it with viewport and scissor
    pub fn begin_render_pass(&mut self, cmd: vk::CommandBuffer) -> RenderResult<()> {
        let image_index = self.active_image(cmd, "begin_render_pass outside a recording frame")?;
        let extent = self.swapchain.extent();

        self.gpu.cmd_begin_render_pass(
            cmd,
            self.swapchain.render_pass(),
            self.swapchain.framebuffer(image_index),
            extent,
            self.clear_color,
        );

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        self.gpu.cmd_set_viewport(cmd, viewport);
        self.gpu.cmd_set_scissor(
            cmd,
            vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            },
        );
        Ok(())
    }

    pub fn end_render_pass(&mut self, cmd: vk::CommandBuffer) -> RenderResult<()> {
        self.active_image(cmd, "end_render_pass outside a recording frame")?;
        self.gpu.cmd_end_render_pass(cmd);
        Ok(())
    }

    /// Record one drawable. Items without vertices record nothing.
    pub fn draw(&mut self, cmd: vk::CommandBuffer, item: &DrawItem) -> RenderResult<()> {
        self.active_image(cmd, "draw outside a recording frame")?;
        if item.vertices.count == 0 {
            return Ok(());
        }

        self.pipeline.bind(cmd);

        let push = PushConstants::new(item, self.swapchain.extent());
        self.gpu.cmd_push_constants(
            cmd,
            self.pipeline.layout(),
            PUSH_CONSTANT_STAGES,
            bytemuck::bytes_of(&push),
        );

        self.gpu.cmd_bind_vertex_buffer(cmd, item.vertices.buffer);
        match item.indices {
            Some(indices) => {
                self.gpu.cmd_bind_index_buffer(cmd, indices.buffer);
                self.gpu.cmd_draw_indexed(cmd, indices.count);
            }
            None => self.gpu.cmd_draw(cmd, item.vertices.count),
        }
        Ok(())
    }

    /// Submit the recorded frame, present it, and move to the next slot
    pub fn end_frame(&mut self) -> RenderResult<()> {
        let image_index = self.frame.end()?;
        let slot = self.frame.slot();
        let cmd = self.command_pool.buffer(slot);
        let sync = &self.frames[slot];

        self.gpu.end_command_buffer(cmd)?;

        // Only reset right before the submit that re-arms it
        self.gpu.reset_fence(sync.in_flight_fence)?;
        self.gpu.queue_submit(&Submission {
            command_buffer: cmd,
            wait_semaphore: sync.image_available,
            wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            signal_semaphore: self.swapchain.render_finished(image_index),
            fence: sync.in_flight_fence,
        })?;

        let status = self.swapchain.present(image_index)?;
        let resized = self.surface.take_resize_request();
        if status != SurfaceStatus::Ready || resized {
            log::debug!("Recreating after present ({:?}, resized: {})", status, resized);
            self.recreate_swapchain()?;
        }

        self.frame.advance();
        Ok(())
    }

    /// Rebuild the swapchain and pipeline for the surface's current size.
    ///
    /// Returns `false` if the surface is zero-sized; recreation is then
    /// retried at the start of each following frame. Only valid between
    /// frames; the recording frame still targets the current images.
    pub fn recreate_swapchain(&mut self) -> RenderResult<bool> {
        if self.frame.is_recording() {
            return Err(RenderError::PreconditionViolation(
                "recreate_swapchain called while a frame is recording",
            ));
        }

        let extent = self.surface.drawable_extent();
        if extent.width == 0 || extent.height == 0 {
            if !self.recreate_pending {
                log::debug!("Surface is zero-sized, deferring swapchain recreation");
            }
            self.recreate_pending = true;
            return Ok(false);
        }

        self.swapchain.recreate(extent)?;
        self.pipeline = Pipeline::new(&self.gpu, self.swapchain.render_pass(), &self.shaders)?;
        self.recreate_pending = false;
        Ok(true)
    }

    fn active_image(&self, cmd: vk::CommandBuffer, context: &'static str) -> RenderResult<u32> {
        let image_index = self
            .frame
            .image_index()
            .ok_or(RenderError::PreconditionViolation(context))?;
        if cmd != self.command_pool.buffer(self.frame.slot()) {
            return Err(RenderError::PreconditionViolation(
                "command buffer does not belong to the active frame",
            ));
        }
        Ok(image_index)
    }

    pub fn current_slot(&self) -> usize {
        self.frame.slot()
    }

    pub fn frame_slot_count(&self) -> usize {
        self.frame.slot_count()
    }

    pub fn is_recording(&self) -> bool {
        self.frame.is_recording()
    }

    pub fn is_recreate_pending(&self) -> bool {
        self.recreate_pending
    }

    pub fn swapchain(&self) -> &Swapchain<G> {
        &self.swapchain
    }
}

impl<G: Gpu, S: SurfaceSource> Drop for Renderer<G, S> {
    fn drop(&mut self) {
        if let Err(e) = self.gpu.wait_idle() {
            log::warn!("Failed to wait for idle before renderer teardown: {}", e);
        }
    }
}
