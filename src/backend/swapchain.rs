// Swapchain - Window presentation
//
// Owns the chain of images we render to and present to the screen, plus
// everything that depends on them: views, the render pass, framebuffers,
// the per-image render-finished semaphores and image-in-flight records.
// Recreation is two-phase: idle the device, destroy the old generation,
// build the new one. Frame-slot sync objects are never touched here.

use ash::vk;
use std::sync::Arc;

use super::gpu::{Gpu, SwapchainDesc};
use super::sync::FrameSync;
use crate::error::{RenderError, RenderResult};

/// Host waits on fences and acquisition never time out; a hung GPU is fatal
pub const WAIT_FOREVER: u64 = u64::MAX;

/// Version tag bumped on every recreation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SwapchainGeneration(u64);

impl SwapchainGeneration {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Outcome of an image acquisition. Driver failures travel as `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    Ready(u32),
    /// Usable, but the swapchain no longer matches the surface exactly
    Suboptimal(u32),
    /// No image was acquired; the swapchain must be recreated
    OutOfDate,
}

/// Outcome of a presentation. Driver failures travel as `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStatus {
    Ready,
    Suboptimal,
    OutOfDate,
}

#[derive(Debug, Clone, Copy)]
pub struct SwapchainConfig {
    pub preferred_present_mode: vk::PresentModeKHR,
}

impl Default for SwapchainConfig {
    fn default() -> Self {
        Self {
            preferred_present_mode: vk::PresentModeKHR::MAILBOX,
        }
    }
}

/// Prefer 8-bit BGRA sRGB with the sRGB color space, else take the first
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> RenderResult<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
        .ok_or(RenderError::NoSurfaceFormat)
}

/// Configured mode if supported, then MAILBOX (no vsync, no tearing),
/// then FIFO which is always available
pub fn choose_present_mode(
    modes: &[vk::PresentModeKHR],
    preferred: vk::PresentModeKHR,
) -> vk::PresentModeKHR {
    [preferred, vk::PresentModeKHR::MAILBOX]
        .into_iter()
        .find(|mode| modes.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, requested: vk::Extent2D) -> vk::Extent2D {
    // u32::MAX means the surface size is decided by the swapchain
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }
    vk::Extent2D {
        width: requested
            .width
            .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: requested
            .height
            .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// One more than the driver minimum; a zero maximum means unbounded
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}

/// One generation of image-dependent objects
struct SwapchainResources<G: Gpu> {
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
    /// Keyed by image, since presentation follows the acquired image
    render_finished: Vec<vk::Semaphore>,
    /// Fence of the frame slot that last targeted each image
    images_in_flight: Vec<Option<vk::Fence>>,
    format: vk::Format,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    gpu: Arc<G>,
}

impl<G: Gpu> SwapchainResources<G> {
    fn empty(gpu: &Arc<G>) -> Self {
        Self {
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            image_views: Vec::new(),
            render_pass: vk::RenderPass::null(),
            framebuffers: Vec::new(),
            render_finished: Vec::new(),
            images_in_flight: Vec::new(),
            format: vk::Format::UNDEFINED,
            extent: vk::Extent2D::default(),
            present_mode: vk::PresentModeKHR::FIFO,
            gpu: gpu.clone(),
        }
    }

    fn build(gpu: &Arc<G>, requested: vk::Extent2D, config: &SwapchainConfig) -> RenderResult<Self> {
        let support = gpu.surface_support()?;
        let surface_format = choose_surface_format(&support.formats)?;
        let desc = SwapchainDesc {
            min_image_count: choose_image_count(&support.capabilities),
            format: surface_format,
            extent: choose_extent(&support.capabilities, requested),
            present_mode: choose_present_mode(&support.present_modes, config.preferred_present_mode),
            pre_transform: support.capabilities.current_transform,
        };

        // Anything created before an early return is released by Drop
        let mut res = Self::empty(gpu);
        res.format = desc.format.format;
        res.extent = desc.extent;
        res.present_mode = desc.present_mode;

        res.swapchain = gpu.create_swapchain(&desc)?;
        res.images = gpu.swapchain_images(res.swapchain)?;

        for &image in &res.images {
            let view = gpu.create_image_view(image, res.format)?;
            res.image_views.push(view);
        }

        res.render_pass = gpu.create_render_pass(res.format)?;

        for &view in &res.image_views {
            let framebuffer = gpu.create_framebuffer(res.render_pass, view, res.extent)?;
            res.framebuffers.push(framebuffer);
        }

        for _ in &res.images {
            let semaphore = gpu.create_semaphore()?;
            res.render_finished.push(semaphore);
        }
        res.images_in_flight = vec![None; res.images.len()];

        log::info!(
            "Created swapchain: {}x{}, {} images, {:?} / {:?}, present mode {:?}",
            res.extent.width,
            res.extent.height,
            res.images.len(),
            surface_format.format,
            surface_format.color_space,
            res.present_mode
        );

        Ok(res)
    }
}

impl<G: Gpu> Drop for SwapchainResources<G> {
    fn drop(&mut self) {
        let gpu = &self.gpu;
        for &framebuffer in &self.framebuffers {
            gpu.destroy_framebuffer(framebuffer);
        }
        if self.render_pass != vk::RenderPass::null() {
            gpu.destroy_render_pass(self.render_pass);
        }
        for &view in &self.image_views {
            gpu.destroy_image_view(view);
        }
        for &semaphore in &self.render_finished {
            gpu.destroy_semaphore(semaphore);
        }
        // Images are owned by the swapchain itself
        if self.swapchain != vk::SwapchainKHR::null() {
            gpu.destroy_swapchain(self.swapchain);
        }
    }
}

pub struct Swapchain<G: Gpu> {
    resources: SwapchainResources<G>,
    generation: SwapchainGeneration,
    config: SwapchainConfig,
    gpu: Arc<G>,
}

impl<G: Gpu> Swapchain<G> {
    pub fn new(gpu: Arc<G>, extent: vk::Extent2D, config: SwapchainConfig) -> RenderResult<Self> {
        log::info!("Creating swapchain: {}x{}", extent.width, extent.height);
        let resources = SwapchainResources::build(&gpu, extent, &config)?;
        Ok(Self {
            resources,
            generation: SwapchainGeneration::default(),
            config,
            gpu,
        })
    }

    /// Acquire the next image for the given frame slot.
    ///
    /// Blocks until the slot's previous submission has finished, which caps
    /// the number of outstanding frames at the slot count. If the acquired
    /// image is still being rendered by another slot, blocks on that too.
    pub fn acquire(&mut self, frame: &FrameSync<G>) -> RenderResult<Acquire> {
        self.gpu.wait_for_fence(frame.in_flight_fence, WAIT_FOREVER)?;

        let result = self.gpu.acquire_next_image(
            self.resources.swapchain,
            frame.image_available,
            WAIT_FOREVER,
        );
        let (index, suboptimal) = match result {
            Ok(acquired) => acquired,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => return Ok(Acquire::OutOfDate),
            Err(e) => return Err(RenderError::call("acquire next image", e)),
        };

        let slot = index as usize;
        if let Some(previous) = self.resources.images_in_flight[slot] {
            if previous != frame.in_flight_fence {
                self.gpu.wait_for_fence(previous, WAIT_FOREVER)?;
            }
        }
        self.resources.images_in_flight[slot] = Some(frame.in_flight_fence);

        Ok(if suboptimal {
            Acquire::Suboptimal(index)
        } else {
            Acquire::Ready(index)
        })
    }

    /// Present a rendered image once its render-finished semaphore fires
    pub fn present(&self, image_index: u32) -> RenderResult<SurfaceStatus> {
        let wait = self.render_finished(image_index);
        match self
            .gpu
            .queue_present(self.resources.swapchain, image_index, wait)
        {
            Ok(false) => Ok(SurfaceStatus::Ready),
            Ok(true) => Ok(SurfaceStatus::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(SurfaceStatus::OutOfDate),
            Err(e) => Err(RenderError::call("queue present", e)),
        }
    }

    /// Rebuild every image-dependent object for a new extent.
    ///
    /// The extent must be non-zero; the renderer defers recreation while
    /// the window is minimized.
    pub fn recreate(&mut self, extent: vk::Extent2D) -> RenderResult<()> {
        log::info!("Recreating swapchain: {}x{}", extent.width, extent.height);

        // No submission may still reference the old generation
        self.gpu.wait_idle()?;

        let old = std::mem::replace(&mut self.resources, SwapchainResources::empty(&self.gpu));
        drop(old);

        self.resources = SwapchainResources::build(&self.gpu, extent, &self.config)?;
        self.generation = self.generation.next();
        log::debug!("Swapchain generation {:?}", self.generation);
        Ok(())
    }

    pub fn generation(&self) -> SwapchainGeneration {
        self.generation
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.resources.swapchain
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.resources.extent
    }

    pub fn format(&self) -> vk::Format {
        self.resources.format
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.resources.present_mode
    }

    pub fn render_pass(&self) -> vk::RenderPass {
        self.resources.render_pass
    }

    pub fn image_count(&self) -> usize {
        self.resources.images.len()
    }

    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.resources.image_views
    }

    pub fn framebuffers(&self) -> &[vk::Framebuffer] {
        &self.resources.framebuffers
    }

    pub fn framebuffer(&self, image_index: u32) -> vk::Framebuffer {
        self.resources.framebuffers[image_index as usize]
    }

    pub fn render_finished(&self, image_index: u32) -> vk::Semaphore {
        self.resources.render_finished[image_index as usize]
    }

    pub fn render_finished_count(&self) -> usize {
        self.resources.render_finished.len()
    }

    pub fn image_in_flight(&self, image_index: u32) -> Option<vk::Fence> {
        self.resources.images_in_flight[image_index as usize]
    }
}
