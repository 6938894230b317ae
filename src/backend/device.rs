// Vulkan Device - Core GPU interface
//
// Responsibilities:
// - Instance creation with surface extensions and optional validation
// - Window surface creation
// - Physical device selection (graphics + present, prefer discrete GPU)
// - Logical device + queue creation
// - Memory allocator setup
// - The Gpu implementation the frame engine drives

use ash::extensions::{ext::DebugUtils, khr};
use ash::prelude::VkResult;
use ash::{vk, Entry};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use parking_lot::Mutex;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{CStr, CString};
use std::mem::ManuallyDrop;
use std::sync::Arc;

use super::gpu::{Gpu, Submission, SurfaceSupport, SwapchainDesc};
use super::{pipeline, surface};
use crate::error::{RenderError, RenderResult};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Queue families chosen for a physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueFamilies {
    graphics: u32,
    present: u32,
}

/// Vulkan device wrapper with automatic cleanup
pub struct VulkanDevice {
    // Freed before the device in Drop
    pub(crate) allocator: ManuallyDrop<Mutex<Allocator>>,
    pub device: ash::Device,
    pub physical_device: vk::PhysicalDevice,
    pub instance: ash::Instance,
    _entry: Entry,

    surface_loader: khr::Surface,
    surface: vk::SurfaceKHR,
    swapchain_loader: khr::Swapchain,

    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,
    pub present_queue: vk::Queue,
    pub present_queue_family: u32,

    // Debug utils (if validation enabled)
    debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,

    pub properties: vk::PhysicalDeviceProperties,
}

impl VulkanDevice {
    /// Create the device and a presentation surface for `window`
    ///
    /// # Arguments
    /// * `app_name` - Application name for debugging
    /// * `enable_validation` - Enable Vulkan validation layers
    /// * `window` - Window the swapchain will present to
    pub fn new<W>(app_name: &str, enable_validation: bool, window: &W) -> RenderResult<Arc<Self>>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        log::info!("Creating Vulkan device: {}", app_name);

        let display_handle = window
            .display_handle()
            .map_err(|_| RenderError::UnsupportedPlatform)?
            .as_raw();
        let window_handle = window
            .window_handle()
            .map_err(|_| RenderError::UnsupportedPlatform)?
            .as_raw();

        let entry = unsafe { Entry::load() }?;

        let instance = Self::create_instance(
            &entry,
            app_name,
            enable_validation,
            surface::required_extensions(display_handle)?,
        )?;

        let debug_utils = if enable_validation {
            match Self::setup_debug_messenger(&entry, &instance) {
                Ok(messenger) => Some(messenger),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        let surface_loader = khr::Surface::new(&entry, &instance);
        let surface =
            match unsafe { surface::create_surface(&entry, &instance, display_handle, window_handle) } {
                Ok(surface) => surface,
                Err(e) => {
                    unsafe { Self::destroy_instance(&instance, debug_utils) };
                    return Err(e);
                }
            };

        let picked = Self::pick_physical_device(&instance, &surface_loader, surface).and_then(
            |(physical_device, families)| {
                Self::create_logical_device(&instance, physical_device, families)
                    .map(|device| (physical_device, families, device))
            },
        );
        let (physical_device, families, device) = match picked {
            Ok(picked) => picked,
            Err(e) => {
                unsafe {
                    surface_loader.destroy_surface(surface, None);
                    Self::destroy_instance(&instance, debug_utils);
                }
                return Err(e);
            }
        };

        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        log::info!(
            "Selected GPU: {}",
            unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }.to_string_lossy()
        );
        log::info!(
            "Queue families: graphics {}, present {}",
            families.graphics,
            families.present
        );

        let allocator = match Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        }) {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe {
                    device.destroy_device(None);
                    surface_loader.destroy_surface(surface, None);
                    Self::destroy_instance(&instance, debug_utils);
                }
                return Err(e.into());
            }
        };

        let graphics_queue = unsafe { device.get_device_queue(families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(families.present, 0) };
        let swapchain_loader = khr::Swapchain::new(&instance, &device);

        Ok(Arc::new(Self {
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            device,
            physical_device,
            instance,
            _entry: entry,
            surface_loader,
            surface,
            swapchain_loader,
            graphics_queue,
            graphics_queue_family: families.graphics,
            present_queue,
            present_queue_family: families.present,
            debug_utils,
            properties,
        }))
    }

    fn create_instance(
        entry: &Entry,
        app_name: &str,
        enable_validation: bool,
        surface_extensions: Vec<&'static CStr>,
    ) -> RenderResult<ash::Instance> {
        let app_name_cstr = CString::new(app_name).unwrap_or_default();
        let engine_name = c"Iro";

        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(engine_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_2);

        let mut extensions: Vec<_> = surface_extensions.iter().map(|name| name.as_ptr()).collect();
        if enable_validation {
            extensions.push(DebugUtils::name().as_ptr());
        }

        let layer_names = if enable_validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names);

        unsafe { entry.create_instance(&create_info, None) }
            .map_err(|e| RenderError::creation("instance", e))
    }

    fn setup_debug_messenger(
        entry: &Entry,
        instance: &ash::Instance,
    ) -> RenderResult<(DebugUtils, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = DebugUtils::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
            .map_err(|e| RenderError::creation("debug messenger", e))?;

        Ok((debug_utils, messenger))
    }

    fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &khr::Surface,
        surface: vk::SurfaceKHR,
    ) -> RenderResult<(vk::PhysicalDevice, QueueFamilies)> {
        let devices = unsafe { instance.enumerate_physical_devices() }
            .map_err(|e| RenderError::call("enumerate physical devices", e))?;

        let mut best_device = None;
        let mut best_score = 0;

        for device in devices {
            if !Self::supports_swapchain(instance, device) {
                continue;
            }
            let Some(families) = Self::find_queue_families(instance, surface_loader, surface, device)
            else {
                continue;
            };

            let props = unsafe { instance.get_physical_device_properties(device) };
            let mut score = match props.device_type {
                vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
                vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
                _ => 1,
            };
            // One queue for both is slightly cheaper to drive
            if families.graphics == families.present {
                score += 10;
            }

            if score > best_score {
                best_score = score;
                best_device = Some((device, families));
            }
        }

        best_device.ok_or(RenderError::NoSuitableGpu)
    }

    fn supports_swapchain(instance: &ash::Instance, device: vk::PhysicalDevice) -> bool {
        let Ok(extensions) = (unsafe { instance.enumerate_device_extension_properties(device) })
        else {
            return false;
        };
        has_extension(&extensions, khr::Swapchain::name())
    }

    fn find_queue_families(
        instance: &ash::Instance,
        surface_loader: &khr::Surface,
        surface: vk::SurfaceKHR,
        device: vk::PhysicalDevice,
    ) -> Option<QueueFamilies> {
        let queue_families =
            unsafe { instance.get_physical_device_queue_family_properties(device) };

        let can_present = |index: u32| {
            let supported = unsafe {
                surface_loader.get_physical_device_surface_support(device, index, surface)
            };
            supported.unwrap_or(false)
        };

        let graphics: Vec<u32> = queue_families
            .iter()
            .enumerate()
            .filter(|(_, props)| props.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|(i, _)| i as u32)
            .collect();

        // Prefer a family that does both
        if let Some(&family) = graphics.iter().find(|&&i| can_present(i)) {
            return Some(QueueFamilies {
                graphics: family,
                present: family,
            });
        }

        let graphics = *graphics.first()?;
        let present = (0..queue_families.len() as u32).find(|&i| can_present(i))?;
        Some(QueueFamilies { graphics, present })
    }

    fn create_logical_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        families: QueueFamilies,
    ) -> RenderResult<ash::Device> {
        let queue_priorities = [1.0];
        let mut unique_families = vec![families.graphics];
        if families.present != families.graphics {
            unique_families.push(families.present);
        }
        let queue_create_infos: Vec<_> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
                    .build()
            })
            .collect();

        let extensions = [khr::Swapchain::name().as_ptr()];
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        unsafe { instance.create_device(physical_device, &create_info, None) }
            .map_err(|e| RenderError::creation("logical device", e))
    }

    unsafe fn destroy_instance(
        instance: &ash::Instance,
        debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
    ) {
        if let Some((debug_utils, messenger)) = debug_utils {
            debug_utils.destroy_debug_utils_messenger(messenger, None);
        }
        instance.destroy_instance(None);
    }

    /// Wait for device to be idle (e.g., before cleanup)
    pub fn wait_idle(&self) -> RenderResult<()> {
        unsafe { self.device.device_wait_idle() }.map_err(|e| RenderError::call("device wait idle", e))
    }

    fn families_differ(&self) -> bool {
        self.graphics_queue_family != self.present_queue_family
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan device...");

        if let Err(e) = self.wait_idle() {
            log::warn!("Device did not go idle before teardown: {}", e);
        }

        unsafe {
            // The allocator frees its memory blocks through the device
            ManuallyDrop::drop(&mut self.allocator);
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            Self::destroy_instance(&self.instance, self.debug_utils.take());
        }
    }
}

impl Gpu for VulkanDevice {
    fn create_semaphore(&self) -> RenderResult<vk::Semaphore> {
        let info = vk::SemaphoreCreateInfo::builder();
        unsafe { self.device.create_semaphore(&info, None) }
            .map_err(|e| RenderError::creation("semaphore", e))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) }
    }

    fn create_fence(&self, signaled: bool) -> RenderResult<vk::Fence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let info = vk::FenceCreateInfo::builder().flags(flags);
        unsafe { self.device.create_fence(&info, None) }
            .map_err(|e| RenderError::creation("fence", e))
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device.destroy_fence(fence, None) }
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> RenderResult<()> {
        unsafe { self.device.wait_for_fences(&[fence], true, timeout) }
            .map_err(|e| RenderError::call("wait for fence", e))
    }

    fn reset_fence(&self, fence: vk::Fence) -> RenderResult<()> {
        unsafe { self.device.reset_fences(&[fence]) }
            .map_err(|e| RenderError::call("reset fence", e))
    }

    fn wait_idle(&self) -> RenderResult<()> {
        VulkanDevice::wait_idle(self)
    }

    fn surface_support(&self) -> RenderResult<SurfaceSupport> {
        let query = |e| RenderError::call("query surface support", e);
        unsafe {
            Ok(SurfaceSupport {
                capabilities: self
                    .surface_loader
                    .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                    .map_err(query)?,
                formats: self
                    .surface_loader
                    .get_physical_device_surface_formats(self.physical_device, self.surface)
                    .map_err(query)?,
                present_modes: self
                    .surface_loader
                    .get_physical_device_surface_present_modes(self.physical_device, self.surface)
                    .map_err(query)?,
            })
        }
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> RenderResult<vk::SwapchainKHR> {
        let families = [self.graphics_queue_family, self.present_queue_family];

        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(self.surface)
            .min_image_count(desc.min_image_count)
            .image_format(desc.format.format)
            .image_color_space(desc.format.color_space)
            .image_extent(desc.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(desc.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(desc.present_mode)
            .clipped(true);

        // Images are shared when graphics and present live on different queues
        create_info = if self.families_differ() {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&families)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        unsafe { self.swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(|e| RenderError::creation("swapchain", e))
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> RenderResult<Vec<vk::Image>> {
        unsafe { self.swapchain_loader.get_swapchain_images(swapchain) }
            .map_err(|e| RenderError::call("get swapchain images", e))
    }

    fn create_image_view(&self, image: vk::Image, format: vk::Format) -> RenderResult<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe { self.device.create_image_view(&create_info, None) }
            .map_err(|e| RenderError::creation("image view", e))
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) }
    }

    fn create_render_pass(&self, format: vk::Format) -> RenderResult<vk::RenderPass> {
        pipeline::create_render_pass(&self.device, format)
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.device.destroy_render_pass(render_pass, None) }
    }

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> RenderResult<vk::Framebuffer> {
        pipeline::create_framebuffer(&self.device, render_pass, view, extent)
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.device.destroy_framebuffer(framebuffer, None) }
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
        timeout: u64,
    ) -> VkResult<(u32, bool)> {
        unsafe {
            self.swapchain_loader
                .acquire_next_image(swapchain, timeout, signal, vk::Fence::null())
        }
    }

    fn queue_present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool> {
        let wait_semaphores = [wait];
        let swapchains = [swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            self.swapchain_loader
                .queue_present(self.present_queue, &present_info)
        }
    }

    fn create_command_pool(&self) -> RenderResult<vk::CommandPool> {
        let create_info = vk::CommandPoolCreateInfo::builder()
            .queue_family_index(self.graphics_queue_family)
            .flags(
                vk::CommandPoolCreateFlags::TRANSIENT
                    | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            );
        unsafe { self.device.create_command_pool(&create_info, None) }
            .map_err(|e| RenderError::creation("command pool", e))
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { self.device.destroy_command_pool(pool, None) }
    }

    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> RenderResult<Vec<vk::CommandBuffer>> {
        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);
        unsafe { self.device.allocate_command_buffers(&allocate_info) }
            .map_err(|e| RenderError::creation("command buffers", e))
    }

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> RenderResult<()> {
        unsafe {
            self.device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
        }
        .map_err(|e| RenderError::call("reset command buffer", e))
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> RenderResult<()> {
        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.device.begin_command_buffer(cmd, &begin_info) }
            .map_err(|e| RenderError::call("begin command buffer", e))
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> RenderResult<()> {
        unsafe { self.device.end_command_buffer(cmd) }
            .map_err(|e| RenderError::call("end command buffer", e))
    }

    fn queue_submit(&self, submission: &Submission) -> RenderResult<()> {
        let wait_semaphores = [submission.wait_semaphore];
        let wait_stages = [submission.wait_stage];
        let command_buffers = [submission.command_buffer];
        let signal_semaphores = [submission.signal_semaphore];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            self.device
                .queue_submit(self.graphics_queue, &[submit_info], submission.fence)
        }
        .map_err(|e| RenderError::call("queue submit", e))
    }

    fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_color: [f32; 4],
    ) {
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: clear_color,
            },
        }];
        let begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values);

        unsafe {
            self.device
                .cmd_begin_render_pass(cmd, &begin_info, vk::SubpassContents::INLINE)
        }
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        unsafe { self.device.cmd_end_render_pass(cmd) }
    }

    fn cmd_set_viewport(&self, cmd: vk::CommandBuffer, viewport: vk::Viewport) {
        unsafe { self.device.cmd_set_viewport(cmd, 0, &[viewport]) }
    }

    fn cmd_set_scissor(&self, cmd: vk::CommandBuffer, scissor: vk::Rect2D) {
        unsafe { self.device.cmd_set_scissor(cmd, 0, &[scissor]) }
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline)
        }
    }

    fn cmd_push_constants(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        data: &[u8],
    ) {
        unsafe { self.device.cmd_push_constants(cmd, layout, stages, 0, data) }
    }

    fn cmd_bind_vertex_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer) {
        unsafe { self.device.cmd_bind_vertex_buffers(cmd, 0, &[buffer], &[0]) }
    }

    fn cmd_bind_index_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer) {
        unsafe {
            self.device
                .cmd_bind_index_buffer(cmd, buffer, 0, vk::IndexType::UINT32)
        }
    }

    fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32) {
        unsafe { self.device.cmd_draw(cmd, vertex_count, 1, 0, 0) }
    }

    fn cmd_draw_indexed(&self, cmd: vk::CommandBuffer, index_count: u32) {
        unsafe { self.device.cmd_draw_indexed(cmd, index_count, 1, 0, 0, 0) }
    }

    fn create_graphics_pipeline(
        &self,
        render_pass: vk::RenderPass,
        vertex_spirv: &[u32],
        fragment_spirv: &[u32],
    ) -> RenderResult<(vk::Pipeline, vk::PipelineLayout)> {
        pipeline::create_graphics_pipeline(&self.device, render_pass, vertex_spirv, fragment_spirv)
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline, layout: vk::PipelineLayout) {
        unsafe {
            self.device.destroy_pipeline(pipeline, None);
            self.device.destroy_pipeline_layout(layout, None);
        }
    }
}

// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*p_callback_data).p_message).to_string_lossy();

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => log::error!("[Vulkan] {}", message),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => log::warn!("[Vulkan] {}", message),
        _ => log::debug!("[Vulkan] {}", message),
    }

    vk::FALSE
}

/// Whether `name` is among the reported device extensions
fn has_extension(extensions: &[vk::ExtensionProperties], name: &CStr) -> bool {
    extensions.iter().any(|ext| {
        let bytes: &[u8] = bytemuck::cast_slice(&ext.extension_name);
        CStr::from_bytes_until_nul(bytes).is_ok_and(|ext_name| ext_name == name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extension(name: &CStr) -> vk::ExtensionProperties {
        let mut props = vk::ExtensionProperties::default();
        for (dst, &src) in props.extension_name.iter_mut().zip(name.to_bytes()) {
            *dst = src as std::ffi::c_char;
        }
        props
    }

    #[test]
    fn swapchain_extension_is_found_by_name() {
        let extensions = [
            extension(khr::Surface::name()),
            extension(khr::Swapchain::name()),
        ];
        assert!(has_extension(&extensions, khr::Swapchain::name()));
        assert!(!has_extension(&extensions[..1], khr::Swapchain::name()));
        assert!(!has_extension(&[], khr::Swapchain::name()));
    }

    #[test]
    fn prefix_of_a_name_does_not_match() {
        let extensions = [extension(c"VK_KHR_swap")];
        assert!(!has_extension(&extensions, khr::Swapchain::name()));
    }
}
