// Graphics pipeline creation and management
//
// One fixed pipeline draws every primitive. Viewport and scissor are
// dynamic state, so a resized swapchain never forces a pipeline change
// beyond the rebuild against the new render pass.

use ash::vk;
use std::ffi::CStr;
use std::sync::Arc;

use super::Gpu;
use crate::error::{RenderError, RenderResult};
use crate::renderer::draw::{PushConstants, Vertex};

/// Stages that read the push-constant block
pub const PUSH_CONSTANT_STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
    vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw(),
);

const ENTRY_POINT: &CStr = c"main";

/// Bound pipeline plus the layout used for push-constant writes
pub struct Pipeline<G: Gpu> {
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    gpu: Arc<G>,
}

impl<G: Gpu> Pipeline<G> {
    pub fn new(gpu: &Arc<G>, render_pass: vk::RenderPass, shaders: &ShaderSet) -> RenderResult<Self> {
        let (pipeline, layout) =
            gpu.create_graphics_pipeline(render_pass, &shaders.vertex, &shaders.fragment)?;
        log::debug!("Created graphics pipeline");
        Ok(Self {
            pipeline,
            layout,
            gpu: gpu.clone(),
        })
    }

    pub fn bind(&self, cmd: vk::CommandBuffer) {
        self.gpu.cmd_bind_pipeline(cmd, self.pipeline);
    }

    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl<G: Gpu> Drop for Pipeline<G> {
    fn drop(&mut self) {
        self.gpu.destroy_pipeline(self.pipeline, self.layout);
    }
}

/// SPIR-V words for the vertex and fragment stages
#[derive(Debug, Clone, Default)]
pub struct ShaderSet {
    pub vertex: Vec<u32>,
    pub fragment: Vec<u32>,
}

/// Create a render pass for a single color attachment that ends up presentable
pub fn create_render_pass(device: &ash::Device, format: vk::Format) -> RenderResult<vk::RenderPass> {
    let color_attachment = vk::AttachmentDescription::builder()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        .build();

    let color_attachment_ref = vk::AttachmentReference::builder()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .build();

    let color_attachments = &[color_attachment_ref];
    let subpass = vk::SubpassDescription::builder()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(color_attachments)
        .build();

    // The image-available wait happens at color output, so the layout
    // transition must not start before it
    let dependency = vk::SubpassDependency::builder()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
        .build();

    let attachments = &[color_attachment];
    let subpasses = &[subpass];
    let dependencies = &[dependency];

    let render_pass_info = vk::RenderPassCreateInfo::builder()
        .attachments(attachments)
        .subpasses(subpasses)
        .dependencies(dependencies);

    unsafe { device.create_render_pass(&render_pass_info, None) }
        .map_err(|e| RenderError::creation("render pass", e))
}

/// Create the framebuffer for one swapchain image view
pub fn create_framebuffer(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    image_view: vk::ImageView,
    extent: vk::Extent2D,
) -> RenderResult<vk::Framebuffer> {
    let attachments = &[image_view];
    let framebuffer_info = vk::FramebufferCreateInfo::builder()
        .render_pass(render_pass)
        .attachments(attachments)
        .width(extent.width)
        .height(extent.height)
        .layers(1);

    unsafe { device.create_framebuffer(&framebuffer_info, None) }
        .map_err(|e| RenderError::creation("framebuffer", e))
}

fn create_shader_module(device: &ash::Device, code: &[u32]) -> RenderResult<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::builder().code(code);
    unsafe { device.create_shader_module(&create_info, None) }
        .map_err(|e| RenderError::creation("shader module", e))
}

/// Build the primitive pipeline against a render pass
pub fn create_graphics_pipeline(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    vertex_spirv: &[u32],
    fragment_spirv: &[u32],
) -> RenderResult<(vk::Pipeline, vk::PipelineLayout)> {
    let vert_shader = create_shader_module(device, vertex_spirv)?;
    let frag_shader = match create_shader_module(device, fragment_spirv) {
        Ok(module) => module,
        Err(e) => {
            unsafe { device.destroy_shader_module(vert_shader, None) };
            return Err(e);
        }
    };

    let result = build_pipeline(device, render_pass, vert_shader, frag_shader);

    // Modules are only needed while the pipeline is being built
    unsafe {
        device.destroy_shader_module(frag_shader, None);
        device.destroy_shader_module(vert_shader, None);
    }
    result
}

fn build_pipeline(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    vert_shader: vk::ShaderModule,
    frag_shader: vk::ShaderModule,
) -> RenderResult<(vk::Pipeline, vk::PipelineLayout)> {
    let vert_stage = vk::PipelineShaderStageCreateInfo::builder()
        .stage(vk::ShaderStageFlags::VERTEX)
        .module(vert_shader)
        .name(ENTRY_POINT)
        .build();

    let frag_stage = vk::PipelineShaderStageCreateInfo::builder()
        .stage(vk::ShaderStageFlags::FRAGMENT)
        .module(frag_shader)
        .name(ENTRY_POINT)
        .build();

    let shader_stages = &[vert_stage, frag_stage];

    let bindings = [Vertex::binding_description()];
    let attributes = Vertex::attribute_descriptions();
    let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::builder()
        .vertex_binding_descriptions(&bindings)
        .vertex_attribute_descriptions(&attributes);

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    // Counts only: the actual rectangles are set per frame
    let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
        .viewport_count(1)
        .scissor_count(1);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state =
        vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

    // No culling: 2D shapes come in either winding
    let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(vk::CullModeFlags::NONE)
        .front_face(vk::FrontFace::CLOCKWISE)
        .depth_bias_enable(false);

    let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
        .sample_shading_enable(false)
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let color_blend_attachment = vk::PipelineColorBlendAttachmentState::builder()
        .color_write_mask(vk::ColorComponentFlags::RGBA)
        .blend_enable(false)
        .build();

    let color_blend_attachments = &[color_blend_attachment];
    let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
        .logic_op_enable(false)
        .attachments(color_blend_attachments);

    let push_constant_range = vk::PushConstantRange::builder()
        .stage_flags(PUSH_CONSTANT_STAGES)
        .offset(0)
        .size(std::mem::size_of::<PushConstants>() as u32)
        .build();

    let push_constant_ranges = &[push_constant_range];
    let layout_info =
        vk::PipelineLayoutCreateInfo::builder().push_constant_ranges(push_constant_ranges);

    let pipeline_layout = unsafe { device.create_pipeline_layout(&layout_info, None) }
        .map_err(|e| RenderError::creation("pipeline layout", e))?;

    let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
        .stages(shader_stages)
        .vertex_input_state(&vertex_input_info)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterizer)
        .multisample_state(&multisampling)
        .color_blend_state(&color_blending)
        .dynamic_state(&dynamic_state)
        .layout(pipeline_layout)
        .render_pass(render_pass)
        .subpass(0)
        .build();

    let pipelines = unsafe {
        device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
    };

    match pipelines {
        Ok(pipelines) => Ok((pipelines[0], pipeline_layout)),
        Err((_, e)) => {
            unsafe { device.destroy_pipeline_layout(pipeline_layout, None) };
            Err(RenderError::creation("graphics pipeline", e))
        }
    }
}
