// Renderer error taxonomy
//
// Every native call failure becomes a typed error. Surface invalidation
// (out-of-date / suboptimal) is NOT an error: it travels as a status value
// and is absorbed by the renderer through swapchain recreation.

use ash::vk;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// begin/end/render-pass calls made out of state-machine order
    #[error("precondition violated: {0}")]
    PreconditionViolation(&'static str),

    #[error("failed to create {resource}: {result}")]
    ResourceCreation {
        resource: &'static str,
        result: vk::Result,
    },

    #[error("device lost")]
    DeviceLost,

    #[error("{operation} failed: {result}")]
    Vulkan {
        operation: &'static str,
        result: vk::Result,
    },

    #[error("failed to load Vulkan: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("allocator error: {0}")]
    Allocation(#[from] gpu_allocator::AllocationError),

    #[error("no GPU with graphics and present support found")]
    NoSuitableGpu,

    #[error("unsupported window system")]
    UnsupportedPlatform,

    #[error("surface reports no formats")]
    NoSurfaceFormat,

    #[error("failed to load shader {path:?}: {source}")]
    Shader {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type RenderResult<T> = Result<T, RenderError>;

impl RenderError {
    /// A create call failed
    pub fn creation(resource: &'static str, result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_DEVICE_LOST => RenderError::DeviceLost,
            result => RenderError::ResourceCreation { resource, result },
        }
    }

    /// Any other native call failed
    pub fn call(operation: &'static str, result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_DEVICE_LOST => RenderError::DeviceLost,
            result => RenderError::Vulkan { operation, result },
        }
    }
}
