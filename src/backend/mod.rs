// Backend module - Vulkan abstraction layer
//
// Everything the frame engine touches goes through the Gpu trait, so the
// swapchain and sync code is written once and driven either by the real
// device or by the recording mock in tests.

pub mod buffer;
pub mod device;
pub mod gpu;
pub mod pipeline;
pub mod shader;
pub mod surface;
pub mod swapchain;
pub mod sync;

#[cfg(test)]
pub mod mock;

pub use buffer::GpuBuffer;
pub use device::VulkanDevice;
pub use gpu::Gpu;
pub use pipeline::{Pipeline, ShaderSet};
pub use swapchain::{Swapchain, SwapchainConfig};
pub use sync::{CommandPool, FrameSync};
