// Host-visible geometry buffers
//
// Vertex and index data for UI primitives is small and rewritten rarely,
// so it lives in CPU-to-GPU memory from the device allocator and is
// written through a persistent mapping.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use super::VulkanDevice;
use crate::error::{RenderError, RenderResult};

pub struct GpuBuffer {
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    /// Number of elements written at creation
    count: u32,
    device: Arc<VulkanDevice>,
}

impl GpuBuffer {
    /// Create a buffer sized for `data` and fill it
    pub fn with_data<T: bytemuck::Pod>(
        device: &Arc<VulkanDevice>,
        name: &str,
        usage: vk::BufferUsageFlags,
        data: &[T],
    ) -> RenderResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);

        let buffer_info = vk::BufferCreateInfo::builder()
            .size(bytes.len() as vk::DeviceSize)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.device.create_buffer(&buffer_info, None) }
            .map_err(|e| RenderError::creation("buffer", e))?;

        // From here on Drop releases whatever has been set up
        let mut gpu_buffer = Self {
            buffer,
            allocation: None,
            count: data.len() as u32,
            device: device.clone(),
        };

        let requirements = unsafe { device.device.get_buffer_memory_requirements(buffer) };
        let mut allocation = device.allocator.lock().allocate(&AllocationCreateDesc {
            name,
            requirements,
            location: MemoryLocation::CpuToGpu,
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })?;

        let bind = unsafe {
            device
                .device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        };
        let written = allocation
            .mapped_slice_mut()
            .map(|slice| slice[..bytes.len()].copy_from_slice(bytes))
            .is_some();
        gpu_buffer.allocation = Some(allocation);
        bind.map_err(|e| RenderError::call("bind buffer memory", e))?;

        if !written {
            return Err(RenderError::call(
                "map buffer memory",
                vk::Result::ERROR_MEMORY_MAP_FAILED,
            ));
        }

        Ok(gpu_buffer)
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_buffer(self.buffer, None);
        }
        if let Some(allocation) = self.allocation.take() {
            if let Err(e) = self.device.allocator.lock().free(allocation) {
                log::warn!("Failed to free buffer memory: {}", e);
            }
        }
    }
}
