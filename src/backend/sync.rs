// Synchronization primitives
//
// Fences and semaphores for GPU-CPU and GPU-GPU sync. Frame-slot objects
// live for the whole engine lifetime and are never rebuilt on resize;
// per-image objects belong to the swapchain (see swapchain.rs).

use ash::vk;
use std::sync::Arc;

use super::Gpu;
use crate::error::RenderResult;

/// Frame synchronization - one per frame in flight
pub struct FrameSync<G: Gpu> {
    /// Signaled by acquire, waited on by the submission at color output
    pub image_available: vk::Semaphore,
    /// Signaled when the slot's submission completes on the GPU
    pub in_flight_fence: vk::Fence,
    gpu: Arc<G>,
}

impl<G: Gpu> FrameSync<G> {
    pub fn new(gpu: &Arc<G>) -> RenderResult<Self> {
        // Fill in place so a failure halfway still releases what was made
        let mut sync = Self {
            image_available: vk::Semaphore::null(),
            in_flight_fence: vk::Fence::null(),
            gpu: gpu.clone(),
        };
        sync.image_available = gpu.create_semaphore()?;
        // Start signaled so the first wait on a fresh slot returns at once
        sync.in_flight_fence = gpu.create_fence(true)?;
        Ok(sync)
    }

    /// Create `count` frame slots
    pub fn pool(gpu: &Arc<G>, count: usize) -> RenderResult<Vec<Self>> {
        (0..count).map(|_| Self::new(gpu)).collect()
    }
}

impl<G: Gpu> Drop for FrameSync<G> {
    fn drop(&mut self) {
        if self.image_available != vk::Semaphore::null() {
            self.gpu.destroy_semaphore(self.image_available);
        }
        if self.in_flight_fence != vk::Fence::null() {
            self.gpu.destroy_fence(self.in_flight_fence);
        }
    }
}

/// Command pool with one primary command buffer per frame slot
pub struct CommandPool<G: Gpu> {
    pool: vk::CommandPool,
    buffers: Vec<vk::CommandBuffer>,
    gpu: Arc<G>,
}

impl<G: Gpu> CommandPool<G> {
    pub fn new(gpu: &Arc<G>, count: usize) -> RenderResult<Self> {
        let mut pool = Self {
            pool: gpu.create_command_pool()?,
            buffers: Vec::new(),
            gpu: gpu.clone(),
        };
        pool.buffers = gpu.allocate_command_buffers(pool.pool, count as u32)?;
        Ok(pool)
    }

    pub fn buffer(&self, slot: usize) -> vk::CommandBuffer {
        self.buffers[slot]
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }
}

impl<G: Gpu> Drop for CommandPool<G> {
    fn drop(&mut self) {
        // Destroying the pool frees its command buffers
        self.gpu.destroy_command_pool(self.pool);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockGpu;

    #[test]
    fn frame_slots_start_signaled_and_release_everything() {
        let gpu = Arc::new(MockGpu::new(3));
        {
            let slots = FrameSync::pool(&gpu, 2).unwrap();
            assert_eq!(slots.len(), 2);
            for slot in &slots {
                assert!(gpu.fence_signaled(slot.in_flight_fence));
            }
            assert_eq!(gpu.live_count(), 4);
        }
        assert_eq!(gpu.live_count(), 0);
    }

    #[test]
    fn half_built_slot_is_released() {
        let gpu = Arc::new(MockGpu::new(3));
        gpu.fail_next_create("fence");
        assert!(FrameSync::new(&gpu).is_err());
        assert_eq!(gpu.live_count(), 0);
    }

    #[test]
    fn command_pool_allocates_one_buffer_per_slot() {
        let gpu = Arc::new(MockGpu::new(3));
        let pool = CommandPool::new(&gpu, 2).unwrap();
        assert_eq!(pool.len(), 2);
        assert_ne!(pool.buffer(0), pool.buffer(1));
        drop(pool);
        assert_eq!(gpu.live_count(), 0);
    }
}
