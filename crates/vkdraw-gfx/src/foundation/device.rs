use ash::vk;
use std::ffi::CString;
use vk_mem::Alloc;

use crate::{
    commands::transfer::GfxTransferRecorder,
    device_api::{GfxBufferDesc, GfxDeviceApi, GfxMemoryLocation, GfxTransferOp},
    error::{GfxError, GfxResult},
    resources::{image::GfxImageCreateInfo, image_view::GfxImageViewDesc, sampler::GfxSamplerDesc},
};

/// 基于 ash + vk-mem 的设备服务
///
/// ash::Device 和 queue 由外部创建并持有，这里只是借用；
/// 内存分配器由本对象创建，需要在 vkDestroyDevice 之前调用 [`GfxDevice::destroy`]。
///
/// 要求 device 开启 synchronization2 feature。
pub struct GfxDevice {
    device: ash::Device,
    allocator: vk_mem::Allocator,
    /// 用于一次性传输命令的 queue，需要支持 transfer
    queue: vk::Queue,
    /// 只有开启 debug utils 时才有值
    debug_utils: Option<ash::ext::debug_utils::Device>,
}

// 构造与销毁
impl GfxDevice {
    pub fn new(
        instance: &ash::Instance,
        pdevice: vk::PhysicalDevice,
        device: ash::Device,
        queue: vk::Queue,
        enable_debug_utils: bool,
    ) -> GfxResult<Self> {
        let mut vma_ci = vk_mem::AllocatorCreateInfo::new(instance, &device, pdevice);
        vma_ci.vulkan_api_version = vk::API_VERSION_1_3;
        let allocator = unsafe { vk_mem::Allocator::new(vma_ci)? };

        let debug_utils = enable_debug_utils.then(|| ash::ext::debug_utils::Device::new(instance, &device));
        log::info!("gfx device created, debug utils: {enable_debug_utils}");

        Ok(Self {
            device,
            allocator,
            queue,
            debug_utils,
        })
    }

    /// 释放内存分配器，ash::Device 本身由调用者销毁
    pub fn destroy(self) {
        log::info!("destroying gfx device");
        drop(self.allocator);
    }
}
// getter
impl GfxDevice {
    #[inline]
    pub fn vk_device(&self) -> &ash::Device {
        &self.device
    }

    #[inline]
    pub fn allocator(&self) -> &vk_mem::Allocator {
        &self.allocator
    }

    #[inline]
    pub fn queue(&self) -> vk::Queue {
        self.queue
    }
}
// tools
impl GfxDevice {
    fn allocation_create_info(location: GfxMemoryLocation) -> vk_mem::AllocationCreateInfo {
        let (usage, flags) = match location {
            GfxMemoryLocation::DeviceLocal => {
                (vk_mem::MemoryUsage::AutoPreferDevice, vk_mem::AllocationCreateFlags::empty())
            }
            GfxMemoryLocation::HostUpload => {
                (vk_mem::MemoryUsage::AutoPreferHost, vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE)
            }
            GfxMemoryLocation::HostReadback => {
                (vk_mem::MemoryUsage::AutoPreferHost, vk_mem::AllocationCreateFlags::HOST_ACCESS_RANDOM)
            }
        };
        vk_mem::AllocationCreateInfo {
            usage,
            flags,
            ..Default::default()
        }
    }

    /// 录制、提交并通过 fence 等待完成
    fn submit_and_wait(&self, command_buffer: vk::CommandBuffer, ops: &[GfxTransferOp]) -> GfxResult<()> {
        unsafe {
            self.device.begin_command_buffer(
                command_buffer,
                &vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT),
            )?;
            for op in ops {
                GfxTransferRecorder::record(&self.device, command_buffer, op);
            }
            self.device.end_command_buffer(command_buffer)?;

            let fence = self.device.create_fence(&vk::FenceCreateInfo::default(), None)?;
            let submit_info = vk::SubmitInfo::default().command_buffers(std::slice::from_ref(&command_buffer));
            let result = self
                .device
                .queue_submit(self.queue, std::slice::from_ref(&submit_info), fence)
                .and_then(|_| self.device.wait_for_fences(std::slice::from_ref(&fence), true, u64::MAX));
            self.device.destroy_fence(fence, None);

            result?;
        }
        Ok(())
    }
}

impl GfxDeviceApi for GfxDevice {
    type Allocation = vk_mem::Allocation;

    fn create_buffer(&self, desc: &GfxBufferDesc) -> GfxResult<(vk::Buffer, Self::Allocation)> {
        let buffer_ci = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(desc.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let alloc_ci = Self::allocation_create_info(desc.location);

        let (buffer, allocation) = unsafe { self.allocator.create_buffer(&buffer_ci, &alloc_ci)? };
        Ok((buffer, allocation))
    }

    fn destroy_buffer(&self, buffer: vk::Buffer, mut allocation: Self::Allocation) {
        unsafe { self.allocator.destroy_buffer(buffer, &mut allocation) };
    }

    fn write_mapped(&self, allocation: &mut Self::Allocation, data: &[u8]) -> GfxResult<()> {
        unsafe {
            let mapped_ptr = self.allocator.map_memory(allocation)?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr, data.len());
            let flushed = self.allocator.flush_allocation(allocation, 0, data.len() as vk::DeviceSize);
            self.allocator.unmap_memory(allocation);

            flushed?;
        }
        Ok(())
    }

    fn read_mapped(&self, allocation: &mut Self::Allocation, size: usize) -> GfxResult<Vec<u8>> {
        unsafe {
            self.allocator.invalidate_allocation(allocation, 0, size as vk::DeviceSize)?;
            let mapped_ptr = self.allocator.map_memory(allocation)?;
            let data = std::slice::from_raw_parts(mapped_ptr as *const u8, size).to_vec();
            self.allocator.unmap_memory(allocation);

            Ok(data)
        }
    }

    fn create_image(&self, info: &GfxImageCreateInfo) -> GfxResult<(vk::Image, Self::Allocation)> {
        let alloc_ci = Self::allocation_create_info(GfxMemoryLocation::DeviceLocal);
        let (image, allocation) = unsafe { self.allocator.create_image(info.as_info(), &alloc_ci)? };
        Ok((image, allocation))
    }

    fn destroy_image(&self, image: vk::Image, mut allocation: Self::Allocation) {
        unsafe { self.allocator.destroy_image(image, &mut allocation) };
    }

    fn device_memory(&self, allocation: &Self::Allocation) -> vk::DeviceMemory {
        self.allocator.get_allocation_info(allocation).device_memory
    }

    fn create_image_view(&self, image: vk::Image, desc: &GfxImageViewDesc) -> GfxResult<vk::ImageView> {
        let view = unsafe { self.device.create_image_view(&desc.create_info(image), None)? };
        Ok(view)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) };
    }

    fn create_sampler(&self, desc: &GfxSamplerDesc) -> GfxResult<vk::Sampler> {
        let sampler = unsafe { self.device.create_sampler(&desc.create_info(), None)? };
        Ok(sampler)
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        unsafe { self.device.destroy_sampler(sampler, None) };
    }

    fn one_time_exec(&self, command_pool: vk::CommandPool, ops: &[GfxTransferOp], name: &str) -> GfxResult<()> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffers = unsafe { self.device.allocate_command_buffers(&alloc_info)? };
        let command_buffer = command_buffers[0];
        self.set_debug_name(command_buffer, &format!("CommandBuffer::one-time-{name}"));

        let result = self.submit_and_wait(command_buffer, ops);
        unsafe { self.device.free_command_buffers(command_pool, &command_buffers) };

        if let Err(GfxError::Vk(e)) = &result {
            log::error!("one time exec {name} failed: {e}");
        }
        result
    }

    fn set_debug_name<T: vk::Handle + Copy>(&self, handle: T, name: &str) {
        let Some(debug_utils) = &self.debug_utils else {
            return;
        };
        let Ok(name) = CString::new(name) else {
            log::warn!("debug name contains a nul byte: {name}");
            return;
        };

        let name_info = vk::DebugUtilsObjectNameInfoEXT::default().object_name(name.as_c_str()).object_handle(handle);
        if let Err(e) = unsafe { debug_utils.set_debug_utils_object_name(&name_info) } {
            log::warn!("failed to set debug name: {e}");
        }
    }
}
