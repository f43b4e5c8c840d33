//! 内存中的 device 实现，不需要 GPU
//!
//! - 模拟 host visible 内存以及一次性传输命令
//! - 记录每一次 create/destroy 调用
//! - 重复释放、释放未知 handle 会直接 panic
//! - 可以注入失败，用于验证错误路径上的资源释放

use ash::vk::{self, Handle};
use itertools::Itertools;
use std::{cell::RefCell, collections::HashMap};

use crate::{
    device_api::{GfxBufferDesc, GfxDeviceApi, GfxMemoryLocation, GfxTransferOp},
    error::{GfxError, GfxResult},
    resources::{
        image::GfxImageCreateInfo, image_view::GfxImageViewDesc, sampler::GfxSamplerDesc,
    },
};

/// 对 device 的一次调用
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockCall {
    CreateBuffer(vk::Buffer),
    DestroyBuffer(vk::Buffer),
    CreateImage(vk::Image),
    DestroyImage(vk::Image),
    CreateImageView(vk::ImageView),
    DestroyImageView(vk::ImageView),
    CreateSampler(vk::Sampler),
    DestroySampler(vk::Sampler),
    Submit(vk::CommandPool),
}

/// 注入的失败
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockFailure {
    /// 第 n 次（从 0 开始计数）create_buffer 失败
    BufferCreation(usize),
    ImageCreation,
    ImageViewCreation,
    SamplerCreation,
    Submit,
}

#[derive(Debug)]
pub struct MockAllocation {
    id: u64,
    location: GfxMemoryLocation,
}
impl MockAllocation {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn location(&self) -> GfxMemoryLocation {
        self.location
    }
}

struct MockBuffer {
    allocation: u64,
    desc: GfxBufferDesc,
}

struct MockImage {
    allocation: u64,
    info: GfxImageCreateInfo,
    layout: vk::ImageLayout,
}

#[derive(Default)]
struct MockState {
    next_handle: u64,
    memory: HashMap<u64, Vec<u8>>,
    buffers: HashMap<vk::Buffer, MockBuffer>,
    images: HashMap<vk::Image, MockImage>,
    image_views: HashMap<vk::ImageView, (vk::Image, GfxImageViewDesc)>,
    samplers: HashMap<vk::Sampler, GfxSamplerDesc>,
    debug_names: HashMap<u64, String>,

    calls: Vec<MockCall>,
    buffer_creations: usize,
    failure: Option<MockFailure>,
}
impl MockState {
    /// handle 从 1 开始，0 保留给 null
    fn next_raw(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn alloc_memory(&mut self, size: usize, location: GfxMemoryLocation) -> MockAllocation {
        let id = self.next_raw();
        self.memory.insert(id, vec![0; size]);
        MockAllocation { id, location }
    }

    fn fails(&self, failure: MockFailure) -> bool {
        self.failure == Some(failure)
    }

    fn buffer(&self, buffer: vk::Buffer) -> GfxResult<&MockBuffer> {
        self.buffers.get(&buffer).ok_or(GfxError::Vk(vk::Result::ERROR_UNKNOWN))
    }

    fn copy_buffer(&mut self, src: vk::Buffer, dst: vk::Buffer, size: vk::DeviceSize) -> GfxResult<()> {
        let src = self.buffer(src)?;
        let dst = self.buffer(dst)?;
        if !src.desc.usage.contains(vk::BufferUsageFlags::TRANSFER_SRC)
            || !dst.desc.usage.contains(vk::BufferUsageFlags::TRANSFER_DST)
            || size > src.desc.size
            || size > dst.desc.size
        {
            return Err(GfxError::Vk(vk::Result::ERROR_VALIDATION_FAILED_EXT));
        }
        let (src_alloc, dst_alloc) = (src.allocation, dst.allocation);

        let bytes = self.memory[&src_alloc][..size as usize].to_vec();
        if let Some(memory) = self.memory.get_mut(&dst_alloc) {
            memory[..bytes.len()].copy_from_slice(&bytes);
        }
        Ok(())
    }

    fn copy_buffer_to_image(&mut self, src: vk::Buffer, dst: vk::Image, extent: vk::Extent3D) -> GfxResult<()> {
        let src_alloc = self.buffer(src)?.allocation;
        let src_size = self.buffer(src)?.desc.size as usize;
        let image = self.images.get_mut(&dst).ok_or(GfxError::Vk(vk::Result::ERROR_UNKNOWN))?;
        if !image.info.usage().contains(vk::ImageUsageFlags::TRANSFER_DST) || image.info.extent() != extent {
            return Err(GfxError::Vk(vk::Result::ERROR_VALIDATION_FAILED_EXT));
        }
        let size = image.info.data_size().unwrap_or_default();
        if size > src_size {
            return Err(GfxError::Vk(vk::Result::ERROR_VALIDATION_FAILED_EXT));
        }
        image.layout = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;
        let dst_alloc = image.allocation;

        let bytes = self.memory[&src_alloc][..size].to_vec();
        self.memory.insert(dst_alloc, bytes);
        Ok(())
    }
}

/// 内存中的 [`GfxDeviceApi`] 实现
#[derive(Default)]
pub struct MockGfxDevice {
    state: RefCell<MockState>,
}

// 构造
impl MockGfxDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure(failure: MockFailure) -> Self {
        let device = Self::new();
        device.set_failure(Some(failure));
        device
    }

    pub fn set_failure(&self, failure: Option<MockFailure>) {
        self.state.borrow_mut().failure = failure;
    }

    /// mock 不会真正使用 command pool，只需要一个非 null 的 handle
    pub fn command_pool(&self) -> vk::CommandPool {
        vk::CommandPool::from_raw(0xC0FFEE)
    }
}
// 查询
impl MockGfxDevice {
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.borrow().calls.clone()
    }

    pub fn count_calls(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn live_image_count(&self) -> usize {
        self.state.borrow().images.len()
    }

    pub fn live_image_view_count(&self) -> usize {
        self.state.borrow().image_views.len()
    }

    pub fn live_sampler_count(&self) -> usize {
        self.state.borrow().samplers.len()
    }

    /// 所有尚未释放的对象数量
    pub fn live_resource_count(&self) -> usize {
        let state = self.state.borrow();
        state.buffers.len() + state.images.len() + state.image_views.len() + state.samplers.len()
    }

    /// 尚未释放的 buffer，按创建顺序排列
    pub fn live_buffers(&self) -> Vec<vk::Buffer> {
        self.state.borrow().buffers.keys().copied().sorted_by_key(|b| b.as_raw()).collect()
    }

    pub fn buffer_desc(&self, buffer: vk::Buffer) -> Option<GfxBufferDesc> {
        self.state.borrow().buffers.get(&buffer).map(|b| b.desc)
    }

    pub fn buffer_contents(&self, buffer: vk::Buffer) -> Option<Vec<u8>> {
        let state = self.state.borrow();
        let buffer = state.buffers.get(&buffer)?;
        state.memory.get(&buffer.allocation).cloned()
    }

    pub fn image_info(&self, image: vk::Image) -> Option<GfxImageCreateInfo> {
        self.state.borrow().images.get(&image).map(|i| i.info)
    }

    pub fn image_layout(&self, image: vk::Image) -> Option<vk::ImageLayout> {
        self.state.borrow().images.get(&image).map(|i| i.layout)
    }

    pub fn image_contents(&self, image: vk::Image) -> Option<Vec<u8>> {
        let state = self.state.borrow();
        let image = state.images.get(&image)?;
        state.memory.get(&image.allocation).cloned()
    }

    pub fn image_view_target(&self, view: vk::ImageView) -> Option<(vk::Image, GfxImageViewDesc)> {
        self.state.borrow().image_views.get(&view).copied()
    }

    pub fn sampler_desc(&self, sampler: vk::Sampler) -> Option<GfxSamplerDesc> {
        self.state.borrow().samplers.get(&sampler).copied()
    }

    pub fn debug_name<T: Handle>(&self, handle: T) -> Option<String> {
        self.state.borrow().debug_names.get(&handle.as_raw()).cloned()
    }
}

impl GfxDeviceApi for MockGfxDevice {
    type Allocation = MockAllocation;

    fn create_buffer(&self, desc: &GfxBufferDesc) -> GfxResult<(vk::Buffer, Self::Allocation)> {
        let mut state = self.state.borrow_mut();
        let nth = state.buffer_creations;
        state.buffer_creations += 1;
        if state.fails(MockFailure::BufferCreation(nth)) {
            return Err(GfxError::Vk(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
        }
        assert!(desc.size > 0, "zero-sized buffer reached the device");

        let allocation = state.alloc_memory(desc.size as usize, desc.location);
        let buffer = vk::Buffer::from_raw(state.next_raw());
        state.buffers.insert(
            buffer,
            MockBuffer {
                allocation: allocation.id,
                desc: *desc,
            },
        );
        state.calls.push(MockCall::CreateBuffer(buffer));
        Ok((buffer, allocation))
    }

    fn destroy_buffer(&self, buffer: vk::Buffer, allocation: Self::Allocation) {
        let mut state = self.state.borrow_mut();
        let Some(record) = state.buffers.remove(&buffer) else {
            panic!("buffer {buffer:?} released twice or never created");
        };
        assert_eq!(record.allocation, allocation.id, "buffer {buffer:?} released with a foreign allocation");
        state.memory.remove(&allocation.id);
        state.calls.push(MockCall::DestroyBuffer(buffer));
    }

    fn write_mapped(&self, allocation: &mut Self::Allocation, data: &[u8]) -> GfxResult<()> {
        if !allocation.location.is_host_visible() {
            return Err(GfxError::NotHostVisible);
        }
        let mut state = self.state.borrow_mut();
        let memory = state
            .memory
            .get_mut(&allocation.id)
            .ok_or(GfxError::Vk(vk::Result::ERROR_MEMORY_MAP_FAILED))?;
        if data.len() > memory.len() {
            return Err(GfxError::Vk(vk::Result::ERROR_MEMORY_MAP_FAILED));
        }
        memory[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read_mapped(&self, allocation: &mut Self::Allocation, size: usize) -> GfxResult<Vec<u8>> {
        if !allocation.location.is_host_visible() {
            return Err(GfxError::NotHostVisible);
        }
        let state = self.state.borrow();
        let memory = state
            .memory
            .get(&allocation.id)
            .ok_or(GfxError::Vk(vk::Result::ERROR_MEMORY_MAP_FAILED))?;
        memory.get(..size).map(<[u8]>::to_vec).ok_or(GfxError::Vk(vk::Result::ERROR_MEMORY_MAP_FAILED))
    }

    fn create_image(&self, info: &GfxImageCreateInfo) -> GfxResult<(vk::Image, Self::Allocation)> {
        let mut state = self.state.borrow_mut();
        if state.fails(MockFailure::ImageCreation) {
            return Err(GfxError::Vk(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
        }

        let allocation = state.alloc_memory(info.data_size().unwrap_or_default(), GfxMemoryLocation::DeviceLocal);
        let image = vk::Image::from_raw(state.next_raw());
        state.images.insert(
            image,
            MockImage {
                allocation: allocation.id,
                info: *info,
                layout: vk::ImageLayout::UNDEFINED,
            },
        );
        state.calls.push(MockCall::CreateImage(image));
        Ok((image, allocation))
    }

    fn destroy_image(&self, image: vk::Image, allocation: Self::Allocation) {
        let mut state = self.state.borrow_mut();
        let Some(record) = state.images.remove(&image) else {
            panic!("image {image:?} released twice or never created");
        };
        assert_eq!(record.allocation, allocation.id, "image {image:?} released with a foreign allocation");
        assert!(
            !state.image_views.values().any(|(target, _)| *target == image),
            "image {image:?} released while a view still references it"
        );
        state.memory.remove(&allocation.id);
        state.calls.push(MockCall::DestroyImage(image));
    }

    fn device_memory(&self, allocation: &Self::Allocation) -> vk::DeviceMemory {
        vk::DeviceMemory::from_raw(allocation.id)
    }

    fn create_image_view(&self, image: vk::Image, desc: &GfxImageViewDesc) -> GfxResult<vk::ImageView> {
        let mut state = self.state.borrow_mut();
        if state.fails(MockFailure::ImageViewCreation) {
            return Err(GfxError::Vk(vk::Result::ERROR_OUT_OF_HOST_MEMORY));
        }
        if !state.images.contains_key(&image) {
            return Err(GfxError::Vk(vk::Result::ERROR_UNKNOWN));
        }

        let view = vk::ImageView::from_raw(state.next_raw());
        state.image_views.insert(view, (image, *desc));
        state.calls.push(MockCall::CreateImageView(view));
        Ok(view)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        let mut state = self.state.borrow_mut();
        if state.image_views.remove(&view).is_none() {
            panic!("image view {view:?} released twice or never created");
        }
        state.calls.push(MockCall::DestroyImageView(view));
    }

    fn create_sampler(&self, desc: &GfxSamplerDesc) -> GfxResult<vk::Sampler> {
        let mut state = self.state.borrow_mut();
        if state.fails(MockFailure::SamplerCreation) {
            return Err(GfxError::Vk(vk::Result::ERROR_TOO_MANY_OBJECTS));
        }

        let sampler = vk::Sampler::from_raw(state.next_raw());
        state.samplers.insert(sampler, *desc);
        state.calls.push(MockCall::CreateSampler(sampler));
        Ok(sampler)
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        let mut state = self.state.borrow_mut();
        if state.samplers.remove(&sampler).is_none() {
            panic!("sampler {sampler:?} released twice or never created");
        }
        state.calls.push(MockCall::DestroySampler(sampler));
    }

    fn one_time_exec(&self, command_pool: vk::CommandPool, ops: &[GfxTransferOp], _name: &str) -> GfxResult<()> {
        let mut state = self.state.borrow_mut();
        if command_pool.is_null() {
            return Err(GfxError::Vk(vk::Result::ERROR_INITIALIZATION_FAILED));
        }
        state.calls.push(MockCall::Submit(command_pool));
        if state.fails(MockFailure::Submit) {
            return Err(GfxError::Vk(vk::Result::ERROR_DEVICE_LOST));
        }

        for op in ops {
            match *op {
                GfxTransferOp::CopyBuffer { src, dst, size } => state.copy_buffer(src, dst, size)?,
                GfxTransferOp::CopyBufferToImage { src, dst, extent } => state.copy_buffer_to_image(src, dst, extent)?,
            }
        }
        Ok(())
    }

    fn set_debug_name<T: Handle + Copy>(&self, handle: T, name: &str) {
        self.state.borrow_mut().debug_names.insert(handle.as_raw(), name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_requires_transfer_usage() -> anyhow::Result<()> {
        let device = MockGfxDevice::new();
        let (src, src_alloc) = device.create_buffer(&GfxBufferDesc::stage_upload(4))?;
        let (dst, dst_alloc) =
            device.create_buffer(&GfxBufferDesc::device_local(4, vk::BufferUsageFlags::VERTEX_BUFFER))?;

        let result = device.one_time_exec(
            device.command_pool(),
            &[GfxTransferOp::CopyBuffer { src, dst, size: 4 }],
            "no-transfer-dst",
        );
        assert!(matches!(result, Err(GfxError::Vk(vk::Result::ERROR_VALIDATION_FAILED_EXT))));

        device.destroy_buffer(src, src_alloc);
        device.destroy_buffer(dst, dst_alloc);
        Ok(())
    }

    #[test]
    #[should_panic(expected = "released twice")]
    fn double_release_panics() {
        let device = MockGfxDevice::new();
        let sampler = device.create_sampler(&GfxSamplerDesc::default()).unwrap();
        device.destroy_sampler(sampler);
        device.destroy_sampler(sampler);
    }

    #[test]
    fn handles_are_unique_and_never_null() -> anyhow::Result<()> {
        let device = MockGfxDevice::new();
        let a = device.create_sampler(&GfxSamplerDesc::default())?;
        let b = device.create_sampler(&GfxSamplerDesc::default())?;

        assert_ne!(a, b);
        assert!(!a.is_null() && !b.is_null());

        device.destroy_sampler(b);
        device.destroy_sampler(a);
        assert_eq!(
            device.calls(),
            vec![
                MockCall::CreateSampler(a),
                MockCall::CreateSampler(b),
                MockCall::DestroySampler(b),
                MockCall::DestroySampler(a),
            ]
        );
        Ok(())
    }

    #[test]
    fn nth_buffer_failure_only_hits_that_buffer() {
        let device = MockGfxDevice::with_failure(MockFailure::BufferCreation(1));
        let first = device.create_buffer(&GfxBufferDesc::stage_upload(8));
        let second = device.create_buffer(&GfxBufferDesc::stage_upload(8));
        let third = device.create_buffer(&GfxBufferDesc::stage_upload(8));

        assert!(first.is_ok());
        assert!(second.is_err());
        assert!(third.is_ok());
        assert_eq!(device.live_buffer_count(), 2);

        for (buffer, allocation) in [first, third].into_iter().flatten() {
            device.destroy_buffer(buffer, allocation);
        }
    }
}
