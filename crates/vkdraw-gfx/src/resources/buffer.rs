use ash::vk;

use crate::{
    device_api::{GfxBufferDesc, GfxDeviceApi, GfxTransferOp},
    error::{GfxError, GfxResult},
};

/// buffer handle 以及与之绑定的内存分配
///
/// 两者总是一起创建、一起释放。没有实现 Drop：device 是借用的，
/// 必须通过 [`GfxAllocatedBuffer::destroy`] 显式释放
#[derive(Debug)]
pub struct GfxAllocatedBuffer<A> {
    handle: vk::Buffer,
    allocation: A,
    size: vk::DeviceSize,
}
// init & destroy
impl<A> GfxAllocatedBuffer<A> {
    pub fn new<D>(device: &D, desc: &GfxBufferDesc, debug_name: &str) -> GfxResult<Self>
    where
        D: GfxDeviceApi<Allocation = A>,
    {
        if desc.size == 0 {
            return Err(GfxError::EmptyResource("buffer"));
        }

        let (handle, allocation) = device.create_buffer(desc)?;
        device.set_debug_name(handle, &format!("Buffer::{debug_name}"));
        log::debug!("created buffer {debug_name}: {} bytes, {:?}", desc.size, desc.location);

        Ok(Self {
            handle,
            allocation,
            size: desc.size,
        })
    }

    #[inline]
    pub fn new_stage_buffer<D>(device: &D, size: vk::DeviceSize, debug_name: &str) -> GfxResult<Self>
    where
        D: GfxDeviceApi<Allocation = A>,
    {
        Self::new(device, &GfxBufferDesc::stage_upload(size), debug_name)
    }

    pub fn destroy<D>(self, device: &D)
    where
        D: GfxDeviceApi<Allocation = A>,
    {
        log::debug!("destroying buffer {:?}", self.handle);
        device.destroy_buffer(self.handle, self.allocation);
    }
}
// getter
impl<A> GfxAllocatedBuffer<A> {
    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    #[inline]
    pub fn allocation(&self) -> &A {
        &self.allocation
    }
}
// tools
impl<A> GfxAllocatedBuffer<A> {
    /// 通过 mem map 的方式将 data 写入 buffer 起始处，buffer 必须是 host visible 的
    pub fn transfer_data_by_mmap<D>(&mut self, device: &D, data: &[u8]) -> GfxResult<()>
    where
        D: GfxDeviceApi<Allocation = A>,
    {
        device.write_mapped(&mut self.allocation, data)
    }

    /// 通过 mem map 的方式读取 buffer 起始处的 size 个字节
    pub fn read_data_by_mmap<D>(&mut self, device: &D, size: usize) -> GfxResult<Vec<u8>>
    where
        D: GfxDeviceApi<Allocation = A>,
    {
        device.read_mapped(&mut self.allocation, size)
    }
}

/// 通过 stage buffer 在 host 与 device local buffer 之间传输数据
pub struct GfxBufferFactory;

impl GfxBufferFactory {
    /// 创建一个 device local 的 buffer，并将 data 同步上传进去
    ///
    /// # 实现步骤
    /// 1. 创建 host visible 的 stage buffer，通过 mem map 写入 data
    /// 2. 创建 device local 的目标 buffer
    /// 3. 在一次性 command buffer 中 copy，阻塞等待完成
    /// 4. 释放 stage buffer
    ///
    /// 目标 buffer 的 usage 总是额外包含 TRANSFER_DST | TRANSFER_SRC，以便回读。
    /// 失败时已创建的 buffer 都会被释放
    pub fn create_buffer_from_data<D: GfxDeviceApi>(
        device: &D,
        command_pool: vk::CommandPool,
        data: &[u8],
        usage: vk::BufferUsageFlags,
        debug_name: &str,
    ) -> GfxResult<GfxAllocatedBuffer<D::Allocation>> {
        let size = data.len() as vk::DeviceSize;
        if size == 0 {
            return Err(GfxError::EmptyResource("buffer"));
        }

        let mut stage_buffer = GfxAllocatedBuffer::new_stage_buffer(device, size, &format!("{debug_name}-stage-buffer"))?;
        let result = Self::upload_through_stage(device, command_pool, &mut stage_buffer, data, usage, debug_name);
        stage_buffer.destroy(device);

        result
    }

    /// 与 [`Self::create_buffer_from_data`] 相同，数据为任意 Pod 类型的 slice
    #[inline]
    pub fn create_buffer_from_slice<D: GfxDeviceApi, T: bytemuck::Pod>(
        device: &D,
        command_pool: vk::CommandPool,
        data: &[T],
        usage: vk::BufferUsageFlags,
        debug_name: &str,
    ) -> GfxResult<GfxAllocatedBuffer<D::Allocation>> {
        Self::create_buffer_from_data(device, command_pool, bytemuck::cast_slice(data), usage, debug_name)
    }

    /// 通过 host visible 的 stage buffer 读取 buffer 起始处的 size 个字节
    ///
    /// buffer 必须带有 TRANSFER_SRC usage，阻塞等待完成
    pub fn read_buffer<D: GfxDeviceApi>(
        device: &D,
        command_pool: vk::CommandPool,
        buffer: vk::Buffer,
        size: vk::DeviceSize,
    ) -> GfxResult<Vec<u8>> {
        let mut readback_buffer =
            GfxAllocatedBuffer::new(device, &GfxBufferDesc::stage_readback(size), "readback-stage-buffer")?;

        let result = device
            .one_time_exec(
                command_pool,
                &[GfxTransferOp::CopyBuffer {
                    src: buffer,
                    dst: readback_buffer.handle(),
                    size,
                }],
                "read-buffer",
            )
            .and_then(|_| readback_buffer.read_data_by_mmap(device, size as usize));
        readback_buffer.destroy(device);

        result
    }

    fn upload_through_stage<D: GfxDeviceApi>(
        device: &D,
        command_pool: vk::CommandPool,
        stage_buffer: &mut GfxAllocatedBuffer<D::Allocation>,
        data: &[u8],
        usage: vk::BufferUsageFlags,
        debug_name: &str,
    ) -> GfxResult<GfxAllocatedBuffer<D::Allocation>> {
        stage_buffer.transfer_data_by_mmap(device, data)?;

        let size = stage_buffer.size();
        let usage = usage | vk::BufferUsageFlags::TRANSFER_DST | vk::BufferUsageFlags::TRANSFER_SRC;
        let dst_buffer = GfxAllocatedBuffer::new(device, &GfxBufferDesc::device_local(size, usage), debug_name)?;

        let copy = GfxTransferOp::CopyBuffer {
            src: stage_buffer.handle(),
            dst: dst_buffer.handle(),
            size,
        };
        match device.one_time_exec(command_pool, &[copy], &format!("{debug_name}-transfer-data")) {
            Ok(()) => Ok(dst_buffer),
            Err(e) => {
                dst_buffer.destroy(device);
                Err(e)
            }
        }
    }
}
