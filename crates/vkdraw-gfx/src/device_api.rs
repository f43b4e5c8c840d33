use ash::vk;

use crate::{
    error::GfxResult,
    resources::{image::GfxImageCreateInfo, image_view::GfxImageViewDesc, sampler::GfxSamplerDesc},
};

/// buffer 所在的内存类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GfxMemoryLocation {
    /// 只有 GPU 可以访问，host 无法直接写入
    DeviceLocal,
    /// host 顺序写入，用作上传的 stage buffer
    HostUpload,
    /// host 随机读取，用作回读的 stage buffer
    HostReadback,
}
impl GfxMemoryLocation {
    #[inline]
    pub fn is_host_visible(self) -> bool {
        !matches!(self, GfxMemoryLocation::DeviceLocal)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GfxBufferDesc {
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    pub location: GfxMemoryLocation,
}
impl GfxBufferDesc {
    #[inline]
    pub fn device_local(size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> Self {
        Self {
            size,
            usage,
            location: GfxMemoryLocation::DeviceLocal,
        }
    }

    #[inline]
    pub fn stage_upload(size: vk::DeviceSize) -> Self {
        Self {
            size,
            usage: vk::BufferUsageFlags::TRANSFER_SRC,
            location: GfxMemoryLocation::HostUpload,
        }
    }

    #[inline]
    pub fn stage_readback(size: vk::DeviceSize) -> Self {
        Self {
            size,
            usage: vk::BufferUsageFlags::TRANSFER_DST,
            location: GfxMemoryLocation::HostReadback,
        }
    }
}

/// 在一次性 command buffer 中录制的传输命令
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GfxTransferOp {
    /// 从 offset 0 开始复制 size 字节
    CopyBuffer {
        src: vk::Buffer,
        dst: vk::Buffer,
        size: vk::DeviceSize,
    },
    /// 将 buffer 中紧密排列的像素复制到整个 image 的 mip 0，
    /// 结束后 image 处于 SHADER_READ_ONLY_OPTIMAL
    CopyBufferToImage {
        src: vk::Buffer,
        dst: vk::Image,
        extent: vk::Extent3D,
    },
}

/// 资源层所依赖的设备服务
///
/// 所有 handle 都由调用者持有，每个创建出来的对象都必须通过对应的 destroy 显式释放。
/// device 本身以及 command pool 只是被借用的，本 trait 的使用者永远不会销毁它们。
///
/// - 生产实现：[`GfxDevice`](crate::foundation::device::GfxDevice)，基于 ash + vk-mem
/// - 测试实现：`MockGfxDevice`（feature `mock`）
pub trait GfxDeviceApi {
    /// 与 buffer/image 绑定的内存分配
    type Allocation;

    fn create_buffer(&self, desc: &GfxBufferDesc) -> GfxResult<(vk::Buffer, Self::Allocation)>;
    fn destroy_buffer(&self, buffer: vk::Buffer, allocation: Self::Allocation);

    /// 将 data 写入 host visible 的 allocation 起始处
    fn write_mapped(&self, allocation: &mut Self::Allocation, data: &[u8]) -> GfxResult<()>;
    /// 从 host visible 的 allocation 起始处读取 size 字节
    fn read_mapped(&self, allocation: &mut Self::Allocation, size: usize) -> GfxResult<Vec<u8>>;

    fn create_image(&self, info: &GfxImageCreateInfo) -> GfxResult<(vk::Image, Self::Allocation)>;
    fn destroy_image(&self, image: vk::Image, allocation: Self::Allocation);

    /// allocation 背后的 vk::DeviceMemory，仅用于查询
    fn device_memory(&self, allocation: &Self::Allocation) -> vk::DeviceMemory;

    fn create_image_view(&self, image: vk::Image, desc: &GfxImageViewDesc) -> GfxResult<vk::ImageView>;
    fn destroy_image_view(&self, view: vk::ImageView);

    fn create_sampler(&self, desc: &GfxSamplerDesc) -> GfxResult<vk::Sampler>;
    fn destroy_sampler(&self, sampler: vk::Sampler);

    /// 从 command_pool 中申请一个临时的 command buffer，录制 ops，提交并阻塞等待完成
    fn one_time_exec(&self, command_pool: vk::CommandPool, ops: &[GfxTransferOp], name: &str) -> GfxResult<()>;

    fn set_debug_name<T: vk::Handle + Copy>(&self, _handle: T, _name: &str) {}
}
