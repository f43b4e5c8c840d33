use ash::vk;

use crate::{
    device_api::{GfxDeviceApi, GfxTransferOp},
    error::{GfxError, GfxResult},
    resources::buffer::GfxAllocatedBuffer,
};

/// Vulkan 格式相关的工具类
pub struct VulkanFormatUtils;
impl VulkanFormatUtils {
    /// 计算指定 Vulkan 格式下每个像素需要的字节数，不支持的格式返回 None
    pub fn pixel_size_in_bytes(format: vk::Format) -> Option<usize> {
        // 根据 vulkan specification 得到的 format 顺序
        const BYTE_3_FORMAT: [(vk::Format, vk::Format); 1] = [(vk::Format::R8G8B8_UNORM, vk::Format::B8G8R8_SRGB)];
        const BYTE_4_FORMAT: [(vk::Format, vk::Format); 1] = [(vk::Format::R8G8B8A8_UNORM, vk::Format::B8G8R8A8_SRGB)];
        const BYTE_8_FORMAT: [(vk::Format, vk::Format); 1] =
            [(vk::Format::R16G16B16A16_UNORM, vk::Format::R16G16B16A16_SFLOAT)];

        let is_in_format_region = |format: vk::Format, regions: &[(vk::Format, vk::Format)]| {
            let n = format.as_raw();
            regions.iter().any(|(begin, end)| begin.as_raw() <= n && n <= end.as_raw())
        };

        match format {
            f if is_in_format_region(f, &BYTE_3_FORMAT) => Some(3),
            f if is_in_format_region(f, &BYTE_4_FORMAT) => Some(4),
            f if is_in_format_region(f, &BYTE_8_FORMAT) => Some(8),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GfxImageCreateInfo {
    inner: vk::ImageCreateInfo<'static>,
}
impl GfxImageCreateInfo {
    #[inline]
    pub fn new_image_2d_info(extent: vk::Extent2D, format: vk::Format, usage: vk::ImageUsageFlags) -> Self {
        Self {
            inner: vk::ImageCreateInfo {
                image_type: vk::ImageType::TYPE_2D,
                format,
                extent: extent.into(),
                mip_levels: 1,
                array_layers: 1,
                samples: vk::SampleCountFlags::TYPE_1,
                tiling: vk::ImageTiling::OPTIMAL,
                usage,
                sharing_mode: vk::SharingMode::EXCLUSIVE,
                // 这里只能是 UNDEFINED 或者 PREINITIALIZED
                initial_layout: vk::ImageLayout::UNDEFINED,
                ..Default::default()
            },
        }
    }

    #[inline]
    pub fn as_info(&self) -> &vk::ImageCreateInfo<'static> {
        &self.inner
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent3D {
        self.inner.extent
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.inner.format
    }

    #[inline]
    pub fn usage(&self) -> vk::ImageUsageFlags {
        self.inner.usage
    }

    #[inline]
    pub fn tiling(&self) -> vk::ImageTiling {
        self.inner.tiling
    }

    /// 整个 mip 0 紧密排列时的字节数，格式未知或溢出 usize 时为 None
    pub fn data_size(&self) -> Option<usize> {
        let extent = self.extent();
        let pixel_size = VulkanFormatUtils::pixel_size_in_bytes(self.format())?;
        [extent.width, extent.height, extent.depth]
            .into_iter()
            .try_fold(pixel_size, |acc, dim| acc.checked_mul(dim as usize))
    }
}

/// image handle 以及与之绑定的内存分配，需要通过 [`GfxAllocatedImage::destroy`] 显式释放
#[derive(Debug)]
pub struct GfxAllocatedImage<A> {
    handle: vk::Image,
    allocation: A,

    extent: vk::Extent3D,
    format: vk::Format,
}
// getter
impl<A> GfxAllocatedImage<A> {
    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.handle
    }

    #[inline]
    pub fn allocation(&self) -> &A {
        &self.allocation
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.extent.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.extent.height
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }
}
// init & destroy
impl<A> GfxAllocatedImage<A> {
    pub fn new<D>(device: &D, image_info: &GfxImageCreateInfo, debug_name: &str) -> GfxResult<Self>
    where
        D: GfxDeviceApi<Allocation = A>,
    {
        let extent = image_info.extent();
        if extent.width == 0 || extent.height == 0 {
            return Err(GfxError::EmptyResource("image"));
        }

        let (handle, allocation) = device.create_image(image_info)?;
        device.set_debug_name(handle, &format!("Image::{debug_name}"));
        log::debug!("created image {debug_name}: {}x{} {:?}", extent.width, extent.height, image_info.format());

        Ok(Self {
            handle,
            allocation,
            extent,
            format: image_info.format(),
        })
    }

    pub fn destroy<D>(self, device: &D)
    where
        D: GfxDeviceApi<Allocation = A>,
    {
        log::debug!("destroying image {:?}", self.handle);
        device.destroy_image(self.handle, self.allocation);
    }
}

/// 创建 image 并上传像素
pub struct GfxImageFactory;

impl GfxImageFactory {
    /// 根据 RGBA8_UNORM 的 data 创建 image
    ///
    /// # 实现步骤
    /// 1. 创建 OPTIMAL tiling、TRANSFER_DST | SAMPLED 的 device local image
    /// 2. 将数据放入 stage buffer
    /// 3. 一次性 command buffer 中：布局转换、copy、转换为 SHADER_READ_ONLY_OPTIMAL
    /// 4. 阻塞等待完成，释放 stage buffer
    pub fn create_image_from_rgba8<D: GfxDeviceApi>(
        device: &D,
        command_pool: vk::CommandPool,
        width: u32,
        height: u32,
        pixels: &[u8],
        debug_name: &str,
    ) -> GfxResult<GfxAllocatedImage<D::Allocation>> {
        let image_info = GfxImageCreateInfo::new_image_2d_info(
            vk::Extent2D { width, height },
            vk::Format::R8G8B8A8_UNORM,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
        );

        let expected = image_info.data_size().unwrap_or_default();
        if pixels.len() != expected {
            return Err(GfxError::PixelSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        let image = GfxAllocatedImage::new(device, &image_info, debug_name)?;
        match Self::transfer_data(device, command_pool, &image, pixels, debug_name) {
            Ok(()) => Ok(image),
            Err(e) => {
                image.destroy(device);
                Err(e)
            }
        }
    }

    fn transfer_data<D: GfxDeviceApi>(
        device: &D,
        command_pool: vk::CommandPool,
        image: &GfxAllocatedImage<D::Allocation>,
        pixels: &[u8],
        debug_name: &str,
    ) -> GfxResult<()> {
        let mut stage_buffer = GfxAllocatedBuffer::new_stage_buffer(
            device,
            pixels.len() as vk::DeviceSize,
            &format!("{debug_name}-stage-buffer"),
        )?;

        let copy = GfxTransferOp::CopyBufferToImage {
            src: stage_buffer.handle(),
            dst: image.handle(),
            extent: image.extent,
        };
        let result = stage_buffer
            .transfer_data_by_mmap(device, pixels)
            .and_then(|_| device.one_time_exec(command_pool, &[copy], &format!("{debug_name}-transfer-data")));
        stage_buffer.destroy(device);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockFailure, MockGfxDevice};

    fn checker_pixels(width: u32, height: u32) -> Vec<u8> {
        (0..width * height).flat_map(|i| [i as u8, 0xff - i as u8, 0x40, 0xff]).collect()
    }

    #[test]
    fn pixel_size_of_common_formats() {
        assert_eq!(VulkanFormatUtils::pixel_size_in_bytes(vk::Format::R8G8B8A8_UNORM), Some(4));
        assert_eq!(VulkanFormatUtils::pixel_size_in_bytes(vk::Format::B8G8R8A8_SRGB), Some(4));
        assert_eq!(VulkanFormatUtils::pixel_size_in_bytes(vk::Format::R8G8B8_UNORM), Some(3));
        assert_eq!(VulkanFormatUtils::pixel_size_in_bytes(vk::Format::R16G16B16A16_SFLOAT), Some(8));
        assert_eq!(VulkanFormatUtils::pixel_size_in_bytes(vk::Format::D32_SFLOAT), None);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn data_size_of_large_extent_does_not_wrap() {
        let info = GfxImageCreateInfo::new_image_2d_info(
            vk::Extent2D {
                width: 70_000,
                height: 70_000,
            },
            vk::Format::R8G8B8A8_UNORM,
            vk::ImageUsageFlags::SAMPLED,
        );

        assert_eq!(info.data_size(), Some(4 * 70_000 * 70_000));
        assert_eq!(info.extent().depth, 1);
    }

    #[test]
    fn rgba8_image_is_optimal_sampled_and_shader_readable() -> anyhow::Result<()> {
        let device = MockGfxDevice::new();
        let pixels = checker_pixels(4, 2);
        let image = GfxImageFactory::create_image_from_rgba8(&device, device.command_pool(), 4, 2, &pixels, "checker")?;

        let info = device.image_info(image.handle()).expect("image is alive");
        assert_eq!(info.format(), vk::Format::R8G8B8A8_UNORM);
        assert_eq!(info.tiling(), vk::ImageTiling::OPTIMAL);
        assert_eq!(info.usage(), vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED);
        assert_eq!(device.image_layout(image.handle()), Some(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL));
        assert_eq!(device.image_contents(image.handle()), Some(pixels));
        assert_eq!((image.width(), image.height()), (4, 2));

        // stage buffer 已经释放
        assert_eq!(device.live_buffer_count(), 0);
        image.destroy(&device);
        assert_eq!(device.live_resource_count(), 0);
        Ok(())
    }

    #[test]
    fn mismatched_pixel_count_is_rejected() {
        let device = MockGfxDevice::new();
        let result = GfxImageFactory::create_image_from_rgba8(&device, device.command_pool(), 4, 4, &[0; 12], "bad");

        assert!(matches!(result, Err(GfxError::PixelSizeMismatch { expected: 64, actual: 12 })));
        assert!(device.calls().is_empty());
    }

    #[test]
    fn image_released_when_upload_fails() {
        let device = MockGfxDevice::with_failure(MockFailure::Submit);
        let result = GfxImageFactory::create_image_from_rgba8(&device, device.command_pool(), 2, 2, &[0; 16], "lost");

        assert!(result.is_err());
        assert_eq!(device.live_resource_count(), 0);
    }
}
