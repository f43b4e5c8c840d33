use std::path::Path;

use ash::vk;
use vkdraw_gfx::{
    GfxDeviceApi,
    resources::{
        image::{GfxAllocatedImage, GfxImageFactory},
        image_view::GfxImageViewDesc,
        sampler::GfxSamplerDesc,
    },
};

use crate::error::{AssetError, AssetResult};

/// 纹理总是以这个格式上传
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// 将图片文件解码为 RGBA8，并创建对应的 image、image view 和 sampler
pub struct TextureLoader;

impl TextureLoader {
    /// 解码图片并同步上传到 device local 的 image，
    /// 上传完成后 image 处于 SHADER_READ_ONLY_OPTIMAL
    pub fn load_texture<D: GfxDeviceApi>(
        device: &D,
        command_pool: vk::CommandPool,
        path: &Path,
    ) -> AssetResult<GfxAllocatedImage<D::Allocation>> {
        let pixels = Self::decode_rgba8(path)?;
        let (width, height) = pixels.dimensions();

        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let image = GfxImageFactory::create_image_from_rgba8(device, command_pool, width, height, pixels.as_raw(), &name)?;
        log::info!("loaded texture {}: {width}x{height}", path.display());

        Ok(image)
    }

    /// 读取并解码为 RGBA8，不涉及 device
    pub fn decode_rgba8(path: &Path) -> AssetResult<image::RgbaImage> {
        let io_error = |source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        };

        let reader = image::ImageReader::open(path).map_err(io_error)?.with_guessed_format().map_err(io_error)?;
        let decoded = reader.decode().map_err(|e| match e {
            image::ImageError::IoError(source) => io_error(source),
            source => AssetError::Decode {
                path: path.to_path_buf(),
                source,
            },
        })?;

        Ok(decoded.to_rgba8())
    }

    pub fn create_image_view<D: GfxDeviceApi>(device: &D, image: vk::Image) -> AssetResult<vk::ImageView> {
        let desc = GfxImageViewDesc::new_2d(TEXTURE_FORMAT, vk::ImageAspectFlags::COLOR);
        let view = device.create_image_view(image, &desc)?;
        device.set_debug_name(view, "ImageView::texture");
        log::debug!("created image view {view:?} for {image:?}");

        Ok(view)
    }

    pub fn create_sampler<D: GfxDeviceApi>(device: &D, desc: &GfxSamplerDesc) -> AssetResult<vk::Sampler> {
        let sampler = device.create_sampler(desc)?;
        device.set_debug_name(sampler, "Sampler::texture");
        log::debug!("created sampler {sampler:?}");

        Ok(sampler)
    }
}
