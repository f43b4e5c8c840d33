//! TextureLoader Tests
//!
//! Tests for:
//! - RGBA8 upload into an OPTIMAL, sampled, shader-readable image
//! - Image view and sampler creation
//! - Io / Decode failures happening before any device call

use std::path::PathBuf;

use ash::vk;
use vkdraw_asset::{AssetError, TextureLoader};
use vkdraw_gfx::{
    GfxDeviceApi,
    mock::{MockFailure, MockGfxDevice},
    resources::sampler::GfxSamplerDesc,
};

/// 在系统临时目录写入一张 PNG
fn write_png(name: &str, width: u32, height: u32) -> anyhow::Result<PathBuf> {
    let path = std::env::temp_dir().join(format!("vkdraw-{}-{name}.png", std::process::id()));
    let img = image::RgbaImage::from_fn(width, height, |x, y| image::Rgba([x as u8, y as u8, 0x80, 0xff]));
    img.save(&path)?;
    Ok(path)
}

// ============================================================================
// Upload
// ============================================================================

#[test]
fn texture_is_uploaded_as_rgba8() -> anyhow::Result<()> {
    vkdraw_tools::init_log();
    let path = write_png("upload", 3, 2)?;
    let device = MockGfxDevice::new();

    let image = TextureLoader::load_texture(&device, device.command_pool(), &path)?;

    let info = device.image_info(image.handle()).expect("image is alive");
    assert_eq!(info.format(), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(info.tiling(), vk::ImageTiling::OPTIMAL);
    assert_eq!(info.usage(), vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED);
    assert_eq!(device.image_layout(image.handle()), Some(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL));

    let expected = TextureLoader::decode_rgba8(&path)?.into_raw();
    assert_eq!(device.image_contents(image.handle()), Some(expected));

    image.destroy(&device);
    assert_eq!(device.live_resource_count(), 0);
    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn view_and_sampler_reference_the_image() -> anyhow::Result<()> {
    let path = write_png("view", 2, 2)?;
    let device = MockGfxDevice::new();
    let image = TextureLoader::load_texture(&device, device.command_pool(), &path)?;

    let view = TextureLoader::create_image_view(&device, image.handle())?;
    let sampler = TextureLoader::create_sampler(&device, &GfxSamplerDesc::default())?;

    let (target, desc) = device.image_view_target(view).expect("view is alive");
    assert_eq!(target, image.handle());
    assert_eq!(desc.format(), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(desc.view_type(), vk::ImageViewType::TYPE_2D);
    assert_eq!(device.sampler_desc(sampler), Some(GfxSamplerDesc::default()));

    device.destroy_sampler(sampler);
    device.destroy_image_view(view);
    image.destroy(&device);
    assert_eq!(device.live_resource_count(), 0);
    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn image_creation_failure_is_a_gfx_error() -> anyhow::Result<()> {
    let path = write_png("oom", 2, 2)?;
    let device = MockGfxDevice::with_failure(MockFailure::ImageCreation);

    let err = TextureLoader::load_texture(&device, device.command_pool(), &path).unwrap_err();
    assert!(matches!(err, AssetError::Gfx(_)));
    assert_eq!(device.live_resource_count(), 0);
    std::fs::remove_file(path)?;
    Ok(())
}

// ============================================================================
// Failures before any device call
// ============================================================================

#[test]
fn missing_file_is_an_io_error() {
    let device = MockGfxDevice::new();
    let path = std::env::temp_dir().join("vkdraw-no-such-texture.png");

    let err = TextureLoader::load_texture(&device, device.command_pool(), &path).unwrap_err();
    assert!(matches!(err, AssetError::Io { .. }), "got {err}");
    assert!(device.calls().is_empty());
}

#[test]
fn garbage_bytes_are_a_decode_error() -> anyhow::Result<()> {
    let device = MockGfxDevice::new();
    let path = std::env::temp_dir().join(format!("vkdraw-{}-garbage.png", std::process::id()));
    std::fs::write(&path, b"definitely not a png")?;

    let err = TextureLoader::load_texture(&device, device.command_pool(), &path).unwrap_err();
    assert!(matches!(err, AssetError::Decode { .. }), "got {err}");
    assert!(device.calls().is_empty());
    std::fs::remove_file(path)?;
    Ok(())
}
