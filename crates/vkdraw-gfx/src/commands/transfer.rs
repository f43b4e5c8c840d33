use ash::vk;

use crate::{commands::barrier::GfxImageBarrier, device_api::GfxTransferOp};

/// 将 [`GfxTransferOp`] 录制到 command buffer 中
pub struct GfxTransferRecorder;

impl GfxTransferRecorder {
    /// # Safety
    /// command_buffer 必须处于 recording 状态，op 中引用的 handle 必须存活到提交完成
    pub unsafe fn record(device: &ash::Device, command_buffer: vk::CommandBuffer, op: &GfxTransferOp) {
        match *op {
            GfxTransferOp::CopyBuffer { src, dst, size } => {
                let region = vk::BufferCopy2::default().src_offset(0).dst_offset(0).size(size);
                let copy_info = vk::CopyBufferInfo2::default()
                    .src_buffer(src)
                    .dst_buffer(dst)
                    .regions(std::slice::from_ref(&region));
                unsafe { device.cmd_copy_buffer2(command_buffer, &copy_info) };
            }
            GfxTransferOp::CopyBufferToImage { src, dst, extent } => {
                Self::image_barrier(device, command_buffer, &GfxImageBarrier::before_upload(dst));

                let buffer_image_copy = vk::BufferImageCopy2::default()
                    .buffer_offset(0)
                    .buffer_row_length(0)
                    .buffer_image_height(0)
                    .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                    .image_extent(extent)
                    .image_subresource(vk::ImageSubresourceLayers {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        mip_level: 0,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                let copy_info = vk::CopyBufferToImageInfo2::default()
                    .src_buffer(src)
                    .dst_image(dst)
                    .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                    .regions(std::slice::from_ref(&buffer_image_copy));
                unsafe { device.cmd_copy_buffer_to_image2(command_buffer, &copy_info) };

                Self::image_barrier(device, command_buffer, &GfxImageBarrier::after_upload(dst));
            }
        }
    }

    fn image_barrier(device: &ash::Device, command_buffer: vk::CommandBuffer, barrier: &GfxImageBarrier) {
        let dependency_info = vk::DependencyInfo::default()
            .image_memory_barriers(std::slice::from_ref(barrier.inner()))
            .dependency_flags(vk::DependencyFlags::empty());
        unsafe { device.cmd_pipeline_barrier2(command_buffer, &dependency_info) };
    }
}
