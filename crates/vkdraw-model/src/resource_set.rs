use ash::vk;
use vkdraw_gfx::{
    GfxDeviceApi,
    resources::{buffer::GfxAllocatedBuffer, image::GfxAllocatedImage},
};

/// 一个已经创建成功的 device 对象
#[derive(Debug)]
pub enum ResourceSlot<A> {
    Buffer(GfxAllocatedBuffer<A>),
    Image(GfxAllocatedImage<A>),
    ImageView(vk::ImageView),
    Sampler(vk::Sampler),
}
impl<A> ResourceSlot<A> {
    fn release<D>(self, device: &D)
    where
        D: GfxDeviceApi<Allocation = A>,
    {
        match self {
            ResourceSlot::Buffer(buffer) => buffer.destroy(device),
            ResourceSlot::Image(image) => image.destroy(device),
            ResourceSlot::ImageView(view) => {
                log::debug!("destroying image view {view:?}");
                device.destroy_image_view(view);
            }
            ResourceSlot::Sampler(sampler) => {
                log::debug!("destroying sampler {sampler:?}");
                device.destroy_sampler(sampler);
            }
        }
    }
}

/// 按创建顺序记录 device 对象，按相反顺序释放
///
/// 构造过程中途失败时，set 被 drop，已经创建的对象会被全部释放；
/// 每个对象只会被释放一次。
pub struct OwnedResourceSet<'a, D: GfxDeviceApi> {
    device: &'a D,
    slots: Vec<ResourceSlot<D::Allocation>>,
}
impl<'a, D: GfxDeviceApi> OwnedResourceSet<'a, D> {
    pub fn new(device: &'a D) -> Self {
        Self {
            device,
            slots: Vec::new(),
        }
    }

    #[inline]
    pub fn device(&self) -> &'a D {
        self.device
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn push(&mut self, slot: ResourceSlot<D::Allocation>) {
        self.slots.push(slot);
    }

    pub fn push_buffer(&mut self, buffer: GfxAllocatedBuffer<D::Allocation>) -> vk::Buffer {
        let handle = buffer.handle();
        self.push(ResourceSlot::Buffer(buffer));
        handle
    }

    pub fn push_image(&mut self, image: GfxAllocatedImage<D::Allocation>) -> vk::Image {
        let handle = image.handle();
        self.push(ResourceSlot::Image(image));
        handle
    }

    pub fn push_image_view(&mut self, view: vk::ImageView) -> vk::ImageView {
        self.push(ResourceSlot::ImageView(view));
        view
    }

    pub fn push_sampler(&mut self, sampler: vk::Sampler) -> vk::Sampler {
        self.push(ResourceSlot::Sampler(sampler));
        sampler
    }

    /// 逆序释放所有对象，之后 set 为空，可以重复调用
    pub fn release_all(&mut self) {
        if self.slots.is_empty() {
            return;
        }
        log::debug!("releasing {} device objects", self.slots.len());
        while let Some(slot) = self.slots.pop() {
            slot.release(self.device);
        }
    }
}
impl<D: GfxDeviceApi> Drop for OwnedResourceSet<'_, D> {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkdraw_gfx::{
        GfxBufferDesc,
        mock::{MockCall, MockGfxDevice},
        resources::sampler::GfxSamplerDesc,
    };

    #[test]
    fn releases_in_reverse_creation_order() -> anyhow::Result<()> {
        let device = MockGfxDevice::new();
        let mut set = OwnedResourceSet::new(&device);

        let buffer = set.push_buffer(GfxAllocatedBuffer::new(
            &device,
            &GfxBufferDesc::device_local(16, ash::vk::BufferUsageFlags::UNIFORM_BUFFER),
            "ubo",
        )?);
        let sampler = set.push_sampler(device.create_sampler(&GfxSamplerDesc::default())?);
        assert_eq!(set.len(), 2);

        set.release_all();
        assert!(set.is_empty());

        let destroys: Vec<MockCall> = device
            .calls()
            .into_iter()
            .filter(|c| matches!(c, MockCall::DestroyBuffer(_) | MockCall::DestroySampler(_)))
            .collect();
        assert_eq!(destroys, vec![MockCall::DestroySampler(sampler), MockCall::DestroyBuffer(buffer)]);
        Ok(())
    }

    #[test]
    fn drop_releases_remaining_slots_once() -> anyhow::Result<()> {
        let device = MockGfxDevice::new();
        {
            let mut set = OwnedResourceSet::new(&device);
            set.push_sampler(device.create_sampler(&GfxSamplerDesc::default())?);
            set.release_all();
            set.release_all();
        }
        assert_eq!(device.live_resource_count(), 0);
        assert_eq!(device.count_calls(|c| matches!(c, MockCall::DestroySampler(_))), 1);
        Ok(())
    }

    #[test]
    fn empty_set_makes_no_device_calls() {
        let device = MockGfxDevice::new();
        drop(OwnedResourceSet::new(&device));
        assert!(device.calls().is_empty());
    }
}
