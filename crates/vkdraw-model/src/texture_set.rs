use ash::vk::{self, Handle};

/// 漫反射纹理用到的全部 handle
///
/// 要么四个都有效，要么四个都是 null
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GfxTextureSet {
    pub image: vk::Image,
    /// image 的 allocation 背后的内存，仅用于查询
    pub memory: vk::DeviceMemory,
    pub view: vk::ImageView,
    pub sampler: vk::Sampler,
}
impl GfxTextureSet {
    pub const NULL: Self = Self {
        image: vk::Image::null(),
        memory: vk::DeviceMemory::null(),
        view: vk::ImageView::null(),
        sampler: vk::Sampler::null(),
    };

    #[inline]
    pub fn is_null(&self) -> bool {
        self.image.is_null()
    }

    /// 全有或全无
    #[inline]
    pub fn is_consistent(&self) -> bool {
        let nulls = [
            self.image.is_null(),
            self.memory.is_null(),
            self.view.is_null(),
            self.sampler.is_null(),
        ];
        nulls.iter().all(|&n| n) || nulls.iter().all(|&n| !n)
    }
}
impl Default for GfxTextureSet {
    fn default() -> Self {
        Self::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_set_is_consistent() {
        assert!(GfxTextureSet::NULL.is_null());
        assert!(GfxTextureSet::default().is_consistent());
    }

    #[test]
    fn partially_filled_set_is_inconsistent() {
        let set = GfxTextureSet {
            image: vk::Image::from_raw(1),
            ..GfxTextureSet::NULL
        };
        assert!(!set.is_null());
        assert!(!set.is_consistent());
    }
}
