use ash::vk;

#[derive(thiserror::Error, Debug)]
pub enum GfxError {
    #[error("Vulkan error: {0}")]
    Vk(#[from] vk::Result),
    #[error("Cannot create a zero-sized {0}")]
    EmptyResource(&'static str),
    #[error("Allocation is not host visible")]
    NotHostVisible,
    #[error("Pixel data size mismatch: expected {expected} bytes, got {actual}")]
    PixelSizeMismatch { expected: usize, actual: usize },
}

pub type GfxResult<T> = Result<T, GfxError>;
