use vkdraw_asset::AssetError;
use vkdraw_gfx::GfxError;

#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Device(#[from] GfxError),
    #[error("index {index} is out of range for {vertex_count} vertices")]
    InvalidIndex { index: u32, vertex_count: usize },
}

pub type ModelResult<T> = Result<T, ModelError>;
