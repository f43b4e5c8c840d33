use std::path::PathBuf;

use vkdraw_gfx::GfxError;

#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    /// message 是解析器给出的原文
    #[error("Failed to load mesh {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode image {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Gfx(#[from] GfxError),
}

pub type AssetResult<T> = Result<T, AssetError>;
