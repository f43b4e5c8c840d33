pub mod error;
pub mod geometry_loader;
pub mod texture_loader;

pub use error::{AssetError, AssetResult};
pub use geometry_loader::{GeometryLoadOptions, GeometryLoader};
pub use texture_loader::TextureLoader;
