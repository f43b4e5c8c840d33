pub mod error;
pub mod model;
pub mod resource_set;
pub mod texture_set;
pub mod transform;

pub use error::{ModelError, ModelResult};
pub use model::{Model, ModelLoadOptions, ModelSource};
pub use resource_set::{OwnedResourceSet, ResourceSlot};
pub use texture_set::GfxTextureSet;
pub use transform::ModelTransform;
