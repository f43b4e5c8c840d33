pub mod commands;
pub mod device_api;
pub mod error;
pub mod foundation;
pub mod resources;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use device_api::{GfxBufferDesc, GfxDeviceApi, GfxMemoryLocation};
pub use error::{GfxError, GfxResult};
