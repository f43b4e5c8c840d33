pub mod init_log;
pub mod resource;

pub use init_log::init_log;
pub use resource::VkdrawPath;
