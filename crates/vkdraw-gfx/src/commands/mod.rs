pub mod barrier;
pub mod transfer;
