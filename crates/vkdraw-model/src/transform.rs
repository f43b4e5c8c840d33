use glam::Mat4;

/// 每个实例的变换，镜像到 uniform buffer 中
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelTransform {
    pub model: Mat4,
}
impl ModelTransform {
    pub const IDENTITY: Self = Self { model: Mat4::IDENTITY };
}
impl Default for ModelTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
