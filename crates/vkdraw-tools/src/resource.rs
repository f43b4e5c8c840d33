use std::path::{Path, PathBuf};

/// 统一资源路径管理
///
/// 所有路径基于工作区根目录（通过 `CARGO_MANIFEST_DIR` 推导）。
/// 避免使用硬编码相对路径，测试从任意 crate 运行时路径都一致。
///
/// # 使用示例
/// ```ignore
/// let mesh = VkdrawPath::assets_path("obj/triangle.obj"); // assets/obj/triangle.obj
/// ```
pub struct VkdrawPath {}
impl VkdrawPath {
    /// 获取 `assets/` 目录下的文件路径
    pub fn assets_path(filename: &str) -> PathBuf {
        Self::workspace_path().join("assets").join(filename)
    }

    /// 获取工作区根目录
    pub fn workspace_path() -> PathBuf {
        // 从 crates/vkdraw-tools 向上两级到 workspace root
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        manifest_dir.ancestors().nth(2).unwrap_or(manifest_dir).to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assets_path_is_under_workspace() {
        let path = VkdrawPath::assets_path("obj/triangle.obj");
        assert!(path.starts_with(VkdrawPath::workspace_path()));
        assert!(path.exists(), "missing fixture: {}", path.display());
    }
}
