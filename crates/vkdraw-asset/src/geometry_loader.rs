use std::{
    collections::HashMap,
    io::BufRead,
    path::{Path, PathBuf},
};

use vkdraw_gfx::resources::vertex_layout::Vertex;

use crate::error::{AssetError, AssetResult};

/// 网格完全没有 `vt` 记录时使用的 uv，等价于文件中的 (0, 0) 经过翻转
const MISSING_TEX_COORD: [f32; 2] = [0.0, 1.0];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GeometryLoadOptions {
    /// 相同的 (position, texcoord) 组合只生成一个顶点。
    /// 默认关闭：每个面顶点都会生成独立的顶点和索引
    pub dedup_vertices: bool,
}

/// 将 OBJ 网格展开为三角形顶点数组和索引数组
///
/// - 多边形面由解析器三角化
/// - 纹理坐标的 v 会被翻转：`v' = 1 - v`
/// - 顶点颜色固定为白色
/// - 多个 object/group 按文件顺序拼接
pub struct GeometryLoader;

impl GeometryLoader {
    pub fn load(path: &Path) -> AssetResult<(Vec<Vertex>, Vec<u32>)> {
        Self::load_with(path, &GeometryLoadOptions::default())
    }

    pub fn load_with(path: &Path, options: &GeometryLoadOptions) -> AssetResult<(Vec<Vertex>, Vec<u32>)> {
        let (models, _materials) = tobj::load_obj(path, &Self::tobj_options()).map_err(|e| AssetError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let (vertices, indices) = Self::flatten(&models, options);
        log::info!(
            "loaded mesh {}: {} vertices, {} indices",
            path.display(),
            vertices.len(),
            indices.len()
        );
        Ok((vertices, indices))
    }

    /// 从任意 reader 中解析 OBJ 文本，忽略材质
    pub fn load_from_reader<R: BufRead>(
        reader: &mut R,
        options: &GeometryLoadOptions,
    ) -> AssetResult<(Vec<Vertex>, Vec<u32>)> {
        let (models, _materials) = tobj::load_obj_buf(reader, &Self::tobj_options(), |_| Ok(Default::default()))
            .map_err(|e| AssetError::Parse {
                path: PathBuf::from("<reader>"),
                message: e.to_string(),
            })?;

        Ok(Self::flatten(&models, options))
    }

    fn tobj_options() -> tobj::LoadOptions {
        tobj::LoadOptions {
            single_index: false,
            triangulate: true,
            ignore_lines: true,
            ignore_points: true,
            ..Default::default()
        }
    }

    fn flatten(models: &[tobj::Model], options: &GeometryLoadOptions) -> (Vec<Vertex>, Vec<u32>) {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        // (model, position index, texcoord index) -> 顶点索引
        let mut unique_vertices: HashMap<(usize, u32, Option<u32>), u32> = HashMap::new();

        for (model_idx, model) in models.iter().enumerate() {
            let mesh = &model.mesh;
            for (k, &position_idx) in mesh.indices.iter().enumerate() {
                let texcoord_idx = Self::texcoord_index(mesh, k, position_idx);

                if options.dedup_vertices {
                    if let Some(&index) = unique_vertices.get(&(model_idx, position_idx, texcoord_idx)) {
                        indices.push(index);
                        continue;
                    }
                }

                let p = position_idx as usize;
                let position = [mesh.positions[3 * p], mesh.positions[3 * p + 1], mesh.positions[3 * p + 2]];
                let tex_coord = texcoord_idx.map_or(MISSING_TEX_COORD, |t| Self::flipped_tex_coord(mesh, t as usize));

                let index = vertices.len() as u32;
                vertices.push(Vertex::new(position, tex_coord));
                indices.push(index);
                if options.dedup_vertices {
                    unique_vertices.insert((model_idx, position_idx, texcoord_idx), index);
                }
            }
        }

        (vertices, indices)
    }

    /// 第 k 个面顶点对应的纹理坐标索引，网格没有纹理坐标时为 None
    ///
    /// 网格有 `vt` 记录时，省略了 `/vt` 的面顶点由 tobj 补上最近一次出现的纹理坐标索引
    /// （之前没有出现过则为 0），因此这些顶点使用该记录翻转后的 uv 而不是 `MISSING_TEX_COORD`
    fn texcoord_index(mesh: &tobj::Mesh, k: usize, position_idx: u32) -> Option<u32> {
        if mesh.texcoords.is_empty() {
            return None;
        }
        if mesh.texcoord_indices.is_empty() {
            return Some(position_idx);
        }
        mesh.texcoord_indices.get(k).copied()
    }

    fn flipped_tex_coord(mesh: &tobj::Mesh, t: usize) -> [f32; 2] {
        match (mesh.texcoords.get(2 * t), mesh.texcoords.get(2 * t + 1)) {
            (Some(&u), Some(&v)) => [u, 1.0 - v],
            _ => {
                log::warn!("texcoord index {t} out of range, using default uv");
                MISSING_TEX_COORD
            }
        }
    }
}
