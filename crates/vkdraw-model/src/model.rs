use std::path::Path;

use ash::vk;
use vkdraw_asset::{GeometryLoadOptions, GeometryLoader, TextureLoader};
use vkdraw_gfx::{
    GfxDeviceApi,
    resources::{
        buffer::GfxBufferFactory,
        sampler::GfxSamplerDesc,
        vertex_layout::{GfxIndexType, GfxVertexLayout, Vertex, VertexLayoutAoS},
    },
};

use crate::{
    error::{ModelError, ModelResult},
    resource_set::OwnedResourceSet,
    texture_set::GfxTextureSet,
    transform::ModelTransform,
};

#[derive(Clone, Debug, Default)]
pub struct ModelLoadOptions {
    pub geometry: GeometryLoadOptions,
    pub sampler: GfxSamplerDesc,
    /// 为空时使用网格文件名，再为空时使用 "model"
    pub debug_name: Option<String>,
}

/// 模型数据的来源
#[derive(Clone, Debug)]
pub enum ModelSource<'p> {
    /// 程序生成的几何，没有纹理
    Arrays { vertices: Vec<Vertex>, indices: Vec<u32> },
    /// 从 OBJ 文件加载几何，纹理可选
    Files {
        mesh_path: &'p Path,
        texture_path: Option<&'p Path>,
    },
}

/// 可绘制的模型
///
/// 持有几何数据、变换以及可选的纹理，并独占所有由它创建的 device 对象：
/// - vertex buffer（顶点非空时）
/// - index buffer（索引非空时）
/// - 变换的 uniform buffer（总是存在）
/// - 纹理的 image、image view、sampler（提供纹理路径时）
///
/// device 和 command pool 只是借用，模型永远不会销毁它们。
/// [`Model::destroy`] 可以重复调用，drop 时也会自动调用。
pub struct Model<'a, D: GfxDeviceApi> {
    name: String,

    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    transform: ModelTransform,

    vertex_buffer: vk::Buffer,
    index_buffer: vk::Buffer,
    uniform_buffer: vk::Buffer,
    texture: GfxTextureSet,

    resources: OwnedResourceSet<'a, D>,
}

// new & init
impl<'a, D: GfxDeviceApi> Model<'a, D> {
    pub fn from_arrays(
        device: &'a D,
        command_pool: vk::CommandPool,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
    ) -> ModelResult<Self> {
        Self::from_arrays_with(device, command_pool, vertices, indices, &ModelLoadOptions::default())
    }

    pub fn from_arrays_with(
        device: &'a D,
        command_pool: vk::CommandPool,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
        options: &ModelLoadOptions,
    ) -> ModelResult<Self> {
        Self::build(device, command_pool, ModelSource::Arrays { vertices, indices }, options)
    }

    pub fn from_files(
        device: &'a D,
        command_pool: vk::CommandPool,
        mesh_path: &Path,
        texture_path: Option<&Path>,
    ) -> ModelResult<Self> {
        Self::from_files_with(device, command_pool, mesh_path, texture_path, &ModelLoadOptions::default())
    }

    pub fn from_files_with(
        device: &'a D,
        command_pool: vk::CommandPool,
        mesh_path: &Path,
        texture_path: Option<&Path>,
        options: &ModelLoadOptions,
    ) -> ModelResult<Self> {
        Self::build(
            device,
            command_pool,
            ModelSource::Files {
                mesh_path,
                texture_path,
            },
            options,
        )
    }

    /// # 实现步骤
    /// 0. 如果来源是文件，先解析网格（此时还没有任何 device 对象）
    /// 1. 顶点非空时创建 vertex buffer
    /// 2. 索引非空时创建 index buffer
    /// 3. 将单位矩阵上传到 uniform buffer
    /// 4. 提供纹理路径时创建 image、image view 和 sampler
    ///
    /// 任意一步失败，之前创建的对象都会按相反顺序释放
    pub fn build(
        device: &'a D,
        command_pool: vk::CommandPool,
        source: ModelSource<'_>,
        options: &ModelLoadOptions,
    ) -> ModelResult<Self> {
        let (name, vertices, indices, texture_path) = match source {
            ModelSource::Arrays { vertices, indices } => {
                let name = options.debug_name.clone().unwrap_or_else(|| "model".to_string());
                (name, vertices, indices, None)
            }
            ModelSource::Files {
                mesh_path,
                texture_path,
            } => {
                let (vertices, indices) = GeometryLoader::load_with(mesh_path, &options.geometry)?;
                let name = options.debug_name.clone().unwrap_or_else(|| {
                    mesh_path.file_stem().map_or_else(|| "model".to_string(), |s| s.to_string_lossy().into_owned())
                });
                (name, vertices, indices, texture_path)
            }
        };

        // 任何 device 调用之前检查索引
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(ModelError::InvalidIndex {
                index,
                vertex_count: vertices.len(),
            });
        }

        let mut resources = OwnedResourceSet::new(device);

        // 1.
        let vertex_buffer = if vertices.is_empty() {
            vk::Buffer::null()
        } else {
            resources.push_buffer(GfxBufferFactory::create_buffer_from_slice(
                device,
                command_pool,
                &vertices,
                vk::BufferUsageFlags::VERTEX_BUFFER,
                &format!("{name}-vertex"),
            )?)
        };

        // 2.
        let index_buffer = if indices.is_empty() {
            vk::Buffer::null()
        } else {
            resources.push_buffer(GfxBufferFactory::create_buffer_from_slice(
                device,
                command_pool,
                &indices,
                vk::BufferUsageFlags::INDEX_BUFFER,
                &format!("{name}-index"),
            )?)
        };

        // 3.
        let transform = ModelTransform::IDENTITY;
        let uniform_buffer = resources.push_buffer(GfxBufferFactory::create_buffer_from_slice(
            device,
            command_pool,
            std::slice::from_ref(&transform),
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            &format!("{name}-transform"),
        )?);

        // 4.
        let texture = match texture_path {
            Some(texture_path) => Self::create_texture_set(&mut resources, command_pool, texture_path, &options.sampler)?,
            None => GfxTextureSet::NULL,
        };

        log::info!(
            "model {name} created: {} vertices, {} indices, texture: {}",
            vertices.len(),
            indices.len(),
            !texture.is_null()
        );

        Ok(Self {
            name,
            vertices,
            indices,
            transform,
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            texture,
            resources,
        })
    }

    fn create_texture_set(
        resources: &mut OwnedResourceSet<'a, D>,
        command_pool: vk::CommandPool,
        texture_path: &Path,
        sampler_desc: &GfxSamplerDesc,
    ) -> ModelResult<GfxTextureSet> {
        let device = resources.device();

        let image = TextureLoader::load_texture(device, command_pool, texture_path)?;
        let memory = device.device_memory(image.allocation());
        let image = resources.push_image(image);
        let view = resources.push_image_view(TextureLoader::create_image_view(device, image)?);
        let sampler = resources.push_sampler(TextureLoader::create_sampler(device, sampler_desc)?);

        Ok(GfxTextureSet {
            image,
            memory,
            view,
            sampler,
        })
    }
}
// destroy
impl<D: GfxDeviceApi> Model<'_, D> {
    /// 逆序释放所有创建过的 device 对象，之后所有 handle 都为 null
    pub fn destroy(&mut self) {
        if self.resources.is_empty() {
            return;
        }
        log::debug!("destroying model {}", self.name);

        self.resources.release_all();
        self.vertex_buffer = vk::Buffer::null();
        self.index_buffer = vk::Buffer::null();
        self.uniform_buffer = vk::Buffer::null();
        self.texture = GfxTextureSet::NULL;
    }
}
impl<D: GfxDeviceApi> Drop for Model<'_, D> {
    fn drop(&mut self) {
        self.destroy();
    }
}
// getter
impl<D: GfxDeviceApi> Model<'_, D> {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// 绑定 index buffer 时使用的索引类型
    #[inline]
    pub fn index_type(&self) -> vk::IndexType {
        u32::VK_INDEX_TYPE
    }

    /// 顶点为空时是 null
    #[inline]
    pub fn vertex_buffer(&self) -> vk::Buffer {
        self.vertex_buffer
    }

    /// 索引为空时是 null
    #[inline]
    pub fn index_buffer(&self) -> vk::Buffer {
        self.index_buffer
    }

    #[inline]
    pub fn uniform_buffer(&self) -> vk::Buffer {
        self.uniform_buffer
    }

    #[inline]
    pub fn vertex_buffer_size(&self) -> vk::DeviceSize {
        VertexLayoutAoS::buffer_size(self.vertices.len()) as vk::DeviceSize
    }

    #[inline]
    pub fn index_buffer_size(&self) -> vk::DeviceSize {
        (self.indices.len() * u32::byte_size()) as vk::DeviceSize
    }

    #[inline]
    pub fn uniform_buffer_size(&self) -> vk::DeviceSize {
        size_of::<ModelTransform>() as vk::DeviceSize
    }

    #[inline]
    pub fn transform(&self) -> &ModelTransform {
        &self.transform
    }

    #[inline]
    pub fn has_texture(&self) -> bool {
        !self.texture.is_null()
    }

    #[inline]
    pub fn texture(&self) -> vk::Image {
        self.texture.image
    }

    #[inline]
    pub fn texture_memory(&self) -> vk::DeviceMemory {
        self.texture.memory
    }

    #[inline]
    pub fn texture_view(&self) -> vk::ImageView {
        self.texture.view
    }

    #[inline]
    pub fn texture_sampler(&self) -> vk::Sampler {
        self.texture.sampler
    }

    #[inline]
    pub fn texture_set(&self) -> &GfxTextureSet {
        &self.texture
    }
}
