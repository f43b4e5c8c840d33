//! GeometryLoader Tests
//!
//! Tests for:
//! - Sequential indices, one vertex per face-vertex occurrence
//! - Texture coordinate flip (v' = 1 - v)
//! - Polygon triangulation and multi-object concatenation
//! - Parse failures carrying the parser's message

use vkdraw_asset::{AssetError, GeometryLoadOptions, GeometryLoader};
use vkdraw_gfx::resources::vertex_layout::Vertex;
use vkdraw_tools::VkdrawPath;

const EPSILON: f32 = 1e-6;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

// ============================================================================
// Triangles
// ============================================================================

#[test]
fn triangle_has_sequential_indices() -> anyhow::Result<()> {
    vkdraw_tools::init_log();
    let (vertices, indices) = GeometryLoader::load(&VkdrawPath::assets_path("obj/triangle.obj"))?;

    assert_eq!(vertices.len(), 3);
    assert_eq!(indices, vec![0, 1, 2]);
    Ok(())
}

#[test]
fn triangle_positions_are_homogeneous_and_white() -> anyhow::Result<()> {
    let (vertices, _) = GeometryLoader::load(&VkdrawPath::assets_path("obj/triangle.obj"))?;

    assert_eq!(vertices[0].position, [-0.5, -0.5, 0.0, 1.0]);
    assert_eq!(vertices[2].position, [0.0, 0.5, 0.0, 1.0]);
    assert!(vertices.iter().all(|v| v.color == Vertex::WHITE));
    Ok(())
}

#[test]
fn triangle_texcoords_are_flipped() -> anyhow::Result<()> {
    let (vertices, _) = GeometryLoader::load(&VkdrawPath::assets_path("obj/triangle.obj"))?;

    let file_uvs = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]];
    for (vertex, file_uv) in vertices.iter().zip(file_uvs) {
        assert!(approx(vertex.tex_coord[0], file_uv[0]));
        assert!(approx(vertex.tex_coord[1], 1.0 - file_uv[1]));
    }
    Ok(())
}

// ============================================================================
// Polygons & multiple objects
// ============================================================================

#[test]
fn quad_face_is_triangulated_without_sharing() -> anyhow::Result<()> {
    let (vertices, indices) = GeometryLoader::load(&VkdrawPath::assets_path("obj/quad.obj"))?;

    assert_eq!(indices, (0..6).collect::<Vec<u32>>());
    let positions: Vec<[f32; 2]> = vertices.iter().map(|v| [v.position[0], v.position[1]]).collect();
    assert_eq!(
        positions,
        vec![[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]]
    );
    Ok(())
}

#[test]
fn objects_are_concatenated_in_file_order() -> anyhow::Result<()> {
    let (vertices, indices) = GeometryLoader::load(&VkdrawPath::assets_path("obj/two_objects.obj"))?;

    assert_eq!(vertices.len(), 6);
    assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(vertices[0].position[2], 0.0);
    assert_eq!(vertices[3].position[2], 1.0);

    assert!(approx(vertices[0].tex_coord[1], 0.75));
    assert!(approx(vertices[3].tex_coord[0], 0.1));
    assert!(approx(vertices[3].tex_coord[1], 0.8));
    Ok(())
}

#[test]
fn dedup_option_keeps_distinct_vertices_apart() -> anyhow::Result<()> {
    let options = GeometryLoadOptions { dedup_vertices: true };
    let (vertices, indices) = GeometryLoader::load_with(&VkdrawPath::assets_path("obj/quad.obj"), &options)?;

    assert_eq!(vertices.len(), 4);
    assert_eq!(indices, vec![0, 1, 2, 0, 2, 3]);
    Ok(())
}

#[test]
fn missing_texcoords_use_default_uv() -> anyhow::Result<()> {
    let (vertices, indices) = GeometryLoader::load(&VkdrawPath::assets_path("obj/no_texcoords.obj"))?;

    assert_eq!(indices, vec![0, 1, 2]);
    assert!(vertices.iter().all(|v| v.tex_coord == [0.0, 1.0]));
    Ok(())
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn malformed_file_is_a_parse_error() {
    let path = VkdrawPath::assets_path("obj/malformed.obj");
    let err = GeometryLoader::load(&path).unwrap_err();

    match err {
        AssetError::Parse { path: err_path, message } => {
            assert_eq!(err_path, path);
            assert_eq!(message, tobj::LoadError::PositionParseError.to_string());
        }
        other => panic!("expected parse error, got {other}"),
    }
}

#[test]
fn missing_file_is_a_parse_error() {
    let err = GeometryLoader::load(&VkdrawPath::assets_path("obj/does_not_exist.obj")).unwrap_err();

    match err {
        AssetError::Parse { message, .. } => {
            assert_eq!(message, tobj::LoadError::OpenFileFailed.to_string());
        }
        other => panic!("expected parse error, got {other}"),
    }
}
