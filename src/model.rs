use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use gltf::buffer;

use crate::assets::AssetError;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub color: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct ModelPrimitive {
    pub index: usize,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub primitives: Vec<ModelPrimitive>,
}

pub type Buffers<'a> = &'a [buffer::Data];

impl Model {
    pub fn from_gltf(
        path: &Path,
        name: impl Into<String>,
        mesh: gltf::Mesh,
        buffers: Buffers,
    ) -> Result<Model, AssetError> {
        let mut model = Model {
            name: name.into(),
            primitives: Vec::new(),
        };

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                return Err(AssetError::UnsupportedPrimitive {
                    path: path.to_path_buf(),
                    mode: format!("{:?}", primitive.mode()),
                });
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<Vec3> = reader
                .read_positions()
                .ok_or_else(|| AssetError::MissingPositions {
                    path: path.to_path_buf(),
                    mesh: model.name.clone(),
                })?
                .map(Vec3::from)
                .collect();

            // Meshes exported without normals are shaded as if facing up.
            let normals: Vec<Vec3> = match reader.read_normals() {
                Some(normals) => normals.map(Vec3::from).collect(),
                None => vec![Vec3::Y; positions.len()],
            };

            let color = primitive
                .material()
                .pbr_metallic_roughness()
                .base_color_factor();

            let vertices = positions
                .into_iter()
                .zip(normals)
                .map(|(position, normal)| Vertex {
                    position,
                    normal,
                    color,
                })
                .collect::<Vec<Vertex>>();

            let indices = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect::<Vec<u32>>(),
                None => (0..vertices.len() as u32).collect(),
            };

            model.primitives.push(ModelPrimitive {
                index: primitive.index(),
                vertices,
                indices,
            });
        }

        if model.primitives.is_empty() {
            return Err(AssetError::EmptyMesh {
                path: path.to_path_buf(),
                mesh: model.name,
            });
        }

        Ok(model)
    }
}

/// One node of an imported model, detached from any scene so it can cross threads.
#[derive(Debug, Clone)]
pub struct NodeAsset {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub mesh: Option<Model>,
    pub children: Vec<NodeAsset>,
}

impl NodeAsset {
    pub fn group(name: impl Into<String>, children: Vec<NodeAsset>) -> Self {
        Self {
            name: name.into(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            mesh: None,
            children,
        }
    }

    fn from_gltf(path: &Path, node: &gltf::Node, buffers: Buffers) -> Result<Self, AssetError> {
        let name = node.name().unwrap_or("Unnamed").to_string();
        let (translation, rotation, scale) = node.transform().decomposed();

        let mesh = match node.mesh() {
            Some(mesh) => {
                let mesh_name = mesh
                    .name()
                    .map(String::from)
                    .unwrap_or_else(|| format!("{} (Mesh)", name));
                Some(Model::from_gltf(path, mesh_name, mesh, buffers)?)
            }
            None => None,
        };

        let children = node
            .children()
            .map(|child| NodeAsset::from_gltf(path, &child, buffers))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name,
            translation: translation.into(),
            rotation: Quat::from_array(rotation),
            scale: scale.into(),
            mesh,
            children,
        })
    }

    pub fn mesh_count(&self) -> usize {
        let own = usize::from(self.mesh.is_some());
        own + self.children.iter().map(NodeAsset::mesh_count).sum::<usize>()
    }
}

/// A fully imported model file: its default scene wrapped in a single root group.
#[derive(Debug, Clone)]
pub struct ModelAsset {
    pub root: NodeAsset,
}

impl ModelAsset {
    pub fn import(path: &Path) -> Result<Self, AssetError> {
        let (document, buffers, _images) =
            gltf::import(path).map_err(|source| AssetError::Import {
                path: path.to_path_buf(),
                source,
            })?;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| AssetError::EmptyScene {
                path: path.to_path_buf(),
            })?;

        let children = scene
            .nodes()
            .map(|node| NodeAsset::from_gltf(path, &node, &buffers))
            .collect::<Result<Vec<_>, _>>()?;

        let name = scene.name().unwrap_or("Scene").to_string();

        Ok(Self {
            root: NodeAsset::group(name, children),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "name": "Socket", "nodes": [0] }],
        "nodes": [{ "name": "Body", "mesh": 0, "translation": [0.0, 2.0, 0.0] }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        }],
        "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
        "buffers": [{
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        }]
    }"#;

    #[test]
    fn imports_triangle_with_default_normals_and_indices() {
        let path = std::env::temp_dir().join(format!("plugout-triangle-{}.gltf", std::process::id()));
        std::fs::write(&path, TRIANGLE_GLTF).unwrap();

        let asset = ModelAsset::import(&path);
        std::fs::remove_file(&path).unwrap();
        let asset = asset.unwrap();

        assert_eq!(asset.root.name, "Socket");
        assert_eq!(asset.root.mesh_count(), 1);

        let body = &asset.root.children[0];
        assert_eq!(body.name, "Body");
        assert_eq!(body.translation, Vec3::new(0.0, 2.0, 0.0));

        let primitive = &body.mesh.as_ref().unwrap().primitives[0];
        assert_eq!(primitive.indices, [0, 1, 2]);
        assert_eq!(primitive.vertices[1].position, Vec3::X);
        assert!(primitive.vertices.iter().all(|v| v.normal == Vec3::Y));
        assert_eq!(primitive.vertices[0].color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn missing_file_is_an_import_error() {
        let error = ModelAsset::import(Path::new("/nonexistent-plugout/model.gltf")).unwrap_err();
        assert!(matches!(error, AssetError::Import { .. }));
    }
}
