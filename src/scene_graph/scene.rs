use glam::{Mat4, Quat, Vec3};
use id_arena::Arena;

use crate::model::{ModelAsset, NodeAsset};
use crate::scene_graph::object3d::{Object3D, ObjectId};
use crate::scene_graph::scene_model::{SceneModel, SceneModelId};
use crate::scene_graph::transform::Transform;

pub struct Scene {
    pub objects: Arena<Object3D>,
    pub models: Arena<SceneModel>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            models: Arena::new(),
        }
    }

    pub fn add_object(&mut self, object: Object3D) -> ObjectId {
        self.objects.alloc(object)
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    pub fn add_model(&mut self, model: SceneModel) -> SceneModelId {
        self.models.alloc(model)
    }

    /// Adds a whole imported model to the scene and returns its root group.
    pub fn spawn_model_asset(&mut self, asset: &ModelAsset) -> ObjectId {
        self.spawn_node(&asset.root, None)
    }

    fn spawn_node(&mut self, node: &NodeAsset, parent: Option<ObjectId>) -> ObjectId {
        let mut object = Object3D::named(node.name.clone());
        object.transform = Transform::new(node.translation, node.rotation, node.scale);

        if let Some(mesh) = &node.mesh {
            object.model_id = Some(self.add_model(SceneModel::new(mesh.clone())));
        }

        let object_id = self.add_object(object);

        if let Some(parent_id) = parent {
            self.set_object_parent(object_id, Some(parent_id));
        }

        for child in &node.children {
            self.spawn_node(child, Some(object_id));
        }

        object_id
    }

    /// Updates all object transforms in hierarchical order
    fn update_transforms(&self) {
        let root_objects = self
            .objects
            .iter()
            .filter(|(_, object)| object.parent_id.is_none())
            .map(|(id, _)| id);

        for root_id in root_objects {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY, false);
        }
    }

    fn update_object_transform_recursive(
        &self,
        object_id: ObjectId,
        parent_world_matrix: Mat4,
        parent_changed: bool,
    ) {
        if let Some(object) = self.objects.get(object_id) {
            let changed = parent_changed || object.transform.is_world_dirty();

            if changed {
                let local_matrix = *object.transform.get_local_matrix();
                object
                    .transform
                    .set_world_matrix(parent_world_matrix * local_matrix);
            }

            let world_matrix = *object.transform.get_world_matrix();
            for &child_id in &object.child_ids {
                self.update_object_transform_recursive(child_id, world_matrix, changed);
            }
        }
    }

    /// Sets the parent of an object and updates child relationships
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        if let Some(old_parent_id) = self.objects.get(child_id).and_then(|c| c.parent_id) {
            if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                old_parent.child_ids.retain(|&id| id != child_id);
            }
        }

        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;
            child.transform.invalidate_world();
        }

        if let Some(parent) = new_parent_id.and_then(|id| self.objects.get_mut(id)) {
            parent.child_ids.push(child_id);
        }
    }

    pub fn set_object_translation(&mut self, object_id: ObjectId, translation: Vec3) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_translation(translation);
        }
    }

    pub fn set_object_rotation(&mut self, object_id: ObjectId, rotation: Quat) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_rotation(rotation);
        }
    }

    pub fn set_object_scale(&mut self, object_id: ObjectId, scale: Vec3) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_scale(scale);
        }
    }

    pub fn get_object_transform(&self, object_id: ObjectId) -> Option<&Transform> {
        self.objects.get(object_id).map(|object| &object.transform)
    }

    /// Sets only the X coordinate of an object's translation.
    pub fn set_object_x(&mut self, object_id: ObjectId, x: f32) {
        if let Some(object) = self.objects.get_mut(object_id) {
            let mut translation = object.transform.translation();
            translation.x = x;
            object.transform.set_translation(translation);
        }
    }

    pub fn late_update(&mut self) {
        self.update_transforms();
    }

    /// Objects that carry geometry, paired with the model they draw.
    pub fn drawables(&self) -> impl Iterator<Item = (SceneModelId, &Object3D)> {
        self.objects
            .iter()
            .filter_map(|(_, object)| object.model_id.map(|model_id| (model_id, object)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Model, ModelPrimitive};

    fn mesh(name: &str) -> Model {
        Model {
            name: name.to_string(),
            primitives: vec![ModelPrimitive {
                index: 0,
                vertices: Vec::new(),
                indices: Vec::new(),
            }],
        }
    }

    fn asset() -> ModelAsset {
        let mut body = NodeAsset::group("Body", Vec::new());
        body.translation = Vec3::new(0.0, 2.0, 0.0);
        body.mesh = Some(mesh("BodyMesh"));

        ModelAsset {
            root: NodeAsset::group("Scene", vec![body]),
        }
    }

    #[test]
    fn spawn_keeps_hierarchy_and_models() {
        let mut scene = Scene::new();
        let root = scene.spawn_model_asset(&asset());

        let root_object = scene.get_object(root).unwrap();
        assert_eq!(root_object.name, "Scene");
        assert_eq!(root_object.child_ids.len(), 1);
        let body = scene.get_object(root_object.child_ids[0]).unwrap();
        assert_eq!(body.name, "Body");
        assert_eq!(body.parent_id, Some(root));
        assert_eq!(scene.drawables().count(), 1);
    }

    #[test]
    fn moving_root_moves_children_in_world_space() {
        let mut scene = Scene::new();
        let root = scene.spawn_model_asset(&asset());
        let body = scene.get_object(root).unwrap().child_ids[0];

        scene.set_object_scale(root, Vec3::splat(2.0));
        scene.set_object_translation(root, Vec3::new(10.0, 0.0, 0.0));
        scene.late_update();

        let world = *scene.get_object_transform(body).unwrap().get_world_matrix();
        let origin = world.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(10.0, 4.0, 0.0)).length() < 1e-5);

        scene.set_object_x(root, -5.0);
        scene.late_update();

        let world = *scene.get_object_transform(body).unwrap().get_world_matrix();
        let origin = world.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(-5.0, 4.0, 0.0)).length() < 1e-5);
    }
}
