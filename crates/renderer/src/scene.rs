//! CPU-side mirror of the simulation: one visual per simulated entity.
//!
//! The renderer never reads physics state directly. The simulation pushes
//! transforms in with [`Scene::sync_transform`] and the GPU backend pulls
//! instance batches out with [`Scene::batches`].

use crate::vertex::InstanceData;
use engine_core::Transform;
use glam::{Quat, Vec3};
use std::collections::{BTreeMap, HashMap};

/// Handle to a visual in the [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualId(u32);

/// Primitive mesh a visual part is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MeshKind {
    Cube,
    Sphere,
    Cylinder,
    Plane,
}

impl MeshKind {
    pub const ALL: [MeshKind; 4] = [MeshKind::Cube, MeshKind::Sphere, MeshKind::Cylinder, MeshKind::Plane];
}

/// One drawable piece of a visual, positioned relative to the visual's root.
#[derive(Debug, Clone, Copy)]
pub struct VisualPart {
    pub mesh: MeshKind,
    /// Offset, rotation and size relative to the root transform.
    pub local: Transform,
    pub color: [f32; 4],
}

impl VisualPart {
    pub fn new(mesh: MeshKind, local: Transform, color: [f32; 4]) -> Self {
        Self { mesh, local, color }
    }
}

#[derive(Debug, Clone)]
pub struct Visual {
    pub transform: Transform,
    pub parts: Vec<VisualPart>,
}

#[derive(Debug, Default)]
pub struct Scene {
    visuals: HashMap<VisualId, Visual>,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a visual made of several parts.
    pub fn spawn(&mut self, transform: Transform, parts: Vec<VisualPart>) -> VisualId {
        let id = VisualId(self.next_id);
        self.next_id += 1;
        self.visuals.insert(id, Visual { transform, parts });
        id
    }

    /// Add a single-part visual whose part sits at the root.
    pub fn spawn_single(
        &mut self,
        transform: Transform,
        mesh: MeshKind,
        scale: Vec3,
        color: [f32; 4],
    ) -> VisualId {
        let local = Transform::default().with_scale(scale);
        self.spawn(transform, vec![VisualPart::new(mesh, local, color)])
    }

    /// Move a visual's root. Returns false if the visual no longer exists.
    pub fn sync_transform(&mut self, id: VisualId, position: Vec3, rotation: Quat) -> bool {
        match self.visuals.get_mut(&id) {
            Some(visual) => {
                visual.transform.position = position;
                visual.transform.rotation = rotation;
                true
            }
            None => false,
        }
    }

    pub fn despawn(&mut self, id: VisualId) -> bool {
        self.visuals.remove(&id).is_some()
    }

    pub fn get(&self, id: VisualId) -> Option<&Visual> {
        self.visuals.get(&id)
    }

    pub fn contains(&self, id: VisualId) -> bool {
        self.visuals.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.visuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }

    /// Instance data grouped by mesh, in `MeshKind` order.
    pub fn batches(&self) -> Vec<(MeshKind, Vec<InstanceData>)> {
        let mut grouped: BTreeMap<MeshKind, Vec<InstanceData>> = BTreeMap::new();
        for visual in self.visuals.values() {
            let root = visual.transform.to_matrix();
            for part in &visual.parts {
                let model = root * part.local.to_matrix();
                grouped
                    .entry(part.mesh)
                    .or_default()
                    .push(InstanceData::new(model.to_cols_array_2d(), part.color));
            }
        }
        grouped.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

    #[test]
    fn spawn_sync_despawn() {
        let mut scene = Scene::new();
        let id = scene.spawn_single(Transform::default(), MeshKind::Sphere, Vec3::splat(0.6), RED);
        assert!(scene.contains(id));

        let rotation = Quat::from_rotation_y(1.0);
        assert!(scene.sync_transform(id, Vec3::new(1.0, 2.0, 3.0), rotation));
        let visual = scene.get(id).unwrap();
        assert_eq!(visual.transform.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(visual.transform.rotation, rotation);

        assert!(scene.despawn(id));
        assert!(!scene.despawn(id));
        assert!(!scene.sync_transform(id, Vec3::ZERO, Quat::IDENTITY));
        assert!(scene.is_empty());
    }

    #[test]
    fn ids_are_not_reused() {
        let mut scene = Scene::new();
        let a = scene.spawn(Transform::default(), Vec::new());
        scene.despawn(a);
        let b = scene.spawn(Transform::default(), Vec::new());
        assert_ne!(a, b);
    }

    #[test]
    fn batches_group_parts_by_mesh() {
        let mut scene = Scene::new();
        let wheel = Transform::from_position(Vec3::new(0.75, -0.25, 1.5));
        scene.spawn(
            Transform::from_position(Vec3::new(10.0, 0.0, 0.0)),
            vec![
                VisualPart::new(MeshKind::Cube, Transform::default(), RED),
                VisualPart::new(MeshKind::Cylinder, wheel, RED),
                VisualPart::new(MeshKind::Cylinder, wheel, RED),
            ],
        );
        scene.spawn_single(Transform::default(), MeshKind::Plane, Vec3::ONE, RED);

        let batches = scene.batches();
        let kinds: Vec<MeshKind> = batches.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds, vec![MeshKind::Cube, MeshKind::Cylinder, MeshKind::Plane]);
        assert_eq!(batches[1].1.len(), 2);

        // Part offsets are applied on top of the root transform.
        let translation = batches[1].1[0].model[3];
        assert_eq!(translation, [10.75, -0.25, 1.5, 1.0]);
    }
}
