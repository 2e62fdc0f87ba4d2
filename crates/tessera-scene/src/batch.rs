//! Per-frame grouping of meshes into texture batches.
//!
//! A batch binds at most [`TEXTURES_PER_BATCH`] textures. Mesh texture indices
//! are global; inside a batch they become local slots.

use std::collections::{BTreeMap, BTreeSet};

use bytemuck::{Pod, Zeroable};

use crate::pack::Mesh;

/// Texture units bound per draw batch.
pub const TEXTURES_PER_BATCH: u32 = 16;

/// Layout of one indexed indirect draw, as the device reads it.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirect {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

/// Per-object data the shader reads by draw position.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ObjectData {
    pub transform_index: u32,
    pub base_color_slot: u32,
    pub normal_slot: u32,
}

pub fn batch_index(texture: u32) -> u32 {
    texture / TEXTURES_PER_BATCH
}

pub fn local_slot(texture: u32) -> u32 {
    texture % TEXTURES_PER_BATCH
}

/// One multi-draw worth of commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub index: u32,
    pub commands: Vec<DrawIndexedIndirect>,
    pub objects: Vec<ObjectData>,
    /// Distinct global texture indices referenced by this batch.
    pub textures: BTreeSet<u32>,
}

impl Batch {
    /// Global texture bound at each of the 16 local slots.
    ///
    /// Slot `s` of batch `b` holds texture `b * 16 + s`. Slots past the end of
    /// the texture table are `None` and get a placeholder at bind time.
    pub fn texture_bindings(&self, texture_count: u32) -> [Option<u32>; TEXTURES_PER_BATCH as usize] {
        let base = self.index * TEXTURES_PER_BATCH;
        std::array::from_fn(|slot| {
            let global = base + slot as u32;
            (global < texture_count).then_some(global)
        })
    }
}

/// Groups `meshes` by the batch of their base-color texture.
///
/// Batches come back ordered by index; within a batch, meshes keep table order.
/// Meshes with no indices draw nothing and are left out.
pub fn build_batches(meshes: &[Mesh]) -> Vec<Batch> {
    let mut batches: BTreeMap<u32, Batch> = BTreeMap::new();

    for mesh in meshes {
        if mesh.index_count == 0 {
            continue;
        }
        let index = batch_index(mesh.base_color_texture);
        let batch = batches.entry(index).or_insert_with(|| Batch {
            index,
            ..Batch::default()
        });

        let position = batch.commands.len() as u32;
        batch.commands.push(mesh.indirect_command(position));
        batch.objects.push(ObjectData {
            transform_index: mesh.transform_index,
            base_color_slot: local_slot(mesh.base_color_texture),
            normal_slot: local_slot(mesh.normal_texture),
        });
        batch.textures.insert(mesh.base_color_texture);
    }

    batches.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(texture: u32, transform: u32) -> Mesh {
        Mesh {
            index_count: 3,
            vertex_offset: 0,
            index_offset: 0,
            transform_index: transform,
            base_color_texture: texture,
            normal_texture: 0,
        }
    }

    #[test]
    fn command_layout_is_20_bytes() {
        assert_eq!(std::mem::size_of::<DrawIndexedIndirect>(), 20);
        assert_eq!(std::mem::size_of::<ObjectData>(), 12);
    }

    #[test]
    fn slot_math() {
        assert_eq!((batch_index(0), local_slot(0)), (0, 0));
        assert_eq!((batch_index(15), local_slot(15)), (0, 15));
        assert_eq!((batch_index(16), local_slot(16)), (1, 0));
        assert_eq!((batch_index(37), local_slot(37)), (2, 5));
    }

    #[test]
    fn twenty_textures_make_two_batches() {
        let meshes: Vec<Mesh> = (0..20).map(|t| mesh(t, t)).collect();
        let batches = build_batches(&meshes);

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].commands.len(), 16);
        assert_eq!(batches[1].commands.len(), 4);
        assert_eq!(batches[1].objects[0].base_color_slot, 0);
        assert_eq!(batches[1].objects[0].transform_index, 16);
        assert!(batches.iter().all(|b| b.textures.len() <= 16));
    }

    #[test]
    fn first_instance_is_position_within_batch() {
        let meshes = vec![mesh(0, 0), mesh(16, 1), mesh(1, 2), mesh(17, 3)];
        let batches = build_batches(&meshes);

        let firsts: Vec<Vec<u32>> = batches
            .iter()
            .map(|b| b.commands.iter().map(|c| c.first_instance).collect())
            .collect();
        assert_eq!(firsts, vec![vec![0, 1], vec![0, 1]]);
        assert_eq!(batches[0].objects[1].transform_index, 2);
        assert_eq!(batches[1].objects[1].transform_index, 3);
    }

    #[test]
    fn textures_are_ascending_and_distinct() {
        let meshes = vec![mesh(3, 0), mesh(1, 0), mesh(3, 0), mesh(2, 0)];
        let batch = &build_batches(&meshes)[0];
        assert_eq!(batch.textures.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn empty_mesh_table_has_no_batches() {
        assert!(build_batches(&[]).is_empty());
    }

    #[test]
    fn meshes_without_indices_are_skipped() {
        let empty = Mesh {
            index_count: 0,
            ..mesh(0, 0)
        };
        let meshes = vec![empty, mesh(0, 1), empty, mesh(20, 2)];
        let batches = build_batches(&meshes);

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].commands.len(), 1);
        assert_eq!(batches[0].commands[0].first_instance, 0);
        assert_eq!(batches[0].objects[0].transform_index, 1);

        let only_empty = vec![empty; 3];
        assert!(build_batches(&only_empty).is_empty());
    }

    #[test]
    fn bindings_cover_the_batch_window() {
        let batch = Batch {
            index: 1,
            ..Batch::default()
        };
        let bindings = batch.texture_bindings(18);
        assert_eq!(bindings[0], Some(16));
        assert_eq!(bindings[1], Some(17));
        assert_eq!(bindings[2], None);
    }
}
