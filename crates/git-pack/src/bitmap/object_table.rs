//! Object table: the dense position-indexed record of every object in a
//! pack, built by walking from every object down to its full closure.
//!
//! Every object in the table is assigned a stable `position` (0..N) the
//! moment it is first inserted, in pack-index order. That position is the
//! bit index used by every bitmap this module builds.

use git_hash::collections::OidMap;
use git_hash::ObjectId;
use git_object::{Commit, ObjectType};

use crate::pack::PackFile;
use crate::PackError;

/// The four object kinds a pack can hold. `ObjectType` is already closed to
/// exactly these four, so there is no "unknown kind" case to guard against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl ObjectKind {
    pub fn from_object_type(t: ObjectType) -> Self {
        match t {
            ObjectType::Commit => Self::Commit,
            ObjectType::Tree => Self::Tree,
            ObjectType::Blob => Self::Blob,
            ObjectType::Tag => Self::Tag,
        }
    }

    /// Fixed on-disk ordering of the four type bitmaps.
    pub const ALL: [ObjectKind; 4] = [Self::Commit, Self::Tree, Self::Blob, Self::Tag];
}

#[derive(Debug, Clone)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub position: u32,
    pub name_hash: u32,
    /// Set once this object has been seen as some other object's parent
    /// (commits only); unreferenced commits are the name-hint walk's roots.
    pub referenced: bool,
}

/// Dense, position-indexed table of every object reachable in a pack.
pub struct ObjectTable {
    records: Vec<ObjectRecord>,
    positions: OidMap<u32>,
}

impl ObjectTable {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            records: Vec::with_capacity(cap),
            positions: OidMap::with_capacity(cap),
        }
    }

    pub fn insert(&mut self, id: ObjectId, kind: ObjectKind) -> Result<u32, PackError> {
        if self.positions.contains_key(&id) {
            return Err(PackError::DuplicateObject(id));
        }
        let position = self.records.len() as u32;
        self.records.push(ObjectRecord {
            id,
            kind,
            position,
            name_hash: 0,
            referenced: false,
        });
        self.positions.insert(id, position);
        Ok(position)
    }

    pub fn position_of(&self, id: &ObjectId) -> Option<u32> {
        self.positions.get(id).copied()
    }

    pub fn record(&self, position: u32) -> &ObjectRecord {
        &self.records[position as usize]
    }

    pub fn record_mut(&mut self, position: u32) -> &mut ObjectRecord {
        &mut self.records[position as usize]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectRecord> {
        self.records.iter()
    }
}

/// Build the object table for `pack`: one record per object in pack-index
/// order, then a pass resolving every commit's parents to mark them
/// referenced. A parent missing from the table means the pack is not
/// closed under reachability, which is a fatal condition for bitmap
/// generation.
pub fn load_closure(pack: &PackFile) -> Result<ObjectTable, PackError> {
    let num_objects = pack.index().num_objects();
    let mut table = ObjectTable::with_capacity(num_objects as usize);

    for i in 0..num_objects {
        let oid = pack.index().oid_at_index(i);
        let offset = pack.index().offset_at_index(i);
        let packed = pack.read_at_offset(offset)?;
        let kind = ObjectKind::from_object_type(packed.obj_type);
        table.insert(oid, kind)?;
    }

    for position in 0..table.len() as u32 {
        let record = table.record(position);
        if record.kind != ObjectKind::Commit {
            continue;
        }
        let id = record.id;
        let packed = pack
            .read_object(&id)?
            .ok_or(PackError::ClosureViolation(id))?;
        let commit = Commit::parse(&packed.data)?;
        for parent in &commit.parents {
            let parent_pos = table
                .position_of(parent)
                .ok_or(PackError::ClosureViolation(*parent))?;
            table.record_mut(parent_pos).referenced = true;
        }
    }

    Ok(table)
}
