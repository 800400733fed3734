//! Name-hint collector.
//!
//! Walks from every commit the closure loader left unreferenced (the root
//! set) down through trees and blobs, assigning each non-commit object a
//! path-derived hash. The hash lets the XOR compressor's predecessor
//! search group objects that tend to change together (same path, different
//! commit) instead of purely by pack order.
//!
//! Tags are never walk roots: nothing reachable from a commit ever points
//! at a standalone tag object, so a tag's name hash would never be set by
//! this walk either way, and a real name hash would need the tag's own
//! `tag_name`, not a hash of its object id.
//!
//! The same traversal produces the ordered commit list the commit selector
//! consumes, mirroring how a single revision walk in the original tool
//! both hashes names and enumerates commits.

use git_hash::ObjectId;
use git_object::{Commit, Tree};

use super::object_table::{ObjectKind, ObjectTable};
use crate::pack::PackFile;
use crate::PackError;

/// git's pack name-hash: folds a path into a u32, resetting at each `/` so
/// that the hash is dominated by the final path component.
pub fn pack_name_hash(path: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    for &c in path {
        if c == b'/' {
            hash = 0;
        } else {
            hash = (hash >> 2).wrapping_add((c as u32) << 24);
        }
    }
    hash
}

enum WalkItem {
    Commit(ObjectId),
    Tree(ObjectId, Vec<u8>),
    Blob(ObjectId, Vec<u8>),
}

/// Walk the pack from every unreferenced commit, hashing names onto trees
/// and blobs, and returning the commits visited in walk order along with
/// each one's parent count.
pub fn collect_name_hints(
    pack: &PackFile,
    table: &mut ObjectTable,
) -> Result<Vec<(ObjectId, usize)>, PackError> {
    let mut stack: Vec<WalkItem> = Vec::new();
    for record in table.iter() {
        if record.kind == ObjectKind::Commit && !record.referenced {
            stack.push(WalkItem::Commit(record.id));
        }
    }

    let mut seen = vec![false; table.len()];
    let mut walked_commits = Vec::new();

    while let Some(item) = stack.pop() {
        let id = match &item {
            WalkItem::Commit(id) | WalkItem::Tree(id, _) | WalkItem::Blob(id, _) => *id,
        };
        let position = table
            .position_of(&id)
            .ok_or(PackError::ClosureViolation(id))?;
        if seen[position as usize] {
            continue;
        }
        seen[position as usize] = true;

        match item {
            WalkItem::Commit(id) => {
                let packed = pack
                    .read_object(&id)?
                    .ok_or(PackError::ClosureViolation(id))?;
                let commit = Commit::parse(&packed.data)?;
                walked_commits.push((id, commit.parents.len()));
                stack.push(WalkItem::Tree(commit.tree, Vec::new()));
                for parent in commit.parents {
                    stack.push(WalkItem::Commit(parent));
                }
            }
            WalkItem::Tree(id, path) => {
                table.record_mut(position).name_hash = pack_name_hash(&path);
                let packed = pack
                    .read_object(&id)?
                    .ok_or(PackError::ClosureViolation(id))?;
                let tree = Tree::parse(&packed.data)?;
                for entry in &tree.entries {
                    let mut child_path = path.clone();
                    if !child_path.is_empty() {
                        child_path.push(b'/');
                    }
                    child_path.extend_from_slice(&entry.name.to_vec());

                    if entry.mode.is_tree() {
                        stack.push(WalkItem::Tree(entry.oid, child_path));
                    } else if table.position_of(&entry.oid).is_some() {
                        stack.push(WalkItem::Blob(entry.oid, child_path));
                    }
                    // Gitlinks (submodule commits) live in a different pack
                    // and are outside this closure; nothing to hash.
                }
            }
            WalkItem::Blob(_, path) => {
                table.record_mut(position).name_hash = pack_name_hash(&path);
            }
        }
    }

    Ok(walked_commits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_hash_resets_at_slash() {
        let whole = pack_name_hash(b"src/lib.rs");
        let tail = pack_name_hash(b"lib.rs");
        assert_eq!(whole, tail);
    }

    #[test]
    fn name_hash_empty_path_is_zero() {
        assert_eq!(pack_name_hash(b""), 0);
    }

    #[test]
    fn name_hash_differs_for_different_names() {
        assert_ne!(pack_name_hash(b"a.txt"), pack_name_hash(b"b.txt"));
    }
}
