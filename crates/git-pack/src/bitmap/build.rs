//! Bitmap builder.
//!
//! Computes the full reachability bitmap for each selected commit, walking
//! the selected list oldest-first (the reverse of storage order, since
//! `selected_ids[0]` is the newest) and reusing as much work as possible:
//! the accumulated `base` bitmap from the previously processed (older)
//! selected commit carries forward whenever that commit is this one's
//! ancestor, and the walk itself stops early the moment it crosses into
//! territory already marked reachable.
//!
//! The ancestry test is supplied by the caller as a callback rather than a
//! dependency on the revision-walking crate, since this crate sits below
//! it in the dependency graph.

use git_hash::collections::OidMap;
use git_hash::ObjectId;
use git_object::Commit;

use super::ewah::{Bitset, EwahBitmap};
use super::object_table::ObjectTable;
use crate::pack::PackFile;
use crate::PackError;

/// One commit chosen by the selector, together with its computed bitmap.
pub struct SelectedCommit {
    pub id: ObjectId,
    pub bitmap: EwahBitmap,
}

/// Maps a selected commit's OID to its index in the selected-commit list,
/// in the order bitmaps were written (oldest first in storage order -- the
/// caller decides storage order; this index is keyed purely by identity).
pub struct BitmapIndex {
    by_id: OidMap<usize>,
}

impl BitmapIndex {
    pub fn position_of(&self, id: &ObjectId) -> Option<usize> {
        self.by_id.get(id).copied()
    }
}

enum WalkItem {
    Commit(ObjectId),
    Tree(ObjectId),
}

/// Build a full reachability bitmap for every entry in `selected_ids`
/// (newest-first order, matching how the selector emits them).
pub fn build_bitmaps(
    pack: &PackFile,
    table: &ObjectTable,
    selected_ids: &[ObjectId],
    mut is_ancestor: impl FnMut(ObjectId, ObjectId) -> Result<bool, PackError>,
) -> Result<(Vec<SelectedCommit>, BitmapIndex), PackError> {
    let n = table.len() as u32;
    let mut base = Bitset::new(n);
    let mut seen = vec![false; n as usize];
    let mut results: Vec<SelectedCommit> = Vec::with_capacity(selected_ids.len());
    let mut by_id: OidMap<usize> = OidMap::with_capacity(selected_ids.len());
    // Keyed by the order commits are actually appended to `results` below
    // (oldest processed first), which is the reverse of `k`'s selection
    // order. `walk_commit` looks a memoized commit up by where it lives in
    // the in-progress `results` vector right now, not by its eventual
    // (post-reverse) selection index -- those two only coincide at the
    // numeric midpoint of the list.
    let mut processed: OidMap<usize> = OidMap::with_capacity(selected_ids.len());

    for k in (0..selected_ids.len()).rev() {
        let commit_id = selected_ids[k];

        if k + 1 < selected_ids.len() {
            let previous = selected_ids[k + 1];
            if !is_ancestor(previous, commit_id)? {
                base.clear();
                seen.iter_mut().for_each(|s| *s = false);
            }
        }

        walk_commit(pack, table, &mut base, &mut seen, &processed, &results, commit_id)?;

        let bitmap = base.to_compressed(n);
        if by_id.contains_key(&commit_id) {
            return Err(PackError::DuplicateBitmapEntry(commit_id));
        }
        by_id.insert(commit_id, k);
        processed.insert(commit_id, results.len());
        results.push(SelectedCommit {
            id: commit_id,
            bitmap,
        });
    }

    // `results` was built back-to-front (newest-last); restore selection order.
    results.reverse();
    // `by_id` values index into selection order (already correct: `k`).
    Ok((results, BitmapIndex { by_id }))
}

/// Apply the inclusion predicate starting from `root`, mutating `base` and
/// `seen` in place. `memo` maps a commit id to its index in `done` (the
/// in-progress `results` vector, appended oldest-processed-first) so an
/// already-finished selected commit's bitmap can be OR-merged instead of
/// re-walked.
#[allow(clippy::too_many_arguments)]
fn walk_commit(
    pack: &PackFile,
    table: &ObjectTable,
    base: &mut Bitset,
    seen: &mut [bool],
    memo: &OidMap<usize>,
    done: &[SelectedCommit],
    root: ObjectId,
) -> Result<(), PackError> {
    let mut stack = vec![WalkItem::Commit(root)];

    while let Some(item) = stack.pop() {
        match item {
            WalkItem::Commit(id) => {
                let position = table
                    .position_of(&id)
                    .ok_or(PackError::ClosureViolation(id))?;

                let packed = pack
                    .read_object(&id)?
                    .ok_or(PackError::ClosureViolation(id))?;
                let commit = Commit::parse(&packed.data)?;

                if base.is_set(position) {
                    seen[position as usize] = true;
                    for parent in &commit.parents {
                        if let Some(ppos) = table.position_of(parent) {
                            seen[ppos as usize] = true;
                        }
                    }
                    continue;
                }

                if let Some(&idx) = memo.get(&id) {
                    if let Some(memoized) = done.get(idx) {
                        base.or_merge(&memoized.bitmap);
                        seen[position as usize] = true;
                        for parent in &commit.parents {
                            if let Some(ppos) = table.position_of(parent) {
                                seen[ppos as usize] = true;
                            }
                        }
                        continue;
                    }
                }

                base.set(position);
                seen[position as usize] = true;
                stack.push(WalkItem::Tree(commit.tree));
                for parent in commit.parents {
                    stack.push(WalkItem::Commit(parent));
                }
            }
            WalkItem::Tree(id) => {
                let position = table
                    .position_of(&id)
                    .ok_or(PackError::ClosureViolation(id))?;
                if base.is_set(position) {
                    continue;
                }
                base.set(position);
                seen[position as usize] = true;

                let packed = pack
                    .read_object(&id)?
                    .ok_or(PackError::ClosureViolation(id))?;
                let tree = git_object::Tree::parse(&packed.data)?;
                for entry in &tree.entries {
                    if entry.mode.is_tree() {
                        stack.push(WalkItem::Tree(entry.oid));
                    } else if let Some(bpos) = table.position_of(&entry.oid) {
                        base.set(bpos);
                        seen[bpos as usize] = true;
                    }
                    // Gitlinks reference objects outside this pack; skip.
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::encode_entry_header;
    use crate::bitmap::object_table::load_closure;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use git_hash::hasher::Hasher;
    use git_hash::HashAlgorithm;
    use git_object::ObjectType;
    use std::io::Write as _;

    fn build_pack(dir: &std::path::Path, objects: &[(ObjectType, &[u8])]) -> (PackFile, Vec<ObjectId>) {
        let pack_path = dir.join("t.pack");
        let idx_path = dir.join("t.idx");
        let mut pack_data = Vec::new();
        pack_data.extend_from_slice(crate::PACK_SIGNATURE);
        pack_data.extend_from_slice(&crate::PACK_VERSION.to_be_bytes());
        pack_data.extend_from_slice(&(objects.len() as u32).to_be_bytes());

        let mut entries = Vec::new();
        for (obj_type, content) in objects {
            let offset = pack_data.len() as u64;
            let type_num = match obj_type {
                ObjectType::Commit => 1,
                ObjectType::Tree => 2,
                ObjectType::Blob => 3,
                ObjectType::Tag => 4,
            };
            let header = encode_entry_header(type_num, content.len() as u64);
            let mut compressed = Vec::new();
            {
                let mut enc = ZlibEncoder::new(&mut compressed, Compression::default());
                enc.write_all(content).unwrap();
                enc.finish().unwrap();
            }
            let mut crc_hasher = crc32fast::Hasher::new();
            crc_hasher.update(&header);
            crc_hasher.update(&compressed);
            let crc = crc_hasher.finalize();
            let type_str: String = obj_type.as_bytes().iter().map(|&b| b as char).collect();
            let oid = Hasher::hash_object(HashAlgorithm::Sha1, &type_str, content).unwrap();
            pack_data.extend_from_slice(&header);
            pack_data.extend_from_slice(&compressed);
            entries.push((oid, offset, crc));
        }
        let pack_checksum = {
            let mut h = Hasher::new(HashAlgorithm::Sha1);
            h.update(&pack_data);
            h.finalize().unwrap()
        };
        pack_data.extend_from_slice(pack_checksum.as_bytes());
        std::fs::write(&pack_path, &pack_data).unwrap();

        let mut sorted = entries.clone();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let mut buf = Vec::new();
        buf.extend_from_slice(&crate::IDX_SIGNATURE);
        buf.extend_from_slice(&crate::IDX_VERSION.to_be_bytes());
        let mut fanout = [0u32; 256];
        for (oid, _, _) in &sorted {
            fanout[oid.first_byte() as usize] += 1;
        }
        for i in 1..256 {
            fanout[i] += fanout[i - 1];
        }
        for count in fanout {
            buf.extend_from_slice(&count.to_be_bytes());
        }
        for (oid, _, _) in &sorted {
            buf.extend_from_slice(oid.as_bytes());
        }
        for (_, _, crc) in &sorted {
            buf.extend_from_slice(&crc.to_be_bytes());
        }
        for (_, offset, _) in &sorted {
            buf.extend_from_slice(&(*offset as u32).to_be_bytes());
        }
        buf.extend_from_slice(pack_checksum.as_bytes());
        let idx_checksum = {
            let mut h = Hasher::new(HashAlgorithm::Sha1);
            h.update(&buf);
            h.finalize().unwrap()
        };
        buf.extend_from_slice(idx_checksum.as_bytes());
        std::fs::write(&idx_path, &buf).unwrap();

        let oids: Vec<ObjectId> = entries.iter().map(|(o, _, _)| *o).collect();
        (PackFile::open(&pack_path).unwrap(), oids)
    }

    #[test]
    fn single_root_commit_reaches_its_tree_and_blob() {
        let dir = tempfile::tempdir().unwrap();
        let blob = b"hello";
        let tree_content = {
            let oid = Hasher::hash_object(HashAlgorithm::Sha1, "blob", blob).unwrap();
            let mut t = Vec::new();
            t.extend_from_slice(b"100644 a.txt\0");
            t.extend_from_slice(oid.as_bytes());
            t
        };
        let commit_content = {
            let tree_oid = Hasher::hash_object(HashAlgorithm::Sha1, "tree", &tree_content).unwrap();
            format!(
                "tree {}\nauthor A <a@example.com> 0 +0000\ncommitter A <a@example.com> 0 +0000\n\nmsg\n",
                tree_oid
            )
        };
        let (pack, oids) = build_pack(
            dir.path(),
            &[
                (ObjectType::Blob, blob.as_slice()),
                (ObjectType::Tree, tree_content.as_slice()),
                (ObjectType::Commit, commit_content.as_bytes()),
            ],
        );
        let table = load_closure(&pack).unwrap();
        let commit_id = oids[2];

        let (selected, index) =
            build_bitmaps(&pack, &table, &[commit_id], |_, _| Ok(false)).unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(index.position_of(&commit_id), Some(0));
        let positions = selected[0].bitmap.positions();
        assert_eq!(positions.len(), 3, "commit + tree + blob all reachable");
    }
}
