//! Orchestrator and serializer for the reachability bitmap index.
//!
//! `BitmapIndexWriter` drives the whole pipeline — closure loading,
//! name-hint collection, commit selection, bitmap building, XOR
//! compression — and then serializes the result to disk. It is a single
//! plain value owned by the caller, matching how `CommitGraphWriter` and
//! `PackWriter` are driven elsewhere in this workspace: no component here
//! reaches for global or thread-local state.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use git_hash::ObjectId;
use git_utils::progress::Progress;
use git_utils::tempfile::TempFile;

use super::build;
use super::ewah::EwahBitmap;
use super::name_hash;
use super::object_table::{self, ObjectKind, ObjectTable};
use super::select;
use super::xor::{self, CompressedCommit};
use super::{BITMAP_SIGNATURE, BITMAP_VERSION, OPT_FULL_DAG, OPT_HASH_CACHE};
use crate::pack::PackFile;
use crate::PackError;

/// magic(4) + version(2) + options(2) + entry_count(4) + checksum(20)
const HEADER_SIZE: u64 = 32;

pub struct BitmapIndexWriter {
    hash_cache: bool,
    max_bitmaps: usize,
    quiet: bool,
}

impl BitmapIndexWriter {
    pub fn new(hash_cache: bool, max_bitmaps: usize, quiet: bool) -> Self {
        Self {
            hash_cache,
            max_bitmaps,
            quiet,
        }
    }

    /// Build and serialize the bitmap index for `pack`, returning the
    /// written file's path. `is_ancestor` answers whether its first
    /// argument is an ancestor of its second, supplied by the caller since
    /// this crate does not depend on the revision-walking crate.
    pub fn write(
        &self,
        pack: &PackFile,
        mut is_ancestor: impl FnMut(ObjectId, ObjectId) -> Result<bool, PackError>,
    ) -> Result<PathBuf, PackError> {
        let progress_label = |title: &str, total: u64| -> Option<Progress> {
            if self.quiet {
                None
            } else {
                Some(Progress::new(title, Some(total)))
            }
        };

        let mut loading = progress_label("Counting objects", pack.index().num_objects() as u64);
        let mut table = object_table::load_closure(pack)?;
        if let Some(p) = loading.take() {
            p.finish();
        }

        let walked = name_hash::collect_name_hints(pack, &mut table)?;
        let expected_commits = table
            .iter()
            .filter(|r| r.kind == ObjectKind::Commit)
            .count() as u32;
        if walked.len() as u32 != expected_commits {
            return Err(PackError::CommitCountMismatch {
                expected: expected_commits,
                actual: walked.len() as u32,
            });
        }

        let selected_ids = select::select_commits(&walked, self.max_bitmaps);

        let mut building = progress_label("Building bitmaps", selected_ids.len() as u64);
        let (built, _index) = build::build_bitmaps(pack, &table, &selected_ids, |a, b| is_ancestor(a, b))?;
        if let Some(p) = building.take() {
            p.finish();
        }

        let compressed = xor::compress(&built);

        let out_path = bitmap_path_for(pack.path());
        self.serialize(pack, &table, &compressed, &out_path)?;
        Ok(out_path)
    }

    fn serialize(
        &self,
        pack: &PackFile,
        table: &ObjectTable,
        compressed: &[CompressedCommit],
        out_path: &Path,
    ) -> Result<(), PackError> {
        let mut tmp = TempFile::new_for(out_path)?;

        let mut options = OPT_FULL_DAG;
        if self.hash_cache {
            options |= OPT_HASH_CACHE;
        }

        tmp.write_all(BITMAP_SIGNATURE)?;
        tmp.write_all(&BITMAP_VERSION.to_be_bytes())?;
        tmp.write_all(&options.to_be_bytes())?;
        tmp.write_all(&(compressed.len() as u32).to_be_bytes())?;
        tmp.write_all(pack.index().pack_checksum().as_bytes())?;
        let mut written = HEADER_SIZE;

        if self.hash_cache {
            for record in table.iter() {
                tmp.write_all(&record.name_hash.to_be_bytes())?;
                written += 4;
            }
        }

        let n = table.len() as u32;
        for kind in ObjectKind::ALL {
            let positions: Vec<u32> = table
                .iter()
                .filter(|r| r.kind == kind)
                .map(|r| r.position)
                .collect();
            let bitmap = EwahBitmap::from_positions(n, &positions);
            written += bitmap.serialized_size() as u64;
            bitmap.write_to(&mut tmp)?;
        }

        let mut bitmap_positions = Vec::with_capacity(compressed.len());
        for entry in compressed {
            bitmap_positions.push(written as u32);
            written += entry.write_as.serialized_size() as u64;
            entry.write_as.write_to(&mut tmp)?;
        }

        for (entry, bitmap_pos) in compressed.iter().zip(bitmap_positions.iter()) {
            tmp.write_all(entry.id.as_bytes())?;
            tmp.write_all(&bitmap_pos.to_be_bytes())?;
            tmp.write_all(&[entry.xor_offset])?;
            tmp.write_all(&[0u8])?; // walk flags: not meaningful outside this build
            tmp.write_all(&[0u8, 0u8])?; // padding
        }

        tmp.persist(out_path)?;
        Ok(())
    }
}

fn bitmap_path_for(pack_path: &Path) -> PathBuf {
    pack_path.with_extension("bitmap")
}
