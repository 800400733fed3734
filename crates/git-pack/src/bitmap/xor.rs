//! XOR compressor.
//!
//! Each selected commit's bitmap is, more often than not, nearly identical
//! to one of its few predecessors in storage order (a sibling branch tip,
//! or the commit just before it). XORing against that predecessor turns
//! most of the bitmap into runs of zero words, which the EWAH encoding
//! then compresses away. This searches a bounded window of predecessors
//! and keeps whichever XOR (including "against nothing", i.e. verbatim)
//! serializes smallest.

use super::build::SelectedCommit;
use super::ewah::EwahBitmap;

/// How many predecessors back to try as an XOR base.
pub const MAX_XOR_OFFSET_SEARCH: usize = 10;

/// What to actually write for one selected commit: the possibly-XORed
/// bitmap, and how many slots back its base sits (0 = stored verbatim).
pub struct CompressedCommit {
    pub id: git_hash::ObjectId,
    pub write_as: EwahBitmap,
    pub xor_offset: u8,
}

/// Compress every selected commit's bitmap in storage order.
pub fn compress(selected: &[SelectedCommit]) -> Vec<CompressedCommit> {
    let mut out = Vec::with_capacity(selected.len());
    for k in 0..selected.len() {
        let bitmap = &selected[k].bitmap;
        let mut best = bitmap.clone();
        let mut best_offset: u8 = 0;
        let mut best_size = bitmap.serialized_size();

        let window = MAX_XOR_OFFSET_SEARCH.min(k);
        for d in 1..=window {
            let prev = &selected[k - d].bitmap;
            let trial = prev.xor(bitmap);
            let trial_size = trial.serialized_size();
            if trial_size < best_size {
                best = trial;
                best_offset = d as u8;
                best_size = trial_size;
            }
        }

        out.push(CompressedCommit {
            id: selected[k].id,
            write_as: best,
            xor_offset: best_offset,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_hash::{HashAlgorithm, ObjectId};

    fn oid(n: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        ObjectId::from_bytes(&bytes, HashAlgorithm::Sha1).unwrap()
    }

    #[test]
    fn first_commit_has_no_xor_base() {
        let selected = vec![SelectedCommit {
            id: oid(1),
            bitmap: EwahBitmap::from_positions(10, &[1, 2, 3]),
        }];
        let compressed = compress(&selected);
        assert_eq!(compressed[0].xor_offset, 0);
    }

    #[test]
    fn identical_successive_bitmaps_prefer_xor_over_verbatim() {
        let a = EwahBitmap::from_positions(1000, &(0..500).collect::<Vec<_>>());
        let b = a.clone();
        let selected = vec![
            SelectedCommit { id: oid(1), bitmap: a },
            SelectedCommit { id: oid(2), bitmap: b },
        ];
        let compressed = compress(&selected);
        assert_eq!(compressed[1].xor_offset, 1);
        assert_eq!(compressed[1].write_as.serialized_size(), 8);
    }

    #[test]
    fn ties_prefer_smaller_offset() {
        // Two identical predecessors at offsets 1 and 2; offset 1 must win.
        let base = EwahBitmap::from_positions(100, &(0..50).collect::<Vec<_>>());
        let selected = vec![
            SelectedCommit { id: oid(1), bitmap: base.clone() },
            SelectedCommit { id: oid(2), bitmap: base.clone() },
            SelectedCommit { id: oid(3), bitmap: base },
        ];
        let compressed = compress(&selected);
        assert_eq!(compressed[2].xor_offset, 1);
    }

    #[test]
    fn search_window_bounded_to_ten_predecessors() {
        let bitmaps: Vec<_> = (0..12u32)
            .map(|i| EwahBitmap::from_positions(200, &[i]))
            .collect();
        let selected: Vec<_> = bitmaps
            .into_iter()
            .enumerate()
            .map(|(i, bitmap)| SelectedCommit {
                id: oid(i as u8),
                bitmap,
            })
            .collect();
        // Just confirm it runs without panicking over an 11-deep history.
        let compressed = compress(&selected);
        assert_eq!(compressed.len(), 12);
    }
}
