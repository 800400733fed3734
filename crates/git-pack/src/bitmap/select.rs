//! Commit selector.
//!
//! Decides which commits in the walked-commit list get their own stored
//! bitmap. Recent history gets one bitmap per commit (the "must" region);
//! older history is sampled with a growing skip window, with ties within a
//! window broken in favor of the most recent merge commit (a merge's
//! bitmap reuses more of its parents' work, so it compresses better as an
//! XOR base).

use git_hash::ObjectId;

/// Commits this recent from the tip always get a bitmap.
pub const MUST_REGION: usize = 100;
/// Commits up to this far back use the 1-in-`MIN_COMMITS` ramp.
pub const MIN_REGION: usize = 20_000;
/// Skip granularity within the ramp region.
pub const MIN_COMMITS: usize = 100;
/// Skip granularity in the deep region, and the ramp's ceiling.
pub const MAX_COMMITS: usize = 5_000;

/// How many commits to skip before selecting the next one, given `i`
/// commits already selected. Returns 0 in the must region (every commit
/// selected), grows linearly between `MIN_REGION` and a ramp ceiling, then
/// stays at a fixed large skip beyond the deep threshold.
pub fn next_commit_index(i: usize) -> usize {
    if i <= MUST_REGION {
        return 0;
    }
    if i <= MIN_REGION {
        let offset = i - MUST_REGION;
        return offset.min(MIN_COMMITS);
    }
    let offset = i - MIN_REGION;
    offset.min(MAX_COMMITS).max(MIN_COMMITS)
}

/// Select the commits to store full bitmaps for, from `commits` (walk
/// order: newest first, each with its parent count), capped at
/// `max_bitmaps` (0 means unlimited).
pub fn select_commits(commits: &[(ObjectId, usize)], max_bitmaps: usize) -> Vec<ObjectId> {
    let total = commits.len();
    if total < MUST_REGION {
        return commits.iter().map(|(id, _)| *id).collect();
    }

    let mut selected = Vec::new();
    let mut i = 0usize;
    while i < total {
        if max_bitmaps > 0 && selected.len() >= max_bitmaps {
            break;
        }
        let skip = next_commit_index(i);
        if i + skip >= total {
            break;
        }
        if skip == 0 {
            selected.push(commits[i].0);
        } else {
            // Prefer the most recent merge commit within the skip window;
            // fall back to the commit at the far edge of the window.
            let mut chosen = commits[i + skip].0;
            for (id, parent_count) in &commits[i..=i + skip] {
                if *parent_count >= 2 {
                    chosen = *id;
                }
            }
            selected.push(chosen);
        }
        i += skip + 1;
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(n: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        ObjectId::from_bytes(&bytes, git_hash::HashAlgorithm::Sha1).unwrap()
    }

    #[test]
    fn must_region_selects_every_commit() {
        let commits: Vec<_> = (0..50u8).map(|n| (oid(n), 1)).collect();
        let selected = select_commits(&commits, 0);
        assert_eq!(selected.len(), commits.len());
    }

    #[test]
    fn below_must_threshold_selects_all() {
        assert_eq!(next_commit_index(0), 0);
        assert_eq!(next_commit_index(MUST_REGION), 0);
    }

    #[test]
    fn ramp_region_grows_then_caps_at_min_commits() {
        assert_eq!(next_commit_index(MUST_REGION + 1), 1);
        assert_eq!(next_commit_index(MIN_REGION), MIN_COMMITS);
    }

    #[test]
    fn deep_region_uses_max_commits_floor_of_min_commits() {
        let deep = next_commit_index(MIN_REGION + 1);
        assert!(deep >= MIN_COMMITS);
        assert!(deep <= MAX_COMMITS);
    }

    #[test]
    fn max_bitmaps_caps_selection_count() {
        let commits: Vec<_> = (0u8..=250).map(|n| (oid(n), 1)).collect();
        let selected = select_commits(&commits, 10);
        assert!(selected.len() <= 10);
    }

    #[test]
    fn merge_commit_preferred_within_skip_window() {
        // Build enough commits to land in the ramp region with a nonzero skip,
        // and make the merge sit in the middle of the first ramp window.
        let mut commits = Vec::new();
        for n in 0..(MUST_REGION + 5) {
            commits.push((oid((n % 250) as u8), if n == MUST_REGION + 2 { 2 } else { 1 }));
        }
        let selected = select_commits(&commits, 0);
        let merge_id = commits[MUST_REGION + 2].0;
        assert!(selected.contains(&merge_id));
    }
}
