//! In-place manifest edits

use std::collections::{BTreeSet, HashSet};

use plsync_fs::{Manifest, NormalizedPath};

/// Drop entries whose key is in `remove` and append keys from `add` that are
/// not already listed. Matching is case-insensitive; surviving entries keep
/// their order and spelling. Returns whether anything changed.
pub(crate) fn edit_manifest<F>(
    manifest: &mut Manifest,
    normalize: F,
    add: &BTreeSet<NormalizedPath>,
    remove: &BTreeSet<NormalizedPath>,
) -> bool
where
    F: Fn(&str) -> NormalizedPath,
{
    let removed: HashSet<String> = remove.iter().map(NormalizedPath::folded).collect();
    let before = manifest.entries.len();
    manifest
        .entries
        .retain(|entry| !removed.contains(&normalize(entry).folded()));
    let mut changed = manifest.entries.len() != before;

    let mut present: HashSet<String> = manifest
        .entries
        .iter()
        .map(|entry| normalize(entry).folded())
        .collect();
    for key in add {
        if present.insert(key.folded()) {
            manifest.entries.push(key.as_str().to_string());
            changed = true;
        }
    }
    changed
}
