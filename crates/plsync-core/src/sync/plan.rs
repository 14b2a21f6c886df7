//! Requested operation sets and their validation

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use plsync_fs::{LibraryRoot, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::diff::ComparisonResult;
use crate::{Error, Result};

/// One of the four per-file operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncKind {
    AddToRemote,
    AddToLocal,
    DeleteFromRemote,
    DeleteFromLocal,
}

impl SyncKind {
    /// Execution order.
    pub const ALL: [SyncKind; 4] = [
        SyncKind::AddToRemote,
        SyncKind::AddToLocal,
        SyncKind::DeleteFromRemote,
        SyncKind::DeleteFromLocal,
    ];

    pub fn is_destructive(self) -> bool {
        matches!(self, SyncKind::DeleteFromRemote | SyncKind::DeleteFromLocal)
    }

    /// Whether the operation changes files on the local side.
    pub fn touches_local(self) -> bool {
        matches!(self, SyncKind::AddToLocal | SyncKind::DeleteFromLocal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncKind::AddToRemote => "add-to-remote",
            SyncKind::AddToLocal => "add-to-local",
            SyncKind::DeleteFromRemote => "delete-from-remote",
            SyncKind::DeleteFromLocal => "delete-from-local",
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller's request: apply `kind` to these paths.
///
/// Paths may be absolute local paths or library keys; both are normalized
/// against the library root when the plan is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub kind: SyncKind,
    pub paths: BTreeSet<PathBuf>,
}

impl SyncRequest {
    pub fn new<P: Into<PathBuf>>(kind: SyncKind, paths: impl IntoIterator<Item = P>) -> Self {
        Self {
            kind,
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

/// Which sides of a comparison to act on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    /// Upload tracks missing remotely
    pub push: bool,
    /// Download tracks missing locally
    pub pull: bool,
    /// Delete remote tracks missing locally
    pub delete_remote: bool,
    /// Delete local tracks missing remotely
    pub delete_local: bool,
}

/// Up to four pairwise disjoint sets of library keys, plus whether the
/// manifests themselves should be rewritten to match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    sets: BTreeMap<SyncKind, BTreeSet<NormalizedPath>>,
    pub rewrite_manifests: bool,
}

impl SyncPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and validate a plan from raw requests.
    pub fn from_requests(
        root: &LibraryRoot,
        requests: impl IntoIterator<Item = SyncRequest>,
    ) -> Result<Self> {
        let mut plan = Self::new();
        for request in requests {
            let keys = request.paths.iter().map(|p| normalize_path(root, p));
            plan.sets.entry(request.kind).or_default().extend(keys);
        }
        plan.validate()?;
        Ok(plan)
    }

    /// Derive a plan from a comparison. Choosing both sides of the same
    /// difference (push with delete-local, pull with delete-remote) fails
    /// validation.
    pub fn from_comparison(
        result: &ComparisonResult,
        root: &LibraryRoot,
        selection: Selection,
    ) -> Result<Self> {
        let mut requests = Vec::new();
        if selection.push {
            requests.push(SyncRequest::new(SyncKind::AddToRemote, result.missing_remotely.iter().cloned()));
        }
        if selection.pull {
            requests.push(SyncRequest::new(SyncKind::AddToLocal, result.missing_locally.iter().cloned()));
        }
        if selection.delete_remote {
            requests.push(SyncRequest::new(SyncKind::DeleteFromRemote, result.missing_locally.iter().cloned()));
        }
        if selection.delete_local {
            requests.push(SyncRequest::new(SyncKind::DeleteFromLocal, result.missing_remotely.iter().cloned()));
        }
        Self::from_requests(root, requests)
    }

    /// Add already-normalized keys to one set. Call [`validate`](Self::validate)
    /// before running a plan assembled this way.
    pub fn with(mut self, kind: SyncKind, keys: impl IntoIterator<Item = NormalizedPath>) -> Self {
        self.sets.entry(kind).or_default().extend(keys);
        self
    }

    pub fn with_manifest_rewrite(mut self, rewrite: bool) -> Self {
        self.rewrite_manifests = rewrite;
        self
    }

    /// Keys of one set, in sorted order.
    pub fn keys(&self, kind: SyncKind) -> impl Iterator<Item = &NormalizedPath> {
        self.sets.get(&kind).into_iter().flatten()
    }

    pub fn len(&self, kind: SyncKind) -> usize {
        self.sets.get(&kind).map_or(0, BTreeSet::len)
    }

    /// No file operations requested. A rewrite with no sets has nothing to do.
    pub fn is_empty(&self) -> bool {
        self.sets.values().all(BTreeSet::is_empty)
    }

    /// Number of deletions, for confirmation prompts.
    pub fn destructive_count(&self) -> usize {
        SyncKind::ALL
            .into_iter()
            .filter(|k| k.is_destructive())
            .map(|k| self.len(k))
            .sum()
    }

    /// Whether any non-empty set changes local files; such plans need a
    /// verified backup of the playlist before they run.
    pub fn touches_local_files(&self) -> bool {
        SyncKind::ALL
            .into_iter()
            .any(|k| k.touches_local() && self.len(k) > 0)
    }

    /// Non-empty sets in execution order.
    pub fn operations(&self) -> Vec<(SyncKind, &BTreeSet<NormalizedPath>)> {
        SyncKind::ALL
            .into_iter()
            .filter_map(|k| self.sets.get(&k).filter(|s| !s.is_empty()).map(|s| (k, s)))
            .collect()
    }

    /// Sets must be pairwise disjoint, compared case-insensitively.
    pub fn validate(&self) -> Result<()> {
        let folded: Vec<(SyncKind, BTreeMap<String, &NormalizedPath>)> = self
            .operations()
            .into_iter()
            .map(|(kind, keys)| (kind, keys.iter().map(|k| (k.folded(), k)).collect()))
            .collect();

        for (i, (first, first_keys)) in folded.iter().enumerate() {
            for (second, second_keys) in &folded[i + 1..] {
                if let Some(key) = first_keys
                    .iter()
                    .find_map(|(f, k)| second_keys.contains_key(f).then_some(*k))
                {
                    return Err(Error::InvalidRequest {
                        message: format!("'{key}' appears in both {first} and {second}"),
                    });
                }
            }
        }
        Ok(())
    }
}

fn normalize_path(root: &LibraryRoot, path: &Path) -> NormalizedPath {
    root.normalize(&path.to_string_lossy())
}
