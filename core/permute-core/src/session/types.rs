//! Serialized session record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::{display_date, Snapshot};

/// The snapshot being viewed while detached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub hash: String,
    pub subject: String,
    pub date: DateTime<Utc>,
}

impl From<&Snapshot> for SnapshotInfo {
    fn from(snapshot: &Snapshot) -> Self {
        SnapshotInfo {
            hash: snapshot.hash.clone(),
            subject: snapshot.subject.clone(),
            date: snapshot.date,
        }
    }
}

impl SnapshotInfo {
    pub fn display_date(&self) -> String {
        display_date(self.date)
    }
}

/// Why the app currently has HEAD detached.
///
/// Every field is optional on disk so a partially written or hand-edited file
/// still loads; [`SessionRecord::is_complete`] decides whether it can be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default)]
    pub detached_from_branch: Option<String>,
    #[serde(default)]
    pub detached_snapshot: Option<SnapshotInfo>,
    #[serde(default)]
    pub is_viewing_latest: bool,
}

impl SessionRecord {
    pub fn new(from_branch: &str, snapshot: SnapshotInfo, is_viewing_latest: bool) -> Self {
        SessionRecord {
            detached_from_branch: Some(from_branch.to_string()),
            detached_snapshot: Some(snapshot),
            is_viewing_latest,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.detached_from_branch.is_none() && self.detached_snapshot.is_none()
    }

    /// True when both the origin branch and the viewed snapshot are known.
    pub fn is_complete(&self) -> bool {
        self.detached_from_branch
            .as_deref()
            .is_some_and(|b| !b.is_empty())
            && self.detached_snapshot.is_some()
    }
}
