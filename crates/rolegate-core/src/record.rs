//! Raw permission records as returned by a [`RecordStore`](crate::RecordStore).

use crate::types::RoleName;

/// One role's raw permission data, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPermissionRecord {
    pub role: RoleName,
    pub payload: RecordPayload,
}

/// Shape of a stored permission record.
///
/// Which shape a deployment produces is fixed by its store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPayload {
    /// Pre-joined `(screen_name, permission_name)` rows, already grouped by role.
    Rows(Vec<PermissionRow>),

    /// Text of a JSON column holding `[{"screen_name": .., "permission_name": ..}]`.
    /// `None` when the column is NULL.
    Json(Option<String>),
}

/// A single pre-joined permission row. Columns are nullable upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionRow {
    pub screen_name: Option<String>,
    pub permission_name: Option<String>,
}

impl PermissionRow {
    pub fn new(screen_name: impl Into<String>, permission_name: impl Into<String>) -> Self {
        Self {
            screen_name: Some(screen_name.into()),
            permission_name: Some(permission_name.into()),
        }
    }
}

impl RawPermissionRecord {
    pub fn rows(role: impl Into<RoleName>, rows: Vec<PermissionRow>) -> Self {
        Self {
            role: role.into(),
            payload: RecordPayload::Rows(rows),
        }
    }

    pub fn json(role: impl Into<RoleName>, text: Option<String>) -> Self {
        Self {
            role: role.into(),
            payload: RecordPayload::Json(text),
        }
    }

    /// Row-shaped record built from `(screen, permission)` pairs.
    pub fn from_pairs<S, P>(role: impl Into<RoleName>, pairs: impl IntoIterator<Item = (S, P)>) -> Self
    where
        S: Into<String>,
        P: Into<String>,
    {
        Self::rows(
            role,
            pairs
                .into_iter()
                .map(|(screen, permission)| PermissionRow::new(screen, permission))
                .collect(),
        )
    }
}
