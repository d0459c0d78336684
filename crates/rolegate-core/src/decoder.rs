//! Decoding of raw permission records into [`PermissionMap`]s.
//!
//! Both record shapes flow through [`decode`]. A failure only ever concerns the
//! record at hand; callers drop that role and keep going.

use serde::Deserialize;

use crate::error::RecordDecodeError;
use crate::record::{PermissionRow, RawPermissionRecord, RecordPayload};
use crate::types::PermissionMap;

/// One element of the JSON column.
#[derive(Debug, Deserialize)]
struct ScreenPermission {
    screen_name: String,
    permission_name: String,
}

/// Decode one role's raw record.
///
/// No partially built map is ever returned: either every pair decodes or the
/// whole record fails.
pub fn decode(record: &RawPermissionRecord) -> Result<PermissionMap, RecordDecodeError> {
    match &record.payload {
        RecordPayload::Rows(rows) => decode_rows(rows),
        RecordPayload::Json(text) => decode_json(text.as_deref()),
    }
}

/// Decode pre-joined rows.
///
/// A row with both columns NULL marks a role with nothing granted and is skipped.
pub fn decode_rows(rows: &[PermissionRow]) -> Result<PermissionMap, RecordDecodeError> {
    let mut map = PermissionMap::new();
    for (index, row) in rows.iter().enumerate() {
        match (&row.screen_name, &row.permission_name) {
            (Some(screen), Some(permission)) => {
                map.grant(screen.as_str(), permission.as_str());
            }
            (None, None) => {}
            (Some(_), None) => {
                return Err(RecordDecodeError::IncompleteRow {
                    index,
                    missing: "permission_name",
                });
            }
            (None, Some(_)) => {
                return Err(RecordDecodeError::IncompleteRow {
                    index,
                    missing: "screen_name",
                });
            }
        }
    }
    Ok(map)
}

/// Decode the JSON column text. NULL, blank text and JSON `null` are empty maps.
pub fn decode_json(text: Option<&str>) -> Result<PermissionMap, RecordDecodeError> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(PermissionMap::new());
    };

    let entries: Option<Vec<ScreenPermission>> = serde_json::from_str(text)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| (entry.screen_name, entry.permission_name))
        .collect())
}
