//! [`RecordStore`] over a PostgreSQL table.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use rolegate_core::{
    PermissionRow, RawPermissionRecord, RecordPayload, RecordStore, RoleName, StoreError,
    StoreResult,
};
use sqlx_core::query_as::query_as;

use crate::config::{PostgresConfig, RecordShape};
use crate::{PgPool, PostgresStoreResult, connect, quote_table};

/// `(role_name, screen_name, permission_name)`
type PermissionTuple = (String, Option<String>, Option<String>);

/// `(role_name, screen_permission::text)`
type JsonTuple = (String, Option<String>);

// =============================================================================
// PostgreSQL Record Store
// =============================================================================

/// Permission record store backed by a PostgreSQL table or view.
///
/// The SQL text is built once at construction, after the table name has been
/// validated; every value is bound as a parameter.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
    shape: RecordShape,
    sql: String,
}

impl PostgresRecordStore {
    /// Create a store over an existing pool.
    ///
    /// # Errors
    ///
    /// Returns an error if `table` is not a valid identifier.
    pub fn new(pool: PgPool, table: &str, shape: RecordShape) -> PostgresStoreResult<Self> {
        let table = quote_table(table)?;
        let columns = match shape {
            RecordShape::Rows => "role_name, screen_name, permission_name",
            RecordShape::JsonColumn => "role_name, screen_permission::text",
        };
        let sql = format!(
            "SELECT {columns} FROM {table} \
             WHERE first_name = $1 AND designation_name = $2 AND role_name = ANY($3)"
        );
        Ok(Self { pool, shape, sql })
    }

    /// Connect a new pool and create a store from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table name is invalid or the connection fails.
    pub async fn connect(config: &PostgresConfig) -> PostgresStoreResult<Self> {
        // Validate before opening connections.
        quote_table(&config.table)?;
        let pool = connect(config).await?;
        Self::new(pool, &config.table, config.record_shape)
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[must_use]
    pub fn shape(&self) -> RecordShape {
        self.shape
    }

    async fn fetch_rows(
        &self,
        principal: &str,
        designation: &str,
        roles: Vec<String>,
    ) -> StoreResult<Vec<RawPermissionRecord>> {
        let rows: Vec<PermissionTuple> = query_as(&self.sql)
            .bind(principal)
            .bind(designation)
            .bind(roles)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::query)?;

        Ok(group_rows(rows))
    }

    async fn fetch_json(
        &self,
        principal: &str,
        designation: &str,
        roles: Vec<String>,
    ) -> StoreResult<Vec<RawPermissionRecord>> {
        let rows: Vec<JsonTuple> = query_as(&self.sql)
            .bind(principal)
            .bind(designation)
            .bind(roles)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::query)?;

        Ok(first_json_per_role(rows))
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn fetch_records(
        &self,
        principal: &str,
        designation: &str,
        roles: &[RoleName],
    ) -> StoreResult<Vec<RawPermissionRecord>> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let role_names: Vec<String> = roles.iter().map(|role| role.as_str().to_owned()).collect();
        let records = match self.shape {
            RecordShape::Rows => self.fetch_rows(principal, designation, role_names).await?,
            RecordShape::JsonColumn => self.fetch_json(principal, designation, role_names).await?,
        };

        tracing::debug!(
            principal = %principal,
            designation = %designation,
            requested = roles.len(),
            found = records.len(),
            "fetched permission records"
        );
        Ok(records)
    }
}

// =============================================================================
// Row Grouping
// =============================================================================

/// Group joined rows into one record per role, roles in first-seen order.
fn group_rows(rows: Vec<PermissionTuple>) -> Vec<RawPermissionRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut records: Vec<RawPermissionRecord> = Vec::new();

    for (role, screen_name, permission_name) in rows {
        let row = PermissionRow {
            screen_name,
            permission_name,
        };
        match index.get(&role) {
            Some(&position) => {
                if let RecordPayload::Rows(rows) = &mut records[position].payload {
                    rows.push(row);
                }
            }
            None => {
                index.insert(role.clone(), records.len());
                records.push(RawPermissionRecord::rows(role, vec![row]));
            }
        }
    }

    records
}

/// Keep the first JSON row per role.
fn first_json_per_role(rows: Vec<JsonTuple>) -> Vec<RawPermissionRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();

    for (role, text) in rows {
        if !seen.insert(role.clone()) {
            tracing::debug!(role = %role, "duplicate permission row ignored");
            continue;
        }
        records.push(RawPermissionRecord::json(role, text));
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(role: &str, screen: Option<&str>, permission: Option<&str>) -> PermissionTuple {
        (
            role.to_string(),
            screen.map(str::to_string),
            permission.map(str::to_string),
        )
    }

    #[test]
    fn test_group_rows_first_seen_order() {
        let records = group_rows(vec![
            tuple("VIEWER", Some("Dashboard"), Some("VIEW")),
            tuple("ADMIN", Some("Dashboard"), Some("EDIT")),
            tuple("VIEWER", Some("Reports"), Some("VIEW")),
        ]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].role.as_str(), "VIEWER");
        assert_eq!(records[1].role.as_str(), "ADMIN");
        assert_eq!(
            records[0].payload,
            RecordPayload::Rows(vec![
                PermissionRow::new("Dashboard", "VIEW"),
                PermissionRow::new("Reports", "VIEW"),
            ])
        );
    }

    #[test]
    fn test_group_rows_keeps_null_columns() {
        let records = group_rows(vec![tuple("GUEST", None, None)]);
        assert_eq!(
            records[0].payload,
            RecordPayload::Rows(vec![PermissionRow::default()])
        );
    }

    #[test]
    fn test_group_rows_empty() {
        assert!(group_rows(Vec::new()).is_empty());
    }

    #[test]
    fn test_first_json_per_role() {
        let records = first_json_per_role(vec![
            ("ADMIN".into(), Some("[]".into())),
            ("VIEWER".into(), None),
            ("ADMIN".into(), Some("not json".into())),
        ]);

        assert_eq!(
            records,
            vec![
                RawPermissionRecord::json("ADMIN", Some("[]".into())),
                RawPermissionRecord::json("VIEWER", None),
            ]
        );
    }
}
