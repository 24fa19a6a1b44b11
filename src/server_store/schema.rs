//! SQLite schema definitions for the server database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// Job runs table - stores history of background job executions
const JOB_RUNS_TABLE_V1: Table = Table {
    name: "job_runs",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("job_id", &SqlType::Text, non_null = true),
        sqlite_column!("started_at", &SqlType::Text, non_null = true),
        sqlite_column!("finished_at", &SqlType::Text),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!("error_message", &SqlType::Text),
        sqlite_column!("triggered_by", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_job_runs_job_id_started", "job_id, started_at DESC"),
        ("idx_job_runs_status", "status"),
    ],
    unique_constraints: &[],
};

/// Job schedules table - stores next run times for scheduled jobs
const JOB_SCHEDULES_TABLE_V1: Table = Table {
    name: "job_schedules",
    columns: &[
        sqlite_column!("job_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("next_run_at", &SqlType::Text, non_null = true),
        sqlite_column!("last_run_at", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[],
};

/// Job audit log table - detailed audit trail for job executions
const JOB_AUDIT_LOG_TABLE_V1: Table = Table {
    name: "job_audit_log",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("job_id", &SqlType::Text, non_null = true),
        sqlite_column!("event_type", &SqlType::Text, non_null = true),
        sqlite_column!("timestamp", &SqlType::Text, non_null = true),
        sqlite_column!("duration_ms", &SqlType::Integer),
        sqlite_column!("details", &SqlType::Text),
        sqlite_column!("error", &SqlType::Text),
    ],
    indices: &[
        ("idx_job_audit_log_job_id", "job_id"),
        ("idx_job_audit_log_timestamp", "timestamp DESC"),
        ("idx_job_audit_log_event_type", "event_type"),
    ],
    unique_constraints: &[],
};

/// All versioned schemas for the server database.
///
/// Version 1: job runs, schedules and audit log
pub const SERVER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        JOB_RUNS_TABLE_V1,
        JOB_SCHEDULES_TABLE_V1,
        JOB_AUDIT_LOG_TABLE_V1,
    ],
    migration: None,
}];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_v1_schema_creates_successfully() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = &SERVER_VERSIONED_SCHEMAS[0];
        schema.create(&conn).unwrap();
        schema.validate(&conn).unwrap();
    }

    #[test]
    fn test_job_runs_indices_created() {
        let conn = Connection::open_in_memory().unwrap();
        SERVER_VERSIONED_SCHEMAS[0].create(&conn).unwrap();

        for index_name in [
            "idx_job_runs_job_id_started",
            "idx_job_runs_status",
            "idx_job_audit_log_job_id",
            "idx_job_audit_log_timestamp",
            "idx_job_audit_log_event_type",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name=?1",
                    [index_name],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing index {index_name}");
        }
    }
}
