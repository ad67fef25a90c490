//! Maintenance request repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ict_assets_core::{AssetId, MaintenanceId, MaintenanceStatus, UserId};

use super::RepositoryError;
use crate::models::{MaintenanceRequest, NewMaintenanceRequest};

const SELECT_REQUEST: &str = r"
    SELECT m.id, m.title, m.asset_id,
           COALESCE(NULLIF(btrim(a.asset_name), ''), a.asset_no) AS asset_label,
           m.description, m.requested_by, p.full_name AS requester_name,
           m.status, m.created_at
    FROM maintenance_requests m
    LEFT JOIN profiles p ON p.id = m.requested_by
    LEFT JOIN assets a ON a.id = m.asset_id
";

#[derive(Debug, sqlx::FromRow)]
struct MaintenanceRow {
    id: Uuid,
    title: String,
    asset_id: Option<Uuid>,
    asset_label: Option<String>,
    description: Option<String>,
    requested_by: Option<Uuid>,
    requester_name: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<MaintenanceRow> for MaintenanceRequest {
    fn from(row: MaintenanceRow) -> Self {
        Self {
            id: MaintenanceId::new(row.id),
            title: row.title,
            asset_id: row.asset_id.map(AssetId::new),
            asset_label: row.asset_label,
            description: row.description,
            requested_by: row.requested_by.map(UserId::new),
            requester_name: row.requester_name,
            status: MaintenanceStatus::from_stored(&row.status),
            status_raw: row.status,
            created_at: row.created_at,
        }
    }
}

/// Request counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub resolved: i64,
}

impl StatusCounts {
    /// Pending plus in progress.
    #[must_use]
    pub const fn open(&self) -> i64 {
        self.pending + self.in_progress
    }

    /// Tally a list of requests. Unrecognised statuses count toward the
    /// total only.
    #[must_use]
    pub fn tally<'r>(requests: impl IntoIterator<Item = &'r MaintenanceRequest>) -> Self {
        requests
            .into_iter()
            .fold(Self::default(), |mut counts, request| {
                counts.total += 1;
                match request.status {
                    Some(MaintenanceStatus::Pending) => counts.pending += 1,
                    Some(MaintenanceStatus::InProgress) => counts.in_progress += 1,
                    Some(MaintenanceStatus::Resolved) => counts.resolved += 1,
                    None => {}
                }
                counts
            })
    }
}

/// Repository for maintenance requests.
pub struct MaintenanceRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MaintenanceRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every request, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<MaintenanceRequest>, RepositoryError> {
        let sql = format!("{SELECT_REQUEST} ORDER BY m.created_at DESC");
        let rows = sqlx::query_as::<_, MaintenanceRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Requests raised by one user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_requester(
        &self,
        user: UserId,
    ) -> Result<Vec<MaintenanceRequest>, RepositoryError> {
        let sql = format!("{SELECT_REQUEST} WHERE m.requested_by = $1 ORDER BY m.created_at DESC");
        let rows = sqlx::query_as::<_, MaintenanceRow>(&sql)
            .bind(user)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a request with status `Pending`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, request: &NewMaintenanceRequest) -> Result<MaintenanceId, RepositoryError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r"
            INSERT INTO maintenance_requests (title, asset_id, description, requested_by, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(&request.title)
        .bind(request.asset_id)
        .bind(&request.description)
        .bind(request.requested_by)
        .bind(MaintenanceStatus::Pending.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(MaintenanceId::new(id))
    }

    /// Move a request to a new status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no request has this id.
    pub async fn update_status(
        &self,
        id: MaintenanceId,
        status: MaintenanceStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE maintenance_requests SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Status and creation time of every request, for reports.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn facts(&self) -> Result<Vec<(String, DateTime<Utc>)>, RepositoryError> {
        let rows: Vec<(String, DateTime<Utc>)> =
            sqlx::query_as("SELECT status, created_at FROM maintenance_requests")
                .fetch_all(self.pool)
                .await?;

        Ok(rows)
    }

    /// Count requests by status, optionally for one requester.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts(&self, requester: Option<UserId>) -> Result<StatusCounts, RepositoryError> {
        let (total, pending, in_progress, resolved): (i64, i64, i64, i64) = sqlx::query_as(
            r"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE status IN ('Pending', 'pending')),
                   COUNT(*) FILTER (WHERE status IN ('In Progress', 'in_progress')),
                   COUNT(*) FILTER (WHERE status IN ('Resolved', 'resolved', 'completed'))
            FROM maintenance_requests
            WHERE ($1::uuid IS NULL OR requested_by = $1)
            ",
        )
        .bind(requester)
        .fetch_one(self.pool)
        .await?;

        Ok(StatusCounts {
            total,
            pending,
            in_progress,
            resolved,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(status: &str) -> MaintenanceRequest {
        MaintenanceRequest {
            id: MaintenanceId::random(),
            title: "Printer jam".to_string(),
            asset_id: None,
            asset_label: None,
            description: None,
            requested_by: None,
            requester_name: None,
            status: MaintenanceStatus::from_stored(status),
            status_raw: status.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_tally() {
        let requests = [
            request("Pending"),
            request("in_progress"),
            request("Resolved"),
            request("completed"),
            request("archived"),
        ];
        let counts = StatusCounts::tally(&requests);
        assert_eq!(
            counts,
            StatusCounts {
                total: 5,
                pending: 1,
                in_progress: 1,
                resolved: 2,
            }
        );
        assert_eq!(counts.open(), 2);
    }
}
