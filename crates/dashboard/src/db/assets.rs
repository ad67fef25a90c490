//! Asset repository.
//!
//! All queries are built at runtime with `query_as` and typed row structs.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use uuid::Uuid;

use ict_assets_core::{AssetId, CategoryId};

use super::{RepositoryError, contains_pattern};
use crate::models::{Asset, AssetInput};

/// Default page size for asset lists.
pub const DEFAULT_LIMIT: i64 = 200;

const SELECT_ASSET: &str = r"
    SELECT a.id, a.asset_no, a.asset_name, a.category_id, c.name AS category_name,
           a.type AS asset_type, a.qr_code, a.year, a.department, a.unit, a.user_name,
           a.purchase_date, a.price, a.supplier, a.source, a.model, a.serial_no,
           a.processor, a.ram_capacity, a.hdd_capacity,
           a.monitor_model, a.monitor_serial_no, a.monitor_asset_no,
           a.keyboard_model, a.keyboard_serial_no, a.keyboard_asset_no,
           a.mouse_model, a.mouse_serial_no, a.mouse_asset_no,
           a.accessories, a.created_at
    FROM assets a
    LEFT JOIN asset_categories c ON c.id = a.category_id
";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AssetRow {
    id: Uuid,
    asset_no: String,
    asset_name: String,
    category_id: Option<Uuid>,
    category_name: Option<String>,
    asset_type: Option<String>,
    qr_code: Option<String>,
    year: Option<i32>,
    department: Option<String>,
    unit: Option<String>,
    user_name: Option<String>,
    purchase_date: Option<NaiveDate>,
    price: Option<Decimal>,
    supplier: Option<String>,
    source: Option<String>,
    model: Option<String>,
    serial_no: Option<String>,
    processor: Option<String>,
    ram_capacity: Option<String>,
    hdd_capacity: Option<String>,
    monitor_model: Option<String>,
    monitor_serial_no: Option<String>,
    monitor_asset_no: Option<String>,
    keyboard_model: Option<String>,
    keyboard_serial_no: Option<String>,
    keyboard_asset_no: Option<String>,
    mouse_model: Option<String>,
    mouse_serial_no: Option<String>,
    mouse_asset_no: Option<String>,
    accessories: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AssetRow> for Asset {
    fn from(row: AssetRow) -> Self {
        Self {
            id: AssetId::new(row.id),
            category_name: row.category_name,
            created_at: row.created_at,
            fields: AssetInput {
                asset_no: row.asset_no,
                asset_name: row.asset_name,
                category_id: row.category_id.map(CategoryId::new),
                asset_type: row.asset_type,
                qr_code: row.qr_code,
                year: row.year,
                department: row.department,
                unit: row.unit,
                user_name: row.user_name,
                purchase_date: row.purchase_date,
                price: row.price,
                supplier: row.supplier,
                source: row.source,
                model: row.model,
                serial_no: row.serial_no,
                processor: row.processor,
                ram_capacity: row.ram_capacity,
                hdd_capacity: row.hdd_capacity,
                monitor_model: row.monitor_model,
                monitor_serial_no: row.monitor_serial_no,
                monitor_asset_no: row.monitor_asset_no,
                keyboard_model: row.keyboard_model,
                keyboard_serial_no: row.keyboard_serial_no,
                keyboard_asset_no: row.keyboard_asset_no,
                mouse_model: row.mouse_model,
                mouse_serial_no: row.mouse_serial_no,
                mouse_asset_no: row.mouse_asset_no,
                accessories: row.accessories,
            },
        }
    }
}

/// Category and type of one asset, for report aggregation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AssetFact {
    pub category_name: Option<String>,
    pub asset_type: Option<String>,
}

/// Filters for [`AssetRepository::search`].
#[derive(Debug, Clone, Default)]
pub struct AssetSearch {
    /// Case-insensitive substring over number, name, type, department,
    /// unit, assigned user and category name.
    pub term: Option<String>,
    /// Only assets assigned to this user name.
    pub owner: Option<String>,
    pub limit: Option<i64>,
}

/// Bind the 28 editable columns in table order, starting at `$1`.
fn bind_fields<'q>(
    query: Query<'q, Postgres, PgArguments>,
    input: &'q AssetInput,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(&input.asset_no)
        .bind(&input.asset_name)
        .bind(input.category_id)
        .bind(&input.asset_type)
        .bind(&input.qr_code)
        .bind(input.year)
        .bind(&input.department)
        .bind(&input.unit)
        .bind(&input.user_name)
        .bind(input.purchase_date)
        .bind(input.price)
        .bind(&input.supplier)
        .bind(&input.source)
        .bind(&input.model)
        .bind(&input.serial_no)
        .bind(&input.processor)
        .bind(&input.ram_capacity)
        .bind(&input.hdd_capacity)
        .bind(&input.monitor_model)
        .bind(&input.monitor_serial_no)
        .bind(&input.monitor_asset_no)
        .bind(&input.keyboard_model)
        .bind(&input.keyboard_serial_no)
        .bind(&input.keyboard_asset_no)
        .bind(&input.mouse_model)
        .bind(&input.mouse_serial_no)
        .bind(&input.mouse_asset_no)
        .bind(&input.accessories)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for asset database operations.
pub struct AssetRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AssetRepository<'a> {
    /// Create a new asset repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Search assets, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, filter: &AssetSearch) -> Result<Vec<Asset>, RepositoryError> {
        let sql = format!(
            r"{SELECT_ASSET}
            WHERE ($1::text IS NULL
                   OR a.asset_no ILIKE $1 OR a.asset_name ILIKE $1 OR a.type ILIKE $1
                   OR a.department ILIKE $1 OR a.unit ILIKE $1 OR a.user_name ILIKE $1
                   OR c.name ILIKE $1)
              AND ($2::text IS NULL OR btrim(a.user_name) = $2)
            ORDER BY a.created_at DESC
            LIMIT $3"
        );
        let owner = filter
            .owner
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let rows = sqlx::query_as::<_, AssetRow>(&sql)
            .bind(contains_pattern(filter.term.as_deref()))
            .bind(owner)
            .bind(filter.limit.unwrap_or(DEFAULT_LIMIT))
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get an asset by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AssetId) -> Result<Option<Asset>, RepositoryError> {
        let sql = format!("{SELECT_ASSET} WHERE a.id = $1");
        let row = sqlx::query_as::<_, AssetRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Find an asset by scanned code: asset number, stored QR code, or id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Asset>, RepositoryError> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }
        let sql = format!(
            r"{SELECT_ASSET}
            WHERE a.asset_no = $1 OR a.qr_code = $1 OR ($2::uuid IS NOT NULL AND a.id = $2)
            ORDER BY a.created_at DESC
            LIMIT 1"
        );
        let row = sqlx::query_as::<_, AssetRow>(&sql)
            .bind(code)
            .bind(AssetId::parse(code))
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Insert an asset.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &AssetInput) -> Result<AssetId, RepositoryError> {
        let query = sqlx::query(
            r"
            INSERT INTO assets (
                asset_no, asset_name, category_id, type, qr_code, year, department, unit,
                user_name, purchase_date, price, supplier, source, model, serial_no,
                processor, ram_capacity, hdd_capacity,
                monitor_model, monitor_serial_no, monitor_asset_no,
                keyboard_model, keyboard_serial_no, keyboard_asset_no,
                mouse_model, mouse_serial_no, mouse_asset_no, accessories
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)
            RETURNING id
            ",
        );
        let row = bind_fields(query, input).fetch_one(self.pool).await?;
        let id: Uuid = row.try_get("id")?;

        Ok(AssetId::new(id))
    }

    /// Overwrite every editable field of an asset.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no asset has this id, or
    /// `RepositoryError::Database` if the update fails.
    pub async fn update(&self, id: AssetId, input: &AssetInput) -> Result<(), RepositoryError> {
        let query = sqlx::query(
            r"
            UPDATE assets SET
                asset_no = $1, asset_name = $2, category_id = $3, type = $4, qr_code = $5,
                year = $6, department = $7, unit = $8, user_name = $9, purchase_date = $10,
                price = $11, supplier = $12, source = $13, model = $14, serial_no = $15,
                processor = $16, ram_capacity = $17, hdd_capacity = $18,
                monitor_model = $19, monitor_serial_no = $20, monitor_asset_no = $21,
                keyboard_model = $22, keyboard_serial_no = $23, keyboard_asset_no = $24,
                mouse_model = $25, mouse_serial_no = $26, mouse_asset_no = $27,
                accessories = $28
            WHERE id = $29
            ",
        );
        let result = bind_fields(query, input)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete an asset.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: AssetId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Store the code encoded in the asset's QR image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no asset has this id.
    pub async fn set_qr_code(&self, id: AssetId, code: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE assets SET qr_code = $1 WHERE id = $2")
            .bind(code)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Total and assigned asset counts, optionally for one owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts(&self, owner: Option<&str>) -> Result<(i64, i64), RepositoryError> {
        let counts: (i64, i64) = sqlx::query_as(
            r"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE COALESCE(btrim(user_name), '') <> '')
            FROM assets
            WHERE ($1::text IS NULL OR btrim(user_name) = $1)
            ",
        )
        .bind(owner.map(str::trim).filter(|s| !s.is_empty()))
        .fetch_one(self.pool)
        .await?;

        Ok(counts)
    }

    /// Asset count per category name (`None` for uncategorised).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_counts(&self) -> Result<Vec<(Option<String>, i64)>, RepositoryError> {
        let rows: Vec<(Option<String>, i64)> = sqlx::query_as(
            r"
            SELECT c.name, COUNT(*)
            FROM assets a
            LEFT JOIN asset_categories c ON c.id = a.category_id
            GROUP BY c.name
            ORDER BY COUNT(*) DESC, c.name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Category and type of every asset.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn facts(&self) -> Result<Vec<AssetFact>, RepositoryError> {
        let rows = sqlx::query_as::<_, AssetFact>(
            r"
            SELECT c.name AS category_name, a.type AS asset_type
            FROM assets a
            LEFT JOIN asset_categories c ON c.id = a.category_id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
