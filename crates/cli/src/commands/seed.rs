//! Reference data seeding.

use ict_assets_dashboard::db::CategoryRepository;

use super::{CommandError, connect};

/// Categories a fresh installation starts with.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Desktop",
    "Laptop",
    "Monitor",
    "Printer",
    "Scanner",
    "Projector",
    "Network Equipment",
    "Server",
    "Tablet",
    "Peripheral",
];

/// Insert [`DEFAULT_CATEGORIES`]; existing names are left alone.
///
/// Returns the number of categories created.
pub async fn categories() -> Result<usize, CommandError> {
    let pool = connect().await?;
    let repo = CategoryRepository::new(&pool);

    let mut created = 0;
    for name in DEFAULT_CATEGORIES {
        if repo.ensure(name).await? {
            tracing::info!(category = name, "Created category");
            created += 1;
        }
    }

    tracing::info!(
        created,
        existing = DEFAULT_CATEGORIES.len() - created,
        "Category seeding complete"
    );
    Ok(created)
}
