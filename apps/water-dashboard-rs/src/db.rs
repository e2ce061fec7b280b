use anyhow::{bail, Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn connect_lazy(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(8))
        .connect_lazy(database_url)
        .context("Failed to create lazy database pool")
}

/// `.sql` files under `dir`, in lexical order.
pub fn collect_migrations(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        bail!("Migrations directory missing at {}", dir.display());
    }
    let mut migrations: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read migrations directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|v| v.to_str()) == Some("sql"))
        .collect();
    migrations.sort();
    Ok(migrations)
}

/// Runs every migration in its own transaction. Scripts are written to be re-runnable.
pub async fn apply_migrations(pool: &PgPool, dir: &Path) -> Result<()> {
    for migration in collect_migrations(dir)? {
        let sql = fs::read_to_string(&migration)
            .with_context(|| format!("Failed to read migration {}", migration.display()))?;
        if sql.trim().is_empty() {
            continue;
        }

        let mut tx = pool
            .begin()
            .await
            .with_context(|| format!("Failed to start transaction for {}", migration.display()))?;
        sqlx::raw_sql(&sql)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Migration failed: {}", migration.display()))?;
        tx.commit().await.with_context(|| {
            format!(
                "Failed to commit migration transaction for {}",
                migration.display()
            )
        })?;
        tracing::info!(migration = %migration.display(), "applied migration");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_sql_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["0002_more.sql", "0001_init.sql", "README.md", "0010_late.sql"] {
            fs::write(dir.path().join(name), "select 1;").unwrap();
        }

        let names: Vec<String> = collect_migrations(dir.path())
            .unwrap()
            .iter()
            .filter_map(|path| path.file_name()?.to_str().map(str::to_string))
            .collect();
        assert_eq!(names, ["0001_init.sql", "0002_more.sql", "0010_late.sql"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_migrations(&dir.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("Migrations directory missing"));
    }

    #[test]
    fn bundled_migrations_are_present() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        let migrations = collect_migrations(&dir).unwrap();
        assert!(!migrations.is_empty());
    }
}
