use anyhow::{Context, Result};
use sqlx::{Executor, PgPool};
use std::{fs, path::Path};

use crate::config::AppConfig;

pub mod reports;

fn load_all_schemas(schema_dirs: &[&str]) -> Result<String> {
    let mut combined_sql = String::new();

    for dir in schema_dirs {
        let schema_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(dir).join("schema.sql");
        let sql = fs::read_to_string(&schema_path)
            .with_context(|| format!("Failed to read schema file: {:?}", schema_path))?;
        combined_sql.push_str(&sql);
        combined_sql.push('\n');
    }

    Ok(combined_sql)
}

async fn check_tables_exist(pool: &PgPool, tables: &[&str]) -> Result<bool> {
    for &table in tables {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )",
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists.0 {
            log::warn!("Table '{}' does NOT exist.", table);
            return Ok(false);
        }
    }
    Ok(true)
}

pub async fn setup_backend(config: &AppConfig) -> Result<PgPool> {
    let pool = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    if !config.ensure_schema {
        log::info!("Schema check disabled, using the database as is.");
        return Ok(pool);
    }

    let schema_dirs = ["src/databases/reports"];
    let combined_schema_sql = load_all_schemas(&schema_dirs)?;

    let required_tables = [
        "products",
        "product_categories",
        "customers",
        "coupons",
        "countries",
        "tax_rates",
        "order_stats",
        "order_product_lookup",
        "order_coupon_lookup",
        "download_log",
    ];

    let tables_exist = check_tables_exist(&pool, &required_tables).await?;

    if !tables_exist {
        log::info!("Some tables missing. Running schema SQL to create tables...");
        pool.execute(combined_schema_sql.as_str())
            .await
            .context("Failed to execute schema SQL")?;
        log::info!("Schema SQL executed successfully.");
    } else {
        log::info!("All required tables exist.");
    }

    Ok(pool)
}
