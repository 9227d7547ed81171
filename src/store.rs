//! The local record cache.
//!
//! [`LocalStore`] is a handle to one SQLite file, opened once and passed to
//! every component that reads or writes records. Writes are insert-or-ignore
//! keyed on the unique `url` column, so repeated or concurrent inserts of the
//! same source never produce a second row and never fail.
//!
//! Ingredient and instruction lists are stored as JSON arrays and decoded
//! back into ordered `Vec<String>`s here; callers never see the JSON.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

use crate::db;
use crate::migrate;
use crate::models::{ParsedRecord, Record};

const SELECT_COLUMNS: &str =
    "SELECT id, title, url, ingredients, instructions, image_url, category, total_time FROM records";

#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl LocalStore {
    /// Open (creating if missing) the store at `path` and ensure its schema.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path)
            .await
            .with_context(|| format!("Failed to open store: {}", path.display()))?;
        let store = Self {
            pool,
            path: path.to_path_buf(),
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        migrate::ensure_schema(&self.pool).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Insert `record` unless its URL is already stored. Returns whether a
    /// row was actually written.
    pub async fn insert_if_absent(&self, record: &ParsedRecord) -> Result<bool> {
        let ingredients = serde_json::to_string(&record.ingredients)?;
        let instructions = serde_json::to_string(&record.instructions)?;

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO records
                (title, url, ingredients, instructions, image_url, category, total_time)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.title)
        .bind(&record.url)
        .bind(&ingredients)
        .bind(&instructions)
        .bind(&record.image_url)
        .bind(&record.category)
        .bind(&record.total_time)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Every whitespace-separated keyword must appear (case-insensitive
    /// substring) in at least one of title, ingredients, instructions, or
    /// category. Ordered by title.
    pub async fn search_by_keywords(&self, query: &str) -> Result<Vec<Record>> {
        let keywords: Vec<&str> = query.split_whitespace().collect();
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        // LIKE is case-insensitive for ASCII by default. List columns are
        // matched per decoded element, never against the JSON text.
        let clause = "(title LIKE ? ESCAPE '\\' \
                      OR EXISTS (SELECT 1 FROM json_each(records.ingredients) \
                                 WHERE json_each.value LIKE ? ESCAPE '\\') \
                      OR EXISTS (SELECT 1 FROM json_each(records.instructions) \
                                 WHERE json_each.value LIKE ? ESCAPE '\\') \
                      OR category LIKE ? ESCAPE '\\')";
        let where_sql = vec![clause; keywords.len()].join(" AND ");
        let sql = format!("{} WHERE {} ORDER BY title", SELECT_COLUMNS, where_sql);

        let mut q = sqlx::query(&sql);
        for kw in &keywords {
            let pattern = format!("%{}%", escape_like(kw));
            for _ in 0..4 {
                q = q.bind(pattern.clone());
            }
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    /// One uniformly chosen record, or `None` when the store is empty.
    pub async fn random_record(&self) -> Result<Option<Record>> {
        let sql = format!("{} ORDER BY RANDOM() LIMIT 1", SELECT_COLUMNS);
        let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_record).transpose()
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Records whose URL is in `urls`, ordered by title.
    pub async fn records_by_urls(&self, urls: &[String]) -> Result<Vec<Record>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; urls.len()].join(",");
        let sql = format!(
            "{} WHERE url IN ({}) ORDER BY title",
            SELECT_COLUMNS, placeholders
        );

        let mut q = sqlx::query(&sql);
        for url in urls {
            q = q.bind(url);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    pub async fn get(&self, id: i64) -> Result<Option<Record>> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    pub async fn all_records(&self) -> Result<Vec<Record>> {
        let sql = format!("{} ORDER BY title", SELECT_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    /// Count of records with each optional field populated.
    pub async fn field_coverage(&self) -> Result<FieldCoverage> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(NULLIF(category, '')) AS with_category,
                COUNT(NULLIF(image_url, '')) AS with_image,
                COUNT(NULLIF(total_time, '')) AS with_time
            FROM records
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(FieldCoverage {
            total: row.get("total"),
            with_category: row.get("with_category"),
            with_image: row.get("with_image"),
            with_time: row.get("with_time"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCoverage {
    pub total: i64,
    pub with_category: i64,
    pub with_image: i64,
    pub with_time: i64,
}

fn row_to_record(row: &SqliteRow) -> Result<Record> {
    let ingredients: String = row.get("ingredients");
    let instructions: String = row.get("instructions");
    let url: String = row.get("url");

    Ok(Record {
        id: row.get("id"),
        title: row.get("title"),
        ingredients: decode_list(&ingredients)
            .with_context(|| format!("corrupt ingredients for {}", url))?,
        instructions: decode_list(&instructions)
            .with_context(|| format!("corrupt instructions for {}", url))?,
        url,
        image_url: row.get("image_url"),
        category: row.get("category"),
        total_time: row.get("total_time"),
    })
}

fn decode_list(raw: &str) -> Result<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

/// Escape `LIKE` wildcards so keywords match literally.
fn escape_like(keyword: &str) -> String {
    let mut out = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
