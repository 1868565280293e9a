use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};

use apcd_schema::row::Row;

/// SQLite-backed claims store. Input relations are read in bounded chunks
/// by rowid paging; output relations are created all-TEXT and written one
/// transaction per chunk, so a cancelled run leaves whole chunks only.
pub struct ClaimsDb {
    conn: Connection,
}

impl ClaimsDb {
    /// Open (or create) a claims database at the given path.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open claims db at {:?}", db_path))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory().context("Failed to open in-memory db")?,
        })
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    /// Column names of a table, in declaration order.
    pub fn columns(&self, table: &str) -> Result<Vec<String>> {
        let sql = format!("PRAGMA table_info({})", quote_ident(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let names = stmt
            .query_map([], |r| r.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read schema of {table}"))?;
        Ok(names)
    }

    pub fn row_count(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let count: i64 = self.conn.query_row(&sql, [], |r| r.get(0))?;
        Ok(count as u64)
    }

    /// Stream a table through `handle_chunk` in rowid order, `chunk_size`
    /// rows at a time. Values of any SQLite type are carried as text, the
    /// way the TEXT-typed output schema will store them. Returns the total
    /// number of rows read.
    pub fn for_each_chunk<F>(&self, table: &str, chunk_size: usize, mut handle_chunk: F) -> Result<u64>
    where
        F: FnMut(Vec<Row>) -> Result<()>,
    {
        let columns = self.columns(table)?;
        if columns.is_empty() {
            bail!("Input table '{table}' does not exist or has no columns");
        }

        let select = format!(
            "SELECT rowid, {} FROM {} WHERE rowid > ?1 ORDER BY rowid LIMIT ?2",
            columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", "),
            quote_ident(table),
        );
        let mut stmt = self.conn.prepare(&select)?;

        let mut last_rowid = 0i64;
        let mut total = 0u64;
        loop {
            let mut chunk = Vec::with_capacity(chunk_size);
            {
                let mut rows = stmt.query(params![last_rowid, chunk_size as i64])?;
                while let Some(r) = rows.next()? {
                    last_rowid = r.get(0)?;
                    let mut row = Row::with_capacity(columns.len());
                    for (i, col) in columns.iter().enumerate() {
                        row.insert(col.clone(), text_of(r.get_ref(i + 1)?));
                    }
                    chunk.push(row);
                }
            }
            if chunk.is_empty() {
                break;
            }
            let fetched = chunk.len();
            total += fetched as u64;
            handle_chunk(chunk)?;
            if fetched < chunk_size {
                break;
            }
        }
        Ok(total)
    }

    /// Create an output table with every column typed TEXT, replacing any
    /// previous run's table.
    pub fn create_output_table(&self, table: &str, columns: &[String]) -> Result<()> {
        let decls = columns
            .iter()
            .map(|c| format!("{} TEXT", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");
        self.conn
            .execute_batch(&format!(
                "DROP TABLE IF EXISTS {table_q}; CREATE TABLE {table_q} ({decls});",
                table_q = quote_ident(table),
            ))
            .with_context(|| format!("Failed to create output table {table}"))?;
        Ok(())
    }

    /// Insert a chunk inside a single transaction. Columns absent from a
    /// row are written as NULL.
    pub fn insert_rows(&mut self, table: &str, columns: &[String], rows: &[Row]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let placeholders = (1..=columns.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(table),
                columns
                    .iter()
                    .map(|c| quote_ident(c))
                    .collect::<Vec<_>>()
                    .join(", "),
                placeholders,
            );
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                let values: Vec<Option<&str>> = columns
                    .iter()
                    .map(|c| row.get(c).and_then(|v| v.as_deref()))
                    .collect();
                stmt.execute(rusqlite::params_from_iter(values))
                    .with_context(|| format!("Insert into {table} failed"))?;
            }
        }
        tx.commit()
            .with_context(|| format!("Failed to commit chunk into {table}"))?;
        Ok(())
    }

    /// Non-null values in a column.
    pub fn count_nonnull(&self, table: &str, column: &str) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT({}) FROM {}",
            quote_ident(column),
            quote_ident(table)
        );
        let count: i64 = self.conn.query_row(&sql, [], |r| r.get(0))?;
        Ok(count as u64)
    }

    /// Distinct non-null values in a column.
    pub fn count_distinct(&self, table: &str, column: &str) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(DISTINCT {}) FROM {}",
            quote_ident(column),
            quote_ident(table)
        );
        let count: i64 = self.conn.query_row(&sql, [], |r| r.get(0))?;
        Ok(count as u64)
    }

    /// Distinct values a column shares with another table's column.
    pub fn count_shared(
        &self,
        table_a: &str,
        column_a: &str,
        table_b: &str,
        column_b: &str,
    ) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM (\
             SELECT DISTINCT {ca} AS v FROM {ta} WHERE {ca} IS NOT NULL \
             INTERSECT \
             SELECT DISTINCT {cb} FROM {tb} WHERE {cb} IS NOT NULL)",
            ca = quote_ident(column_a),
            ta = quote_ident(table_a),
            cb = quote_ident(column_b),
            tb = quote_ident(table_b),
        );
        let count: i64 = self.conn.query_row(&sql, [], |r| r.get(0))?;
        Ok(count as u64)
    }

    /// Distinct non-null values across several columns of one table.
    pub fn count_distinct_union(&self, table: &str, columns: &[String]) -> Result<u64> {
        if columns.is_empty() {
            return Ok(0);
        }
        let union = columns
            .iter()
            .map(|c| {
                format!(
                    "SELECT {c} AS v FROM {t} WHERE {c} IS NOT NULL",
                    c = quote_ident(c),
                    t = quote_ident(table)
                )
            })
            .collect::<Vec<_>>()
            .join(" UNION ");
        let sql = format!("SELECT COUNT(*) FROM ({union})");
        let count: i64 = self.conn.query_row(&sql, [], |r| r.get(0))?;
        Ok(count as u64)
    }

    /// Distinct values of one column also present in any of several
    /// columns of another table.
    pub fn count_shared_with_union(
        &self,
        table_a: &str,
        column_a: &str,
        table_b: &str,
        columns_b: &[String],
    ) -> Result<u64> {
        if columns_b.is_empty() {
            return Ok(0);
        }
        let union = columns_b
            .iter()
            .map(|c| {
                format!(
                    "SELECT {c} AS v FROM {t} WHERE {c} IS NOT NULL",
                    c = quote_ident(c),
                    t = quote_ident(table_b)
                )
            })
            .collect::<Vec<_>>()
            .join(" UNION ");
        let sql = format!(
            "SELECT COUNT(*) FROM (\
             SELECT DISTINCT {ca} AS v FROM {ta} WHERE {ca} IS NOT NULL \
             INTERSECT {union})",
            ca = quote_ident(column_a),
            ta = quote_ident(table_a),
        );
        let count: i64 = self.conn.query_row(&sql, [], |r| r.get(0))?;
        Ok(count as u64)
    }

    /// Test seam: run raw DDL/DML to stage fixture tables.
    #[cfg(test)]
    pub fn execute_batch_for_tests(&self, sql: &str) {
        self.conn.execute_batch(sql).unwrap();
    }

    /// Rows where the column matches the given value.
    pub fn count_equal(&self, table: &str, column: &str, value: &str) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?1",
            quote_ident(table),
            quote_ident(column)
        );
        let count: i64 = self.conn.query_row(&sql, params![value], |r| r.get(0))?;
        Ok(count as u64)
    }
}

fn text_of(value: ValueRef) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Some(hex::encode(b)),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
