use anyhow::{bail, Result};
use rusqlite::{params, Connection, OptionalExtension};

pub const BASE_DB_VERSION: usize = 99999;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
        }
    }
}

#[allow(unused)]
pub enum ForeignKeyOnChange {
    NoAction,
    Cascade,
}

impl ForeignKeyOnChange {
    fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyOnChange::NoAction => "NO ACTION",
            ForeignKeyOnChange::Cascade => "CASCADE",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    pub on_delete: ForeignKeyOnChange,
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub foreign_key: Option<&'static ForeignKey>,
}

impl Column {
    fn definition(&self, inline_primary_key: bool) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type.as_sql());
        if self.is_primary_key && inline_primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.non_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(fk) = self.foreign_key {
            sql.push_str(&format!(
                " REFERENCES {}({}) ON DELETE {}",
                fk.foreign_table,
                fk.foreign_column,
                fk.on_delete.as_sql()
            ));
        }
        sql
    }
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    /// Secondary indices as `(index name, column)`.
    pub indices: &'static [(&'static str, &'static str)],
}

impl Table {
    /// Names of the columns flagged as primary key, in declaration order.
    pub fn primary_key(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name)
            .collect()
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Creates the table and its indices unless they already exist.
    ///
    /// A single key column is declared inline. Several flagged columns become
    /// a composite `PRIMARY KEY (...)` clause.
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let primary_key = self.primary_key();
        let inline_key = primary_key.len() == 1;

        let mut definitions: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.definition(inline_key))
            .collect();
        if !inline_key && !primary_key.is_empty() {
            definitions.push(format!("PRIMARY KEY ({})", primary_key.join(", ")));
        }

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} ({});",
                self.name,
                definitions.join(", ")
            ),
            params![],
        )?;
        self.create_indices(conn)
    }

    pub fn create_indices(&self, conn: &Connection) -> Result<()> {
        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    /// Drops the secondary indices. The primary key index stays.
    pub fn drop_indices(&self, conn: &Connection) -> Result<()> {
        for (index_name, _) in self.indices {
            conn.execute(&format!("DROP INDEX IF EXISTS {};", index_name), params![])?;
        }
        Ok(())
    }

    fn validate_columns(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let live: Vec<LiveColumn> = stmt
            .query_map(params![], |row| {
                Ok(LiveColumn {
                    name: row.get(1)?,
                    sql_type: row.get(2)?,
                    non_null: row.get::<_, i32>(3)? == 1,
                    // 1-based position inside the primary key, 0 otherwise
                    is_primary_key: row.get::<_, i32>(5)? > 0,
                })
            })?
            .collect::<Result<_, _>>()?;

        if live.is_empty() {
            bail!("Table {} does not exist", self.name);
        }
        if live.len() != self.columns.len() {
            bail!(
                "Table {} has columns [{}], expected [{}]",
                self.name,
                live.iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                self.column_names().join(", ")
            );
        }

        for (actual, expected) in live.iter().zip(self.columns) {
            if actual.name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    actual.name
                );
            }
            if actual.sql_type != expected.sql_type.as_sql() {
                bail!(
                    "Table {} column {} type mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.sql_type.as_sql(),
                    actual.sql_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} column {} non-null mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.non_null,
                    actual.non_null
                );
            }
            if actual.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} primary key mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.is_primary_key,
                    actual.is_primary_key
                );
            }
        }
        Ok(())
    }

    fn validate_indices(&self, conn: &Connection) -> Result<()> {
        for (index_name, _) in self.indices {
            let found = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !found {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }
        Ok(())
    }

    fn validate_foreign_keys(&self, conn: &Connection) -> Result<()> {
        // columns: id, seq, table, from, to, on_update, on_delete, match
        let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_list({})", self.name))?;
        let live: Vec<LiveForeignKey> = stmt
            .query_map([], |row| {
                Ok(LiveForeignKey {
                    to_table: row.get(2)?,
                    from_column: row.get(3)?,
                    to_column: row.get(4)?,
                    on_delete: row.get(6)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        for column in self.columns {
            let Some(expected) = column.foreign_key else {
                continue;
            };
            let expected_sql = format!(
                "REFERENCES {}({}) ON DELETE {}",
                expected.foreign_table,
                expected.foreign_column,
                expected.on_delete.as_sql()
            );
            match live.iter().find(|fk| fk.from_column == column.name) {
                None => bail!(
                    "Table {} column {} is missing foreign key: expected {}",
                    self.name,
                    column.name,
                    expected_sql
                ),
                Some(actual) if actual.describe() != expected_sql => bail!(
                    "Table {} column {} has foreign key mismatch: expected {}, got {}",
                    self.name,
                    column.name,
                    expected_sql,
                    actual.describe()
                ),
                Some(_) => {}
            }
        }
        Ok(())
    }
}

struct LiveColumn {
    name: String,
    sql_type: String,
    non_null: bool,
    is_primary_key: bool,
}

struct LiveForeignKey {
    from_column: String,
    to_table: String,
    to_column: String,
    on_delete: String,
}

impl LiveForeignKey {
    fn describe(&self) -> String {
        format!(
            "REFERENCES {}({}) ON DELETE {}",
            self.to_table, self.to_column, self.on_delete
        )
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
}

impl VersionedSchema {
    /// Creates whatever is missing and stamps `user_version`.
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "foreign_keys", true)?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.pragma_update(None, "user_version", BASE_DB_VERSION + self.version)?;
        Ok(())
    }

    /// Compares the live database with the declared tables: columns, primary
    /// keys, secondary indices and foreign keys.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate_columns(conn)?;
            table.validate_indices(conn)?;
            table.validate_foreign_keys(conn)?;
        }
        Ok(())
    }
}
