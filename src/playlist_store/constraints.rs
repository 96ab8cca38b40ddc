//! Relaxed-constraint write window.
//!
//! Opening a [`LoadWindow`] switches foreign-key enforcement off, begins the
//! write transaction and drops the secondary indices. [`LoadWindow::restore_constraints`]
//! rebuilds the indices and verifies every foreign key, [`LoadWindow::commit`]
//! commits and switches enforcement back on.
//!
//! Dropping the window on any other path rolls the transaction back (which also
//! brings the dropped indices back) and re-enables foreign keys.

use crate::sqlite_persistence::Table;
use anyhow::{bail, Result};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Dangling references found when constraints were restored.
#[derive(Debug, Error)]
#[error(
    "{count} foreign key violation(s), first one in table {table} (rowid {rowid:?}) referencing {parent}"
)]
pub struct ForeignKeyViolations {
    pub count: usize,
    pub table: String,
    pub rowid: Option<i64>,
    pub parent: String,
}

pub struct LoadWindow<'c> {
    conn: &'c Connection,
    tables: &'static [Table],
    tx: Option<Transaction<'c>>,
    indices_restored: bool,
    foreign_keys_restored: bool,
}

impl<'c> LoadWindow<'c> {
    pub fn open(conn: &'c Connection, tables: &'static [Table]) -> Result<Self> {
        if !conn.is_autocommit() {
            bail!("Cannot relax constraints while a transaction is open");
        }

        // Has no effect inside a transaction, so it goes first.
        conn.pragma_update(None, "foreign_keys", false)?;
        let mut window = LoadWindow {
            conn,
            tables,
            tx: None,
            indices_restored: false,
            foreign_keys_restored: false,
        };

        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        for table in tables {
            table.drop_indices(&tx)?;
        }
        window.tx = Some(tx);

        info!(
            "Constraints relaxed: foreign keys off, indices of {} tables dropped",
            tables.len()
        );
        Ok(window)
    }

    /// Connection to issue writes on. Everything runs inside the window's transaction.
    pub fn connection(&self) -> &Connection {
        self.tx.as_deref().unwrap_or(self.conn)
    }

    /// Rebuild the dropped indices and check every foreign key.
    pub fn restore_constraints(&mut self) -> Result<()> {
        let Some(tx) = self.tx.as_ref() else {
            bail!("Load window is already closed");
        };

        for table in self.tables {
            table.create_indices(tx)?;
        }
        self.indices_restored = true;
        debug!("Indices rebuilt");

        check_foreign_keys(tx)?;
        info!("Constraints restored, no dangling references");
        Ok(())
    }

    /// Commit the transaction and switch foreign-key enforcement back on.
    pub fn commit(mut self) -> Result<()> {
        if !self.indices_restored {
            self.restore_constraints()?;
        }
        let Some(tx) = self.tx.take() else {
            bail!("Load window is already closed");
        };
        tx.commit()?;
        self.conn.pragma_update(None, "foreign_keys", true)?;
        self.foreign_keys_restored = true;
        Ok(())
    }
}

impl Drop for LoadWindow<'_> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            warn!("Load window closed without commit, rolling back");
            if let Err(e) = tx.rollback() {
                error!("Failed to roll back load transaction: {}", e);
            }
        }
        if !self.foreign_keys_restored {
            if let Err(e) = self.conn.pragma_update(None, "foreign_keys", true) {
                error!("Failed to re-enable foreign keys: {}", e);
            }
        }
    }
}

fn check_foreign_keys(conn: &Connection) -> Result<()> {
    // PRAGMA foreign_key_check returns: table, rowid, parent, fkid
    let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
    let violations: Vec<(String, Option<i64>, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    if let Some((table, rowid, parent)) = violations.first() {
        return Err(ForeignKeyViolations {
            count: violations.len(),
            table: table.clone(),
            rowid: *rowid,
            parent: parent.clone(),
        }
        .into());
    }
    Ok(())
}
