//! Record mapper: one entity kind to one table
//!
//! Every statement binds values as parameters. Identifiers come only from the
//! validated mapping and are double-quoted.

use crate::errors::{from_rusqlite, Result};
use crate::migrations::{quote_identifier as quote, LEDGER_TABLE};
use crate::repo::sql_value::{from_sql, to_sql};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{HashSet, VecDeque};
use strata_core::errors::StrataError;
use strata_core::model::{Attributes, Entity};
use strata_core::rules::validation::{validate_definition, IDENTITY_COLUMN};

/// Rows fetched per round trip by [`AllRecords`]
const PAGE_SIZE: i64 = 64;

/// Mapping of one table's columns onto entity attributes
///
/// The `id` column is implicit: it is the store-assigned identity, never an
/// attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMapper {
    table: String,
    columns: Vec<String>,
}

impl RecordMapper {
    /// Define a mapping for `table` with the given attribute columns
    ///
    /// Use [`MapperRegistry::define`](crate::repo::MapperRegistry::define) to
    /// guard against conflicting redefinitions.
    ///
    /// # Errors
    /// `InvalidIdentifier` or `ConfigurationConflict` for a malformed definition.
    pub fn define<S: AsRef<str>>(table: &str, columns: &[S]) -> Result<Self> {
        let columns = validate_definition(table, columns)?;
        if table.eq_ignore_ascii_case(LEDGER_TABLE) {
            return Err(StrataError::ConfigurationConflict {
                table: table.to_string(),
                reason: "the migration ledger table cannot be mapped".to_string(),
            }
            .into());
        }
        Ok(Self {
            table: table.to_string(),
            columns,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Declared attribute columns, in declaration order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All column names, identity first
    pub fn column_names(&self) -> Vec<String> {
        std::iter::once(IDENTITY_COLUMN.to_string())
            .chain(self.columns.iter().cloned())
            .collect()
    }

    /// Same table and the same column set, in any order
    pub fn same_definition(&self, other: &RecordMapper) -> bool {
        let mine: HashSet<&str> = self.columns.iter().map(String::as_str).collect();
        let theirs: HashSet<&str> = other.columns.iter().map(String::as_str).collect();
        self.table == other.table && mine == theirs
    }

    /// Insert a transient entity and assign it the store-generated identity
    ///
    /// Only the attributes present on the entity are written; other columns
    /// take their defaults.
    ///
    /// # Errors
    /// - `AlreadyPersisted` if the entity already has an identity
    /// - `UnknownAttribute` if the entity carries an undeclared attribute
    pub fn insert(&self, conn: &Connection, entity: &mut Entity) -> Result<i64> {
        if let Some(identity) = entity.identity() {
            return Err(StrataError::AlreadyPersisted {
                table: self.table.clone(),
                identity,
            }
            .into());
        }
        self.check_attributes(entity.attributes().keys(), false)?;

        let attributes = entity.attributes();
        let sql = if attributes.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote(&self.table))
        } else {
            let columns: Vec<String> = attributes.keys().map(|c| quote(c)).collect();
            let placeholders: Vec<String> =
                (1..=attributes.len()).map(|i| format!("?{}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(&self.table),
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        conn.execute(&sql, params_from_iter(attributes.values().map(to_sql)))
            .map_err(from_rusqlite)?;
        let identity = conn.last_insert_rowid();
        entity.mark_persisted(identity);

        tracing::debug!(table = %self.table, identity, "inserted row");
        Ok(identity)
    }

    /// Insert a transient entity, or update the row of a persisted one
    ///
    /// Returns the entity's identity.
    ///
    /// # Errors
    /// - `NotFound` if the entity has an identity but no row matches it
    /// - `UnknownAttribute` if the entity carries an undeclared attribute
    pub fn save(&self, conn: &Connection, entity: &mut Entity) -> Result<i64> {
        let Some(identity) = entity.identity() else {
            return self.insert(conn, entity);
        };
        self.check_attributes(entity.attributes().keys(), false)?;

        let attributes = entity.attributes();
        let matched = if attributes.is_empty() {
            self.exists(conn, identity)?
        } else {
            let assignments: Vec<String> = attributes
                .keys()
                .enumerate()
                .map(|(i, c)| format!("{} = ?{}", quote(c), i + 1))
                .collect();
            let sql = format!(
                "UPDATE {} SET {} WHERE {} = ?{}",
                quote(&self.table),
                assignments.join(", "),
                quote(IDENTITY_COLUMN),
                attributes.len() + 1
            );
            let params = attributes
                .values()
                .map(to_sql)
                .chain(std::iter::once(rusqlite::types::Value::Integer(identity)));
            let changed = conn
                .execute(&sql, params_from_iter(params))
                .map_err(from_rusqlite)?;
            changed > 0
        };

        if !matched {
            return Err(self.not_found(Some(identity)).with_op("save"));
        }

        tracing::debug!(table = %self.table, identity, "updated row");
        Ok(identity)
    }

    /// Load the row with the given identity, if any
    pub fn find_by_identity(&self, conn: &Connection, identity: i64) -> Result<Option<Entity>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            self.select_list(),
            quote(&self.table),
            quote(IDENTITY_COLUMN)
        );
        conn.query_row(&sql, [identity], |row| self.hydrate(row))
            .optional()
            .map_err(from_rusqlite)
    }

    /// First row (lowest identity) matching every criterion exactly
    ///
    /// A `Null` criterion matches SQL NULL. Criteria may name declared columns
    /// or `id`; empty criteria match the first row.
    ///
    /// # Errors
    /// `UnknownAttribute` for a criterion on an undeclared column.
    pub fn find_by(&self, conn: &Connection, criteria: &Attributes) -> Result<Option<Entity>> {
        self.check_attributes(criteria.keys(), true)?;

        let mut clauses = Vec::with_capacity(criteria.len());
        let mut params = Vec::with_capacity(criteria.len());
        for (column, value) in criteria {
            if value.is_null() {
                clauses.push(format!("{} IS NULL", quote(column)));
            } else {
                params.push(to_sql(value));
                clauses.push(format!("{} = ?{}", quote(column), params.len()));
            }
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} ASC LIMIT 1",
            self.select_list(),
            quote(&self.table),
            where_clause,
            quote(IDENTITY_COLUMN)
        );
        conn.query_row(&sql, params_from_iter(params), |row| self.hydrate(row))
            .optional()
            .map_err(from_rusqlite)
    }

    /// Lazily iterate every row in ascending identity order
    ///
    /// Rows are fetched in pages as the iterator advances. Call again to start over.
    pub fn all<'c>(&'c self, conn: &'c Connection) -> AllRecords<'c> {
        AllRecords {
            mapper: self,
            conn,
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Delete the entity's row and clear its identity
    ///
    /// # Errors
    /// `NotFound` if the entity was never persisted or its row is already gone.
    pub fn delete(&self, conn: &Connection, entity: &mut Entity) -> Result<()> {
        let Some(identity) = entity.identity() else {
            return Err(self.not_found(None).with_op("delete"));
        };

        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            quote(&self.table),
            quote(IDENTITY_COLUMN)
        );
        let removed = conn.execute(&sql, [identity]).map_err(from_rusqlite)?;
        if removed == 0 {
            return Err(self.not_found(Some(identity)).with_op("delete"));
        }

        entity.mark_transient();
        tracing::debug!(table = %self.table, identity, "deleted row");
        Ok(())
    }

    /// Build and insert an entity in one call
    pub fn create(&self, conn: &Connection, attributes: Attributes) -> Result<Entity> {
        let mut entity = Entity::from_attributes(attributes);
        self.insert(conn, &mut entity)?;
        Ok(entity)
    }

    /// Return the first row matching `criteria`, creating it from `criteria` if none does
    ///
    /// # Errors
    /// `UnknownAttribute` if `criteria` names `id` or an undeclared column.
    pub fn find_or_create_by(&self, conn: &Connection, criteria: &Attributes) -> Result<Entity> {
        self.check_attributes(criteria.keys(), false)?;
        match self.find_by(conn, criteria)? {
            Some(found) => Ok(found),
            None => self.create(conn, criteria.clone()),
        }
    }

    pub fn count(&self, conn: &Connection) -> Result<i64> {
        conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote(&self.table)),
            [],
            |row| row.get(0),
        )
        .map_err(from_rusqlite)
    }

    /// Check that the live table has the identity column and every declared column
    ///
    /// # Errors
    /// `ConfigurationConflict` naming the table and the missing columns.
    pub fn verify_schema(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn
            .prepare("SELECT name FROM pragma_table_info(?1)")
            .map_err(from_rusqlite)?;
        let live: HashSet<String> = stmt
            .query_map([&self.table], |row| row.get::<_, String>(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<_, _>>()
            .map_err(from_rusqlite)?;

        if live.is_empty() {
            return Err(StrataError::ConfigurationConflict {
                table: self.table.clone(),
                reason: "table does not exist".to_string(),
            }
            .into());
        }

        let missing: Vec<String> = self
            .column_names()
            .into_iter()
            .filter(|c| !live.contains(c))
            .collect();
        if !missing.is_empty() {
            return Err(StrataError::ConfigurationConflict {
                table: self.table.clone(),
                reason: format!("columns missing from table: {}", missing.join(", ")),
            }
            .into());
        }

        Ok(())
    }

    fn check_attributes<'a, I>(&self, names: I, allow_identity: bool) -> Result<()>
    where
        I: IntoIterator<Item = &'a String>,
    {
        for name in names {
            let known = self.columns.iter().any(|c| c == name)
                || (allow_identity && name == IDENTITY_COLUMN);
            if !known {
                return Err(StrataError::UnknownAttribute {
                    table: self.table.clone(),
                    attribute: name.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn exists(&self, conn: &Connection, identity: i64) -> Result<bool> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} = ?1",
            quote(&self.table),
            quote(IDENTITY_COLUMN)
        );
        let found = conn
            .query_row(&sql, [identity], |_| Ok(()))
            .optional()
            .map_err(from_rusqlite)?;
        Ok(found.is_some())
    }

    fn select_list(&self) -> String {
        self.column_names()
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn hydrate(&self, row: &Row<'_>) -> rusqlite::Result<Entity> {
        let identity: i64 = row.get(0)?;
        let mut attributes = Attributes::new();
        for (i, column) in self.columns.iter().enumerate() {
            attributes.insert(column.clone(), from_sql(row.get_ref(i + 1)?));
        }
        Ok(Entity::hydrated(identity, attributes))
    }

    fn not_found(&self, identity: Option<i64>) -> strata_core::ExError {
        StrataError::NotFound {
            table: self.table.clone(),
            identity,
        }
        .into()
    }

    fn page_after(&self, conn: &Connection, after: Option<i64>) -> Result<Vec<Entity>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} > ?1 ORDER BY {} ASC LIMIT ?2",
            self.select_list(),
            quote(&self.table),
            quote(IDENTITY_COLUMN),
            quote(IDENTITY_COLUMN)
        );
        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(
                rusqlite::params![after.unwrap_or(i64::MIN), PAGE_SIZE],
                |row| self.hydrate(row),
            )
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }
}

/// Lazy, finite iterator over every row of a mapped table
///
/// Uses keyset pagination on the identity, so rows inserted behind the cursor
/// are skipped and rows deleted ahead of it are never yielded. After an error
/// the iterator is fused.
pub struct AllRecords<'c> {
    mapper: &'c RecordMapper,
    conn: &'c Connection,
    after: Option<i64>,
    buffer: VecDeque<Entity>,
    exhausted: bool,
}

impl Iterator for AllRecords<'_> {
    type Item = Result<Entity>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            match self.mapper.page_after(self.conn, self.after) {
                Ok(page) => {
                    if (page.len() as i64) < PAGE_SIZE {
                        self.exhausted = true;
                    }
                    self.after = page.last().and_then(Entity::identity).or(self.after);
                    self.buffer.extend(page);
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
