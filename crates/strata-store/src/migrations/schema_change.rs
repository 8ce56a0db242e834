//! Declarative schema changes
//!
//! A `SchemaChange` renders to one DDL statement. Identifiers are validated
//! and double-quoted; DDL never carries row values.

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use strata_core::rules::validation::{validate_identifier, IDENTITY_COLUMN};

/// Column storage type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    #[serde(alias = "string")]
    Text,
    #[serde(alias = "float")]
    Real,
    Blob,
    Boolean,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Boolean => "INTEGER",
            ColumnType::Text => "TEXT",
            ColumnType::Real => "REAL",
            ColumnType::Blob => "BLOB",
        }
    }
}

/// One column in a `create_table` or `add_column` change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub not_null: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            not_null: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    fn to_sql(&self) -> Result<String> {
        validate_identifier(&self.name)?;
        let mut sql = format!("{} {}", quote(&self.name), self.column_type.sql_type());
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        Ok(sql)
    }
}

/// A single declarative schema change
///
/// Serialized externally tagged, so a manifest entry reads
/// `- add_column: { table: artists, column: { name: favorite_food, type: string } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaChange {
    /// Create a table; an `id INTEGER PRIMARY KEY AUTOINCREMENT` column is always added
    CreateTable {
        table: String,
        #[serde(default)]
        columns: Vec<ColumnDef>,
    },
    DropTable {
        table: String,
    },
    AddColumn {
        table: String,
        column: ColumnDef,
    },
    /// Remove a column; only reversible when `column_type` is known
    RemoveColumn {
        table: String,
        column: String,
        #[serde(default, rename = "type")]
        column_type: Option<ColumnType>,
    },
    RenameTable {
        from: String,
        to: String,
    },
    RenameColumn {
        table: String,
        from: String,
        to: String,
    },
}

impl SchemaChange {
    /// Render the change as a single DDL statement
    ///
    /// # Errors
    /// `InvalidIdentifier` if any table or column name is malformed.
    pub fn to_sql(&self) -> Result<String> {
        let sql = match self {
            SchemaChange::CreateTable { table, columns } => {
                validate_identifier(table)?;
                let mut defs = vec![format!(
                    "{} INTEGER PRIMARY KEY AUTOINCREMENT",
                    quote(IDENTITY_COLUMN)
                )];
                for column in columns {
                    defs.push(column.to_sql()?);
                }
                format!("CREATE TABLE {} ({})", quote(table), defs.join(", "))
            }
            SchemaChange::DropTable { table } => {
                validate_identifier(table)?;
                format!("DROP TABLE {}", quote(table))
            }
            SchemaChange::AddColumn { table, column } => {
                validate_identifier(table)?;
                format!("ALTER TABLE {} ADD COLUMN {}", quote(table), column.to_sql()?)
            }
            SchemaChange::RemoveColumn { table, column, .. } => {
                validate_identifier(table)?;
                validate_identifier(column)?;
                format!("ALTER TABLE {} DROP COLUMN {}", quote(table), quote(column))
            }
            SchemaChange::RenameTable { from, to } => {
                validate_identifier(from)?;
                validate_identifier(to)?;
                format!("ALTER TABLE {} RENAME TO {}", quote(from), quote(to))
            }
            SchemaChange::RenameColumn { table, from, to } => {
                validate_identifier(table)?;
                validate_identifier(from)?;
                validate_identifier(to)?;
                format!(
                    "ALTER TABLE {} RENAME COLUMN {} TO {}",
                    quote(table),
                    quote(from),
                    quote(to)
                )
            }
        };
        Ok(sql)
    }

    /// The change that undoes this one, if it can be derived
    ///
    /// `drop_table` carries no column list and `remove_column` without a type
    /// cannot be reconstructed, so both return `None`.
    pub fn inverse(&self) -> Option<SchemaChange> {
        match self {
            SchemaChange::CreateTable { table, .. } => Some(SchemaChange::DropTable {
                table: table.clone(),
            }),
            SchemaChange::DropTable { .. } => None,
            SchemaChange::AddColumn { table, column } => Some(SchemaChange::RemoveColumn {
                table: table.clone(),
                column: column.name.clone(),
                column_type: Some(column.column_type),
            }),
            SchemaChange::RemoveColumn {
                table,
                column,
                column_type,
            } => column_type.map(|column_type| SchemaChange::AddColumn {
                table: table.clone(),
                column: ColumnDef::new(column.clone(), column_type),
            }),
            SchemaChange::RenameTable { from, to } => Some(SchemaChange::RenameTable {
                from: to.clone(),
                to: from.clone(),
            }),
            SchemaChange::RenameColumn { table, from, to } => Some(SchemaChange::RenameColumn {
                table: table.clone(),
                from: to.clone(),
                to: from.clone(),
            }),
        }
    }
}

/// Derive the reverse of a change list: each inverse, in reverse order
pub(crate) fn invert_all(changes: &[SchemaChange]) -> Option<Vec<SchemaChange>> {
    changes.iter().rev().map(SchemaChange::inverse).collect()
}

pub(crate) fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_artists() -> SchemaChange {
        SchemaChange::CreateTable {
            table: "artists".to_string(),
            columns: vec![
                ColumnDef::new("name", ColumnType::Text),
                ColumnDef::new("genre", ColumnType::Text),
                ColumnDef::new("age", ColumnType::Integer),
                ColumnDef::new("hometown", ColumnType::Text),
            ],
        }
    }

    #[test]
    fn test_create_table_adds_identity_column() {
        let sql = create_artists().to_sql().unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"artists\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"name\" TEXT, \"genre\" TEXT, \"age\" INTEGER, \"hometown\" TEXT)"
        );
    }

    #[test]
    fn test_add_column_inverts_to_typed_remove() {
        let add = SchemaChange::AddColumn {
            table: "artists".to_string(),
            column: ColumnDef::new("favorite_food", ColumnType::Text),
        };
        let inverse = add.inverse().unwrap();
        assert_eq!(
            inverse.to_sql().unwrap(),
            "ALTER TABLE \"artists\" DROP COLUMN \"favorite_food\""
        );
        assert_eq!(inverse.inverse(), Some(add));
    }

    #[test]
    fn test_drop_table_is_irreversible() {
        let drop = SchemaChange::DropTable {
            table: "artists".to_string(),
        };
        assert_eq!(drop.inverse(), None);
        assert_eq!(invert_all(&[create_artists(), drop]), None);
    }

    #[test]
    fn test_invert_all_reverses_order() {
        let rename = SchemaChange::RenameTable {
            from: "artists".to_string(),
            to: "musicians".to_string(),
        };
        let inverted = invert_all(&[create_artists(), rename]).unwrap();
        assert_eq!(
            inverted,
            vec![
                SchemaChange::RenameTable {
                    from: "musicians".to_string(),
                    to: "artists".to_string(),
                },
                SchemaChange::DropTable {
                    table: "artists".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_malformed_identifier_rejected() {
        let bad = SchemaChange::DropTable {
            table: "artists; DROP TABLE students".to_string(),
        };
        assert!(bad.to_sql().is_err());
    }

    #[test]
    fn test_yaml_shape() {
        let yaml = "- add_column: { table: artists, column: { name: favorite_food, type: string } }\n\
                    - remove_column: { table: artists, column: age, type: integer }\n";
        let changes: Vec<SchemaChange> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            changes[0],
            SchemaChange::AddColumn {
                table: "artists".to_string(),
                column: ColumnDef::new("favorite_food", ColumnType::Text),
            }
        );
        assert!(changes[1].inverse().is_some());
    }
}
