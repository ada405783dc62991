//! Relationship inference from foreign keys
//!
//! Every foreign key between two registered tables becomes a pair of
//! relationships: a many-to-one attribute on the referencing model named
//! after the referenced model, and a one-to-many backref on the referenced
//! model named after the referencing one.

use crate::database::DatabaseProvider;
use crate::model::{Direction, Relationship};
use crate::registry::Registry;
use crate::schema::ForeignKey;
use crate::{Error, Result};

/// A foreign key constraint with its columns collected in order
#[derive(Debug, Clone, PartialEq, Eq)]
struct Constraint {
    references_table: String,
    columns: Vec<String>,
    references_columns: Vec<String>,
}

/// Group per-column foreign keys into constraints, keeping first-seen order
fn group_constraints(foreign_keys: Vec<ForeignKey>) -> Vec<Constraint> {
    let mut identifiers: Vec<String> = Vec::new();
    let mut constraints: Vec<Constraint> = Vec::new();

    for foreign_key in foreign_keys {
        match identifiers
            .iter()
            .position(|identifier| *identifier == foreign_key.constraint)
        {
            Some(index) => {
                constraints[index].columns.push(foreign_key.column);
                constraints[index]
                    .references_columns
                    .push(foreign_key.references_column);
            }
            None => {
                identifiers.push(foreign_key.constraint);
                constraints.push(Constraint {
                    references_table: foreign_key.references_table,
                    columns: vec![foreign_key.column],
                    references_columns: vec![foreign_key.references_column],
                });
            }
        }
    }

    constraints
}

/// Attach relationships to every registered model
///
/// Fails with [`Error::UnregisteredTable`] when a registered table references
/// a table that has no model.
pub async fn prepare_relationships<DB>(registry: &mut Registry, database: &DB) -> Result<()>
where
    DB: DatabaseProvider + ?Sized,
{
    let tables: Vec<String> = registry
        .models()
        .map(|model| model.table_name().to_string())
        .collect();

    for table in tables {
        let foreign_keys = database.get_foreign_keys(&table).await?;
        for constraint in group_constraints(foreign_keys) {
            link(registry, &table, constraint)?;
        }
    }

    Ok(())
}

/// Install one constraint's relationship and its backref
fn link(registry: &mut Registry, table: &str, constraint: Constraint) -> Result<()> {
    let target_name = match registry.by_table(&constraint.references_table) {
        Some(target) => target.name().to_string(),
        None => {
            return Err(Error::UnregisteredTable {
                table: table.to_string(),
                referenced: constraint.references_table,
            })
        }
    };
    let source_name = match registry.by_table(table) {
        Some(source) => source.name().to_string(),
        None => return Ok(()),
    };

    let attribute = target_name.to_lowercase();
    tracing::debug!(
        %table,
        referenced = %constraint.references_table,
        %attribute,
        backref = %source_name,
        "installing relationship"
    );

    let forward = Relationship {
        attribute: attribute.clone(),
        target_model: target_name,
        target_table: constraint.references_table.clone(),
        direction: Direction::ManyToOne,
        local_columns: constraint.columns.clone(),
        remote_columns: constraint.references_columns.clone(),
        backref: source_name.clone(),
    };
    let backref = Relationship {
        attribute: source_name.clone(),
        target_model: source_name,
        target_table: table.to_string(),
        direction: Direction::OneToMany,
        local_columns: constraint.references_columns,
        remote_columns: constraint.columns,
        backref: attribute,
    };

    if let Some(source) = registry.by_table_mut(table) {
        source
            .related_tables
            .insert(constraint.references_table.clone());
        source.install_relationship(forward);
    }
    if let Some(target) = registry.by_table_mut(&constraint.references_table) {
        target.install_relationship(backref);
    }

    Ok(())
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::database::sqlite::tests::music_pool;
    use crate::database::sqlite::SqliteProvider;
    use crate::model::Model;

    fn foreign_key(constraint: &str, column: &str, table: &str, references: &str) -> ForeignKey {
        ForeignKey {
            constraint: constraint.to_string(),
            column: column.to_string(),
            references_table: table.to_string(),
            references_column: references.to_string(),
        }
    }

    #[test]
    fn test_group_constraints_merges_composite_keys() {
        let constraints = group_constraints(vec![
            foreign_key("0", "InvoiceId", "invoice", "Id"),
            foreign_key("1", "CustomerId", "customer", "Id"),
            foreign_key("0", "LineNo", "invoice", "Line"),
        ]);

        assert_eq!(constraints.len(), 2);
        assert_eq!(constraints[0].columns, vec!["InvoiceId", "LineNo"]);
        assert_eq!(constraints[0].references_columns, vec!["Id", "Line"]);
        assert_eq!(constraints[1].references_table, "customer");
    }

    #[tokio::test]
    async fn test_relationships_are_bidirectional() {
        let provider = SqliteProvider::new(music_pool().await);
        let mut registry = Registry::new();
        registry
            .register_all(
                [
                    Model::new("artist").with_name("Artist"),
                    Model::new("album").with_name("Album"),
                    Model::new("genre").with_name("Genre"),
                    Model::new("track").with_name("Track"),
                ],
                true,
            )
            .unwrap();

        prepare_relationships(&mut registry, &provider).await.unwrap();

        let album = registry.by_table("album").unwrap();
        let artist = album.relationship("artist").unwrap();
        assert_eq!(artist.direction, Direction::ManyToOne);
        assert_eq!(artist.target_table, "artist");
        assert_eq!(artist.local_columns, vec!["ArtistId"]);
        assert_eq!(artist.backref, "Album");
        assert_eq!(album.related_tables().collect::<Vec<_>>(), vec!["artist"]);

        let backref = registry
            .by_table("artist")
            .unwrap()
            .relationship("Album")
            .unwrap();
        assert_eq!(backref.direction, Direction::OneToMany);
        assert_eq!(backref.target_table, "album");
        assert_eq!(backref.remote_columns, vec!["ArtistId"]);

        let track = registry.by_table("track").unwrap();
        assert!(track.relationship("album").is_some());
        assert!(track.relationship("genre").is_some());
        assert_eq!(
            track.related_tables().collect::<Vec<_>>(),
            vec!["album", "genre"]
        );

        // backrefs do not count as related tables
        assert_eq!(registry.by_table("genre").unwrap().related_tables().count(), 0);
        assert!(registry.by_table("genre").unwrap().relationship("Track").is_some());
    }

    #[tokio::test]
    async fn test_unregistered_reference_is_an_error() {
        let provider = SqliteProvider::new(music_pool().await);
        let mut registry = Registry::new();
        registry.register(Model::new("album"), true).unwrap();

        let error = prepare_relationships(&mut registry, &provider)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            Error::UnregisteredTable { ref table, ref referenced } if table == "album" && referenced == "artist"
        ));
    }

    #[tokio::test]
    async fn test_self_reference_installs_both_sides() {
        let pool = music_pool().await;
        sqlx::query(
            "CREATE TABLE employee (EmployeeId INTEGER PRIMARY KEY, ReportsTo INTEGER REFERENCES employee(EmployeeId))",
        )
        .execute(&pool)
        .await
        .unwrap();
        let provider = SqliteProvider::new(pool);

        let mut registry = Registry::new();
        registry
            .register(Model::new("employee").with_name("Employee"), true)
            .unwrap();
        prepare_relationships(&mut registry, &provider).await.unwrap();

        let employee = registry.by_table("employee").unwrap();
        assert_eq!(
            employee.relationship("employee").unwrap().direction,
            Direction::ManyToOne
        );
        assert_eq!(
            employee.relationship("Employee").unwrap().direction,
            Direction::OneToMany
        );
    }
}
