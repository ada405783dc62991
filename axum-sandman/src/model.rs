//! Model descriptors
//!
//! A [`Model`] describes one table exposed through the API: the endpoint it is
//! served under, the methods it accepts, its reflected schema, and the
//! relationships inferred from foreign keys.

use crate::schema::TableSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// HTTP methods a model may accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Method {
    /// Methods a model accepts unless told otherwise
    pub const DEFAULT: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Patch,
        Method::Put,
        Method::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of a foreign key a relationship sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    /// The owning model holds the foreign key
    ManyToOne,
    /// The target model holds the foreign key (the backref side)
    OneToMany,
}

/// An association between two registered models
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// Attribute name the relationship is installed under
    pub attribute: String,

    /// Name of the model on the other side
    pub target_model: String,

    /// Table of the model on the other side
    pub target_table: String,

    pub direction: Direction,

    /// Columns on the owning model's table
    pub local_columns: Vec<String>,

    /// Matching columns on the target's table
    pub remote_columns: Vec<String>,

    /// Attribute name of the reverse relationship on the target
    pub backref: String,
}

/// A link from a resource to itself or a related collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub uri: String,
}

/// Descriptor of one exposed table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    table_name: String,
    name: String,
    endpoint: Option<String>,
    methods: BTreeSet<Method>,
    pub(crate) use_admin: bool,
    pub(crate) schema: Option<TableSchema>,
    pub(crate) related_tables: BTreeSet<String>,
    pub(crate) relationships: BTreeMap<String, Relationship>,
}

impl Model {
    /// Describe the table `table_name`
    ///
    /// The model is named after its table until [`Model::with_name`] says
    /// otherwise.
    pub fn new(table_name: impl Into<String>) -> Self {
        let table_name = table_name.into();
        Self {
            name: table_name.clone(),
            table_name,
            endpoint: None,
            methods: Method::DEFAULT.into_iter().collect(),
            use_admin: true,
            schema: None,
            related_tables: BTreeSet::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Set the model name used for relationship attributes and admin titles
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Serve the model under `endpoint` instead of its lowercased table name
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Restrict the methods the model accepts
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    pub(crate) fn with_schema(mut self, schema: TableSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The URL segment this model is served under
    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| self.table_name.to_lowercase())
    }

    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        self.methods.iter().copied()
    }

    pub fn supports(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    /// Whether an admin view is mounted for this model
    pub fn use_admin(&self) -> bool {
        self.use_admin
    }

    /// Reflected schema, available once the model has been activated
    pub fn schema(&self) -> Option<&TableSchema> {
        self.schema.as_ref()
    }

    /// Primary key columns; empty until the schema has been reflected
    pub fn primary_key(&self) -> Vec<String> {
        self.schema
            .as_ref()
            .and_then(|schema| schema.primary_key.clone())
            .unwrap_or_default()
    }

    /// Tables this model holds foreign keys to
    pub fn related_tables(&self) -> impl Iterator<Item = &str> {
        self.related_tables.iter().map(String::as_str)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    pub fn relationship(&self, attribute: &str) -> Option<&Relationship> {
        self.relationships.get(attribute)
    }

    /// URI of a single resource of this model
    ///
    /// The URI is the logical REST address `/{endpoint}/{key}`, relative to
    /// wherever the application serves its REST resources. The admin router
    /// does not serve it, and it does not move with the admin's base path.
    /// `primary_key` is inserted as given, so callers encode it first.
    pub fn resource_uri(&self, primary_key: impl fmt::Display) -> String {
        format!("/{}/{}", self.endpoint(), primary_key)
    }

    /// Self link plus one link per related model
    ///
    /// Links are logical REST addresses like [`Model::resource_uri`].
    /// `endpoint_for_table` resolves a related table to its endpoint; tables
    /// it cannot resolve are skipped.
    pub fn links<F>(&self, primary_key: impl fmt::Display, endpoint_for_table: F) -> Vec<Link>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut links = vec![Link {
            rel: "self".to_string(),
            uri: self.resource_uri(primary_key),
        }];

        for relationship in self.relationships.values() {
            if let Some(endpoint) = endpoint_for_table(&relationship.target_table) {
                links.push(Link {
                    rel: relationship.attribute.clone(),
                    uri: format!("/{}", endpoint),
                });
            }
        }

        links
    }

    pub(crate) fn install_relationship(&mut self, relationship: Relationship) {
        self.relationships
            .insert(relationship.attribute.clone(), relationship);
    }
}
