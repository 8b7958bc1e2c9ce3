//! Record schemas
//!
//! A [`Schema`] is the static per-type table of fields the record layer
//! indexes. It is built once, when a record type is first registered, and
//! consulted on every save and query instead of inspecting records at
//! runtime.
//!
//! Field options are given either with explicit builder calls or with a
//! `;`-separated tag string:
//!
//! | Tag | Effect |
//! |---|---|
//! | `noindex` / `not-indexed` | field is stored but not indexed |
//! | `nested` | one index entry per list element |
//! | `split` | one index entry per whitespace-separated word |
//! | `-` | field is not persisted and never indexed |

use crate::key::{validate_name, KeyError};
use crate::value::FieldKind;
use serde::{Deserialize, Serialize};

/// Separator between keywords in a tag string
pub const TAG_SEPARATOR: char = ';';

/// How a field value expands into index entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Decompose {
    /// One entry for the whole value
    #[default]
    None,
    /// One entry per element of a list value
    Elements,
    /// One entry per whitespace-separated word of a string value
    Words,
}

/// Declaration of one record field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name as passed to `Record::field`
    pub name: String,
    /// Value kind (element kind for decomposed lists)
    pub kind: FieldKind,
    /// Whether the field has an index
    pub indexed: bool,
    /// Index expansion mode
    pub decompose: Decompose,
    /// Whether the field is persisted at all
    pub persisted: bool,
}

impl FieldSpec {
    /// Indexed, persisted, not decomposed
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldSpec {
            name: name.into(),
            kind,
            indexed: true,
            decompose: Decompose::None,
            persisted: true,
        }
    }

    /// Apply a `;`-separated tag string
    ///
    /// Unknown keywords are ignored.
    pub fn with_tags(mut self, tags: &str) -> Self {
        for tag in tags.split(TAG_SEPARATOR).map(str::trim) {
            match tag {
                "noindex" | "not-indexed" => self.indexed = false,
                "nested" => self.decompose = Decompose::Elements,
                "split" => self.decompose = Decompose::Words,
                "-" => self.persisted = false,
                _ => {}
            }
        }
        self
    }

    /// Name of the field's index
    pub fn index_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// Whether saving a record writes index entries for this field
    pub fn has_index(&self) -> bool {
        self.indexed && self.persisted
    }
}

/// Static field table of a record type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Start building a schema
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// A schema with no fields (records without indexes)
    pub fn empty() -> Self {
        Schema::default()
    }

    /// All declared fields
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Fields that produce index entries
    pub fn indexed_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.has_index())
    }

    /// Look up an index by name, case-insensitively
    pub fn index(&self, name: &str) -> Option<&FieldSpec> {
        let wanted = name.to_lowercase();
        self.indexed_fields().find(|f| f.index_name() == wanted)
    }

    /// Check every indexed field name can be used in a key
    pub fn validate(&self) -> Result<(), KeyError> {
        for field in self.indexed_fields() {
            validate_name(&field.index_name())?;
        }
        Ok(())
    }
}

/// Builder for [`Schema`]
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    /// Add an indexed field
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec::new(name, kind));
        self
    }

    /// Add a field with a tag string (see module docs)
    pub fn tagged(mut self, name: impl Into<String>, kind: FieldKind, tags: &str) -> Self {
        self.fields.push(FieldSpec::new(name, kind).with_tags(tags));
        self
    }

    /// Add a fully specified field
    pub fn spec(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Finish the schema
    ///
    /// A later declaration of the same index name replaces the earlier one.
    pub fn build(self) -> Schema {
        let mut fields: Vec<FieldSpec> = Vec::with_capacity(self.fields.len());
        for spec in self.fields {
            let name = spec.index_name();
            fields.retain(|f| f.index_name() != name);
            fields.push(spec);
        }
        Schema { fields }
    }
}
