//! Schema descriptor: tables, key and data fields, defaults, types, foreign keys.
//!
//! A descriptor is plain data. It can be assembled in code with the `with_*`
//! builders or loaded from JSON/TOML. [`SchemaDescriptor::validate`] checks its
//! internal consistency; the factory calls it once and never again.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{TabError, TabResult};
use crate::value::{FieldType, Value};

/// One table's declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Primary key fields, in key order. Empty for keyless tables.
    #[serde(default)]
    pub primary_key_fields: Vec<String>,

    /// Non-key fields, in column order.
    #[serde(default)]
    pub data_fields: Vec<String>,

    /// Defaults for data fields omitted by the source.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub default_values: BTreeMap<String, Value>,

    /// Declared types; undeclared fields are `FieldType::Any`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_types: BTreeMap<String, FieldType>,

    /// Expose this table as a lazy, restartable row sequence.
    #[serde(default)]
    pub generator: bool,
}

impl TableSchema {
    pub fn new<K, D>(primary_key_fields: K, data_fields: D) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            primary_key_fields: primary_key_fields.into_iter().map(Into::into).collect(),
            data_fields: data_fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// A keyless table exposed as a generator.
    pub fn generator<D>(fields: D) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            generator: true,
            ..Self::new(Vec::<String>::new(), fields)
        }
    }

    pub fn with_default(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default_values.insert(field.into(), value.into());
        self
    }

    pub fn with_type(mut self, field: impl Into<String>, field_type: FieldType) -> Self {
        self.field_types.insert(field.into(), field_type);
        self
    }

    pub fn is_keyed(&self) -> bool {
        !self.primary_key_fields.is_empty()
    }

    /// Key fields followed by data fields: the column order used on write.
    pub fn all_fields(&self) -> impl Iterator<Item = &str> {
        self.primary_key_fields
            .iter()
            .chain(self.data_fields.iter())
            .map(String::as_str)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.all_fields().any(|f| f == field)
    }

    pub fn field_type(&self, field: &str) -> FieldType {
        self.field_types.get(field).copied().unwrap_or_default()
    }

    pub fn default_value(&self, field: &str) -> Option<&Value> {
        self.default_values.get(field)
    }

    /// True when both tables declare the same data field names in any order.
    pub fn field_compatible(&self, other: &TableSchema) -> bool {
        let mine: BTreeSet<&str> = self.data_fields.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = other.data_fields.iter().map(String::as_str).collect();
        mine == theirs
    }

    fn validate(&self, table: &str) -> TabResult<()> {
        let mut seen = BTreeSet::new();
        for field in self.all_fields() {
            if field.is_empty() {
                return Err(TabError::schema(format!(
                    "Table '{}' declares an empty field name",
                    table
                )));
            }
            if !seen.insert(field) {
                let both = self.primary_key_fields.iter().any(|f| f == field)
                    && self.data_fields.iter().any(|f| f == field);
                return Err(TabError::schema(if both {
                    format!(
                        "Table '{}': field '{}' is both a primary key and a data field",
                        table, field
                    )
                } else {
                    format!("Table '{}': field '{}' is declared twice", table, field)
                }));
            }
        }

        if self.generator && self.is_keyed() {
            return Err(TabError::schema(format!(
                "Generator table '{}' cannot declare primary key fields",
                table
            )));
        }

        for field in self.default_values.keys() {
            if !self.data_fields.contains(field) {
                return Err(TabError::schema(format!(
                    "Table '{}': default value given for '{}', which is not a data field",
                    table, field
                )));
            }
        }

        for (field, field_type) in &self.field_types {
            if !self.has_field(field) {
                return Err(TabError::schema(format!(
                    "Table '{}': type given for undeclared field '{}'",
                    table, field
                )));
            }
            if let Some(default) = self.default_values.get(field) {
                if default.coerce(*field_type).is_none() {
                    return Err(TabError::schema(format!(
                        "Table '{}': default '{}' for '{}' is not a valid {}",
                        table,
                        default,
                        field,
                        field_type.type_name()
                    )));
                }
            }
        }

        Ok(())
    }
}

/// One native-to-foreign field pairing of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub native_field: String,
    pub foreign_field: String,
}

/// Child (native) table fields that must match a parent (foreign) table's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub native_table: String,
    pub foreign_table: String,
    pub mappings: Vec<FieldMapping>,
}

impl ForeignKey {
    pub fn new(
        native_table: impl Into<String>,
        foreign_table: impl Into<String>,
        mappings: &[(&str, &str)],
    ) -> Self {
        Self {
            native_table: native_table.into(),
            foreign_table: foreign_table.into(),
            mappings: mappings
                .iter()
                .map(|(native, foreign)| FieldMapping {
                    native_field: (*native).to_string(),
                    foreign_field: (*foreign).to_string(),
                })
                .collect(),
        }
    }

    pub fn native_fields(&self) -> impl Iterator<Item = &str> {
        self.mappings.iter().map(|m| m.native_field.as_str())
    }

    pub fn foreign_fields(&self) -> impl Iterator<Item = &str> {
        self.mappings.iter().map(|m| m.foreign_field.as_str())
    }
}

/// The full declaration of a table collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub tables: BTreeMap<String, TableSchema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,
}

impl SchemaDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, table: TableSchema) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    /// Load a descriptor from `.toml`, or from JSON for any other extension.
    pub fn load(path: &Path) -> TabResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
        let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
        let schema = if is_toml {
            toml::from_str(&content)
                .with_context(|| format!("Invalid TOML schema: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON schema: {}", path.display()))?
        };
        Ok(schema)
    }

    /// Check the descriptor's internal consistency.
    pub fn validate(&self) -> TabResult<()> {
        if self.tables.is_empty() {
            return Err(TabError::schema("Schema declares no tables"));
        }
        for (name, table) in &self.tables {
            if name.is_empty() {
                return Err(TabError::schema("Table names must be non-empty"));
            }
            table.validate(name)?;
        }
        for fk in &self.foreign_keys {
            self.validate_foreign_key(fk)?;
        }
        Ok(())
    }

    fn validate_foreign_key(&self, fk: &ForeignKey) -> TabResult<()> {
        let native = self.table(&fk.native_table).ok_or_else(|| {
            TabError::schema(format!(
                "Foreign key references unknown native table '{}'",
                fk.native_table
            ))
        })?;
        let foreign = self.table(&fk.foreign_table).ok_or_else(|| {
            TabError::schema(format!(
                "Foreign key references unknown foreign table '{}'",
                fk.foreign_table
            ))
        })?;
        if fk.mappings.is_empty() {
            return Err(TabError::schema(format!(
                "Foreign key {} -> {} has no field mappings",
                fk.native_table, fk.foreign_table
            )));
        }
        for mapping in &fk.mappings {
            if !native.has_field(&mapping.native_field) {
                return Err(TabError::schema(format!(
                    "Foreign key {} -> {}: '{}' is not a field of {}",
                    fk.native_table, fk.foreign_table, mapping.native_field, fk.native_table
                )));
            }
            if !foreign.primary_key_fields.contains(&mapping.foreign_field) {
                return Err(TabError::schema(format!(
                    "Foreign key {} -> {}: '{}' is not a primary key field of {}",
                    fk.native_table, fk.foreign_table, mapping.foreign_field, fk.foreign_table
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> SchemaDescriptor {
        SchemaDescriptor::new().with_table(
            "items",
            TableSchema::new(["id"], ["qty"]).with_default("qty", 0),
        )
    }

    #[test]
    fn test_valid_schema() {
        assert!(items().validate().is_ok());
    }

    #[test]
    fn test_overlapping_key_and_data_fields() {
        let schema = SchemaDescriptor::new().with_table("t", TableSchema::new(["a"], ["a", "b"]));
        let err = schema.validate().unwrap_err();
        assert!(matches!(err, TabError::Schema(_)));
        assert!(err.to_string().contains("both a primary key and a data field"));
    }

    #[test]
    fn test_generator_with_key_rejected() {
        let mut table = TableSchema::new(["k"], ["v"]);
        table.generator = true;
        let schema = SchemaDescriptor::new().with_table("g", table);
        assert!(matches!(schema.validate(), Err(TabError::Schema(_))));
    }

    #[test]
    fn test_default_for_key_field_rejected() {
        let schema = SchemaDescriptor::new().with_table(
            "items",
            TableSchema::new(["id"], ["qty"]).with_default("id", 1),
        );
        assert!(matches!(schema.validate(), Err(TabError::Schema(_))));
    }

    #[test]
    fn test_default_must_fit_declared_type() {
        let schema = SchemaDescriptor::new().with_table(
            "items",
            TableSchema::new(["id"], ["qty"])
                .with_default("qty", "lots")
                .with_type("qty", FieldType::Int),
        );
        assert!(matches!(schema.validate(), Err(TabError::Schema(_))));
    }

    #[test]
    fn test_foreign_key_must_target_parent_key() {
        let base = SchemaDescriptor::new()
            .with_table("nodes", TableSchema::new(["name"], Vec::<String>::new()))
            .with_table("arcs", TableSchema::new(["source", "destination"], ["capacity"]));

        let good = base
            .clone()
            .with_foreign_key(ForeignKey::new("arcs", "nodes", &[("source", "name")]));
        assert!(good.validate().is_ok());

        let bad_parent = base
            .clone()
            .with_foreign_key(ForeignKey::new("arcs", "nodes", &[("source", "nimrod")]));
        assert!(matches!(bad_parent.validate(), Err(TabError::Schema(_))));

        let bad_child = base
            .clone()
            .with_foreign_key(ForeignKey::new("arcs", "nodes", &[("origin", "name")]));
        assert!(matches!(bad_child.validate(), Err(TabError::Schema(_))));

        let bad_table = base.with_foreign_key(ForeignKey::new("arcs", "sites", &[("source", "name")]));
        assert!(matches!(bad_table.validate(), Err(TabError::Schema(_))));
    }

    #[test]
    fn test_field_compatible_ignores_order() {
        let a = TableSchema::new(["k"], ["x", "y", "z"]);
        let b = TableSchema::new(["k"], ["z", "x", "y"]);
        let c = TableSchema::new(["k"], ["x", "y"]);
        assert!(a.field_compatible(&b));
        assert!(!a.field_compatible(&c));
    }

    #[test]
    fn test_load_json_and_toml() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("items.json");
        std::fs::write(
            &json_path,
            r#"{"tables": {"items": {"primary_key_fields": ["id"], "data_fields": ["qty"],
                "default_values": {"qty": 0}, "field_types": {"id": "text"}}}}"#,
        )
        .unwrap();
        let from_json = SchemaDescriptor::load(&json_path).unwrap();
        assert_eq!(from_json.table("items").unwrap().field_type("id"), FieldType::Text);
        assert_eq!(
            from_json.table("items").unwrap().default_value("qty"),
            Some(&Value::Int(0))
        );

        let toml_path = dir.path().join("items.toml");
        std::fs::write(
            &toml_path,
            r#"
[tables.items]
primary_key_fields = ["id"]
data_fields = ["qty"]

[tables.items.default_values]
qty = 0

[tables.log]
data_fields = ["line"]
generator = true
"#,
        )
        .unwrap();
        let from_toml = SchemaDescriptor::load(&toml_path).unwrap();
        assert!(from_toml.validate().is_ok());
        assert!(from_toml.table("log").unwrap().generator);
    }

    #[test]
    fn test_load_reports_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = SchemaDescriptor::load(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid JSON schema"));
    }
}
