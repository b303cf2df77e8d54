//! Core domain types for the pagegraph mirror.
//!
//! A page embeds zero or one main subject and any number of child subjects.
//! Each subject carries a list of typed statements; relation-valued
//! statements describe outgoing edges to other subjects.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Identifiers ───────────────────────────────────────────────────

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Stable identifier of a wiki page.
    PageId
);
string_id!(
    /// Stable identifier of a subject, unique across all pages.
    SubjectId
);
string_id!(
    /// Stable identifier of a relation, preserved across saves.
    RelationId
);
string_id!(
    /// Name of the schema governing a subject's properties.
    SchemaName
);
string_id!(
    /// Domain relation type; becomes the graph edge type.
    RelationType
);

// ── Values ────────────────────────────────────────────────────────

/// A graph-storable scalar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ScalarValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// The kind of data a value (or a property type) carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Relation,
}

/// A typed statement value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    String(Vec<String>),
    Number(f64),
    Boolean(bool),
    Relation(Vec<Relation>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::String(_) => ValueType::String,
            Self::Number(_) => ValueType::Number,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Relation(_) => ValueType::Relation,
        }
    }

    pub fn string(parts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::String(parts.into_iter().map(Into::into).collect())
    }
}

// ── Statements ────────────────────────────────────────────────────

/// One property assertion about a subject.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Statement {
    pub property: String,
    pub property_type: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl Statement {
    pub fn new(property: impl Into<String>, property_type: impl Into<String>, value: Value) -> Self {
        Self {
            property: property.into(),
            property_type: property_type.into(),
            value: Some(value),
        }
    }
}

/// Ordered statements, unique by property name. A later statement for the
/// same property replaces the earlier one in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "Vec<Statement>", into = "Vec<Statement>")]
pub struct StatementList {
    statements: Vec<Statement>,
}

impl StatementList {
    pub fn new(statements: impl IntoIterator<Item = Statement>) -> Self {
        let mut list = Self::default();
        for statement in statements {
            list.insert(statement);
        }
        list
    }

    pub fn insert(&mut self, statement: Statement) {
        match self
            .statements
            .iter_mut()
            .find(|s| s.property == statement.property)
        {
            Some(existing) => *existing = statement,
            None => self.statements.push(statement),
        }
    }

    pub fn get(&self, property: &str) -> Option<&Statement> {
        self.statements.iter().find(|s| s.property == property)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl From<Vec<Statement>> for StatementList {
    fn from(statements: Vec<Statement>) -> Self {
        Self::new(statements)
    }
}

impl From<StatementList> for Vec<Statement> {
    fn from(list: StatementList) -> Self {
        list.statements
    }
}

// ── Relations ─────────────────────────────────────────────────────

/// A typed, stably identified edge from one subject to another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relation {
    pub id: RelationId,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub target: SubjectId,
    #[serde(default)]
    pub properties: BTreeMap<String, ScalarValue>,
}

/// Edge property holding the relation id.
pub const RELATION_ID_KEY: &str = "id";

/// All outgoing relations of one subject.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedRelationList {
    relations: Vec<Relation>,
}

impl TypedRelationList {
    /// Build the list, keeping the first relation seen for each id.
    ///
    /// An `id` entry in a relation's properties is dropped: the stored edge
    /// uses that key for the relation id.
    pub fn new(relations: impl IntoIterator<Item = Relation>) -> Self {
        let mut seen = HashSet::new();
        let relations = relations
            .into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .map(|mut r| {
                r.properties.remove(RELATION_ID_KEY);
                r
            })
            .collect();
        Self { relations }
    }

    /// Collect every relation held by relation-valued statements.
    pub fn from_statements(statements: &StatementList) -> Self {
        Self::new(statements.iter().flat_map(|s| match &s.value {
            Some(Value::Relation(relations)) => relations.clone(),
            _ => Vec::new(),
        }))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter()
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

// ── Subjects and pages ────────────────────────────────────────────

/// A structured record embedded in a page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subject {
    pub id: SubjectId,
    pub label: String,
    pub schema: SchemaName,
    #[serde(default)]
    pub statements: StatementList,
}

impl Subject {
    pub fn relations(&self) -> TypedRelationList {
        TypedRelationList::from_statements(&self.statements)
    }
}

/// Display metadata of a page. Timestamps use the compact 14-digit form
/// (`YYYYMMDDHHMMSS`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageProperties {
    pub title: String,
    #[serde(default)]
    pub creation_time: String,
    #[serde(default)]
    pub modification_time: String,
    #[serde(default)]
    pub last_editor: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageSubjects {
    #[serde(default)]
    pub main: Option<Subject>,
    #[serde(default)]
    pub children: Vec<Subject>,
}

impl PageSubjects {
    /// Every subject paired with whether it is the page's main subject.
    /// A child sharing the main subject's id is yielded once, as main.
    pub fn all(&self) -> Vec<(&Subject, bool)> {
        let mut seen = HashSet::new();
        self.main
            .iter()
            .map(|s| (s, true))
            .chain(self.children.iter().map(|s| (s, false)))
            .filter(|(s, _)| seen.insert(&s.id))
            .collect()
    }

    pub fn ids(&self) -> Vec<SubjectId> {
        self.all().into_iter().map(|(s, _)| s.id.clone()).collect()
    }
}

/// A page together with the subjects currently declared on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub id: PageId,
    pub properties: PageProperties,
    #[serde(default)]
    pub subjects: PageSubjects,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(id: &str, target: &str) -> Relation {
        Relation {
            id: RelationId::from(id),
            relation_type: RelationType::from("FoundedBy"),
            target: SubjectId::from(target),
            properties: BTreeMap::new(),
        }
    }

    fn subject(id: &str) -> Subject {
        Subject {
            id: SubjectId::from(id),
            label: id.to_uppercase(),
            schema: SchemaName::from("Company"),
            statements: StatementList::default(),
        }
    }

    #[test]
    fn test_statement_list_unique_by_property() {
        let list = StatementList::new(vec![
            Statement::new("Name", "text", Value::string(["a"])),
            Statement::new("Age", "number", Value::Number(1.0)),
            Statement::new("Name", "text", Value::string(["b"])),
        ]);

        assert_eq!(list.len(), 2);
        assert_eq!(list.iter().next().unwrap().property, "Name");
        assert_eq!(
            list.get("Name").unwrap().value,
            Some(Value::string(["b"]))
        );
    }

    #[test]
    fn test_relations_collected_from_statements() {
        let list = StatementList::new(vec![
            Statement::new("Name", "text", Value::string(["ACME"])),
            Statement::new(
                "Founders",
                "relation",
                Value::Relation(vec![relation("r1", "s2"), relation("r2", "s3")]),
            ),
            Statement::new("Owner", "relation", Value::Relation(vec![relation("r1", "s9")])),
        ]);

        let relations = TypedRelationList::from_statements(&list);
        assert_eq!(relations.len(), 2);
        assert_eq!(relations.iter().next().unwrap().target, SubjectId::from("s2"));
    }

    #[test]
    fn test_relation_id_property_is_dropped() {
        let mut founder = relation("r1", "s2");
        founder
            .properties
            .insert("id".into(), ScalarValue::from("user-supplied"));
        founder
            .properties
            .insert("since".into(), ScalarValue::Integer(1999));

        let relations = TypedRelationList::new(vec![founder]);
        let kept = relations.iter().next().unwrap();
        assert_eq!(kept.id, RelationId::from("r1"));
        assert!(!kept.properties.contains_key("id"));
        assert_eq!(kept.properties["since"], ScalarValue::Integer(1999));
    }

    #[test]
    fn test_page_subjects_main_first_and_deduplicated() {
        let subjects = PageSubjects {
            main: Some(subject("a")),
            children: vec![subject("b"), subject("a"), subject("c")],
        };

        let all = subjects.all();
        let flags: Vec<(&str, bool)> = all.iter().map(|(s, m)| (s.id.as_str(), *m)).collect();
        assert_eq!(flags, vec![("a", true), ("b", false), ("c", false)]);
    }

    #[test]
    fn test_page_deserializes_from_json() {
        let json = r#"{
            "id": "42",
            "properties": {"title": "ACME Inc", "creation_time": "20240102030405"},
            "subjects": {
                "main": {
                    "id": "s1",
                    "label": "ACME Inc",
                    "schema": "Company",
                    "statements": [
                        {"property": "Founded", "property_type": "number",
                         "value": {"type": "number", "value": 2019}},
                        {"property": "Website", "property_type": "url",
                         "value": {"type": "string", "value": ["https://acme.example"]}},
                        {"property": "Products", "property_type": "relation",
                         "value": {"type": "relation", "value": [
                            {"id": "r1", "type": "HasProduct", "target": "s2",
                             "properties": {"since": 2020}}
                         ]}}
                    ]
                }
            }
        }"#;

        let page: Page = serde_json::from_str(json).unwrap();
        let main = page.subjects.main.as_ref().unwrap();
        assert_eq!(page.id, PageId::from("42"));
        assert_eq!(main.statements.len(), 3);
        assert_eq!(
            main.statements.get("Founded").unwrap().value,
            Some(Value::Number(2019.0))
        );

        let relations = main.relations();
        let rel = relations.iter().next().unwrap();
        assert_eq!(rel.relation_type, RelationType::from("HasProduct"));
        assert_eq!(rel.properties.get("since"), Some(&ScalarValue::Integer(2020)));
        assert!(page.subjects.children.is_empty());
    }
}
