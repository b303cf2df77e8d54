//! pagegraph-core: Shared types for the pagegraph mirror.
//!
//! This crate provides the foundational pieces used by every other crate:
//! - Page, subject, statement, and relation types
//! - Property type capabilities and their registry
//! - Schema definitions and lookup
//! - Value to graph-scalar conversion
//! - Common error types

pub mod error;
pub mod property_type;
pub mod schema;
pub mod time;
pub mod types;
pub mod value_builder;

pub use error::CoreError;
pub use property_type::{PropertyType, PropertyTypeLookup, PropertyTypeRegistry};
pub use schema::{PropertyDefinition, Schema, SchemaLookup, SchemaRegistry};
pub use types::{
    Page, PageId, PageProperties, PageSubjects, Relation, RelationId, RelationType, ScalarValue,
    SchemaName, Statement, StatementList, Subject, SubjectId, TypedRelationList, Value, ValueType,
    RELATION_ID_KEY,
};
pub use value_builder::ValueBuilderRegistry;
