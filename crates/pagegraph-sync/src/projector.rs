//! Subject node projection: statements become flat node properties.

use std::collections::BTreeMap;
use std::sync::Arc;

use pagegraph_core::{
    PageId, PropertyType, PropertyTypeLookup, ScalarValue, Schema, SchemaLookup, StatementList,
    Subject, ValueBuilderRegistry,
};
use pagegraph_graph::{GraphTransaction, SubjectNode};

use crate::error::Result;

/// Projects subject statements onto graph node properties.
///
/// The registries are injected by the composition root.
#[derive(Clone)]
pub struct NodePropertyProjector {
    builders: Arc<ValueBuilderRegistry>,
    types: Arc<dyn PropertyTypeLookup>,
    schemas: Arc<dyn SchemaLookup>,
}

impl NodePropertyProjector {
    pub fn new(
        builders: Arc<ValueBuilderRegistry>,
        types: Arc<dyn PropertyTypeLookup>,
        schemas: Arc<dyn SchemaLookup>,
    ) -> Self {
        Self {
            builders,
            types,
            schemas,
        }
    }

    /// Scalar projection of every representable statement.
    ///
    /// A statement is omitted when its type is unknown or relation-valued,
    /// when it has no value builder, or when the value's kind differs from
    /// the kind the type stores. Content is not checked against the format.
    pub fn project(
        &self,
        statements: &StatementList,
        types: &dyn PropertyTypeLookup,
    ) -> BTreeMap<String, Vec<ScalarValue>> {
        self.project_with_schema(statements, None, types)
    }

    /// Like [`Self::project`], resolving each property through the schema's
    /// declared type first and the statement's own type second.
    fn project_with_schema(
        &self,
        statements: &StatementList,
        schema: Option<&Schema>,
        types: &dyn PropertyTypeLookup,
    ) -> BTreeMap<String, Vec<ScalarValue>> {
        let mut projected = BTreeMap::new();

        for statement in statements.iter() {
            let Some(value) = &statement.value else {
                continue;
            };

            let type_name = schema
                .and_then(|s| s.property(&statement.property))
                .map(|def| def.type_name.as_str())
                .unwrap_or(statement.property_type.as_str());

            let Some(property_type) = types.property_type(type_name) else {
                continue;
            };
            if !representable(property_type, value) {
                continue;
            }

            match self.builders.build_value(type_name, value) {
                Some(scalars) if !scalars.is_empty() => {
                    projected.insert(statement.property.clone(), scalars);
                }
                _ => {}
            }
        }

        projected
    }

    /// Upsert the subject node and its membership edge.
    ///
    /// Returns `false`, after logging a warning, when the subject's schema
    /// cannot be resolved. Nothing is written for that subject.
    pub async fn update_subject(
        &self,
        txn: &mut dyn GraphTransaction,
        page_id: &PageId,
        subject: &Subject,
        is_main: bool,
    ) -> Result<bool> {
        let Some(schema) = self.schemas.schema(&subject.schema) else {
            tracing::warn!(
                page = %page_id,
                subject = %subject.id,
                schema = %subject.schema,
                "Schema not found, skipping subject"
            );
            return Ok(false);
        };

        let node = SubjectNode {
            id: subject.id.clone(),
            name: subject.label.clone(),
            schema: schema.name.clone(),
            properties: self.project_with_schema(
                &subject.statements,
                Some(&schema),
                self.types.as_ref(),
            ),
        };

        txn.upsert_subject(&node).await?;
        txn.link_subject(page_id, &subject.id, is_main).await?;
        Ok(true)
    }
}

fn representable(property_type: &dyn PropertyType, value: &pagegraph_core::Value) -> bool {
    !property_type.is_relation() && value.value_type() == property_type.value_type()
}
