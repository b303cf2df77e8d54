//! Write operations for the page graph.
//!
//! All mutations run inside one Neo4j transaction opened under the
//! full-privilege role. Nodes are identified by their `id` property; relation
//! edges carry the domain relation id as their `id` property, which is the
//! only stable key for an edge.

use std::collections::BTreeMap;

use async_trait::async_trait;
use neo4rs::{query, BoltMap, BoltString, BoltType, Query, Row, Txn};

use pagegraph_core::{
    PageId, Relation, RelationId, RelationType, ScalarValue, SubjectId, RELATION_ID_KEY,
};

use crate::client::{GraphClient, GraphError};
use crate::store::{GraphStore, GraphTransaction, PageNode, SubjectNode};

#[async_trait]
impl GraphStore for GraphClient {
    async fn begin(&self) -> Result<Box<dyn GraphTransaction>, GraphError> {
        let txn = self.start_txn().await?;
        Ok(Box::new(Neo4jTransaction { txn: Some(txn) }))
    }
}

/// A [`GraphTransaction`] backed by a neo4rs transaction.
pub struct Neo4jTransaction {
    txn: Option<Txn>,
}

impl Neo4jTransaction {
    fn txn(&mut self) -> Result<&mut Txn, GraphError> {
        self.txn.as_mut().ok_or(GraphError::TransactionClosed)
    }

    async fn run(&mut self, q: Query) -> Result<(), GraphError> {
        self.txn()?.run(q).await?;
        Ok(())
    }

    async fn rows(&mut self, q: Query) -> Result<Vec<Row>, GraphError> {
        let txn = self.txn()?;
        let mut stream = txn.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next(txn.handle()).await? {
            rows.push(row);
        }
        Ok(rows)
    }

    async fn count(&mut self, q: Query, column: &str) -> Result<i64, GraphError> {
        Ok(self
            .rows(q)
            .await?
            .first()
            .and_then(|row| row.get::<i64>(column).ok())
            .unwrap_or(0))
    }
}

#[async_trait]
impl GraphTransaction for Neo4jTransaction {
    async fn upsert_page(&mut self, page: &PageNode) -> Result<(), GraphError> {
        let q = query(
            "MERGE (p:Page {id: $id})
             SET p.title = $title, p.created_at = $created_at,
                 p.updated_at = $updated_at, p.last_editor = $last_editor",
        )
        .param("id", page.id.to_string())
        .param("title", page.title.clone())
        .param("created_at", page.created_at.clone())
        .param("updated_at", page.updated_at.clone())
        .param("last_editor", page.last_editor.clone());

        self.run(q).await
    }

    async fn upsert_subject(&mut self, subject: &SubjectNode) -> Result<(), GraphError> {
        let previous = self
            .rows(
                query("MATCH (s:Subject {id: $id}) RETURN s.schema AS schema")
                    .param("id", subject.id.to_string()),
            )
            .await?
            .first()
            .and_then(|row| row.get::<String>("schema").ok());

        // Labels cannot be parameters; drop the stale schema label explicitly.
        if let Some(old) = previous.filter(|old| !old.is_empty() && old != subject.schema.as_str())
        {
            let cypher = format!(
                "MATCH (s:Subject {{id: $id}}) REMOVE s:{}",
                escape_identifier(&old)
            );
            self.run(query(&cypher).param("id", subject.id.to_string()))
                .await?;
        }

        let cypher = format!(
            "MERGE (s:Subject {{id: $id}})
             SET s = $props
             SET s:{}",
            escape_identifier(subject.schema.as_str())
        );
        let q = query(&cypher)
            .param("id", subject.id.to_string())
            .param("props", subject_props(subject));

        self.run(q).await
    }

    async fn link_subject(
        &mut self,
        page_id: &PageId,
        subject_id: &SubjectId,
        is_main: bool,
    ) -> Result<(), GraphError> {
        let q = query(
            "MATCH (p:Page {id: $page_id})
             MATCH (s:Subject {id: $subject_id})
             MERGE (p)-[r:HAS_SUBJECT]->(s)
             SET r.is_main = $is_main",
        )
        .param("page_id", page_id.to_string())
        .param("subject_id", subject_id.to_string())
        .param("is_main", is_main);

        self.run(q).await
    }

    async fn set_membership_main(
        &mut self,
        page_id: &PageId,
        subject_id: &SubjectId,
        is_main: bool,
    ) -> Result<(), GraphError> {
        let q = query(
            "MATCH (:Page {id: $page_id})-[r:HAS_SUBJECT]->(:Subject {id: $subject_id})
             SET r.is_main = $is_main",
        )
        .param("page_id", page_id.to_string())
        .param("subject_id", subject_id.to_string())
        .param("is_main", is_main);

        self.run(q).await
    }

    async fn detach_subjects_except(
        &mut self,
        page_id: &PageId,
        keep: &[SubjectId],
    ) -> Result<u64, GraphError> {
        let keep: Vec<String> = keep.iter().map(|id| id.0.clone()).collect();
        let q = query(
            "MATCH (:Page {id: $page_id})-[r:HAS_SUBJECT]->(s:Subject)
             WHERE NOT s.id IN $keep
             DELETE r
             WITH collect(s) AS detached
             FOREACH (s IN [x IN detached WHERE NOT (x)<-[:HAS_SUBJECT]-(:Page)] |
               DETACH DELETE s)
             RETURN size(detached) AS detached",
        )
        .param("page_id", page_id.to_string())
        .param("keep", keep);

        Ok(self.count(q, "detached").await?.max(0) as u64)
    }

    async fn outgoing_relations(&mut self, source: &SubjectId) -> Result<Vec<Relation>, GraphError> {
        let q = query(
            "MATCH (:Subject {id: $id})-[r]->(t:Subject)
             WHERE r.id IS NOT NULL
             RETURN r, t.id AS target",
        )
        .param("id", source.to_string());

        let rows = self.rows(q).await?;
        let mut relations = Vec::with_capacity(rows.len());
        for row in rows {
            let rel: neo4rs::Relation = row
                .get("r")
                .map_err(|e| GraphError::Serialization(format!("Failed to get relation: {e}")))?;
            let target: String = row
                .get("target")
                .map_err(|e| GraphError::Serialization(format!("Failed to get target: {e}")))?;
            relations.push(relation_from_neo4j(&rel, target)?);
        }
        Ok(relations)
    }

    async fn create_relation(
        &mut self,
        source: &SubjectId,
        relation: &Relation,
    ) -> Result<bool, GraphError> {
        let cypher = format!(
            "MATCH (s:Subject {{id: $source}})
             MATCH (t:Subject {{id: $target}})
             CREATE (s)-[r:{}]->(t)
             SET r = $props
             RETURN count(r) AS created",
            escape_identifier(relation.relation_type.as_str())
        );
        let q = query(&cypher)
            .param("source", source.to_string())
            .param("target", relation.target.to_string())
            .param("props", relation_props(relation));

        Ok(self.count(q, "created").await? > 0)
    }

    async fn update_relation(
        &mut self,
        source: &SubjectId,
        relation: &Relation,
    ) -> Result<(), GraphError> {
        let q = query(
            "MATCH (:Subject {id: $source})-[r {id: $id}]->(:Subject)
             SET r = $props",
        )
        .param("source", source.to_string())
        .param("id", relation.id.to_string())
        .param("props", relation_props(relation));

        self.run(q).await
    }

    async fn delete_relation(
        &mut self,
        source: &SubjectId,
        relation_id: &RelationId,
    ) -> Result<(), GraphError> {
        let q = query(
            "MATCH (:Subject {id: $source})-[r {id: $id}]->(:Subject)
             DELETE r",
        )
        .param("source", source.to_string())
        .param("id", relation_id.to_string());

        self.run(q).await
    }

    async fn delete_page(&mut self, page_id: &PageId) -> Result<u64, GraphError> {
        let q = query(
            "MATCH (p:Page {id: $id})
             OPTIONAL MATCH (p)-[:HAS_SUBJECT]->(s:Subject)
             WITH p, collect(s) AS subjects
             DETACH DELETE p
             WITH [x IN subjects WHERE NOT (x)<-[:HAS_SUBJECT]-(:Page)] AS orphans
             FOREACH (s IN orphans | DETACH DELETE s)
             RETURN size(orphans) AS removed",
        )
        .param("id", page_id.to_string());

        Ok(self.count(q, "removed").await?.max(0) as u64)
    }

    async fn commit(&mut self) -> Result<(), GraphError> {
        let txn = self.txn.take().ok_or(GraphError::TransactionClosed)?;
        txn.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), GraphError> {
        let txn = self.txn.take().ok_or(GraphError::TransactionClosed)?;
        txn.rollback().await?;
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// Quote a label or relationship type for interpolation into Cypher.
pub fn escape_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn scalar_to_bolt(value: &ScalarValue) -> BoltType {
    match value {
        ScalarValue::Boolean(b) => BoltType::from(*b),
        ScalarValue::Integer(i) => BoltType::from(*i),
        ScalarValue::Float(f) => BoltType::from(*f),
        ScalarValue::String(s) => BoltType::from(s.clone()),
    }
}

/// Single values are stored as scalars, several as a list.
fn scalars_to_bolt(values: &[ScalarValue]) -> BoltType {
    match values {
        [single] => scalar_to_bolt(single),
        many => BoltType::from(many.iter().map(scalar_to_bolt).collect::<Vec<BoltType>>()),
    }
}

fn subject_props(subject: &SubjectNode) -> BoltType {
    let mut map = BoltMap::new();
    for (name, values) in &subject.properties {
        map.put(BoltString::from(name.as_str()), scalars_to_bolt(values));
    }
    // Reserved keys win over statement properties of the same name.
    map.put(BoltString::from("id"), BoltType::from(subject.id.0.clone()));
    map.put(BoltString::from("name"), BoltType::from(subject.name.clone()));
    map.put(
        BoltString::from("schema"),
        BoltType::from(subject.schema.0.clone()),
    );
    BoltType::Map(map)
}

fn relation_props(relation: &Relation) -> BoltType {
    let mut map = BoltMap::new();
    for (name, value) in &relation.properties {
        map.put(BoltString::from(name.as_str()), scalar_to_bolt(value));
    }
    map.put(BoltString::from(RELATION_ID_KEY), BoltType::from(relation.id.0.clone()));
    BoltType::Map(map)
}

fn relation_from_neo4j(rel: &neo4rs::Relation, target: String) -> Result<Relation, GraphError> {
    let id: String = rel
        .get(RELATION_ID_KEY)
        .map_err(|e| GraphError::Serialization(format!("Relation without string id: {e}")))?;

    let mut properties = BTreeMap::new();
    for key in rel.keys() {
        if key == RELATION_ID_KEY {
            continue;
        }
        if let Some(value) = scalar_from_relation(rel, &key) {
            properties.insert(key.to_string(), value);
        }
    }

    Ok(Relation {
        id: RelationId(id),
        relation_type: RelationType::new(rel.typ()),
        target: SubjectId(target),
        properties,
    })
}

/// Read a scalar property; list or map properties are not representable.
fn scalar_from_relation(rel: &neo4rs::Relation, key: &str) -> Option<ScalarValue> {
    if let Ok(b) = rel.get::<bool>(key) {
        return Some(ScalarValue::Boolean(b));
    }
    if let Ok(i) = rel.get::<i64>(key) {
        return Some(ScalarValue::Integer(i));
    }
    if let Ok(f) = rel.get::<f64>(key) {
        return Some(ScalarValue::Float(f));
    }
    rel.get::<String>(key).ok().map(ScalarValue::String)
}
