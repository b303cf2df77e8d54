//! Relation reconciliation: three-way diff of a subject's outgoing edges,
//! keyed by the `id` property carried on every relation edge.

use std::collections::{HashMap, HashSet};
use std::ops::AddAssign;

use pagegraph_core::{Relation, RelationId, SubjectId, TypedRelationList};
use pagegraph_graph::GraphTransaction;
use serde::Serialize;

use crate::error::Result;

/// One step of a reconciliation plan.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationAction {
    Create(Relation),
    /// Same type and target, different properties.
    Update(Relation),
    /// Type or target changed: delete the old edge, create the new one.
    Replace(Relation),
    Delete(RelationId),
}

/// The outcome of diffing desired relations against the graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationPlan {
    pub actions: Vec<RelationAction>,
    pub unchanged: u32,
}

impl RelationPlan {
    /// Compute the minimal action set turning `existing` into `target`.
    ///
    /// Deletions come first, then target relations in their declared order.
    pub fn diff(existing: &[Relation], target: &TypedRelationList) -> Self {
        let mut current: HashMap<&RelationId, &Relation> = HashMap::with_capacity(existing.len());
        for relation in existing {
            current.entry(&relation.id).or_insert(relation);
        }

        let mut plan = Self::default();

        let wanted: HashSet<&RelationId> = target.iter().map(|r| &r.id).collect();
        let mut deleted = HashSet::new();
        for relation in existing {
            if !wanted.contains(&relation.id) && deleted.insert(&relation.id) {
                plan.actions.push(RelationAction::Delete(relation.id.clone()));
            }
        }

        for relation in target.iter() {
            let action = match current.get(&relation.id) {
                None => Some(RelationAction::Create(relation.clone())),
                Some(old)
                    if old.relation_type != relation.relation_type
                        || old.target != relation.target =>
                {
                    Some(RelationAction::Replace(relation.clone()))
                }
                Some(old) if old.properties != relation.properties => {
                    Some(RelationAction::Update(relation.clone()))
                }
                Some(_) => None,
            };

            match action {
                Some(action) => plan.actions.push(action),
                None => plan.unchanged += 1,
            }
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Counters describing what a reconciliation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelationChanges {
    pub created: u32,
    pub updated: u32,
    pub replaced: u32,
    pub deleted: u32,
    pub unchanged: u32,
    /// Creations skipped because the source or target subject is missing.
    pub skipped: u32,
}

impl RelationChanges {
    /// Number of edge writes performed.
    pub fn churn(&self) -> u32 {
        self.created + self.updated + self.replaced + self.deleted
    }
}

impl AddAssign for RelationChanges {
    fn add_assign(&mut self, other: Self) {
        self.created += other.created;
        self.updated += other.updated;
        self.replaced += other.replaced;
        self.deleted += other.deleted;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RelationReconciler;

impl RelationReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Bring the outgoing edges of `source` in line with `target`, inside
    /// the caller's transaction.
    pub async fn reconcile(
        &self,
        txn: &mut dyn GraphTransaction,
        source: &SubjectId,
        target: &TypedRelationList,
    ) -> Result<RelationChanges> {
        let existing = txn.outgoing_relations(source).await?;
        let plan = RelationPlan::diff(&existing, target);

        let mut changes = RelationChanges {
            unchanged: plan.unchanged,
            ..Default::default()
        };

        for action in &plan.actions {
            match action {
                RelationAction::Create(relation) => {
                    if txn.create_relation(source, relation).await? {
                        changes.created += 1;
                    } else {
                        tracing::debug!(
                            source = %source,
                            target = %relation.target,
                            relation = %relation.id,
                            "Skipping relation to missing subject"
                        );
                        changes.skipped += 1;
                    }
                }
                RelationAction::Update(relation) => {
                    txn.update_relation(source, relation).await?;
                    changes.updated += 1;
                }
                RelationAction::Replace(relation) => {
                    txn.delete_relation(source, &relation.id).await?;
                    if txn.create_relation(source, relation).await? {
                        changes.replaced += 1;
                    } else {
                        changes.deleted += 1;
                        changes.skipped += 1;
                    }
                }
                RelationAction::Delete(id) => {
                    txn.delete_relation(source, id).await?;
                    changes.deleted += 1;
                }
            }
        }

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagegraph_core::{RelationType, ScalarValue};

    fn rel(id: &str, ty: &str, target: &str) -> Relation {
        Relation {
            id: RelationId::from(id),
            relation_type: RelationType::from(ty),
            target: SubjectId::from(target),
            properties: Default::default(),
        }
    }

    #[test]
    fn test_identical_sets_plan_nothing() {
        let existing = vec![rel("r1", "KNOWS", "b"), rel("r2", "LIKES", "c")];
        let plan = RelationPlan::diff(&existing, &TypedRelationList::new(existing.clone()));

        assert!(plan.is_empty());
        assert_eq!(plan.unchanged, 2);
    }

    #[test]
    fn test_three_way_diff() {
        let existing = vec![rel("keep", "KNOWS", "b"), rel("gone", "KNOWS", "c")];
        let target = TypedRelationList::new(vec![rel("keep", "KNOWS", "b"), rel("new", "LIKES", "d")]);

        let plan = RelationPlan::diff(&existing, &target);
        assert_eq!(
            plan.actions,
            vec![
                RelationAction::Delete(RelationId::from("gone")),
                RelationAction::Create(rel("new", "LIKES", "d")),
            ]
        );
        assert_eq!(plan.unchanged, 1);
    }

    #[test]
    fn test_type_or_target_change_is_replace() {
        let existing = vec![rel("r1", "KNOWS", "b"), rel("r2", "KNOWS", "b")];
        let target = TypedRelationList::new(vec![rel("r1", "LIKES", "b"), rel("r2", "KNOWS", "c")]);

        let plan = RelationPlan::diff(&existing, &target);
        assert_eq!(
            plan.actions,
            vec![
                RelationAction::Replace(rel("r1", "LIKES", "b")),
                RelationAction::Replace(rel("r2", "KNOWS", "c")),
            ]
        );
    }

    #[test]
    fn test_property_change_is_update() {
        let existing = vec![rel("r1", "KNOWS", "b")];
        let mut changed = rel("r1", "KNOWS", "b");
        changed
            .properties
            .insert("since".into(), ScalarValue::Integer(2020));

        let plan = RelationPlan::diff(&existing, &TypedRelationList::new(vec![changed.clone()]));
        assert_eq!(plan.actions, vec![RelationAction::Update(changed)]);
        assert_eq!(plan.unchanged, 0);
    }

    #[test]
    fn test_user_id_property_does_not_force_update() {
        let existing = vec![rel("r1", "KNOWS", "b")];
        let mut incoming = rel("r1", "KNOWS", "b");
        incoming
            .properties
            .insert("id".into(), ScalarValue::from("custom"));

        let plan = RelationPlan::diff(&existing, &TypedRelationList::new(vec![incoming]));
        assert!(plan.is_empty());
        assert_eq!(plan.unchanged, 1);
    }

    #[test]
    fn test_duplicate_graph_edges_deleted_once() {
        let existing = vec![rel("dup", "KNOWS", "b"), rel("dup", "KNOWS", "b")];
        let plan = RelationPlan::diff(&existing, &TypedRelationList::default());
        assert_eq!(plan.actions, vec![RelationAction::Delete(RelationId::from("dup"))]);
    }

    #[test]
    fn test_changes_accumulate() {
        let mut total = RelationChanges {
            created: 1,
            unchanged: 2,
            ..Default::default()
        };
        total += RelationChanges {
            deleted: 3,
            skipped: 1,
            ..Default::default()
        };
        assert_eq!(total.churn(), 4);
        assert_eq!(total.unchanged, 2);
        assert_eq!(total.skipped, 1);
    }
}
