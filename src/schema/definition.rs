//! Structured entity definitions
//!
//! Entities declare relations and permissions; permissions are rule trees of
//! `and`/`or` rewrites over relation references. [`Schema::from_definitions`]
//! lowers them into the flat declaration/relationship document.
//!
//! Id scheme: `entity:<e>`, `entity:<e>:relation:<r>`, `entity:<e>:permission:<p>`
//! and `entity:<e>:permission:<p>:logic:<path>` for rewrite nodes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{Declaration, Relationship, Schema};
use crate::error::SchemaError;
use crate::graph::EdgeKind;

/// Subject type used when a relation has no direct (non-`#`) reference.
pub const DEFAULT_SUBJECT: &str = "user";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    #[serde(default)]
    pub relations: Vec<RelationDefinition>,
    #[serde(default)]
    pub permissions: Vec<PermissionDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDefinition {
    pub name: String,
    /// Allowed subjects, e.g. `user` or `organization#member`.
    #[serde(default)]
    pub references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    pub name: String,
    pub rule: Rule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOp {
    And,
    Or,
}

impl RuleOp {
    pub fn label(&self) -> &'static str {
        match self {
            RuleOp::And => "AND",
            RuleOp::Or => "OR",
        }
    }
}

/// Permission rule tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// `owner` (same entity) or `parent.admin` (through the `parent` relation).
    Leaf {
        reference: String,
        #[serde(default)]
        exclusion: bool,
    },
    Rewrite { op: RuleOp, children: Vec<Rule> },
}

impl Rule {
    pub fn leaf(reference: impl Into<String>) -> Self {
        Rule::Leaf {
            reference: reference.into(),
            exclusion: false,
        }
    }

    pub fn not(reference: impl Into<String>) -> Self {
        Rule::Leaf {
            reference: reference.into(),
            exclusion: true,
        }
    }

    pub fn and(children: Vec<Rule>) -> Self {
        Rule::Rewrite {
            op: RuleOp::And,
            children,
        }
    }

    pub fn or(children: Vec<Rule>) -> Self {
        Rule::Rewrite {
            op: RuleOp::Or,
            children,
        }
    }
}

impl RelationDefinition {
    pub fn new(name: impl Into<String>, references: &[&str]) -> Self {
        Self {
            name: name.into(),
            references: references.iter().map(|r| r.to_string()).collect(),
        }
    }

    /// Entity type a tuple through this relation points at.
    pub fn main_reference(&self) -> &str {
        self.references
            .iter()
            .find(|r| !r.contains('#'))
            .map(String::as_str)
            .unwrap_or(DEFAULT_SUBJECT)
    }
}

pub fn entity_id(entity: &str) -> String {
    format!("entity:{}", entity)
}

pub fn relation_id(entity: &str, relation: &str) -> String {
    format!("entity:{}:relation:{}", entity, relation)
}

pub fn permission_id(entity: &str, permission: &str) -> String {
    format!("entity:{}:permission:{}", entity, permission)
}

impl EntityDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relations: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn with_relation(mut self, relation: RelationDefinition) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn with_permission(mut self, name: impl Into<String>, rule: Rule) -> Self {
        self.permissions.push(PermissionDefinition {
            name: name.into(),
            rule,
        });
        self
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDefinition> {
        self.relations.iter().find(|r| r.name == name)
    }

    fn has_permission(&self, name: &str) -> bool {
        self.permissions.iter().any(|p| p.name == name)
    }

    /// Id of a relation or permission named `name` on this entity.
    fn element_id(&self, name: &str) -> Option<String> {
        if self.relation(name).is_some() {
            Some(relation_id(&self.name, name))
        } else if self.has_permission(name) {
            Some(permission_id(&self.name, name))
        } else {
            None
        }
    }
}

impl Schema {
    /// Lower structured entity definitions into a schema document.
    pub fn from_definitions(entities: &[EntityDefinition]) -> Result<Schema, SchemaError> {
        let mut seen = HashSet::new();
        for entity in entities {
            if !seen.insert(entity.name.as_str()) {
                return Err(SchemaError::DuplicateEntity(entity.name.clone()));
            }
        }

        let mut lowering = Lowering {
            entities,
            schema: Schema::new(),
        };
        for entity in entities {
            lowering.entity(entity)?;
        }

        tracing::debug!(
            entities = entities.len(),
            declarations = lowering.schema.schema.len(),
            relationships = lowering.schema.relationships.len(),
            "lowered entity definitions"
        );
        Ok(lowering.schema)
    }
}

struct Lowering<'a> {
    entities: &'a [EntityDefinition],
    schema: Schema,
}

impl Lowering<'_> {
    fn declare(&mut self, id: &str, kind: &str, label: &str) {
        self.schema.schema.insert(
            id.to_string(),
            Declaration::Detailed {
                kind: kind.to_string(),
                label: Some(label.to_string()),
                weight: None,
            },
        );
    }

    fn edge(&mut self, source: &str, target: &str, kind: EdgeKind, exclusion: bool) {
        let mut relationship = Relationship::new(source, target).with_kind(kind);
        relationship.exclusion = exclusion;
        self.schema.relationships.push(relationship);
    }

    fn entity(&mut self, entity: &EntityDefinition) -> Result<(), SchemaError> {
        let en_id = entity_id(&entity.name);
        self.declare(&en_id, "entity", &entity.name);

        for relation in &entity.relations {
            let re_id = relation_id(&entity.name, &relation.name);
            self.declare(&re_id, "relation", &relation.name);
            self.edge(&en_id, &re_id, EdgeKind::Membership, false);
        }

        for permission in &entity.permissions {
            let pe_id = permission_id(&entity.name, &permission.name);
            self.declare(&pe_id, "permission", &permission.name);
            self.edge(&en_id, &pe_id, EdgeKind::Grants, false);
            self.rule(entity, &pe_id, &pe_id, &permission.rule, "0")?;
        }
        Ok(())
    }

    fn rule(
        &mut self,
        entity: &EntityDefinition,
        permission: &str,
        from: &str,
        rule: &Rule,
        path: &str,
    ) -> Result<(), SchemaError> {
        match rule {
            Rule::Rewrite { op, children } => {
                let logic_id = format!("{}:logic:{}", permission, path);
                self.declare(&logic_id, "logic", op.label());
                self.edge(from, &logic_id, EdgeKind::Composes, false);
                for (i, child) in children.iter().enumerate() {
                    let child_path = format!("{}.{}", path, i);
                    self.rule(entity, permission, &logic_id, child, &child_path)?;
                }
                Ok(())
            }
            Rule::Leaf {
                reference,
                exclusion,
            } => {
                let target = self.resolve_leaf(entity, reference)?;
                self.edge(from, &target, EdgeKind::Composes, *exclusion);
                Ok(())
            }
        }
    }

    fn resolve_leaf(&self, entity: &EntityDefinition, reference: &str) -> Result<String, SchemaError> {
        let not_found = |relation: &str| SchemaError::RelationNotFound {
            entity: entity.name.clone(),
            relation: relation.to_string(),
        };

        match reference.split_once('.') {
            Some((tuple_set, computed)) => {
                let relation = entity.relation(tuple_set).ok_or_else(|| not_found(tuple_set))?;
                let target_entity = relation.main_reference();
                // Unknown target entities resolve to a relation id; the builder reports it.
                Ok(self
                    .entities
                    .iter()
                    .find(|e| e.name == target_entity)
                    .and_then(|e| e.element_id(computed))
                    .unwrap_or_else(|| relation_id(target_entity, computed)))
            }
            None => entity.element_id(reference).ok_or_else(|| not_found(reference)),
        }
    }
}
