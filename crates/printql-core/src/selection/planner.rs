//! Structural analysis: resolves output expressions against the schema.
//!
//! The planner walks every output expression left to right from the common
//! base type, allocating one join path per distinct traversal prefix and one
//! column per attribute read at a path.

use super::layout::{ColumnKind, ColumnLayout, IdentityColumns, JoinPath, PathId};
use crate::catalog::{AttributeDef, AttributeKind, Schema};
use crate::config::SelectionBudget;
use crate::error::{Error, Result};
use crate::exec::ProgramRegistry;
use crate::select::{Element, Select};
use printql_proto::{OutputExpr, Step, TypeId};
use std::collections::HashMap;

/// What a traversal step resolves to.
struct Traversal {
    key: String,
    type_id: TypeId,
    squashable: bool,
    access_checked: bool,
}

/// Planner state shared by all outputs of one statement.
pub(crate) struct Planner<'a> {
    schema: &'a Schema,
    registry: &'a ProgramRegistry,
    budget: &'a SelectionBudget,
    pub(crate) paths: Vec<JoinPath>,
    pub(crate) path_index: HashMap<String, PathId>,
    pub(crate) layout: ColumnLayout,
    pub(crate) instance_selects: Vec<Select>,
}

impl<'a> Planner<'a> {
    /// Create a planner and its root path.
    pub(crate) fn new(
        schema: &'a Schema,
        registry: &'a ProgramRegistry,
        budget: &'a SelectionBudget,
        base_type: TypeId,
    ) -> Self {
        let mut planner = Self {
            schema,
            registry,
            budget,
            paths: Vec::new(),
            path_index: HashMap::new(),
            layout: ColumnLayout::new(),
            instance_selects: Vec::new(),
        };
        planner.add_path(None, String::new(), base_type, false, true);
        planner
    }

    /// Resolve the nearest common base type of the candidate type names.
    pub(crate) fn base_type(schema: &Schema, types: &[String]) -> Result<TypeId> {
        let mut candidates = Vec::with_capacity(types.len());
        for name in types {
            let id = schema
                .resolve(name)
                .ok_or_else(|| Error::mismatch("schema", name.as_str()))?;
            candidates.push(id);
        }
        schema
            .common_ancestor(&candidates)
            .ok_or_else(|| Error::NoCommonType(types.to_vec()))
    }

    fn add_path(
        &mut self,
        parent: Option<PathId>,
        key: String,
        type_id: TypeId,
        squashable: bool,
        access_checked: bool,
    ) -> PathId {
        if let Some(&existing) = self.path_index.get(&key) {
            return existing;
        }
        let path = PathId(self.paths.len());
        let type_name = self.schema.name(type_id).to_string();
        let id = self.layout.push(path, &key, &type_name, ColumnKind::Id);
        let type_column = self
            .schema
            .has_subtypes(type_id)
            .then(|| self.layout.push(path, &key, &type_name, ColumnKind::Type));
        let identity = IdentityColumns {
            id,
            type_column,
            declared: type_id,
        };

        let instance_key = if key.is_empty() {
            "instance".to_string()
        } else {
            format!("{}.instance", key)
        };
        self.instance_selects.push(Select::new(
            instance_key,
            None,
            vec![Element::Instance { path, identity }],
            None,
        ));
        self.path_index.insert(key.clone(), path);
        self.paths.push(JoinPath {
            key,
            parent,
            type_id,
            squashable,
            access_checked,
            identity,
        });
        path
    }

    fn child_key(&self, parent: PathId, step: &str) -> String {
        let parent_key = &self.paths[parent.0].key;
        if parent_key.is_empty() {
            step.to_string()
        } else {
            format!("{}.{}", parent_key, step)
        }
    }

    /// Resolve a link attribute found on `current`; named reverse links fan out.
    fn link_to(&self, current: TypeId, name: &str) -> Result<(Traversal, AttributeDef)> {
        let (_, attribute) = self
            .schema
            .find_attribute(current, name)
            .ok_or_else(|| Error::mismatch(self.schema.name(current), name))?;
        match &attribute.kind {
            AttributeKind::LinkTo { target } => {
                let type_id = self
                    .schema
                    .resolve(target)
                    .ok_or_else(|| Error::mismatch("schema", target.as_str()))?;
                Ok((
                    Traversal {
                        key: format!("linkto[{}]", name),
                        type_id,
                        squashable: false,
                        access_checked: true,
                    },
                    attribute.clone(),
                ))
            }
            AttributeKind::LinkFrom { origin, attribute: link } => {
                let traversal = self.link_from(current, origin, link)?;
                Ok((traversal, attribute.clone()))
            }
            _ => Err(Error::mismatch(self.schema.name(current), name)),
        }
    }

    /// Resolve the records of `origin` whose `link` points at `current`.
    fn link_from(&self, current: TypeId, origin: &str, link: &str) -> Result<Traversal> {
        let origin_id = self
            .schema
            .resolve(origin)
            .ok_or_else(|| Error::mismatch("schema", origin))?;
        let target = match self.schema.find_attribute(origin_id, link) {
            Some((_, AttributeDef {
                kind: AttributeKind::LinkTo { target },
                ..
            })) => self.schema.resolve(target),
            _ => None,
        };
        let compatible = target.map_or(false, |target| {
            self.schema.is_kind_of(current, target) || self.schema.is_kind_of(target, current)
        });
        if !compatible {
            return Err(Error::mismatch(
                self.schema.name(current),
                format!("{}#{}", origin, link),
            ));
        }
        Ok(Traversal {
            key: format!("linkfrom[{}#{}]", origin, link),
            type_id: origin_id,
            squashable: true,
            access_checked: true,
        })
    }

    /// Resolve one output expression into a select.
    pub(crate) fn plan_output(&mut self, expr: &OutputExpr) -> Result<Select> {
        let schema = self.schema;
        let mut current = self.paths[PathId::ROOT.0].type_id;
        let mut path = PathId::ROOT;
        let mut elements: Vec<Element> = Vec::with_capacity(expr.steps.len() + 1);
        let mut attribute: Option<AttributeDef> = None;
        let mut depth = 0usize;

        for step in &expr.steps {
            if step.is_traversal() {
                depth += 1;
                if depth > self.budget.max_depth {
                    return Err(Error::BudgetExceeded(format!(
                        "'{}' traverses more than {} steps",
                        expr, self.budget.max_depth
                    )));
                }
            }
            if step.is_aggregator() {
                close_traversal(&mut elements, path, &self.paths);
            }

            match step {
                Step::Attribute(name) => {
                    let (owner, def) = schema
                        .find_attribute(current, name)
                        .ok_or_else(|| Error::mismatch(schema.name(current), name.as_str()))?;
                    let scalar = def
                        .kind
                        .column_type()
                        .ok_or_else(|| Error::mismatch(schema.name(current), name.as_str()))?;
                    let column = self.layout.attribute(
                        path,
                        &self.paths[path.0].key,
                        schema.name(owner),
                        name,
                    );
                    elements.push(Element::Attribute {
                        attribute: def.clone(),
                        owner,
                        scalar,
                        column,
                        path,
                    });
                    attribute = Some(def.clone());
                }
                Step::LinkTo(name) => {
                    let (traversal, def) = self.link_to(current, name)?;
                    let squashable = traversal.squashable;
                    let target = traversal.type_id;
                    let (next, identity) = self.enter(path, traversal);
                    elements.push(match &def.kind {
                        AttributeKind::LinkFrom { attribute: link, .. } => Element::LinkFrom {
                            origin: target,
                            attribute: link.clone(),
                            path: next,
                            identity,
                        },
                        _ => Element::LinkTo {
                            attribute: name.clone(),
                            path: next,
                            identity,
                        },
                    });
                    attribute = (!squashable).then_some(def);
                    current = target;
                    path = next;
                }
                Step::LinkFrom {
                    type_name,
                    attribute: link,
                } => {
                    let traversal = self.link_from(current, type_name, link)?;
                    let origin = traversal.type_id;
                    let (next, identity) = self.enter(path, traversal);
                    elements.push(Element::LinkFrom {
                        origin,
                        attribute: link.clone(),
                        path: next,
                        identity,
                    });
                    attribute = None;
                    current = origin;
                    path = next;
                }
                Step::Classification(name) => {
                    let classification = schema
                        .find_classification(current, name)
                        .ok_or_else(|| Error::mismatch(schema.name(current), name.as_str()))?;
                    let (next, identity) = self.enter(
                        path,
                        Traversal {
                            key: format!("class[{}]", name),
                            type_id: classification,
                            squashable: true,
                            access_checked: true,
                        },
                    );
                    elements.push(Element::Classification {
                        classification,
                        base: current,
                        path: next,
                        identity,
                    });
                    attribute = None;
                    current = classification;
                    path = next;
                }
                Step::AttributeSet(name) => {
                    let set_type = match schema.find_attribute(current, name) {
                        Some((_, AttributeDef {
                            kind: AttributeKind::AttributeSet { set_type },
                            ..
                        })) => schema.resolve(set_type),
                        _ => None,
                    }
                    .ok_or_else(|| Error::mismatch(schema.name(current), name.as_str()))?;
                    let (next, identity) = self.enter(
                        path,
                        Traversal {
                            key: format!("attributeset[{}]", name),
                            type_id: set_type,
                            squashable: false,
                            access_checked: false,
                        },
                    );
                    elements.push(Element::AttributeSet {
                        set_type,
                        name: name.clone(),
                        path: next,
                        identity,
                    });
                    attribute = None;
                    current = set_type;
                    path = next;
                }
                Step::Instance => {
                    elements.push(Element::Instance {
                        path,
                        identity: self.paths[path.0].identity,
                    });
                    attribute = None;
                }
                Step::Oid => {
                    elements.push(Element::Oid {
                        path,
                        identity: self.paths[path.0].identity,
                    });
                    attribute = None;
                }
                Step::Format(pattern) => elements.push(Element::Format {
                    pattern: pattern.clone(),
                    path,
                }),
                Step::Exec { program, params } => {
                    let program = self
                        .registry
                        .get(program)
                        .ok_or_else(|| Error::UnknownProgram(program.clone()))?;
                    elements.push(Element::Exec {
                        program,
                        params: params.clone(),
                        path,
                    });
                }
                Step::First => elements.push(Element::First),
                Step::Last => elements.push(Element::Last),
                Step::Join(separator) => elements.push(Element::Join(separator.clone())),
            }
        }
        close_traversal(&mut elements, path, &self.paths);

        Ok(Select::new(expr.key(), expr.alias.clone(), elements, attribute))
    }

    fn enter(&mut self, parent: PathId, traversal: Traversal) -> (PathId, IdentityColumns) {
        let key = self.child_key(parent, &traversal.key);
        let path = self.add_path(
            Some(parent),
            key,
            traversal.type_id,
            traversal.squashable,
            traversal.access_checked,
        );
        (path, self.paths[path.0].identity)
    }
}

/// A chain whose last value step is a traversal yields the reached instance.
fn close_traversal(elements: &mut Vec<Element>, path: PathId, paths: &[JoinPath]) {
    if elements.last().map_or(false, Element::is_traversal) {
        elements.push(Element::Instance {
            path,
            identity: paths[path.0].identity,
        });
    }
}
