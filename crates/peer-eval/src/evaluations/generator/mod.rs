//! Evaluator → evaluatee graph construction for one cycle.
//!
//! Planning is pure: it reads an [`OrgSnapshot`] and produces a [`GenerationPlan`]
//! without touching storage, so an aborted run never leaves partial state behind.

mod admission;
mod bands;
mod control;
mod relations;

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use super::domain::{EmployeeId, ManualAssignment, RelationType, TaskKey};
use super::org::OrgSnapshot;
use super::rules::EvaluationRule;

pub use admission::{is_evaluation_allowed, AdmissionFilter};
pub use control::{GenerationError, RunControl};

/// Relations whose evaluator count is checked against `min_evaluators_per_relation`.
const COVERAGE_CHECKED: [RelationType; 3] = [
    RelationType::Peer,
    RelationType::Subordinate,
    RelationType::CrossPeer,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedEdge {
    pub evaluator_id: EmployeeId,
    pub evaluatee_id: EmployeeId,
    pub relation_type: RelationType,
    pub weight: f64,
}

impl PlannedEdge {
    pub fn key(&self) -> TaskKey {
        TaskKey {
            evaluator_id: self.evaluator_id,
            evaluatee_id: self.evaluatee_id,
            relation_type: self.relation_type,
        }
    }
}

/// Evaluatee that received fewer evaluators than the rule asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageShortfall {
    pub evaluatee_id: EmployeeId,
    pub relation_type: RelationType,
    pub assigned: usize,
    pub required: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationPlan {
    pub edges: Vec<PlannedEdge>,
    pub shortfalls: Vec<CoverageShortfall>,
}

/// Insertion-ordered edge list keyed by (evaluator, evaluatee, relation); first edge wins.
#[derive(Debug, Default)]
pub(crate) struct EdgeSet {
    seen: HashSet<TaskKey>,
    edges: Vec<PlannedEdge>,
}

impl EdgeSet {
    pub(crate) fn push(&mut self, edge: PlannedEdge) -> bool {
        if self.seen.insert(edge.key()) {
            self.edges.push(edge);
            true
        } else {
            false
        }
    }

    fn len(&self) -> usize {
        self.edges.len()
    }

    fn into_edges(self) -> Vec<PlannedEdge> {
        self.edges
    }
}

pub struct RelationshipGenerator<'a> {
    snapshot: &'a OrgSnapshot,
    control: &'a RunControl,
}

impl<'a> RelationshipGenerator<'a> {
    pub fn new(snapshot: &'a OrgSnapshot, control: &'a RunControl) -> Self {
        Self { snapshot, control }
    }

    /// Plan the edges for a cycle. Without a rule every supervisor evaluates their reports.
    pub fn plan(
        &self,
        rule: Option<&EvaluationRule>,
        manual: &[ManualAssignment],
    ) -> Result<GenerationPlan, GenerationError> {
        let mut edges = EdgeSet::default();

        let Some(rule) = rule else {
            relations::default_edges(self.snapshot, self.control, &mut edges)?;
            debug!(edges = edges.len(), "planned default supervisor edges");
            return Ok(GenerationPlan {
                edges: edges.into_edges(),
                shortfalls: Vec::new(),
            });
        };

        if rule.enables(RelationType::Manual) {
            relations::manual_edges(manual, self.control, &mut edges)?;
        }

        for relation in &rule.relation_types {
            let before = edges.len();
            match relation {
                RelationType::Manual => continue,
                RelationType::Superior => {
                    bands::superior_edges(self.snapshot, rule, self.control, &mut edges)?
                }
                RelationType::Peer => {
                    relations::peer_edges(self.snapshot, rule, self.control, &mut edges)?
                }
                RelationType::Subordinate => {
                    relations::subordinate_edges(self.snapshot, rule, self.control, &mut edges)?
                }
                RelationType::SelfReview => {
                    relations::self_edges(self.snapshot, rule, self.control, &mut edges)?
                }
                RelationType::CrossSuperior => {}
                RelationType::CrossPeer => {
                    relations::cross_peer_edges(self.snapshot, rule, self.control, &mut edges)?
                }
            }
            debug!(relation = %relation, edges = edges.len() - before, "planned relation edges");
        }

        let edges = edges.into_edges();
        let shortfalls = self.coverage_shortfalls(rule, &edges);
        if !shortfalls.is_empty() {
            warn!(
                rule_id = %rule.id,
                shortfalls = shortfalls.len(),
                minimum = rule.min_evaluators_per_relation,
                "some evaluatees received fewer evaluators than required"
            );
        }

        Ok(GenerationPlan { edges, shortfalls })
    }

    fn coverage_shortfalls(
        &self,
        rule: &EvaluationRule,
        edges: &[PlannedEdge],
    ) -> Vec<CoverageShortfall> {
        let required = rule.min_evaluators_per_relation as usize;
        let mut counts: BTreeMap<(EmployeeId, RelationType), usize> = BTreeMap::new();
        for edge in edges {
            *counts
                .entry((edge.evaluatee_id, edge.relation_type))
                .or_default() += 1;
        }

        let mut shortfalls = Vec::new();
        for relation in COVERAGE_CHECKED {
            if !rule.enables(relation) || !relations::can_produce(rule, relation) {
                continue;
            }
            for evaluatee in self.snapshot.active() {
                let assigned = counts
                    .get(&(evaluatee.id, relation))
                    .copied()
                    .unwrap_or_default();
                if assigned < required {
                    debug!(
                        evaluatee_id = %evaluatee.id,
                        relation = %relation,
                        assigned,
                        required,
                        "coverage shortfall"
                    );
                    shortfalls.push(CoverageShortfall {
                        evaluatee_id: evaluatee.id,
                        relation_type: relation,
                        assigned,
                        required,
                    });
                }
            }
        }
        shortfalls
    }
}
