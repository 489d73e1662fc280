use super::super::domain::{Employee, EvaluationScope, ManualAssignment, RelationType};
use super::super::org::OrgSnapshot;
use super::super::rules::EvaluationRule;
use super::admission::AdmissionFilter;
use super::control::{GenerationError, RunControl};
use super::{EdgeSet, PlannedEdge};

const DEFAULT_SUPERIOR_WEIGHT: f64 = 1.0;

/// False when the rule's flags or scope leave `relation` without any candidate edge.
pub(super) fn can_produce(rule: &EvaluationRule, relation: RelationType) -> bool {
    match relation {
        RelationType::Peer => rule.evaluation_scope != EvaluationScope::Manual,
        RelationType::SelfReview => rule.allow_self_evaluation,
        RelationType::CrossPeer => rule.allow_cross_department,
        RelationType::CrossSuperior => false,
        RelationType::Manual | RelationType::Superior | RelationType::Subordinate => true,
    }
}

/// Supervisor evaluates each active report; used when a cycle has no rule.
pub(super) fn default_edges(
    snapshot: &OrgSnapshot,
    control: &RunControl,
    edges: &mut EdgeSet,
) -> Result<(), GenerationError> {
    for evaluatee in snapshot.active() {
        control.check()?;
        if let Some(supervisor) = snapshot.supervisor_of(evaluatee) {
            if supervisor.active {
                edges.push(PlannedEdge {
                    evaluator_id: supervisor.id,
                    evaluatee_id: evaluatee.id,
                    relation_type: RelationType::Superior,
                    weight: DEFAULT_SUPERIOR_WEIGHT,
                });
            }
        }
    }
    Ok(())
}

/// Manual assignments are copied verbatim with no admission checks.
pub(super) fn manual_edges(
    manual: &[ManualAssignment],
    control: &RunControl,
    edges: &mut EdgeSet,
) -> Result<(), GenerationError> {
    for assignment in manual {
        control.check()?;
        edges.push(PlannedEdge {
            evaluator_id: assignment.evaluator_id,
            evaluatee_id: assignment.evaluatee_id,
            relation_type: assignment.relation_type,
            weight: assignment.weight,
        });
    }
    Ok(())
}

pub(super) fn peer_edges(
    snapshot: &OrgSnapshot,
    rule: &EvaluationRule,
    control: &RunControl,
    edges: &mut EdgeSet,
) -> Result<(), GenerationError> {
    if !can_produce(rule, RelationType::Peer) {
        return Ok(());
    }

    let filter = AdmissionFilter::new(rule);
    for evaluatee in snapshot.active() {
        control.check()?;
        let candidates = snapshot
            .active()
            .filter(|candidate| is_peer_candidate(rule, &filter, candidate, evaluatee))
            .filter(|candidate| filter.allows(candidate, evaluatee));
        push_limited(rule, RelationType::Peer, evaluatee, candidates, edges);
    }
    Ok(())
}

fn is_peer_candidate(
    rule: &EvaluationRule,
    filter: &AdmissionFilter<'_>,
    candidate: &Employee,
    evaluatee: &Employee,
) -> bool {
    if candidate.id == evaluatee.id {
        return false;
    }
    match rule.evaluation_scope {
        EvaluationScope::Department => {
            candidate.department_id == evaluatee.department_id
                && Some(candidate.id) != evaluatee.supervisor_id
                && candidate.supervisor_id == evaluatee.supervisor_id
        }
        EvaluationScope::Unit => {
            candidate.unit_id == evaluatee.unit_id && filter.within_level_limit(candidate, evaluatee)
        }
        EvaluationScope::Company => filter.within_level_limit(candidate, evaluatee),
        EvaluationScope::Manual => false,
    }
}

/// Direct reports of the evaluatee evaluate upwards.
pub(super) fn subordinate_edges(
    snapshot: &OrgSnapshot,
    rule: &EvaluationRule,
    control: &RunControl,
    edges: &mut EdgeSet,
) -> Result<(), GenerationError> {
    let filter = AdmissionFilter::new(rule);
    for evaluatee in snapshot.active() {
        control.check()?;
        let candidates = snapshot
            .direct_reports(evaluatee.id)
            .filter(|report| report.active && filter.allows(report, evaluatee));
        push_limited(rule, RelationType::Subordinate, evaluatee, candidates, edges);
    }
    Ok(())
}

pub(super) fn self_edges(
    snapshot: &OrgSnapshot,
    rule: &EvaluationRule,
    control: &RunControl,
    edges: &mut EdgeSet,
) -> Result<(), GenerationError> {
    if !can_produce(rule, RelationType::SelfReview) {
        return Ok(());
    }

    let weight = rule.relation_weight(RelationType::SelfReview);
    for employee in snapshot.active() {
        control.check()?;
        edges.push(PlannedEdge {
            evaluator_id: employee.id,
            evaluatee_id: employee.id,
            relation_type: RelationType::SelfReview,
            weight,
        });
    }
    Ok(())
}

/// Peers from other departments, excluding direct reporting pairs.
pub(super) fn cross_peer_edges(
    snapshot: &OrgSnapshot,
    rule: &EvaluationRule,
    control: &RunControl,
    edges: &mut EdgeSet,
) -> Result<(), GenerationError> {
    if !can_produce(rule, RelationType::CrossPeer) {
        return Ok(());
    }

    let filter = AdmissionFilter::new(rule);
    for evaluatee in snapshot.active() {
        control.check()?;
        let candidates = snapshot.active().filter(|candidate| {
            candidate.department_id != evaluatee.department_id
                && !candidate.reports_to(evaluatee)
                && !evaluatee.reports_to(candidate)
                && filter.allows(candidate, evaluatee)
        });
        push_limited(rule, RelationType::CrossPeer, evaluatee, candidates, edges);
    }
    Ok(())
}

/// Keep the lowest-id admitted candidates up to the rule's evaluator limit.
fn push_limited<'e>(
    rule: &EvaluationRule,
    relation: RelationType,
    evaluatee: &Employee,
    candidates: impl Iterator<Item = &'e Employee>,
    edges: &mut EdgeSet,
) {
    let mut admitted: Vec<&Employee> = candidates.collect();
    admitted.sort_by_key(|candidate| candidate.id);
    admitted.truncate(rule.evaluator_limit());

    let weight = rule.relation_weight(relation);
    for evaluator in admitted {
        edges.push(PlannedEdge {
            evaluator_id: evaluator.id,
            evaluatee_id: evaluatee.id,
            relation_type: relation,
            weight,
        });
    }
}
