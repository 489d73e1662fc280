use super::super::domain::{Employee, RelationType};
use super::super::org::OrgSnapshot;
use super::super::rules::{EvaluationRule, LevelBand, SuperiorStrategy};
use super::admission::AdmissionFilter;
use super::control::{GenerationError, RunControl};
use super::{EdgeSet, PlannedEdge};

pub(super) fn superior_edges(
    snapshot: &OrgSnapshot,
    rule: &EvaluationRule,
    control: &RunControl,
    edges: &mut EdgeSet,
) -> Result<(), GenerationError> {
    match &rule.superior_strategy {
        SuperiorStrategy::LevelBands { bands } => band_edges(snapshot, rule, bands, control, edges),
        SuperiorStrategy::ReportingLine => reporting_line_edges(snapshot, rule, control, edges),
    }
}

/// Each member of a band evaluates every member of the next, more junior band.
fn band_edges(
    snapshot: &OrgSnapshot,
    rule: &EvaluationRule,
    bands: &[LevelBand],
    control: &RunControl,
    edges: &mut EdgeSet,
) -> Result<(), GenerationError> {
    if bands.len() < 2 {
        return Ok(());
    }

    let members: Vec<Vec<&Employee>> = bands
        .iter()
        .map(|band| {
            snapshot
                .active()
                .filter(|employee| band.contains(employee.position_level))
                .collect()
        })
        .collect();

    let filter = AdmissionFilter::new(rule);
    let weight = rule.relation_weight(RelationType::Superior);

    for evaluatee in snapshot.active() {
        control.check()?;

        let Some(index) = bands
            .iter()
            .position(|band| band.contains(evaluatee.position_level))
        else {
            continue;
        };
        if index == 0 {
            continue;
        }

        let link = bands[index].link;
        for evaluator in &members[index - 1] {
            if evaluator.id == evaluatee.id || !filter.allows_band_link(link, evaluator, evaluatee) {
                continue;
            }
            edges.push(PlannedEdge {
                evaluator_id: evaluator.id,
                evaluatee_id: evaluatee.id,
                relation_type: RelationType::Superior,
                weight,
            });
        }
    }

    Ok(())
}

fn reporting_line_edges(
    snapshot: &OrgSnapshot,
    rule: &EvaluationRule,
    control: &RunControl,
    edges: &mut EdgeSet,
) -> Result<(), GenerationError> {
    let filter = AdmissionFilter::new(rule);
    let weight = rule.relation_weight(RelationType::Superior);

    for evaluatee in snapshot.active() {
        control.check()?;

        let Some(supervisor) = snapshot.supervisor_of(evaluatee) else {
            continue;
        };
        if !supervisor.active || !filter.allows(supervisor, evaluatee) {
            continue;
        }
        edges.push(PlannedEdge {
            evaluator_id: supervisor.id,
            evaluatee_id: evaluatee.id,
            relation_type: RelationType::Superior,
            weight,
        });
    }

    Ok(())
}
