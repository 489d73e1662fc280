use super::super::domain::Employee;
use super::super::rules::{BandLink, EvaluationRule};

/// Department, unit and level-gap gate applied to automatically generated edges.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionFilter<'a> {
    rule: &'a EvaluationRule,
}

impl<'a> AdmissionFilter<'a> {
    pub fn new(rule: &'a EvaluationRule) -> Self {
        Self { rule }
    }

    pub fn allows(&self, evaluator: &Employee, evaluatee: &Employee) -> bool {
        if !self.rule.allow_cross_department && evaluator.department_id != evaluatee.department_id
        {
            return false;
        }
        if !self.rule.allow_cross_unit && evaluator.unit_id != evaluatee.unit_id {
            return false;
        }
        self.within_level_limit(evaluator, evaluatee)
    }

    pub fn within_level_limit(&self, evaluator: &Employee, evaluatee: &Employee) -> bool {
        evaluator.level_gap(evaluatee) <= self.rule.position_level_diff_limit
    }

    pub fn allows_band_link(&self, link: BandLink, evaluator: &Employee, evaluatee: &Employee) -> bool {
        match link {
            BandLink::Admission => self.allows(evaluator, evaluatee),
            BandLink::SameDepartment => {
                evaluator.department_id == evaluatee.department_id
                    && self.within_level_limit(evaluator, evaluatee)
            }
        }
    }
}

pub fn is_evaluation_allowed(rule: &EvaluationRule, evaluator: &Employee, evaluatee: &Employee) -> bool {
    AdmissionFilter::new(rule).allows(evaluator, evaluatee)
}
