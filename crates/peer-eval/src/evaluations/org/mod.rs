//! Organization snapshot consumed by one generation run.

mod client;
mod export;
mod record;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::domain::{Employee, EmployeeId};

pub use client::OrgPlatformClient;
pub use export::OrgExportFile;
pub use record::DEFAULT_POSITION_LEVEL;

/// Source of the flat employee list.
#[async_trait]
pub trait OrgSnapshotProvider: Send + Sync {
    async fn fetch_employees(&self) -> Result<Vec<Employee>, OrgFetchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum OrgFetchError {
    #[error("organization platform did not answer within {0:?}")]
    Timeout(Duration),
    #[error("organization platform request failed: {0}")]
    Transport(String),
    #[error("organization platform returned HTTP {0}")]
    Status(u16),
    #[error("organization payload could not be decoded: {0}")]
    Decode(String),
    #[error("organization export could not be read: {0}")]
    Io(#[from] std::io::Error),
}

/// Fixed employee list, used by the CLI demo and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticOrgProvider {
    employees: Vec<Employee>,
}

impl StaticOrgProvider {
    pub fn new(employees: Vec<Employee>) -> Self {
        Self { employees }
    }
}

#[async_trait]
impl OrgSnapshotProvider for StaticOrgProvider {
    async fn fetch_employees(&self) -> Result<Vec<Employee>, OrgFetchError> {
        Ok(self.employees.clone())
    }
}

/// Indexed, read-only view of the organization for one run.
#[derive(Debug, Clone, Default)]
pub struct OrgSnapshot {
    employees: BTreeMap<EmployeeId, Employee>,
    reports: BTreeMap<EmployeeId, Vec<EmployeeId>>,
}

impl OrgSnapshot {
    /// Index employees by id. Supervisor references to unknown ids are dropped.
    pub fn from_employees(employees: Vec<Employee>) -> Self {
        let mut by_id: BTreeMap<EmployeeId, Employee> = employees
            .into_iter()
            .map(|employee| (employee.id, employee))
            .collect();

        let known: BTreeSet<EmployeeId> = by_id.keys().copied().collect();
        for employee in by_id.values_mut() {
            if let Some(supervisor_id) = employee.supervisor_id {
                if supervisor_id == employee.id || !known.contains(&supervisor_id) {
                    debug!(
                        employee_id = %employee.id,
                        supervisor_id = %supervisor_id,
                        "dropping unresolvable supervisor reference"
                    );
                    employee.supervisor_id = None;
                }
            }
        }

        let mut reports: BTreeMap<EmployeeId, Vec<EmployeeId>> = BTreeMap::new();
        for employee in by_id.values() {
            if let Some(supervisor_id) = employee.supervisor_id {
                reports.entry(supervisor_id).or_default().push(employee.id);
            }
        }

        Self {
            employees: by_id,
            reports,
        }
    }

    pub fn len(&self) -> usize {
        self.employees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }

    pub fn get(&self, id: EmployeeId) -> Option<&Employee> {
        self.employees.get(&id)
    }

    pub fn contains(&self, id: EmployeeId) -> bool {
        self.employees.contains_key(&id)
    }

    pub fn employees(&self) -> impl Iterator<Item = &Employee> {
        self.employees.values()
    }

    /// Active employees in ascending id order.
    pub fn active(&self) -> impl Iterator<Item = &Employee> {
        self.employees.values().filter(|employee| employee.active)
    }

    pub fn supervisor_of(&self, employee: &Employee) -> Option<&Employee> {
        employee
            .supervisor_id
            .and_then(|supervisor_id| self.employees.get(&supervisor_id))
    }

    /// Direct reports in ascending id order, active or not.
    pub fn direct_reports(&self, id: EmployeeId) -> impl Iterator<Item = &Employee> {
        self.reports
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|report| self.employees.get(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluations::domain::DepartmentId;

    fn employee(id: u64, supervisor: Option<u64>) -> Employee {
        Employee {
            id: EmployeeId(id),
            employee_number: format!("E{id:03}"),
            name: format!("Employee {id}"),
            department_id: DepartmentId(1),
            unit_id: None,
            supervisor_id: supervisor.map(EmployeeId),
            position_id: None,
            position_level: 1,
            active: true,
        }
    }

    #[test]
    fn unknown_supervisors_are_dropped() {
        let snapshot =
            OrgSnapshot::from_employees(vec![employee(1, None), employee(2, Some(99))]);
        let orphan = snapshot.get(EmployeeId(2)).expect("employee present");
        assert!(orphan.supervisor_id.is_none());
        assert!(snapshot.supervisor_of(orphan).is_none());
    }

    #[test]
    fn direct_reports_follow_the_adjacency_map() {
        let snapshot = OrgSnapshot::from_employees(vec![
            employee(1, Some(4)),
            employee(2, Some(1)),
            employee(3, Some(1)),
            employee(4, Some(2)),
        ]);
        let direct: Vec<_> = snapshot
            .direct_reports(EmployeeId(1))
            .map(|report| report.id)
            .collect();
        assert_eq!(direct, vec![EmployeeId(2), EmployeeId(3)]);
        let nested: Vec<_> = snapshot
            .direct_reports(EmployeeId(2))
            .map(|report| report.id)
            .collect();
        assert_eq!(nested, vec![EmployeeId(4)]);
    }
}
