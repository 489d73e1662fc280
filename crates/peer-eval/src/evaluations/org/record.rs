use serde::Deserialize;

use super::super::domain::{DepartmentId, Employee, EmployeeId, PositionId, UnitId};

/// Level assigned when the platform has no position data for an employee.
pub const DEFAULT_POSITION_LEVEL: i32 = 1;

/// Employee row as served by the organization platform `employees/` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OrgEmployeeRecord {
    id: u64,
    #[serde(default)]
    employee_id: Option<String>,
    #[serde(default)]
    name: String,
    department: u64,
    #[serde(default)]
    unit_id: Option<u64>,
    #[serde(default)]
    position: Option<u64>,
    #[serde(default)]
    position_level: Option<i32>,
    #[serde(default)]
    supervisor: Option<u64>,
    #[serde(default)]
    status: Option<String>,
}

impl OrgEmployeeRecord {
    pub(crate) fn into_employee(self) -> Employee {
        let active = self
            .status
            .as_deref()
            .map_or(true, |status| status.trim().eq_ignore_ascii_case("active"));

        Employee {
            id: EmployeeId(self.id),
            employee_number: self.employee_id.unwrap_or_else(|| self.id.to_string()),
            name: self.name,
            department_id: DepartmentId(self.department),
            unit_id: self.unit_id.map(UnitId),
            supervisor_id: self.supervisor.map(EmployeeId),
            position_id: self.position.map(PositionId),
            position_level: self.position_level.unwrap_or(DEFAULT_POSITION_LEVEL),
            active,
        }
    }
}

/// Paged `{"results": [...]}` body or a bare array of records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OrgEmployeePayload {
    Paged { results: Vec<OrgEmployeeRecord> },
    Bare(Vec<OrgEmployeeRecord>),
}

impl OrgEmployeePayload {
    pub(crate) fn into_employees(self) -> Vec<Employee> {
        let records = match self {
            OrgEmployeePayload::Paged { results } => results,
            OrgEmployeePayload::Bare(records) => records,
        };
        records
            .into_iter()
            .map(OrgEmployeeRecord::into_employee)
            .collect()
    }
}
