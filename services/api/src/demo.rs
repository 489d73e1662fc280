use crate::infra::{load_rule, parse_date, seed_catalogue, seed_cycle, DEFAULT_CYCLE_RULE};
use chrono::{Local, NaiveDate};
use clap::Args;
use peer_eval::error::AppError;
use peer_eval::evaluations::{
    CycleId, CycleStats, DepartmentId, Employee, EmployeeId, EvaluationResult, EvaluationService,
    EvaluationServiceError, EvaluationStore, EvaluationTask, GenerationOutcome,
    InMemoryEvaluationStore, IndicatorId, OrgExportFile, PositionId, PositionWeight, RuleId,
    ScoreSubmission, StaticOrgProvider,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

const CLI_CYCLE: CycleId = CycleId(1);
const AUTHORED_RULE_ID: RuleId = RuleId(100);

#[derive(Args, Debug)]
pub(crate) struct GenerateArgs {
    /// Employee export (JSON) saved from the organization platform
    #[arg(long)]
    pub(crate) org_export: PathBuf,
    /// Rule definition (JSON). Without one each supervisor evaluates their reports.
    #[arg(long)]
    pub(crate) rule: Option<PathBuf>,
    /// Cycle start date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Print the outcome and task list as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Built-in rule to apply (1 superior only, 2 360 review, 3 peer review, 4 cross-department)
    #[arg(long)]
    pub(crate) rule: Option<u64>,
    /// Cycle start date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Include the generated task listing in the output
    #[arg(long)]
    pub(crate) list_tasks: bool,
}

#[derive(Serialize)]
struct GenerateReport<'a> {
    outcome: &'a GenerationOutcome,
    tasks: &'a [EvaluationTask],
}

pub(crate) async fn run_generate(args: GenerateArgs) -> Result<(), AppError> {
    let GenerateArgs {
        org_export,
        rule,
        start,
        json,
    } = args;

    let store = Arc::new(InMemoryEvaluationStore::new());
    seed_catalogue(store.as_ref())?;
    let service = EvaluationService::new(store.clone(), Arc::new(OrgExportFile::new(&org_export)));

    let rule_id = match rule {
        Some(path) => Some(service.create_rule(load_rule(&path)?, AUTHORED_RULE_ID)?.id),
        None => None,
    };
    let start = start.unwrap_or_else(|| Local::now().date_naive());
    seed_cycle(store.as_ref(), CLI_CYCLE, start, rule_id)?;

    let outcome = service.generate_tasks(CLI_CYCLE).await?;
    let tasks = service.cycle_tasks(CLI_CYCLE)?;

    if json {
        let report = GenerateReport {
            outcome: &outcome,
            tasks: &tasks,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Evaluation Task Generation");
    println!("==========================");
    println!("Org export      : {}", org_export.display());
    match rule_id {
        Some(id) => println!("Rule            : #{id}"),
        None => println!("Rule            : none (supervisor evaluates reports)"),
    }
    render_outcome(&outcome);
    render_tasks(&tasks, &BTreeMap::new());
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let summary = run_cycle(&args).await?;

    println!("Peer Evaluation Demo");
    println!("====================");
    println!("Rule            : #{}", summary.rule_id);
    render_outcome(&summary.outcome);
    if args.list_tasks {
        render_tasks(&summary.tasks, &summary.names);
    }

    println!();
    println!("Ranked results");
    println!("--------------");
    for result in &summary.results {
        println!(
            "#{:<2} {:<18} weighted {:>6.2}  total {:>6.2}  superior {:>6}  peer {:>6}  subordinate {:>6}",
            result.rank,
            display_name(&summary.names, result.employee_id),
            result.weighted_score,
            result.total_score,
            format_subscore(result.superior_score),
            format_subscore(result.peer_score),
            format_subscore(result.subordinate_score),
        );
    }

    println!();
    println!(
        "Tasks: {} total, {} completed, {} pending. Results finalized: {}.",
        summary.stats.total_tasks,
        summary.stats.completed_tasks,
        summary.stats.pending_tasks,
        summary.stats.total_results
    );
    Ok(())
}

struct DemoSummary {
    rule_id: RuleId,
    outcome: GenerationOutcome,
    tasks: Vec<EvaluationTask>,
    results: Vec<EvaluationResult>,
    stats: CycleStats,
    names: BTreeMap<EmployeeId, String>,
}

async fn run_cycle(args: &DemoArgs) -> Result<DemoSummary, AppError> {
    let employees = demo_organization();
    let names = employees
        .iter()
        .map(|employee| (employee.id, employee.name.clone()))
        .collect();

    let store = Arc::new(InMemoryEvaluationStore::new());
    seed_catalogue(store.as_ref())?;
    store
        .upsert_position_weight(PositionWeight {
            position_id: PositionId(1),
            multiplier: 1.2,
            active: true,
        })
        .map_err(EvaluationServiceError::from)?;

    let rule_id = args.rule.map(RuleId).unwrap_or(DEFAULT_CYCLE_RULE);
    let start = args.start.unwrap_or_else(|| Local::now().date_naive());
    seed_cycle(store.as_ref(), CLI_CYCLE, start, Some(rule_id))?;

    let service = EvaluationService::new(store, Arc::new(StaticOrgProvider::new(employees)));
    let outcome = service.generate_tasks(CLI_CYCLE).await?;
    let tasks = service.cycle_tasks(CLI_CYCLE)?;

    // Evaluators work through their queue by code, as they would in the portal.
    let mut by_code: BTreeMap<&str, Vec<&EvaluationTask>> = BTreeMap::new();
    for task in &tasks {
        by_code
            .entry(task.evaluation_code.as_str())
            .or_default()
            .push(task);
    }
    for queue in by_code.values() {
        for task in queue {
            service.submit_task_scores(task.id, demo_scores(task))?;
        }
    }

    service.calculate_cycle_results(CLI_CYCLE)?;
    service.finalize_cycle_results(CLI_CYCLE)?;

    Ok(DemoSummary {
        rule_id,
        outcome,
        results: service.cycle_results(CLI_CYCLE)?,
        stats: service.cycle_stats(CLI_CYCLE)?,
        tasks,
        names,
    })
}

/// Deterministic 60..=99 scores so repeated demo runs rank identically.
fn demo_scores(task: &EvaluationTask) -> Vec<ScoreSubmission> {
    (1..=5)
        .map(|indicator| {
            let spread = (task.evaluatee_id.0 * 7 + task.evaluator_id.0 * 3 + indicator * 5) % 40;
            ScoreSubmission {
                indicator_id: IndicatorId(indicator),
                score: 60 + spread as i32,
                comment: String::new(),
            }
        })
        .collect()
}

fn demo_organization() -> Vec<Employee> {
    let member = |id: u64, name: &str, department: u64, supervisor: Option<u64>, level: i32| {
        Employee {
            id: EmployeeId(id),
            employee_number: format!("D{id:03}"),
            name: name.to_string(),
            department_id: DepartmentId(department),
            unit_id: None,
            supervisor_id: supervisor.map(EmployeeId),
            position_id: Some(PositionId(match level {
                level if level >= 12 => 1,
                9..=11 => 2,
                _ => 3,
            })),
            position_level: level,
            active: true,
        }
    };

    let mut departed = member(9, "Jordan Park", 2, Some(2), 4);
    departed.active = false;

    vec![
        member(1, "Avery Chen", 2, None, 12),
        member(2, "Blake Rivera", 2, Some(1), 9),
        member(3, "Casey Morgan", 2, Some(1), 9),
        member(4, "Devon Shah", 2, Some(2), 4),
        member(5, "Emery Brooks", 2, Some(2), 4),
        member(6, "Finley Ortiz", 2, Some(3), 4),
        member(7, "Gray Lee", 2, Some(3), 4),
        member(8, "Harper Quinn", 3, Some(1), 9),
        departed,
        member(10, "Indy Patel", 3, Some(8), 4),
        member(11, "Jules Novak", 3, Some(8), 4),
    ]
}

fn render_outcome(outcome: &GenerationOutcome) {
    println!("Cycle           : #{}", outcome.cycle_id);
    println!("Tasks created   : {}", outcome.tasks_created);
    println!("Evaluators      : {}", outcome.evaluators);
    if !outcome.shortfalls.is_empty() {
        println!("Coverage gaps   : {}", outcome.shortfalls.len());
        for gap in &outcome.shortfalls {
            println!(
                "  - employee #{} has {}/{} {} evaluators",
                gap.evaluatee_id, gap.assigned, gap.required, gap.relation_type
            );
        }
    }
}

fn render_tasks(tasks: &[EvaluationTask], names: &BTreeMap<EmployeeId, String>) {
    println!();
    println!("Tasks");
    println!("-----");
    for task in tasks {
        println!(
            "{:<16} {:<18} -> {:<18} {:<14} weight {:.2}  [{}]",
            task.evaluation_code,
            display_name(names, task.evaluator_id),
            display_name(names, task.evaluatee_id),
            task.relation_type,
            task.weight,
            task.status
        );
    }
}

fn display_name(names: &BTreeMap<EmployeeId, String>, id: EmployeeId) -> String {
    names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| format!("employee #{id}"))
}

fn format_subscore(score: Option<f64>) -> String {
    score.map_or_else(|| "-".to_string(), |value| format!("{value:.2}"))
}
