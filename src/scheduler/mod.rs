mod assemble;
mod board;
mod construct;
mod evaluator;
mod reconcile;
mod repair;
mod types;
pub(crate) mod util;

pub use evaluator::{Evaluation, Evaluator, HardViolation, MandatoryBreach, Relief, SoftConstraint};
pub use types::{
    CoverageDeficit, RunInput, RunOutcome, RunParams, RunResult, SchedError,
};

use crate::config::EngineConfig;
use crate::grid::{RunKey, ScheduleGrid};
use crate::guard::{CancelToken, RunRegistry};
use crate::model::Member;
use crate::rule::Rule;
use crate::store::{RunCommit, ScheduleStore};
use board::Board;
use repair::RepairLimits;
use std::collections::{BTreeSet, HashSet};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Scheduler : génère le planning mensuel d'un service
#[derive(Debug, Default)]
pub struct Scheduler {
    config: EngineConfig,
    runs: RunRegistry,
}

impl Scheduler {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            runs: RunRegistry::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn runs(&self) -> &RunRegistry {
        &self.runs
    }

    pub fn generate<S: ScheduleStore + ?Sized>(
        &self,
        store: &S,
        input: &RunInput,
        params: &RunParams,
    ) -> Result<RunResult, SchedError> {
        self.generate_with_cancel(store, input, params, &CancelToken::new())
    }

    /// Run complet : squelette, préférences, amélioration, assemblage puis un seul commit.
    pub fn generate_with_cancel<S: ScheduleStore + ?Sized>(
        &self,
        store: &S,
        input: &RunInput,
        params: &RunParams,
        cancel: &CancelToken,
    ) -> Result<RunResult, SchedError> {
        let rule = validate_input(input)?;
        let dates = util::month_days(params.year, params.month)?;
        let key = RunKey::new(input.ward.clone(), params.year, params.month);
        let _permit = self.runs.try_acquire(key.clone())?;

        if !params.force && store.find_grid(&key)?.is_some() {
            info!(%key, "schedule exists and force is off, run rejected");
            return Ok(RunResult::conflict(&key));
        }

        let started = Instant::now();
        let mut board = Board::new(&input.roster, dates);
        let deficits = construct::build_skeleton(&mut board, rule);

        let evaluator = Evaluator::new(rule);
        let prefs = reconcile::reconcile(
            &board,
            &input.requests,
            params.request_ids.as_deref(),
            params.year,
            params.month,
            &self.config,
        );
        debug!(
            %key,
            preferences = prefs.len(),
            rejected = prefs.rejected.len(),
            "requests reconciled"
        );

        let limits = RepairLimits {
            max_sweeps: self.config.sweep_limit(board.days(), board.len()),
            deadline: self.config.repair_timeout().map(|t| started + t),
        };
        let stats = repair::improve(&mut board, &evaluator, &prefs, limits, cancel)
            .map_err(|_| SchedError::Cancelled(key.clone()))?;

        let violations = evaluator.hard_violations(&board, &deficits);
        if !violations.is_empty() {
            return Err(SchedError::Other(anyhow::anyhow!(
                "internal error: {} hard violation(s) in final grid for {key}",
                violations.len()
            )));
        }

        let breaches = evaluator.mandatory_breaches(&board);
        for breach in &breaches {
            warn!(
                %key,
                member = %breach.member_id,
                rule = %breach.rule,
                units = breach.units,
                "mandatory rule still violated"
            );
        }

        let assembly = assemble::assemble(&board, &input.requests, params.year, params.month)?;
        let grid = board.into_grid(key.clone());
        let member_schedules = grid.member_schedules();
        store.commit(RunCommit {
            grid,
            member_schedules,
            statuses: assembly.statuses,
        })?;

        info!(
            %key,
            sweeps = stats.sweeps,
            moves = stats.accepted,
            capped = stats.capped,
            penalty_before = stats.before,
            penalty_after = stats.after,
            unreflected = assembly.unreflected.len(),
            "schedule generated"
        );

        let count = assembly.unreflected.len();
        let (outcome, mut message) = if deficits.is_empty() {
            (
                RunOutcome::Completed,
                format!("schedule generated for {key}: {count} unreflected request(s)"),
            )
        } else {
            let pairs: Vec<String> = deficits
                .iter()
                .map(|d| format!("day {} {} {}/{}", d.day, d.kind, d.assigned, d.required))
                .collect();
            (
                RunOutcome::CoverageDeficit,
                format!(
                    "coverage deficit for {key} on {} day/shift pair(s): {}",
                    deficits.len(),
                    pairs.join(", ")
                ),
            )
        };
        if !breaches.is_empty() {
            let rules: BTreeSet<&str> = breaches.iter().map(|b| b.rule.as_str()).collect();
            message.push_str(&format!(
                "; {} mandatory rule breach(es): {}",
                breaches.len(),
                rules.into_iter().collect::<Vec<_>>().join(", ")
            ));
        }

        Ok(RunResult {
            message,
            success: outcome == RunOutcome::Completed,
            unreflected_requests_count: count,
            unreflected_requests: assembly.unreflected,
            outcome,
            deficits,
            mandatory_breaches: breaches,
            penalty_before: stats.before,
            penalty_after: stats.after,
            repair_capped: stats.capped,
        })
    }

    /// Évalue un planning existant (contraintes dures + pénalité souple).
    pub fn evaluate(
        &self,
        grid: &ScheduleGrid,
        roster: &[Member],
        rule: &Rule,
    ) -> Result<Evaluation, SchedError> {
        let dates = util::month_days(grid.key.year, grid.key.month)?;
        let board = Board::from_grid(grid, roster, dates)?;
        Ok(Evaluator::new(rule).evaluate(&board, &[]))
    }
}

fn validate_input(input: &RunInput) -> Result<&Rule, SchedError> {
    if input.roster.is_empty() {
        return Err(SchedError::InvalidInput("roster is empty".into()));
    }
    let rule = input
        .rule
        .as_ref()
        .ok_or_else(|| SchedError::InvalidInput("ward has no rule".into()))?;
    rule.validate()?;

    let mut seen = HashSet::new();
    for member in &input.roster {
        if !seen.insert(&member.id) {
            return Err(SchedError::InvalidInput(format!(
                "duplicate member id {}",
                member.id
            )));
        }
    }
    Ok(rule)
}
