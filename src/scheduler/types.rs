use crate::grid::{RunKey, UnreflectedRequestRecord};
use crate::model::{Member, Request, RequestId, RequestStatus, ShiftKind, WardId};
use crate::rule::Rule;
use super::evaluator::MandatoryBreach;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Paramètres de déclenchement d'une génération.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParams {
    pub year: i32,
    pub month: u32,
    pub force: bool,
    /// Restreint les demandes activement recherchées ; les autres restent en arrière-plan.
    pub request_ids: Option<Vec<RequestId>>,
}

impl RunParams {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            force: false,
            request_ids: None,
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn only_requests(mut self, ids: Vec<RequestId>) -> Self {
        self.request_ids = Some(ids);
        self
    }
}

/// Instantané des entrées, figé au démarrage du run.
#[derive(Debug, Clone)]
pub struct RunInput {
    pub ward: WardId,
    pub roster: Vec<Member>,
    pub rule: Option<Rule>,
    pub requests: Vec<Request>,
}

/// Manque d'effectif pour un (jour, poste).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageDeficit {
    pub day: u32,
    pub kind: ShiftKind,
    pub required: u32,
    pub assigned: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Completed,
    CoverageDeficit,
    Conflict,
}

/// Résultat d'un run, tel que remonté à l'appelant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub message: String,
    pub success: bool,
    pub unreflected_requests_count: usize,
    pub unreflected_requests: Vec<UnreflectedRequestRecord>,
    pub outcome: RunOutcome,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deficits: Vec<CoverageDeficit>,
    /// Règles obligatoires que la réparation n'a pas pu satisfaire.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mandatory_breaches: Vec<MandatoryBreach>,
    pub penalty_before: u64,
    pub penalty_after: u64,
    /// Réparation arrêtée par le plafond de passes ou l'échéance.
    #[serde(default)]
    pub repair_capped: bool,
}

impl RunResult {
    pub(crate) fn conflict(key: &RunKey) -> Self {
        Self {
            message: format!("schedule already exists for {key}; use force to replace it"),
            success: false,
            unreflected_requests_count: 0,
            unreflected_requests: Vec::new(),
            outcome: RunOutcome::Conflict,
            deficits: Vec::new(),
            mandatory_breaches: Vec::new(),
            penalty_before: 0,
            penalty_after: 0,
            repair_capped: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown shift kind: {0}")]
    UnknownShiftKind(String),
    #[error("unknown member: {0}")]
    UnknownMember(String),
    #[error("illegal request transition {from:?} -> {to:?}")]
    IllegalTransition {
        from: RequestStatus,
        to: RequestStatus,
    },
    #[error("a run is already in progress for {0}")]
    RunInProgress(RunKey),
    #[error("run cancelled for {0}")]
    Cancelled(RunKey),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
