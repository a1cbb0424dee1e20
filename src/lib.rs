#![forbid(unsafe_code)]
//! Ward roster : moteur de planning mensuel infirmier (lib + CLI, sans BD).
//!
//! - Squelette glouton respectant les effectifs et les aptitudes.
//! - Règles d'enchaînement pondérées (nuits, repos, séquences).
//! - Demandes de postes réconciliées puis améliorées par échanges locaux.
//! - Rapport des demandes non satisfaites, commit atomique (JSON).

pub mod config;
pub mod grid;
pub mod guard;
pub mod io;
pub mod model;
pub mod rule;
pub mod scheduler;
pub mod store;

pub use config::EngineConfig;
pub use grid::{GridRow, MemberSchedule, RunKey, ScheduleGrid, UnreflectedRequestRecord};
pub use guard::{CancelToken, RunPermit, RunRegistry};
pub use model::{
    Eligibility, Member, MemberId, Request, RequestId, RequestStatus, ShiftKind, WardId,
};
pub use rule::{Headcount, Rule, StreakRule};
pub use scheduler::{
    CoverageDeficit, Evaluation, Evaluator, HardViolation, MandatoryBreach, Relief, RunInput,
    RunOutcome, RunParams, RunResult, SchedError, Scheduler, SoftConstraint,
};
pub use store::{JsonStore, MemoryStore, RunCommit, ScheduleStore, WardBook};
