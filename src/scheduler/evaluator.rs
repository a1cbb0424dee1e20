use super::board::Board;
use super::reconcile::{PreferenceMap, Preference};
use super::types::CoverageDeficit;
use super::util;
use crate::model::{MemberId, ShiftKind};
use crate::rule::{Rule, StreakRule};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};

/// Contrainte souple : mesure de violation sur la ligne d'un membre, pondérée.
pub trait SoftConstraint: Send + Sync {
    fn name(&self) -> &'static str;
    fn weight(&self) -> u64;
    /// Unités de violation sur une ligne (un poste par jour).
    fn violation(&self, row: &[ShiftKind]) -> u64;
    /// Vrai si obtenir `kind` un jour donné peut réduire cette violation.
    fn relieved_by(&self, kind: ShiftKind) -> bool;
}

/// Séquences maximales `(début, longueur)` où `pred` est vrai.
fn runs(row: &[ShiftKind], pred: impl Fn(ShiftKind) -> bool) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = None;
    for (idx, kind) in row.iter().enumerate() {
        match (pred(*kind), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                out.push((s, idx - s));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, row.len() - s));
    }
    out
}

/// Jours non-Off parmi les `days` jours qui suivent `end`.
fn missing_off(row: &[ShiftKind], end: usize, days: u32) -> u64 {
    row.iter()
        .skip(end)
        .take(days as usize)
        .filter(|k| **k != ShiftKind::Off)
        .count() as u64
}

fn is_night(kind: ShiftKind) -> bool {
    kind == ShiftKind::Night
}

struct NightStreakMax {
    limit: u32,
    weight: u64,
}

impl SoftConstraint for NightStreakMax {
    fn name(&self) -> &'static str {
        "max_consecutive_night"
    }
    fn weight(&self) -> u64 {
        self.weight
    }
    fn violation(&self, row: &[ShiftKind]) -> u64 {
        runs(row, is_night)
            .into_iter()
            .map(|(_, len)| (len as u64).saturating_sub(u64::from(self.limit)))
            .sum()
    }
    fn relieved_by(&self, kind: ShiftKind) -> bool {
        kind != ShiftKind::Night
    }
}

/// Les séquences touchant le premier ou le dernier jour peuvent déborder du mois : ignorées.
struct NightStreakMin {
    limit: u32,
    weight: u64,
}

impl SoftConstraint for NightStreakMin {
    fn name(&self) -> &'static str {
        "min_consecutive_night"
    }
    fn weight(&self) -> u64 {
        self.weight
    }
    fn violation(&self, row: &[ShiftKind]) -> u64 {
        runs(row, is_night)
            .into_iter()
            .filter(|(start, len)| *start > 0 && start + len < row.len())
            .map(|(_, len)| u64::from(self.limit).saturating_sub(len as u64))
            .sum()
    }
    fn relieved_by(&self, kind: ShiftKind) -> bool {
        kind == ShiftKind::Night
    }
}

struct OffAfterNight {
    days: u32,
    weight: u64,
}

impl SoftConstraint for OffAfterNight {
    fn name(&self) -> &'static str {
        "off_after_night"
    }
    fn weight(&self) -> u64 {
        self.weight
    }
    fn violation(&self, row: &[ShiftKind]) -> u64 {
        runs(row, is_night)
            .into_iter()
            .map(|(start, len)| missing_off(row, start + len, self.days))
            .sum()
    }
    fn relieved_by(&self, kind: ShiftKind) -> bool {
        kind == ShiftKind::Off
    }
}

struct ShiftStreakMax {
    limit: u32,
    weight: u64,
}

impl SoftConstraint for ShiftStreakMax {
    fn name(&self) -> &'static str {
        "max_consecutive_shift"
    }
    fn weight(&self) -> u64 {
        self.weight
    }
    fn violation(&self, row: &[ShiftKind]) -> u64 {
        runs(row, ShiftKind::is_working)
            .into_iter()
            .map(|(_, len)| (len as u64).saturating_sub(u64::from(self.limit)))
            .sum()
    }
    fn relieved_by(&self, kind: ShiftKind) -> bool {
        kind == ShiftKind::Off
    }
}

/// Repos requis après une séquence travaillée atteignant le maximum.
struct OffAfterStreak {
    streak: u32,
    days: u32,
    weight: u64,
}

impl SoftConstraint for OffAfterStreak {
    fn name(&self) -> &'static str {
        "off_after_streak"
    }
    fn weight(&self) -> u64 {
        self.weight
    }
    fn violation(&self, row: &[ShiftKind]) -> u64 {
        runs(row, ShiftKind::is_working)
            .into_iter()
            .filter(|(_, len)| *len >= self.streak as usize)
            .map(|(start, len)| missing_off(row, start + len, self.days))
            .sum()
    }
    fn relieved_by(&self, kind: ShiftKind) -> bool {
        kind == ShiftKind::Off
    }
}

/// Contribution d'une ligne au score global.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RowScore {
    pub(crate) mandatory: u64,
    pub(crate) soft: u64,
    pub(crate) requests: u64,
    pub(crate) honored: u32,
    pub(crate) nights: u64,
}

/// Score comparable : unités de règles obligatoires violées, pénalité totale,
/// puis plus de membres exaucés, puis répartition des nuits la plus homogène
/// (somme des carrés).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Score {
    pub(crate) mandatory: u64,
    pub(crate) penalty: u64,
    pub(crate) honored_members: usize,
    pub(crate) night_squares: u64,
}

impl Score {
    fn key(&self) -> (u64, u64, Reverse<usize>, u64) {
        (
            self.mandatory,
            self.penalty,
            Reverse(self.honored_members),
            self.night_squares,
        )
    }

    /// Palier comparé pour accepter un coup : obligatoire d'abord, puis pénalité.
    pub(crate) fn cost(&self) -> (u64, u64) {
        (self.mandatory, self.penalty)
    }

    fn add(&mut self, row: &RowScore) {
        self.mandatory += row.mandatory;
        self.penalty += row.soft + row.requests;
        self.honored_members += usize::from(row.honored > 0);
        self.night_squares += row.nights * row.nights;
    }

    fn sub(&mut self, row: &RowScore) {
        self.mandatory -= row.mandatory;
        self.penalty -= row.soft + row.requests;
        self.honored_members -= usize::from(row.honored > 0);
        self.night_squares -= row.nights * row.nights;
    }

    /// Score obtenu en remplaçant deux lignes.
    pub(crate) fn replace(&self, old: [&RowScore; 2], new: [&RowScore; 2]) -> Score {
        let mut out = *self;
        old.iter().for_each(|r| out.sub(r));
        new.iter().for_each(|r| out.add(r));
        out
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ce qu'un poste peut soulager : une règle obligatoire passe avant tout poids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Relief {
    pub mandatory: bool,
    pub weight: u64,
}

/// Violation d'une contrainte dure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HardViolation {
    Coverage {
        day: u32,
        kind: ShiftKind,
        required: u32,
        assigned: u32,
    },
    Ineligible {
        member: MemberId,
        day: u32,
        kind: ShiftKind,
    },
    Unassigned {
        member: MemberId,
        day: u32,
    },
}

/// Règle obligatoire (sans priorité) encore violée par un membre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MandatoryBreach {
    pub member_id: MemberId,
    pub rule: String,
    pub units: u64,
}

/// Verdict complet sur un planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub hard_feasible: bool,
    pub hard_violations: Vec<HardViolation>,
    pub mandatory_breaches: Vec<MandatoryBreach>,
    pub soft_penalty: u64,
    pub breakdown: Vec<(String, u64)>,
}

/// Modèle de contraintes d'un service : règles dures, règles obligatoires
/// (palier dominant) et règles souples pondérées.
pub struct Evaluator {
    rule: Rule,
    mandatory: Vec<Box<dyn SoftConstraint>>,
    soft: Vec<Box<dyn SoftConstraint>>,
}

impl Evaluator {
    pub fn new(rule: &Rule) -> Self {
        let mut eval = Self {
            rule: rule.clone(),
            mandatory: Vec::new(),
            soft: Vec::new(),
        };
        // une règle obligatoire compte en unités de violation, d'où le poids 1
        let w = |r: &StreakRule| r.weight().unwrap_or(1);
        if rule.max_consecutive_night.is_enabled() {
            eval.place(
                &rule.max_consecutive_night,
                Box::new(NightStreakMax {
                    limit: rule.max_consecutive_night.limit,
                    weight: w(&rule.max_consecutive_night),
                }),
            );
        }
        if rule.min_consecutive_night.is_enabled() {
            eval.place(
                &rule.min_consecutive_night,
                Box::new(NightStreakMin {
                    limit: rule.min_consecutive_night.limit,
                    weight: w(&rule.min_consecutive_night),
                }),
            );
        }
        if rule.off_after_night.is_enabled() {
            eval.place(
                &rule.off_after_night,
                Box::new(OffAfterNight {
                    days: rule.off_after_night.limit,
                    weight: w(&rule.off_after_night),
                }),
            );
        }
        if rule.max_consecutive_shift.is_enabled() {
            eval.place(
                &rule.max_consecutive_shift,
                Box::new(ShiftStreakMax {
                    limit: rule.max_consecutive_shift.limit,
                    weight: w(&rule.max_consecutive_shift),
                }),
            );
        }
        if rule.off_after_streak.is_enabled() && rule.max_consecutive_shift.is_enabled() {
            eval.place(
                &rule.off_after_streak,
                Box::new(OffAfterStreak {
                    streak: rule.max_consecutive_shift.limit,
                    days: rule.off_after_streak.limit,
                    weight: w(&rule.off_after_streak),
                }),
            );
        }
        eval
    }

    fn place(&mut self, streak: &StreakRule, constraint: Box<dyn SoftConstraint>) {
        if streak.is_mandatory() {
            self.mandatory.push(constraint);
        } else {
            self.soft.push(constraint);
        }
    }

    /// Ajoute une règle souple sans toucher au solveur.
    pub fn with_constraint(mut self, constraint: Box<dyn SoftConstraint>) -> Self {
        self.soft.push(constraint);
        self
    }

    /// Ajoute une règle obligatoire ; seul son nombre d'unités de violation compte.
    pub fn with_mandatory(mut self, constraint: Box<dyn SoftConstraint>) -> Self {
        self.mandatory.push(constraint);
        self
    }

    pub fn soft_penalty(&self, row: &[ShiftKind]) -> u64 {
        self.soft
            .iter()
            .map(|c| c.weight() * c.violation(row))
            .sum()
    }

    pub fn mandatory_units(&self, row: &[ShiftKind]) -> u64 {
        self.mandatory.iter().map(|c| c.violation(row)).sum()
    }

    /// Règle la plus coûteuse que `kind` peut soulager.
    pub fn relief(&self, kind: ShiftKind) -> Relief {
        Relief {
            mandatory: self.mandatory.iter().any(|c| c.relieved_by(kind)),
            weight: self
                .soft
                .iter()
                .filter(|c| c.relieved_by(kind))
                .map(|c| c.weight())
                .max()
                .unwrap_or(0),
        }
    }

    pub(crate) fn row_score(&self, row: &[ShiftKind], prefs: &[&Preference]) -> RowScore {
        let (requests, honored) = prefs.iter().fold((0, 0), |(cost, ok), p| {
            if row[p.day] == p.kind {
                (cost, ok + 1)
            } else {
                (cost + p.weight, ok)
            }
        });
        RowScore {
            mandatory: self.mandatory_units(row),
            soft: self.soft_penalty(row),
            requests,
            honored,
            nights: row.iter().filter(|k| **k == ShiftKind::Night).count() as u64,
        }
    }

    pub(crate) fn row_scores(&self, board: &Board, prefs: &PreferenceMap) -> Vec<RowScore> {
        (0..board.len())
            .map(|m| self.row_score(board.row(m), &prefs.for_member(m)))
            .collect()
    }

    pub(crate) fn total(rows: &[RowScore]) -> Score {
        rows.iter().fold(Score::default(), |mut acc, r| {
            acc.add(r);
            acc
        })
    }

    pub(crate) fn hard_violations(
        &self,
        board: &Board,
        deficits: &[CoverageDeficit],
    ) -> Vec<HardViolation> {
        let mut out = Vec::new();
        for (day, date) in board.dates.iter().enumerate() {
            let day_no = day as u32 + 1;
            let headcount = self.rule.headcount(util::is_weekend(*date));
            for kind in ShiftKind::WORKING {
                let assigned = board.count(day, kind);
                let required = deficits
                    .iter()
                    .find(|d| d.day == day_no && d.kind == kind)
                    .map_or(headcount.for_kind(kind), |d| d.assigned);
                if assigned != required {
                    out.push(HardViolation::Coverage {
                        day: day_no,
                        kind,
                        required,
                        assigned,
                    });
                }
            }
            for (m, member) in board.members.iter().enumerate() {
                let kind = board.get(m, day);
                if kind == ShiftKind::Unassigned {
                    out.push(HardViolation::Unassigned {
                        member: member.id.clone(),
                        day: day_no,
                    });
                } else if !member.can_work(kind) {
                    out.push(HardViolation::Ineligible {
                        member: member.id.clone(),
                        day: day_no,
                        kind,
                    });
                }
            }
        }
        out
    }

    pub(crate) fn mandatory_breaches(&self, board: &Board) -> Vec<MandatoryBreach> {
        let mut out = Vec::new();
        for (m, member) in board.members.iter().enumerate() {
            for c in &self.mandatory {
                let units = c.violation(board.row(m));
                if units > 0 {
                    out.push(MandatoryBreach {
                        member_id: member.id.clone(),
                        rule: c.name().to_string(),
                        units,
                    });
                }
            }
        }
        out
    }

    pub(crate) fn evaluate(&self, board: &Board, deficits: &[CoverageDeficit]) -> Evaluation {
        let hard_violations = self.hard_violations(board, deficits);
        let breakdown: Vec<(String, u64)> = self
            .soft
            .iter()
            .map(|c| {
                let total = (0..board.len())
                    .map(|m| c.weight() * c.violation(board.row(m)))
                    .sum();
                (c.name().to_string(), total)
            })
            .collect();
        Evaluation {
            hard_feasible: hard_violations.is_empty(),
            hard_violations,
            mandatory_breaches: self.mandatory_breaches(board),
            soft_penalty: breakdown.iter().map(|(_, p)| p).sum(),
            breakdown,
        }
    }
}
