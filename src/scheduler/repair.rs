use super::board::Board;
use super::evaluator::{Evaluator, RowScore, Score};
use super::reconcile::{Preference, PreferenceMap};
use crate::guard::CancelToken;
use std::cmp::Reverse;
use std::time::Instant;
use tracing::debug;

/// Bornes de la passe d'amélioration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RepairLimits {
    pub(crate) max_sweeps: usize,
    pub(crate) deadline: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RepairStats {
    pub(crate) sweeps: usize,
    pub(crate) accepted: usize,
    pub(crate) before: u64,
    pub(crate) after: u64,
    /// Plafond de passes ou échéance atteint : le planning courant est gardé.
    pub(crate) capped: bool,
}

/// Annulation demandée entre deux passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Aborted;

/// Candidat d'échange sur un jour : score obtenu et lignes recalculées.
struct Move {
    day: usize,
    a: usize,
    b: usize,
    score: Score,
    rows: [RowScore; 2],
}

struct Search<'a> {
    board: &'a mut Board,
    evaluator: &'a Evaluator,
    prefs: &'a PreferenceMap,
    rows: Vec<RowScore>,
    score: Score,
}

impl Search<'_> {
    fn propose(&mut self, day: usize, a: usize, b: usize) -> Option<Move> {
        if a == b || !self.board.swap_allowed(day, a, b) {
            return None;
        }
        self.board.swap(day, a, b);
        let ra = self
            .evaluator
            .row_score(self.board.row(a), &self.prefs.for_member(a));
        let rb = self
            .evaluator
            .row_score(self.board.row(b), &self.prefs.for_member(b));
        self.board.swap(day, a, b);
        let score = self
            .score
            .replace([&self.rows[a], &self.rows[b]], [&ra, &rb]);
        Some(Move {
            day,
            a,
            b,
            score,
            rows: [ra, rb],
        })
    }

    /// Meilleur échange acceptable de `member` le jour `day` parmi `partners`
    /// (premier gardé à égalité).
    fn best(
        &mut self,
        day: usize,
        member: usize,
        partners: &[usize],
        claim: Option<&Preference>,
    ) -> Option<Move> {
        let mut best: Option<Move> = None;
        for &other in partners {
            if let Some(mv) = self.propose(day, member, other) {
                let better = best.as_ref().map_or(true, |b| mv.score < b.score);
                if better && self.acceptable(&mv, claim) {
                    best = Some(mv);
                }
            }
        }
        best
    }

    /// Un coup doit baisser strictement le coût (obligatoire puis pénalité).
    /// À coût égal, une demande mieux classée reprend le poste d'une demande concurrente.
    fn acceptable(&self, mv: &Move, claim: Option<&Preference>) -> bool {
        let (now, then) = (self.score.cost(), mv.score.cost());
        then < now || (then == now && claim.is_some_and(|p| self.outranks(p, mv.b)))
    }

    fn outranks(&self, pref: &Preference, holder: usize) -> bool {
        self.prefs
            .for_member(holder)
            .iter()
            .any(|q| q.day == pref.day && q.kind == pref.kind && q.rank > pref.rank)
    }

    fn commit(&mut self, mv: Option<Move>) -> bool {
        let Some(mv) = mv else {
            return false;
        };
        self.board.swap(mv.day, mv.a, mv.b);
        self.rows[mv.a] = mv.rows[0];
        self.rows[mv.b] = mv.rows[1];
        self.score = mv.score;
        true
    }

    fn request_phase(&mut self, order: &[&Preference]) -> usize {
        let mut accepted = 0;
        for pref in order {
            if self.board.get(pref.member, pref.day) == pref.kind {
                continue;
            }
            let holders: Vec<usize> = (0..self.board.len())
                .filter(|o| self.board.get(*o, pref.day) == pref.kind)
                .collect();
            let mv = self.best(pref.day, pref.member, &holders, Some(*pref));
            if self.commit(mv) {
                debug!(
                    request = %pref.request,
                    day = pref.day + 1,
                    kind = %pref.kind,
                    "request honored"
                );
                accepted += 1;
            }
        }
        accepted
    }

    fn violation_phase(&mut self) -> usize {
        let mut accepted = 0;
        let everyone: Vec<usize> = (0..self.board.len()).collect();
        for member in 0..self.board.len() {
            for day in 0..self.board.days() {
                let row = &self.rows[member];
                if row.soft == 0 && row.mandatory == 0 {
                    break;
                }
                let mv = self.best(day, member, &everyone, None);
                if self.commit(mv) {
                    accepted += 1;
                }
            }
        }
        accepted
    }
}

/// Recherche locale par échanges intra-journée ; ne dégrade jamais la faisabilité dure
/// puisque chaque échange conserve les effectifs et l'aptitude des deux membres.
/// Seule l'annulation interrompt le run ; plafond et échéance gardent le meilleur planning.
pub(crate) fn improve(
    board: &mut Board,
    evaluator: &Evaluator,
    prefs: &PreferenceMap,
    limits: RepairLimits,
    cancel: &CancelToken,
) -> Result<RepairStats, Aborted> {
    let rows = evaluator.row_scores(board, prefs);
    let score = Evaluator::total(&rows);
    let before = score.penalty;

    let mut order: Vec<&Preference> = prefs.active().collect();
    order.sort_by_key(|p| (Reverse(evaluator.relief(p.kind)), p.day, p.member));

    let mut search = Search {
        board,
        evaluator,
        prefs,
        rows,
        score,
    };
    let mut stats = RepairStats {
        sweeps: 0,
        accepted: 0,
        before,
        after: before,
        capped: false,
    };

    loop {
        if cancel.is_cancelled() {
            return Err(Aborted);
        }
        if stats.sweeps == limits.max_sweeps {
            stats.capped = true;
            debug!(sweeps = stats.sweeps, "repair sweep limit reached");
            break;
        }
        if limits.deadline.is_some_and(|d| Instant::now() >= d) {
            stats.capped = true;
            debug!(sweeps = stats.sweeps, "repair deadline reached");
            break;
        }
        stats.sweeps += 1;
        let accepted = search.request_phase(&order) + search.violation_phase();
        stats.accepted += accepted;
        debug!(
            sweep = stats.sweeps,
            accepted,
            penalty = search.score.penalty,
            "repair sweep"
        );
        if accepted == 0 {
            break;
        }
    }

    stats.after = search.score.penalty;
    Ok(stats)
}
