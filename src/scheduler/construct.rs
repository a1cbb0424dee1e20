use super::board::Board;
use super::types::CoverageDeficit;
use super::util;
use crate::model::ShiftKind;
use crate::rule::Rule;
use tracing::warn;

/// Squelette glouton jour par jour, Night → Evening → Day → Mid.
///
/// Candidats classés par nombre de postes de ce type déjà tenus ce mois-ci,
/// puis par identifiant. Un manque d'effectif est consigné et la construction continue.
pub(crate) fn build_skeleton(board: &mut Board, rule: &Rule) -> Vec<CoverageDeficit> {
    let mut deficits = Vec::new();
    let mut load = vec![[0u32; ShiftKind::WORKING.len()]; board.len()];

    for day in 0..board.days() {
        let headcount = *rule.headcount(util::is_weekend(board.dates[day]));
        let mut taken = vec![false; board.len()];

        for (slot, kind) in ShiftKind::WORKING.into_iter().enumerate() {
            let required = headcount.for_kind(kind);
            if required == 0 {
                continue;
            }

            let mut pool: Vec<usize> = (0..board.len())
                .filter(|m| !taken[*m] && board.members[*m].can_work(kind))
                .collect();
            // tri stable : les index suivent déjà l'ordre des identifiants
            pool.sort_by_key(|m| load[*m][slot]);

            let chosen = &pool[..pool.len().min(required as usize)];
            for m in chosen {
                board.set(*m, day, kind);
                taken[*m] = true;
                load[*m][slot] += 1;
            }

            let assigned = chosen.len() as u32;
            if assigned < required {
                warn!(day = day + 1, %kind, required, assigned, "coverage deficit");
                deficits.push(CoverageDeficit {
                    day: day as u32 + 1,
                    kind,
                    required,
                    assigned,
                });
            }
        }

        for (m, done) in taken.iter().enumerate() {
            if !done {
                board.set(m, day, ShiftKind::Off);
            }
        }
    }

    deficits
}
