use super::board::Board;
use super::util;
use crate::config::EngineConfig;
use crate::model::{Request, RequestId, RequestStatus, ShiftKind};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Préférence retenue : (membre, jour) → poste souhaité.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Preference {
    pub(crate) request: RequestId,
    pub(crate) member: usize,
    pub(crate) day: usize,
    pub(crate) kind: ShiftKind,
    pub(crate) weight: u64,
    /// Faux pour les demandes gardées en arrière-plan.
    pub(crate) active: bool,
    /// Classement entre demandes concurrentes (plus petit = prioritaire).
    pub(crate) rank: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PreferenceMap {
    prefs: Vec<Preference>,
    by_member: Vec<Vec<usize>>,
    /// Demandes jugées non satisfaisables (membre inconnu, inaptitude, doublon).
    pub(crate) rejected: Vec<RequestId>,
}

impl PreferenceMap {
    pub(crate) fn for_member(&self, member: usize) -> Vec<&Preference> {
        self.by_member
            .get(member)
            .map(|idxs| idxs.iter().map(|i| &self.prefs[*i]).collect())
            .unwrap_or_default()
    }

    pub(crate) fn active(&self) -> impl Iterator<Item = &Preference> {
        self.prefs.iter().filter(|p| p.active)
    }

    pub(crate) fn len(&self) -> usize {
        self.prefs.len()
    }
}

/// Projette les demandes Hold du mois sur le squelette.
///
/// Les demandes concurrentes sur un même (jour, poste) sont toutes gardées et classées :
/// actives avant arrière-plan, puis identifiant de membre. La réparation tranche
/// selon ce classement, et passe au suivant si le premier ne peut être servi.
pub(crate) fn reconcile(
    board: &Board,
    requests: &[Request],
    subset: Option<&[RequestId]>,
    year: i32,
    month: u32,
    config: &EngineConfig,
) -> PreferenceMap {
    let subset: Option<BTreeSet<&RequestId>> = subset
        .filter(|ids| !ids.is_empty())
        .map(|ids| ids.iter().collect());

    let mut candidates: Vec<(bool, &Request, usize)> = requests
        .iter()
        .filter(|r| r.status == RequestStatus::Hold)
        .filter_map(|r| {
            let day = util::day_index(r.date, year, month)?;
            let active = subset.as_ref().map_or(true, |ids| ids.contains(&r.id));
            Some((active, r, day))
        })
        .collect();

    if let Some(ids) = &subset {
        for id in ids {
            if !candidates.iter().any(|(_, r, _)| &r.id == *id) {
                warn!(request = %id, "requested id is not a Hold request of this month");
            }
        }
    }

    // actives d'abord, puis membre, date, id
    candidates.sort_by(|(aa, ra, _), (ab, rb, _)| {
        ab.cmp(aa)
            .then_with(|| ra.member.cmp(&rb.member))
            .then_with(|| ra.date.cmp(&rb.date))
            .then_with(|| ra.id.cmp(&rb.id))
    });

    let mut map = PreferenceMap {
        by_member: vec![Vec::new(); board.len()],
        ..PreferenceMap::default()
    };
    let mut claimed: BTreeSet<(usize, usize)> = BTreeSet::new();

    for (active, request, day) in candidates {
        let Some(member) = board.member_index(&request.member) else {
            debug!(request = %request.id, member = %request.member, "member not in roster");
            map.rejected.push(request.id.clone());
            continue;
        };
        if !board.members[member].can_work(request.shift) {
            debug!(request = %request.id, kind = %request.shift, "member not eligible");
            map.rejected.push(request.id.clone());
            continue;
        }
        if claimed.contains(&(member, day)) {
            debug!(request = %request.id, "duplicate request for the same day");
            map.rejected.push(request.id.clone());
            continue;
        }
        claimed.insert((member, day));

        let weight = if active {
            config.request_penalty
        } else {
            config.background_penalty
        };
        map.by_member[member].push(map.prefs.len());
        map.prefs.push(Preference {
            request: request.id.clone(),
            member,
            day,
            kind: request.shift,
            weight,
            active,
            rank: map.prefs.len(),
        });
    }

    map
}
