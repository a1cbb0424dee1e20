use super::board::Board;
use super::{util, SchedError};
use crate::grid::UnreflectedRequestRecord;
use crate::model::{Request, RequestId, RequestStatus, ShiftKind};

pub(crate) struct Assembly {
    pub(crate) statuses: Vec<(RequestId, RequestStatus)>,
    pub(crate) unreflected: Vec<UnreflectedRequestRecord>,
}

/// Confronte le planning final à toutes les demandes Hold du mois.
pub(crate) fn assemble(
    board: &Board,
    requests: &[Request],
    year: i32,
    month: u32,
) -> Result<Assembly, SchedError> {
    let mut considered: Vec<(&Request, usize)> = requests
        .iter()
        .filter(|r| r.status == RequestStatus::Hold)
        .filter_map(|r| util::day_index(r.date, year, month).map(|d| (r, d)))
        .collect();
    considered.sort_by(|(a, _), (b, _)| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.member.cmp(&b.member))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut out = Assembly {
        statuses: Vec::with_capacity(considered.len()),
        unreflected: Vec::new(),
    };

    for (request, day) in considered {
        let member = board.member_index(&request.member);
        let actual = member.map_or(ShiftKind::Unassigned, |m| board.get(m, day));
        let target = if actual == request.shift {
            RequestStatus::Accepted
        } else {
            RequestStatus::Denied
        };
        let status = request.status.transition(target)?;
        if status == RequestStatus::Denied {
            out.unreflected.push(UnreflectedRequestRecord {
                request_id: request.id.clone(),
                member_id: request.member.clone(),
                member_name: member
                    .map(|m| board.members[m].name.clone())
                    .unwrap_or_default(),
                date: request.date,
                requested: request.shift,
                actual,
                memo: request.memo.clone(),
            });
        }
        out.statuses.push((request.id.clone(), status));
    }

    Ok(out)
}
