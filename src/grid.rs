use crate::model::{MemberId, RequestId, ShiftKind, WardId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Clé d'un planning mensuel : (service, année, mois).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunKey {
    pub ward: WardId,
    pub year: i32,
    pub month: u32,
}

impl RunKey {
    pub fn new(ward: WardId, year: i32, month: u32) -> Self {
        Self { ward, year, month }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{:02}", self.ward, self.year, self.month)
    }
}

/// Ligne du planning : un poste par jour du mois (index 0 = jour 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRow {
    pub member: MemberId,
    pub shifts: Vec<ShiftKind>,
}

/// Planning d'un service pour un mois, lignes triées par identifiant de membre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleGrid {
    pub key: RunKey,
    pub rows: Vec<GridRow>,
}

impl ScheduleGrid {
    pub fn days(&self) -> usize {
        self.rows.first().map_or(0, |r| r.shifts.len())
    }

    pub fn row(&self, member: &MemberId) -> Option<&GridRow> {
        self.rows.iter().find(|r| &r.member == member)
    }

    /// Poste d'un membre pour un jour du mois (1-based).
    pub fn shift_on(&self, member: &MemberId, day: u32) -> Option<ShiftKind> {
        let idx = usize::try_from(day).ok()?.checked_sub(1)?;
        self.row(member)?.shifts.get(idx).copied()
    }

    /// Nombre de membres affectés à `kind` pour un jour (1-based).
    pub fn count_on(&self, day: u32, kind: ShiftKind) -> usize {
        let Some(idx) = (day as usize).checked_sub(1) else {
            return 0;
        };
        self.rows
            .iter()
            .filter(|r| r.shifts.get(idx) == Some(&kind))
            .count()
    }

    /// Projection par membre (vue côté membre).
    pub fn member_schedules(&self) -> Vec<MemberSchedule> {
        self.rows
            .iter()
            .map(|r| MemberSchedule {
                member: r.member.clone(),
                key: self.key.clone(),
                shifts: r.shifts.clone(),
            })
            .collect()
    }
}

/// Planning d'un membre pour un mois.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSchedule {
    pub member: MemberId,
    pub key: RunKey,
    pub shifts: Vec<ShiftKind>,
}

/// Demande non satisfaite par le planning final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreflectedRequestRecord {
    pub request_id: RequestId,
    pub member_id: MemberId,
    pub member_name: String,
    pub date: NaiveDate,
    pub requested: ShiftKind,
    pub actual: ShiftKind,
    pub memo: String,
}
