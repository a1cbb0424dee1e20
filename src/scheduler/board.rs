use super::SchedError;
use crate::grid::{GridRow, RunKey, ScheduleGrid};
use crate::model::{Member, MemberId, ShiftKind};
use chrono::NaiveDate;

/// Matrice de travail [membre][jour], membres triés par identifiant.
#[derive(Debug, Clone)]
pub(crate) struct Board {
    pub(crate) members: Vec<Member>,
    pub(crate) dates: Vec<NaiveDate>,
    cells: Vec<Vec<ShiftKind>>,
}

impl Board {
    pub(crate) fn new(roster: &[Member], dates: Vec<NaiveDate>) -> Self {
        let mut members = roster.to_vec();
        members.sort_by(|a, b| a.id.cmp(&b.id));
        let cells = vec![vec![ShiftKind::Unassigned; dates.len()]; members.len()];
        Self {
            members,
            dates,
            cells,
        }
    }

    /// Recharge un planning existant ; les membres absents de la grille restent `Unassigned`.
    pub(crate) fn from_grid(
        grid: &ScheduleGrid,
        roster: &[Member],
        dates: Vec<NaiveDate>,
    ) -> Result<Self, SchedError> {
        let mut board = Self::new(roster, dates);
        for row in &grid.rows {
            let idx = board
                .member_index(&row.member)
                .ok_or_else(|| SchedError::UnknownMember(row.member.as_str().to_string()))?;
            if row.shifts.len() != board.days() {
                return Err(SchedError::InvalidInput(format!(
                    "row for {} has {} days, month has {}",
                    row.member,
                    row.shifts.len(),
                    board.days()
                )));
            }
            board.cells[idx].clone_from(&row.shifts);
        }
        Ok(board)
    }

    pub(crate) fn days(&self) -> usize {
        self.dates.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn member_index(&self, id: &MemberId) -> Option<usize> {
        self.members.binary_search_by(|m| m.id.cmp(id)).ok()
    }

    pub(crate) fn get(&self, member: usize, day: usize) -> ShiftKind {
        self.cells[member][day]
    }

    pub(crate) fn set(&mut self, member: usize, day: usize, kind: ShiftKind) {
        self.cells[member][day] = kind;
    }

    pub(crate) fn row(&self, member: usize) -> &[ShiftKind] {
        &self.cells[member]
    }

    pub(crate) fn swap(&mut self, day: usize, a: usize, b: usize) {
        let tmp = self.cells[a][day];
        self.cells[a][day] = self.cells[b][day];
        self.cells[b][day] = tmp;
    }

    /// Vrai si l'échange garde les deux membres sur des postes autorisés.
    pub(crate) fn swap_allowed(&self, day: usize, a: usize, b: usize) -> bool {
        let (ka, kb) = (self.cells[a][day], self.cells[b][day]);
        ka != kb && self.members[a].can_work(kb) && self.members[b].can_work(ka)
    }

    pub(crate) fn count(&self, day: usize, kind: ShiftKind) -> u32 {
        self.cells.iter().filter(|row| row[day] == kind).count() as u32
    }

    pub(crate) fn into_grid(self, key: RunKey) -> ScheduleGrid {
        let rows = self
            .members
            .into_iter()
            .zip(self.cells)
            .map(|(member, shifts)| GridRow {
                member: member.id,
                shifts,
            })
            .collect();
        ScheduleGrid { key, rows }
    }
}
