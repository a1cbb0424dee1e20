use crate::model::ShiftKind;
use crate::scheduler::SchedError;
use serde::{Deserialize, Serialize};

/// Effectif requis par poste pour un type de journée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Headcount {
    #[serde(default)]
    pub day: u32,
    #[serde(default)]
    pub evening: u32,
    #[serde(default)]
    pub night: u32,
    /// Catégorie Mid, configurée indépendamment des trois postes principaux.
    #[serde(default)]
    pub mid: u32,
}

impl Headcount {
    pub fn new(day: u32, evening: u32, night: u32) -> Self {
        Self {
            day,
            evening,
            night,
            mid: 0,
        }
    }

    pub fn for_kind(&self, kind: ShiftKind) -> u32 {
        match kind {
            ShiftKind::Day => self.day,
            ShiftKind::Evening => self.evening,
            ShiftKind::Night => self.night,
            ShiftKind::Mid => self.mid,
            ShiftKind::Off | ShiftKind::Unassigned => 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.day + self.evening + self.night + self.mid
    }
}

/// Règle d'enchaînement : `limit == 0` désactive la règle,
/// `priority == None` la rend obligatoire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakRule {
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub priority: Option<u32>,
}

impl StreakRule {
    pub fn mandatory(limit: u32) -> Self {
        Self {
            limit,
            priority: None,
        }
    }

    pub fn soft(limit: u32, priority: u32) -> Self {
        Self {
            limit,
            priority: Some(priority),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }

    /// Poids de violation, `None` pour une règle obligatoire (palier au-dessus de tout poids).
    pub fn weight(&self) -> Option<u64> {
        self.priority.map(u64::from)
    }

    pub fn is_mandatory(&self) -> bool {
        self.priority.is_none()
    }
}

/// Configuration des contraintes d'un service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rule {
    pub weekday: Headcount,
    pub weekend: Headcount,
    #[serde(default)]
    pub max_consecutive_night: StreakRule,
    #[serde(default)]
    pub min_consecutive_night: StreakRule,
    #[serde(default)]
    pub off_after_night: StreakRule,
    #[serde(default)]
    pub max_consecutive_shift: StreakRule,
    #[serde(default)]
    pub off_after_streak: StreakRule,
}

impl Rule {
    /// Même effectif tous les jours, aucune règle d'enchaînement.
    pub fn uniform(headcount: Headcount) -> Self {
        Self {
            weekday: headcount,
            weekend: headcount,
            ..Self::default()
        }
    }

    pub fn headcount(&self, weekend: bool) -> &Headcount {
        if weekend {
            &self.weekend
        } else {
            &self.weekday
        }
    }

    pub fn validate(&self) -> Result<(), SchedError> {
        if self.weekday.total() == 0 && self.weekend.total() == 0 {
            return Err(SchedError::InvalidInput(
                "rule requires no staff at all".into(),
            ));
        }
        let (min, max) = (self.min_consecutive_night, self.max_consecutive_night);
        if min.is_enabled() && max.is_enabled() && min.limit > max.limit {
            return Err(SchedError::InvalidInput(format!(
                "min_consecutive_night ({}) exceeds max_consecutive_night ({})",
                min.limit, max.limit
            )));
        }
        if self.off_after_streak.is_enabled() && !self.max_consecutive_shift.is_enabled() {
            return Err(SchedError::InvalidInput(
                "off_after_streak needs max_consecutive_shift".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_inverted_night_bounds() {
        let mut rule = Rule::uniform(Headcount::new(2, 1, 1));
        rule.max_consecutive_night = StreakRule::soft(2, 3);
        rule.min_consecutive_night = StreakRule::soft(3, 1);
        assert!(rule.validate().is_err());

        rule.min_consecutive_night = StreakRule::soft(2, 1);
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_headcount() {
        assert!(Rule::default().validate().is_err());
    }

    #[test]
    fn mandatory_rules_carry_no_weight() {
        assert_eq!(StreakRule::mandatory(3).weight(), None);
        assert!(StreakRule::mandatory(3).is_mandatory());
        assert_eq!(StreakRule::soft(3, 4).weight(), Some(4));
    }
}
