use crate::scheduler::SchedError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Catégorie de poste pour une journée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShiftKind {
    Day,
    Evening,
    Night,
    Off,
    Mid,
    /// Placeholder transitoire, jamais présent dans un planning terminé.
    Unassigned,
}

impl ShiftKind {
    /// Postes travaillés, dans l'ordre de remplissage du constructeur.
    pub const WORKING: [ShiftKind; 4] = [
        ShiftKind::Night,
        ShiftKind::Evening,
        ShiftKind::Day,
        ShiftKind::Mid,
    ];

    pub fn code(self) -> char {
        match self {
            ShiftKind::Day => 'D',
            ShiftKind::Evening => 'E',
            ShiftKind::Night => 'N',
            ShiftKind::Off => 'O',
            ShiftKind::Mid => 'M',
            ShiftKind::Unassigned => '-',
        }
    }

    pub fn from_code(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'D' => Some(ShiftKind::Day),
            'E' => Some(ShiftKind::Evening),
            'N' => Some(ShiftKind::Night),
            'O' => Some(ShiftKind::Off),
            'M' => Some(ShiftKind::Mid),
            '-' => Some(ShiftKind::Unassigned),
            _ => None,
        }
    }

    pub fn is_working(self) -> bool {
        matches!(
            self,
            ShiftKind::Day | ShiftKind::Evening | ShiftKind::Night | ShiftKind::Mid
        )
    }
}

impl fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShiftKind::Day => "Day",
            ShiftKind::Evening => "Evening",
            ShiftKind::Night => "Night",
            ShiftKind::Off => "Off",
            ShiftKind::Mid => "Mid",
            ShiftKind::Unassigned => "Unassigned",
        };
        f.write_str(name)
    }
}

impl FromStr for ShiftKind {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return ShiftKind::from_code(c).ok_or_else(|| SchedError::UnknownShiftKind(s.into()));
        }
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(ShiftKind::Day),
            "evening" => Ok(ShiftKind::Evening),
            "night" => Ok(ShiftKind::Night),
            "off" => Ok(ShiftKind::Off),
            "mid" => Ok(ShiftKind::Mid),
            _ => Err(SchedError::UnknownShiftKind(s.into())),
        }
    }
}

/// Aptitudes d'un membre (bitset sur Day/Evening/Night/Mid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Eligibility(u8);

impl Eligibility {
    pub const DAY: Eligibility = Eligibility(0b0001);
    pub const EVENING: Eligibility = Eligibility(0b0010);
    pub const NIGHT: Eligibility = Eligibility(0b0100);
    pub const MID: Eligibility = Eligibility(0b1000);
    pub const NONE: Eligibility = Eligibility(0);
    pub const ALL: Eligibility = Eligibility(0b1111);

    fn bit(kind: ShiftKind) -> u8 {
        match kind {
            ShiftKind::Day => Self::DAY.0,
            ShiftKind::Evening => Self::EVENING.0,
            ShiftKind::Night => Self::NIGHT.0,
            ShiftKind::Mid => Self::MID.0,
            ShiftKind::Off | ShiftKind::Unassigned => 0,
        }
    }

    /// Off est toujours permis, Unassigned jamais.
    pub fn allows(self, kind: ShiftKind) -> bool {
        match kind {
            ShiftKind::Off => true,
            ShiftKind::Unassigned => false,
            other => self.0 & Self::bit(other) != 0,
        }
    }

    pub fn with(self, kind: ShiftKind) -> Self {
        Self(self.0 | Self::bit(kind))
    }

    pub fn without(self, kind: ShiftKind) -> Self {
        Self(self.0 & !Self::bit(kind))
    }

    /// Parse une liste de codes, ex. `DEN` ou `D|E|M`.
    pub fn parse_codes(raw: &str) -> Result<Self, SchedError> {
        raw.chars()
            .filter(|c| !matches!(c, '|' | ',' | ' '))
            .try_fold(Self::NONE, |acc, c| match ShiftKind::from_code(c) {
                Some(kind) if kind.is_working() => Ok(acc.with(kind)),
                _ => Err(SchedError::UnknownShiftKind(c.to_string())),
            })
    }

    pub fn codes(self) -> String {
        [ShiftKind::Day, ShiftKind::Evening, ShiftKind::Night, ShiftKind::Mid]
            .into_iter()
            .filter(|k| self.allows(*k))
            .map(ShiftKind::code)
            .collect()
    }
}

impl Default for Eligibility {
    fn default() -> Self {
        Self::ALL
    }
}

/// Identifiant fort pour un service (ward)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WardId(String);

impl WardId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifiant fort pour Member. L'ordre sert de départage déterministe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(String);

impl MemberId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Membre du service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    #[serde(default)]
    pub eligibility: Eligibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_intensity: Option<u8>,
}

impl Member {
    pub fn new<I: AsRef<str>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: MemberId::new(id),
            name: name.into(),
            eligibility: Eligibility::ALL,
            skill: None,
            role: None,
            work_intensity: None,
        }
    }

    pub fn with_eligibility(mut self, eligibility: Eligibility) -> Self {
        self.eligibility = eligibility;
        self
    }

    pub fn can_work(&self, kind: ShiftKind) -> bool {
        self.eligibility.allows(kind)
    }
}

/// Identifiant fort pour Request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cycle de vie d'une demande : Hold → Accepted | Denied, sans retour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RequestStatus {
    #[default]
    Hold,
    Accepted,
    Denied,
}

impl RequestStatus {
    pub fn is_final(self) -> bool {
        !matches!(self, RequestStatus::Hold)
    }

    pub fn transition(self, to: RequestStatus) -> Result<RequestStatus, SchedError> {
        match (self, to) {
            (RequestStatus::Hold, RequestStatus::Accepted | RequestStatus::Denied) => Ok(to),
            (from, to) => Err(SchedError::IllegalTransition { from, to }),
        }
    }
}

/// Demande de poste pour une date donnée.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub member: MemberId,
    pub date: NaiveDate,
    pub shift: ShiftKind,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub status: RequestStatus,
}

impl Request {
    pub fn new(member: MemberId, date: NaiveDate, shift: ShiftKind) -> Self {
        Self {
            id: RequestId::random(),
            member,
            date,
            shift,
            memo: String::new(),
            status: RequestStatus::Hold,
        }
    }

    pub fn with_id(mut self, id: RequestId) -> Self {
        self.id = id;
        self
    }

    pub fn with_memo<S: Into<String>>(mut self, memo: S) -> Self {
        self.memo = memo.into();
        self
    }
}
