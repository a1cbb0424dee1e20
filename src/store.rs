use crate::grid::{MemberSchedule, RunKey, ScheduleGrid};
use crate::model::{Member, MemberId, Request, RequestId, RequestStatus, WardId};
use crate::rule::Rule;
use crate::scheduler::RunInput;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;

/// Ce qu'un run publie, en une seule écriture.
#[derive(Debug, Clone)]
pub struct RunCommit {
    pub grid: ScheduleGrid,
    pub member_schedules: Vec<MemberSchedule>,
    pub statuses: Vec<(RequestId, RequestStatus)>,
}

pub trait ScheduleStore {
    /// Planning existant pour la clé, s'il y en a un.
    fn find_grid(&self, key: &RunKey) -> anyhow::Result<Option<ScheduleGrid>>;
    /// Publie grille, projections et statuts de manière atomique.
    fn commit(&self, commit: RunCommit) -> anyhow::Result<()>;
}

/// Document complet d'un service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardBook {
    pub ward: WardId,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub rule: Option<Rule>,
    #[serde(default)]
    pub requests: Vec<Request>,
    #[serde(default)]
    pub schedules: Vec<ScheduleGrid>,
    #[serde(default)]
    pub member_schedules: Vec<MemberSchedule>,
}

impl WardBook {
    pub fn new(ward: WardId) -> Self {
        Self {
            ward,
            members: Vec::new(),
            rule: None,
            requests: Vec::new(),
            schedules: Vec::new(),
            member_schedules: Vec::new(),
        }
    }

    /// Instantané des entrées d'un run.
    pub fn snapshot(&self) -> RunInput {
        RunInput {
            ward: self.ward.clone(),
            roster: self.members.clone(),
            rule: self.rule.clone(),
            requests: self.requests.clone(),
        }
    }

    pub fn grid(&self, key: &RunKey) -> Option<&ScheduleGrid> {
        self.schedules.iter().find(|g| &g.key == key)
    }

    pub fn member_schedule(&self, key: &RunKey, member: &MemberId) -> Option<&MemberSchedule> {
        self.member_schedules
            .iter()
            .find(|s| &s.key == key && &s.member == member)
    }

    /// Applique un commit ; en cas d'erreur le livre peut être partiellement modifié,
    /// l'appelant travaille donc sur une copie.
    pub fn apply(&mut self, commit: RunCommit) -> anyhow::Result<()> {
        for (id, status) in &commit.statuses {
            let request = self
                .requests
                .iter_mut()
                .find(|r| &r.id == id)
                .with_context(|| format!("unknown request {id}"))?;
            request.status = request.status.transition(*status)?;
        }

        let key = commit.grid.key.clone();
        self.schedules.retain(|g| g.key != key);
        self.schedules.push(commit.grid);
        self.schedules.sort_by(|a, b| a.key.cmp(&b.key));

        self.member_schedules.retain(|s| s.key != key);
        self.member_schedules.extend(commit.member_schedules);
        Ok(())
    }
}

/// Stockage mémoire, utile pour les tests et l'embarqué.
#[derive(Debug)]
pub struct MemoryStore {
    book: Mutex<WardBook>,
}

impl MemoryStore {
    pub fn new(book: WardBook) -> Self {
        Self {
            book: Mutex::new(book),
        }
    }

    pub fn book(&self) -> WardBook {
        self.book
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ScheduleStore for MemoryStore {
    fn find_grid(&self, key: &RunKey) -> anyhow::Result<Option<ScheduleGrid>> {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(book.grid(key).cloned())
    }

    fn commit(&self, commit: RunCommit) -> anyhow::Result<()> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = book.clone();
        next.apply(commit)?;
        *book = next;
        Ok(())
    }
}

/// Livre de service persisté en JSON, réécrit de manière atomique.
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> anyhow::Result<WardBook> {
        let data =
            fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        let book: WardBook = serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(book)
    }

    /// Sauvegarde de manière atomique.
    pub fn save(&self, book: &WardBook) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(book)?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).context("creating temp file")?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).context("atomic rename")?;
        Ok(())
    }
}

impl ScheduleStore for JsonStore {
    fn find_grid(&self, key: &RunKey) -> anyhow::Result<Option<ScheduleGrid>> {
        Ok(self.load()?.grid(key).cloned())
    }

    fn commit(&self, commit: RunCommit) -> anyhow::Result<()> {
        let mut book = self.load()?;
        book.apply(commit)?;
        self.save(&book)
    }
}
