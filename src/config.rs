use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Réglages du moteur (pénalités et bornes de la passe d'amélioration).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Coût d'une demande active non satisfaite.
    pub request_penalty: u64,
    /// Coût d'une demande d'arrière-plan non satisfaite.
    pub background_penalty: u64,
    /// Plafond de passes ; par défaut jours du mois × membres.
    pub max_sweeps: Option<usize>,
    pub repair_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_penalty: 10,
            background_penalty: 1,
            max_sweeps: None,
            repair_timeout_ms: None,
        }
    }
}

impl EngineConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_slice(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn sweep_limit(&self, days: usize, members: usize) -> usize {
        self.max_sweeps.unwrap_or(days * members).max(1)
    }

    pub fn repair_timeout(&self) -> Option<Duration> {
        self.repair_timeout_ms.map(Duration::from_millis)
    }
}
