//! Case Registry
//!
//! Loads case definitions from TOML files and builds their odds tables once at startup.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::case_def::{CaseDefinition, RawCaseDefinition};
use crate::money::Money;
use crate::odds::OddsConfig;

/// Price statistics for one game's cases
#[derive(Debug, Clone, serde::Serialize)]
pub struct GameSummary {
    pub game: String,
    pub case_count: usize,
    pub min_price: Money,
    pub max_price: Money,
    pub avg_price: Money,
}

/// Registry for all case definitions
pub struct CaseRegistry {
    cases: HashMap<String, Arc<CaseDefinition>>,
}

impl CaseRegistry {
    pub fn new() -> Self {
        Self {
            cases: HashMap::new(),
        }
    }

    /// Load all case definitions from `data_dir/cases`. An unreadable file or a
    /// case whose odds cannot be built aborts the load with the case id.
    pub fn load_from_directory(&mut self, data_dir: &Path, config: &OddsConfig) -> Result<(), String> {
        let cases_dir = data_dir.join("cases");

        if !cases_dir.exists() {
            warn!("Cases directory does not exist: {:?}", cases_dir);
            return Ok(());
        }

        let entries = std::fs::read_dir(&cases_dir)
            .map_err(|e| format!("Failed to read cases directory: {}", e))?;

        for entry in entries {
            let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
            let path = entry.path();

            if path.extension().map_or(false, |ext| ext == "toml") {
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

                // Parse as table of cases
                let table: HashMap<String, RawCaseDefinition> = toml::from_str(&content)
                    .map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;

                for (id, raw) in table {
                    if self.cases.contains_key(&id) {
                        warn!("Duplicate case ID '{}' in {:?}, overwriting", id, path);
                    }
                    match CaseDefinition::from_raw(&id, &raw, config) {
                        Ok(case) => {
                            info!(
                                "Loaded case: {} ({}) - {} items, price {}, RTP {:.2}%",
                                case.display_name,
                                id,
                                case.odds.len(),
                                case.price,
                                case.odds.realized_rtp_bps() / 100.0
                            );
                            self.cases.insert(id, Arc::new(case));
                        }
                        Err(e) => return Err(format!("Invalid case '{}' in {:?}: {}", id, path, e)),
                    }
                }
            }
        }

        info!("Loaded {} case definitions", self.cases.len());
        Ok(())
    }

    pub fn insert(&mut self, case: CaseDefinition) {
        self.cases.insert(case.id.clone(), Arc::new(case));
    }

    /// Get a case definition by ID
    pub fn get(&self, id: &str) -> Option<Arc<CaseDefinition>> {
        self.cases.get(id).cloned()
    }

    /// All cases, cheapest first
    pub fn all(&self) -> Vec<Arc<CaseDefinition>> {
        let mut cases: Vec<_> = self.cases.values().cloned().collect();
        cases.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.id.cmp(&b.id)));
        cases
    }

    /// Cases for one game, cheapest first
    pub fn by_game(&self, game: &str) -> Vec<Arc<CaseDefinition>> {
        self.all().into_iter().filter(|c| c.game == game).collect()
    }

    pub fn games(&self) -> Vec<GameSummary> {
        let mut by_game: HashMap<&str, Vec<Money>> = HashMap::new();
        for case in self.cases.values() {
            by_game.entry(case.game.as_str()).or_default().push(case.price);
        }

        let mut summaries: Vec<GameSummary> = by_game
            .into_iter()
            .map(|(game, prices)| {
                let total: i64 = prices.iter().map(|p| p.cents()).sum();
                GameSummary {
                    game: game.to_string(),
                    case_count: prices.len(),
                    min_price: prices.iter().copied().min().unwrap_or_default(),
                    max_price: prices.iter().copied().max().unwrap_or_default(),
                    avg_price: Money(total / prices.len() as i64),
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.game.cmp(&b.game));
        summaries
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cases.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl Default for CaseRegistry {
    fn default() -> Self {
        Self::new()
    }
}
