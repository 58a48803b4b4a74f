use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::repo::directory_repo::AnimalDirectory;
use crate::repo::vaccination_repo::VaccinationStore;
use chrono::{DateTime, Utc};

/// Engine facade over a herd directory and a vaccination store.
///
/// Operations are grouped by concern in sibling modules (`schedule`,
/// `transition`, `reminder`, `bulk`, `scope`).
pub struct VaccinationService<D: AnimalDirectory, S: VaccinationStore> {
    pub(super) directory: D,
    pub(super) store: S,
    pub(super) config: EngineConfig,
    clock: Box<dyn Clock>,
}

impl<D: AnimalDirectory, S: VaccinationStore> VaccinationService<D, S> {
    /// Creates a service with default configuration and wall-clock time.
    pub fn new(directory: D, store: S) -> Self {
        Self {
            directory,
            store,
            config: EngineConfig::default(),
            clock: Box::new(SystemClock),
        }
    }

    /// Replaces the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(super) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
