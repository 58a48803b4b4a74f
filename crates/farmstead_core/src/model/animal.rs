//! Animal and group records resolved by the herd directory.
//!
//! # Invariants
//! - `tag` is non-blank and unique within its group.
//! - `weight`, when present, is a finite non-negative number.
//! - `AnimalGroup::current_count` mirrors the number of animals in the group.

use crate::model::{AnimalId, FarmId, GroupId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Biological sex recorded for an animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    Unknown,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// Current health classification of an animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Sick,
    Injured,
    Quarantined,
    Recovering,
    Deceased,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Sick => "sick",
            Self::Injured => "injured",
            Self::Quarantined => "quarantined",
            Self::Recovering => "recovering",
            Self::Deceased => "deceased",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "healthy" => Some(Self::Healthy),
            "sick" => Some(Self::Sick),
            "injured" => Some(Self::Injured),
            "quarantined" => Some(Self::Quarantined),
            "recovering" => Some(Self::Recovering),
            "deceased" => Some(Self::Deceased),
            _ => None,
        }
    }
}

/// Animal validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimalValidationError {
    BlankTag,
    InvalidWeight(f64),
    BlankGroupName,
    BlankSpecies,
}

impl Display for AnimalValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTag => write!(f, "animal tag must not be blank"),
            Self::InvalidWeight(value) => {
                write!(f, "animal weight must be a non-negative number, got {value}")
            }
            Self::BlankGroupName => write!(f, "group name must not be blank"),
            Self::BlankSpecies => write!(f, "group species must not be blank"),
        }
    }
}

impl Error for AnimalValidationError {}

/// One animal owned by a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: AnimalId,
    /// Ear tag or other herd-local identifier.
    pub tag: String,
    pub name: Option<String>,
    pub group_id: GroupId,
    pub sex: Sex,
    pub birth_date: Option<NaiveDate>,
    pub breed: Option<String>,
    /// Kilograms.
    pub weight: Option<f64>,
    pub health_status: HealthStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Animal {
    /// Creates a healthy animal of unknown sex with a generated ID.
    pub fn new(group_id: GroupId, tag: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tag: tag.into(),
            name: None,
            group_id,
            sex: Sex::Unknown,
            birth_date: None,
            breed: None,
            weight: None,
            health_status: HealthStatus::Healthy,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), AnimalValidationError> {
        if self.tag.trim().is_empty() {
            return Err(AnimalValidationError::BlankTag);
        }
        if let Some(weight) = self.weight {
            if !weight.is_finite() || weight < 0.0 {
                return Err(AnimalValidationError::InvalidWeight(weight));
            }
        }
        Ok(())
    }

    /// Age in whole days on `today`, `None` without a birth date.
    pub fn age_in_days(&self, today: NaiveDate) -> Option<i64> {
        self.birth_date
            .map(|birth_date| (today - birth_date).num_days())
    }
}

/// A managed group of animals on one farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalGroup {
    pub id: GroupId,
    pub farm_id: FarmId,
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub current_count: u32,
}

impl AnimalGroup {
    /// Creates an empty group with a generated ID.
    pub fn new(farm_id: FarmId, name: impl Into<String>, species: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            farm_id,
            name: name.into(),
            species: species.into(),
            breed: None,
            current_count: 0,
        }
    }

    pub fn validate(&self) -> Result<(), AnimalValidationError> {
        if self.name.trim().is_empty() {
            return Err(AnimalValidationError::BlankGroupName);
        }
        if self.species.trim().is_empty() {
            return Err(AnimalValidationError::BlankSpecies);
        }
        Ok(())
    }
}
