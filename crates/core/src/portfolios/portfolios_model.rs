//! Portfolio domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, ValidationError};
use crate::utils::validation::{normalize_currency, require_non_empty};

/// How sold shares are matched against open tax lots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostBasisMethod {
    #[default]
    Fifo,
    Lifo,
    SpecificLot,
}

impl CostBasisMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostBasisMethod::Fifo => "FIFO",
            CostBasisMethod::Lifo => "LIFO",
            CostBasisMethod::SpecificLot => "SPECIFIC_LOT",
        }
    }
}

impl fmt::Display for CostBasisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostBasisMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "FIFO" => Ok(CostBasisMethod::Fifo),
            "LIFO" => Ok(CostBasisMethod::Lifo),
            "SPECIFIC_LOT" | "SPECIFICLOT" => Ok(CostBasisMethod::SpecificLot),
            _ => Err(ValidationError::InvalidMethod(s.to_string())),
        }
    }
}

/// Domain model representing a user-owned portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub base_currency: String,
    pub cost_basis_method: CostBasisMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Portfolio {
    pub fn is_owned_by(&self, principal_id: &str) -> bool {
        self.owner_id == principal_id
    }
}

/// Input model for creating a new portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPortfolio {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub base_currency: String,
    #[serde(default)]
    pub cost_basis_method: CostBasisMethod,
}

impl NewPortfolio {
    /// Validates and normalizes the new portfolio data.
    pub fn validate(&mut self) -> Result<()> {
        require_non_empty(&self.name, "name")?;
        self.name = self.name.trim().to_string();
        self.base_currency = normalize_currency(&self.base_currency)?;
        Ok(())
    }
}

/// Input model for updating an existing portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioUpdate {
    pub id: String,
    pub name: Option<String>,
    pub base_currency: Option<String>,
    pub cost_basis_method: Option<CostBasisMethod>,
}

impl PortfolioUpdate {
    pub fn validate(&mut self) -> Result<()> {
        require_non_empty(&self.id, "id")?;
        if let Some(name) = self.name.as_mut() {
            require_non_empty(name, "name")?;
            *name = name.trim().to_string();
        }
        if let Some(currency) = self.base_currency.as_mut() {
            *currency = normalize_currency(currency)?;
        }
        Ok(())
    }
}
