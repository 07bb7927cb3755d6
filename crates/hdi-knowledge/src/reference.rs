//! R&D reference dataset: papers, lab equipment, materials, institutions

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

const BUILTIN: &str = include_str!("../data/reference.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchPaper {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub institution: String,
    pub journal: String,
    pub year: u32,
    pub doi: String,
    pub r#abstract: String,
    pub keywords: Vec<String>,
    pub citations: u32,
    pub category: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabEquipment {
    pub id: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub category: String,
    pub location: String,
    /// Available, In Use, Maintenance
    pub status: String,
    pub specifications: BTreeMap<String, String>,
    pub applications: Vec<String>,
    #[serde(rename = "priceRange")]
    pub price_range: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    pub name: String,
    pub formula: String,
    #[serde(rename = "casNumber")]
    pub cas_number: String,
    pub purity: String,
    pub supplier: String,
    pub stock: f64,
    pub unit: String,
    pub category: String,
    pub specifications: BTreeMap<String, String>,
    pub hazards: Vec<String>,
    #[serde(rename = "priceRange")]
    pub price_range: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Institution {
    pub id: String,
    pub name: String,
    pub r#type: String,
    pub city: String,
    pub country: String,
    pub employees: u32,
    pub budget: String,
    pub focus: Vec<String>,
    pub facilities: Vec<String>,
    pub publications: u32,
    pub website: String,
}

/// Category names per collection
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Categories {
    pub papers: Vec<String>,
    pub equipment: Vec<String>,
    pub materials: Vec<String>,
    pub institutions: Vec<String>,
}

/// Read-only reference data served under `/api/rnd`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub papers: Vec<ResearchPaper>,
    pub equipment: Vec<LabEquipment>,
    pub materials: Vec<Material>,
    pub institutions: Vec<Institution>,
    pub categories: Categories,
    pub countries: Vec<String>,
}

impl ReferenceData {
    /// Dataset compiled into the binary
    pub fn builtin() -> Result<Self> {
        let data: Self =
            serde_json::from_str(BUILTIN).context("Failed to parse built-in reference data")?;
        debug!(
            "Loaded built-in reference data: {} papers, {} equipment, {} materials, {} institutions",
            data.papers.len(),
            data.equipment.len(),
            data.materials.len(),
            data.institutions.len()
        );
        Ok(data)
    }

    /// Load from a JSON file in the same shape as the built-in dataset
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read reference data from {}", path.display()))?;
        let data: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse reference data in {}", path.display()))?;
        info!("Loaded reference data from {}", path.display());
        Ok(data)
    }

    /// `path` if given, the built-in dataset otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_path(p),
            None => Self::builtin(),
        }
    }

    pub fn paper(&self, id: &str) -> Option<&ResearchPaper> {
        self.papers.iter().find(|p| p.id == id)
    }

    /// Papers whose title, keywords or category mention `query` (case-insensitive)
    pub fn search_papers(&self, query: &str) -> Vec<&ResearchPaper> {
        let q = query.to_lowercase();
        self.papers
            .iter()
            .filter(|p| {
                p.title.to_lowercase().contains(&q)
                    || p.category.to_lowercase().contains(&q)
                    || p.keywords.iter().any(|k| k.to_lowercase().contains(&q))
            })
            .collect()
    }
}
