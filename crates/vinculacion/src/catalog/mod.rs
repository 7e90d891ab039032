//! Read-only reference data: administrative divisions, economic activities,
//! document types and branches.

mod parser;
mod reference;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Department {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct City {
    pub code: String,
    pub name: String,
    pub department_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EconomicActivity {
    pub code: String,
    pub description: String,
    search_text: String,
}

impl EconomicActivity {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        let code = code.into();
        let description = description.into();
        let search_text = format!("{code} {description}").to_uppercase();
        Self {
            code,
            description,
            search_text,
        }
    }

    /// `"<code> - <description>"`, the text shown once an activity is picked.
    pub fn display_label(&self) -> String {
        format!("{} - {}", self.code, self.description)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentTypeOption {
    pub code: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub key: &'static str,
    pub name: &'static str,
}

/// Lookup service consulted by the enrollment assembler.
pub trait Catalog: Send + Sync {
    fn departments(&self) -> Vec<&Department>;
    fn department(&self, code: &str) -> Option<&Department>;
    fn cities_in(&self, department_code: &str) -> Vec<&City>;
    fn city(&self, code: &str) -> Option<&City>;
    fn economic_activity(&self, code: &str) -> Option<&EconomicActivity>;
    fn search_activities(&self, query: &str) -> Vec<&EconomicActivity>;

    fn document_types(&self) -> &'static [DocumentTypeOption] {
        reference::DOCUMENT_TYPES
    }

    fn branches(&self) -> &'static [Branch] {
        reference::BRANCHES
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to open catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog data: {0}")]
    Csv(#[from] csv::Error),
}

/// Catalog backed by `departments.csv`, `cities.csv` and `ciiu.csv`.
#[derive(Debug, Clone, Default)]
pub struct CsvCatalog {
    departments: BTreeMap<String, Department>,
    cities: BTreeMap<String, City>,
    activities: Vec<EconomicActivity>,
}

impl CsvCatalog {
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let open = |name: &str| {
            let path = dir.join(name);
            File::open(&path).map_err(|source| CatalogError::Io { path, source })
        };
        Self::from_readers(
            open("departments.csv")?,
            open("cities.csv")?,
            open("ciiu.csv")?,
        )
    }

    pub fn from_readers<D: Read, C: Read, A: Read>(
        departments: D,
        cities: C,
        activities: A,
    ) -> Result<Self, CatalogError> {
        let departments = parser::parse_departments(departments)?
            .into_iter()
            .map(|department| (department.code.clone(), department))
            .collect();
        let cities = parser::parse_cities(cities)?
            .into_iter()
            .map(|city| (city.code.clone(), city))
            .collect();
        let activities = parser::parse_activities(activities)?;

        Ok(Self {
            departments,
            cities,
            activities,
        })
    }
}

impl Catalog for CsvCatalog {
    fn departments(&self) -> Vec<&Department> {
        let mut departments: Vec<&Department> = self.departments.values().collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        departments
    }

    fn department(&self, code: &str) -> Option<&Department> {
        self.departments.get(code.trim())
    }

    fn cities_in(&self, department_code: &str) -> Vec<&City> {
        let department_code = department_code.trim();
        let mut cities: Vec<&City> = self
            .cities
            .values()
            .filter(|city| same_code(&city.department_code, department_code))
            .collect();
        cities.sort_by(|a, b| a.name.cmp(&b.name));
        cities
    }

    fn city(&self, code: &str) -> Option<&City> {
        self.cities.get(code.trim())
    }

    fn economic_activity(&self, code: &str) -> Option<&EconomicActivity> {
        let code = code.trim();
        self.activities.iter().find(|activity| activity.code == code)
    }

    fn search_activities(&self, query: &str) -> Vec<&EconomicActivity> {
        let needle = query.trim().to_uppercase();
        self.activities
            .iter()
            .filter(|activity| needle.is_empty() || activity.search_text.contains(&needle))
            .collect()
    }
}

/// Division codes compare numerically so `05` and `5` match.
fn same_code(left: &str, right: &str) -> bool {
    match (left.trim().parse::<u32>(), right.trim().parse::<u32>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => left.trim() == right.trim(),
    }
}
