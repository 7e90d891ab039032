use serde::{Deserialize, Deserializer};
use std::io::Read;

use super::{City, Department, EconomicActivity};

#[derive(Debug, Deserialize)]
struct DepartmentRow {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CityRow {
    id: String,
    name: String,
    department_id: String,
}

#[derive(Debug, Deserialize)]
struct ActivityRow {
    #[serde(deserialize_with = "trimmed")]
    code: String,
    #[serde(default, deserialize_with = "trimmed")]
    description: String,
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(value.trim().to_string())
}

fn reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source)
}

pub(crate) fn parse_departments<R: Read>(source: R) -> Result<Vec<Department>, csv::Error> {
    let mut departments = Vec::new();
    for row in reader(source).deserialize::<DepartmentRow>() {
        let row = row?;
        departments.push(Department {
            code: row.id,
            name: row.name,
        });
    }
    Ok(departments)
}

pub(crate) fn parse_cities<R: Read>(source: R) -> Result<Vec<City>, csv::Error> {
    let mut cities = Vec::new();
    for row in reader(source).deserialize::<CityRow>() {
        let row = row?;
        cities.push(City {
            code: row.id,
            name: row.name,
            department_code: row.department_id,
        });
    }
    Ok(cities)
}

pub(crate) fn parse_activities<R: Read>(source: R) -> Result<Vec<EconomicActivity>, csv::Error> {
    let mut activities = Vec::new();
    for row in reader(source).deserialize::<ActivityRow>() {
        let row = row?;
        if row.code.is_empty() {
            continue;
        }
        activities.push(EconomicActivity::new(row.code, row.description));
    }
    Ok(activities)
}
