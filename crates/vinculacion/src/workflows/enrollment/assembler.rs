use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::domain::BasicData;
use super::errors::ValidationError;
use super::identity::{map_document_type, split_full_name};
use crate::catalog::Catalog;

/// Stage-3 form fields, keyed by the core system's field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FormField {
    #[serde(rename = "tipoDocumento")]
    DocumentType,
    #[serde(rename = "identificacion")]
    Identification,
    #[serde(rename = "primerNombre")]
    FirstName,
    #[serde(rename = "segundoNombre")]
    MiddleName,
    #[serde(rename = "primerApellido")]
    FirstSurname,
    #[serde(rename = "segundoApellido")]
    SecondSurname,
    #[serde(rename = "fechaNacimiento")]
    BirthDate,
    #[serde(rename = "genero")]
    Gender,
    #[serde(rename = "estadoCivil")]
    MaritalStatus,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "celular")]
    Mobile,
    #[serde(rename = "telefono")]
    Phone,
    #[serde(rename = "direccion")]
    Address,
    #[serde(rename = "barrio")]
    Neighborhood,
    #[serde(rename = "departamento")]
    Department,
    #[serde(rename = "ciudad")]
    City,
    #[serde(rename = "estrato")]
    Stratum,
    #[serde(rename = "tipoVivienda")]
    HousingType,
    #[serde(rename = "nivelEstudio")]
    EducationLevel,
    #[serde(rename = "actividadEconomica")]
    EconomicSector,
    #[serde(rename = "ocupacion")]
    Occupation,
    #[serde(rename = "actividadCIIU")]
    PrimaryActivity,
    #[serde(rename = "actividadCIIUSecundaria")]
    SecondaryActivity,
    #[serde(rename = "poblacionVulnerable")]
    VulnerablePopulation,
    #[serde(rename = "personasCargo")]
    Dependents,
    #[serde(rename = "salario")]
    Salary,
    #[serde(rename = "sucursal")]
    Branch,
    #[serde(rename = "fechaAfiliacion")]
    AffiliationDate,
}

impl FormField {
    pub const ALL: [FormField; 28] = [
        Self::DocumentType,
        Self::Identification,
        Self::FirstName,
        Self::MiddleName,
        Self::FirstSurname,
        Self::SecondSurname,
        Self::BirthDate,
        Self::Gender,
        Self::MaritalStatus,
        Self::Email,
        Self::Mobile,
        Self::Phone,
        Self::Address,
        Self::Neighborhood,
        Self::Department,
        Self::City,
        Self::Stratum,
        Self::HousingType,
        Self::EducationLevel,
        Self::EconomicSector,
        Self::Occupation,
        Self::PrimaryActivity,
        Self::SecondaryActivity,
        Self::VulnerablePopulation,
        Self::Dependents,
        Self::Salary,
        Self::Branch,
        Self::AffiliationDate,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::DocumentType => "tipoDocumento",
            Self::Identification => "identificacion",
            Self::FirstName => "primerNombre",
            Self::MiddleName => "segundoNombre",
            Self::FirstSurname => "primerApellido",
            Self::SecondSurname => "segundoApellido",
            Self::BirthDate => "fechaNacimiento",
            Self::Gender => "genero",
            Self::MaritalStatus => "estadoCivil",
            Self::Email => "email",
            Self::Mobile => "celular",
            Self::Phone => "telefono",
            Self::Address => "direccion",
            Self::Neighborhood => "barrio",
            Self::Department => "departamento",
            Self::City => "ciudad",
            Self::Stratum => "estrato",
            Self::HousingType => "tipoVivienda",
            Self::EducationLevel => "nivelEstudio",
            Self::EconomicSector => "actividadEconomica",
            Self::Occupation => "ocupacion",
            Self::PrimaryActivity => "actividadCIIU",
            Self::SecondaryActivity => "actividadCIIUSecundaria",
            Self::VulnerablePopulation => "poblacionVulnerable",
            Self::Dependents => "personasCargo",
            Self::Salary => "salario",
            Self::Branch => "sucursal",
            Self::AffiliationDate => "fechaAfiliacion",
        }
    }

    /// Label used in validation messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::DocumentType => "tipo de documento",
            Self::Identification => "identificacion",
            Self::FirstName => "primer nombre",
            Self::MiddleName => "segundo nombre",
            Self::FirstSurname => "primer apellido",
            Self::SecondSurname => "segundo apellido",
            Self::BirthDate => "fecha de nacimiento",
            Self::Gender => "genero",
            Self::MaritalStatus => "estado civil",
            Self::Email => "correo electronico",
            Self::Mobile => "celular",
            Self::Phone => "telefono",
            Self::Address => "direccion",
            Self::Neighborhood => "barrio",
            Self::Department => "departamento",
            Self::City => "ciudad",
            Self::Stratum => "estrato",
            Self::HousingType => "tipo de vivienda",
            Self::EducationLevel => "nivel de estudio",
            Self::EconomicSector => "actividad economica",
            Self::Occupation => "ocupacion",
            Self::PrimaryActivity => "actividad CIIU",
            Self::SecondaryActivity => "actividad CIIU secundaria",
            Self::VulnerablePopulation => "poblacion vulnerable",
            Self::Dependents => "personas a cargo",
            Self::Salary => "salario",
            Self::Branch => "sucursal",
            Self::AffiliationDate => "fecha de afiliacion",
        }
    }

    fn is_upper_cased(self) -> bool {
        matches!(
            self,
            Self::FirstName
                | Self::MiddleName
                | Self::FirstSurname
                | Self::SecondSurname
                | Self::Address
                | Self::Neighborhood
        )
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown form field `{0}`")]
pub struct UnknownFormField(pub String);

impl FromStr for FormField {
    type Err = UnknownFormField;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.key().eq_ignore_ascii_case(value))
            .ok_or_else(|| UnknownFormField(value.to_string()))
    }
}

const FORM_DEFAULTS: &[(FormField, &str)] = &[
    (FormField::DocumentType, "C"),
    (FormField::Gender, "M"),
    (FormField::MaritalStatus, "S"),
    (FormField::Stratum, "3"),
    (FormField::HousingType, "P"),
    (FormField::EducationLevel, "U"),
    (FormField::EconomicSector, "EM"),
    (FormField::Occupation, "1"),
    (FormField::SecondaryActivity, "000"),
    (FormField::VulnerablePopulation, "N"),
    (FormField::Dependents, "0"),
    (FormField::Branch, "102"),
];

const REQUIRED_FIELDS: &[FormField] = &[
    FormField::DocumentType,
    FormField::Identification,
    FormField::BirthDate,
    FormField::FirstName,
    FormField::FirstSurname,
    FormField::Gender,
    FormField::MaritalStatus,
    FormField::Mobile,
    FormField::Address,
    FormField::Neighborhood,
    FormField::Stratum,
    FormField::Occupation,
    FormField::Dependents,
    FormField::Salary,
];

/// Stage-3 form values plus the set of fields the applicant has edited.
///
/// Values derived from the basic data only fill fields that were never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentForm {
    values: BTreeMap<FormField, String>,
    #[serde(skip)]
    overrides: BTreeSet<FormField>,
}

impl Default for EnrollmentForm {
    fn default() -> Self {
        let values = FORM_DEFAULTS
            .iter()
            .map(|(field, value)| (*field, value.to_string()))
            .collect();
        Self {
            values,
            overrides: BTreeSet::new(),
        }
    }
}

impl EnrollmentForm {
    pub fn value(&self, field: FormField) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn is_overridden(&self, field: FormField) -> bool {
        self.overrides.contains(&field)
    }

    /// Applies an applicant edit with the per-field normalization rules.
    pub fn edit(mut self, field: FormField, value: &str) -> Self {
        let normalized = if field.is_upper_cased() {
            value.to_uppercase()
        } else if field == FormField::Salary {
            normalize_salary(value)
        } else {
            value.to_string()
        };

        if field == FormField::Department && self.value(FormField::Department) != normalized {
            self.values.insert(FormField::City, String::new());
        }
        if field == FormField::Mobile {
            self.values.insert(FormField::Phone, normalized.clone());
        }

        self.values.insert(field, normalized);
        self.overrides.insert(field);
        self
    }

    /// Merges values derived from stage-1 data. Edited fields are left alone.
    pub fn apply_defaults(mut self, basic: &BasicData) -> Self {
        let names = split_full_name(&basic.full_name);
        let document_type = map_document_type(
            &basic.document_type,
            self.value(FormField::DocumentType),
        );
        let derived = [
            (FormField::DocumentType, document_type),
            (FormField::Identification, basic.document_number.trim().to_string()),
            (FormField::FirstName, names.first),
            (FormField::MiddleName, names.middle),
            (FormField::FirstSurname, names.first_surname),
            (FormField::SecondSurname, names.second_surname),
            (FormField::Branch, basic.branch.trim().to_string()),
        ];

        for (field, value) in derived {
            if value.is_empty() || self.overrides.contains(&field) {
                continue;
            }
            self.values.insert(field, value);
        }
        self
    }

    fn required(&self, field: FormField) -> Result<&str, ValidationError> {
        let value = self.value(field).trim();
        if value.is_empty() {
            Err(ValidationError::MissingField(field.label()))
        } else {
            Ok(value)
        }
    }

    fn optional(&self, field: FormField) -> Option<&str> {
        let value = self.value(field).trim();
        (!value.is_empty()).then_some(value)
    }
}

/// Keeps only the digit characters. Idempotent.
pub fn normalize_salary(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]{2,}$").expect("email pattern compiles")
    })
}

pub fn is_valid_email(candidate: &str) -> bool {
    email_pattern().is_match(&candidate.trim().to_lowercase())
}

/// Record posted to the core system, flattened next to `preregistroId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRecord {
    pub tipo_documento: String,
    pub identificacion: String,
    pub primer_nombre: String,
    pub segundo_nombre: String,
    pub primer_apellido: String,
    pub segundo_apellido: String,
    pub fecha_nacimiento: NaiveDate,
    pub genero: String,
    pub estado_civil: String,
    pub email: String,
    pub celular: String,
    pub telefono: String,
    pub direccion: String,
    pub barrio: String,
    pub departamento: String,
    pub ciudad: String,
    pub estrato: u8,
    pub tipo_vivienda: String,
    pub nivel_estudio: String,
    pub actividad_economica: String,
    pub ocupacion: String,
    #[serde(rename = "actividadCIIU")]
    pub actividad_ciiu: String,
    #[serde(rename = "actividadCIIUSecundaria")]
    pub actividad_ciiu_secundaria: String,
    pub poblacion_vulnerable: String,
    pub publicamente_expuesto: String,
    pub personas_cargo: u32,
    pub salario: String,
    pub operaciones_moneda_extranjera: String,
    pub declara_renta: String,
    pub administra_recursos_publicos: String,
    pub vinculado_recursos_publicos: String,
    pub sucursal: String,
    pub fecha_afiliacion: NaiveDate,
}

/// Validates the form and assembles the submission record.
///
/// Checks run in the order the applicant sees them: location, email, primary
/// activity, then the remaining required and typed fields.
pub fn build_record(
    form: &EnrollmentForm,
    basic: &BasicData,
    catalog: &dyn Catalog,
    today: NaiveDate,
) -> Result<EnrollmentRecord, ValidationError> {
    let (department, city) = match (
        form.optional(FormField::Department),
        form.optional(FormField::City),
    ) {
        (Some(department), Some(city)) => (department, city),
        _ => return Err(ValidationError::MissingLocation),
    };
    if !catalog
        .cities_in(department)
        .iter()
        .any(|candidate| candidate.code == city)
    {
        return Err(ValidationError::CityOutsideDepartment);
    }

    let email = form.value(FormField::Email).trim().to_lowercase();
    if !email_pattern().is_match(&email) {
        return Err(ValidationError::InvalidEmail);
    }

    let activity = form
        .optional(FormField::PrimaryActivity)
        .and_then(|code| catalog.economic_activity(code))
        .ok_or(ValidationError::MissingEconomicActivity)?;

    for field in REQUIRED_FIELDS {
        form.required(*field)?;
    }

    let birth_date = parse_date(form.required(FormField::BirthDate)?)
        .ok_or(ValidationError::InvalidField(FormField::BirthDate.label()))?;
    let stratum = form
        .required(FormField::Stratum)?
        .parse::<u8>()
        .ok()
        .filter(|stratum| (1..=6).contains(stratum))
        .ok_or(ValidationError::InvalidField(FormField::Stratum.label()))?;
    let dependents = form
        .required(FormField::Dependents)?
        .parse::<u32>()
        .map_err(|_| ValidationError::InvalidField(FormField::Dependents.label()))?;
    let affiliation_date = match form.optional(FormField::AffiliationDate) {
        Some(value) => parse_date(value)
            .ok_or(ValidationError::InvalidField(FormField::AffiliationDate.label()))?,
        None => today,
    };

    let mobile = form.required(FormField::Mobile)?.to_string();
    let or_default = |field: FormField, fallback: &str| {
        form.optional(field).unwrap_or(fallback).to_string()
    };
    let branch = form
        .optional(FormField::Branch)
        .or_else(|| Some(basic.branch.trim()).filter(|branch| !branch.is_empty()))
        .unwrap_or("PRINCIPAL")
        .to_string();
    let flag_off = || "N".to_string();

    Ok(EnrollmentRecord {
        tipo_documento: form.required(FormField::DocumentType)?.to_string(),
        identificacion: form.required(FormField::Identification)?.to_string(),
        primer_nombre: form.required(FormField::FirstName)?.to_string(),
        segundo_nombre: or_default(FormField::MiddleName, ""),
        primer_apellido: form.required(FormField::FirstSurname)?.to_string(),
        segundo_apellido: or_default(FormField::SecondSurname, ""),
        fecha_nacimiento: birth_date,
        genero: form.required(FormField::Gender)?.to_string(),
        estado_civil: form.required(FormField::MaritalStatus)?.to_string(),
        email,
        telefono: mobile.clone(),
        celular: mobile,
        direccion: form.required(FormField::Address)?.to_string(),
        barrio: form.required(FormField::Neighborhood)?.to_string(),
        departamento: department.to_string(),
        ciudad: city.to_string(),
        estrato: stratum,
        tipo_vivienda: or_default(FormField::HousingType, "P"),
        nivel_estudio: or_default(FormField::EducationLevel, "U"),
        actividad_economica: or_default(FormField::EconomicSector, "EM"),
        ocupacion: form.required(FormField::Occupation)?.to_string(),
        actividad_ciiu: activity.code.clone(),
        actividad_ciiu_secundaria: or_default(FormField::SecondaryActivity, "000"),
        poblacion_vulnerable: or_default(FormField::VulnerablePopulation, "N"),
        publicamente_expuesto: flag_off(),
        personas_cargo: dependents,
        salario: normalize_salary(form.required(FormField::Salary)?),
        operaciones_moneda_extranjera: flag_off(),
        declara_renta: flag_off(),
        administra_recursos_publicos: flag_off(),
        vinculado_recursos_publicos: flag_off(),
        sucursal: branch,
        fecha_afiliacion: affiliation_date,
    })
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}
