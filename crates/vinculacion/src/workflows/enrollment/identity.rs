use serde::Serialize;

/// Name parts in the order the core system stores them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NameParts {
    pub first: String,
    pub middle: String,
    pub first_surname: String,
    pub second_surname: String,
}

/// Splits a full name into given names and surnames.
///
/// Three tokens read as name plus two surnames; from four tokens on, everything
/// after the first surname belongs to the second surname.
pub fn split_full_name(text: &str) -> NameParts {
    let upper = text.to_uppercase();
    let tokens: Vec<&str> = upper.split_whitespace().collect();

    match tokens.as_slice() {
        [] => NameParts::default(),
        [first] => NameParts {
            first: first.to_string(),
            ..NameParts::default()
        },
        [first, surname] => NameParts {
            first: first.to_string(),
            first_surname: surname.to_string(),
            ..NameParts::default()
        },
        [first, surname, second] => NameParts {
            first: first.to_string(),
            first_surname: surname.to_string(),
            second_surname: second.to_string(),
            ..NameParts::default()
        },
        [first, middle, surname, rest @ ..] => NameParts {
            first: first.to_string(),
            middle: middle.to_string(),
            first_surname: surname.to_string(),
            second_surname: rest.join(" "),
        },
    }
}

const CORE_DOCUMENT_CODES: &[(u8, &str)] = &[
    (1, "C"), // cedula de ciudadania
    (2, "T"), // tarjeta de identidad
    (3, "R"), // registro civil
    (4, "E"), // cedula de extranjeria
    (6, "N"), // NIT
    (8, "P"), // pasaporte
];

/// Core-system code for a document-type catalog code, if one exists.
pub fn core_document_code(code: &str) -> Option<&'static str> {
    let numeric = code.trim().parse::<u8>().ok()?;
    CORE_DOCUMENT_CODES
        .iter()
        .find(|(catalog, _)| *catalog == numeric)
        .map(|(_, core)| *core)
}

/// Maps a document-type code, keeping `prior` when the code has no mapping.
pub fn map_document_type(code: &str, prior: &str) -> String {
    core_document_code(code)
        .map(str::to_string)
        .unwrap_or_else(|| prior.to_string())
}
