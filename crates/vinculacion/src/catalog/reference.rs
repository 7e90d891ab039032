use super::{Branch, DocumentTypeOption};

pub(crate) const DOCUMENT_TYPES: &[DocumentTypeOption] = &[
    document_type("1", "Cedula de ciudadania"),
    document_type("2", "Tarjeta de identidad"),
    document_type("3", "Registro civil"),
    document_type("4", "Cedula de extranjeria"),
    document_type("5", "Documento definido por la DIAN"),
    document_type("6", "NIT"),
    document_type("7", "P.E.P."),
    document_type("8", "Pasaporte"),
    document_type("9", "Visa"),
];

pub(crate) const BRANCHES: &[Branch] = &[
    branch("PRINCIPAL", "Principal"),
    branch("POPULAR", "Popular"),
    branch("MONTECARLO", "Montecarlo"),
    branch("PORFIA", "Porfia"),
    branch("CATAMA", "Catama"),
    branch("ACACIAS", "Acacias"),
    branch("GRANADA", "Granada"),
    branch("GUAYABETAL", "Guayabetal"),
    branch("BARRANCA", "Barranca"),
    branch("PUERTO_GAITAN", "Puerto Gaitan"),
    branch("CABUYARO", "Cabuyaro"),
    branch("VISTAHERMOSA", "Vistahermosa"),
    branch("PUERTO_LOPEZ", "Puerto Lopez"),
    branch("EL_CASTILLO", "El Castillo"),
    branch("CUMARAL", "Cumaral"),
    branch("LEJANIAS", "Lejanias"),
    branch("MESETAS", "Mesetas"),
    branch("PUERTO_RICO", "Puerto Rico"),
    branch("PUERTO_LLERAS", "Puerto Lleras"),
    branch("URIBE", "Uribe"),
    branch("YOPAL", "Yopal"),
    branch("VILLANUEVA", "Villanueva"),
];

const fn document_type(code: &'static str, label: &'static str) -> DocumentTypeOption {
    DocumentTypeOption { code, label }
}

const fn branch(key: &'static str, name: &'static str) -> Branch {
    Branch { key, name }
}
