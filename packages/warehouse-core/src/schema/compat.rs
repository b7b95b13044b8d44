//! Column type compatibility under SQLite type affinity.

use super::model::ColumnType;

/// Category of a declared column type as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Real,
    Text,
    /// Anything outside the three modelled categories (BLOB, NUMERIC, empty, ...)
    Other(String),
}

impl TypeCategory {
    /// Classifies a declared type string, case-insensitively.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        match upper.as_str() {
            "INTEGER" => TypeCategory::Integer,
            "REAL" => TypeCategory::Real,
            "TEXT" => TypeCategory::Text,
            _ => TypeCategory::Other(upper),
        }
    }

    fn index(&self) -> Option<usize> {
        match self {
            TypeCategory::Integer => Some(0),
            TypeCategory::Real => Some(1),
            TypeCategory::Text => Some(2),
            TypeCategory::Other(_) => None,
        }
    }
}

impl From<ColumnType> for TypeCategory {
    fn from(value: ColumnType) -> Self {
        match value {
            ColumnType::Integer => TypeCategory::Integer,
            ColumnType::Real => TypeCategory::Real,
            ColumnType::Text => TypeCategory::Text,
        }
    }
}

/// Rows: expected INTEGER, REAL, TEXT. Columns: actual INTEGER, REAL, TEXT.
const COMPATIBILITY: [[bool; 3]; 3] = [
    [true, true, true],
    [true, true, true],
    [true, true, true],
];

/// Returns whether a column declared as `actual` satisfies `expected`.
pub fn is_compatible(expected: ColumnType, actual: &str) -> bool {
    let actual = TypeCategory::from_declared(actual);
    match (TypeCategory::from(expected).index(), actual.index()) {
        (Some(row), Some(column)) => COMPATIBILITY[row][column],
        _ => false,
    }
}
