//! Expected schema model.
//!
//! The warehouse validates against a closed set of tables, columns, foreign
//! keys and recommended indexes. The model is compile-time data and mirrors
//! [`SCHEMA_SQL`], the script used to initialise a compliant store.

use serde::Serialize;

/// Schema definition script that produces a store matching the model.
pub const SCHEMA_SQL: &str = include_str!("../../schema/schema.sql");

/// Declared column type category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    /// SQL spelling of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub column_type: ColumnType,
    /// Declared but not compared by the validator
    pub not_null: bool,
    pub primary_key: bool,
}

/// Expected foreign key `from_column -> to_table.to_column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ForeignKeySpec {
    pub from_column: &'static str,
    pub to_table: &'static str,
    pub to_column: &'static str,
}

/// Expected table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
    pub foreign_keys: &'static [ForeignKeySpec],
}

impl TableSpec {
    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Name of the single primary-key column.
    pub fn primary_key(&self) -> Option<&'static str> {
        self.columns.iter().find(|c| c.primary_key).map(|c| c.name)
    }
}

/// Recommended index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    pub name: &'static str,
    pub table: &'static str,
    pub columns: &'static [&'static str],
}

const fn pk(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        column_type: ColumnType::Integer,
        not_null: true,
        primary_key: true,
    }
}

const fn col(name: &'static str, column_type: ColumnType) -> ColumnSpec {
    ColumnSpec {
        name,
        column_type,
        not_null: false,
        primary_key: false,
    }
}

const fn fk(
    from_column: &'static str,
    to_table: &'static str,
    to_column: &'static str,
) -> ForeignKeySpec {
    ForeignKeySpec {
        from_column,
        to_table,
        to_column,
    }
}

use ColumnType::{Integer, Real, Text};

/// Expected tables in declared order.
pub const EXPECTED_TABLES: &[TableSpec] = &[
    TableSpec {
        name: "task_table",
        columns: &[
            pk("task_ID"),
            col("task_set", Integer),
            col("task_name", Text),
            col("task_describe", Text),
        ],
        foreign_keys: &[],
    },
    TableSpec {
        name: "subject_table",
        columns: &[pk("subject_ID"), col("subject_name", Text)],
        foreign_keys: &[],
    },
    TableSpec {
        name: "video_table",
        columns: &[
            pk("video_ID"),
            col("video_dir", Text),
            col("subject_ID", Integer),
            col("video_date", Text),
            col("video_length", Integer),
        ],
        foreign_keys: &[fk("subject_ID", "subject_table", "subject_ID")],
    },
    TableSpec {
        name: "tag_table",
        columns: &[
            pk("tag_ID"),
            col("video_ID", Integer),
            col("task_ID", Integer),
            col("start", Integer),
            col("end", Integer),
        ],
        foreign_keys: &[
            fk("video_ID", "video_table", "video_ID"),
            fk("task_ID", "task_table", "task_ID"),
        ],
    },
    TableSpec {
        name: "core_lib_table",
        columns: &[
            pk("core_lib_ID"),
            col("core_lib_version", Text),
            col("core_lib_update_information", Text),
            col("core_lib_base_version_ID", Integer),
            col("core_lib_commit_hash", Text),
        ],
        foreign_keys: &[fk("core_lib_base_version_ID", "core_lib_table", "core_lib_ID")],
    },
    TableSpec {
        name: "core_lib_output_table",
        columns: &[
            pk("core_lib_output_ID"),
            col("core_lib_ID", Integer),
            col("video_ID", Integer),
            col("core_lib_output_dir", Text),
        ],
        foreign_keys: &[
            fk("core_lib_ID", "core_lib_table", "core_lib_ID"),
            fk("video_ID", "video_table", "video_ID"),
        ],
    },
    TableSpec {
        name: "algorithm_table",
        columns: &[
            pk("algorithm_ID"),
            col("algorithm_version", Text),
            col("algorithm_update_information", Text),
            col("algorithm_base_version_ID", Integer),
            col("algorithm_commit_hash", Text),
        ],
        foreign_keys: &[fk("algorithm_base_version_ID", "algorithm_table", "algorithm_ID")],
    },
    TableSpec {
        name: "algorithm_output_table",
        columns: &[
            pk("algorithm_output_ID"),
            col("algorithm_ID", Integer),
            col("core_lib_output_ID", Integer),
            col("algorithm_output_dir", Text),
        ],
        foreign_keys: &[
            fk("algorithm_ID", "algorithm_table", "algorithm_ID"),
            fk("core_lib_output_ID", "core_lib_output_table", "core_lib_output_ID"),
        ],
    },
    TableSpec {
        name: "evaluation_result_table",
        columns: &[
            pk("evaluation_result_ID"),
            col("version", Text),
            col("algorithm_ID", Integer),
            col("true_positive", Real),
            col("false_positive", Real),
            col("evaluation_result_dir", Text),
            col("evaluation_timestamp", Text),
        ],
        foreign_keys: &[fk("algorithm_ID", "algorithm_table", "algorithm_ID")],
    },
    TableSpec {
        name: "evaluation_data_table",
        columns: &[
            pk("evaluation_data_ID"),
            col("evaluation_result_ID", Integer),
            col("algorithm_output_ID", Integer),
            col("correct_task_num", Integer),
            col("total_task_num", Integer),
            col("evaluation_data_path", Text),
        ],
        foreign_keys: &[
            fk("evaluation_result_ID", "evaluation_result_table", "evaluation_result_ID"),
            fk("algorithm_output_ID", "algorithm_output_table", "algorithm_output_ID"),
        ],
    },
    TableSpec {
        name: "analysis_result_table",
        columns: &[
            pk("analysis_result_ID"),
            col("analysis_result_dir", Text),
            col("analysis_timestamp", Text),
            col("evaluation_result_ID", Integer),
        ],
        foreign_keys: &[fk("evaluation_result_ID", "evaluation_result_table", "evaluation_result_ID")],
    },
    TableSpec {
        name: "problem_table",
        columns: &[
            pk("problem_ID"),
            col("problem_name", Text),
            col("problem_description", Text),
            col("problem_status", Text),
            col("analysis_result_ID", Integer),
        ],
        foreign_keys: &[fk("analysis_result_ID", "analysis_result_table", "analysis_result_ID")],
    },
    TableSpec {
        name: "analysis_data_table",
        columns: &[
            pk("analysis_data_ID"),
            col("evaluation_data_ID", Integer),
            col("analysis_result_ID", Integer),
            col("problem_ID", Integer),
            col("analysis_data_isproblem", Integer),
            col("analysis_data_dir", Text),
            col("analysis_data_description", Text),
        ],
        foreign_keys: &[
            fk("evaluation_data_ID", "evaluation_data_table", "evaluation_data_ID"),
            fk("analysis_result_ID", "analysis_result_table", "analysis_result_ID"),
            fk("problem_ID", "problem_table", "problem_ID"),
        ],
    },
];

/// Recommended indexes.
pub const EXPECTED_INDEXES: &[IndexSpec] = &[
    IndexSpec {
        name: "idx_core_lib_version",
        table: "core_lib_table",
        columns: &["core_lib_version"],
    },
    IndexSpec {
        name: "idx_algorithm_version",
        table: "algorithm_table",
        columns: &["algorithm_version"],
    },
];

/// Looks up an expected table by name.
pub fn expected_table(name: &str) -> Option<&'static TableSpec> {
    EXPECTED_TABLES.iter().find(|t| t.name == name)
}
