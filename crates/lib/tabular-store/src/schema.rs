/// Maximum number of rows any query result carries.
pub const MAX_RESULT_ROWS: usize = 10;

/// Deepest nesting accepted in a filter expression. Parentheses, prefix
/// operators and each chained binary operator count one level.
pub const MAX_FILTER_DEPTH: usize = 64;

/// Number of frequent values reported for categorical columns.
pub const TOP_VALUES: usize = 5;

/// Percentage of non-null cells that must parse as a type for a column to take it.
pub const TYPE_THRESHOLD_PERCENT: usize = 95;

/// Bookkeeping table holding the table names written by the previous run.
pub const TABLE_CATALOG: &str = "_tabular_catalog";

/// Field reserved for the record id in the persistent store.
pub const FIELD_RECORD_ID: &str = "id";

/// Name a source column called `id` is stored under in the persistent store.
pub const FIELD_RECORD_ID_ALIAS: &str = "id_";

pub const EXT_CSV: &str = "csv";
pub const EXT_TSV: &str = "tsv";

/// Cell contents treated as missing values.
pub const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "NULL", "null", "None", "#N/A", "<NA>",
];

#[must_use]
pub fn is_null_token(raw: &str) -> bool {
    NULL_TOKENS.contains(&raw)
}

/// Returns the column delimiter for a recognised file extension.
#[must_use]
pub fn delimiter_for_extension(extension: &str) -> Option<u8> {
    if extension.eq_ignore_ascii_case(EXT_CSV) {
        Some(b',')
    } else if extension.eq_ignore_ascii_case(EXT_TSV) {
        Some(b'\t')
    } else {
        None
    }
}
