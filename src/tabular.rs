use std::collections::HashSet;

use crate::domain::ColumnDataType;

/// At most this many data rows are kept as the dataset sample.
pub const SAMPLE_ROW_LIMIT: usize = 5;

/// At most this many non-blank values per column feed type inference.
pub const SAMPLE_VALUE_LIMIT: usize = 5;

/// A sampled column with more distinct values than this is never categorical.
const CATEGORICAL_MAX_DISTINCT: usize = 10;

const BOOLEAN_TOKENS: [&str; 6] = ["true", "false", "1", "0", "yes", "no"];

/// A parsed delimited file: cleaned header names plus every non-blank data
/// row, split the same way as the header.
#[derive(Debug, Clone, Default)]
pub struct TableSlice {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Per-column inference output, ready to be persisted as a ColumnInfo row.
#[derive(Debug, Clone)]
pub struct InferredColumn {
    pub name: String,
    pub data_type: ColumnDataType,
    pub null_count: i32,
    pub unique_count: i32,
    pub sample_values: Vec<String>,
    pub is_potential_target: bool,
    pub is_potential_treatment: bool,
}

/// Trims a cell and strips one pair of surrounding quote characters.
pub fn clean_cell(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| {
            trimmed
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
        })
        .unwrap_or(trimmed);
    unquoted.to_string()
}

/// Naive comma split. Quoted commas are not interpreted; the upload format
/// is defined as plain comma-delimited text with a header row.
pub fn split_line(line: &str) -> Vec<String> {
    line.split(',').map(clean_cell).collect()
}

/// Coarse shape of raw uploaded content: header field count and the number
/// of non-blank lines after the header. Empty input is (0, 0).
pub fn compute_shape(content: &str) -> (i32, i32) {
    let mut lines = content.lines();
    let columns = lines.next().map(|h| h.split(',').count()).unwrap_or(0);
    let rows = lines.filter(|l| !l.trim().is_empty()).count();
    (columns as i32, rows as i32)
}

pub fn parse_table(content: &str) -> TableSlice {
    let mut lines = content.lines();
    let header = match lines.next() {
        Some(line) => split_line(line),
        None => return TableSlice::default(),
    };

    let rows = lines
        .filter(|l| !l.trim().is_empty())
        .map(split_line)
        .collect();

    TableSlice { header, rows }
}

impl TableSlice {
    pub fn sample_rows(&self) -> Vec<Vec<String>> {
        self.rows.iter().take(SAMPLE_ROW_LIMIT).cloned().collect()
    }
}

fn is_numeric(value: &str) -> bool {
    value.parse::<f64>().map(|n| n.is_finite()).unwrap_or(false)
}

fn is_boolean_token(value: &str) -> bool {
    let lowered = value.to_lowercase();
    BOOLEAN_TOKENS.contains(&lowered.as_str())
}

/// Classifies a column from its sampled values. Precedence matters:
/// "1"/"0" columns read as numeric before the boolean check sees them.
pub fn classify_values(samples: &[String]) -> ColumnDataType {
    if samples.is_empty() {
        return ColumnDataType::Text;
    }

    if samples.iter().all(|v| is_numeric(v)) {
        return ColumnDataType::Numeric;
    }

    if samples.iter().all(|v| is_boolean_token(v)) {
        return ColumnDataType::Boolean;
    }

    let distinct: HashSet<&str> = samples.iter().map(String::as_str).collect();
    if distinct.len() <= CATEGORICAL_MAX_DISTINCT && distinct.len() < samples.len() {
        return ColumnDataType::Categorical;
    }

    ColumnDataType::Text
}

/// Infers type, candidate role, and value statistics for every header
/// column. Classification looks at up to SAMPLE_VALUE_LIMIT values from the
/// sampled rows; null and unique counts scan every parsed row (a blank or
/// missing cell counts as null).
pub fn profile_columns(table: &TableSlice) -> Vec<InferredColumn> {
    let sample_rows = table.sample_rows();

    table
        .header
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let sample_values: Vec<String> = sample_rows
                .iter()
                .filter_map(|row| row.get(idx))
                .filter(|v| !v.is_empty())
                .take(SAMPLE_VALUE_LIMIT)
                .cloned()
                .collect();

            let data_type = classify_values(&sample_values);

            let mut null_count = 0usize;
            let mut distinct: HashSet<&str> = HashSet::new();
            for row in &table.rows {
                match row.get(idx) {
                    Some(cell) if !cell.is_empty() => {
                        distinct.insert(cell.as_str());
                    }
                    _ => null_count += 1,
                }
            }

            InferredColumn {
                name: name.clone(),
                data_type,
                null_count: null_count as i32,
                unique_count: distinct.len() as i32,
                sample_values,
                is_potential_target: data_type == ColumnDataType::Numeric,
                is_potential_treatment: matches!(
                    data_type,
                    ColumnDataType::Boolean | ColumnDataType::Categorical
                ),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_shape() {
        assert_eq!(compute_shape(""), (0, 0));
        let table = parse_table("");
        assert!(table.header.is_empty());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn header_only_input_counts_columns_but_no_rows() {
        assert_eq!(compute_shape("a,b,c\n"), (3, 0));
    }

    #[test]
    fn blank_lines_are_not_rows() {
        let content = "a,b\n1,2\n\n   \n3,4\n";
        assert_eq!(compute_shape(content), (2, 2));
        assert_eq!(parse_table(content).rows.len(), 2);
    }

    #[test]
    fn cells_are_trimmed_and_unquoted() {
        assert_eq!(clean_cell("  \"age\" "), "age");
        assert_eq!(clean_cell("'city'"), "city");
        assert_eq!(clean_cell(" plain "), "plain");
        // An unmatched quote stays put.
        assert_eq!(clean_cell("\"half"), "\"half");
        assert_eq!(
            split_line("\"a\", b ,'c'"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn sample_is_capped_at_five_rows() {
        let mut content = String::from("x\n");
        for i in 0..8 {
            content.push_str(&format!("{}\n", i));
        }
        let table = parse_table(&content);
        assert_eq!(table.rows.len(), 8);
        let sample = table.sample_rows();
        assert_eq!(sample.len(), SAMPLE_ROW_LIMIT);
        assert_eq!(sample[0], vec!["0".to_string()]);
        assert_eq!(sample[4], vec!["4".to_string()]);
    }

    #[test]
    fn all_numeric_samples_classify_as_numeric() {
        let samples = vec!["1.5".to_string(), "-3".to_string(), "2e4".to_string()];
        assert_eq!(classify_values(&samples), ColumnDataType::Numeric);
    }

    #[test]
    fn numeric_wins_over_boolean_for_zero_one() {
        let samples = vec!["1".to_string(), "0".to_string(), "1".to_string()];
        assert_eq!(classify_values(&samples), ColumnDataType::Numeric);
    }

    #[test]
    fn boolean_tokens_classify_as_boolean() {
        let samples = vec![
            "true".to_string(),
            "FALSE".to_string(),
            "Yes".to_string(),
            "no".to_string(),
        ];
        assert_eq!(classify_values(&samples), ColumnDataType::Boolean);
    }

    #[test]
    fn repeated_values_classify_as_categorical() {
        let samples = vec![
            "red".to_string(),
            "blue".to_string(),
            "red".to_string(),
            "blue".to_string(),
            "red".to_string(),
        ];
        assert_eq!(classify_values(&samples), ColumnDataType::Categorical);
    }

    #[test]
    fn all_distinct_values_classify_as_text() {
        let samples = vec![
            "alice".to_string(),
            "bob".to_string(),
            "carol".to_string(),
        ];
        assert_eq!(classify_values(&samples), ColumnDataType::Text);
    }

    #[test]
    fn empty_sample_classifies_as_text() {
        assert_eq!(classify_values(&[]), ColumnDataType::Text);
    }

    #[test]
    fn profile_flags_targets_and_treatments() {
        let content = "\
age,treated,segment,comment
34,true,a,first
41,false,b,second
29,true,a,third
55,false,b,fourth
61,true,a,fifth
";
        let table = parse_table(content);
        let columns = profile_columns(&table);
        assert_eq!(columns.len(), 4);

        let age = &columns[0];
        assert_eq!(age.data_type, ColumnDataType::Numeric);
        assert!(age.is_potential_target);
        assert!(!age.is_potential_treatment);

        let treated = &columns[1];
        assert_eq!(treated.data_type, ColumnDataType::Boolean);
        assert!(treated.is_potential_treatment);
        assert!(!treated.is_potential_target);

        let segment = &columns[2];
        assert_eq!(segment.data_type, ColumnDataType::Categorical);
        assert!(segment.is_potential_treatment);

        let comment = &columns[3];
        assert_eq!(comment.data_type, ColumnDataType::Text);
        assert!(!comment.is_potential_target);
        assert!(!comment.is_potential_treatment);
    }

    #[test]
    fn null_and_unique_counts_scan_the_whole_table() {
        let mut content = String::from("score\n");
        for i in 0..7 {
            content.push_str(&format!("{}\n", i % 3));
        }
        content.push_str("\n,\n"); // one blank line (skipped), one empty cell
        let table = parse_table(&content);
        let columns = profile_columns(&table);

        assert_eq!(columns[0].unique_count, 3);
        assert_eq!(columns[0].null_count, 1);
    }

    #[test]
    fn short_rows_count_as_nulls_for_missing_columns() {
        let content = "a,b\n1,2\n3\n";
        let columns = profile_columns(&parse_table(content));
        assert_eq!(columns[1].null_count, 1);
        assert_eq!(columns[1].unique_count, 1);
    }

    #[test]
    fn sample_values_skip_blanks() {
        let content = "v\n\nx\n,\nx\ny\n";
        let table = parse_table(content);
        let columns = profile_columns(&table);
        assert_eq!(
            columns[0].sample_values,
            vec!["x".to_string(), "x".to_string(), "y".to_string()]
        );
    }
}
