use std::collections::HashMap;

use crate::bcp::ROW_TERMINATOR;
use crate::frame::Column;

/// Collation written for every column of the non-XML format file.
pub const SQL_COLLATION: &str = "SQL_Latin1_General_CP1_CI_AS";

// Every field is shipped as character data.
const HOST_FILE_DATA_TYPE: &str = "SQLCHAR";

const FORMAT_FILE_VERSION: &str = "9.0";

const SECTION_GAP: &str = "    ";

fn escape_terminator(terminator: &str) -> String {
    terminator
        .replace('"', "\\\"")
        .replace('\'', "\\'")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

/// Builds the bcp non-XML format file text, one line per column.
///
/// `db_cols_order` maps column names to their 1-based ordinal in the
/// destination table, needed when the frame's column order does not match the
/// table's. Without it columns map positionally.
///
/// The terminator must be surrounded by double quotes or bcp fails with
/// "Unexpected EOF encountered in BCP data-file". The last column is
/// terminated by the row terminator instead of the field delimiter.
///
/// See https://docs.microsoft.com/en-us/sql/relational-databases/import-export/non-xml-format-files-sql-server
pub fn build_format_file(
    columns: &[Column],
    delimiter: char,
    db_cols_order: Option<&HashMap<String, u16>>,
) -> String {
    let mut format_file = format!("{FORMAT_FILE_VERSION}\n{}\n", columns.len());

    for (index, column) in columns.iter().enumerate() {
        let ordinal = index + 1;
        let terminator = if ordinal == columns.len() {
            escape_terminator(ROW_TERMINATOR)
        } else {
            escape_terminator(&delimiter.to_string())
        };
        let server_ordinal = db_cols_order
            .and_then(|order| order.get(&column.name).copied())
            .unwrap_or(ordinal as u16);

        let line = [
            ordinal.to_string(),             // host file field order
            HOST_FILE_DATA_TYPE.to_string(), // host file data type
            "0".to_string(),                 // prefix length
            "0".to_string(),                 // host file data length
            format!("\"{terminator}\""),     // terminator
            server_ordinal.to_string(),      // server column order
            column.name.clone(),             // server column name
            SQL_COLLATION.to_string(),       // column collation
            "\n".to_string(),
        ];
        format_file.push_str(&line.join(SECTION_GAP));
    }

    format_file
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::SqlType;

    fn escaped_row_terminator() -> &'static str {
        if cfg!(windows) {
            "\\r\\n"
        } else {
            "\\n"
        }
    }

    #[test]
    fn test_two_column_format_file() {
        let columns =
            vec![Column::new("name", SqlType::NVarChar), Column::new("year", SqlType::BigInt)];

        let expected = format!(
            "9.0\n2\n\
             1    SQLCHAR    0    0    \",\"    1    name    SQL_Latin1_General_CP1_CI_AS    \n\
             2    SQLCHAR    0    0    \"{}\"    2    year    SQL_Latin1_General_CP1_CI_AS    \n",
            escaped_row_terminator()
        );
        assert_eq!(build_format_file(&columns, ',', None), expected);
    }

    #[test]
    fn test_tab_delimiter_is_escaped_verbatim() {
        let columns =
            vec![Column::new("a", SqlType::BigInt), Column::new("b", SqlType::BigInt)];
        let format_file = build_format_file(&columns, '\t', None);
        // a raw tab inside the quotes, only CR/LF/quotes get escapes
        assert!(format_file.contains("\"\t\""));
    }

    #[test]
    fn test_db_cols_order_remaps_server_ordinals() {
        let columns =
            vec![Column::new("name", SqlType::NVarChar), Column::new("year", SqlType::BigInt)];
        let order =
            HashMap::from([("name".to_string(), 2u16), ("year".to_string(), 1u16)]);

        let format_file = build_format_file(&columns, ',', Some(&order));
        let lines: Vec<&str> = format_file.lines().collect();
        assert!(lines[2].starts_with("1    SQLCHAR    0    0    \",\"    2    name"));
        assert!(lines[3].contains("    1    year    "));
    }

    #[test]
    fn test_quote_terminator_is_escaped() {
        assert_eq!(escape_terminator("\""), "\\\"");
        assert_eq!(escape_terminator("\r\n"), "\\r\\n");
        assert_eq!(escape_terminator("'"), "\\'");
    }
}
