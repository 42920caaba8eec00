use crate::frame::DataFrame;

/// Candidate characters tried in priority order. They have to be characters
/// that never appear in the source data, see
/// https://docs.microsoft.com/en-us/sql/relational-databases/import-export/specify-field-and-row-terminators-sql-server
pub const DELIMITER_OPTIONS: [char; 3] = [',', '|', '\t'];
pub const QUOTECHAR_OPTIONS: [char; 4] = ['"', '\'', '`', '~'];

#[derive(thiserror::Error, Debug)]
pub enum DelimiterError {
    #[error(
        "data contains all of the possible delimiter characters {DELIMITER_OPTIONS:?}, cannot \
         use bcp to import it; replace one of those characters in your data or pass a delimiter \
         you know is absent"
    )]
    DelimitersExhausted,

    #[error(
        "data contains all of the possible quote characters {QUOTECHAR_OPTIONS:?}, cannot use \
         bcp to import it; replace one of those characters in your data or pass a quote \
         character you know is absent"
    )]
    QuoteCharsExhausted,
}

fn first_absent(frame: &DataFrame, candidates: &[char]) -> Option<char> {
    candidates.iter().copied().find(|candidate| {
        !frame
            .rows()
            .iter()
            .flatten()
            .any(|cell| cell.as_str().is_some_and(|text| text.contains(*candidate)))
    })
}

/// First candidate delimiter absent from every string cell.
pub fn get_delimiter(frame: &DataFrame) -> Result<char, DelimiterError> {
    first_absent(frame, &DELIMITER_OPTIONS).ok_or(DelimiterError::DelimitersExhausted)
}

/// First candidate quote character absent from every string cell.
pub fn get_quotechar(frame: &DataFrame) -> Result<char, DelimiterError> {
    first_absent(frame, &QUOTECHAR_OPTIONS).ok_or(DelimiterError::QuoteCharsExhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Column, SqlType};

    fn frame_of_strings(cells: &[&str]) -> DataFrame {
        let mut frame = DataFrame::new(vec![Column::new("text", SqlType::NVarChar)]);
        for cell in cells {
            frame.push_row(vec![(*cell).into()]).unwrap();
        }
        frame
    }

    #[test]
    fn test_picks_first_free_delimiter() {
        assert_eq!(get_delimiter(&frame_of_strings(&["plain"])).unwrap(), ',');
        assert_eq!(get_delimiter(&frame_of_strings(&["a,b"])).unwrap(), '|');
        assert_eq!(get_delimiter(&frame_of_strings(&["a,b", "c|d"])).unwrap(), '\t');
    }

    #[test]
    fn test_picks_first_free_quotechar() {
        assert_eq!(get_quotechar(&frame_of_strings(&["plain"])).unwrap(), '"');
        assert_eq!(get_quotechar(&frame_of_strings(&["say \"hi\""])).unwrap(), '\'');
    }

    #[test]
    fn test_delimiters_exhausted() {
        let frame = frame_of_strings(&["a,b", "c|d", "e\tf"]);
        assert!(matches!(get_delimiter(&frame), Err(DelimiterError::DelimitersExhausted)));
    }

    #[test]
    fn test_quotechars_exhausted() {
        let frame = frame_of_strings(&["\"'`~"]);
        assert!(matches!(get_quotechar(&frame), Err(DelimiterError::QuoteCharsExhausted)));
    }

    #[test]
    fn test_non_string_cells_are_ignored() {
        let mut frame = DataFrame::new(vec![Column::new("n", SqlType::BigInt)]);
        // a numeric cell can never contain a delimiter, only strings are scanned
        frame.push_row(vec![1_000_000i64.into()]).unwrap();
        assert_eq!(get_delimiter(&frame).unwrap(), ',');
    }
}
