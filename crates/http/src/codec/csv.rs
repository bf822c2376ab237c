//! Minimal CSV used for the lead chunk header section.
//!
//! Rows end with `\n` (`\r\n` accepted when decoding). A field is quoted when
//! it contains a comma, a quote or a line break; quotes inside quoted fields
//! are doubled. Blank lines are skipped.

use crate::protocol::CodecError;

pub(crate) fn encode_csv<'a, I, R>(rows: I) -> String
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for row in rows {
        for (i, field) in row.into_iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            if field.contains([',', '"', '\r', '\n']) {
                out.push('"');
                out.push_str(&field.replace('"', "\"\""));
                out.push('"');
            } else {
                out.push_str(field);
            }
        }
        out.push('\n');
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// At the start of a field
    FieldStart,
    /// Inside an unquoted field
    Unquoted,
    /// Inside a quoted field
    Quoted,
    /// Right after a quote inside a quoted field, either closing or escaping
    QuoteInQuoted,
}

pub(crate) fn decode_csv(input: &str) -> Result<Vec<Vec<String>>, CodecError> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut state = State::FieldStart;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match (state, c) {
            (State::Quoted, '"') => state = State::QuoteInQuoted,
            (State::Quoted, c) => field.push(c),
            (State::QuoteInQuoted, '"') => {
                field.push('"');
                state = State::Quoted;
            }
            (State::FieldStart, '"') => state = State::Quoted,
            (State::Unquoted, '"') => return Err(CodecError::invalid_csv("unexpected quote in unquoted field")),
            (_, ',') => {
                row.push(std::mem::take(&mut field));
                state = State::FieldStart;
            }
            (_, '\r') if chars.peek() == Some(&'\n') => {}
            (_, '\r' | '\n') => {
                end_row(&mut rows, &mut row, &mut field, state);
                state = State::FieldStart;
            }
            (State::QuoteInQuoted, c) => {
                return Err(CodecError::invalid_csv(format!("unexpected character {c:?} after closing quote")));
            }
            (_, c) => {
                field.push(c);
                state = State::Unquoted;
            }
        }
    }

    if state == State::Quoted {
        return Err(CodecError::invalid_csv("unterminated quoted field"));
    }
    end_row(&mut rows, &mut row, &mut field, state);
    Ok(rows)
}

fn end_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>, field: &mut String, state: State) {
    // a lone empty unquoted field is a blank line
    if row.is_empty() && field.is_empty() && state == State::FieldStart {
        return;
    }
    row.push(std::mem::take(field));
    rows.push(std::mem::take(row));
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_encode_plain_and_quoted() {
        let encoded = encode_csv([vec!["a", "b,c"], vec!["say \"hi\"", "", "line\nbreak"]]);
        assert_eq!(encoded, "a,\"b,c\"\n\"say \"\"hi\"\"\",,\"line\nbreak\"\n");
    }

    #[test]
    fn test_decode_basic() {
        let input = indoc! {r#"
            name,value1,value2
            "quoted, field","with ""quotes"""
            trailing,
        "#};
        let rows = decode_csv(input).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["name", "value1", "value2"]);
        assert_eq!(rows[1], vec!["quoted, field", "with \"quotes\""]);
        assert_eq!(rows[2], vec!["trailing", ""]);
    }

    #[test]
    fn test_decode_crlf_and_blank_lines() {
        let rows = decode_csv("a,b\r\n\r\nc,d").unwrap();
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_decode_quoted_empty_line_is_a_row() {
        let rows = decode_csv("\"\"\n").unwrap();
        assert_eq!(rows, vec![vec![""]]);
    }

    #[test]
    fn test_decode_line_break_in_quotes() {
        let rows = decode_csv(&encode_csv([vec!["multi\r\nline", "x"]])).unwrap();
        assert_eq!(rows, vec![vec!["multi\r\nline", "x"]]);
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode_csv("\"open"), Err(CodecError::InvalidCsv { .. })));
        assert!(matches!(decode_csv("ab\"c"), Err(CodecError::InvalidCsv { .. })));
        assert!(matches!(decode_csv("\"a\"b"), Err(CodecError::InvalidCsv { .. })));
    }
}
