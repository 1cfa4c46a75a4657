//! CSV codec for [`Table`]: the extractor and loader adapters' byte format.
//!
//! Format: UTF-8, comma-delimited, header row, one record per line, empty field = null.
//! Column kinds are inferred from all non-null fields of a column:
//! number if every field parses as a finite real, date if every field is a recognised
//! date, text otherwise.

use super::dates::parse_date;
use super::value::parse_number;
use super::{Column, ColumnKind, Table, Value};
use crate::error::{EtlError, Result};

/// Parse CSV bytes into a typed table.
///
/// # Errors
///
/// Returns [`EtlError::Parse`] for non-UTF-8 input, a missing or invalid header row,
/// an unterminated quoted field, or records whose width differs from the header.
pub fn parse(bytes: &[u8]) -> Result<Table> {
    let text = String::from_utf8(bytes.to_vec())?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    // The reader accepts a quote left open at end of input, so it is checked here.
    if ends_inside_quotes(text) {
        return Err(EtlError::Parse("unterminated quoted field".to_owned()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(EtlError::Parse("missing header row".to_owned()));
    }

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        raw_rows.push(record.iter().map(str::to_owned).collect());
    }

    let columns: Vec<Column> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let fields = raw_rows
                .iter()
                .filter_map(|row| row.get(idx))
                .map(String::as_str);
            Column::new(name.as_str(), infer_kind(fields))
        })
        .collect();

    let rows = raw_rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .zip(row)
                .map(|(column, raw)| Value::from_raw(raw, column.kind))
                .collect()
        })
        .collect();

    Table::from_rows(columns, rows).map_err(|e| match e {
        EtlError::Other(msg) => EtlError::Parse(msg),
        other => other,
    })
}

/// Serialize a table to CSV bytes in declared column order.
///
/// # Errors
///
/// Returns an error if the CSV writer fails to flush.
pub fn serialize(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.column_names())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(ToString::to_string))?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::Other(format!("Failed to flush CSV writer: {}", e.error())))
}

/// Whether `text` ends inside a quoted field. A quote opens quoting only at the start
/// of a field; inside quotes, `""` is an escaped quote.
fn ends_inside_quotes(text: &str) -> bool {
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }
        match c {
            '"' if at_field_start => {
                in_quotes = true;
                at_field_start = false;
            }
            ',' | '\n' | '\r' => at_field_start = true,
            _ => at_field_start = false,
        }
    }

    in_quotes
}

/// Infer a column kind from its raw fields; empty fields are ignored.
pub fn infer_kind<'a>(fields: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut all_numbers = true;
    let mut all_dates = true;
    let mut seen = false;

    for field in fields.filter(|f| !f.is_empty()) {
        seen = true;
        if all_numbers && parse_number(field).is_none() {
            all_numbers = false;
        }
        if all_dates && parse_date(field).is_none() {
            all_dates = false;
        }
        if !all_numbers && !all_dates {
            return ColumnKind::Text;
        }
    }

    if !seen {
        ColumnKind::Text
    } else if all_numbers {
        ColumnKind::Number
    } else if all_dates {
        ColumnKind::Date
    } else {
        ColumnKind::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALES: &str = "date,product,category,revenue,cost\n\
2024-01-01,A,Electronics,1000,600\n\
2024-01-02,\"B, large\",Clothing,1500.5,900\n\
2024-01-03,,Electronics,,500\n";

    #[test]
    fn test_parse_infers_kinds() {
        let table = parse(SALES.as_bytes()).expect("parse");
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_kind("date"), Some(ColumnKind::Date));
        assert_eq!(table.column_kind("product"), Some(ColumnKind::Text));
        assert_eq!(table.column_kind("revenue"), Some(ColumnKind::Number));
        assert_eq!(table.value(1, "product"), Some(&Value::text("B, large")));
        assert_eq!(table.value(2, "revenue"), Some(&Value::Null));
        assert_eq!(table.null_count(), 2);
    }

    #[test]
    fn test_all_null_column_is_text() {
        let table = parse(b"a,b\n1,\n2,\n").expect("parse");
        assert_eq!(table.column_kind("b"), Some(ColumnKind::Text));
    }

    #[test]
    fn test_unterminated_quote() {
        let err = parse(b"a,b\n\"open,1\n").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn test_quote_inside_unquoted_field_is_literal() {
        let table = parse(b"product,revenue\nTV 55\",1000\nRadio,200\n").expect("parse");
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.value(0, "product"), Some(&Value::text("TV 55\"")));
        assert_eq!(table.numbers("revenue"), vec![1000.0, 200.0]);
    }

    #[test]
    fn test_unterminated_quote_after_literal_quote() {
        let err = parse(b"a\n5\"\n\"open\n").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn test_escaped_quotes_inside_quoted_field() {
        let table = parse(b"note,n\n\"say \"\"hi\"\"\",1\n").expect("parse");
        assert_eq!(table.value(0, "note"), Some(&Value::text("say \"hi\"")));
        assert!(ends_inside_quotes("\"a\"\"b"));
        assert!(!ends_inside_quotes("x\"\"y,\"\"\n"));
    }

    #[test]
    fn test_inconsistent_column_count() {
        let err = parse(b"a,b\n1,2\n3\n").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn test_duplicate_header() {
        let err = parse(b"a,a\n1,2\n").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(b"").unwrap_err().kind(), "ParseError");
    }

    #[test]
    fn test_invalid_utf8() {
        assert_eq!(parse(&[0x61, 0x0a, 0xff]).unwrap_err().kind(), "ParseError");
    }

    #[test]
    fn test_serialize_renders_plain_numbers_and_nulls() {
        let table = parse(SALES.as_bytes()).expect("parse");
        let out = String::from_utf8(serialize(&table).expect("serialize")).expect("utf8");
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("date,product,category,revenue,cost"));
        assert_eq!(lines.next(), Some("2024-01-01,A,Electronics,1000,600"));
        assert_eq!(
            lines.next(),
            Some("2024-01-02,\"B, large\",Clothing,1500.5,900")
        );
        assert_eq!(lines.next(), Some("2024-01-03,,Electronics,,500"));
    }

    #[test]
    fn test_round_trip() {
        let table = parse(SALES.as_bytes()).expect("parse");
        let reparsed = parse(&serialize(&table).expect("serialize")).expect("reparse");
        assert_eq!(table, reparsed);
    }
}
