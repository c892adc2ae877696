// CSV export/import for the book table
// Accepts comma or semicolon files with Portuguese or English headers

use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::db::{Book, NewBook};
use crate::error::{StoreError, StoreResult};
use crate::validation::{validate_price, validate_year};

pub const CSV_EXPORT_FILE: &str = "livros_exportados.csv";
pub const CSV_HEADER: [&str; 4] = ["titulo", "autor", "ano_publicacao", "preco"];

/// A parsed import row plus the line it came from (for logging)
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub line: u64,
    pub book: NewBook,
}

/// Serialize books as CSV with the `titulo,autor,ano_publicacao,preco` header
pub fn export_csv(books: &[Book]) -> StoreResult<Vec<u8>> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for book in books {
        let year = book.year.map(|y| y.to_string()).unwrap_or_default();
        let price = book.price.map(|p| p.to_string()).unwrap_or_default();
        writer.write_record([book.title.as_str(), book.author.as_str(), year.as_str(), price.as_str()])?;
    }

    writer
        .into_inner()
        .map_err(|e| StoreError::Csv(e.to_string()))
}

/// Comma unless the line has strictly more semicolons than commas
pub fn detect_delimiter(first_line: &str) -> u8 {
    let commas = first_line.matches(',').count();
    let semicolons = first_line.matches(';').count();
    if commas >= semicolons {
        b','
    } else {
        b';'
    }
}

/// Which header column feeds each book field
#[derive(Debug)]
struct ColumnMap {
    title: Vec<usize>,
    author: Vec<usize>,
    year: Vec<usize>,
    price: Vec<usize>,
}

impl ColumnMap {
    /// Localized names take precedence over English ones
    fn from_headers(headers: &StringRecord) -> Self {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();

        let lookup = |names: [&str; 2]| -> Vec<usize> {
            names.iter().filter_map(|n| index.get(*n).copied()).collect()
        };

        ColumnMap {
            title: lookup(["titulo", "title"]),
            author: lookup(["autor", "author"]),
            year: lookup(["ano_publicacao", "year"]),
            price: lookup(["preco", "price"]),
        }
    }
}

/// First non-empty value among the candidate columns
fn field<'r>(record: &'r StringRecord, columns: &[usize]) -> &'r str {
    columns
        .iter()
        .filter_map(|&i| record.get(i))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or("")
}

/// Parse CSV bytes into book rows
///
/// Unparseable or out-of-range years and prices become `None`. Missing
/// columns and short rows yield empty strings; callers decide whether a row
/// with an empty title or author is usable.
pub fn parse_import(data: &[u8]) -> StoreResult<Vec<ImportRow>> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let text = String::from_utf8_lossy(data);
    let first_line = text.lines().next().unwrap_or("");
    let delimiter = detect_delimiter(first_line);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns = ColumnMap::from_headers(reader.headers()?);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let year = field(&record, &columns.year);
        let price = field(&record, &columns.price);

        rows.push(ImportRow {
            line: record.position().map(|p| p.line()).unwrap_or(0),
            book: NewBook {
                title: field(&record, &columns.title).to_string(),
                author: field(&record, &columns.author).to_string(),
                year: if year.is_empty() { None } else { validate_year(year) },
                price: if price.is_empty() { None } else { validate_price(price) },
            },
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: i64, title: &str, author: &str, year: Option<i32>, price: Option<f64>) -> Book {
        Book {
            id,
            title: title.to_string(),
            author: author.to_string(),
            year,
            price,
        }
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b;c,d"), b',');
        assert_eq!(detect_delimiter("a;b;c,d"), b';');
        assert_eq!(detect_delimiter("titulo"), b',');
        assert_eq!(detect_delimiter("a,b;c;d,e"), b',');
    }

    #[test]
    fn test_export_csv() {
        let books = vec![
            book(1, "Capitaes da Areia", "Jorge Amado", Some(1937), Some(39.9)),
            book(2, "Livro, com virgula", "Autor \"Citado\"", None, None),
        ];

        let csv = String::from_utf8(export_csv(&books).unwrap()).unwrap();

        assert_eq!(
            csv,
            "titulo,autor,ano_publicacao,preco\n\
             Capitaes da Areia,Jorge Amado,1937,39.9\n\
             \"Livro, com virgula\",\"Autor \"\"Citado\"\"\",,\n"
        );
    }

    #[test]
    fn test_export_empty_has_header_only() {
        let csv = String::from_utf8(export_csv(&[]).unwrap()).unwrap();
        assert_eq!(csv, "titulo,autor,ano_publicacao,preco\n");
    }

    #[test]
    fn test_parse_semicolon_english_headers() {
        let data = "Title;Author;Year;Price\nA Moreninha;Joaquim Manuel de Macedo;1844;15,5\n";

        let rows = parse_import(data.as_bytes()).unwrap();

        assert_eq!(rows.len(), 1);
        let b = &rows[0].book;
        assert_eq!(b.title, "A Moreninha");
        assert_eq!(b.author, "Joaquim Manuel de Macedo");
        assert_eq!(b.year, Some(1844));
        // Decimal comma is not a number
        assert_eq!(b.price, None);
        assert_eq!(rows[0].line, 2);
    }

    #[test]
    fn test_parse_tolerates_short_rows_and_bom() {
        let data = "\u{feff}titulo,autor,ano_publicacao,preco\nSo Titulo\nT,A,2000\n";

        let rows = parse_import(data.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].book, NewBook::new("So Titulo", ""));
        assert_eq!(rows[1].book, NewBook::new("T", "A").with_year(2000));
    }

    #[test]
    fn test_parse_coerces_invalid_optionals() {
        let data = "titulo,autor,ano_publicacao,preco\nT,A,999,abc\nU,B,, 3.25 \n";

        let rows = parse_import(data.as_bytes()).unwrap();

        assert_eq!(rows[0].book.year, None);
        assert_eq!(rows[0].book.price, None);
        assert_eq!(rows[1].book.year, None);
        assert_eq!(rows[1].book.price, Some(3.25));
    }

    #[test]
    fn test_parse_falls_back_to_english_column_when_local_is_empty() {
        let data = "titulo,title,autor\n,Fallback,Someone\n";

        let rows = parse_import(data.as_bytes()).unwrap();

        assert_eq!(rows[0].book.title, "Fallback");
        assert_eq!(rows[0].book.author, "Someone");
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_import(b"").unwrap().is_empty());
        assert!(parse_import(b"  \n").unwrap().is_empty());
        assert!(parse_import(b"titulo,autor\n").unwrap().is_empty());
    }

    #[test]
    fn test_export_then_parse() {
        let books = vec![book(7, "Ensaio sobre a Cegueira", "Jose Saramago", Some(1995), Some(0.5))];

        let rows = parse_import(&export_csv(&books).unwrap()).unwrap();

        assert_eq!(
            rows[0].book,
            NewBook::new("Ensaio sobre a Cegueira", "Jose Saramago")
                .with_year(1995)
                .with_price(0.5)
        );
    }
}
