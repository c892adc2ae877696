// Bookstore Inventory - Reports
// HTML table and a plain PDF 1.4 (Helvetica, A4) built from the same rows

use std::fmt::Write as _;

use chrono::{DateTime, Local};

use crate::db::Book;
use crate::error::{StoreError, StoreResult};

const REPORT_TITLE: &str = "Relatório de Livros";
const DISPLAY_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";
const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Html,
    Pdf,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Html => "text/html; charset=utf-8",
            ReportFormat::Pdf => "application/pdf",
        }
    }
}

/// `relatorio_livros_<timestamp>.<ext>`
pub fn report_file_name(format: ReportFormat, generated_at: DateTime<Local>) -> String {
    format!(
        "relatorio_livros_{}.{}",
        generated_at.format(FILE_TIMESTAMP_FORMAT),
        format.extension()
    )
}

/// Brazilian currency: `R$ 1.234,56`
pub fn format_currency(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();

    let digits = (cents / 100).to_string();
    let mut integer = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            integer.push('.');
        }
        integer.push(c);
    }

    format!("R$ {}{},{:02}", sign, integer, cents % 100)
}

/// Text cells of one report row
fn row_cells(book: &Book) -> [String; 5] {
    [
        book.id.to_string(),
        book.title.clone(),
        book.author.clone(),
        book.year.map(|y| y.to_string()).unwrap_or_default(),
        book.price.map(format_currency).unwrap_or_default(),
    ]
}

const COLUMN_HEADERS: [&str; 5] = ["ID", "Título", "Autor", "Ano", "Preço"];

// ============================================================================
// HTML
// ============================================================================

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn render_html(books: &[Book], generated_at: DateTime<Local>) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", REPORT_TITLE);
    html.push_str(
        "<style>\
         body{font-family:sans-serif;margin:2em}\
         table{border-collapse:collapse;width:100%}\
         th,td{border:1px solid #999;padding:4px 8px;text-align:left}\
         th{background:#eee}\
         td.num{text-align:right}\
         </style>\n</head>\n<body>\n",
    );
    let _ = writeln!(html, "<h1>{}</h1>", REPORT_TITLE);
    let _ = writeln!(
        html,
        "<p>Gerado em: {}</p>",
        generated_at.format(DISPLAY_TIMESTAMP_FORMAT)
    );

    html.push_str("<table>\n<thead><tr>");
    for header in COLUMN_HEADERS {
        let _ = write!(html, "<th>{}</th>", header);
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for book in books {
        let [id, title, author, year, price] = row_cells(book);
        let _ = writeln!(
            html,
            "<tr><td class=\"num\">{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{}</td></tr>",
            id,
            escape_html(&title),
            escape_html(&author),
            year,
            price
        );
    }

    html.push_str("</tbody>\n</table>\n");
    let _ = writeln!(html, "<p>Total de livros: {}</p>", books.len());
    html.push_str("</body>\n</html>\n");
    html
}

// ============================================================================
// PDF
// ============================================================================

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const MARGIN: u32 = 50;
const FONT_SIZE: u32 = 10;
const LINE_HEIGHT: u32 = 14;

/// (x position, max characters) per column
const PDF_COLUMNS: [(u32, usize); 5] = [(50, 6), (90, 36), (300, 26), (455, 5), (490, 14)];

/// Encode text as a PDF literal string body (WinAnsi, non-Latin-1 as `?`)
fn pdf_text(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    let truncated: String = if count > max_chars {
        let mut t: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        t.push_str("...");
        t
    } else {
        text.to_string()
    };

    let mut out = String::with_capacity(truncated.len());
    for c in truncated.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            '\u{a0}'..='\u{ff}' => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            _ => out.push('?'),
        }
    }
    out
}

/// One line of the page: either free text or a table row
enum PdfLine {
    Text(String),
    Cells([String; 5]),
    Blank,
}

fn page_content(lines: &[PdfLine]) -> String {
    let mut content = String::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    for line in lines {
        match line {
            PdfLine::Text(text) => {
                let _ = writeln!(
                    content,
                    "BT /F1 {} Tf {} {} Td ({}) Tj ET",
                    FONT_SIZE,
                    MARGIN,
                    y,
                    pdf_text(text, 90)
                );
            }
            PdfLine::Cells(cells) => {
                for ((x, max_chars), cell) in PDF_COLUMNS.iter().zip(cells.iter()) {
                    if cell.is_empty() {
                        continue;
                    }
                    let _ = writeln!(
                        content,
                        "BT /F1 {} Tf {} {} Td ({}) Tj ET",
                        FONT_SIZE,
                        x,
                        y,
                        pdf_text(cell, *max_chars)
                    );
                }
            }
            PdfLine::Blank => {}
        }
        y -= LINE_HEIGHT;
    }

    content
}

pub fn render_pdf(books: &[Book], generated_at: DateTime<Local>) -> StoreResult<Vec<u8>> {
    let mut lines = vec![
        PdfLine::Text(REPORT_TITLE.to_string()),
        PdfLine::Text(format!(
            "Gerado em: {}",
            generated_at.format(DISPLAY_TIMESTAMP_FORMAT)
        )),
        PdfLine::Blank,
        PdfLine::Cells(COLUMN_HEADERS.map(String::from)),
    ];
    lines.extend(books.iter().map(|b| PdfLine::Cells(row_cells(b))));
    lines.push(PdfLine::Blank);
    lines.push(PdfLine::Text(format!("Total de livros: {}", books.len())));

    let lines_per_page = ((PAGE_HEIGHT - 2 * MARGIN) / LINE_HEIGHT) as usize;
    let pages: Vec<String> = lines.chunks(lines_per_page).map(page_content).collect();

    write_pdf_document(&pages)
}

/// Assemble catalog, page tree, font, pages and xref table
fn write_pdf_document(page_contents: &[String]) -> StoreResult<Vec<u8>> {
    if page_contents.is_empty() {
        return Err(StoreError::Report("PDF needs at least one page".into()));
    }

    // 1 catalog, 2 page tree, 3 font, then a (page, content) pair per page
    let page_ids: Vec<usize> = (0..page_contents.len()).map(|i| 4 + 2 * i).collect();
    let mut objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            page_ids
                .iter()
                .map(|id| format!("{} 0 R", id))
                .collect::<Vec<_>>()
                .join(" "),
            page_ids.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];

    for (page_id, content) in page_ids.iter().zip(page_contents) {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            PAGE_WIDTH,
            PAGE_HEIGHT,
            page_id + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}endstream",
            content.len(),
            content
        ));
    }

    let mut out: Vec<u8> = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_offset = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in &offsets {
        let _ = writeln!(xref, "{:010} 00000 n ", offset);
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    );
    out.extend_from_slice(xref.as_bytes());

    Ok(out)
}
