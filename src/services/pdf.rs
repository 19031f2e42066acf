use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 50.0;
const LEADING: f32 = 14.0;
const LINES_PER_PAGE: usize = 49;
const WRAP_COLUMNS: usize = 88;

const BODY_FONT: &str = "F1";
const HEADING_FONT: &str = "F2";

struct Line {
    text: String,
    font: &'static str,
    size: f32,
}

impl Line {
    fn body(text: String) -> Self {
        Self {
            text,
            font: BODY_FONT,
            size: 11.0,
        }
    }

    fn heading(text: &str, size: f32) -> Self {
        Self {
            text: text.to_string(),
            font: HEADING_FONT,
            size,
        }
    }

    fn blank() -> Self {
        Self::body(String::new())
    }
}

/// Render the lecture notes document: title, summary section, full
/// transcript section. Returns the finished PDF bytes.
pub fn render(title: &str, summary: &str, transcript: &str) -> Result<Vec<u8>, PdfError> {
    let mut lines = Vec::new();

    for chunk in wrap(&sanitize(title), 60) {
        lines.push(Line::heading(&chunk, 18.0));
    }
    lines.push(Line::blank());

    lines.push(Line::heading("Summary", 14.0));
    lines.push(Line::blank());
    for chunk in wrap(&sanitize(summary), WRAP_COLUMNS) {
        lines.push(Line::body(chunk));
    }
    lines.push(Line::blank());

    lines.push(Line::heading("Full transcript", 14.0));
    lines.push(Line::blank());
    for chunk in wrap(&sanitize(transcript), WRAP_COLUMNS) {
        lines.push(Line::body(chunk));
    }

    build_document(&lines)
}

fn build_document(lines: &[Line]) -> Result<Vec<u8>, PdfError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let body_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let heading_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            BODY_FONT => body_font_id,
            HEADING_FONT => heading_font_id,
        },
    });

    let mut page_ids: Vec<Object> = Vec::new();
    let pages = if lines.is_empty() {
        vec![&lines[0..0]]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };

    for page_lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Td",
                vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN - LEADING).into()],
            ),
        ];
        for line in page_lines {
            operations.push(Operation::new(
                "Tf",
                vec![line.font.into(), line.size.into()],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(line.text.as_str())],
            ));
            operations.push(Operation::new("Td", vec![0.into(), (-LEADING).into()]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| PdfError::Encode(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id.into());
    }

    let page_count = page_ids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| PdfError::Encode(e.to_string()))?;
    Ok(bytes)
}

// The base-14 fonts only cover a Latin encoding; anything outside
// printable ASCII is replaced before layout.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\n' | '\t' => ' ',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '?',
        })
        .collect()
}

fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.len() + 1 + word.len() <= columns {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
        // Hard-break words longer than a full line.
        while current.len() > columns {
            let head: String = current.chars().take(columns).collect();
            lines.push(head);
            current = current.chars().skip(columns).collect();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("PDF encoding failed: {0}")]
    Encode(String),
}
