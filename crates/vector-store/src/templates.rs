use sheet_context_chunker::{display_value, Chunk, ChunkKind};
use std::fmt::Write as _;

/// Rendered text is capped to keep hashing cost bounded on huge summaries
pub const MAX_RENDER_CHARS: usize = 4096;

const PREVIEW_ROWS: usize = 5;
const PREVIEW_COLS: usize = 8;

/// Text fed to the embedder for one chunk.
///
/// Sheet chunks: name, summary, anchor list. Range chunks: `sheet!range`,
/// description, a small value preview.
#[must_use]
pub fn render_chunk(chunk: &Chunk) -> String {
    let text = match chunk.kind {
        ChunkKind::Sheet => render_sheet(chunk),
        ChunkKind::Range => render_range(chunk),
    };
    truncate_chars(text, MAX_RENDER_CHARS)
}

fn render_sheet(chunk: &Chunk) -> String {
    let payload = &chunk.payload;
    let mut out = format!("Sheet {}\n{}\n", payload.sheet_name, payload.summary);

    for anchor in &payload.anchors {
        let _ = write!(&mut out, "{} {}", anchor.address, display_value(&anchor.value));
        if let Some(formula) = &anchor.formula {
            let _ = write!(&mut out, " {formula}");
        }
        out.push('\n');
    }
    for chart in &payload.charts {
        let _ = writeln!(&mut out, "chart {chart}");
    }
    out
}

fn render_range(chunk: &Chunk) -> String {
    let payload = &chunk.payload;
    let (address, description) = payload
        .range
        .as_ref()
        .map_or(("", payload.summary.as_str()), |meta| {
            (meta.address.as_str(), meta.description.as_str())
        });
    let mut out = format!("{}!{address}\n{description}\n", payload.sheet_name);

    if let Some(name) = payload.range.as_ref().and_then(|m| m.name.as_deref()) {
        let _ = writeln!(&mut out, "name {name}");
    }

    match &payload.values {
        Some(values) => {
            for row in values.iter().take(PREVIEW_ROWS) {
                let cells: Vec<String> = row
                    .iter()
                    .take(PREVIEW_COLS)
                    .map(display_value)
                    .filter(|s| !s.is_empty())
                    .collect();
                if !cells.is_empty() {
                    let _ = writeln!(&mut out, "{}", cells.join(" | "));
                }
            }
        }
        None => {
            for anchor in payload.anchors.iter().take(PREVIEW_ROWS * 2) {
                let _ = writeln!(&mut out, "{} {}", anchor.address, display_value(&anchor.value));
            }
        }
    }
    out
}

fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((cut, _)) = text.char_indices().nth(max_chars) {
        text.truncate(cut);
    }
    text
}
