use crate::builder::QueryContext;
use crate::error::Result;
use serde::Serialize;
use serde_json::Value;
use sheet_context_cache::WorkbookMetrics;
use sheet_context_chunker::Anchor;
use std::time::{SystemTime, UNIX_EPOCH};

const PLACEHOLDER_SUMMARY: &str = "No sheet data is available.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePayload<'a> {
    sheets: Vec<WireSheet<'a>>,
    active_sheet: &'a str,
    metrics: WorkbookMetrics,
    #[serde(rename = "_diagnostic", skip_serializing_if = "Option::is_none")]
    diagnostic: Option<WireDiagnostic>,
}

#[derive(Debug, Serialize)]
struct WireSheet<'a> {
    name: &'a str,
    summary: &'a str,
    anchors: &'a [Anchor],
    values: &'a [Vec<Value>],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireDiagnostic {
    chunk_count: usize,
    valid_sheet_count: usize,
    /// Milliseconds since the Unix epoch
    timestamp: u64,
}

/// Render the sheet chunks of a context as JSON.
///
/// The `sheets` list is never empty: with no usable sheet payload a single
/// placeholder entry is emitted instead.
pub fn to_wire_format(context: &QueryContext, include_diagnostic: bool) -> Result<String> {
    let mut sheets: Vec<WireSheet<'_>> = context
        .sheet_chunks()
        .filter(|c| !c.sheet_name().trim().is_empty())
        .map(|c| WireSheet {
            name: c.sheet_name(),
            summary: &c.payload.summary,
            anchors: &c.payload.anchors,
            values: c.payload.values.as_deref().unwrap_or_default(),
        })
        .collect();
    let valid_sheet_count = sheets.len();

    if sheets.is_empty() {
        log::warn!("Context has no sheet payloads; emitting placeholder sheet");
        sheets.push(WireSheet {
            name: placeholder_sheet_name(&context.active_sheet),
            summary: PLACEHOLDER_SUMMARY,
            anchors: &[],
            values: &[],
        });
    }

    let diagnostic = include_diagnostic.then(|| WireDiagnostic {
        chunk_count: context.chunks.len(),
        valid_sheet_count,
        timestamp: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0),
    });

    let payload = WirePayload {
        sheets,
        active_sheet: &context.active_sheet,
        metrics: context.metrics,
        diagnostic,
    };
    Ok(serde_json::to_string(&payload)?)
}

fn placeholder_sheet_name(active: &str) -> &str {
    if active.trim().is_empty() {
        "Sheet1"
    } else {
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sheet_context_chunker::{Compressor, SheetState};
    use sheet_context_search::LocateResult;

    fn context(chunks: Vec<sheet_context_chunker::Chunk>, active: &str) -> QueryContext {
        QueryContext {
            chunks,
            active_sheet: active.to_string(),
            metrics: WorkbookMetrics::default(),
            located: LocateResult::default(),
            used_fallback: true,
            degraded: Vec::new(),
        }
    }

    #[test]
    fn test_sheet_payloads() {
        let sheet = SheetState::new("Sales", vec![vec![json!("Total"), json!(42)]]);
        let chunk = Compressor::default().compress(Some(&sheet)).unwrap();
        let wire: Value =
            serde_json::from_str(&to_wire_format(&context(vec![chunk], "Sales"), false).unwrap())
                .unwrap();

        assert_eq!(wire["activeSheet"], "Sales");
        assert_eq!(wire["sheets"][0]["name"], "Sales");
        assert_eq!(wire["sheets"][0]["values"], json!([["Total", 42]]));
        assert_eq!(wire["metrics"]["totalSheets"], 0);
        assert!(wire.get("_diagnostic").is_none());
    }

    #[test]
    fn test_empty_context_gets_placeholder() {
        let wire: Value =
            serde_json::from_str(&to_wire_format(&context(Vec::new(), ""), true).unwrap()).unwrap();

        assert_eq!(wire["sheets"].as_array().unwrap().len(), 1);
        assert_eq!(wire["sheets"][0]["name"], "Sheet1");
        assert_eq!(wire["sheets"][0]["anchors"], json!([]));
        assert_eq!(wire["_diagnostic"]["chunkCount"], 0);
        assert_eq!(wire["_diagnostic"]["validSheetCount"], 0);
        assert!(wire["_diagnostic"]["timestamp"].as_u64().unwrap() > 0);
    }
}
