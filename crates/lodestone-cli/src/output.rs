//! Output formatting for command results.
//!
//! Supports both human-readable terminal output and JSON for scripting.

use crate::commands::DocumentSummary;
use lodestone_core::embedding::StrategyKind;
use lodestone_core::metrics::MetricsSnapshot;
use lodestone_core::processing::{Answer, IngestReport};
use lodestone_core::search::SearchHit;
use lodestone_core::workers::PoolStats;
use serde::Serialize;

/// Maximum characters to show in text snippet
const SNIPPET_MAX_LEN: usize = 200;

/// JSON output structure for a query
#[derive(Serialize)]
pub struct JsonOutput<'a> {
    pub query: &'a str,
    pub has_context: bool,
    pub strategy: Option<&'static str>,
    pub degraded: usize,
    pub results: Vec<JsonHit<'a>>,
}

/// Individual hit in JSON format
#[derive(Serialize)]
pub struct JsonHit<'a> {
    pub document_id: &'a str,
    pub chunk_id: &'a str,
    pub page_number: u32,
    pub similarity: f32,
    pub snippet: String,
}

impl<'a> From<&'a SearchHit> for JsonHit<'a> {
    fn from(hit: &'a SearchHit) -> Self {
        Self {
            document_id: &hit.document_id,
            chunk_id: &hit.chunk_id,
            page_number: hit.page_number,
            similarity: hit.similarity,
            snippet: truncate_text(&hit.content, SNIPPET_MAX_LEN),
        }
    }
}

/// Formats an answer as JSON.
pub fn format_json(query: &str, answer: &Answer) -> String {
    let output = JsonOutput {
        query,
        has_context: answer.has_context,
        strategy: answer.strategy.map(|s| s.as_str()),
        degraded: answer.degraded,
        results: answer.hits.iter().map(JsonHit::from).collect(),
    };
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

/// Formats an answer for human-readable terminal output.
pub fn format_human(query: &str, answer: &Answer) -> String {
    if !answer.has_context {
        return format!("No relevant context found for \"{}\"", query);
    }

    let hits = &answer.hits;
    let mut output = String::new();
    output.push_str(&format!(
        "Found {} chunk{} for \"{}\":\n\n",
        hits.len(),
        if hits.len() == 1 { "" } else { "s" },
        query
    ));

    for (i, hit) in hits.iter().enumerate() {
        output.push_str(&format!(
            "{}. {} p.{} (similarity: {:.2})\n",
            i + 1,
            hit.document_id,
            hit.page_number,
            hit.similarity
        ));
        let snippet = truncate_text(&hit.content, SNIPPET_MAX_LEN);
        output.push_str(&format!("   {}\n\n", snippet));
    }

    if answer.degraded > 0 {
        output.push_str(&format!(
            "Note: {} chunk{} came from a different embedding space and scored as degraded matches.\n",
            answer.degraded,
            if answer.degraded == 1 { "" } else { "s" }
        ));
    }

    output.trim_end().to_string()
}

/// Formats an ingestion report.
pub fn format_ingest(report: &IngestReport) -> String {
    let mut line = format!(
        "Ingested \"{}\": {} chunk{} ({} vectors, dimension {})",
        report.document_id,
        report.chunk_count,
        if report.chunk_count == 1 { "" } else { "s" },
        report.strategy,
        report.dimension
    );
    if report.pruned > 0 {
        line.push_str(&format!(", pruned {} stale", report.pruned));
    }
    line
}

/// Formats the document listing.
pub fn format_documents(documents: &[DocumentSummary]) -> String {
    if documents.is_empty() {
        return "No documents indexed".to_string();
    }
    documents
        .iter()
        .map(|d| format!("{}\t{} chunks", d.document_id, d.chunk_count))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formats the run's performance metrics and worker pool activity.
pub fn format_metrics(snapshot: &MetricsSnapshot, workers: &PoolStats) -> String {
    let mut lines = vec!["Metrics:".to_string()];
    lines.push(timing_line(
        "segmentation",
        snapshot.segmentation_count,
        snapshot.segmentation_avg_ms,
    ));
    lines.push(timing_line(
        "embedding",
        snapshot.embedding_count,
        snapshot.embedding_avg_ms,
    ));
    lines.push(timing_line("search", snapshot.search_count, snapshot.search_avg_ms));

    if let Some(hits) = snapshot.last_hit_count {
        let top = snapshot
            .last_top_score
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!("  last search: {} hits, top score {}", hits, top));
    }

    let selections: Vec<String> = [StrategyKind::Dense, StrategyKind::Tfidf, StrategyKind::Frequency]
        .iter()
        .filter_map(|kind| {
            snapshot
                .strategy_selections
                .get(kind)
                .map(|count| format!("{}={}", kind, count))
        })
        .collect();
    if !selections.is_empty() {
        lines.push(format!("  strategies: {}", selections.join(", ")));
    }
    if snapshot.degraded_matches > 0 {
        lines.push(format!("  degraded matches: {}", snapshot.degraded_matches));
    }

    lines.push(format!(
        "  workers: {} threads, {} jobs completed, {} panicked",
        workers.workers, workers.jobs_completed, workers.jobs_panicked
    ));
    lines.join("\n")
}

fn timing_line(label: &str, count: usize, avg_ms: Option<f64>) -> String {
    match avg_ms {
        Some(avg) => format!("  {}: {} ops, avg {:.2}ms", label, count, avg),
        None => format!("  {}: {} ops", label, count),
    }
}

/// Truncates text to a maximum length in characters, adding ellipsis if needed.
fn truncate_text(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_len).collect();
    // Find a word boundary near max_len
    match truncated.rfind(' ') {
        Some(last_space) => format!("{}...", &truncated[..last_space]),
        None => format!("{}...", truncated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(content: &str, similarity: f32) -> Answer {
        Answer {
            hits: vec![SearchHit {
                chunk_id: "c-1".to_string(),
                content: content.to_string(),
                page_number: 3,
                document_id: "handbook".to_string(),
                similarity,
            }],
            has_context: true,
            strategy: Some(StrategyKind::Tfidf),
            degraded: 0,
        }
    }

    #[test]
    fn test_format_human_empty() {
        let output = format_human("test query", &Answer::default());
        assert!(output.contains("No relevant context"));
    }

    #[test]
    fn test_format_human_single() {
        let output = format_human("refunds", &answer("Refunds take thirty days", 0.85));
        assert!(output.contains("1 chunk"));
        assert!(output.contains("handbook p.3"));
        assert!(output.contains("0.85"));
        assert!(!output.contains("degraded"));
    }

    #[test]
    fn test_format_human_mentions_degraded() {
        let mut answer = answer("text", 0.1);
        answer.degraded = 2;
        assert!(format_human("q", &answer).contains("2 chunks came from a different"));
    }

    #[test]
    fn test_format_json() {
        let output = format_json("query", &answer("Content here", 0.5));
        assert!(output.contains("\"query\": \"query\""));
        assert!(output.contains("\"has_context\": true"));
        assert!(output.contains("\"strategy\": \"tfidf\""));
        assert!(output.contains("\"document_id\": \"handbook\""));
        assert!(output.contains("\"similarity\": 0.5"));
    }

    #[test]
    fn test_format_ingest() {
        let report = IngestReport {
            document_id: "doc".into(),
            chunk_count: 4,
            strategy: StrategyKind::Frequency,
            dimension: 12,
            pruned: 1,
        };
        assert_eq!(
            format_ingest(&report),
            "Ingested \"doc\": 4 chunks (frequency vectors, dimension 12), pruned 1 stale"
        );
    }

    #[test]
    fn test_format_metrics() {
        let mut snapshot = MetricsSnapshot {
            segmentation_count: 2,
            segmentation_avg_ms: Some(1.5),
            search_count: 1,
            search_avg_ms: Some(0.25),
            last_hit_count: Some(3),
            last_top_score: Some(0.8),
            degraded_matches: 2,
            ..MetricsSnapshot::default()
        };
        snapshot.strategy_selections.insert(StrategyKind::Tfidf, 2);
        let workers = PoolStats {
            workers: 4,
            queue_depth: 0,
            jobs_completed: 3,
            jobs_panicked: 0,
        };

        let output = format_metrics(&snapshot, &workers);
        assert!(output.contains("segmentation: 2 ops, avg 1.50ms"));
        assert!(output.contains("embedding: 0 ops"));
        assert!(output.contains("last search: 3 hits, top score 0.80"));
        assert!(output.contains("strategies: tfidf=2"));
        assert!(output.contains("degraded matches: 2"));
        assert!(output.contains("workers: 4 threads, 3 jobs completed, 0 panicked"));
    }

    #[test]
    fn test_truncate_text() {
        let short = "Short text";
        assert_eq!(truncate_text(short, 50), short);

        let long = "This is a much longer text that should be truncated at a reasonable point";
        let truncated = truncate_text(long, 30);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 33);

        let accented = "é".repeat(40);
        assert!(truncate_text(&accented, 10).starts_with("éééééééééé"));
    }
}
