//! Batch processing across documents
//!
//! Documents run in parallel on blocking tasks, bounded by the configured
//! worker count. One document's failure is recorded in the batch report
//! and never aborts the other documents.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use papergraph_core::DocumentInput;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::pipeline::{read_json, write_json, DocumentPipeline, StageRequest};

/// Outcome for one document in a batch run.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentReport {
    pub document_id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Batch report written to `<out_dir>/report.json`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: String,
    pub finished_at: String,
    pub n_documents: usize,
    pub n_failed: usize,
    pub documents: Vec<DocumentReport>,
}

/// Run the pipeline over every input file with at most `workers` documents
/// in flight.
pub async fn run_batch(
    pipeline: Arc<DocumentPipeline>,
    inputs: Vec<PathBuf>,
    workers: usize,
    request: StageRequest,
) -> anyhow::Result<BatchReport> {
    let started_at = Utc::now().to_rfc3339();
    fs::create_dir_all(pipeline.out_dir())?;

    let mut documents: Vec<DocumentReport> = stream::iter(inputs)
        .map(|path| {
            let pipeline = Arc::clone(&pipeline);
            let request = request.clone();
            tokio::task::spawn_blocking(move || process_document(&pipeline, &path, &request))
        })
        .buffer_unordered(workers.max(1))
        .map(|joined| match joined {
            Ok(report) => report,
            Err(e) => DocumentReport {
                document_id: "<task>".to_string(),
                ok: false,
                error: Some(e.to_string()),
                duration_ms: 0,
            },
        })
        .collect()
        .await;
    documents.sort_by(|a, b| a.document_id.cmp(&b.document_id));

    let n_failed = documents.iter().filter(|d| !d.ok).count();
    let report = BatchReport {
        started_at,
        finished_at: Utc::now().to_rfc3339(),
        n_documents: documents.len(),
        n_failed,
        documents,
    };
    write_json(&pipeline.out_dir().join("report.json"), &report)?;
    info!(
        documents = report.n_documents,
        failed = report.n_failed,
        "batch complete"
    );
    Ok(report)
}

fn process_document(
    pipeline: &DocumentPipeline,
    path: &Path,
    request: &StageRequest,
) -> DocumentReport {
    let started = Instant::now();
    let fallback_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let outcome = read_json::<DocumentInput>(path).and_then(|input| {
        pipeline
            .run_document(&input, request)
            .map(|summary| (input.document_id.clone(), summary))
    });

    match outcome {
        Ok((document_id, summary)) => {
            info!(
                document_id = %document_id,
                entities = summary.entities,
                relations = summary.relations,
                "document processed"
            );
            DocumentReport {
                document_id,
                ok: true,
                error: None,
                duration_ms: started.elapsed().as_millis() as u64,
            }
        }
        Err(e) => {
            error!(document = %fallback_id, error = %e, "document failed");
            DocumentReport {
                document_id: fallback_id,
                ok: false,
                error: Some(e.to_string()),
                duration_ms: started.elapsed().as_millis() as u64,
            }
        }
    }
}
