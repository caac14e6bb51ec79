//! Heuristic document classifier.
//!
//! Works only from job record fields (name, data type, print processor) -
//! payload bytes are never read. Designed to give a usable answer for the
//! common cases deterministically and degrade to `Unknown` for the rest.

use chrono::Utc;
use spoolwatch_protocol::{defaults, DocumentAnalysis, DocumentType, PrintJob};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Fixed extension table. First lookup stop for every classification.
const EXTENSION_TYPES: &[(&str, DocumentType)] = &[
    ("txt", DocumentType::Text),
    ("rtf", DocumentType::Text),
    ("doc", DocumentType::Office),
    ("docx", DocumentType::Office),
    ("xls", DocumentType::Office),
    ("xlsx", DocumentType::Office),
    ("ppt", DocumentType::Office),
    ("pptx", DocumentType::Office),
    ("pdf", DocumentType::Pdf),
    ("jpg", DocumentType::Image),
    ("jpeg", DocumentType::Image),
    ("png", DocumentType::Image),
    ("gif", DocumentType::Image),
    ("bmp", DocumentType::Image),
    ("tiff", DocumentType::Image),
    ("tif", DocumentType::Image),
];

/// Classify one job's document type and print settings.
///
/// Pure and total: identical input yields identical output (modulo the
/// analysis timestamp), and no failure propagates to the caller - a
/// heuristic that blows up degrades the result to an `Unknown`-typed
/// analysis carrying only name, page count, and size.
pub fn analyze_job(job: &PrintJob) -> DocumentAnalysis {
    match panic::catch_unwind(AssertUnwindSafe(|| analyze_inner(job))) {
        Ok(analysis) => {
            debug!("Analyzed document: {}", analysis);
            analysis
        }
        Err(_) => {
            warn!(
                "Classification failed for job {} on '{}', degrading to UNKNOWN",
                job.job_id, job.printer_name
            );
            degraded_analysis(job)
        }
    }
}

fn analyze_inner(job: &PrintJob) -> DocumentAnalysis {
    let extension = extract_extension(&job.document_name);
    let doc_type = determine_type(&extension, job);

    let mut metadata = HashMap::new();
    if !job.data_type.is_empty() {
        metadata.insert("DataType".to_string(), job.data_type.clone());
    }
    if !job.print_processor.is_empty() {
        metadata.insert("PrintProcessor".to_string(), job.print_processor.clone());
    }

    DocumentAnalysis {
        document_name: job.document_name.clone(),
        doc_type,
        page_count: job.total_pages,
        file_size: job.size,
        file_extension: extension,
        is_color: contains_ignore_case(&job.print_processor, "color"),
        is_duplex: contains_ignore_case(&job.print_processor, "duplex"),
        paper_size: defaults::DEFAULT_PAPER_SIZE.to_string(),
        orientation: defaults::DEFAULT_ORIENTATION.to_string(),
        copies: defaults::DEFAULT_COPIES,
        printer_name: job.printer_name.clone(),
        print_processor: job.print_processor.clone(),
        driver_name: job.driver_name.clone(),
        metadata,
        analysis_time: Utc::now(),
    }
}

/// Text after the last `.`, lower-cased; empty when there is no name or no
/// dot.
fn extract_extension(document_name: &str) -> String {
    match document_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

/// Heuristics in order of specificity: extension table, then print
/// processor, then spool data type. First match wins.
fn determine_type(extension: &str, job: &PrintJob) -> DocumentType {
    if let Some((_, doc_type)) = EXTENSION_TYPES.iter().find(|(ext, _)| *ext == extension) {
        return *doc_type;
    }

    if contains_ignore_case(&job.print_processor, "pdf") {
        return DocumentType::Pdf;
    }

    // EMF spool files carry rendered page content; RAW is printer-ready
    // text/PCL.
    if contains_ignore_case(&job.data_type, "emf") {
        return DocumentType::Mixed;
    }
    if contains_ignore_case(&job.data_type, "raw") {
        return DocumentType::Text;
    }

    DocumentType::Unknown
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn degraded_analysis(job: &PrintJob) -> DocumentAnalysis {
    DocumentAnalysis {
        document_name: job.document_name.clone(),
        doc_type: DocumentType::Unknown,
        page_count: job.total_pages,
        file_size: job.size,
        file_extension: String::new(),
        is_color: false,
        is_duplex: false,
        paper_size: defaults::DEFAULT_PAPER_SIZE.to_string(),
        orientation: defaults::DEFAULT_ORIENTATION.to_string(),
        copies: defaults::DEFAULT_COPIES,
        printer_name: job.printer_name.clone(),
        print_processor: job.print_processor.clone(),
        driver_name: job.driver_name.clone(),
        metadata: HashMap::new(),
        analysis_time: Utc::now(),
    }
}
