//! Downloadable plain-text match report. The layout is an interop surface; keep it stable.

pub const REPORT_FILENAME: &str = "match_report.txt";

/// ```text
/// Match Score: 51.94%
/// Resume file: resume.pdf
/// ```
pub fn render_report(score: f64, resume_filename: &str) -> String {
    format!("Match Score: {score:.2}%\nResume file: {resume_filename}")
}
