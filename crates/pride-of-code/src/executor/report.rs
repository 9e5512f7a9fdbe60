use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};
use std::ops::Range;

/// Name scripts are reported under.
pub const SCRIPT_NAME: &str = "script";

/// Renders one diagnostic as plain text with the offending source lines.
pub fn render_report(source_code: &str, span: Range<usize>, message: &str, label: &str) -> String {
    let span = clamp_span(source_code, span);
    let mut report_bytes = Vec::new();
    let written = Report::build(ReportKind::Error, (SCRIPT_NAME, span.clone()))
        .with_config(
            Config::default()
                .with_color(false)
                .with_index_type(IndexType::Byte),
        )
        .with_message(message)
        .with_label(Label::new((SCRIPT_NAME, span)).with_message(label))
        .finish()
        .write((SCRIPT_NAME, Source::from(source_code)), &mut report_bytes);
    match written {
        Ok(()) => String::from_utf8_lossy(&report_bytes).into_owned(),
        Err(_) => format!("Error: {message}\n"),
    }
}

/// 1-based line holding byte `offset`.
pub fn line_number(source_code: &str, offset: usize) -> usize {
    let offset = offset.min(source_code.len());
    source_code.as_bytes()[..offset]
        .iter()
        .filter(|&&byte| byte == b'\n')
        .count()
        + 1
}

fn clamp_span(source_code: &str, span: Range<usize>) -> Range<usize> {
    let start = span.start.min(source_code.len());
    let end = span.end.clamp(start, source_code.len());
    start..end
}
