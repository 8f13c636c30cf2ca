use crate::aggregate::Summary;

/// Format an aggregated run for the terminal
pub fn format_summary(summary: &Summary) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "total: {}  errors: {}  warnings: {}  info: {}\n",
        summary.counts.total, summary.counts.error, summary.counts.warning, summary.counts.info
    ));

    if summary.sorted.is_empty() {
        output.push_str("\nNo findings\n");
        return output.trim_end().to_string();
    }

    output.push('\n');
    for diagnostic in &summary.sorted {
        output.push_str(&format!("[{}] {}\n", diagnostic.severity, diagnostic.message));
    }
    output.trim_end().to_string()
}
