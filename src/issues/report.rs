//! Plain-text issue report for operators.

use super::Issue;
use std::fmt::Write;

/// Returned when there is nothing pending.
pub const NO_ISSUES: &str = "No pending issues.";

/// Render `issues` most severe first. Issues of equal severity keep their
/// queue order.
pub fn render(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return NO_ISSUES.to_string();
    }

    let mut sorted: Vec<&Issue> = issues.iter().collect();
    sorted.sort_by(|a, b| b.severity.cmp(&a.severity));

    let mut out = String::new();
    let _ = writeln!(out, "# Pending issues ({})", sorted.len());

    for (n, issue) in sorted.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "## {}. [{}] {}",
            n + 1,
            issue.severity.to_string().to_uppercase(),
            issue.title
        );
        let _ = writeln!(out, "- ID: {}", issue.id);
        let _ = writeln!(out, "- Type: {}", issue.issue_type);
        let _ = writeln!(out, "- Created: {}", issue.timestamp.to_rfc3339());
        let _ = writeln!(out, "- Description: {}", issue.description);
        if issue.auto_fix_attempted {
            let result = issue.auto_fix_result.as_deref().unwrap_or("no result recorded");
            let _ = writeln!(out, "- Auto-fix attempted: {result}");
        }
        if !issue.context.is_null() {
            let context = serde_json::to_string_pretty(&issue.context)
                .unwrap_or_else(|_| issue.context.to_string());
            let _ = writeln!(out, "- Context:\n```json\n{context}\n```");
        }
    }

    out
}
