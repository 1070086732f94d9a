//! Console rendering for job results.

use std::fmt::Write;
use upkeep_billing::CheckOutcome;
use upkeep_core::types::AnalyticsReport;

const RULE_WIDTH: usize = 60;

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn check_outcome(outcome: &CheckOutcome) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Billing Status Check - {}", outcome.checked_at.to_rfc3339());
    let _ = writeln!(out, "{rule}");
    if outcome.transitioned > 0 {
        let _ = writeln!(
            out,
            "Marked {} client(s) as due for payment",
            outcome.transitioned
        );
    } else {
        let _ = writeln!(out, "No overdue clients found");
    }
    let counts = &outcome.counts;
    let _ = writeln!(out, "\nSummary:");
    let _ = writeln!(out, "  Total Clients: {}", counts.total);
    let _ = writeln!(out, "  Active: {}", counts.active);
    let _ = writeln!(out, "  Due: {}", counts.due);
    let _ = writeln!(out, "  Suspended: {}", counts.suspended);
    let _ = write!(out, "{rule}");
    out
}

pub fn report(report: &AnalyticsReport) -> String {
    let rule = "=".repeat(RULE_WIDTH + 10);
    let summary = &report.summary;
    let mut out = String::new();

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Analytics Report - {}", report.period.as_str().to_uppercase());
    let _ = writeln!(out, "Generated: {}", report.timestamp.to_rfc3339());
    let _ = writeln!(out, "{rule}\n");

    let _ = writeln!(out, "SUMMARY:");
    let _ = writeln!(out, "  Total Clients: {}", summary.total_clients);
    let _ = writeln!(out, "  System Health: {}%", summary.health_percentage);

    let _ = writeln!(out, "\nClient Status Distribution:");
    let _ = writeln!(out, "  Active: {}", summary.status.active);
    let _ = writeln!(out, "  Due: {}", summary.status.due);
    let _ = writeln!(out, "  Suspended: {}", summary.status.suspended);

    let _ = writeln!(out, "\nSubscription Plans:");
    for (plan, count) in &summary.plans {
        let _ = writeln!(out, "  {}: {count}", capitalize(plan));
    }

    let revenue = &summary.revenue;
    let _ = writeln!(out, "\nRevenue:");
    let _ = writeln!(out, "  Period: Last {} day(s)", revenue.period_days);
    let _ = writeln!(out, "  Total: ${:.2}", revenue.total);
    let _ = writeln!(out, "  By Plan:");
    for row in &report.details.revenue {
        let _ = writeln!(out, "    {}: ${:.2}", capitalize(&row.plan), row.total_amount);
    }
    let _ = write!(out, "\n{rule}");
    out
}
