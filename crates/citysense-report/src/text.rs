use crate::DailyReport;
use std::fmt::Write;

/// Plain text rendering: title line, then one block per category
pub fn render_text(report: &DailyReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(out, "{}", report.title());

    for section in report.sections() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}:", section.category.title());
        for row in &section.rows {
            let _ = writeln!(out, "- {}: {}", row.label, row.value);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble;
    use crate::assemble::tests::{full_store, report_date};

    #[tokio::test]
    async fn test_render_text_layout() {
        let store = full_store("X").await;
        let report = assemble(&store, "X", report_date()).await.unwrap();

        let text = render_text(&report);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Daily Report for X - 2024-07-04");
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "Air Quality:");
        assert_eq!(lines[3], "- AQI: 5.65");
        assert!(text.contains("- PM10: n/a\n"));
        assert!(text.contains("Noise Level:\n- Decibel: 55.00 dB\n- Frequency: n/a\n"));
        assert!(text.contains("- Conductivity: 410.00 µS/cm\n"));
        assert!(text.contains("- Dissolved Oxygen: 8.25 mg/L\n"));
        assert!(text.contains("- Peak Demand: 120.00 kW\n"));
        assert!(text.ends_with("- Precipitation: 0.40 mm\n"));
    }
}
