//! Table output for stage summaries, using comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::services::StageStatus;

/// One row of the stage summary table.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StageRow {
    pub index: usize,
    pub name: String,
    pub status: StageStatus,
    pub iterations: usize,
    pub max_numb_iter: usize,
    /// Accurate ratio of the last recorded iteration.
    pub last_accurate_ratio: Option<f64>,
}

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub const fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Format the per-stage summary.
    pub fn format_stages(&self, stages: &[StageRow]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Stage").add_attribute(Attribute::Bold),
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Iterations").add_attribute(Attribute::Bold),
            Cell::new("Accurate").add_attribute(Attribute::Bold),
        ]);

        for stage in stages {
            let status = status_label(stage.status);
            let status_cell = if self.use_colors {
                Cell::new(status).fg(status_color(stage.status))
            } else {
                Cell::new(status)
            };
            table.add_row(vec![
                Cell::new(stage.index),
                Cell::new(&stage.name),
                status_cell,
                Cell::new(format!("{}/{}", stage.iterations, stage.max_numb_iter)),
                Cell::new(
                    stage
                        .last_accurate_ratio
                        .map_or_else(|| "-".to_string(), |r| format!("{r:.4}")),
                ),
            ]);
        }
        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if let Some(width) = self.max_width {
            table.set_width(width);
        }
        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if terminal supports colors
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM"), Ok(term) if term == "dumb")
}

pub const fn status_label(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Iterating => "iterating",
        StageStatus::Converged => "converged",
        StageStatus::ExhaustedFatal => "failed",
        StageStatus::ExhaustedNonfatal => "exhausted",
    }
}

const fn status_color(status: StageStatus) -> Color {
    match status {
        StageStatus::Iterating => Color::Cyan,
        StageStatus::Converged => Color::Green,
        StageStatus::ExhaustedFatal => Color::Red,
        StageStatus::ExhaustedNonfatal => Color::Yellow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_stages_plain() {
        let formatter = TableFormatter::with_config(false, Some(100));
        let table = formatter.format_stages(&[
            StageRow {
                index: 0,
                name: "npt-300K".to_string(),
                status: StageStatus::Converged,
                iterations: 3,
                max_numb_iter: 10,
                last_accurate_ratio: Some(0.95),
            },
            StageRow {
                index: 1,
                name: "stage-1".to_string(),
                status: StageStatus::Iterating,
                iterations: 0,
                max_numb_iter: 10,
                last_accurate_ratio: None,
            },
        ]);
        assert!(table.contains("npt-300K"));
        assert!(table.contains("converged"));
        assert!(table.contains("3/10"));
        assert!(table.contains("0.9500"));
        assert!(table.contains("iterating"));
    }
}
