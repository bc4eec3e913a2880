//! Per-row trend sparklines.
//!
//! The trend column is presentation only. It is rebuilt from the committed
//! amounts after every run and is never read back in, so a missing or
//! garbled trend cell can never corrupt the data columns.

use crate::table::ReportTable;

const GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Glyph holding the place of a period the row has no amount for.
const GAP: char = '·';

/// Render one row's amounts as a sparkline, one glyph per period column.
///
/// Empty cells keep their position as a midpoint dot so glyphs line up
/// with the period columns. Rows with fewer than two amounts render empty,
/// a single point has no trend.
#[must_use]
pub fn sparkline(values: &[Option<f64>]) -> String {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.len() < 2 {
        return String::new();
    }

    let min = present.iter().copied().fold(f64::INFINITY, f64::min);
    let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    values
        .iter()
        .map(|value| match value {
            None => GAP,
            Some(v) => {
                if span <= f64::EPSILON {
                    GLYPHS[3]
                } else {
                    let scaled = ((v - min) / span * 7.0).round() as usize;
                    GLYPHS[scaled.min(7)]
                }
            }
        })
        .collect()
}

/// Sparklines for every table row, in row order.
#[must_use]
pub fn row_trends(table: &ReportTable) -> Vec<String> {
    let labels = table.period_labels().to_vec();
    table
        .rows()
        .iter()
        .map(|row| sparkline(&row.amounts_for(&labels)))
        .collect()
}
