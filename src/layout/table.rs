//! Column band clustering for table reconstruction.
//!
//! Tables are recognised from text alignment alone: the left edges of the
//! cells of consecutive columnar lines are clustered into vertical bands,
//! and a stretch only counts as a table when every cell lands in a band
//! that at least one other row also uses.

use super::list::ListMarkers;
use crate::model::ListMarker;

/// One horizontally separated piece of a line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Cell {
    /// Left edge
    pub x: f32,
    pub text: String,
}

/// A table that passed the consistency check.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FittedTable {
    /// Left edge of each column band, ascending
    pub columns: Vec<f32>,
    /// One entry per band for every row; empty where the row has no cell
    pub rows: Vec<Vec<String>>,
}

/// Cluster the cells of `rows` into column bands.
///
/// Edges closer than `tolerance` to their left neighbour join its band, so
/// a band may drift wider than `tolerance` across many rows. Returns `None`
/// when the bands are inconsistent: a band used by a single row, or a row
/// with two cells in the same band.
pub(crate) fn fit_table(rows: &[Vec<Cell>], tolerance: f32) -> Option<FittedTable> {
    let mut edges: Vec<(f32, usize, usize)> = rows
        .iter()
        .enumerate()
        .flat_map(|(r, cells)| cells.iter().enumerate().map(move |(c, cell)| (cell.x, r, c)))
        .collect();
    if edges.is_empty() {
        return None;
    }
    edges.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut columns: Vec<f32> = Vec::new();
    let mut band_of: Vec<Vec<usize>> = rows.iter().map(|cells| vec![0; cells.len()]).collect();
    let mut previous: Option<f32> = None;
    for (x, r, c) in edges {
        if previous.map_or(true, |p| x - p > tolerance) {
            columns.push(x);
        }
        band_of[r][c] = columns.len() - 1;
        previous = Some(x);
    }

    let mut rows_per_band = vec![0usize; columns.len()];
    for bands in &band_of {
        let mut seen = vec![false; columns.len()];
        for &band in bands {
            if seen[band] {
                log::debug!("table rejected: two cells share column band {}", band);
                return None;
            }
            seen[band] = true;
            rows_per_band[band] += 1;
        }
    }
    if let Some(band) = rows_per_band.iter().position(|&n| n < 2) {
        log::debug!(
            "table rejected: column band at x={:.1} is used by a single row",
            columns[band]
        );
        return None;
    }

    let fitted_rows = rows
        .iter()
        .zip(&band_of)
        .map(|(cells, bands)| {
            let mut row = vec![String::new(); columns.len()];
            for (cell, &band) in cells.iter().zip(bands) {
                row[band] = cell.text.clone();
            }
            row
        })
        .collect();

    Some(FittedTable {
        columns,
        rows: fitted_rows,
    })
}

/// Whether columnar rows are really a list whose markers were drawn apart
/// from the item text.
pub(crate) fn looks_like_list(
    rows: &[Vec<Cell>],
    column_count: usize,
    markers: &ListMarkers,
) -> bool {
    if rows.is_empty() {
        return false;
    }

    let mut bullets = 0;
    let mut numbers = 0;
    for row in rows {
        let Some(first) = row.first() else { continue };
        if !markers.is_marker_only(&first.text) {
            continue;
        }
        match markers.parse(first.text.trim()) {
            Some((ListMarker::Numbered(_), _)) => numbers += 1,
            _ => bullets += 1,
        }
    }

    let total = rows.len() as f32;
    let bullet_ratio = bullets as f32 / total;
    let marker_ratio = (bullets + numbers) as f32 / total;

    // Bullet glyphs are almost never table data. A numbered first column
    // only reads as a list when there is nothing else but the item text.
    bullet_ratio >= 0.5 || (column_count == 2 && marker_ratio >= 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::list::DEFAULT_LIST_MARKER_PATTERN;

    fn markers() -> ListMarkers {
        ListMarkers::new(DEFAULT_LIST_MARKER_PATTERN).unwrap()
    }

    fn row(cells: &[(f32, &str)]) -> Vec<Cell> {
        cells
            .iter()
            .map(|(x, text)| Cell {
                x: *x,
                text: text.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_consistent_table() {
        let rows = vec![
            row(&[(72.0, "Name"), (200.0, "Role"), (320.0, "Team")]),
            row(&[(72.0, "Ada"), (202.0, "Engineer"), (320.0, "Core")]),
            row(&[(73.0, "Grace"), (200.0, "Admiral"), (318.0, "Navy")]),
        ];
        let table = fit_table(&rows, 5.0).unwrap();
        assert_eq!(table.columns, vec![72.0, 200.0, 318.0]);
        assert_eq!(table.rows[1], vec!["Ada", "Engineer", "Core"]);
    }

    #[test]
    fn test_missing_cell_padded() {
        let rows = vec![
            row(&[(72.0, "a"), (200.0, "b"), (320.0, "c")]),
            row(&[(72.0, "d"), (320.0, "f")]),
            row(&[(72.0, "g"), (200.0, "h")]),
        ];
        let table = fit_table(&rows, 5.0).unwrap();
        assert_eq!(table.rows[1], vec!["d", "", "f"]);
        assert_eq!(table.rows[2], vec!["g", "h", ""]);
    }

    #[test]
    fn test_band_used_once_is_inconsistent() {
        let rows = vec![
            row(&[(72.0, "fn main() {"), (250.0, "// entry")]),
            row(&[(90.0, "let x = 1;"), (300.0, "// one")]),
        ];
        assert!(fit_table(&rows, 5.0).is_none());
    }

    #[test]
    fn test_two_cells_in_one_band_is_inconsistent() {
        let rows = vec![
            row(&[(72.0, "a"), (76.0, "b")]),
            row(&[(72.0, "c"), (200.0, "d")]),
        ];
        assert!(fit_table(&rows, 5.0).is_none());
    }

    #[test]
    fn test_bullet_rows_are_a_list() {
        let rows = vec![
            row(&[(72.0, "•"), (100.0, "First point")]),
            row(&[(72.0, "•"), (100.0, "Second point")]),
        ];
        assert!(looks_like_list(&rows, 2, &markers()));
    }

    #[test]
    fn test_numbered_first_column() {
        let rows = vec![
            row(&[(72.0, "1."), (100.0, "Install")]),
            row(&[(72.0, "2."), (100.0, "Configure")]),
        ];
        assert!(looks_like_list(&rows, 2, &markers()));

        let rows = vec![
            row(&[(72.0, "1."), (100.0, "Install"), (250.0, "5 min")]),
            row(&[(72.0, "2."), (100.0, "Configure"), (250.0, "10 min")]),
        ];
        assert!(!looks_like_list(&rows, 3, &markers()));
    }

    #[test]
    fn test_real_table_not_a_list() {
        let rows = vec![
            row(&[(72.0, "Host"), (200.0, "Port")]),
            row(&[(72.0, "db"), (200.0, "5432")]),
        ];
        assert!(!looks_like_list(&rows, 2, &markers()));
    }
}
