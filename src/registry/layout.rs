//! Grid layout for the chorus view

use serde::{Deserialize, Serialize};

/// Square-ish grid arrangement for `count` clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLayout {
    pub count: usize,
    pub columns: usize,
    pub rows: usize,
}

impl GridLayout {
    /// `columns = ceil(sqrt(count))`, rows fill the rest
    pub fn for_count(count: usize) -> Self {
        if count == 0 {
            return Self {
                count: 0,
                columns: 0,
                rows: 0,
            };
        }

        let columns = (count as f64).sqrt().ceil() as usize;
        let rows = (count + columns - 1) / columns;
        Self {
            count,
            columns,
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_columns() {
        assert_eq!(GridLayout::for_count(0).columns, 0);
        assert_eq!(GridLayout::for_count(1).columns, 1);
        assert_eq!(GridLayout::for_count(2).columns, 2);
        assert_eq!(GridLayout::for_count(4).columns, 2);
        assert_eq!(GridLayout::for_count(5).columns, 3);
        assert_eq!(GridLayout::for_count(9).columns, 3);
        assert_eq!(GridLayout::for_count(10).columns, 4);
    }

    #[test]
    fn test_grid_rows() {
        assert_eq!(GridLayout::for_count(5).rows, 2);
        assert_eq!(GridLayout::for_count(7).rows, 3);
        assert_eq!(GridLayout::for_count(10).rows, 3);
    }
}
