//! Common fixtures: extents, pentad codes and grid CSV snippets.

/// Extents as `(min_x, min_y, max_x, max_y)`.
pub mod bbox {
    /// Rough extent of the Southern African Bird Atlas area.
    pub const SOUTHERN_AFRICA: (f64, f64, f64, f64) = (16.0, -35.0, 33.0, -22.0);

    /// One 5 arc-minute pentad (29°30'E, 25°30'S corner).
    pub const PENTAD_2530_2930: (f64, f64, f64, f64) =
        (29.5, -25.583333333333332, 29.583333333333332, -25.5);

    /// A unit square at the origin.
    pub const UNIT: (f64, f64, f64, f64) = (0.0, 0.0, 1.0, 1.0);
}

/// Pentad side length in degrees (5 arc-minutes).
pub const PENTAD_SIZE_DEG: f64 = 5.0 / 60.0;

/// Grid CSV fixtures in the `pentad,x_min,y_min,x_max,y_max` layout.
pub mod grid_csv {
    /// Two adjacent unit cells.
    pub const TWO_CELLS: &str = "pentad,x_min,y_min,x_max,y_max\n\
P1,0,0,1,1\n\
P2,1,0,2,1\n";

    /// Three cells, the second with `x_min >= x_max`.
    pub const ONE_MALFORMED: &str = "pentad,x_min,y_min,x_max,y_max\n\
P1,0,0,1,1\n\
P2,2,0,1,1\n\
P3,0,1,1,2\n";

    /// Header with different case, extra column and a UTF-8 BOM.
    pub const BOM_AND_EXTRA_COLUMNS: &str = "\u{feff}Pentad,X_MIN,Y_MIN,X_MAX,Y_MAX,notes\n\
2530_2930,29.5,-25.583333,29.583333,-25.5,first\n";
}

/// Builds `pentad,x_min,y_min,x_max,y_max` CSV for a `cols x rows` block of
/// square cells of side `size`, starting at `(x0, y0)`.
///
/// Cells are named `C<row>_<col>` and listed row by row.
pub fn grid_block_csv(x0: f64, y0: f64, size: f64, cols: usize, rows: usize) -> String {
    let mut csv = String::from("pentad,x_min,y_min,x_max,y_max\n");
    for row in 0..rows {
        for col in 0..cols {
            let x_min = x0 + col as f64 * size;
            let y_min = y0 + row as f64 * size;
            csv.push_str(&format!(
                "C{}_{},{},{},{},{}\n",
                row,
                col,
                x_min,
                y_min,
                x_min + size,
                y_min + size
            ));
        }
    }
    csv
}
