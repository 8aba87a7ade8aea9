use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Position;

/// Represents errors that can occur while loading a room map.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("failed to read map directory {}: {source}", dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("map image name '{name}' does not encode a grid cell")]
    MalformedName { name: String },
    #[error("no map images found under {}", dir.display())]
    EmptyMap { dir: PathBuf },
}

/// The set of walkable cells of an environment.
///
/// Built once by scanning a resource directory for view images named
/// `<x>_<y>_<FACING>_<SIDE>.png`; every distinct `(x, y)` prefix becomes a
/// walkable cell. Cells are kept ordered so that iteration (and the reset
/// fallback that relies on it) is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMap {
    cells: BTreeSet<Position>,
}

impl RoomMap {
    /// Scans a resource directory tree and collects every walkable cell.
    ///
    /// Files without a `png` extension are skipped. A `png` file whose stem
    /// does not consist of four underscore-separated fields with integer
    /// leading coordinates is a configuration error. The facing and side
    /// fields are not validated here; the observation lookup re-derives them
    /// at query time.
    pub fn scan(dir: &Path) -> Result<Self, MapError> {
        let mut cells = BTreeSet::new();
        collect_cells(dir, &mut cells)?;
        if cells.is_empty() {
            return Err(MapError::EmptyMap {
                dir: dir.to_path_buf(),
            });
        }
        debug!(cells = cells.len(), dir = %dir.display(), "room map loaded");
        Ok(RoomMap { cells })
    }

    /// Creates a map directly from a set of cells.
    pub fn from_cells<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = Position>,
    {
        RoomMap {
            cells: cells.into_iter().collect(),
        }
    }

    /// Whether the given cell is walkable.
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        self.cells.contains(&position)
    }

    /// The smallest walkable cell in `(x, y)` order.
    ///
    /// Used as the deterministic fallback when a reset target is not
    /// walkable. `None` only for an empty map, which cannot be constructed
    /// through [`RoomMap::scan`].
    pub fn first_cell(&self) -> Option<Position> {
        self.cells.iter().next().copied()
    }

    /// Number of walkable cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates over walkable cells in `(x, y)` order.
    pub fn iter(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells.iter().copied()
    }

    /// Bounding box of the walkable cells as `(min, max)`, inclusive.
    pub fn bounds(&self) -> Option<(Position, Position)> {
        let mut iter = self.cells.iter();
        let first = *iter.next()?;
        let mut min = first;
        let mut max = first;
        for cell in iter {
            min.x = min.x.min(cell.x);
            min.y = min.y.min(cell.y);
            max.x = max.x.max(cell.x);
            max.y = max.y.max(cell.y);
        }
        Some((min, max))
    }
}

/// Recursively walks `dir` and inserts the cell of every qualifying entry.
fn collect_cells(dir: &Path, cells: &mut BTreeSet<Position>) -> Result<(), MapError> {
    let entries = fs::read_dir(dir).map_err(|source| MapError::Io {
        dir: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| MapError::Io {
            dir: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_cells(&path, cells)?;
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("png") {
            continue;
        }
        let name = entry.file_name();
        let stem = match path.file_stem().and_then(|stem| stem.to_str()) {
            Some(stem) => stem,
            None => {
                return Err(MapError::MalformedName {
                    name: name.to_string_lossy().into_owned(),
                });
            }
        };
        cells.insert(parse_cell_name(stem).ok_or_else(|| MapError::MalformedName {
            name: name.to_string_lossy().into_owned(),
        })?);
    }
    Ok(())
}

/// Parses the leading coordinate fields of a view resource stem.
///
/// The stem must hold exactly four underscore-separated fields; only the
/// first two are interpreted.
fn parse_cell_name(stem: &str) -> Option<Position> {
    let mut fields = stem.split('_');
    let x = fields.next()?.parse().ok()?;
    let y = fields.next()?.parse().ok()?;
    // Facing and side fields must be present but are not interpreted here.
    fields.next()?;
    fields.next()?;
    if fields.next().is_some() {
        return None;
    }
    Some(Position::new(x, y))
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use tempfile::TempDir;

    use super::*;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).expect("create fixture file");
    }

    #[test]
    fn parses_coordinates_from_view_names() {
        assert_eq!(
            parse_cell_name("3_7_FRONT_LEFT"),
            Some(Position::new(3, 7))
        );
        assert_eq!(
            parse_cell_name("-2_0_BACK_RIGHT"),
            Some(Position::new(-2, 0))
        );
    }

    #[test]
    fn rejects_names_without_four_fields() {
        assert_eq!(parse_cell_name("1_2_FRONT"), None);
        assert_eq!(parse_cell_name("1_2_FRONT_LEFT_EXTRA"), None);
        assert_eq!(parse_cell_name("a_2_FRONT_LEFT"), None);
        assert_eq!(parse_cell_name("1_b_FRONT_LEFT"), None);
    }

    #[test]
    fn tolerates_unvalidated_trailing_fields() {
        // Facing/side labels are looked up later, not checked by the loader.
        assert_eq!(
            parse_cell_name("5_6_SIDEWAYS_MIDDLE"),
            Some(Position::new(5, 6))
        );
    }

    #[test]
    fn scan_collects_cells_and_collapses_duplicates() {
        let dir = TempDir::new().unwrap();
        for facing in ["FRONT", "RIGHT", "BACK", "LEFT"] {
            for side in ["LEFT", "RIGHT"] {
                touch(dir.path(), &format!("1_1_{facing}_{side}.png"));
                touch(dir.path(), &format!("2_1_{facing}_{side}.png"));
            }
        }
        // Non-png entries are skipped outright.
        touch(dir.path(), "notes.txt");

        let map = RoomMap::scan(dir.path()).unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.contains(Position::new(1, 1)));
        assert!(map.contains(Position::new(2, 1)));
    }

    #[test]
    fn scan_recurses_into_subdirectories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("room_a");
        std::fs::create_dir(&nested).unwrap();
        touch(&nested, "4_5_FRONT_LEFT.png");

        let map = RoomMap::scan(dir.path()).unwrap();
        assert!(map.contains(Position::new(4, 5)));
    }

    #[test]
    fn scan_fails_on_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            RoomMap::scan(dir.path()),
            Err(MapError::EmptyMap { .. })
        ));
    }

    #[test]
    fn scan_fails_on_malformed_png_name() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "corridor.png");
        assert!(matches!(
            RoomMap::scan(dir.path()),
            Err(MapError::MalformedName { name }) if name == "corridor.png"
        ));
    }

    #[test]
    fn first_cell_is_smallest_in_xy_order() {
        let map = RoomMap::from_cells([
            Position::new(3, 0),
            Position::new(1, 9),
            Position::new(1, 2),
        ]);
        assert_eq!(map.first_cell(), Some(Position::new(1, 2)));
    }

    #[test]
    fn bounds_cover_all_cells() {
        let map = RoomMap::from_cells([
            Position::new(-1, 4),
            Position::new(2, 1),
            Position::new(0, 7),
        ]);
        assert_eq!(
            map.bounds(),
            Some((Position::new(-1, 1), Position::new(2, 7)))
        );
    }
}
