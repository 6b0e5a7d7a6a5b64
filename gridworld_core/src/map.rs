//! Grid geometry and cell storage.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// The position lies outside `[0, size)` on some axis.
    #[error("Position {position:?} is out of bounds for grid size {size}")]
    OutOfBounds {
        /// The offending position.
        position: Position,
        /// The side length of the grid.
        size: usize,
    },
}

/// The valid coordinate range `[0, size)` of a square grid, for both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridBounds {
    size: usize,
}

impl GridBounds {
    /// Creates bounds for a `size` x `size` grid.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero, does not fit in `isize`, or `size * size`
    /// overflows `usize`.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "grid size must be positive");
        assert!(
            isize::try_from(size).is_ok() && size.checked_mul(size).is_some(),
            "Grid size overflow"
        );
        GridBounds { size }
    }

    /// Returns the side length of the grid.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the number of cells in the grid.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.size.checked_mul(self.size).expect("Grid size overflow")
    }

    /// Checks if both coordinates lie in `[0, size)`.
    #[inline]
    pub fn in_bounds(&self, position: Position) -> bool {
        let size = self.size as isize;
        (0..size).contains(&position.row) && (0..size).contains(&position.col)
    }

    /// Converts a position to a flat row-major index.
    ///
    /// Returns `None` if the position is out of bounds.
    #[inline]
    pub fn position_to_index(&self, position: Position) -> Option<usize> {
        if self.in_bounds(position) {
            Some(position.row as usize * self.size + position.col as usize)
        } else {
            None
        }
    }

    /// Converts a flat row-major index back to a position.
    #[inline]
    pub fn index_to_position(&self, index: usize) -> Option<Position> {
        if index < self.cell_count() {
            Some(Position::new(
                (index / self.size) as isize,
                (index % self.size) as isize,
            ))
        } else {
            None
        }
    }

    /// Returns an iterator over every cell in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + use<> {
        let size = self.size as isize;
        (0..size).flat_map(move |row| (0..size).map(move |col| Position::new(row, col)))
    }
}

/// A square grid storing one `T` per cell in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    bounds: GridBounds,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid filled with default values.
    pub fn new(bounds: GridBounds) -> Self
    where
        T: Default + Clone,
    {
        Grid {
            bounds,
            cells: vec![T::default(); bounds.cell_count()],
        }
    }

    /// Gets a reference to the cell at `position`, or `None` when out of bounds.
    pub fn get(&self, position: Position) -> Option<&T> {
        let index = self.bounds.position_to_index(position)?;
        self.cells.get(index)
    }

    /// Sets the value of the cell at `position`.
    ///
    /// Returns `Ok(())` on success, or `Err(GridError::OutOfBounds)` if the
    /// position is invalid.
    pub fn set(&mut self, position: Position, value: T) -> Result<(), GridError> {
        let index = self
            .bounds
            .position_to_index(position)
            .ok_or(GridError::OutOfBounds {
                position,
                size: self.bounds.size(),
            })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Returns an iterator over the rows of the grid, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks(self.bounds.size())
    }

    /// Returns an iterator that yields `(position, &T)` for each cell.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        self.bounds.positions().zip(self.cells.iter())
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: Position) -> &Self::Output {
        match self.bounds.position_to_index(index) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index {:?} out of bounds for grid size {}",
                index,
                self.bounds.size()
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, index: Position) -> &mut Self::Output {
        let size = self.bounds.size();
        match self.bounds.position_to_index(index) {
            Some(idx) => &mut self.cells[idx],
            None => panic!("Grid index {:?} out of bounds for grid size {}", index, size),
        }
    }
}
