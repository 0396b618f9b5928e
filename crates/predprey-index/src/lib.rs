//! Toroidal coordinate math and square-window neighborhood scans.
//!
//! Hunting and observation both walk the same `(2 * scope + 1)²` window around
//! an agent. The scan order (dx ascending, then dy ascending) is part of the
//! contract: hunting relies on it to break distance ties.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors emitted when constructing tori or windows.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// Indicates configuration values that cannot be used (e.g., zero extent).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Extent of a wrap-around grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Torus {
    width: usize,
    height: usize,
}

impl Torus {
    /// Create a torus with `width` rows along x and `height` columns along y.
    pub fn new(width: usize, height: usize) -> Result<Self, IndexError> {
        if width == 0 || height == 0 {
            return Err(IndexError::InvalidConfig("torus dimensions must be non-zero"));
        }
        if i64::try_from(width).is_err() || i64::try_from(height).is_err() {
            return Err(IndexError::InvalidConfig("torus dimensions overflow i64"));
        }
        Ok(Self { width, height })
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Number of cells on the torus.
    #[must_use]
    pub const fn area(&self) -> usize {
        self.width * self.height
    }

    /// Wrap signed coordinates onto the torus.
    #[inline]
    #[must_use]
    pub fn wrap(&self, x: i64, y: i64) -> (usize, usize) {
        (
            x.rem_euclid(self.width as i64) as usize,
            y.rem_euclid(self.height as i64) as usize,
        )
    }

    /// Translate `(x, y)` by `(dx, dy)` with wrap-around.
    #[inline]
    #[must_use]
    pub fn offset(&self, (x, y): (usize, usize), dx: i64, dy: i64) -> (usize, usize) {
        self.wrap(x as i64 + dx, y as i64 + dy)
    }

    /// Row-major flat index for an in-range coordinate.
    #[inline]
    #[must_use]
    pub fn flat(&self, (x, y): (usize, usize)) -> usize {
        debug_assert!(x < self.width && y < self.height);
        x * self.height + y
    }

    /// Inverse of [`Torus::flat`].
    #[inline]
    #[must_use]
    pub fn unflat(&self, index: usize) -> (usize, usize) {
        (index / self.height, index % self.height)
    }
}

/// One visited cell of a [`SquareWindow`] scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCell {
    /// Signed offset along x from the window center.
    pub dx: i64,
    /// Signed offset along y from the window center.
    pub dy: i64,
    /// Wrapped absolute coordinate on the torus.
    pub position: (usize, usize),
    /// Coordinate inside the window, `(dx + scope, dy + scope)`.
    pub local: (usize, usize),
}

impl WindowCell {
    /// Manhattan distance from the window center.
    #[must_use]
    pub const fn manhattan(&self) -> u64 {
        self.dx.unsigned_abs() + self.dy.unsigned_abs()
    }

    #[must_use]
    pub const fn is_center(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

/// Square neighborhood of radius `scope` around a center cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareWindow {
    scope: usize,
}

impl SquareWindow {
    /// Create a window; `scope` must be at least one cell.
    pub fn new(scope: usize) -> Result<Self, IndexError> {
        if scope == 0 {
            return Err(IndexError::InvalidConfig("scope must be at least 1"));
        }
        if i64::try_from(scope).is_err() {
            return Err(IndexError::InvalidConfig("scope overflows i64"));
        }
        Ok(Self { scope })
    }

    #[must_use]
    pub const fn scope(&self) -> usize {
        self.scope
    }

    /// Edge length of the window, `2 * scope + 1`.
    #[must_use]
    pub const fn side(&self) -> usize {
        2 * self.scope + 1
    }

    /// Offsets in scan order: dx ascending, then dy ascending.
    pub fn offsets(&self) -> impl Iterator<Item = (i64, i64)> + Clone + use<> {
        let scope = self.scope as i64;
        (-scope..=scope).flat_map(move |dx| (-scope..=scope).map(move |dy| (dx, dy)))
    }
}

/// Common behaviour for neighborhood scans over a torus.
pub trait NeighborhoodScan {
    /// Visit every window cell around `center` in scan order.
    fn scan(&self, torus: &Torus, center: (usize, usize), visitor: &mut dyn FnMut(WindowCell));

    /// Visit every window cell except the center.
    fn scan_ring(
        &self,
        torus: &Torus,
        center: (usize, usize),
        visitor: &mut dyn FnMut(WindowCell),
    ) {
        self.scan(torus, center, &mut |cell| {
            if !cell.is_center() {
                visitor(cell);
            }
        });
    }
}

impl NeighborhoodScan for SquareWindow {
    fn scan(&self, torus: &Torus, center: (usize, usize), visitor: &mut dyn FnMut(WindowCell)) {
        let scope = self.scope as i64;
        for (dx, dy) in self.offsets() {
            visitor(WindowCell {
                dx,
                dy,
                position: torus.offset(center, dx, dy),
                local: ((dx + scope) as usize, (dy + scope) as usize),
            });
        }
    }
}
