//! Neighborhood geometries over N-dimensional grids.
//!
//! Two closed-form geometries are built in:
//!
//! - [`moore_offsets`]: every offset in the hypercube `[-r, r]^d`,
//!   `(2r + 1)^d − 1` neighbors.
//! - [`von_neumann_offsets`]: every offset with Manhattan norm in `[1, r]`,
//!   `D(d, r) − 1` neighbors where `D` is the [`delannoy`] number.
//!
//! Neither ever contains the zero offset. Both return the offsets twice:
//! as row-major linear offsets and as coordinate vectors. Neighbors are
//! found from the coordinate vectors, each axis wrapping around its own
//! extent (see [`Dimens::wrap`]). On an axis shorter than `2r + 1` several
//! offsets land on the same cell, or back on the cell itself; those are
//! dropped, so such grids have fewer neighbors than the counts above.
//!
//! # References
//!
//! - Alba & Dorronsoro (2008), *Cellular Genetic Algorithms*
//! - Delannoy (1895), lattice paths with diagonal steps

use super::dimens::Dimens;
use crate::error::{EvoError, Result};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Relative neighbor positions for one grid shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborOffsets {
    /// Row-major linear offsets, one per neighbor. Valid only away from
    /// the grid edges.
    pub offsets: Vec<isize>,

    /// Coordinate offsets, one vector per neighbor (same order).
    pub coordinates: Vec<Vec<isize>>,
}

impl NeighborOffsets {
    fn from_coordinates(dimens: &Dimens, coordinates: Vec<Vec<isize>>) -> Self {
        let offsets = coordinates
            .iter()
            .map(|c| dimens.linear_offset(c))
            .collect();
        Self {
            offsets,
            coordinates,
        }
    }

    /// Number of neighbors.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Returns `true` if there are no neighbors.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Neighbor indices of `cell` on a toroidal grid.
    ///
    /// Follows the offset order. Never contains `cell` and never repeats an
    /// index, even when an extent is shorter than the neighborhood.
    pub fn neighbors_of(&self, cell: usize, dimens: &Dimens) -> Vec<usize> {
        let mut seen = HashSet::with_capacity(self.coordinates.len());
        self.coordinates
            .iter()
            .map(|offset| dimens.wrap(cell, offset))
            .filter(|&neighbor| neighbor != cell && seen.insert(neighbor))
            .collect()
    }
}

fn checked_radius(radius: i64) -> Result<isize> {
    if radius <= 0 {
        return Err(EvoError::config(format!(
            "neighborhood radius must be positive, got {radius}"
        )));
    }
    isize::try_from(radius).map_err(|_| EvoError::config("neighborhood radius too large"))
}

/// Number of values in `[-r, r]`.
fn span(r: isize) -> Result<usize> {
    r.checked_mul(2)
        .and_then(|v| v.checked_add(1))
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| EvoError::config(format!("neighborhood radius {r} too large")))
}

/// Binomial coefficient `C(n, k)`.
fn binomial(n: u64, k: u64) -> Option<u64> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut result: u64 = 1;
    for i in 0..k {
        // exact at every step: result * (n - i) is divisible by (i + 1)
        result = result.checked_mul(n - i)? / (i + 1);
    }
    Some(result)
}

/// Delannoy number `D(m, n) = Σ_k C(m, k)·C(n, k)·2^k`.
///
/// Counts the lattice points within Manhattan distance `n` of the origin
/// in `m` dimensions (origin included).
///
/// Returns `None` on `u64` overflow.
///
/// ```
/// use u_evolve::grid::delannoy;
///
/// assert_eq!(delannoy(2, 2), Some(13));
/// assert_eq!(delannoy(200, 200), None);
/// ```
pub fn delannoy(m: u64, n: u64) -> Option<u64> {
    (0..=m.min(n)).try_fold(0u64, |acc, k| {
        let term = binomial(m, k)?
            .checked_mul(binomial(n, k)?)?
            .checked_mul(1u64.checked_shl(k as u32)?)?;
        acc.checked_add(term)
    })
}

/// Moore neighborhood: all offsets in `[-radius, radius]^d` except zero.
///
/// Enumerated with an odometer over `d` digits, the last axis turning
/// fastest.
pub fn moore_offsets(dimens: &Dimens, radius: i64) -> Result<NeighborOffsets> {
    let r = checked_radius(radius)?;
    let d = dimens.count();
    let side = span(r)?;
    let count = u32::try_from(d)
        .ok()
        .and_then(|d| side.checked_pow(d))
        .ok_or_else(|| EvoError::config("moore neighborhood too large"))?
        - 1;

    let mut coordinates = Vec::new();
    coordinates
        .try_reserve_exact(count)
        .map_err(|_| EvoError::config("moore neighborhood too large"))?;
    let mut digits = vec![-r; d];
    'odometer: loop {
        if digits.iter().any(|&x| x != 0) {
            coordinates.push(digits.clone());
        }
        let mut axis = d;
        loop {
            if axis == 0 {
                break 'odometer;
            }
            axis -= 1;
            if digits[axis] < r {
                digits[axis] += 1;
                continue 'odometer;
            }
            digits[axis] = -r;
        }
    }
    debug_assert_eq!(coordinates.len(), count);

    Ok(NeighborOffsets::from_coordinates(dimens, coordinates))
}

/// Von Neumann neighborhood: all offsets with Manhattan norm in
/// `[1, radius]`.
///
/// Axes are fixed one at a time; each axis ranges over the magnitude left
/// in the radius budget by the axes before it.
pub fn von_neumann_offsets(dimens: &Dimens, radius: i64) -> Result<NeighborOffsets> {
    let r = checked_radius(radius)?;
    let d = dimens.count();
    span(r)?;
    let count = delannoy(d as u64, r as u64)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| EvoError::config("von neumann neighborhood too large"))?
        - 1;

    let mut coordinates = Vec::new();
    coordinates
        .try_reserve_exact(count)
        .map_err(|_| EvoError::config("von neumann neighborhood too large"))?;
    let mut current = vec![0isize; d];
    fill_von_neumann(0, r, &mut current, &mut coordinates);
    debug_assert_eq!(coordinates.len(), count);

    Ok(NeighborOffsets::from_coordinates(dimens, coordinates))
}

fn fill_von_neumann(
    axis: usize,
    budget: isize,
    current: &mut Vec<isize>,
    out: &mut Vec<Vec<isize>>,
) {
    let last = current.len() - 1;
    if axis == last {
        for v in -budget..=budget {
            current[axis] = v;
            if current.iter().any(|&x| x != 0) {
                out.push(current.clone());
            }
        }
        current[axis] = 0;
        return;
    }
    for v in -budget..=budget {
        current[axis] = v;
        fill_von_neumann(axis + 1, budget - v.abs(), current, out);
    }
    current[axis] = 0;
}

/// A user-defined neighborhood.
pub trait CustomNeighborhood: Send + Sync {
    /// Indices of the neighbors of `cell`. Should not contain `cell`.
    fn neighbors(&self, cell: usize, dimens: &Dimens) -> Vec<usize>;
}

impl<F> CustomNeighborhood for F
where
    F: Fn(usize, &Dimens) -> Vec<usize> + Send + Sync,
{
    fn neighbors(&self, cell: usize, dimens: &Dimens) -> Vec<usize> {
        self(cell, dimens)
    }
}

/// Neighborhood geometry of a cellular population.
#[derive(Clone)]
pub enum Neighborhood {
    /// Hypercube of the given radius.
    Moore { radius: i64 },
    /// Manhattan ball of the given radius.
    VonNeumann { radius: i64 },
    /// User-defined geometry.
    Custom(Arc<dyn CustomNeighborhood>),
}

impl Neighborhood {
    /// Moore neighborhood; `radius` must be positive and `2 * radius + 1`
    /// must fit in `isize`.
    pub fn moore(radius: i64) -> Result<Self> {
        span(checked_radius(radius)?)?;
        Ok(Neighborhood::Moore { radius })
    }

    /// Von Neumann neighborhood; same bounds on `radius` as
    /// [`moore`](Self::moore).
    pub fn von_neumann(radius: i64) -> Result<Self> {
        span(checked_radius(radius)?)?;
        Ok(Neighborhood::VonNeumann { radius })
    }

    /// Wraps a custom geometry.
    pub fn custom(geometry: impl CustomNeighborhood + 'static) -> Self {
        Neighborhood::Custom(Arc::new(geometry))
    }

    /// Precomputed offsets for the built-in geometries, `None` for custom.
    pub fn offsets(&self, dimens: &Dimens) -> Result<Option<NeighborOffsets>> {
        match self {
            Neighborhood::Moore { radius } => moore_offsets(dimens, *radius).map(Some),
            Neighborhood::VonNeumann { radius } => von_neumann_offsets(dimens, *radius).map(Some),
            Neighborhood::Custom(_) => Ok(None),
        }
    }
}

impl Default for Neighborhood {
    fn default() -> Self {
        Neighborhood::Moore { radius: 1 }
    }
}

impl fmt::Debug for Neighborhood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Neighborhood::Moore { radius } => f.debug_struct("Moore").field("radius", radius).finish(),
            Neighborhood::VonNeumann { radius } => {
                f.debug_struct("VonNeumann").field("radius", radius).finish()
            }
            Neighborhood::Custom(_) => f.write_str("Custom"),
        }
    }
}
