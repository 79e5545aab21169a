//! N-dimensional grid shapes.

use crate::error::{EvoError, Result};

/// Shape of an N-dimensional grid.
///
/// Coordinates map to linear indices in row-major order (the last axis
/// varies fastest), so `Dimens::new([3, 4])` lays out 3 rows of 4 cells.
///
/// ```
/// use u_evolve::grid::Dimens;
///
/// let dimens = Dimens::new([3, 4])?;
/// assert_eq!(dimens.size(), 12);
/// assert_eq!(dimens.to_index(&[1, 2]), Some(6));
/// assert_eq!(dimens.to_coords(6), vec![1, 2]);
/// # Ok::<(), u_evolve::EvoError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "Vec<usize>", into = "Vec<usize>")
)]
pub struct Dimens {
    extents: Vec<usize>,
    strides: Vec<usize>,
}

impl Dimens {
    /// Creates a shape from its extents.
    ///
    /// Every extent must be positive and there must be at least one axis.
    pub fn new(extents: impl Into<Vec<usize>>) -> Result<Self> {
        let extents = extents.into();
        if extents.is_empty() {
            return Err(EvoError::config("dimens needs at least one axis"));
        }
        if let Some(axis) = extents.iter().position(|&e| e == 0) {
            return Err(EvoError::config(format!("dimens axis {axis} has zero extent")));
        }
        let mut strides = vec![1usize; extents.len()];
        for k in (0..extents.len() - 1).rev() {
            strides[k] = strides[k + 1]
                .checked_mul(extents[k + 1])
                .ok_or_else(|| EvoError::config("dimens size overflows usize"))?;
        }
        strides[0]
            .checked_mul(extents[0])
            .ok_or_else(|| EvoError::config("dimens size overflows usize"))?;
        Ok(Self { extents, strides })
    }

    /// Number of axes.
    pub fn count(&self) -> usize {
        self.extents.len()
    }

    /// Extents of all axes.
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Extent of one axis.
    pub fn extent(&self, axis: usize) -> usize {
        self.extents[axis]
    }

    /// Linear step of each axis.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Total number of cells.
    pub fn size(&self) -> usize {
        self.strides[0] * self.extents[0]
    }

    /// Linear index of a coordinate, or `None` if out of bounds.
    pub fn to_index(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.count() {
            return None;
        }
        coords
            .iter()
            .zip(&self.extents)
            .zip(&self.strides)
            .try_fold(0usize, |acc, ((&c, &extent), &stride)| {
                (c < extent).then(|| acc + c * stride)
            })
    }

    /// Coordinate of a linear index.
    pub fn to_coords(&self, index: usize) -> Vec<usize> {
        self.strides
            .iter()
            .zip(&self.extents)
            .map(|(&stride, &extent)| (index / stride) % extent)
            .collect()
    }

    /// Row-major linear offset of a relative coordinate vector.
    ///
    /// This is the offset between two cells that lie away from every edge.
    /// Use [`wrap`](Self::wrap) to find neighbors across edges.
    pub fn linear_offset(&self, offset: &[isize]) -> isize {
        offset
            .iter()
            .zip(&self.strides)
            .map(|(&o, &stride)| o * stride as isize)
            .sum()
    }

    /// Moves `index` by a coordinate offset, wrapping every axis around its
    /// own extent.
    ///
    /// Axes missing from `offset` are not moved.
    ///
    /// ```
    /// use u_evolve::grid::Dimens;
    ///
    /// let dimens = Dimens::new([3, 4])?;
    /// // (0, 0) one step left lands on (0, 3), not on the previous row
    /// assert_eq!(dimens.wrap(0, &[0, -1]), 3);
    /// assert_eq!(dimens.wrap(0, &[-1, 0]), 8);
    /// # Ok::<(), u_evolve::EvoError>(())
    /// ```
    pub fn wrap(&self, index: usize, offset: &[isize]) -> usize {
        self.extents
            .iter()
            .zip(&self.strides)
            .enumerate()
            .map(|(axis, (&extent, &stride))| {
                let coord = (index / stride) % extent;
                let delta = offset.get(axis).copied().unwrap_or(0);
                let extent = extent as i128;
                let moved = (coord as i128 + delta as i128).rem_euclid(extent);
                moved as usize * stride
            })
            .sum()
    }
}

impl TryFrom<Vec<usize>> for Dimens {
    type Error = EvoError;

    fn try_from(extents: Vec<usize>) -> Result<Self> {
        Dimens::new(extents)
    }
}

impl From<Dimens> for Vec<usize> {
    fn from(dimens: Dimens) -> Self {
        dimens.extents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_and_zero() {
        assert!(Dimens::new(Vec::<usize>::new()).is_err());
        assert!(Dimens::new([4, 0, 2]).is_err());
    }

    #[test]
    fn test_strides_row_major() {
        let dimens = Dimens::new([2, 3, 4]).unwrap();
        assert_eq!(dimens.strides(), &[12, 4, 1]);
        assert_eq!(dimens.size(), 24);
        assert_eq!(dimens.count(), 3);
    }

    #[test]
    fn test_index_coords_agree() {
        let dimens = Dimens::new([2, 3, 4]).unwrap();
        for index in 0..dimens.size() {
            let coords = dimens.to_coords(index);
            assert_eq!(dimens.to_index(&coords), Some(index));
        }
    }

    #[test]
    fn test_to_index_out_of_bounds() {
        let dimens = Dimens::new([2, 3]).unwrap();
        assert_eq!(dimens.to_index(&[2, 0]), None);
        assert_eq!(dimens.to_index(&[0]), None);
    }

    #[test]
    fn test_wrap() {
        let dimens = Dimens::new([3, 3]).unwrap();
        assert_eq!(dimens.wrap(0, &[0, -1]), 2);
        assert_eq!(dimens.wrap(0, &[-1, -1]), 8);
        assert_eq!(dimens.wrap(8, &[0, 1]), 6);
        assert_eq!(dimens.wrap(4, &[-1, 1]), 2);
    }

    #[test]
    fn test_wrap_per_axis_on_non_square_grid() {
        // 3 rows of 4: (0, 0) wraps to (0, 3) and (2, 0), never to (2, 3)
        let dimens = Dimens::new([3, 4]).unwrap();
        assert_eq!(dimens.wrap(0, &[0, -1]), 3);
        assert_eq!(dimens.wrap(0, &[-1, 0]), 8);
        assert_eq!(dimens.wrap(3, &[0, 1]), 0);
        assert_eq!(dimens.wrap(11, &[1, 1]), 0);
        assert_eq!(dimens.wrap(5, &[0, 8]), 5);
        assert_eq!(dimens.wrap(5, &[-7, 0]), 1);
    }

    #[test]
    fn test_wrap_missing_axes_stay() {
        let dimens = Dimens::new([2, 5]).unwrap();
        assert_eq!(dimens.wrap(7, &[1]), 2);
        assert_eq!(dimens.wrap(7, &[]), 7);
    }
}
