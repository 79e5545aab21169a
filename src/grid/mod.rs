//! Grid shapes and neighborhood geometry for cellular populations.

mod dimens;
mod neighborhood;

pub use dimens::Dimens;
pub use neighborhood::{
    delannoy, moore_offsets, von_neumann_offsets, CustomNeighborhood, NeighborOffsets,
    Neighborhood,
};
