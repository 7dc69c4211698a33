//! Exact linear algebra over the prime field `F_p`.
//!
//! Everything here is dense: the spectral sequence engine works one bidegree
//! at a time, and the spaces involved rarely exceed a handful of dimensions.
//! Coordinates are column vectors; a [`Matrix`] with `r` rows and `c`
//! columns is the linear map `F_p^c -> F_p^r` and acts via
//! [`Matrix::apply`].

#![warn(clippy::use_self)]

pub mod matrix;
pub mod prime;
pub mod vector;

pub use matrix::{Matrix, MultiReduction};
pub use prime::ValidPrime;
pub use vector::FpVector;
