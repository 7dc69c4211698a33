//! The vector space at a single bidegree of a single page, represented as a
//! kernel basis (declared zero) plus a surviving basis, instead of an
//! abstract quotient.

use std::fmt;

use fp::matrix::{multi_reduce, Matrix};
use fp::prime::ValidPrime;
use fp::vector::FpVector;

use crate::bidegree::Bidegree;
use crate::{Error, Result};

/// Where a coordinate vector sits relative to a [`Module`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// In the span of the kernel basis: the element is zero on this page.
    Zero,
    /// In the combined span with a non-zero surviving component.
    NonZero,
    /// Outside the combined span: no such element exists on this page.
    NotInSpan,
}

pub struct Module {
    bidegree: Bidegree,
    abs_dim: usize,
    ker_basis: Vec<FpVector>,
    sp_basis: Vec<FpVector>,
    /// Transform from standard coordinates to coordinates in the concatenated
    /// (kernel ∥ surviving) pivot basis.
    basis_inv: Matrix,
}

impl Module {
    /// Decompose a spanning set and a declared kernel into canonical bases.
    ///
    /// Both inputs are lists of standard-coordinate columns of length
    /// `abs_dim`; the spanning set may be redundant. Fails with
    /// [`Error::KernelNotInSpan`] when the kernel is not contained in the
    /// span of the basis — that always indicates inconsistent caller data
    /// and is never corrected silently.
    pub fn new(
        p: ValidPrime,
        bidegree: Bidegree,
        basis: &[FpVector],
        ker_basis: &[FpVector],
        abs_dim: usize,
    ) -> Result<Module> {
        let reduction = multi_reduce(p, abs_dim, &[ker_basis, basis]);

        let ker: Vec<FpVector> = reduction.block_pivots[0]
            .iter()
            .map(|&i| ker_basis[i].clone())
            .collect();
        let sp: Vec<FpVector> = reduction.block_pivots[1]
            .iter()
            .map(|&i| basis[i].clone())
            .collect();

        if ker.len() + sp.len() > basis.len() {
            return Err(Error::KernelNotInSpan { bidegree });
        }

        Ok(Module {
            bidegree,
            abs_dim,
            ker_basis: ker,
            sp_basis: sp,
            basis_inv: reduction.transform,
        })
    }

    pub fn bidegree(&self) -> Bidegree {
        self.bidegree
    }

    /// Dimension of the unreduced standard monomial space.
    pub fn abs_dim(&self) -> usize {
        self.abs_dim
    }

    /// Dimension on this page: the number of surviving basis columns.
    pub fn dim(&self) -> usize {
        self.sp_basis.len()
    }

    pub fn ker_basis(&self) -> &[FpVector] {
        &self.ker_basis
    }

    pub fn sp_basis(&self) -> &[FpVector] {
        &self.sp_basis
    }

    /// Functionals (as rows) that vanish exactly on the combined span of the
    /// kernel and surviving bases. A standard vector lies in this module's
    /// span iff every detector row pairs with it to zero; the next page
    /// intersects its nullspace with these so that directions already
    /// outside the span stay outside.
    pub(crate) fn invalid_detectors(&self) -> Vec<FpVector> {
        let rank = self.ker_basis.len() + self.sp_basis.len();
        (rank..self.abs_dim)
            .map(|r| self.basis_inv.row(r).clone())
            .collect()
    }

    /// Classify a standard coordinate vector against this module.
    ///
    /// The image under `basis_inv` expresses the vector in the pivot basis;
    /// the highest non-zero coordinate decides. At `abs_dim == 0` only the
    /// empty vector classifies as zero.
    pub fn classify(&self, vec: &FpVector) -> Classification {
        assert_eq!(vec.len(), self.abs_dim);
        let indicator = self.basis_inv.apply(vec);
        match indicator.last_nonzero() {
            None => Classification::Zero,
            Some(i) if i >= self.ker_basis.len() + self.sp_basis.len() => {
                Classification::NotInSpan
            }
            Some(i) if i >= self.ker_basis.len() => Classification::NonZero,
            Some(_) => Classification::Zero,
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Surviving basis:")?;
        for v in &self.sp_basis {
            writeln!(f, "{v}")?;
        }
        writeln!(f, "Kernel basis:")?;
        for v in &self.ker_basis {
            writeln!(f, "{v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fixture() -> Module {
        let p = ValidPrime::new(5);
        // Ambient dimension 4: kernel spans e0 + e1, surviving basis e2; the
        // e3 direction is outside the combined span.
        let ker = [FpVector::from_slice(p, &[1, 1, 0, 0])];
        let basis = [
            FpVector::from_slice(p, &[1, 1, 0, 0]),
            FpVector::from_slice(p, &[0, 0, 1, 0]),
        ];
        Module::new(p, Bidegree::new(0, 2), &basis, &ker, 4).unwrap()
    }

    #[test]
    fn test_decomposition() {
        let m = fixture();
        assert_eq!(m.abs_dim(), 4);
        assert_eq!(m.dim(), 1);
        assert_eq!(m.ker_basis().len(), 1);
        assert_eq!(m.sp_basis()[0].to_string(), "[0, 0, 1, 0]");
    }

    #[test]
    fn test_classify() {
        let p = ValidPrime::new(5);
        let m = fixture();
        let cases: [(&[u32; 4], Classification); 5] = [
            (&[0, 0, 0, 0], Classification::Zero),
            (&[2, 2, 0, 0], Classification::Zero),
            (&[0, 0, 3, 0], Classification::NonZero),
            (&[1, 1, 4, 0], Classification::NonZero),
            (&[0, 0, 0, 1], Classification::NotInSpan),
        ];
        for (entries, expected) in cases {
            assert_eq!(m.classify(&FpVector::from_slice(p, entries)), expected);
        }
    }

    #[test]
    fn test_kernel_not_in_span() {
        let p = ValidPrime::new(5);
        let ker = [FpVector::from_slice(p, &[0, 1])];
        let basis = [FpVector::from_slice(p, &[1, 0])];
        assert!(matches!(
            Module::new(p, Bidegree::zero(), &basis, &ker, 2),
            Err(Error::KernelNotInSpan { .. })
        ));
    }

    #[test]
    fn test_zero_dimensional() {
        let p = ValidPrime::new(3);
        let m = Module::new(p, Bidegree::zero(), &[], &[], 0).unwrap();
        assert_eq!(m.dim(), 0);
        assert_eq!(m.classify(&FpVector::new(p, 0)), Classification::Zero);
    }

    proptest! {
        /// Random combinations of the bases classify as predicted: any
        /// component outside the span wins, otherwise any surviving
        /// component, otherwise the vector is (page-)zero.
        #[test]
        fn test_classify_random(a in 0u32..5, b in 0u32..5, c in 0u32..5) {
            let p = ValidPrime::new(5);
            let m = fixture();
            let mut v = FpVector::new(p, 4);
            v.add(&m.ker_basis()[0], a);
            v.add(&m.sp_basis()[0], b);
            v.add_basis_element(3, c);
            let expected = if c != 0 {
                Classification::NotInSpan
            } else if b != 0 {
                Classification::NonZero
            } else {
                Classification::Zero
            };
            prop_assert_eq!(m.classify(&v), expected);
        }
    }
}
