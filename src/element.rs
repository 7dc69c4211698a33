//! Homogeneous page elements.
//!
//! An element is either the canonical zero or a (bidegree, coordinate) pair
//! together with its polynomial form. Every construction path resolves the
//! candidate against the owning page's module at its bidegree, so an element
//! that was killed collapses to zero, and an element outside the page's span
//! is rejected. Ring operations compute at the polynomial level and re-run
//! the same resolution on the result.

use fp::vector::FpVector;

use crate::bidegree::Bidegree;
use crate::module::Classification;
use crate::polynomial::{PolyRing, Polynomial};
use crate::sseq::{PageNum, SpectralSequence};
use crate::{Error, Result};

#[derive(Clone, Debug)]
pub struct HomoElem {
    page: PageNum,
    inner: Option<ElemData>,
}

#[derive(Clone, Debug)]
struct ElemData {
    bidegree: Bidegree,
    coordinate: FpVector,
    poly: Polynomial,
}

impl HomoElem {
    /// The canonical zero element of a page. It has no bidegree.
    pub fn zero(page: PageNum) -> Self {
        Self { page, inner: None }
    }

    /// Build from a polynomial, inferring the bidegree from its monomials.
    pub fn from_poly(ss: &SpectralSequence, page: PageNum, poly: Polynomial) -> Result<Self> {
        if poly.is_zero() {
            return Ok(Self::zero(page));
        }
        let (bidegree, coordinate) = ss.abs_info(&poly)?;
        Self::resolve(ss, page, bidegree, coordinate, Some(poly))
    }

    /// Build from an explicit standard coordinate at a bidegree, e.g. when
    /// reconstructing an element from a computed matrix column.
    pub fn from_coordinate(
        ss: &SpectralSequence,
        page: PageNum,
        bidegree: Bidegree,
        coordinate: FpVector,
    ) -> Result<Self> {
        Self::resolve(ss, page, bidegree, coordinate, None)
    }

    /// Parse an expression in the generator ring and resolve it.
    pub fn parse(ss: &SpectralSequence, page: PageNum, expr: &str) -> Result<Self> {
        let poly = ss.ring().parse(expr).map_err(Error::parse)?;
        Self::from_poly(ss, page, poly)
    }

    fn resolve(
        ss: &SpectralSequence,
        page: PageNum,
        bidegree: Bidegree,
        coordinate: FpVector,
        poly: Option<Polynomial>,
    ) -> Result<Self> {
        let module = ss.module(page, bidegree)?;
        match module.classify(&coordinate) {
            Classification::NotInSpan => {
                let expr = match &poly {
                    Some(poly) => ss.ring().format(poly),
                    None => coordinate.to_string(),
                };
                Err(Error::NonexistentElement {
                    expr,
                    bidegree,
                    page,
                })
            }
            Classification::Zero => Ok(Self::zero(page)),
            Classification::NonZero => {
                let poly = match poly {
                    Some(poly) => poly,
                    None => {
                        // Rebuild the polynomial form from the absolute basis
                        // weighted by the coordinate entries.
                        let basis = ss.abs_basis(bidegree)?;
                        let mut poly = ss.ring().zero();
                        for (i, c) in coordinate.iter_nonzero() {
                            poly = poly.add(&ss.ring().monomial(basis[i].clone()).scale(c));
                        }
                        poly
                    }
                };
                Ok(Self {
                    page,
                    inner: Some(ElemData {
                        bidegree,
                        coordinate,
                        poly,
                    }),
                })
            }
        }
    }

    pub fn page(&self) -> PageNum {
        self.page
    }

    pub fn is_zero(&self) -> bool {
        self.inner.is_none()
    }

    pub fn bidegree(&self) -> Option<Bidegree> {
        self.inner.as_ref().map(|d| d.bidegree)
    }

    pub fn coordinate(&self) -> Option<&FpVector> {
        self.inner.as_ref().map(|d| &d.coordinate)
    }

    pub fn poly(&self) -> Option<&Polynomial> {
        self.inner.as_ref().map(|d| &d.poly)
    }

    /// The polynomial form, with the zero element rendered as the zero
    /// polynomial.
    pub fn poly_or_zero(&self, ss: &SpectralSequence) -> Polynomial {
        match &self.inner {
            Some(d) => d.poly.clone(),
            None => ss.ring().zero(),
        }
    }

    pub fn render(&self, ring: &PolyRing) -> String {
        match &self.inner {
            Some(d) => ring.format(&d.poly),
            None => "0".to_string(),
        }
    }

    pub fn add(&self, ss: &SpectralSequence, other: &HomoElem) -> Result<HomoElem> {
        assert_eq!(self.page, other.page);
        let poly = self.poly_or_zero(ss).add(&other.poly_or_zero(ss));
        Self::from_poly(ss, self.page, poly)
    }

    pub fn sub(&self, ss: &SpectralSequence, other: &HomoElem) -> Result<HomoElem> {
        assert_eq!(self.page, other.page);
        let poly = self.poly_or_zero(ss).sub(&other.poly_or_zero(ss));
        Self::from_poly(ss, self.page, poly)
    }

    pub fn mul(&self, ss: &SpectralSequence, other: &HomoElem) -> Result<HomoElem> {
        assert_eq!(self.page, other.page);
        let poly = self.poly_or_zero(ss).mul(&other.poly_or_zero(ss));
        Self::from_poly(ss, self.page, poly)
    }

    pub fn pow(&self, ss: &SpectralSequence, exp: u32) -> Result<HomoElem> {
        let poly = self.poly_or_zero(ss).pow(exp);
        Self::from_poly(ss, self.page, poly)
    }

    /// Equality on the page: the difference resolves to zero.
    pub fn equals(&self, ss: &SpectralSequence, other: &HomoElem) -> Result<bool> {
        Ok(self.sub(ss, other)?.is_zero())
    }
}

impl std::fmt::Display for HomoElem {
    /// Bidegree and coordinate only; [`HomoElem::render`] gives the named
    /// polynomial form.
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.inner {
            Some(d) => write!(f, "({}, {})", d.bidegree, d.coordinate),
            None => write!(f, "0"),
        }
    }
}
