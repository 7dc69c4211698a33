//! The spectral sequence itself: generator data, relations, and the
//! append-only list of pages.
//!
//! Pages hold no references back to this struct; every query threads
//! `&SpectralSequence` through explicitly and resolves "the previous page" by
//! index. Queries take `&self` and recurse on demand — computing a page-n
//! module may trigger the page-(n−1) differential matrix, which triggers
//! page-(n−1) modules, and so on back to page 1, with every intermediate
//! result memoized.

use dashmap::DashMap;
use std::sync::Arc;

use fp::matrix::Matrix;
use fp::prime::ValidPrime;
use fp::vector::FpVector;

use crate::bidegree::Bidegree;
use crate::combinatorics::convex_integral_combinations;
use crate::element::HomoElem;
use crate::module::Module;
use crate::oracle::{NoOracle, Oracle};
use crate::page::Page;
use crate::polynomial::{Exponents, PolyRing, Polynomial};
use crate::{Error, Result};

/// Pages are numbered from 1, matching the usual `E_1, E_2, …` indexing.
pub type PageNum = u32;

pub struct SpectralSequence {
    ring: PolyRing,
    gen_bidegrees: Vec<Bidegree>,
    /// The differential on page `n` shifts bidegrees by `coef · (n, 1)ᵀ`.
    shift_coef: [[i32; 2]; 2],
    relations: Vec<Polynomial>,
    pages: Vec<Page>,
    /// bidegree → exponent vectors of the standard monomial basis.
    absolute_bases: DashMap<Bidegree, Arc<Vec<Exponents>>>,
    oracle: Box<dyn Oracle>,
}

impl SpectralSequence {
    /// Set up the bigraded polynomial algebra: one bidegree per generator
    /// (the columns of the 2×n generator matrix), and the 2×2 matrix turning
    /// a page number into that page's differential shift.
    pub fn new(
        p: ValidPrime,
        generators: &[&str],
        gen_bidegrees: &[Bidegree],
        shift_coef: [[i32; 2]; 2],
    ) -> Result<Self> {
        if generators.len() != gen_bidegrees.len() {
            return Err(Error::Config(format!(
                "{} generators but {} bidegrees",
                generators.len(),
                gen_bidegrees.len()
            )));
        }
        for (i, name) in generators.iter().enumerate() {
            let mut chars = name.chars();
            let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric());
            if !valid {
                return Err(Error::Config(format!("invalid generator name {name:?}")));
            }
            if generators[..i].contains(name) {
                return Err(Error::Config(format!("duplicate generator name {name:?}")));
            }
        }
        for (name, b) in generators.iter().zip(gen_bidegrees) {
            if b.y() < 0 || (b.y() == 0 && b.x() <= 0) {
                return Err(Error::IllPosed(format!(
                    "generator {name} has bidegree {b}: the grading component must be \
                     non-negative, and positive degree is required when it is zero"
                )));
            }
        }

        Ok(Self {
            ring: PolyRing::new(p, generators.iter().map(|s| s.to_string()).collect()),
            gen_bidegrees: gen_bidegrees.to_vec(),
            shift_coef,
            relations: Vec::new(),
            pages: Vec::new(),
            absolute_bases: DashMap::new(),
            oracle: Box::new(NoOracle),
        })
    }

    pub fn ring(&self) -> &PolyRing {
        &self.ring
    }

    pub fn prime(&self) -> ValidPrime {
        self.ring.prime()
    }

    pub fn generator_bidegrees(&self) -> &[Bidegree] {
        &self.gen_bidegrees
    }

    pub fn oracle(&self) -> &dyn Oracle {
        &*self.oracle
    }

    /// Replace the oracle consulted for unknown differentials. The default
    /// [`NoOracle`] reports every unknown as an error.
    pub fn set_oracle(&mut self, oracle: Box<dyn Oracle>) {
        self.oracle = oracle;
    }

    /// Declare relations: polynomials that are zero from page 1 on. Must be
    /// called before any page is added.
    pub fn kill(&mut self, relations: &[&str]) -> Result<()> {
        if !self.pages.is_empty() {
            return Err(Error::RelationsFrozen);
        }
        for expr in relations {
            let poly = self.ring.parse(expr).map_err(Error::parse)?;
            if poly.is_zero() {
                continue;
            }
            // Homogeneity check; the bidegree itself is recomputed on use.
            self.abs_info(&poly)?;
            tracing::debug!(relation = %self.ring.format(&poly), "declared relation");
            self.relations.push(poly);
        }
        Ok(())
    }

    /// Append the next page, optionally with differential knowledge: pairs of
    /// (element expression, image expression), both interpreted on the new
    /// page. Returns the new page number.
    pub fn add_page(&mut self, known: &[(&str, &str)]) -> Result<PageNum> {
        let number = self.pages.len() as PageNum + 1;
        let shift = self.differential_shift(number);
        self.pages.push(Page::new(number, shift));
        match self.resolve_knowledge(number, shift, known) {
            Ok(resolved) => {
                let page = self.pages.last_mut().expect("page just pushed");
                page.differential_mut().set_knowledge(resolved);
                Ok(number)
            }
            Err(e) => {
                self.pages.pop();
                Err(e)
            }
        }
    }

    fn resolve_knowledge(
        &self,
        page: PageNum,
        shift: Bidegree,
        known: &[(&str, &str)],
    ) -> Result<Vec<(HomoElem, HomoElem)>> {
        let mut resolved = Vec::new();
        for (source, image) in known {
            let source = HomoElem::parse(self, page, source)?;
            let image = HomoElem::parse(self, page, image)?;
            // A source that is already zero on this page carries no
            // information.
            let Some(source_bidegree) = source.bidegree() else {
                continue;
            };
            if let Some(found) = image.bidegree() {
                let expected = source_bidegree + shift;
                if found != expected {
                    return Err(Error::KnowledgeMismatch {
                        page,
                        expected,
                        found,
                    });
                }
            }
            resolved.push((source, image));
        }
        Ok(resolved)
    }

    pub fn differential_shift(&self, page: PageNum) -> Bidegree {
        let n = page as i32;
        Bidegree::new(
            self.shift_coef[0][0] * n + self.shift_coef[0][1],
            self.shift_coef[1][0] * n + self.shift_coef[1][1],
        )
    }

    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    /// # Panics
    /// Panics if the page has not been added yet.
    pub fn page(&self, number: PageNum) -> &Page {
        &self.pages[number as usize - 1]
    }

    pub fn module(&self, page: PageNum, bidegree: Bidegree) -> Result<Arc<Module>> {
        self.page(page).module(self, bidegree)
    }

    pub fn differential_matrix(&self, page: PageNum, bidegree: Bidegree) -> Result<Arc<Matrix>> {
        self.page(page).differential().matrix(self, bidegree)
    }

    pub fn element(&self, page: PageNum, expr: &str) -> Result<HomoElem> {
        HomoElem::parse(self, page, expr)
    }

    /// The exponent vectors of the standard monomial basis at a bidegree,
    /// memoized. Bidegrees below the grading axis, and non-positive degrees
    /// on it, are empty.
    pub fn abs_basis(&self, bidegree: Bidegree) -> Result<Arc<Vec<Exponents>>> {
        if let Some(basis) = self.absolute_bases.get(&bidegree) {
            return Ok(Arc::clone(&basis));
        }
        let basis = if bidegree.y() < 0 || (bidegree.y() == 0 && bidegree.x() <= 0) {
            Vec::new()
        } else {
            convex_integral_combinations(&self.gen_bidegrees, bidegree)?
        };
        let basis = Arc::new(basis);
        self.absolute_bases.insert(bidegree, Arc::clone(&basis));
        Ok(basis)
    }

    pub fn abs_dimension(&self, bidegree: Bidegree) -> Result<usize> {
        Ok(self.abs_basis(bidegree)?.len())
    }

    /// The bidegree of a monomial: the generator matrix applied to the
    /// exponent vector.
    pub fn abs_bidegree(&self, exps: &[u32]) -> Bidegree {
        debug_assert_eq!(exps.len(), self.gen_bidegrees.len());
        let mut result = Bidegree::zero();
        for (&e, &b) in exps.iter().zip(&self.gen_bidegrees) {
            result = result + b.scale(e as i32);
        }
        result
    }

    /// The bidegree of a non-zero polynomial and its coordinate in the
    /// standard monomial basis. Fails when the terms do not share a single
    /// bidegree.
    pub fn abs_info(&self, poly: &Polynomial) -> Result<(Bidegree, FpVector)> {
        assert!(!poly.is_zero());
        let mut bidegree: Option<Bidegree> = None;
        for (exps, _) in poly.terms() {
            let b = self.abs_bidegree(exps);
            match bidegree {
                None => bidegree = Some(b),
                Some(first) if first != b => {
                    return Err(Error::NotHomogeneous {
                        expr: self.ring.format(poly),
                        first,
                        second: b,
                    });
                }
                Some(_) => {}
            }
        }
        let bidegree = bidegree.expect("non-zero polynomial");

        let basis = self.abs_basis(bidegree)?;
        let mut coordinate = FpVector::new(self.prime(), basis.len());
        for (exps, c) in poly.terms() {
            let Some(i) = basis.iter().position(|e| e == exps) else {
                return Err(Error::NotInBasis {
                    monomial: self.ring.format(&self.ring.monomial(exps.clone())),
                    bidegree,
                });
            };
            coordinate.add_basis_element(i, c);
        }
        Ok((bidegree, coordinate))
    }

    /// The page-1 kernel at a bidegree, generated by the declared relations:
    /// for each relation `r` at bidegree `rb`, every product
    /// `monomial(e) · r^k` with `k ≥ 1` landing at the target contributes a
    /// coordinate column. Finding the `(e, k)` pairs is the conic problem
    /// with `rb` appended to the generator matrix.
    pub(crate) fn relation_kernel(&self, bidegree: Bidegree) -> Result<Vec<FpVector>> {
        if bidegree.y() < 0 {
            return Ok(Vec::new());
        }
        let mut result: Vec<FpVector> = Vec::new();
        for relation in &self.relations {
            let (relation_bidegree, _) = self.abs_info(relation)?;
            let mut columns = self.gen_bidegrees.clone();
            columns.push(relation_bidegree);
            for solution in convex_integral_combinations(&columns, bidegree)? {
                let (exps, k) = solution.split_at(self.ring.num_gens());
                if k[0] == 0 {
                    continue;
                }
                let killed = self.ring.monomial(exps.to_vec()).mul(&relation.pow(k[0]));
                let (b, coordinate) = self.abs_info(&killed)?;
                debug_assert_eq!(b, bidegree);
                if !result.contains(&coordinate) {
                    tracing::debug!(
                        killed = %self.ring.format(&killed),
                        bidegree = %bidegree,
                        "page 1 kernel element"
                    );
                    result.push(coordinate);
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> SpectralSequence {
        // d_n has bidegree [[1, 0], [-1, 1]] · (n, 1)ᵀ = (n, 1 - n).
        SpectralSequence::new(
            ValidPrime::new(3),
            &["a", "t"],
            &[Bidegree::new(3, 0), Bidegree::new(0, 2)],
            [[1, 0], [-1, 1]],
        )
        .unwrap()
    }

    #[test]
    fn test_abs_basis() {
        let ss = example();
        // (6, 4) contains a^2 t^2 only.
        assert_eq!(*ss.abs_basis(Bidegree::new(6, 4)).unwrap(), vec![vec![2, 2]]);
        assert_eq!(ss.abs_dimension(Bidegree::new(0, 6)).unwrap(), 1);
        assert_eq!(ss.abs_dimension(Bidegree::new(1, 2)).unwrap(), 0);
        assert_eq!(ss.abs_dimension(Bidegree::new(0, -2)).unwrap(), 0);
        assert_eq!(ss.abs_dimension(Bidegree::zero()).unwrap(), 0);
    }

    #[test]
    fn test_relation_kernel() {
        let mut ss = example();
        ss.kill(&["a^2"]).unwrap();
        // At (6, 2) the only monomial a^2 t is killed.
        let kernel = ss.relation_kernel(Bidegree::new(6, 2)).unwrap();
        assert_eq!(kernel.len(), 1);
        assert_eq!(kernel[0].to_string(), "[1]");
        // At (3, 2) nothing is killed.
        assert!(ss.relation_kernel(Bidegree::new(3, 2)).unwrap().is_empty());
    }

    #[test]
    fn test_relations_freeze() {
        let mut ss = example();
        ss.add_page(&[]).unwrap();
        assert!(matches!(ss.kill(&["a^2"]), Err(Error::RelationsFrozen)));
    }

    #[test]
    fn test_differential_shift() {
        let ss = example();
        assert_eq!(ss.differential_shift(1), Bidegree::new(1, 0));
        assert_eq!(ss.differential_shift(3), Bidegree::new(3, -2));
    }

    #[test]
    fn test_bad_construction() {
        let p = ValidPrime::new(3);
        assert!(SpectralSequence::new(p, &["a"], &[], [[1, 0], [0, 1]]).is_err());
        assert!(SpectralSequence::new(
            p,
            &["a", "a"],
            &[Bidegree::new(1, 1), Bidegree::new(2, 2)],
            [[1, 0], [0, 1]]
        )
        .is_err());
        assert!(SpectralSequence::new(
            p,
            &["a"],
            &[Bidegree::new(0, 0)],
            [[1, 0], [0, 1]]
        )
        .is_err());
    }
}
