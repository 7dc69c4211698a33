//! The differential of a page: a partial map of fixed bidegree shift,
//! completed to a full matrix at any domain bidegree.
//!
//! The completion pipeline: directly known elements at the bidegree, then
//! multiplicative (Leibniz) extension of elements known at other bidegrees,
//! then the module's kernel (whose image is zero by definition), and finally
//! the oracle for surviving basis vectors with no derivable image. The
//! multiplicative extension is recomputed per query and never persisted into
//! the knowledge list.

use dashmap::DashMap;
use std::sync::Arc;

use fp::matrix::{multi_reduce, Matrix};
use fp::vector::FpVector;

use crate::bidegree::Bidegree;
use crate::combinatorics::convex_integral_combinations;
use crate::element::HomoElem;
use crate::oracle::OracleRequest;
use crate::sseq::{PageNum, SpectralSequence};
use crate::{Error, Result};

pub struct Differential {
    page: PageNum,
    shift: Bidegree,
    knowledge: Vec<(HomoElem, HomoElem)>,
    matrices: DashMap<Bidegree, Arc<Matrix>>,
}

impl Differential {
    pub(crate) fn new(page: PageNum, shift: Bidegree) -> Self {
        Self {
            page,
            shift,
            knowledge: Vec::new(),
            matrices: DashMap::new(),
        }
    }

    pub(crate) fn set_knowledge(&mut self, knowledge: Vec<(HomoElem, HomoElem)>) {
        self.knowledge = knowledge;
    }

    /// The bidegree shift of this differential.
    pub fn shift(&self) -> Bidegree {
        self.shift
    }

    /// The (element → image) pairs supplied at page creation.
    pub fn knowledge(&self) -> &[(HomoElem, HomoElem)] {
        &self.knowledge
    }

    /// The full matrix of the differential at a domain bidegree, mapping
    /// standard domain coordinates to standard target coordinates. Memoized;
    /// entries are only cached after successful computation.
    pub fn matrix(&self, ss: &SpectralSequence, bidegree: Bidegree) -> Result<Arc<Matrix>> {
        if let Some(matrix) = self.matrices.get(&bidegree) {
            return Ok(Arc::clone(&matrix));
        }
        let matrix = Arc::new(self.compute_matrix(ss, bidegree)?);
        self.matrices.insert(bidegree, Arc::clone(&matrix));
        Ok(matrix)
    }

    fn compute_matrix(&self, ss: &SpectralSequence, bidegree: Bidegree) -> Result<Matrix> {
        let p = ss.prime();
        let domain_dim = ss.abs_dimension(bidegree)?;
        let target = bidegree + self.shift;
        let target_dim = ss.abs_dimension(target)?;
        let module = ss.module(self.page, bidegree)?;

        // Nothing to hit, or nothing alive to map: the zero matrix, without
        // consulting the oracle.
        if target_dim == 0 || module.dim() == 0 {
            return Ok(Matrix::new(p, target_dim, domain_dim));
        }

        // Known images with domain exactly here, and elements known elsewhere
        // that can contribute multiplicatively.
        let mut known: Vec<(FpVector, FpVector)> = Vec::new();
        let mut extendable: Vec<&(HomoElem, HomoElem)> = Vec::new();
        for pair in &self.knowledge {
            match pair.0.bidegree() {
                Some(b) if b == bidegree => known.push((
                    pair.0.coordinate().expect("non-zero element").clone(),
                    self.image_coordinate(p, target_dim, &pair.1),
                )),
                Some(_) => extendable.push(pair),
                None => {}
            }
        }

        if !extendable.is_empty() {
            let columns: Vec<Bidegree> = extendable
                .iter()
                .map(|pair| pair.0.bidegree().expect("non-zero element"))
                .collect();
            for combo in convex_integral_combinations(&columns, bidegree)? {
                if combo.iter().all(|&n| n == 0) {
                    continue;
                }
                if let Some(entry) = self.extend(ss, target_dim, &extendable, &combo)? {
                    known.push(entry);
                }
            }
        }

        // Expand to a full basis of the module: known elements take pivot
        // priority, kernel pivots map to zero, and the remaining surviving
        // pivots have no derivable image.
        let pre_basis: Vec<FpVector> = known.iter().map(|(v, _)| v.clone()).collect();
        let reduction = multi_reduce(
            p,
            domain_dim,
            &[&pre_basis, module.ker_basis(), module.sp_basis()],
        );

        let mut columns: Vec<FpVector> = Vec::new();
        for &i in &reduction.block_pivots[0] {
            columns.push(known[i].1.clone());
        }
        for _ in &reduction.block_pivots[1] {
            columns.push(FpVector::new(p, target_dim));
        }
        for &i in &reduction.block_pivots[2] {
            let image = self.ask_oracle(ss, bidegree, target, target_dim, &module.sp_basis()[i])?;
            columns.push(image);
        }

        // Convert from the ad hoc pivot basis back to standard coordinates:
        // column c of the result is Σ_k columns[k] · transform[k][c].
        let mut result = Matrix::new(p, target_dim, domain_dim);
        let transform = &reduction.transform;
        for c in 0..domain_dim {
            let mut column = FpVector::new(p, target_dim);
            for (k, col) in columns.iter().enumerate() {
                let coeff = transform[k].entry(c);
                if coeff != 0 {
                    column.add(col, coeff);
                }
            }
            for r in 0..target_dim {
                let entry = column.entry(r);
                if entry != 0 {
                    result.row_mut(r).set_entry(c, entry);
                }
            }
        }
        Ok(result)
    }

    /// One multiplicative extension: the product element `∏ eᵢ^{nᵢ}` and its
    /// image under the graded Leibniz rule. Products that resolve to zero
    /// carry no information and are discarded.
    fn extend(
        &self,
        ss: &SpectralSequence,
        target_dim: usize,
        extendable: &[&(HomoElem, HomoElem)],
        combo: &[u32],
    ) -> Result<Option<(FpVector, FpVector)>> {
        let p = ss.prime();
        let ring = ss.ring();

        let mut product = ring.one();
        for (i, &n) in combo.iter().enumerate() {
            if n > 0 {
                product = product.mul(&extendable[i].0.poly().expect("non-zero element").pow(n));
            }
        }
        let product = HomoElem::from_poly(ss, self.page, product)?;
        if product.is_zero() {
            return Ok(None);
        }

        // d(∏ eᵢ^{nᵢ}) = Σᵢ nᵢ·eᵢ^{nᵢ-1}·d(eᵢ)·∏_{j≠i} eⱼ^{nⱼ}
        let mut image = ring.zero();
        for (i, &n) in combo.iter().enumerate() {
            if n == 0 {
                continue;
            }
            let Some(d_poly) = extendable[i].1.poly() else {
                continue;
            };
            let mut term = d_poly.scale(n % *p);
            term = term.mul(&extendable[i].0.poly().expect("non-zero element").pow(n - 1));
            for (j, &m) in combo.iter().enumerate() {
                if j != i && m > 0 {
                    term = term.mul(&extendable[j].0.poly().expect("non-zero element").pow(m));
                }
            }
            image = image.add(&term);
        }
        let image = HomoElem::from_poly(ss, self.page, image)?;
        tracing::debug!(
            page = self.page,
            product = %product.render(ring),
            image = %image.render(ring),
            "multiplicative extension"
        );
        Ok(Some((
            product.coordinate().expect("non-zero element").clone(),
            self.image_coordinate(p, target_dim, &image),
        )))
    }

    fn image_coordinate(
        &self,
        p: fp::ValidPrime,
        target_dim: usize,
        image: &HomoElem,
    ) -> FpVector {
        match image.coordinate() {
            Some(v) => v.clone(),
            None => FpVector::new(p, target_dim),
        }
    }

    fn ask_oracle(
        &self,
        ss: &SpectralSequence,
        bidegree: Bidegree,
        target: Bidegree,
        target_dim: usize,
        vector: &FpVector,
    ) -> Result<FpVector> {
        let element = HomoElem::from_coordinate(ss, self.page, bidegree, vector.clone())?;
        let rendered = element.render(ss.ring());
        let mut prior_error: Option<String> = None;
        loop {
            let request = OracleRequest {
                page: self.page,
                element: &rendered,
                source: bidegree,
                target,
                prior_error: prior_error.as_deref(),
            };
            let answer = ss.oracle().differential_image(&request).map_err(|e| {
                Error::UnknownDifferential {
                    page: self.page,
                    element: rendered.clone(),
                    bidegree,
                    reason: e.reason,
                }
            })?;
            match self.resolve_answer(ss, target, target_dim, &answer) {
                Ok(image) => {
                    tracing::debug!(
                        page = self.page,
                        element = %rendered,
                        answer = %answer,
                        "oracle supplied differential image"
                    );
                    return Ok(image);
                }
                Err(e) if ss.oracle().retryable() => {
                    tracing::warn!(
                        page = self.page,
                        element = %rendered,
                        error = %e,
                        "oracle answer rejected, re-asking"
                    );
                    prior_error = Some(e.to_string());
                }
                // A non-interactive oracle cannot be re-asked: a rejected
                // answer is an unknown differential to the caller.
                Err(e) => {
                    return Err(Error::UnknownDifferential {
                        page: self.page,
                        element: rendered,
                        bidegree,
                        reason: format!("oracle answer rejected: {e}"),
                    });
                }
            }
        }
    }

    fn resolve_answer(
        &self,
        ss: &SpectralSequence,
        target: Bidegree,
        target_dim: usize,
        answer: &str,
    ) -> Result<FpVector> {
        let poly = ss.ring().parse(answer).map_err(Error::parse)?;
        let image = HomoElem::from_poly(ss, self.page, poly)?;
        match image.bidegree() {
            None => Ok(FpVector::new(ss.prime(), target_dim)),
            Some(b) if b == target => Ok(image.coordinate().expect("non-zero element").clone()),
            Some(found) => Err(Error::KnowledgeMismatch {
                page: self.page,
                expected: target,
                found,
            }),
        }
    }
}
