//! One stage `E_n` of the spectral sequence: a lazily-computed collection of
//! modules indexed by bidegree, together with the differential acting on it.

use dashmap::DashMap;
use std::sync::Arc;

use fp::matrix::Matrix;
use fp::vector::FpVector;

use crate::bidegree::Bidegree;
use crate::differential::Differential;
use crate::module::Module;
use crate::sseq::{PageNum, SpectralSequence};
use crate::Result;

pub struct Page {
    number: PageNum,
    differential: Differential,
    modules: DashMap<Bidegree, Arc<Module>>,
}

impl Page {
    pub(crate) fn new(number: PageNum, shift: Bidegree) -> Self {
        Self {
            number,
            differential: Differential::new(number, shift),
            modules: DashMap::new(),
        }
    }

    pub fn number(&self) -> PageNum {
        self.number
    }

    pub fn differential(&self) -> &Differential {
        &self.differential
    }

    pub(crate) fn differential_mut(&mut self) -> &mut Differential {
        &mut self.differential
    }

    /// The module at a bidegree, computed on demand and memoized. Entries are
    /// only cached after successful computation.
    pub fn module(&self, ss: &SpectralSequence, bidegree: Bidegree) -> Result<Arc<Module>> {
        if let Some(module) = self.modules.get(&bidegree) {
            return Ok(Arc::clone(&module));
        }
        let module = Arc::new(self.compute_module(ss, bidegree)?);
        self.modules.insert(bidegree, Arc::clone(&module));
        Ok(module)
    }

    /// Page 1 reduces the full standard basis by the relation-derived kernel.
    /// A later page is the homology of its predecessor: its spanning set is
    /// the nullspace of the previous differential at this bidegree, and its
    /// kernel adjoins the image of that differential from the preimage
    /// bidegree to what the previous page already knew to be zero.
    fn compute_module(&self, ss: &SpectralSequence, bidegree: Bidegree) -> Result<Module> {
        let p = ss.prime();
        let abs_dim = ss.abs_dimension(bidegree)?;

        if self.number == 1 {
            let basis: Vec<FpVector> = (0..abs_dim)
                .map(|i| {
                    let mut v = FpVector::new(p, abs_dim);
                    v.set_entry(i, 1);
                    v
                })
                .collect();
            let kernel = ss.relation_kernel(bidegree)?;
            return Module::new(p, bidegree, &basis, &kernel, abs_dim);
        }

        let previous = ss.page(self.number - 1);
        let previous_module = previous.module(ss, bidegree)?;
        let outgoing: Arc<Matrix> = previous.differential().matrix(ss, bidegree)?;

        // The basis is the kernel of the outgoing differential, intersected
        // with the span of the previous page's module: the full matrix is
        // zero on directions outside that span, and those must not reappear.
        let mut rows: Vec<FpVector> = outgoing.iter().cloned().collect();
        rows.extend(previous_module.invalid_detectors());
        let basis = Matrix::from_rows(p, rows, abs_dim).null_space();

        let preimage = bidegree - previous.differential().shift();
        let incoming = previous.differential().matrix(ss, preimage)?;
        let mut kernel = incoming.column_space();
        kernel.extend(previous_module.ker_basis().iter().cloned());

        Module::new(p, bidegree, &basis, &kernel, abs_dim)
    }

    /// The bidegrees whose modules have been computed so far, in
    /// lexicographic order. Chart-style consumers iterate this.
    pub fn computed_bidegrees(&self) -> Vec<Bidegree> {
        let mut degrees: Vec<Bidegree> = self.modules.iter().map(|entry| *entry.key()).collect();
        degrees.sort();
        degrees
    }
}
