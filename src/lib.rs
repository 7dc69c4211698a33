//! Compute the pages of an algebraic spectral sequence over a prime field.
//!
//! The engine is built from generators with assigned bidegrees, polynomial
//! relations declared zero on page 1, and partially-known differentials.
//! Each page's modules are computed lazily per bidegree: page 1 from the
//! relation-generated kernel, page n+1 as the homology of page n's
//! differential, whose matrix is in turn assembled from direct knowledge,
//! multiplicative (Leibniz) extension, and — as a last resort — an external
//! [`oracle::Oracle`].

#![warn(clippy::use_self)]

pub mod bidegree;
pub mod combinatorics;
pub mod differential;
pub mod element;
pub mod module;
pub mod oracle;
pub mod page;
pub mod polynomial;
pub mod sseq;
pub mod utils;

pub use bidegree::Bidegree;
pub use element::HomoElem;
pub use module::{Classification, Module};
pub use sseq::{PageNum, SpectralSequence};

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong in the engine. Construction-time misuses
/// (inconsistent relations, malformed generator data) are distinguished from
/// normal-but-unanswerable situations (an oracle with no answer).
#[derive(Debug)]
pub enum Error {
    /// The declared kernel is not contained in the declared spanning set:
    /// the caller supplied inconsistent relation or differential data.
    KernelNotInSpan { bidegree: Bidegree },
    /// A polynomial mixes monomials of more than one bidegree.
    NotHomogeneous {
        expr: String,
        first: Bidegree,
        second: Bidegree,
    },
    /// The element is outside the span of the page's module: it does not
    /// exist on this page.
    NonexistentElement {
        expr: String,
        bidegree: Bidegree,
        page: PageNum,
    },
    /// A monomial's bidegree admits no standard basis (e.g. the unit at the
    /// origin), so the polynomial is not representable.
    NotInBasis { monomial: String, bidegree: Bidegree },
    /// The conic system is unbounded or ambiguous; an empty solution set is
    /// a normal outcome and is *not* reported through this variant.
    IllPosed(String),
    /// A differential image was needed but no oracle could supply it.
    UnknownDifferential {
        page: PageNum,
        element: String,
        bidegree: Bidegree,
        reason: String,
    },
    /// Differential knowledge whose image sits at the wrong bidegree.
    KnowledgeMismatch {
        page: PageNum,
        expected: Bidegree,
        found: Bidegree,
    },
    /// `kill` was called after a page had been added.
    RelationsFrozen,
    /// A malformed expression (relation, knowledge, or oracle answer).
    Parse(String),
    /// Invalid constructor input.
    Config(String),
}

impl Error {
    pub(crate) fn parse(e: anyhow::Error) -> Self {
        Self::Parse(format!("{e:#}"))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KernelNotInSpan { bidegree } => {
                write!(f, "the kernel at {bidegree} is not contained in the span")
            }
            Self::NotHomogeneous {
                expr,
                first,
                second,
            } => write!(
                f,
                "polynomial {expr} is not homogeneous: it has terms at both {first} and {second}"
            ),
            Self::NonexistentElement {
                expr,
                bidegree,
                page,
            } => write!(
                f,
                "element {expr} (bidegree {bidegree}) does not exist on page {page}"
            ),
            Self::NotInBasis { monomial, bidegree } => write!(
                f,
                "monomial {monomial} is not in the standard basis at {bidegree}"
            ),
            Self::IllPosed(detail) => write!(f, "ill-posed conic system: {detail}"),
            Self::UnknownDifferential {
                page,
                element,
                bidegree,
                reason,
            } => write!(
                f,
                "d_{page}( {element} ) at {bidegree} is unknown: {reason}"
            ),
            Self::KnowledgeMismatch {
                page,
                expected,
                found,
            } => write!(
                f,
                "differential image on page {page} has bidegree {found}, expected {expected}"
            ),
            Self::RelationsFrozen => {
                write!(f, "relations must be declared before any page is added")
            }
            Self::Parse(detail) => write!(f, "{detail}"),
            Self::Config(detail) => write!(f, "{detail}"),
        }
    }
}

impl std::error::Error for Error {}
