//! End-to-end scenarios: page progression, homology, and the element
//! surface, on examples small enough to check by hand.

use fp::prime::ValidPrime;
use rstest::rstest;
use specseq::oracle::ScriptedOracle;
use specseq::{Bidegree, Error, HomoElem, SpectralSequence};
use std::sync::Arc;

/// Generators `a` at (3, 0) and `t` at (0, 2) over GF(3), with `a² = 0` and
/// the differential on page `n` of bidegree `(n, 1 - n)`.
fn gf3_example() -> SpectralSequence {
    let mut ss = SpectralSequence::new(
        ValidPrime::new(3),
        &["a", "t"],
        &[Bidegree::new(3, 0), Bidegree::new(0, 2)],
        [[1, 0], [-1, 1]],
    )
    .unwrap();
    ss.kill(&["a^2"]).unwrap();
    ss
}

/// The same algebra, but with every differential shift scaled so that the
/// first page already carries `d(t) = a` (shift `(3n, -2n)`).
fn gf3_first_page_differential() -> SpectralSequence {
    let mut ss = SpectralSequence::new(
        ValidPrime::new(3),
        &["a", "t"],
        &[Bidegree::new(3, 0), Bidegree::new(0, 2)],
        [[3, 0], [-2, 0]],
    )
    .unwrap();
    ss.kill(&["a^2"]).unwrap();
    ss.add_page(&[("t", "a")]).unwrap();
    ss
}

#[test]
fn test_page_one_modules() {
    let mut ss = gf3_example();
    ss.add_page(&[("a", "0"), ("t", "0")]).unwrap();

    let m = ss.module(1, Bidegree::new(0, 6)).unwrap();
    assert_eq!(m.abs_dim(), 1);
    assert_eq!(m.dim(), 1);
    assert!(m.ker_basis().is_empty());

    // a^2 t is killed by the relation.
    let killed = ss.module(1, Bidegree::new(6, 2)).unwrap();
    assert_eq!(killed.abs_dim(), 1);
    assert_eq!(killed.dim(), 0);
    assert_eq!(killed.ker_basis().len(), 1);
}

/// `d(t) = a` with `a² = 0`: everything in low degrees dies on page 2, and
/// the dimensions match a hand computation of ker/im.
#[rstest]
#[case(Bidegree::new(0, 2), 1, 0)] // t supports d(t) = a
#[case(Bidegree::new(3, 0), 1, 0)] // a is hit by d(t)
#[case(Bidegree::new(0, 4), 1, 0)] // t² maps to 2at ≠ 0
#[case(Bidegree::new(3, 2), 1, 0)] // at is hit by d(t²)
#[case(Bidegree::new(6, 2), 1, 0)] // a²t was already zero on page 1
fn test_homology_two_pages(
    #[case] bidegree: Bidegree,
    #[case] abs_dim: usize,
    #[case] dim: usize,
) {
    let mut ss = gf3_first_page_differential();
    // d_1(a·t) and d_1(a·t²) are not derivable: a is not in the knowledge
    // list. The first answer, a², resolves to zero through the relation.
    ss.set_oracle(Box::new(ScriptedOracle::new([
        (1, "a*t", "a^2"),
        (1, "a*t^2", "0"),
    ])));
    ss.add_page(&[]).unwrap();

    let m = ss.module(2, bidegree).unwrap();
    assert_eq!(m.abs_dim(), abs_dim);
    assert_eq!(m.dim(), dim, "wrong dimension at {bidegree}");
}

/// The Leibniz rule in characteristic 3: d(t³) = 3t²·a = 0, so t³ survives
/// to page 4 even though t itself dies.
#[test]
fn test_four_pages() {
    let mut ss = gf3_example();
    ss.add_page(&[("a", "0"), ("t", "0")]).unwrap();
    ss.add_page(&[("a", "0"), ("t", "0")]).unwrap();
    ss.add_page(&[("t", "a")]).unwrap();
    let p4 = ss.add_page(&[]).unwrap();

    let m = ss.module(p4, Bidegree::new(0, 6)).unwrap();
    assert_eq!(m.abs_dim(), 1);
    assert_eq!(m.dim(), 1);
    assert!(m.ker_basis().is_empty());

    // The survivor is t³.
    let class = HomoElem::from_coordinate(
        &ss,
        p4,
        Bidegree::new(0, 6),
        m.sp_basis()[0].clone(),
    )
    .unwrap();
    assert_eq!(class.render(ss.ring()), "t^3");

    // t itself dies on page 4: d_3(t) = a.
    assert_eq!(ss.module(p4, Bidegree::new(0, 2)).unwrap().dim(), 0);
    // And a is killed as the image of t.
    assert_eq!(ss.module(p4, Bidegree::new(3, 0)).unwrap().dim(), 0);
}

#[test]
fn test_char_97_absolute_basis() {
    let mut ss = SpectralSequence::new(
        ValidPrime::new(97),
        &["x", "y", "z"],
        &[Bidegree::new(7, 1), Bidegree::new(3, 0), Bidegree::new(0, 2)],
        [[1, 0], [-1, 1]],
    )
    .unwrap();
    ss.kill(&["x^2", "y^4", "z^2"]).unwrap();
    ss.add_page(&[]).unwrap();

    // The only monomial at (7, 3) is x·z.
    assert_eq!(
        *ss.abs_basis(Bidegree::new(7, 3)).unwrap(),
        vec![vec![1, 0, 1]]
    );
    let m = ss.module(1, Bidegree::new(7, 3)).unwrap();
    assert_eq!(m.abs_dim(), 1);
    assert_eq!(m.dim(), 1);

    // z² is a relation: the module at (0, 4) is killed outright.
    assert_eq!(ss.module(1, Bidegree::new(0, 4)).unwrap().dim(), 0);
    // y² at (6, 0) is untouched.
    assert_eq!(ss.module(1, Bidegree::new(6, 0)).unwrap().dim(), 1);
}

#[test]
fn test_element_roundtrip() {
    let mut ss = gf3_example();
    ss.add_page(&[]).unwrap();

    let e = ss.element(1, "2*t^2").unwrap();
    let rebuilt = HomoElem::from_poly(&ss, 1, e.poly().unwrap().clone()).unwrap();
    assert_eq!(e.bidegree(), rebuilt.bidegree());
    assert_eq!(e.coordinate(), rebuilt.coordinate());

    // A killed element collapses to the canonical zero.
    let killed = ss.element(1, "a^2*t").unwrap();
    assert!(killed.is_zero());
    assert_eq!(killed.bidegree(), None);
}

#[test]
fn test_element_errors() {
    let mut ss = gf3_example();
    ss.add_page(&[]).unwrap();

    assert!(matches!(
        ss.element(1, "a + t"),
        Err(Error::NotHomogeneous { .. })
    ));
    assert!(matches!(ss.element(1, "b"), Err(Error::Parse(_))));
    // The unit has no standard basis at the origin.
    assert!(ss.element(1, "1").is_err());
}

#[test]
fn test_multiplication_associative_up_to_kernel() {
    let mut ss = gf3_example();
    ss.add_page(&[]).unwrap();

    let a = ss.element(1, "a").unwrap();
    let t = ss.element(1, "t").unwrap();

    let left = a.mul(&ss, &t).unwrap().mul(&ss, &t).unwrap();
    let right = a.mul(&ss, &t.mul(&ss, &t).unwrap()).unwrap();
    assert!(left.equals(&ss, &right).unwrap());

    // (a·a)·t and a·(a·t) both vanish through the relation.
    let left = a.mul(&ss, &a).unwrap().mul(&ss, &t).unwrap();
    let right = a.mul(&ss, &a.mul(&ss, &t).unwrap()).unwrap();
    assert!(left.is_zero() && right.is_zero());

    // Commutativity.
    let at = a.mul(&ss, &t).unwrap();
    let ta = t.mul(&ss, &a).unwrap();
    assert!(at.equals(&ss, &ta).unwrap());
}

#[test]
fn test_knowledge_mismatch() {
    let mut ss = gf3_example();
    // d_1 has bidegree (1, 0); t → t is off by (1, 0) - (0, 0).
    assert!(matches!(
        ss.add_page(&[("t", "t")]),
        Err(Error::KnowledgeMismatch { .. })
    ));
    // The failed page must not have been appended.
    assert_eq!(ss.num_pages(), 0);
}

#[test]
fn test_computed_bidegrees() {
    let mut ss = gf3_example();
    ss.add_page(&[]).unwrap();
    ss.module(1, Bidegree::new(0, 4)).unwrap();
    ss.module(1, Bidegree::new(0, 2)).unwrap();
    ss.module(1, Bidegree::new(3, 2)).unwrap();
    assert_eq!(
        ss.page(1).computed_bidegrees(),
        vec![
            Bidegree::new(0, 2),
            Bidegree::new(0, 4),
            Bidegree::new(3, 2)
        ]
    );
}

/// Matrices are cached per bidegree: repeated queries return identical
/// matrices and never go back to the oracle.
#[test]
fn test_matrix_caching() {
    let mut ss = gf3_first_page_differential();
    let oracle = Arc::new(ScriptedOracle::new([(1, "a*t", "0")]));
    ss.set_oracle(Box::new(Arc::clone(&oracle)));

    let first = ss.differential_matrix(1, Bidegree::new(3, 2)).unwrap();
    assert_eq!(oracle.calls(), 1);
    let second = ss.differential_matrix(1, Bidegree::new(3, 2)).unwrap();
    assert_eq!(oracle.calls(), 1);
    assert_eq!(*first, *second);
}
