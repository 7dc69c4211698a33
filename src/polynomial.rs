//! Polynomials in the generator ring, and the grammar-constrained expression
//! parser used for relations, differential knowledge, and oracle answers.
//!
//! The parser accepts sums of signed terms, each a `*`-separated product of
//! non-negative integer coefficients, generator names, generator powers
//! (`a^2` or `a**2`), and parenthesized subexpressions. Input is never
//! evaluated as code.

use std::fmt;

use anyhow::{anyhow, Context};
use itertools::Itertools;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric0, char, digit1 as digit, space0},
    combinator::{map, map_res, opt, peek},
    error::{ParseError, VerboseError, VerboseErrorKind},
    sequence::{delimited, pair, preceded},
    IResult as IResultBase, Parser,
};
use rustc_hash::FxHashMap;

use fp::prime::ValidPrime;

type IResult<I, O> = IResultBase<I, O, VerboseError<I>>;

/// Exponent vector of a monomial, one entry per generator.
pub type Exponents = Vec<u32>;

/// A polynomial over `F_p` in a fixed number of generators, stored as a map
/// from exponent vectors to non-zero coefficients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polynomial {
    p: ValidPrime,
    num_gens: usize,
    terms: FxHashMap<Exponents, u32>,
}

impl Polynomial {
    fn new(p: ValidPrime, num_gens: usize) -> Self {
        Self {
            p,
            num_gens,
            terms: FxHashMap::default(),
        }
    }

    pub fn prime(&self) -> ValidPrime {
        self.p
    }

    pub fn num_gens(&self) -> usize {
        self.num_gens
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Exponents, u32)> {
        self.terms.iter().map(|(e, &c)| (e, c))
    }

    /// Terms in a deterministic order (descending lexicographic exponents).
    pub fn sorted_terms(&self) -> Vec<(&Exponents, u32)> {
        let mut terms: Vec<_> = self.terms().collect();
        terms.sort_by(|a, b| b.0.cmp(a.0));
        terms
    }

    fn add_term(&mut self, exps: Exponents, coeff: u64) {
        debug_assert_eq!(exps.len(), self.num_gens);
        let p = *self.p as u64;
        let add = coeff % p;
        if add == 0 {
            return;
        }
        let current = self.terms.get(&exps).copied().unwrap_or(0) as u64;
        let sum = ((current + add) % p) as u32;
        // Zero terms are never stored, so is_zero stays a map emptiness check.
        if sum == 0 {
            self.terms.remove(&exps);
        } else {
            self.terms.insert(exps, sum);
        }
    }

    pub fn add(&self, other: &Polynomial) -> Polynomial {
        let mut result = self.clone();
        for (exps, c) in other.terms() {
            result.add_term(exps.clone(), c as u64);
        }
        result
    }

    pub fn sub(&self, other: &Polynomial) -> Polynomial {
        self.add(&other.scale(*self.p - 1))
    }

    pub fn scale(&self, c: u32) -> Polynomial {
        let mut result = Polynomial::new(self.p, self.num_gens);
        for (exps, coeff) in self.terms() {
            result.add_term(exps.clone(), coeff as u64 * c as u64);
        }
        result
    }

    pub fn mul(&self, other: &Polynomial) -> Polynomial {
        let mut result = Polynomial::new(self.p, self.num_gens);
        for (ea, ca) in self.terms() {
            for (eb, cb) in other.terms() {
                let exps: Exponents = ea.iter().zip(eb).map(|(a, b)| a + b).collect();
                result.add_term(exps, ca as u64 * cb as u64);
            }
        }
        result
    }

    pub fn pow(&self, exp: u32) -> Polynomial {
        let mut result = Polynomial::constant(self.p, self.num_gens, 1);
        for _ in 0..exp {
            result = result.mul(self);
        }
        result
    }

    pub fn constant(p: ValidPrime, num_gens: usize, c: u32) -> Polynomial {
        let mut result = Polynomial::new(p, num_gens);
        result.add_term(vec![0; num_gens], c as u64);
        result
    }

    pub fn monomial(p: ValidPrime, exps: Exponents) -> Polynomial {
        let num_gens = exps.len();
        let mut result = Polynomial::new(p, num_gens);
        result.add_term(exps, 1);
        result
    }
}

/// The generator ring: a prime together with the ordered generator names.
/// Knows how to parse and render [`Polynomial`]s.
#[derive(Debug, Clone)]
pub struct PolyRing {
    p: ValidPrime,
    names: Vec<String>,
}

impl PolyRing {
    pub fn new(p: ValidPrime, names: Vec<String>) -> Self {
        Self { p, names }
    }

    pub fn prime(&self) -> ValidPrime {
        self.p
    }

    pub fn num_gens(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn zero(&self) -> Polynomial {
        Polynomial::new(self.p, self.num_gens())
    }

    pub fn one(&self) -> Polynomial {
        Polynomial::constant(self.p, self.num_gens(), 1)
    }

    pub fn monomial(&self, exps: Exponents) -> Polynomial {
        debug_assert_eq!(exps.len(), self.num_gens());
        Polynomial::monomial(self.p, exps)
    }

    pub fn generator(&self, index: usize) -> Polynomial {
        let mut exps = vec![0; self.num_gens()];
        exps[index] = 1;
        Polynomial::monomial(self.p, exps)
    }

    pub fn parse(&self, input: &str) -> anyhow::Result<Polynomial> {
        let (rest, poly) = self
            .expr(input)
            .map_err(convert_error(input))
            .with_context(|| format!("Error when parsing polynomial string {input:?}"))?;
        if rest.is_empty() {
            Ok(poly)
        } else {
            Err(anyhow!("Failed to consume all of input. Remaining: '{rest}'"))
        }
    }

    pub fn format(&self, poly: &Polynomial) -> String {
        if poly.is_zero() {
            return "0".to_string();
        }
        poly.sorted_terms()
            .iter()
            .map(|(exps, c)| {
                let gens = exps
                    .iter()
                    .enumerate()
                    .filter(|&(_, &e)| e > 0)
                    .map(|(i, &e)| {
                        if e == 1 {
                            self.names[i].clone()
                        } else {
                            format!("{}^{}", self.names[i], e)
                        }
                    })
                    .join("*");
                if gens.is_empty() {
                    c.to_string()
                } else if *c == 1 {
                    gens
                } else {
                    format!("{c}*{gens}")
                }
            })
            .join(" + ")
    }

    fn expr<'a>(&self, i: &'a str) -> IResult<&'a str, Polynomial> {
        fold_separated(
            peek(alt((char('+'), char('-')))),
            space(|i| self.term(i)),
            |a, b| a.add(&b),
        )(i)
    }

    fn term<'a>(&self, i: &'a str) -> IResult<&'a str, Polynomial> {
        let (i, sign) = opt(alt((char('+'), char('-'))))(i)?;
        let (i, res) = fold_separated(char('*'), |i| self.factor(i), |a, b| a.mul(&b))(i)?;
        let res = if let Some('-') = sign {
            res.scale(*self.p - 1)
        } else {
            res
        };
        Ok((i, res))
    }

    fn factor<'a>(&self, i: &'a str) -> IResult<&'a str, Polynomial> {
        space(alt((
            map(digits, |c: u32| {
                Polynomial::constant(self.p, self.num_gens(), c)
            }),
            |i| self.generator_power(i),
            brackets(|i| self.expr(i)),
        )))(i)
    }

    fn generator_power<'a>(&self, i: &'a str) -> IResult<&'a str, Polynomial> {
        let (rest, (name, exp)) = pair(
            |i| self.generator_name(i),
            opt(preceded(alt((tag("**"), tag("^"))), digits)),
        )(i)?;
        let mut exps = vec![0; self.num_gens()];
        exps[name] = exp.unwrap_or(1);
        Ok((rest, Polynomial::monomial(self.p, exps)))
    }

    fn generator_name<'a>(&self, i: &'a str) -> IResult<&'a str, usize> {
        let (rest, (a, b)) = pair(alpha1, alphanumeric0)(i)?;
        let name = format!("{a}{b}");
        match self.names.iter().position(|n| *n == name) {
            Some(idx) => Ok((rest, idx)),
            None => Err(nom::Err::Failure(VerboseError {
                errors: vec![(
                    &i[0..name.len()],
                    VerboseErrorKind::Context("Unknown generator name"),
                )],
            })),
        }
    }
}

/// Pad both ends with whitespace
fn space<'a, O, E: ParseError<&'a str>, F: Parser<&'a str, O, E>>(
    f: F,
) -> impl FnMut(&'a str) -> IResultBase<&'a str, O, E> {
    delimited(space0, f, space0)
}

/// Surround with brackets
fn brackets<'a, O, E: ParseError<&'a str>, F: Parser<&'a str, O, E>>(
    f: F,
) -> impl FnMut(&'a str) -> IResultBase<&'a str, O, E> {
    delimited(char('('), f, char(')'))
}

fn digits<T: std::str::FromStr>(i: &str) -> IResult<&str, T> {
    map_res(space(digit), std::str::FromStr::from_str)(i)
}

fn fold_separated<I: Clone, OS, O, E>(
    mut sep: impl Parser<I, OS, E>,
    mut f: impl Parser<I, O, E>,
    acc: impl Fn(O, O) -> O,
) -> impl FnMut(I) -> IResultBase<I, O, E> {
    move |i: I| {
        let (mut i, mut res) = f.parse(i)?;
        loop {
            match sep.parse(i.clone()) {
                Err(nom::Err::Error(_)) => return Ok((i, res)),
                Err(e) => return Err(e),
                Ok((i1, _)) => match f.parse(i1.clone()) {
                    Err(nom::Err::Error(_)) => return Ok((i, res)),
                    Err(e) => return Err(e),
                    Ok((i2, o)) => {
                        i = i2;
                        res = acc(res, o);
                    }
                },
            }
        }
    }
}

fn convert_error(i: &str) -> impl FnOnce(nom::Err<VerboseError<&str>>) -> anyhow::Error + '_ {
    move |err| {
        anyhow!(match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => nom::error::convert_error(i, e),
            _ => format!("{err:#}"),
        })
    }
}

impl fmt::Display for Polynomial {
    /// Debug-ish rendering without generator names; use [`PolyRing::format`]
    /// for the named form.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        let terms = self
            .sorted_terms()
            .iter()
            .map(|(e, c)| format!("{c}*x{e:?}"))
            .join(" + ");
        write!(f, "{terms}")
    }
}
