//! The external source for differential images that cannot be derived from
//! known data or multiplicative extension.
//!
//! Answers are plain expression strings in the generator ring; the engine
//! parses and validates them through the same grammar-constrained parser used
//! everywhere else. A retryable oracle (a human at a terminal) is re-asked on
//! a malformed answer; a non-retryable one surfaces a typed
//! `UnknownDifferential` error instead.

use std::cell::Cell;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::bidegree::Bidegree;
use crate::sseq::PageNum;

/// Context for one oracle question: the image of `d_{page}(element)` is
/// wanted, where `element` sits at `source` and the answer must live at
/// `target` (or be zero).
pub struct OracleRequest<'a> {
    pub page: PageNum,
    pub element: &'a str,
    pub source: Bidegree,
    pub target: Bidegree,
    /// Why the previous answer was rejected, when re-asking.
    pub prior_error: Option<&'a str>,
}

/// The reason an oracle could not produce an answer at all.
#[derive(Debug)]
pub struct OracleUnavailable {
    pub reason: String,
}

pub trait Oracle {
    /// Produce an expression string for the requested differential image.
    fn differential_image(
        &self,
        request: &OracleRequest,
    ) -> std::result::Result<String, OracleUnavailable>;

    /// Whether a rejected answer should lead to a re-ask rather than an
    /// error. Interactive oracles return `true`.
    fn retryable(&self) -> bool {
        false
    }
}

impl<O: Oracle + ?Sized> Oracle for Arc<O> {
    fn differential_image(
        &self,
        request: &OracleRequest,
    ) -> std::result::Result<String, OracleUnavailable> {
        (**self).differential_image(request)
    }

    fn retryable(&self) -> bool {
        (**self).retryable()
    }
}

/// The default oracle: every question is unanswerable. Differentials must be
/// fully determined by knowledge and multiplicative extension.
#[derive(Default)]
pub struct NoOracle;

impl Oracle for NoOracle {
    fn differential_image(
        &self,
        _request: &OracleRequest,
    ) -> std::result::Result<String, OracleUnavailable> {
        Err(OracleUnavailable {
            reason: "no oracle configured".to_string(),
        })
    }
}

/// Ask on stdin.
#[derive(Default)]
pub struct StdinOracle;

impl Oracle for StdinOracle {
    fn differential_image(
        &self,
        request: &OracleRequest,
    ) -> std::result::Result<String, OracleUnavailable> {
        if let Some(err) = request.prior_error {
            eprintln!("Invalid answer: {err}");
        }
        let prompt = format!(
            "Please input d_{}( {} ), mapping {} to {}",
            request.page, request.element, request.source, request.target
        );
        Ok(query::raw(&prompt, |answer| Ok(answer.to_string())))
    }

    fn retryable(&self) -> bool {
        true
    }
}

/// Fixture-backed oracle for tests and non-interactive runs: answers are
/// keyed by (page, rendered element).
#[derive(Default)]
pub struct ScriptedOracle {
    answers: FxHashMap<(PageNum, String), String>,
    calls: Cell<usize>,
}

impl ScriptedOracle {
    pub fn new<'a>(entries: impl IntoIterator<Item = (PageNum, &'a str, &'a str)>) -> Self {
        let answers = entries
            .into_iter()
            .map(|(page, element, answer)| ((page, element.to_string()), answer.to_string()))
            .collect();
        Self {
            answers,
            calls: Cell::new(0),
        }
    }

    /// How many questions have been asked so far. Used to check that matrix
    /// memoization never re-asks.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Oracle for ScriptedOracle {
    fn differential_image(
        &self,
        request: &OracleRequest,
    ) -> std::result::Result<String, OracleUnavailable> {
        self.calls.set(self.calls.get() + 1);
        self.answers
            .get(&(request.page, request.element.to_string()))
            .cloned()
            .ok_or_else(|| OracleUnavailable {
                reason: format!(
                    "no scripted answer for d_{}( {} )",
                    request.page, request.element
                ),
            })
    }
}
