//! Utilities used in tests in multiple crates within the workspace.

mod pdf;

use std::{fmt::Debug, marker::PhantomData};

use googletest::{
    description::Description,
    matcher::{Matcher, MatcherBase, MatcherResult},
};

pub use pdf::{A4, LETTER, ShownText, blank_pdf, certificate_pdf, pageless_pdf, shown_text};

/// Creates a matcher against an `anyhow::Error` that downcasts to `E`, projects it with
/// `project` (typically to an error kind), and matches the projection with `inner`.
pub fn anyhow_downcasts_to<E, F, M>(project: F, inner: M) -> AnyhowDowncastTo<E, F, M> {
    AnyhowDowncastTo::<E, F, M> {
        project,
        inner,
        phantom_e: Default::default(),
    }
}

pub struct AnyhowDowncastTo<E, F, M> {
    project: F,
    inner: M,
    phantom_e: PhantomData<E>,
}

impl<E, F, M> AnyhowDowncastTo<E, F, M> {
    fn type_name() -> &'static str {
        std::any::type_name::<E>()
    }
}

impl<E, F, M> MatcherBase for AnyhowDowncastTo<E, F, M> {}

impl<E, F, K, M> Matcher<&anyhow::Error> for AnyhowDowncastTo<E, F, M>
where
    E: std::fmt::Display + Debug + Send + Sync + 'static,
    F: Fn(&E) -> K,
    K: Copy + Debug,
    M: Matcher<K>,
{
    fn matches(&self, actual: &anyhow::Error) -> MatcherResult {
        actual
            .downcast_ref::<E>()
            .map(|e| self.inner.matches((self.project)(e)))
            .unwrap_or(MatcherResult::NoMatch)
    }

    fn explain_match(&self, actual: &anyhow::Error) -> Description {
        match actual.downcast_ref::<E>() {
            Some(e) => Description::new()
                .text(format!(
                    "which is of the expected concrete error type {}",
                    Self::type_name()
                ))
                .text("with projected value")
                .nested(self.inner.explain_match((self.project)(e))),
            None => Description::new().text(format!(
                "which is not the expected concrete error type {}",
                Self::type_name()
            )),
        }
    }

    fn describe(&self, matcher_result: MatcherResult) -> Description {
        match matcher_result {
            MatcherResult::Match => format!(
                "is of concrete error type {} with projected value which {}",
                Self::type_name(),
                self.inner.describe(MatcherResult::Match)
            )
            .into(),
            MatcherResult::NoMatch => format!(
                "is not of concrete error type {} with projected value which {}",
                Self::type_name(),
                self.inner.describe(MatcherResult::Match)
            )
            .into(),
        }
    }
}
