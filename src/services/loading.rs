use std::time::Instant;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tracing::debug;

/// Collects the requests one screen issues on mount and resolves once every
/// one of them has settled, successful or not.
pub struct LoadBarrier<'a, T, E> {
    screen: &'static str,
    pending: Vec<(&'static str, BoxFuture<'a, Result<T, E>>)>,
}

impl<'a, T, E> LoadBarrier<'a, T, E> {
    pub fn new(screen: &'static str) -> Self {
        Self {
            screen,
            pending: Vec::new(),
        }
    }

    pub fn add<F>(mut self, name: &'static str, future: F) -> Self
    where
        F: std::future::Future<Output = Result<T, E>> + Send + 'a,
    {
        self.pending.push((name, future.boxed()));
        self
    }

    /// Await every registered request.
    pub async fn wait(self) -> LoadResults<T, E> {
        let start = Instant::now();
        let (names, futures): (Vec<_>, Vec<_>) = self.pending.into_iter().unzip();
        let outcomes = join_all(futures).await;

        let elapsed = start.elapsed().as_secs_f64();
        metrics::histogram!("screen_load_seconds", "screen" => self.screen).record(elapsed);
        debug!(screen = self.screen, requests = names.len(), elapsed, "Screen load settled");

        LoadResults {
            outcomes: names.into_iter().zip(outcomes).collect(),
        }
    }
}

/// Named outcomes of a settled [`LoadBarrier`], in registration order.
#[derive(Debug)]
pub struct LoadResults<T, E> {
    outcomes: Vec<(&'static str, Result<T, E>)>,
}

impl<T, E> LoadResults<T, E> {
    /// Remove and return the outcome registered under `name`.
    pub fn take(&mut self, name: &str) -> Option<Result<T, E>> {
        let index = self.outcomes.iter().position(|(n, _)| *n == name)?;
        Some(self.outcomes.remove(index).1)
    }

    pub fn failed(&self) -> impl Iterator<Item = (&'static str, &E)> {
        self.outcomes
            .iter()
            .filter_map(|(name, outcome)| outcome.as_ref().err().map(|err| (*name, err)))
    }
}
