// isacov - Coverage-guided test corpus generation from instruction set templates
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Generation on a dedicated thread.
//!
//! The producer thread computes one test, hands it over through a
//! rendezvous channel and then waits for the consumer to ask for the next
//! one. Grammar and coverage state are only ever touched by the producer.

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use rand::Rng;
use tracing::debug;

use super::{CancellationToken, Generator, Test};
use crate::error::GenerateError;
use crate::grammar::Grammar;

type Handoff = Result<Test, GenerateError>;

/// A [`Generator`] running on its own thread.
///
/// Dropping the handle cancels the producer and joins it.
pub struct BackgroundGenerator {
    tests: Option<Receiver<Handoff>>,
    resume: Option<SyncSender<()>>,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    awaiting_resume: bool,
}

impl BackgroundGenerator {
    /// Start generating tests for `grammar` on a new thread.
    ///
    /// Structural problems are reported here, before the thread starts.
    pub fn spawn<R>(grammar: Grammar, rng: R, token: CancellationToken) -> Result<Self, GenerateError>
    where
        R: Rng + Send + 'static,
    {
        let generator = Generator::new(grammar, rng)?.with_cancellation(token.clone());

        let (test_tx, test_rx) = mpsc::sync_channel::<Handoff>(0);
        let (resume_tx, resume_rx) = mpsc::sync_channel::<()>(0);
        let producer_token = token.clone();

        let handle = thread::Builder::new()
            .name("isacov-generator".to_string())
            .spawn(move || produce(generator, producer_token, test_tx, resume_rx))
            .map_err(|e| GenerateError::Internal(format!("cannot start generator thread: {}", e)))?;

        Ok(Self {
            tests: Some(test_rx),
            resume: Some(resume_tx),
            token,
            handle: Some(handle),
            awaiting_resume: false,
        })
    }

    /// The token that stops this generator.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Ask the producer to stop after its current step.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Receive the next test, blocking until the producer hands it over.
    pub fn try_next(&mut self) -> Result<Option<Test>, GenerateError> {
        if self.awaiting_resume {
            self.awaiting_resume = false;
            if let Some(resume) = &self.resume {
                // A closed channel means the producer already stopped.
                let _ = resume.send(());
            }
        }

        let Some(tests) = &self.tests else {
            return Ok(None);
        };
        match tests.recv() {
            Ok(Ok(test)) => {
                self.awaiting_resume = true;
                Ok(Some(test))
            }
            Ok(Err(error)) => {
                self.tests = None;
                Err(error)
            }
            Err(_) => {
                self.tests = None;
                Ok(None)
            }
        }
    }
}

fn produce<R: Rng>(
    mut generator: Generator<R>,
    token: CancellationToken,
    tests: SyncSender<Handoff>,
    resume: Receiver<()>,
) {
    loop {
        let handoff = match generator.try_next() {
            Ok(Some(test)) => Ok(test),
            Ok(None) => break,
            Err(error) => Err(error),
        };
        let failed = handoff.is_err();

        if token.is_cancelled() || tests.send(handoff).is_err() || failed {
            break;
        }
        if token.is_cancelled() || resume.recv().is_err() {
            break;
        }
    }
    debug!(
        delivered = generator.delivered(),
        state = ?generator.state(),
        "generator thread finished"
    );
}

impl Iterator for BackgroundGenerator {
    type Item = Test;

    fn next(&mut self) -> Option<Test> {
        self.try_next().ok().flatten()
    }
}

impl Drop for BackgroundGenerator {
    fn drop(&mut self) {
        self.token.cancel();
        self.resume.take();
        self.tests.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
