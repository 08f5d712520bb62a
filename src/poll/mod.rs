use crate::{
    message::{Message, MessageId},
    store::{MessageStore, StoreResult},
};
use log::{debug, trace};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{
    select,
    time::{sleep_until, Instant},
};

pub const DEFAULT_ATTEMPTS: u32 = 10;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Re-check as soon as the store receives a message.
    #[default]
    WakeOnWrite,
    /// Re-check only when the delay elapses.
    FixedInterval,
}

#[derive(Debug, Clone)]
pub struct PollOptions {
    pub attempts: u32,
    pub delay: Duration,
    pub wait: WaitStrategy,
}

impl Default for PollOptions {
    fn default() -> Self {
        PollOptions {
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_DELAY,
            wait: WaitStrategy::default(),
        }
    }
}

impl PollOptions {
    /// Longest time a poll can wait before giving up.
    pub fn bound(&self) -> Duration {
        self.delay * self.attempts
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Found(Vec<Message>),
    Exhausted,
    Cancelled,
}

impl PollOutcome {
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            PollOutcome::Found(messages) => messages,
            PollOutcome::Exhausted | PollOutcome::Cancelled => Vec::new(),
        }
    }
}

/// Long-poll emulation on top of [`MessageStore::find_messages`].
#[derive(Debug, Clone)]
pub struct Poller {
    store: Arc<MessageStore>,
    options: PollOptions,
}

impl Poller {
    pub fn new(store: Arc<MessageStore>, options: PollOptions) -> Self {
        Poller { store, options }
    }

    pub fn store(&self) -> &Arc<MessageStore> {
        &self.store
    }

    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    pub async fn poll(&self, cursor: Option<&MessageId>) -> StoreResult<PollOutcome> {
        self.poll_until(cursor, std::future::pending()).await
    }

    /// Polls until messages show up, the attempts run out or `cancel`
    /// completes, whichever comes first.
    ///
    /// Attempt `n` waits until `start + delay * n`, so the whole call never
    /// outlives [`PollOptions::bound`]. Under [`WaitStrategy::WakeOnWrite`] an
    /// insert cuts the wait short without consuming an attempt.
    pub async fn poll_until<C>(
        &self,
        cursor: Option<&MessageId>,
        cancel: C,
    ) -> StoreResult<PollOutcome>
    where
        C: Future<Output = ()>,
    {
        let start = Instant::now();
        let mut inserted = self.store.subscribe();
        let mut wake_on_write = self.options.wait == WaitStrategy::WakeOnWrite;
        tokio::pin!(cancel);

        for attempt in 1..=self.options.attempts {
            let tick = start + self.options.delay * attempt;

            loop {
                inserted.borrow_and_update();
                trace!("Poll attempt {attempt}/{}", self.options.attempts);

                let messages = self.store.find_messages(cursor).await?;
                if !messages.is_empty() {
                    debug!(
                        "Poll found {} messages on attempt {attempt}",
                        messages.len()
                    );
                    return Ok(PollOutcome::Found(messages));
                }

                select! {
                    biased;
                    _ = &mut cancel => {
                        debug!("Poll cancelled on attempt {attempt}");
                        return Ok(PollOutcome::Cancelled);
                    }
                    changed = inserted.changed(), if wake_on_write => {
                        if changed.is_err() {
                            wake_on_write = false;
                        }
                    }
                    _ = sleep_until(tick) => break,
                }
            }
        }

        debug!("Poll exhausted after {:?}", start.elapsed());
        Ok(PollOutcome::Exhausted)
    }
}
