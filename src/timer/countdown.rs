//! A single countdown timer.

use std::{
    ops::Deref,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    time::Duration,
};

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::{prelude::*, service::chat::ChatClient};

const TICK: Duration = Duration::from_secs(1);

const RUNNING: u8 = 0;
const EXPIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Observable state of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Running,
    Finished,
}

/// A running countdown that sends its notice to a chat when it elapses.
///
/// The countdown runs in its own task, started by [`Timer::start`]. This handle
/// is cheap to clone; it can only request cancellation and observe the state.
#[derive(Clone)]
pub struct Timer {
    inner: Arc<TimerInner>,
}

impl Deref for Timer {
    type Target = TimerInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Inner state of a timer.
pub struct TimerInner {
    chat_id: i64,
    minutes: u32,
    notice: String,
    cancel: CancellationToken,
    /// Leaves `RUNNING` exactly once, either to `EXPIRED` or to `CANCELLED`.
    phase: AtomicU8,
}

impl TimerInner {
    /// Moves out of `RUNNING`, returning whether this call did it.
    fn leave_running(&self, to: u8) -> bool {
        self.phase.compare_exchange(RUNNING, to, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }
}

impl TimerInner {
    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn notice(&self) -> &str {
        &self.notice
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("chat_id", &self.chat_id)
            .field("minutes", &self.minutes)
            .field("notice", &self.notice)
            .field("state", &self.state())
            .finish()
    }
}

impl Timer {
    /// Creates a timer and immediately starts counting down.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(chat: ChatClient, chat_id: i64, minutes: u32, notice: impl Into<String>) -> Self {
        let timer = Self {
            inner: Arc::new(TimerInner {
                chat_id,
                minutes,
                notice: notice.into(),
                cancel: CancellationToken::new(),
                phase: AtomicU8::new(RUNNING),
            }),
        };

        let span = tracing::debug_span!("timer", chat_id, minutes);
        tokio::spawn(run(timer.inner.clone(), chat).instrument(span));

        timer
    }

    /// Requests cancellation.
    ///
    /// Never blocks, and is a no-op on a timer that already finished, including
    /// one that expired and is still delivering its notice.
    pub fn cancel(&self) {
        if self.leave_running(CANCELLED) {
            self.cancel.cancel();
        }
    }

    /// A cancelled timer is finished even if its task has not observed the request yet.
    pub fn state(&self) -> TimerState {
        match self.phase.load(Ordering::Acquire) {
            RUNNING => TimerState::Running,
            _ => TimerState::Finished,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state() == TimerState::Finished
    }
}

/// The countdown task. Owns the remaining seconds.
async fn run(timer: Arc<TimerInner>, chat: ChatClient) {
    debug!("Timer started.");

    let mut remaining = u64::from(timer.minutes) * 60;
    let mut ticker = tokio::time::interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    while remaining > 0 {
        tokio::select! {
            biased;
            _ = timer.cancel.cancelled() => {
                debug!("Timer cancelled with {} seconds left.", remaining);
                break;
            }
            _ = ticker.tick() => {
                remaining -= 1;
                trace!("Tick, {} seconds left.", remaining);
            }
        }
    }

    // Expiry is committed before the notice goes out, so a cancel arriving during the send is a no-op.
    if remaining == 0 && timer.leave_running(EXPIRED) {
        debug!("Timer elapsed, sending notice.");

        if let Err(err) = chat.send_message(timer.chat_id, &timer.notice).await {
            error!("Failed to send timer notice: {:#}", err);
        }
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        base::types::RawMessage,
        service::chat::{GenericChatClient, MockGenericChatClient},
    };

    /// Delays every send, like a transport that is retrying.
    struct SlowChat {
        inner: ChatClient,
        delay: Duration,
    }

    #[async_trait]
    impl GenericChatClient for SlowChat {
        async fn get_updates(&self, offset: i64, limit: u32) -> Res<Vec<RawMessage>> {
            self.inner.get_updates(offset, limit).await
        }

        async fn send_message(&self, chat_id: i64, text: &str) -> Void {
            tokio::time::sleep(self.delay).await;
            self.inner.send_message(chat_id, text).await
        }
    }

    fn recording_chat() -> (ChatClient, Arc<Mutex<Vec<(i64, String)>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let record = sent.clone();

        let mut mock = MockGenericChatClient::new();
        mock.expect_send_message().returning(move |chat_id, text| {
            record.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        });

        (ChatClient::new(Arc::new(mock)), sent)
    }

    #[tokio::test(start_paused = true)]
    async fn expires_after_its_duration_and_sends_notice_once() {
        let (chat, sent) = recording_chat();
        let timer = Timer::start(chat, 7, 1, "Stretch!");

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(timer.state(), TimerState::Running);
        assert!(sent.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(timer.state(), TimerState::Finished);
        assert_eq!(*sent.lock().unwrap(), vec![(7, "Stretch!".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_finishes_without_sending() {
        let (chat, sent) = recording_chat();
        let timer = Timer::start(chat, 7, 1, "Stretch!");

        tokio::time::sleep(Duration::from_secs(10)).await;
        timer.cancel();
        assert!(timer.is_finished());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(timer.is_finished());
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_expiry_is_a_no_op() {
        let (chat, sent) = recording_chat();
        let timer = Timer::start(chat, 7, 1, "Stretch!");

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(timer.is_finished());

        timer.cancel();
        timer.cancel();

        assert!(timer.is_finished());
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_notice_still_finishes() {
        let mut mock = MockGenericChatClient::new();
        mock.expect_send_message().times(1).returning(|_, _| Err(anyhow!("network down")));

        let timer = Timer::start(ChatClient::new(Arc::new(mock)), 7, 1, "Stretch!");

        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(timer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_a_slow_notice_is_a_no_op() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let record = sent.clone();

        let mut mock = MockGenericChatClient::new();
        mock.expect_send_message().times(1).returning(move |chat_id, text| {
            record.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        });

        let chat = ChatClient::new(Arc::new(SlowChat {
            inner: ChatClient::new(Arc::new(mock)),
            delay: Duration::from_secs(10),
        }));
        let timer = Timer::start(chat, 7, 1, "Ring");

        // Expired, with the notice still in flight.
        tokio::time::sleep(Duration::from_millis(60_500)).await;
        assert!(timer.is_finished());
        assert!(sent.lock().unwrap().is_empty());

        timer.cancel();
        assert!(!timer.cancel.is_cancelled());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(*sent.lock().unwrap(), vec![(7, "Ring".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_wins_the_phase_once() {
        let (chat, _) = recording_chat();
        let timer = Timer::start(chat, 7, 5, "Stretch!");

        timer.cancel();

        assert!(timer.cancel.is_cancelled());
        assert!(!timer.leave_running(EXPIRED));
    }
}
