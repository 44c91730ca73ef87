//! Waiting for the notification slot to reach an expected state.
//!
//! Firefox shows at most one add-on banner at a time. The waiter samples
//! that slot until it holds what the caller expects: a particular kind, any
//! banner at all, or nothing. A banner of the wrong kind does not end the
//! wait early, since install flows pass through transitional banners (the
//! progress banner in particular) on their way to the one a test expects.

use crate::error::Result;
use crate::notification::{Classified, NotificationKind};
use crate::wait::{WaitConfig, wait_until};
use async_trait::async_trait;
use tracing::debug;

/// A source of notification slot samples.
///
/// [`BrowserWindow`](crate::BrowserWindow) reads the slot from Firefox's
/// chrome; tests can substitute a scripted slot.
#[async_trait]
pub trait NotificationSlot: Send + Sync {
    /// What a non-empty sample yields.
    type View: Classified + Send;

    /// Reads the slot once.
    async fn sample(&self) -> Result<Option<Self::View>>;
}

/// What the waiter should wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// The slot must be empty.
    Nothing,
    /// Any banner at all.
    Any,
    /// A banner of this kind.
    Kind(NotificationKind),
}

impl Expected {
    /// Returns true if a slot holding `current` satisfies this expectation.
    #[must_use]
    pub fn is_satisfied_by(self, current: Option<NotificationKind>) -> bool {
        match (self, current) {
            (Self::Nothing, None) | (Self::Any, Some(_)) => true,
            (Self::Kind(expected), Some(kind)) => expected == kind,
            _ => false,
        }
    }

    /// The message a timeout for this expectation carries.
    #[must_use]
    pub fn timeout_message(self) -> String {
        match self {
            Self::Nothing => "Unexpected notification shown".to_string(),
            Self::Any => "No notification was shown".to_string(),
            Self::Kind(kind) => format!("{} was not shown", kind.type_name()),
        }
    }
}

impl From<NotificationKind> for Expected {
    fn from(kind: NotificationKind) -> Self {
        Self::Kind(kind)
    }
}

impl From<Option<NotificationKind>> for Expected {
    fn from(kind: Option<NotificationKind>) -> Self {
        kind.map_or(Self::Nothing, Self::Kind)
    }
}

/// Samples `slot` until it satisfies `expected`.
///
/// Returns `Ok(None)` once an expected-empty slot is observed empty, or the
/// observed view otherwise.
///
/// # Errors
///
/// Returns `Timeout` with [`Expected::timeout_message`] if the slot never
/// satisfies the expectation, or any error raised while sampling.
pub async fn wait_for_notification<S>(
    slot: &S,
    expected: Expected,
    config: WaitConfig,
) -> Result<Option<S::View>>
where
    S: NotificationSlot + ?Sized,
{
    debug!(?expected, timeout = ?config.timeout, "waiting for notification");
    let message = expected.timeout_message();

    wait_until(
        move || async move {
            let view = slot.sample().await?;
            let current = view.as_ref().map(Classified::kind);

            if expected.is_satisfied_by(current) {
                Ok(Some(view))
            } else {
                debug!(?expected, ?current, "notification slot does not match yet");
                Ok(None)
            }
        },
        config,
        &message,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotificationError;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays a fixed sequence of slot states, then repeats the last one.
    struct ScriptedSlot {
        frames: Mutex<VecDeque<Option<NotificationKind>>>,
        last: Mutex<Option<NotificationKind>>,
        samples: Mutex<usize>,
    }

    impl ScriptedSlot {
        fn new(frames: impl IntoIterator<Item = Option<NotificationKind>>) -> Self {
            Self {
                frames: Mutex::new(frames.into_iter().collect()),
                last: Mutex::new(None),
                samples: Mutex::new(0),
            }
        }

        fn showing(kind: Option<NotificationKind>) -> Self {
            Self::new([kind])
        }

        fn samples(&self) -> usize {
            *self.samples.lock().unwrap()
        }
    }

    #[async_trait]
    impl NotificationSlot for ScriptedSlot {
        type View = NotificationKind;

        async fn sample(&self) -> Result<Option<NotificationKind>> {
            *self.samples.lock().unwrap() += 1;
            let mut last = self.last.lock().unwrap();
            if let Some(frame) = self.frames.lock().unwrap().pop_front() {
                *last = frame;
            }
            Ok(*last)
        }
    }

    /// A browser stand-in that follows the install pipeline when acted upon.
    struct InstallFlow {
        slot: Mutex<Option<NotificationKind>>,
    }

    #[derive(Debug, Clone, Copy)]
    enum Action {
        Allow,
        Install,
        Cancel,
        Close,
    }

    impl InstallFlow {
        fn blocked() -> Self {
            Self {
                slot: Mutex::new(Some(NotificationKind::Blocked)),
            }
        }

        fn act(&self, action: Action) {
            use NotificationKind::{Blocked, Complete, Confirmation};

            let mut slot = self.slot.lock().unwrap();
            *slot = match (*slot, action) {
                (Some(Blocked), Action::Allow) => Some(Confirmation),
                (Some(Confirmation), Action::Install) => Some(Complete),
                (Some(Confirmation), Action::Cancel) => None,
                (Some(Blocked | Complete), Action::Close) => None,
                (state, action) => panic!("{action:?} is not valid in {state:?}"),
            };
        }
    }

    #[async_trait]
    impl NotificationSlot for InstallFlow {
        type View = NotificationKind;

        async fn sample(&self) -> Result<Option<NotificationKind>> {
            Ok(*self.slot.lock().unwrap())
        }
    }

    fn quick() -> WaitConfig {
        WaitConfig::new(Duration::from_millis(60), Duration::from_millis(5))
    }

    fn timeout_message(result: Result<Option<NotificationKind>>) -> String {
        match result {
            Err(NotificationError::Timeout { message, .. }) => message,
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    const KINDS: [NotificationKind; 6] = [
        NotificationKind::Blocked,
        NotificationKind::Confirmation,
        NotificationKind::Complete,
        NotificationKind::Progress,
        NotificationKind::Failed,
        NotificationKind::Unrecognized,
    ];

    #[test]
    fn match_rules_cover_every_combination() {
        let shown: Vec<Option<NotificationKind>> =
            std::iter::once(None).chain(KINDS.into_iter().map(Some)).collect();

        for current in &shown {
            assert_eq!(Expected::Nothing.is_satisfied_by(*current), current.is_none());
            assert_eq!(Expected::Any.is_satisfied_by(*current), current.is_some());
            for kind in KINDS {
                assert_eq!(
                    Expected::Kind(kind).is_satisfied_by(*current),
                    *current == Some(kind),
                    "expected {kind:?}, shown {current:?}"
                );
            }
        }
    }

    #[test]
    fn expectation_conversions() {
        assert_eq!(
            Expected::from(NotificationKind::Blocked),
            Expected::Kind(NotificationKind::Blocked)
        );
        assert_eq!(Expected::from(None), Expected::Nothing);
        assert_eq!(
            Expected::from(Some(NotificationKind::Complete)),
            Expected::Kind(NotificationKind::Complete)
        );
    }

    #[tokio::test]
    async fn returns_matching_view() {
        let slot = ScriptedSlot::showing(Some(NotificationKind::Blocked));

        let view = wait_for_notification(&slot, NotificationKind::Blocked.into(), quick())
            .await
            .unwrap();

        assert_eq!(view, Some(NotificationKind::Blocked));
    }

    #[tokio::test]
    async fn any_returns_whatever_is_shown() {
        let slot = ScriptedSlot::showing(Some(NotificationKind::Confirmation));

        let view = wait_for_notification(&slot, Expected::Any, quick())
            .await
            .unwrap();

        assert_eq!(view, Some(NotificationKind::Confirmation));
    }

    #[tokio::test]
    async fn nothing_succeeds_on_empty_slot() {
        let slot = ScriptedSlot::showing(None);

        let view = wait_for_notification(&slot, Expected::Nothing, quick())
            .await
            .unwrap();

        assert!(view.is_none());
    }

    #[tokio::test]
    async fn expected_kind_not_shown() {
        let slot = ScriptedSlot::showing(None);

        let result = wait_for_notification(&slot, NotificationKind::Blocked.into(), quick()).await;

        assert_eq!(timeout_message(result), "AddOnInstallBlocked was not shown");
    }

    #[tokio::test]
    async fn any_with_empty_slot() {
        let slot = ScriptedSlot::showing(None);

        let result = wait_for_notification(&slot, Expected::Any, quick()).await;

        assert_eq!(timeout_message(result), "No notification was shown");
    }

    #[tokio::test]
    async fn nothing_while_banner_stays() {
        let slot = ScriptedSlot::showing(Some(NotificationKind::Blocked));

        let result = wait_for_notification(&slot, Expected::Nothing, quick()).await;

        assert_eq!(timeout_message(result), "Unexpected notification shown");
    }

    #[tokio::test]
    async fn mismatched_kind_times_out_naming_expected() {
        let slot = ScriptedSlot::showing(Some(NotificationKind::Blocked));

        let result =
            wait_for_notification(&slot, NotificationKind::Confirmation.into(), quick()).await;

        assert_eq!(
            timeout_message(result),
            "AddOnInstallConfirmation was not shown"
        );
        assert!(slot.samples() > 1, "mismatch must keep polling");
    }

    #[tokio::test]
    async fn keeps_polling_through_transitional_banners() {
        let slot = ScriptedSlot::new([
            Some(NotificationKind::Progress),
            Some(NotificationKind::Progress),
            None,
            Some(NotificationKind::Confirmation),
        ]);

        let view = wait_for_notification(
            &slot,
            NotificationKind::Confirmation.into(),
            WaitConfig::new(Duration::from_secs(2), Duration::from_millis(5)),
        )
        .await
        .unwrap();

        assert_eq!(view, Some(NotificationKind::Confirmation));
        assert_eq!(slot.samples(), 4);
    }

    #[tokio::test]
    async fn open_then_close_blocked_leaves_slot_empty() {
        let flow = InstallFlow::blocked();

        let blocked = wait_for_notification(&flow, NotificationKind::Blocked.into(), quick())
            .await
            .unwrap();
        assert_eq!(blocked, Some(NotificationKind::Blocked));

        flow.act(Action::Close);

        let after = wait_for_notification(&flow, Expected::Nothing, quick())
            .await
            .unwrap();
        assert!(after.is_none());
    }

    #[tokio::test]
    async fn full_pipeline_takes_three_actions() {
        let flow = InstallFlow::blocked();
        let mut actions = 0;

        for (action, next) in [
            (Action::Allow, Expected::Kind(NotificationKind::Confirmation)),
            (Action::Install, Expected::Kind(NotificationKind::Complete)),
            (Action::Close, Expected::Nothing),
        ] {
            flow.act(action);
            actions += 1;
            wait_for_notification(&flow, next, quick()).await.unwrap();
        }

        assert_eq!(actions, 3);
        assert!(flow.sample().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancel_reaches_nothing_not_complete() {
        let flow = InstallFlow::blocked();
        flow.act(Action::Allow);
        wait_for_notification(&flow, NotificationKind::Confirmation.into(), quick())
            .await
            .unwrap();

        flow.act(Action::Cancel);

        let complete =
            wait_for_notification(&flow, NotificationKind::Complete.into(), quick()).await;
        assert_eq!(timeout_message(complete), "AddOnInstallComplete was not shown");
        assert!(
            wait_for_notification(&flow, Expected::Nothing, quick())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn sampling_errors_propagate() {
        struct BrokenSlot;

        #[async_trait]
        impl NotificationSlot for BrokenSlot {
            type View = NotificationKind;

            async fn sample(&self) -> Result<Option<NotificationKind>> {
                Err(NotificationError::Context("no session".to_string()))
            }
        }

        let result = wait_for_notification(&BrokenSlot, Expected::Any, quick()).await;

        assert!(matches!(result, Err(NotificationError::Context(_))));
    }
}
