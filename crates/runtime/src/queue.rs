//! Turn queue processor.
//!
//! Submitted battle sequences run strictly one at a time, in submission
//! order. Two gates hold the queue between dispatches: the pacing delay
//! (`halted`) measured on the battle clock, and the in-flight action's
//! completion signal (`in_progress`).

use std::collections::VecDeque;
use std::time::Duration;

use battle_core::{ActionCompletion, BattleSequence, CompletionWatch};
use tracing::debug;

use crate::events::{Event, EventBus, SequenceProcessed};

/// Result of a single [`TurnQueue::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePoll {
    /// Nothing queued.
    Idle,
    /// Pacing delay or an in-flight action is holding the queue.
    Gated,
    /// Head sequence was stale and discarded without running.
    Dropped,
    /// Head sequence was handed to its action.
    Dispatched,
}

#[derive(Debug)]
pub struct TurnQueue {
    pending: VecDeque<BattleSequence>,
    queue_delay: Duration,
    clock: Duration,
    halted_until: Option<Duration>,
    in_flight: Option<CompletionWatch>,
}

impl TurnQueue {
    pub fn new(queue_delay: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            queue_delay,
            clock: Duration::ZERO,
            halted_until: None,
            in_flight: None,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Battle clock: total time advanced while in combat.
    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn is_halted(&self) -> bool {
        self.halted_until.is_some_and(|until| self.clock < until)
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|watch| !watch.is_complete())
    }

    /// Appends a sequence and locks its sender until the action releases it.
    pub fn submit(&mut self, sequence: BattleSequence) {
        sequence.sender().participant().set_cooldown(f32::INFINITY);
        debug!(
            target: "battle::queue",
            action = sequence.action_name(),
            sender = %sequence.sender().id(),
            depth = self.pending.len() + 1,
            "sequence queued"
        );
        self.pending.push_back(sequence);
    }

    pub fn advance(&mut self, elapsed: Duration) {
        self.clock += elapsed;
        self.release_gates();
    }

    fn release_gates(&mut self) {
        if self.halted_until.is_some() && !self.is_halted() {
            self.halted_until = None;
            debug!(target: "battle::queue", clock = ?self.clock, "pacing delay elapsed");
        }
        if self.in_flight.is_some() && !self.is_in_progress() {
            self.in_flight = None;
            debug!(target: "battle::queue", "in-flight action completed");
        }
    }

    /// Dispatches at most one sequence.
    pub fn poll(&mut self, bus: &EventBus) -> QueuePoll {
        self.release_gates();
        if self.is_halted() || self.is_in_progress() {
            return QueuePoll::Gated;
        }

        let Some(sequence) = self.pending.pop_front() else {
            return QueuePoll::Idle;
        };

        if sequence.data.is_stale() {
            debug!(
                target: "battle::queue",
                action = sequence.action_name(),
                sender = %sequence.sender().id(),
                sender_dead = sequence.sender().is_dead(),
                "stale sequence dropped"
            );
            return QueuePoll::Dropped;
        }

        bus.publish(Event::SequenceProcessed(SequenceProcessed::from(&sequence)));

        let (completion, watch) = ActionCompletion::pair();
        self.in_flight = Some(watch);
        self.halted_until = Some(self.clock + self.queue_delay);
        debug!(
            target: "battle::queue",
            action = sequence.action_name(),
            sender = %sequence.sender().id(),
            targets = sequence.data.target_count(),
            "sequence dispatched"
        );

        sequence.action.use_action(&sequence.data, completion);
        QueuePoll::Dispatched
    }

    /// Drops everything queued and releases both gates.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.halted_until = None;
        self.in_flight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Topic;
    use battle_core::testing::{TestAction, TestParticipant};
    use battle_core::{
        BattleActionData, BattleEntity, BattleRow, Seat, TargetingStrategy,
    };
    use std::sync::Arc;

    const DELAY: Duration = Duration::from_millis(500);

    struct Fixture {
        bus: EventBus,
        hero: Arc<TestParticipant>,
        slime: Arc<TestParticipant>,
        action: Arc<TestAction>,
    }

    impl Fixture {
        fn new(action: TestAction) -> Self {
            Self {
                bus: EventBus::new(),
                hero: TestParticipant::shared(1, "hero"),
                slime: TestParticipant::shared(2, "slime"),
                action: action.into_shared(),
            }
        }

        fn sequence(&self, sender: &Arc<TestParticipant>) -> BattleSequence {
            let data = BattleActionData::new(BattleEntity::character(sender.clone()))
                .with_targets(vec![BattleEntity::hostile(
                    self.slime.clone(),
                    Seat::new(BattleRow::Middle, 2),
                )]);
            BattleSequence::new(self.action.clone(), data)
        }
    }

    fn strike() -> TestAction {
        TestAction::new("strike", TargetingStrategy::single_foe())
    }

    #[test]
    fn submit_locks_sender() {
        let fx = Fixture::new(strike());
        let mut queue = TurnQueue::new(DELAY);
        queue.submit(fx.sequence(&fx.hero));
        assert_eq!(fx.hero.cooldown(), f32::INFINITY);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn pacing_delay_gates_next_dispatch() {
        let fx = Fixture::new(strike());
        let mut queue = TurnQueue::new(DELAY);
        queue.submit(fx.sequence(&fx.hero));
        queue.submit(fx.sequence(&fx.hero));

        assert_eq!(queue.poll(&fx.bus), QueuePoll::Dispatched);
        assert_eq!(queue.poll(&fx.bus), QueuePoll::Gated);

        queue.advance(Duration::from_millis(499));
        assert_eq!(queue.poll(&fx.bus), QueuePoll::Gated);

        queue.advance(Duration::from_millis(1));
        assert_eq!(queue.poll(&fx.bus), QueuePoll::Dispatched);
        assert_eq!(fx.action.use_count(), 2);
        assert_eq!(queue.poll(&fx.bus), QueuePoll::Gated);
    }

    #[test]
    fn held_action_blocks_until_completion() {
        let fx = Fixture::new(strike().held());
        let mut queue = TurnQueue::new(Duration::ZERO);
        queue.submit(fx.sequence(&fx.hero));
        queue.submit(fx.sequence(&fx.hero));

        assert_eq!(queue.poll(&fx.bus), QueuePoll::Dispatched);
        assert!(queue.is_in_progress());
        queue.advance(Duration::from_secs(10));
        assert_eq!(queue.poll(&fx.bus), QueuePoll::Gated);

        assert_eq!(fx.action.finish_pending(), 1);
        assert_eq!(queue.poll(&fx.bus), QueuePoll::Dispatched);
        assert_eq!(fx.action.use_count(), 2);
    }

    #[test]
    fn stale_sequences_are_dropped_silently() {
        let fx = Fixture::new(strike());
        let mut processed = fx.bus.subscribe(Topic::Queue);
        let mut queue = TurnQueue::new(Duration::ZERO);
        queue.submit(fx.sequence(&fx.hero));

        fx.slime.kill();
        assert_eq!(queue.poll(&fx.bus), QueuePoll::Dropped);
        assert_eq!(fx.action.use_count(), 0);
        assert!(processed.try_recv().is_err());
        assert_eq!(queue.poll(&fx.bus), QueuePoll::Idle);
    }

    #[test]
    fn dispatch_order_is_submission_order() {
        let fx = Fixture::new(strike());
        let mage = TestParticipant::shared(3, "mage");
        let mut processed = fx.bus.subscribe(Topic::Queue);
        let mut queue = TurnQueue::new(Duration::ZERO);

        queue.submit(fx.sequence(&mage));
        queue.submit(fx.sequence(&fx.hero));
        while queue.poll(&fx.bus) != QueuePoll::Idle {}

        let senders: Vec<_> = fx.action.uses().iter().map(|used| used.sender.0).collect();
        assert_eq!(senders, vec![3, 1]);
        match processed.try_recv() {
            Ok(Event::SequenceProcessed(event)) => {
                assert_eq!(event.action, "strike");
                assert_eq!(event.sender.name, "mage");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn clear_releases_gates() {
        let fx = Fixture::new(strike().held());
        let mut queue = TurnQueue::new(DELAY);
        queue.submit(fx.sequence(&fx.hero));
        queue.submit(fx.sequence(&fx.hero));
        queue.poll(&fx.bus);

        queue.clear();
        assert!(queue.is_empty());
        assert!(!queue.is_halted());
        assert!(!queue.is_in_progress());
    }
}
