//! Animated zoom transitions.
//!
//! The host drives time: it calls `VectorMap::advance` with the elapsed
//! wall-clock time and the [`FrameTimer`] turns that into whole 10ms
//! frames. Every transition hands out a [`Transition`] future that resolves
//! once, either when the terminal frame is applied or when a newer
//! transition replaces it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::channel::oneshot;
use glam::DVec2;

/// Tick of the animation timer
pub const FRAME_INTERVAL: Duration = Duration::from_millis(10);

/// How a transition ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The terminal transform was applied
    Finished,
    /// A later transition started first; the viewport stays wherever the
    /// last applied frame left it
    Superseded,
}

/// Completion signal of a viewport transition
#[derive(Debug)]
#[must_use = "a transition does nothing unless awaited or inspected"]
pub struct Transition {
    receiver: oneshot::Receiver<TransitionOutcome>,
    outcome: Option<TransitionOutcome>,
}

impl Transition {
    /// A linked signal and its resolving half.
    pub(crate) fn pending() -> (Self, Completion) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                receiver,
                outcome: None,
            },
            Completion { sender },
        )
    }

    /// An already resolved signal.
    pub(crate) fn resolved(outcome: TransitionOutcome) -> Self {
        let (transition, completion) = Self::pending();
        completion.resolve(outcome);
        transition
    }

    /// Outcome without waiting, `None` while the transition is running.
    pub fn try_outcome(&mut self) -> Option<TransitionOutcome> {
        if self.outcome.is_none() {
            self.outcome = match self.receiver.try_recv() {
                Ok(outcome) => outcome,
                Err(oneshot::Canceled) => Some(TransitionOutcome::Superseded),
            };
        }
        self.outcome
    }
}

impl Future for Transition {
    type Output = TransitionOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.outcome {
            return Poll::Ready(outcome);
        }
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // resolving half dropped without an answer
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(TransitionOutcome::Superseded),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Resolving half of a [`Transition`]
#[derive(Debug)]
pub(crate) struct Completion {
    sender: oneshot::Sender<TransitionOutcome>,
}

impl Completion {
    pub(crate) fn resolve(self, outcome: TransitionOutcome) {
        // the receiver may have been dropped already
        let _ = self.sender.send(outcome);
    }
}

/// Converts elapsed time into whole frames, carrying the remainder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTimer {
    interval: Duration,
    pending: Duration,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(FRAME_INTERVAL)
    }
}

impl FrameTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: Duration::ZERO,
        }
    }

    /// Number of frames due after `elapsed` more time.
    pub fn tick(&mut self, elapsed: Duration) -> u32 {
        if self.interval.is_zero() {
            return 0;
        }
        self.pending += elapsed;
        let mut frames = 0;
        while self.pending >= self.interval {
            self.pending -= self.interval;
            frames += 1;
        }
        frames
    }

    pub fn reset(&mut self) {
        self.pending = Duration::ZERO;
    }
}

/// One interpolated viewport state
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    /// 1-based frame index
    pub index: u32,
    pub scale: f64,
    pub trans: DVec2,
    pub is_last: bool,
}

/// Interpolation from the current transform to a target transform.
///
/// Scale moves linearly; translation moves linearly in scaled space
/// (`trans * scale`) and is divided back by each frame's scale, which keeps
/// the anchor from drifting on screen.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoomAnimation {
    count: u32,
    applied: u32,
    start_scale: f64,
    scale_step: f64,
    start_trans: DVec2,
    trans_step: DVec2,
    target_scale: f64,
}

impl ZoomAnimation {
    /// Frames needed to go from `from` to `to`:
    /// `|round((to - from) * 60 / max(from, to))|`.
    pub fn frame_count(from: f64, to: f64) -> u32 {
        let count = ((to - from) * 60.0 / from.max(to)).round().abs();
        if count.is_finite() { count as u32 } else { 0 }
    }

    /// `None` when the change is too small to need any frame.
    pub fn new(
        start_scale: f64,
        start_trans: DVec2,
        target_scale: f64,
        target_trans: DVec2,
    ) -> Option<Self> {
        let count = Self::frame_count(start_scale, target_scale);
        if count == 0 {
            return None;
        }
        let n = f64::from(count);
        let scaled_start = start_trans * start_scale;
        Some(Self {
            count,
            applied: 0,
            start_scale,
            scale_step: (target_scale - start_scale) / n,
            start_trans: scaled_start,
            trans_step: (target_trans * target_scale - scaled_start) / n,
            target_scale,
        })
    }

    pub fn frame_total(&self) -> u32 {
        self.count
    }

    pub fn target_scale(&self) -> f64 {
        self.target_scale
    }

    /// Frames not yet applied
    pub fn remaining(&self) -> u32 {
        self.count.saturating_sub(self.applied)
    }

    pub fn is_done(&self) -> bool {
        self.applied >= self.count
    }

    /// Advance one frame.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.is_done() {
            return None;
        }
        self.applied += 1;
        let i = f64::from(self.applied);
        let scale = self.start_scale + self.scale_step * i;
        Some(Frame {
            index: self.applied,
            scale,
            trans: (self.start_trans + self.trans_step * i) / scale,
            is_last: self.applied == self.count,
        })
    }
}

/// The animation in flight on a viewport and its completion signal
#[derive(Debug)]
pub(crate) struct ActiveAnimation {
    pub animation: ZoomAnimation,
    pub completion: Completion,
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn frame_count_follows_relative_change() {
        assert_eq!(ZoomAnimation::frame_count(1.0, 2.0), 30);
        assert_eq!(ZoomAnimation::frame_count(2.0, 1.0), 30);
        assert_eq!(ZoomAnimation::frame_count(1.0, 8.0), 53);
        assert_eq!(ZoomAnimation::frame_count(1.0, 1.0), 0);
        assert!(ZoomAnimation::new(1.0, DVec2::ZERO, 1.001, DVec2::ZERO).is_none());
    }

    #[test]
    fn last_frame_lands_on_target() {
        let target = DVec2::new(-120.0, -40.0);
        let mut animation =
            ZoomAnimation::new(1.0, DVec2::new(10.0, 5.0), 4.0, target).unwrap();
        let total = animation.frame_total();
        let mut last = None;
        while let Some(frame) = animation.next_frame() {
            last = Some(frame);
        }
        let last = last.unwrap();
        assert_eq!(last.index, total);
        assert!(last.is_last);
        assert!((last.scale - 4.0).abs() < 1e-9);
        assert!((last.trans - target).length() < 1e-9);
        assert!(animation.next_frame().is_none());
    }

    #[test]
    fn translation_interpolates_in_scaled_space() {
        let mut animation =
            ZoomAnimation::new(1.0, DVec2::new(0.0, 0.0), 2.0, DVec2::new(-100.0, 0.0)).unwrap();
        let first = animation.next_frame().unwrap();
        // 30 frames: scaled translation moves by -200 / 30 per frame
        let expected_scale = 1.0 + 1.0 / 30.0;
        assert!((first.scale - expected_scale).abs() < 1e-12);
        assert!((first.trans.x - (-200.0 / 30.0) / expected_scale).abs() < 1e-9);
    }

    #[test]
    fn timer_carries_remainder() {
        let mut timer = FrameTimer::default();
        assert_eq!(timer.tick(Duration::from_millis(25)), 2);
        assert_eq!(timer.tick(Duration::from_millis(5)), 1);
        assert_eq!(timer.tick(Duration::from_millis(9)), 0);
        timer.reset();
        assert_eq!(timer.tick(Duration::from_millis(9)), 0);
    }

    #[test]
    fn transition_resolves_once() {
        let (mut transition, completion) = Transition::pending();
        assert_eq!(transition.try_outcome(), None);
        completion.resolve(TransitionOutcome::Finished);
        assert_eq!(transition.try_outcome(), Some(TransitionOutcome::Finished));
        assert_eq!(transition.try_outcome(), Some(TransitionOutcome::Finished));
        assert_eq!(block_on(transition), TransitionOutcome::Finished);

        let resolved = Transition::resolved(TransitionOutcome::Finished);
        assert_eq!(block_on(resolved), TransitionOutcome::Finished);
    }

    #[test]
    fn dropped_completion_reads_as_superseded() {
        let (transition, completion) = Transition::pending();
        drop(completion);
        assert_eq!(block_on(transition), TransitionOutcome::Superseded);
    }
}
