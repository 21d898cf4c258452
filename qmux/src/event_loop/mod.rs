//! # Event Loop Adapter
//!
//! The minimal, single-threaded, deadline-driven loop the transport runs
//! on. The connection schedules "run in loop" callbacks and one-shot
//! timers; the embedding I/O driver calls [`EventBase::poll_timeout`] to
//! find the next deadline and [`EventBase::run_once`] per iteration.
//!
//! Cancellation is O(1) and idempotent for both callbacks and timers: a
//! handle flips a shared flag, and a cancelled callback is guaranteed never
//! to fire. Operations other event bases offer but this one does not
//! (run-in-other-thread, run-after-delay) simply do not exist on this type.

use std::cell::{Cell, RefCell};
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Tick granularity of the timer wheel.
pub const TIMER_TICK_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug)]
struct CallbackState {
    scheduled: Cell<bool>,
}

/// Handle to a callback scheduled with [`EventBase::run_in_loop`].
#[derive(Clone)]
pub struct LoopCallbackHandle {
    state: Rc<CallbackState>,
}

impl LoopCallbackHandle {
    /// Cancel the callback. O(1), idempotent; a cancelled callback never
    /// runs.
    pub fn cancel(&self) {
        self.state.scheduled.set(false);
    }

    pub fn is_scheduled(&self) -> bool {
        self.state.scheduled.get()
    }
}

#[derive(Debug)]
struct TimerState {
    armed: Cell<bool>,
}

/// Handle to a one-shot timer scheduled with
/// [`EventBase::schedule_timeout`].
#[derive(Clone)]
pub struct TimerHandle {
    state: Rc<TimerState>,
}

impl TimerHandle {
    /// Cancel the timer. O(1), idempotent; a cancelled timer never fires.
    pub fn cancel(&self) {
        self.state.armed.set(false);
    }

    /// True iff the timer is armed or pending.
    pub fn is_scheduled(&self) -> bool {
        self.state.armed.get()
    }

    /// Not implemented in the minimal event base.
    pub fn time_remaining(&self) -> Duration {
        panic!("time_remaining is not implemented in the minimal event base");
    }
}

struct ScheduledCallback {
    state: Rc<CallbackState>,
    callback: Box<dyn FnOnce()>,
}

struct ScheduledTimer {
    state: Rc<TimerState>,
    callback: Box<dyn FnOnce()>,
}

// Min-heap slot; the entry body lives in `timers` keyed by sequence.
#[derive(PartialEq, Eq)]
struct TimerSlot {
    deadline: Instant,
    seq: u64,
}

impl Ord for TimerSlot {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then(other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerSlot {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct Inner {
    // Runs at the end of the current iteration.
    this_iteration: VecDeque<ScheduledCallback>,
    // Runs at the start of the next iteration.
    next_iteration: VecDeque<ScheduledCallback>,
    timer_heap: BinaryHeap<TimerSlot>,
    timers: HashMap<u64, ScheduledTimer>,
    timer_seq: u64,
}

/// Single-threaded event base.
pub struct EventBase {
    inner: RefCell<Inner>,
    loop_thread: std::thread::ThreadId,
}

impl Default for EventBase {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBase {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(Inner::default()),
            loop_thread: std::thread::current().id(),
        }
    }

    /// True iff the caller is on the thread that owns the loop. For debug
    /// assertions.
    pub fn is_in_event_base_thread(&self) -> bool {
        std::thread::current().id() == self.loop_thread
    }

    /// Schedule `callback` to run at the end of the current loop iteration
    /// (`this_iteration`) or at the start of the next one.
    pub fn run_in_loop<F>(&self, callback: F, this_iteration: bool) -> LoopCallbackHandle
    where
        F: FnOnce() + 'static,
    {
        debug_assert!(self.is_in_event_base_thread());
        let state = Rc::new(CallbackState {
            scheduled: Cell::new(true),
        });
        let scheduled = ScheduledCallback {
            state: Rc::clone(&state),
            callback: Box::new(callback),
        };
        let mut inner = self.inner.borrow_mut();
        if this_iteration {
            inner.this_iteration.push_back(scheduled);
        } else {
            inner.next_iteration.push_back(scheduled);
        }
        LoopCallbackHandle { state }
    }

    /// Schedule a one-shot timer with millisecond granularity. Delegates to
    /// the microsecond variant.
    pub fn schedule_timeout<F>(&self, callback: F, timeout: Duration) -> TimerHandle
    where
        F: FnOnce() + 'static,
    {
        self.schedule_timeout_micros(callback, timeout)
    }

    /// Best-effort high-resolution variant. The minimal base keeps full
    /// `Instant` precision, so this always succeeds.
    pub fn schedule_timeout_high_res<F>(&self, callback: F, timeout: Duration) -> (TimerHandle, bool)
    where
        F: FnOnce() + 'static,
    {
        (self.schedule_timeout_micros(callback, timeout), true)
    }

    fn schedule_timeout_micros<F>(&self, callback: F, timeout: Duration) -> TimerHandle
    where
        F: FnOnce() + 'static,
    {
        debug_assert!(self.is_in_event_base_thread());
        let state = Rc::new(TimerState {
            armed: Cell::new(true),
        });
        let mut inner = self.inner.borrow_mut();
        let seq = inner.timer_seq;
        inner.timer_seq += 1;
        let deadline = Instant::now() + timeout;
        inner.timer_heap.push(TimerSlot { deadline, seq });
        inner.timers.insert(
            seq,
            ScheduledTimer {
                state: Rc::clone(&state),
                callback: Box::new(callback),
            },
        );
        TimerHandle { state }
    }

    /// The earliest armed timer deadline, if any. Lazily discards cancelled
    /// timers on the way.
    pub fn poll_timeout(&self) -> Option<Instant> {
        let mut inner = self.inner.borrow_mut();
        loop {
            let slot = inner.timer_heap.peek()?;
            let seq = slot.seq;
            let deadline = slot.deadline;
            let armed = inner
                .timers
                .get(&seq)
                .map(|t| t.state.armed.get())
                .unwrap_or(false);
            if armed {
                return Some(deadline);
            }
            inner.timer_heap.pop();
            inner.timers.remove(&seq);
        }
    }

    /// Run one loop iteration at time `now`: expire due timers, run the
    /// callbacks deferred from the previous iteration, then the
    /// end-of-iteration callbacks. Callbacks scheduled while running land
    /// in the following iteration, so the iteration terminates.
    pub fn run_once(&self, now: Instant) {
        let (due_timers, callbacks) = {
            let mut inner = self.inner.borrow_mut();

            let mut due_timers = Vec::new();
            while let Some(slot) = inner.timer_heap.peek() {
                if slot.deadline > now {
                    break;
                }
                let seq = inner.timer_heap.pop().expect("peeked").seq;
                if let Some(timer) = inner.timers.remove(&seq) {
                    due_timers.push(timer);
                }
            }

            let mut callbacks = std::mem::take(&mut inner.next_iteration);
            callbacks.append(&mut inner.this_iteration);
            (due_timers, callbacks)
        };

        trace!(
            timers = due_timers.len(),
            callbacks = callbacks.len(),
            "event base iteration"
        );

        for timer in due_timers {
            if timer.state.armed.replace(false) {
                (timer.callback)();
            }
        }
        for scheduled in callbacks {
            if scheduled.state.scheduled.replace(false) {
                (scheduled.callback)();
            }
        }
    }
}
