pub mod eval;

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use crate::builder::Design;
use crate::ir::node::LogicNode;
use crate::ir::value::Bits;

/// A user callback run when its scheduled time arrives.
pub type ActionFn = Box<dyn FnMut(&mut Design, &mut Simulator)>;

/// A glitch subscriber: called with the simulation time and the new value
/// whenever the watched signal is re-assigned to a different value.
pub type GlitchFn = Box<dyn FnMut(u64, &Bits)>;

enum Action {
  /// Apply a value to a signal, as if by `put`.
  Drive { signal: LogicNode, value: Bits },
  /// A recurring clock toggle; re-registers itself every half period.
  Toggle { signal: LogicNode, half_period: u64 },
  Run(ActionFn),
}

struct Entry {
  time: u64,
  /// Registration order; the tie-breaker at a single time point.
  seq: u64,
  action: Action,
}

impl PartialEq for Entry {
  fn eq(&self, other: &Self) -> bool {
    self.time == other.time && self.seq == other.seq
  }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Entry {
  fn cmp(&self, other: &Self) -> Ordering {
    (self.time, self.seq).cmp(&(other.time, other.seq))
  }
}

/// The event-driven scheduler: a virtual-time min-heap of actions plus the
/// glitch-stream subscriptions.
///
/// One simulator drives one design; tests isolate state by constructing
/// fresh `Design`/`Simulator` pairs rather than sharing process-wide
/// values.
pub struct Simulator {
  time: u64,
  seq: u64,
  queue: BinaryHeap<Reverse<Entry>>,
  pub(crate) watchers: HashMap<usize, Vec<GlitchFn>>,
}

impl Default for Simulator {
  fn default() -> Self {
    Self::new()
  }
}

impl Simulator {
  pub fn new() -> Self {
    Self {
      time: 0,
      seq: 0,
      queue: BinaryHeap::new(),
      watchers: HashMap::new(),
    }
  }

  /// The current virtual time.
  pub fn now(&self) -> u64 {
    self.time
  }

  fn push(&mut self, time: u64, action: Action) {
    assert!(time >= self.time, "cannot schedule in the past");
    let seq = self.seq;
    self.seq += 1;
    self.queue.push(Reverse(Entry { time, seq, action }));
  }

  /// Schedule a callback at the given virtual time. At a single time
  /// point, actions registered earlier run first.
  pub fn register_action(&mut self, time: u64, action: ActionFn) {
    self.push(time, Action::Run(action));
  }

  /// Schedule a signal to take a value at the given virtual time.
  pub fn schedule_drive(&mut self, time: u64, signal: LogicNode, value: Bits) {
    self.push(time, Action::Drive { signal, value });
  }

  /// Start a square wave on `signal`: low from `t = 0`, toggling every
  /// `half_period`.
  pub fn start_clock(&mut self, signal: LogicNode, half_period: u64) {
    assert!(half_period > 0, "zero clock half period");
    self.push(
      self.time,
      Action::Toggle {
        signal,
        half_period,
      },
    );
  }

  /// Subscribe to a signal's glitch stream.
  pub fn on_change(&mut self, signal: LogicNode, callback: GlitchFn) {
    self
      .watchers
      .entry(signal.upcast().get_key())
      .or_default()
      .push(callback);
  }

  /// Settle initial values: constant-driven nets and source-free
  /// combinational results. Call once after `build`, before stimulus.
  pub fn initialize(&mut self, sys: &mut Design) {
    eval::initialize(sys, self);
  }

  /// Force a signal's value immediately and propagate the change through
  /// the graph before returning.
  pub fn put(&mut self, sys: &mut Design, signal: LogicNode, value: Bits) {
    eval::put(sys, self, signal, value);
  }

  /// Advance to the next pending time point and drain every action
  /// scheduled there, including follow-ups registered for the same time.
  /// Returns the time just processed, or `None` when nothing is pending.
  pub fn tick(&mut self, sys: &mut Design) -> Option<u64> {
    let t = self.queue.peek()?.0.time;
    self.time = t;
    log::debug!("tick @{}", t);
    while self.queue.peek().is_some_and(|e| e.0.time == t) {
      let Reverse(entry) = self.queue.pop().unwrap();
      match entry.action {
        Action::Drive { signal, value } => eval::put(sys, self, signal, value),
        Action::Toggle {
          signal,
          half_period,
        } => {
          let current = signal.as_ref(sys).get_value().clone();
          let next = if current.is_fully_defined() && !current.is_all_zero() {
            Bits::zero(1)
          } else if current.is_fully_defined() {
            Bits::from_u64(1, 1)
          } else {
            // The first toggle pulls the wave out of X, low first.
            Bits::zero(1)
          };
          eval::put(sys, self, signal, next);
          self.push(
            t + half_period,
            Action::Toggle {
              signal,
              half_period,
            },
          );
        }
        Action::Run(mut f) => f(sys, self),
      }
    }
    Some(t)
  }

  /// Drain every event up to and including virtual time `until`.
  pub fn run_until(&mut self, sys: &mut Design, until: u64) {
    while self
      .queue
      .peek()
      .is_some_and(|e| e.0.time <= until)
    {
      self.tick(sys);
    }
    self.time = self.time.max(until);
  }

  /// Drop all pending entries and return to time zero. Glitch
  /// subscriptions survive; scheduled work does not.
  pub fn reset(&mut self) {
    self.queue.clear();
    self.time = 0;
    self.seq = 0;
  }

  pub(crate) fn notify(&mut self, key: usize, time: u64, value: &Bits) {
    if let Some(subs) = self.watchers.get_mut(&key) {
      for sub in subs.iter_mut() {
        sub(time, value);
      }
    }
  }
}
