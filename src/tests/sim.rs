use std::cell::RefCell;
use std::rc::Rc;

use crate::builder::Design;
use crate::ir::value::Bits;
use crate::sim::Simulator;

#[test]
fn actions_run_in_registration_order_at_one_time() {
  let mut sys = Design::new("ordering");
  let mut sim = Simulator::new();
  let log = Rc::new(RefCell::new(Vec::new()));

  for tag in 0..3u32 {
    let log = log.clone();
    sim.register_action(
      5,
      Box::new(move |_, _| {
        log.borrow_mut().push(tag);
      }),
    );
  }
  sim.tick(&mut sys);
  assert_eq!(*log.borrow(), vec![0, 1, 2]);
  assert_eq!(sim.now(), 5);
}

#[test]
fn tick_advances_to_next_pending_time() {
  let mut sys = Design::new("advance");
  let sig = sys.create_logic("sig", 4);
  let mut sim = Simulator::new();
  sim.schedule_drive(3, sig, Bits::from_u64(7, 4));
  sim.schedule_drive(9, sig, Bits::from_u64(2, 4));

  assert_eq!(sim.tick(&mut sys), Some(3));
  assert_eq!(sys.value_u64(sig).unwrap(), 7);
  assert_eq!(sim.tick(&mut sys), Some(9));
  assert_eq!(sys.value_u64(sig).unwrap(), 2);
  assert_eq!(sim.tick(&mut sys), None);
}

#[test]
fn reset_discards_pending_work() {
  let mut sys = Design::new("reset");
  let sig = sys.create_logic("sig", 1);
  let mut sim = Simulator::new();
  sim.schedule_drive(4, sig, Bits::from_u64(1, 1));
  sim.reset();
  assert_eq!(sim.tick(&mut sys), None);
  assert_eq!(sim.now(), 0);
  // The signal never left its reset value.
  assert!(!sys.value(sig).is_fully_defined());
}

#[test]
fn clock_generates_square_wave_low_first() {
  let mut sys = Design::new("clock");
  let (_gen, clk) = sys.create_clock_generator(10).unwrap();
  let mut sim = Simulator::new();
  sim.start_clock(clk, 5);

  sim.tick(&mut sys);
  assert_eq!(sys.value_u64(clk).unwrap(), 0);
  sim.tick(&mut sys);
  assert_eq!(sim.now(), 5);
  assert_eq!(sys.value_u64(clk).unwrap(), 1);
  sim.tick(&mut sys);
  assert_eq!(sim.now(), 10);
  assert_eq!(sys.value_u64(clk).unwrap(), 0);
}

#[test]
fn glitch_stream_fires_on_change_only() {
  let mut sys = Design::new("glitch");
  let sig = sys.create_logic("sig", 2);
  let mut sim = Simulator::new();
  let seen = Rc::new(RefCell::new(Vec::new()));
  {
    let seen = seen.clone();
    sim.on_change(
      sig,
      Box::new(move |time, value| {
        seen.borrow_mut().push((time, value.to_u64().unwrap()));
      }),
    );
  }

  sim.put(&mut sys, sig, Bits::from_u64(1, 2));
  // Re-assigning the same value is not a glitch.
  sim.put(&mut sys, sig, Bits::from_u64(1, 2));
  sim.schedule_drive(7, sig, Bits::from_u64(2, 2));
  sim.tick(&mut sys);

  assert_eq!(*seen.borrow(), vec![(0, 1), (7, 2)]);
}

#[test]
fn derived_signals_follow_their_operands() {
  let mut sys = Design::new("derived");
  let a = sys.create_logic("a", 4);
  let b = sys.create_logic("b", 4);
  let sum = sys.create_add(a, b).unwrap();
  let masked = sys.create_and(sum, a).unwrap();

  let mut sim = Simulator::new();
  sim.put(&mut sys, a, Bits::from_u64(3, 4));
  sim.put(&mut sys, b, Bits::from_u64(5, 4));
  assert_eq!(sys.value_u64(sum).unwrap(), 8);
  assert_eq!(sys.value_u64(masked).unwrap(), 0);

  sim.put(&mut sys, b, Bits::from_u64(6, 4));
  assert_eq!(sys.value_u64(sum).unwrap(), 9);
  assert_eq!(sys.value_u64(masked).unwrap(), 1);
}
