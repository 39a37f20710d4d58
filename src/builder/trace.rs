use std::collections::{HashSet, VecDeque};

use crate::builder::naming::NameTable;
use crate::builder::{namify, Design};
use crate::error::{Error, Result};
use crate::ir::block::{Always, Sensitivity};
use crate::ir::expr::Expr;
use crate::ir::module::Module;
use crate::ir::node::*;
use crate::ir::signal::Logic;

/// Which way a flood-fill edge is being followed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Dir {
  /// Through source connections, toward drivers.
  Up,
  /// Through destination connections, toward readers.
  Down,
}

impl Design {
  /// Trace the signal graph of `top`, discovering containment.
  ///
  /// Sub-modules are never registered by hand: a module is a sub-module of
  /// `top` exactly when its ports are wired into `top`'s signal graph. The
  /// walk runs upstream from output ports and downstream from input ports,
  /// claims every plain signal it visits, adopts foreign ports' modules,
  /// and recurses into them. Termination is guaranteed because a signal's
  /// parent is set at most once and revisited edges short-circuit.
  pub fn build(&mut self, top: ModuleNode) -> Result<()> {
    let name = namify(top.as_ref(self).get_name());
    self.build_module(top)?;
    self
      .get_mut::<Module>(top.upcast())?
      .get_mut()
      .instance_name
      .get_or_insert(name);
    Ok(())
  }

  fn build_module(&mut self, module: ModuleNode) -> Result<()> {
    let mname = module.as_ref(self).get_name().to_string();
    if module.as_ref(self).has_built() {
      return Err(Error::AlreadyBuilt { module: mname });
    }
    log::debug!("building module {}", mname);
    self.flood(module)?;

    let children = module.as_ref(self).get().submodules.clone();
    for child in &children {
      self.build_module((*child).into())?;
    }

    // Unique instance names within this parent.
    let mut names = NameTable::new();
    for child in &children {
      let base = namify(child.as_ref::<Module>(self).unwrap().get_name());
      let unique = names.uniquify(&base);
      self.get_mut::<Module>(*child)?.get_mut().instance_name = Some(unique);
    }

    self.get_mut::<Module>(module.upcast())?.get_mut().has_built = true;
    Ok(())
  }

  /// The two-direction flood-fill bounded at module boundaries.
  fn flood(&mut self, module: ModuleNode) -> Result<()> {
    let m = module.upcast();
    let mut visited: HashSet<(BaseNode, Dir)> = HashSet::new();
    let mut work: VecDeque<(BaseNode, Dir)> = VecDeque::new();

    {
      let module = module.as_ref(self);
      for (_, port) in module.output_iter() {
        work.push_back((port.upcast(), Dir::Up));
      }
      for (_, port) in module.input_iter() {
        work.push_back((port.upcast(), Dir::Down));
      }
    }

    while let Some((sig, dir)) = work.pop_front() {
      if !visited.insert((sig, dir)) {
        continue;
      }
      match dir {
        Dir::Up => {
          let source = Logic::downcast(&self.slab, sig).unwrap().get_source();
          if let Some(driver) = source {
            self.walk_driver(m, driver, &mut work)?;
          }
        }
        Dir::Down => {
          let dests = Logic::downcast(&self.slab, sig).unwrap().dests.clone();
          for reader in dests {
            self.walk_reader(m, reader, &mut work)?;
          }
        }
      }
    }
    Ok(())
  }

  /// Step upstream across one driver node onto the signals feeding it.
  fn walk_driver(
    &mut self,
    m: BaseNode,
    driver: BaseNode,
    work: &mut VecDeque<(BaseNode, Dir)>,
  ) -> Result<()> {
    match driver.get_kind() {
      NodeKind::Const => Ok(()),
      NodeKind::Logic => self.classify(m, driver, Dir::Up, work),
      NodeKind::Expr => {
        let operands: Vec<_> = Expr::downcast(&self.slab, driver)
          .unwrap()
          .operand_iter()
          .filter(|x| x.get_kind() == NodeKind::Logic)
          .collect();
        for operand in operands {
          self.classify(m, operand, Dir::Up, work)?;
        }
        Ok(())
      }
      NodeKind::Always => {
        self.claim_block(m, driver)?;
        let block = Always::downcast(&self.slab, driver).unwrap();
        let mut upstream: Vec<_> = block.read_iter().collect();
        if let Sensitivity::PosEdge(clk) = block.get_sensitivity() {
          upstream.push(clk);
        }
        for read in upstream {
          self.classify(m, read, Dir::Up, work)?;
        }
        Ok(())
      }
      kind => unreachable!("{:?} cannot drive a signal", kind),
    }
  }

  /// Step downstream across one reader node onto the signals it produces.
  fn walk_reader(
    &mut self,
    m: BaseNode,
    reader: BaseNode,
    work: &mut VecDeque<(BaseNode, Dir)>,
  ) -> Result<()> {
    match reader.get_kind() {
      NodeKind::Logic => self.classify(m, reader, Dir::Down, work),
      NodeKind::Expr => {
        let result = Expr::downcast(&self.slab, reader).unwrap().get_result();
        self.classify(m, result, Dir::Down, work)
      }
      NodeKind::Always => {
        self.claim_block(m, reader)?;
        let targets: Vec<_> = Always::downcast(&self.slab, reader)
          .unwrap()
          .target_iter()
          .collect();
        for target in targets {
          self.classify(m, target, Dir::Down, work)?;
        }
        Ok(())
      }
      kind => unreachable!("{:?} cannot read a signal", kind),
    }
  }

  /// Decide what a visited signal is to the module being traced: own port,
  /// already-claimed internal, foreign port (adopt its module), fresh
  /// internal (claim it), or a boundary violation.
  fn classify(
    &mut self,
    m: BaseNode,
    sig: BaseNode,
    dir: Dir,
    work: &mut VecDeque<(BaseNode, Dir)>,
  ) -> Result<()> {
    let (parent, is_input, is_output) = {
      let logic = Logic::downcast(&self.slab, sig).unwrap();
      (logic.get_parent(), logic.is_input(), logic.is_output())
    };
    match parent {
      Some(p) if p == m => {
        // Own port walks stop here; their own seeds cover the other side.
        // Claimed internals keep flooding, the visited set deduplicates.
        if !(is_input || is_output) {
          work.push_back((sig, Dir::Up));
          work.push_back((sig, Dir::Down));
        }
        Ok(())
      }
      Some(s) => match (is_input, is_output, dir) {
        // A foreign output found upstream or a foreign input found
        // downstream marks a sub-module boundary.
        (_, true, Dir::Up) | (true, _, Dir::Down) => self.adopt(m, s, work),
        // Reading an ancestor's input port directly is reachable and legal;
        // any other polarity is a violation.
        (true, _, Dir::Up) => {
          if self.is_ancestor_of(s, m) {
            Ok(())
          } else {
            Err(self.port_violation(m, sig))
          }
        }
        (_, true, Dir::Down) => Err(self.port_violation(m, sig)),
        // A signal interior to another module reached without crossing a
        // port at all.
        _ => Err(self.port_violation(m, sig)),
      },
      None => {
        Logic::downcast_mut(&mut self.slab, sig).unwrap().set_parent(m);
        self
          .get_mut::<Module>(m)?
          .get_mut()
          .internals
          .insert(sig);
        log::debug!("claimed {} into {}", sig.to_string(self), m.to_string(self));
        work.push_back((sig, Dir::Up));
        work.push_back((sig, Dir::Down));
        Ok(())
      }
    }
  }

  /// Adopt `s` as a sub-module of `m`, then continue the walk through the
  /// outer side of `s`'s ports so nothing strictly interior to `s` is
  /// claimed by `m`.
  fn adopt(&mut self, m: BaseNode, s: BaseNode, work: &mut VecDeque<(BaseNode, Dir)>) -> Result<()> {
    {
      let sub = Module::downcast(&self.slab, s).unwrap();
      match sub.get_parent() {
        Some(p) if p == m => return Ok(()),
        Some(_) => {
          return Err(Error::PortViolation {
            signal: sub.get_name().to_string(),
            path: format!(
              "module already contained elsewhere while tracing {}",
              m.to_string(self)
            ),
          })
        }
        None => {}
      }
    }
    Module::downcast_mut(&mut self.slab, s).unwrap().set_parent(m);
    self.get_mut::<Module>(m)?.get_mut().submodules.push(s);
    log::debug!("adopted {} into {}", s.to_string(self), m.to_string(self));

    let (input_sources, output_ports) = {
      let sub = s.as_ref::<Module>(self).unwrap();
      let input_sources: Vec<_> = sub
        .input_iter()
        .filter_map(|(_, port)| port.get_source())
        .collect();
      let output_ports: Vec<_> = sub.output_iter().map(|(_, port)| port.upcast()).collect();
      (input_sources, output_ports)
    };
    // The sources of the sub-module's inputs and the readers of its outputs
    // live on the parent's side of the boundary.
    for src in input_sources {
      self.walk_driver(m, src, work)?;
    }
    for port in output_ports {
      let dests = Logic::downcast(&self.slab, port).unwrap().dests.clone();
      for reader in dests {
        self.walk_reader(m, reader, work)?;
      }
    }
    Ok(())
  }

  fn claim_block(&mut self, m: BaseNode, block: BaseNode) -> Result<()> {
    let parent = Always::downcast(&self.slab, block).unwrap().get_parent();
    match parent {
      Some(p) if p == m => Ok(()),
      Some(_) => Err(Error::PortViolation {
        signal: block.to_string(self),
        path: format!(
          "always block spans module boundaries while tracing {}",
          m.to_string(self)
        ),
      }),
      None => {
        Always::downcast_mut(&mut self.slab, block).unwrap().set_parent(m);
        self.get_mut::<Module>(m)?.get_mut().blocks.insert(block);
        Ok(())
      }
    }
  }

  fn is_ancestor_of(&self, candidate: BaseNode, m: BaseNode) -> bool {
    let mut runner = Module::downcast(&self.slab, m).unwrap().get_parent();
    while let Some(p) = runner {
      if p == candidate {
        return true;
      }
      runner = Module::downcast(&self.slab, p).unwrap().get_parent();
    }
    false
  }

  fn port_violation(&self, m: BaseNode, sig: BaseNode) -> Error {
    Error::PortViolation {
      signal: sig.to_string(self),
      path: m.to_string(self),
    }
  }
}
