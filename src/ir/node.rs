use std::ops::Deref;

use paste::paste;

use crate::builder::Design;
use crate::ir::block::Always;
use crate::ir::expr::Expr;
use crate::ir::module::Module;
use crate::ir::signal::{Const, Logic};

/// Every IR element lives in the design's slab and is addressed by a
/// `BaseNode`, a `(kind, key)` pair. Handles are cheap to copy and never
/// dangle as long as the element is not disposed.
pub trait IsElement: Sized {
  fn upcast(&self) -> BaseNode;
  fn set_key(&mut self, key: usize);
  fn get_key(&self) -> usize;
  fn into_node(key: usize) -> BaseNode;
  fn downcast(slab: &slab::Slab<Element>, node: BaseNode) -> Result<&Self, String>;
  fn downcast_mut(slab: &mut slab::Slab<Element>, node: BaseNode) -> Result<&mut Self, String>;
}

/// Elements that belong to a parent element in the ownership tree.
pub trait Parented {
  fn get_parent(&self) -> Option<BaseNode>;
  fn set_parent(&mut self, parent: BaseNode);
}

pub trait Referencable<'a>: IsElement {
  type Ref;
  fn reference(sys: &'a Design, node: BaseNode) -> Result<Self::Ref, String>;
}

pub trait Mutable<'a>: IsElement {
  type Mut;
  fn mutator(sys: &'a mut Design, node: BaseNode) -> Result<Self::Mut, String>;
}

macro_rules! emit_elem_impl {
  ($name:ident) => {
    paste! {

      impl From<$name> for Element {
        fn from(x: $name) -> Element {
          Element::$name(Box::new(x))
        }
      }

      impl IsElement for $name {
        fn set_key(&mut self, key: usize) {
          self.key = key;
        }

        fn get_key(&self) -> usize {
          self.key
        }

        fn upcast(&self) -> BaseNode {
          BaseNode::new(NodeKind::$name, self.key)
        }

        fn into_node(key: usize) -> BaseNode {
          BaseNode::new(NodeKind::$name, key)
        }

        fn downcast(slab: &slab::Slab<Element>, node: BaseNode) -> Result<&$name, String> {
          if let NodeKind::$name = node.get_kind() {
            let entry = slab.get(node.get_key());
            if let Some(Element::$name(res)) = entry {
              return Ok(res);
            }
          }
          Err(format!(
            "downcast: expecting {}, but got {:?}",
            stringify!($name),
            node,
          ))
        }

        fn downcast_mut(
          slab: &mut slab::Slab<Element>,
          node: BaseNode,
        ) -> Result<&mut $name, String> {
          if let NodeKind::$name = node.get_kind() {
            let entry = slab.get_mut(node.get_key());
            if let Some(Element::$name(res)) = entry {
              return Ok(res);
            }
          }
          Err(format!(
            "downcast: expecting {}, but got {:?}",
            stringify!($name),
            node,
          ))
        }
      }

      /// A borrowed view of the element together with the owning design, so
      /// view methods can traverse neighboring elements.
      #[derive(Clone)]
      pub struct [<$name Ref>]<'a> {
        pub(crate) sys: &'a Design,
        pub(crate) node: BaseNode,
      }

      impl<'a> [<$name Ref>]<'a> {
        pub fn get(&self) -> &'a $name {
          $name::downcast(&self.sys.slab, self.node).unwrap()
        }

        pub fn upcast(&self) -> BaseNode {
          self.node
        }
      }

      impl Deref for [<$name Ref>]<'_> {
        type Target = $name;

        fn deref(&self) -> &Self::Target {
          self.get()
        }
      }

      /// A mutable view. Holds the design mutably, so only one can exist at
      /// a time; element mutations route through `get_mut`.
      pub struct [<$name Mut>]<'a> {
        pub(crate) sys: &'a mut Design,
        pub(crate) node: BaseNode,
      }

      impl [<$name Mut>]<'_> {
        pub fn get(&self) -> &$name {
          $name::downcast(&self.sys.slab, self.node).unwrap()
        }

        pub fn get_mut(&mut self) -> &mut $name {
          $name::downcast_mut(&mut self.sys.slab, self.node).unwrap()
        }

        pub fn upcast(&self) -> BaseNode {
          self.node
        }
      }

      impl<'a> Referencable<'a> for $name {
        type Ref = [<$name Ref>]<'a>;

        fn reference(sys: &'a Design, node: BaseNode) -> Result<Self::Ref, String> {
          if let NodeKind::$name = node.get_kind() {
            Ok([<$name Ref>] { sys, node })
          } else {
            Err(format!("expecting {}, but {:?} is given", stringify!($name), node))
          }
        }
      }

      impl<'a> Mutable<'a> for $name {
        type Mut = [<$name Mut>]<'a>;

        fn mutator(sys: &'a mut Design, node: BaseNode) -> Result<Self::Mut, String> {
          if let NodeKind::$name = node.get_kind() {
            Ok([<$name Mut>] { sys, node })
          } else {
            Err(format!("expecting {}, but {:?} is given", stringify!($name), node))
          }
        }
      }
    }
  };
}

macro_rules! register_elements {
  ($($elem:ident),* $(,)?) => {
    $( emit_elem_impl!($elem); )*

    #[derive(Clone, Debug, Eq, PartialEq, Hash, Copy, PartialOrd, Ord)]
    pub enum NodeKind {
      $($elem,)*
      Unknown,
    }

    /// The slab entry. Boxed so the entries stay small regardless of the
    /// element payloads.
    pub enum Element {
      $($elem(Box<$elem>),)*
    }

    paste! {
      $(
        /// A typed handle carrying the element kind in the type system.
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
        pub struct [<$elem Node>] {
          key: usize,
        }

        impl From<BaseNode> for [<$elem Node>] {
          fn from(x: BaseNode) -> [<$elem Node>] {
            assert_eq!(x.get_kind(), NodeKind::$elem);
            [<$elem Node>] { key: x.get_key() }
          }
        }

        impl From<[<$elem Node>]> for BaseNode {
          fn from(x: [<$elem Node>]) -> BaseNode {
            BaseNode::new(NodeKind::$elem, x.key)
          }
        }

        impl [<$elem Node>] {
          pub fn as_ref<'a>(&self, sys: &'a Design) -> [<$elem Ref>]<'a> {
            $elem::reference(sys, BaseNode::new(NodeKind::$elem, self.key)).unwrap()
          }

          pub fn upcast(&self) -> BaseNode {
            BaseNode::new(NodeKind::$elem, self.key)
          }
        }
      )*
    }
  };
}

register_elements!(Module, Logic, Expr, Always, Const);

/// An untyped element handle.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Copy, PartialOrd, Ord)]
pub struct BaseNode {
  kind: NodeKind,
  key: usize,
}

impl BaseNode {
  pub fn new(kind: NodeKind, key: usize) -> Self {
    Self { kind, key }
  }

  pub fn unknown() -> Self {
    Self::new(NodeKind::Unknown, 0)
  }

  pub fn get_key(&self) -> usize {
    self.key
  }

  pub fn get_kind(&self) -> NodeKind {
    self.kind
  }

  pub fn is_unknown(&self) -> bool {
    self.kind == NodeKind::Unknown
  }

  pub fn as_ref<'a, T: Referencable<'a>>(&self, sys: &'a Design) -> Result<T::Ref, String> {
    T::reference(sys, *self)
  }

  pub fn as_mut<'a, T: Mutable<'a>>(&self, sys: &'a mut Design) -> Result<T::Mut, String> {
    T::mutator(sys, *self)
  }

  /// The bit width of a value-carrying node. `None` for modules and blocks.
  pub fn get_width(&self, sys: &Design) -> Option<usize> {
    match self.kind {
      NodeKind::Logic => Some(self.as_ref::<Logic>(sys).unwrap().get_width()),
      NodeKind::Const => Some(self.as_ref::<Const>(sys).unwrap().get_value().width()),
      NodeKind::Expr => Some(self.as_ref::<Expr>(sys).unwrap().get_width()),
      NodeKind::Always | NodeKind::Module => None,
      NodeKind::Unknown => unreachable!("unknown node"),
    }
  }

  /// A short human-readable label for diagnostics.
  pub fn to_string(&self, sys: &Design) -> String {
    match self.kind {
      NodeKind::Module => self.as_ref::<Module>(sys).unwrap().get_name().to_string(),
      NodeKind::Logic => self.as_ref::<Logic>(sys).unwrap().display_name(),
      NodeKind::Const => format!("{:?}", self.as_ref::<Const>(sys).unwrap().get_value()),
      NodeKind::Expr => format!("_e{}", self.key),
      NodeKind::Always => format!("always_{}", self.key),
      NodeKind::Unknown => "<unknown>".into(),
    }
  }
}
