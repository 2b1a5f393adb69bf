//! Decorations and decoration groups.
//!
//! Decorations attach metadata to module entities. Most die together with their target, with
//! two wrinkles the dead-code-elimination pass has to honor: id-referencing decorations count
//! as uses of the id they carry, and decoration groups applied to several targets are narrowed
//! to the surviving targets instead of being deleted outright.

use crate::entity::PrimaryMap;
use crate::ir::entities::{AnyEntity, Constant, DecorationGroup, GlobalVar, Type};

/// Builtin variable semantics.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BuiltIn {
    Position,
    FragCoord,
    VertexIndex,
    GlobalInvocationId,
    LocalInvocationId,
    /// The fixed workgroup dimensions of a compute stage. Downstream consumers read this from
    /// the module unconditionally, so its target is always retained.
    WorkgroupSize,
}

/// One decoration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecorationKind {
    /// Descriptor set of a resource binding.
    DescriptorSet(u32),
    /// Binding number of a resource binding.
    Binding(u32),
    /// Interface location.
    Location(u32),
    /// Builtin semantics.
    BuiltIn(BuiltIn),
    /// Specialization constant id.
    SpecId(u32),
    /// Reduced-precision hint.
    RelaxedPrecision,
    /// Interpolation qualifier.
    Flat,
    /// Read-only memory object declaration.
    NonWritable,
    /// Alignment given by a constant id. Id-referencing: keeps the constant alive while the
    /// decorated target lives.
    AlignId(Constant),
    /// Associated counter buffer variable. Id-referencing.
    CounterBuffer(GlobalVar),
}

impl DecorationKind {
    /// The constant this decoration references, if it is id-referencing.
    pub fn referenced_constant(&self) -> Option<Constant> {
        match *self {
            Self::AlignId(c) => Some(c),
            _ => None,
        }
    }

    /// The variable this decoration references, if it is id-referencing.
    pub fn referenced_var(&self) -> Option<GlobalVar> {
        match *self {
            Self::CounterBuffer(v) => Some(v),
            _ => None,
        }
    }
}

/// A decoration applied directly to one target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    /// The decorated entity.
    pub target: AnyEntity,
    /// The decoration.
    pub kind: DecorationKind,
}

/// A decoration group: decorations shared by several targets.
#[derive(Clone, Default)]
pub struct GroupData {
    /// The decorations carried by the group.
    pub decorations: Vec<DecorationKind>,
    /// Whole-entity targets the group applies to.
    pub targets: Vec<AnyEntity>,
    /// `(struct type, member index)` targets the group applies to.
    pub member_targets: Vec<(Type, u32)>,
}

/// All annotation state of a module.
pub struct Annotations {
    /// Direct decorations.
    pub decorations: Vec<Annotation>,
    /// Decoration group arena.
    pub groups: PrimaryMap<DecorationGroup, GroupData>,
    /// Declaration order of decoration groups.
    pub group_order: Vec<DecorationGroup>,
}

impl Annotations {
    /// Create an empty annotation table.
    pub fn new() -> Self {
        Self {
            decorations: Vec::new(),
            groups: PrimaryMap::new(),
            group_order: Vec::new(),
        }
    }

    /// Decorate a target.
    pub fn decorate(&mut self, target: impl Into<AnyEntity>, kind: DecorationKind) {
        self.decorations.push(Annotation {
            target: target.into(),
            kind,
        });
    }

    /// Create a decoration group carrying `decorations`.
    pub fn make_group(&mut self, decorations: Vec<DecorationKind>) -> DecorationGroup {
        let group = self.groups.push(GroupData {
            decorations,
            targets: Vec::new(),
            member_targets: Vec::new(),
        });
        self.group_order.push(group);
        group
    }

    /// Apply a group to a whole-entity target.
    pub fn group_decorate(&mut self, group: DecorationGroup, target: impl Into<AnyEntity>) {
        self.groups[group].targets.push(target.into());
    }

    /// Apply a group to a struct member.
    pub fn group_member_decorate(&mut self, group: DecorationGroup, ty: Type, member: u32) {
        self.groups[group].member_targets.push((ty, member));
    }

    /// Is `group` still declared?
    pub fn is_group_declared(&self, group: DecorationGroup) -> bool {
        self.group_order.contains(&group)
    }

    /// The direct decorations on `target`.
    pub fn decorations_of<'a>(
        &'a self,
        target: AnyEntity,
    ) -> impl Iterator<Item = &'a DecorationKind> {
        self.decorations
            .iter()
            .filter(move |a| a.target == target)
            .map(|a| &a.kind)
    }

    /// Does `target` carry the given decoration, directly or through a group?
    pub fn has_decoration(&self, target: AnyEntity, pred: impl Fn(&DecorationKind) -> bool) -> bool {
        if self.decorations_of(target).any(&pred) {
            return true;
        }
        self.group_order.iter().any(|&g| {
            let data = &self.groups[g];
            data.targets.contains(&target) && data.decorations.iter().any(&pred)
        })
    }
}

impl Default for Annotations {
    fn default() -> Self {
        Self::new()
    }
}
