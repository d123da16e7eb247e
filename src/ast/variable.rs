//! Local variable slots and identifiers.
//!
//! This module defines the core types for representing local variables in the
//! instruction tree. Each variable has a stable identity that instruction
//! nodes reference by handle - a load and a store of the same slot point at
//! the same [`Variable`], and two variables are never equal merely because
//! they share a name or type.
//!
//! # Design Rationale
//!
//! ## Variable Identification
//!
//! Variables are identified by a simple index ([`VarId`]) into a per-function
//! [`VariableTable`]. This provides O(1) lookup and minimal memory overhead.
//! The ID encodes no semantic information - all variable metadata is stored
//! in [`Variable`].
//!
//! ## Variable Lifetime
//!
//! The table is populated once during initial tree construction. Passes never
//! create variables mid-pipeline except when explicitly introducing synthetic
//! temporaries, which mint a fresh identity through
//! [`VariableTable::declare`].
//!
//! # Thread Safety
//!
//! All types in this module are `Send` and `Sync`.

use std::fmt;

use bitflags::bitflags;

/// Unique identifier for a local variable slot.
///
/// This is a lightweight handle into the variable table, providing O(1) access
/// to variable metadata. The identifier is unique within a single
/// [`AstFunction`](crate::ast::AstFunction) but not globally unique across
/// functions.
///
/// Cloning a sub-tree copies `VarId` *references*, never variable identities:
/// inlining an initializer into N use-sites does not fork the variable.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(usize);

impl VarId {
    /// Creates a new variable identifier.
    ///
    /// # Arguments
    ///
    /// * `index` - The index into the variable table
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the underlying index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// The kind of a local variable slot.
///
/// The kind records where the slot came from in the original method body.
/// Passes consult it for display decisions only - eligibility checks are
/// based on def/use structure, not on the kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// Ordinary local variable declared in the method body.
    Local,
    /// Method parameter passed by the caller.
    Parameter,
    /// Compiler-generated temporary (stack spill, cached delegate, etc.).
    Temporary,
}

bitflags! {
    /// Attribute flags for a local variable slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VariableFlags: u32 {
        /// The variable is pinned for the duration of the method.
        const PINNED = 0x0001;
        /// The variable's address is taken somewhere in the method.
        ///
        /// Address-taken variables may be written through pointers, so
        /// passes that reason about defining writes must treat them
        /// conservatively.
        const ADDRESS_TAKEN = 0x0002;
    }
}

/// A local variable slot with a stable identity.
///
/// Multiple instruction nodes reference the same `Variable` through its
/// [`VarId`]; the descriptor itself is stored once in the function's
/// [`VariableTable`].
#[derive(Debug, Clone)]
pub struct Variable {
    /// Best-effort display name. Never guaranteed unique or original.
    name: Option<String>,
    /// Where this slot came from.
    kind: VariableKind,
    /// Attribute flags.
    flags: VariableFlags,
    /// Full name of the declared type.
    var_type: String,
}

impl Variable {
    /// Creates a new variable descriptor.
    ///
    /// # Arguments
    ///
    /// * `kind` - Where this slot came from
    /// * `var_type` - Full name of the declared type
    #[must_use]
    pub fn new(kind: VariableKind, var_type: impl Into<String>) -> Self {
        Self {
            name: None,
            kind,
            flags: VariableFlags::empty(),
            var_type: var_type.into(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the attribute flags.
    #[must_use]
    pub fn with_flags(mut self, flags: VariableFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Returns the display name, if one was recovered.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the variable kind.
    #[must_use]
    pub const fn kind(&self) -> VariableKind {
        self.kind
    }

    /// Returns the attribute flags.
    #[must_use]
    pub const fn flags(&self) -> VariableFlags {
        self.flags
    }

    /// Returns the full name of the declared type.
    #[must_use]
    pub fn var_type(&self) -> &str {
        &self.var_type
    }

    /// Returns `true` if the variable's address is taken.
    #[must_use]
    pub const fn is_address_taken(&self) -> bool {
        self.flags.contains(VariableFlags::ADDRESS_TAKEN)
    }

    /// Returns `true` if the variable is pinned.
    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        self.flags.contains(VariableFlags::PINNED)
    }
}

/// The per-function table of variable descriptors.
///
/// Owns every [`Variable`] of one function. A [`VarId`] is only valid for the
/// table that minted it.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    variables: Vec<Variable>,
}

impl VariableTable {
    /// Creates an empty variable table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new variable and returns its identity.
    pub fn declare(&mut self, variable: Variable) -> VarId {
        let id = VarId::new(self.variables.len());
        self.variables.push(variable);
        id
    }

    /// Mints a fresh synthetic temporary.
    ///
    /// The display name is derived from the table index - best-effort only.
    pub fn declare_temporary(&mut self, var_type: impl Into<String>) -> VarId {
        let name = format!("tmp{}", self.variables.len());
        self.declare(Variable::new(VariableKind::Temporary, var_type).with_name(name))
    }

    /// Returns the descriptor for `id`, or `None` if the handle was not
    /// minted by this table.
    #[must_use]
    pub fn get(&self, id: VarId) -> Option<&Variable> {
        self.variables.get(id.index())
    }

    /// Returns a mutable reference to the descriptor for `id`.
    pub fn get_mut(&mut self, id: VarId) -> Option<&mut Variable> {
        self.variables.get_mut(id.index())
    }

    /// Returns `true` if `id` was minted by this table.
    #[must_use]
    pub fn contains(&self, id: VarId) -> bool {
        id.index() < self.variables.len()
    }

    /// Returns the number of registered variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Returns `true` if no variables are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Returns an iterator over `(id, descriptor)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, &Variable)> {
        self.variables
            .iter()
            .enumerate()
            .map(|(i, v)| (VarId::new(i), v))
    }
}
