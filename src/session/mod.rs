//! The meshing session seam.
//!
//! A [`MeshingSession`] is the opaque command-executing, entity-querying
//! service the generators drive. The crate ships a native implementation in
//! [`native`]; tests are free to substitute recording fakes.

pub mod mapped;
pub mod native;

use std::collections::BTreeSet;

use crate::bc::BoundaryCondition;
use crate::errors::SessionError;
use crate::mesh::{ElementShape, EntityKind, MeshModel};

/// Handle to a group of entities formed by a selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(pub usize);

/// Handle to a registered node set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeSetId(pub usize);

/// Handle to a registered element block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

/// A command-executing, entity-querying meshing service.
///
/// Implementations own all geometry and meshing computation; callers only
/// issue commands, form groups and read the results back.
pub trait MeshingSession {
    /// Execute a single command.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the command cannot be parsed or
    /// executed.
    fn cmd(&mut self, command: &str) -> Result<(), SessionError>;

    /// Ids of all live entities of a kind, ascending.
    fn entity_ids(&self, kind: EntityKind) -> Vec<usize>;

    /// Id of the most recently created entity of a kind.
    fn last_id(&self, kind: EntityKind) -> Option<usize>;

    /// Form a group from a selector expression, optionally naming it so
    /// later selectors can reference it with `in <name>`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the selector cannot be parsed or
    /// references unknown entities or groups.
    fn group(&mut self, selector: &str, name: Option<&str>) -> Result<GroupId, SessionError>;

    /// Register a named node set over a group and attach a boundary
    /// condition to it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the group is unknown or contains
    /// unmeshed entities.
    fn add_node_set(
        &mut self,
        group: GroupId,
        name: &str,
        condition: BoundaryCondition,
    ) -> Result<NodeSetId, SessionError>;

    /// Assign every element of the entities in a group to a new block.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the group is unknown or contains
    /// unmeshed entities.
    fn add_element_block(
        &mut self,
        group: GroupId,
        shape: ElementShape,
        material: usize,
        description: &str,
    ) -> Result<BlockId, SessionError>;

    /// Total number of mesh nodes.
    fn node_count(&self) -> usize;

    /// Total number of elements.
    fn element_count(&self) -> usize;

    /// Ids of all registered node sets, ascending.
    fn node_set_ids(&self) -> Vec<usize>;

    /// Number of nodes in a node set.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownNodeSet`] for unknown ids.
    fn node_set_node_count(&self, id: usize) -> Result<usize, SessionError>;

    /// Snapshot the meshed model for deck emission.
    fn mesh_model(&self) -> MeshModel;
}

/// Execute a command and report the entity ids it created.
///
/// The ids of `kind` are collected before and after the command; the
/// difference is the set of new entities, returned sorted.
///
/// # Errors
///
/// Propagates the session's error when the command fails.
pub fn tracked_cmd<S: MeshingSession + ?Sized>(
    session: &mut S,
    command: &str,
    kind: EntityKind,
) -> Result<Vec<usize>, SessionError> {
    let before: BTreeSet<usize> = session.entity_ids(kind).into_iter().collect();
    session.cmd(command)?;
    Ok(session
        .entity_ids(kind)
        .into_iter()
        .filter(|id| !before.contains(id))
        .collect())
}

/// Execute a command expected to create exactly one entity of `kind` and
/// return its id.
///
/// # Errors
///
/// Returns [`SessionError::AmbiguousCreation`] when the command created zero
/// or several entities, and propagates execution failures.
pub fn tracked_cmd_single<S: MeshingSession + ?Sized>(
    session: &mut S,
    command: &str,
    kind: EntityKind,
) -> Result<usize, SessionError> {
    let created = tracked_cmd(session, command, kind)?;
    match created.as_slice() {
        [id] => Ok(*id),
        _ => Err(SessionError::AmbiguousCreation {
            command: command.to_owned(),
            kind,
            count: created.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::native::NativeSession;

    #[test]
    fn tracked_cmd_reports_created_ids() {
        let mut session = NativeSession::new();
        let first = tracked_cmd(&mut session, "create vertex 0 0 0", EntityKind::Vertex)
            .expect("command executes");
        assert_eq!(first, vec![1]);
        assert_eq!(session.last_id(EntityKind::Vertex), Some(1));
        assert_eq!(session.last_id(EntityKind::Surface), None);

        let none = tracked_cmd(&mut session, "imprint all", EntityKind::Vertex)
            .expect("command executes");
        assert!(none.is_empty());
    }

    #[test]
    fn tracked_cmd_single_rejects_ambiguity() {
        let mut session = NativeSession::new();
        let brick = tracked_cmd_single(&mut session, "brick x 1 y 1 z 1", EntityKind::Volume)
            .expect("one volume created");
        assert_eq!(brick, 1);

        // A brick also registers its six boundary faces, so tracking
        // surfaces is ambiguous.
        let error = tracked_cmd_single(&mut session, "brick x 2 y 2 z 2", EntityKind::Surface)
            .expect_err("six faces created");
        assert!(matches!(
            error,
            SessionError::AmbiguousCreation { count: 6, .. }
        ));
    }
}
