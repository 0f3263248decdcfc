//! Error types produced while driving sessions and writing decks.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::mesh::EntityKind;

/// Error returned when a meshing session rejects a command or query.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Returned when a command string cannot be parsed.
    #[error("cannot parse command `{command}`: {reason}")]
    InvalidCommand {
        /// The offending command.
        command: String,
        /// Why parsing failed.
        reason: String,
    },
    /// Returned when a command is syntactically valid but the session cannot
    /// execute it.
    #[error("command `{command}` is not supported: {reason}")]
    UnsupportedCommand {
        /// The offending command.
        command: String,
        /// Why execution is refused.
        reason: String,
    },
    /// Returned when a selector expression cannot be parsed.
    #[error("cannot parse selector `{selector}`: {reason}")]
    InvalidSelector {
        /// The offending selector.
        selector: String,
        /// Why parsing failed.
        reason: String,
    },
    /// Returned when an entity id does not exist in the session.
    #[error("{kind} {id} does not exist")]
    UnknownEntity {
        /// Kind of the missing entity.
        kind: EntityKind,
        /// Requested id.
        id: usize,
    },
    /// Returned when a named group cannot be found.
    #[error("group `{0}` does not exist")]
    UnknownGroup(String),
    /// Returned when a group id is stale or foreign.
    #[error("group {0} does not exist in this session")]
    UnknownGroupId(usize),
    /// Returned when a node set id does not exist.
    #[error("node set {0} does not exist")]
    UnknownNodeSet(usize),
    /// Returned when an entity must be meshed before it can be used.
    #[error("{kind} {id} has not been meshed yet")]
    NotMeshed {
        /// Kind of the unmeshed entity.
        kind: EntityKind,
        /// Id of the unmeshed entity.
        id: usize,
    },
    /// Returned when a surface cannot be meshed with the mapped scheme.
    #[error("surface {id} cannot be meshed with the mapped scheme: {reason}")]
    NotMappable {
        /// Id of the offending surface.
        id: usize,
        /// Why the mapped scheme does not apply.
        reason: String,
    },
    /// Returned when opposite curves of a mapped surface disagree on
    /// interval counts.
    #[error(
        "surface {surface}: opposite curves {first} and {second} have {first_intervals} and \
         {second_intervals} intervals"
    )]
    IntervalMismatch {
        /// Id of the surface being meshed.
        surface: usize,
        /// First curve of the opposite pair.
        first: usize,
        /// Second curve of the opposite pair.
        second: usize,
        /// Intervals on the first curve.
        first_intervals: usize,
        /// Intervals on the second curve.
        second_intervals: usize,
    },
    /// Returned when a group resolves to no mesh nodes or elements at all.
    #[error("group {0} selects nothing; check the selector and mesh state")]
    EmptyGroup(usize),
    /// Returned when a block would mix element shapes.
    #[error("element block expects {expected} elements but the group contains {found}")]
    MixedBlockShapes {
        /// Shape requested for the block.
        expected: crate::mesh::ElementShape,
        /// Conflicting shape found in the group.
        found: crate::mesh::ElementShape,
    },
    /// Returned when a tracked command did not create exactly one entity.
    #[error("expected `{command}` to create exactly one {kind}, found {count}")]
    AmbiguousCreation {
        /// The executed command.
        command: String,
        /// Tracked entity kind.
        kind: EntityKind,
        /// Number of entities actually created.
        count: usize,
    },
}

/// Error returned when writing a solver deck.
#[derive(Debug, Error)]
pub enum DeckError {
    /// Returned when the output file cannot be written.
    #[error("cannot write deck to {path}")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
    /// Returned when YAML serialization fails.
    #[error("cannot serialize deck to YAML")]
    Yaml(#[from] serde_yaml::Error),
    /// Returned when an element block references an element id missing from
    /// the model.
    #[error("block {block} references element {element}, which does not exist")]
    DanglingElement {
        /// Block holding the reference.
        block: usize,
        /// Missing element id.
        element: usize,
    },
}

/// Error returned by case generators.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Returned when the meshing session fails.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Returned when deck emission fails.
    #[error(transparent)]
    Deck(#[from] DeckError),
    /// Returned when the README or output directory cannot be written.
    #[error("cannot write {path}")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
}
