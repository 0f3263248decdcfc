//! Typed boundary conditions for node sets.
//!
//! The solver consumes conditions as `NUMDOF/ONOFF/VAL/FUNCT` lines for
//! Dirichlet and Neumann sets and as key/value pairs for contact interfaces.
//! Generators build them through these types instead of hand-writing the
//! strings.

use serde::Serialize;
use std::fmt;

/// Per degree-of-freedom constraint for Dirichlet and Neumann conditions.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DofConstraint {
    /// Activation flag per degree of freedom.
    onoff: Vec<bool>,
    /// Prescribed value (or load-scale) per degree of freedom.
    values: Vec<f64>,
    /// Id of the space-time function driving each degree of freedom;
    /// zero means constant.
    functions: Vec<usize>,
}

impl DofConstraint {
    /// A constraint over `ndof` degrees of freedom with everything inactive.
    #[must_use]
    pub fn free(ndof: usize) -> Self {
        Self {
            onoff: vec![false; ndof],
            values: vec![0.0; ndof],
            functions: vec![0; ndof],
        }
    }

    /// A constraint that clamps all `ndof` degrees of freedom to zero.
    #[must_use]
    pub fn fixed(ndof: usize) -> Self {
        Self {
            onoff: vec![true; ndof],
            ..Self::free(ndof)
        }
    }

    /// Activate one degree of freedom with a value scaled by a space-time
    /// function.
    ///
    /// # Panics
    ///
    /// Panics when `dof` is out of range; constraint arity is fixed at
    /// construction.
    #[must_use]
    pub fn driven(mut self, dof: usize, value: f64, function: usize) -> Self {
        assert!(dof < self.onoff.len(), "dof index out of range: {dof}");
        self.onoff[dof] = true;
        self.values[dof] = value;
        self.functions[dof] = function;
        self
    }

    /// Number of degrees of freedom covered by the constraint.
    #[must_use]
    pub fn ndof(&self) -> usize {
        self.onoff.len()
    }

    /// Activation flags.
    #[must_use]
    pub fn onoff(&self) -> &[bool] {
        &self.onoff
    }

    /// Prescribed values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Driving function ids.
    #[must_use]
    pub fn functions(&self) -> &[usize] {
        &self.functions
    }
}

impl fmt::Display for DofConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NUMDOF {} ONOFF", self.ndof())?;
        for flag in &self.onoff {
            write!(f, " {}", u8::from(*flag))?;
        }
        f.write_str(" VAL")?;
        for value in &self.values {
            write!(f, " {value}")?;
        }
        f.write_str(" FUNCT")?;
        for function in &self.functions {
            write!(f, " {function}")?;
        }
        Ok(())
    }
}

/// Which side of a contact interface the tagged nodes form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ContactSide {
    /// The deformable slave side.
    Slave,
    /// The master side.
    Master,
}

impl fmt::Display for ContactSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slave => f.write_str("Slave"),
            Self::Master => f.write_str("Master"),
        }
    }
}

/// Initial state of a contact interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ContactInitialization {
    /// The interface starts out of contact.
    Inactive,
    /// The interface starts in contact.
    Active,
}

impl fmt::Display for ContactInitialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => f.write_str("Inactive"),
            Self::Active => f.write_str("Active"),
        }
    }
}

/// Solid-to-solid contact interface condition.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContactCondition {
    /// Interface number shared between the paired sides.
    pub interface_id: usize,
    /// Role of the tagged nodes.
    pub side: ContactSide,
    /// Initial interface state.
    pub initialization: ContactInitialization,
}

impl fmt::Display for ContactCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InterfaceID {} Side {} Initialization {}",
            self.interface_id, self.side, self.initialization
        )
    }
}

/// Boundary condition attached to a node set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum BoundaryCondition {
    /// Prescribed displacement.
    Dirichlet(DofConstraint),
    /// Prescribed traction.
    Neumann(DofConstraint),
    /// Contact interface membership.
    Contact(ContactCondition),
}

impl BoundaryCondition {
    /// The condition keyword the deck section name is built from.
    #[must_use]
    pub fn section_keyword(&self) -> &'static str {
        match self {
            Self::Dirichlet(_) => "DIRICH",
            Self::Neumann(_) => "NEUMANN",
            Self::Contact(_) => "SOLID TO SOLID CONTACT",
        }
    }

    /// Rendered description following the `E <id>` prefix in the deck.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Dirichlet(constraint) | Self::Neumann(constraint) => constraint.to_string(),
            Self::Contact(contact) => contact.to_string(),
        }
    }
}
