use std::fmt::Formatter;

use thiserror::Error;

/// An error that is localised to a particular instruction address in the
/// program being executed or transformed.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Located<E>
where
    E: Clone,
{
    /// The address of the instruction at which the error occurred.
    pub location: u32,

    /// The error data.
    pub payload: E,
}

/// Displays the error together with the instruction address at which it
/// occurred.
impl<E> std::fmt::Display for Located<E>
where
    E: std::fmt::Display + Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.location, self.payload)
    }
}

/// A trait for types that can have an instruction address attached to them.
pub trait Locatable
where
    Self: Sized,
{
    /// The return type with the attached instruction address.
    type Located;

    /// Attach the instruction address described by `address` to the error.
    fn locate(self, address: u32) -> Self::Located;
}

/// A blanket implementation that allows for attaching an address to any
/// result.
impl<T, E> Locatable for Result<T, E>
where
    E: std::error::Error + Clone,
{
    type Located = Result<T, Located<E>>;

    fn locate(self, address: u32) -> Self::Located {
        self.map_err(|e| Located {
            location: address,
            payload:  e,
        })
    }
}

/// An error that is a collection of errors.
///
/// Errors are kept in the order in which they were added to the container.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Errors<E> {
    payloads: Vec<E>,
}

impl<E> Errors<E> {
    /// Creates a new, empty container for errors.
    #[must_use]
    pub fn new() -> Self {
        let payloads = vec![];
        Self { payloads }
    }

    /// Gets the errors contained within this error.
    #[must_use]
    pub fn payloads(&self) -> &[E] {
        self.payloads.as_slice()
    }

    /// Gets the number of errors in the container.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Checks if the errors container is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Errors<E>
where
    E: std::error::Error,
{
    /// Adds the provided `error` to the container.
    pub fn add(&mut self, error: E) {
        self.payloads.push(error);
    }

    /// Adds multiple errors to the container at once.
    pub fn add_many(&mut self, errors: impl Into<Vec<E>>) {
        self.payloads.extend(errors.into());
    }
}

impl<E> Errors<Located<E>>
where
    E: std::error::Error + Clone,
{
    /// Adds an error `payload` at the specified instruction `address`.
    pub fn add_located(&mut self, address: u32, payload: E) {
        let error = Located {
            location: address,
            payload,
        };
        self.payloads.push(error);
    }
}

/// The default errors container is one containing no errors.
impl<E> Default for Errors<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Allow conversion from any error type to a container of errors.
impl<E> From<E> for Errors<E>
where
    E: std::error::Error,
{
    fn from(value: E) -> Self {
        let mut errors = Self::default();
        errors.add(value);
        errors
    }
}

/// Allow conversion from the errors container to a vector of errors.
impl<E> From<Errors<E>> for Vec<E>
where
    E: std::error::Error,
{
    fn from(value: Errors<E>) -> Self {
        value.payloads
    }
}

/// Allow conversion from a vector of errors to the errors container.
impl<E> From<Vec<E>> for Errors<E>
where
    E: std::error::Error,
{
    fn from(value: Vec<E>) -> Self {
        Self { payloads: value }
    }
}

/// Displays the errors in the sequence in which they occur in the container.
///
/// It has a header specifying how many errors occurred, and then prints one
/// error per line after that, so where errors did occur the output of `fmt`
/// is multi-line.
impl<E> std::fmt::Display for Errors<E>
where
    E: std::fmt::Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.payloads.is_empty() {
            write!(f, "Encountered no errors")?;
        } else {
            writeln!(f, "Encountered {} errors:", self.payloads.len())?;
            for error in &self.payloads {
                writeln!(f, "{error}")?;
            }
        }

        Ok(())
    }
}
