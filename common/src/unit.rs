//! Marker types distinguishing kinds of [`DateTimeOf`] values.
//!
//! [`DateTimeOf`]: crate::DateTimeOf

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing the last modification of an entity.
#[derive(Clone, Copy, Debug)]
pub struct Modification;

/// Marker type describing an entity deletion.
#[derive(Clone, Copy, Debug)]
pub struct Deletion;

/// Marker type describing the last activity of an entity.
#[derive(Clone, Copy, Debug)]
pub struct Activity;

/// Marker type describing an issuance of something (a token, for example).
#[derive(Clone, Copy, Debug)]
pub struct Issuance;

/// Marker type describing an expiration of something.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;
