//! Pure computations behind the handlers: no I/O, no database.

pub mod gamification;
pub mod grades;
pub mod ordering;
