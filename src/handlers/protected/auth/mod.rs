// handlers/protected/auth/mod.rs - /api/auth (identity and MFA)
pub mod mfa;
pub mod whoami;

pub use whoami::whoami;
