// handlers/mod.rs - Handlers split by security tier
//
// Public (no auth) → Protected (platform JWT, /api/*)
pub mod protected;
pub mod public;
