// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) -> Protected (bearer token + tenant binding + role check)
pub mod protected;
pub mod public;
