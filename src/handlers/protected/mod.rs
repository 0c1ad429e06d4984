// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Route Prefix: /api/*
// Middleware: authenticate -> bind tenant -> per-route role allow-list.
// Every handler here receives a RequestContext and resolves its ScopeFilter
// from it before touching a record.
pub mod academic;
pub mod attendance;
pub mod auth;
pub mod grades;
pub mod utils;
