// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Route Prefix: no /api prefix (e.g. /auth/login)
// Middleware: none; the login service applies its own rate limiting
pub mod auth;
