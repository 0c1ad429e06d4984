pub mod whoami;

// Re-export handler functions for use in routing
pub use whoami::get as whoami_get;
