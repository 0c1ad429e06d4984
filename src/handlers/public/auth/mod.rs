// handlers/public/auth - Token acquisition, no authentication required
pub mod login;

pub use login::post as login_post;
