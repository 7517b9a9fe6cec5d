pub mod auth;
pub mod manual_recipe;

mod router;
pub use router::get_router;
