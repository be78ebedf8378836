mod owner;
pub mod handlers;
pub mod response;
mod routes;

pub use owner::{OwnerId, OWNER_HEADER};
pub use routes::create_router;
