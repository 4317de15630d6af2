//! Application services - the operations behind each endpoint.

mod posts;

pub use posts::PostService;
