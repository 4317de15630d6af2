//! Domain entities - the core business objects.

mod input;
mod page;
mod post;
mod user;

pub use input::{InputMode, PostInput, TITLE_MAX_CHARS, ValidatedPost, parse_datetime};
pub use page::{Page, PageRequest};
pub use post::{ActivePosts, AuthoredPost, POSTS_PER_PAGE, Post, PostState};
pub use user::User;
