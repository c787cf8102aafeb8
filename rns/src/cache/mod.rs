mod authority;
mod resource;

pub use authority::{ExclusiveAuthorityCache, SharedAuthorityCache};
pub use resource::{ExclusiveResourceCache, SharedResourceCache};
