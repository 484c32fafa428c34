//! Submitting work to GitHub
//!
//! Opening new PRs on top of the stack and pushing existing chains.

mod create;
mod push;

pub use create::{
    CreateOptions, CreatedPr, MAX_CREATE_ATTEMPTS, create_pull_request, title_and_body,
};
pub use push::push_stack;
