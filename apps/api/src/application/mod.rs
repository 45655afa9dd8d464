pub mod drafter;
pub mod prompts;
