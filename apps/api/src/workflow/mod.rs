pub mod controller;
pub mod handlers;
pub mod notice;
pub mod state;
pub mod sync;

pub use controller::WorkflowController;
