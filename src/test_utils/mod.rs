pub mod app_state_builder;
pub mod factories;
pub mod payment_mocks;

pub use app_state_builder::TestAppStateBuilder;
