pub mod containers;
pub mod resolve;
pub mod state;
