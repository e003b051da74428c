pub mod config;

pub use config::InspectServerBlocksUseCase;
