pub mod inspect_server_blocks;

pub use inspect_server_blocks::InspectServerBlocksUseCase;
