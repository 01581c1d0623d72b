//! Robot-level command management.
//!
//! Provides:
//! - Command data structures and typed inputs/outputs
//! - The command lifecycle state machine with cooperative cancellation
//! - The command repository contract and an in-memory implementation

pub mod command;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod payload;
pub mod repository;

// Re-exports
pub use command::{Command, CommandId, CommandType, Source, Status};
pub use error::CommandError;
pub use lifecycle::CancelableCommand;
pub use memory::MemoryCommandRepository;
pub use payload::{
    BottomObstacleTracking, CargoCheckQrInputs, CargoCloseInputs, CargoLiftInputs,
    CargoLowerInputs, CargoOpenInputs, EmptyOutputs, Inputs, MoveBackwardInputs, MoveDirection,
    MoveForwardInputs, MoveToInputs, Outputs, ScanLocationInputs, ScanLocationOutputs,
    ScannedLocation, StopMovementInputs, WaitInputs,
};
pub use repository::{
    CommandRepository, ListCommandsParams, Page, PagingParams, Sort, SortField, SortOrder,
    UpdateCommandParams,
};
