//! Services answering GraphQL requests.

pub use self::execution_service::ExecutionService;

mod execution_service;
