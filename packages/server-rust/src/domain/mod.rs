//! User-management collaborators wired behind the gRPC transport.
//!
//! Three layers, each holding only a handle to the one below:
//!
//! 1. **Repository** ([`UserRepository`]): SQL access over the shared pool
//! 2. **Service** ([`UserService`]): validation, holds the signing secret
//! 3. **Handler** ([`UserHandler`]): maps protobuf messages and errors to gRPC

pub mod handler;
pub mod repository;
pub mod service;

pub use handler::UserHandler;
pub use repository::{NewUser, UserRecord, UserRepository};
pub use service::{ServiceError, UserService};
