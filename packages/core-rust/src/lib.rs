//! `usersvc` Core — protobuf message schemas and generated gRPC bindings.
//!
//! The `user.v1` package is compiled at build time; [`FILE_DESCRIPTOR_SET`]
//! carries the encoded descriptors so servers can expose reflection.

pub mod user {
    pub mod v1 {
        #![allow(clippy::pedantic)]
        tonic::include_proto!("user.v1");
    }
}

pub use user::v1::user_service_client::UserServiceClient;
pub use user::v1::user_service_server::{UserService, UserServiceServer};
pub use user::v1::{
    CreateUserRequest, CreateUserResponse, GetUserRequest, GetUserResponse, User,
};

/// Encoded `FileDescriptorSet` for every compiled `.proto` file.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("user_descriptor");
