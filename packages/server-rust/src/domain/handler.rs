//! gRPC adapter for [`UserService`].

use tonic::{Request, Response, Status};
use tracing::error;
use usersvc_core::{
    CreateUserRequest, CreateUserResponse, GetUserRequest, GetUserResponse, User,
};

use super::repository::UserRecord;
use super::service::{ServiceError, UserService};

/// Implements the generated `user.v1.UserService` trait.
#[derive(Debug, Clone)]
pub struct UserHandler {
    service: UserService,
}

impl UserHandler {
    #[must_use]
    pub fn new(service: UserService) -> Self {
        Self { service }
    }

    #[must_use]
    pub fn service(&self) -> &UserService {
        &self.service
    }
}

#[tonic::async_trait]
impl usersvc_core::UserService for UserHandler {
    async fn get_user(
        &self,
        request: Request<GetUserRequest>,
    ) -> Result<Response<GetUserResponse>, Status> {
        let GetUserRequest { id } = request.into_inner();
        let user = self.service.get_user(&id).await.map_err(into_status)?;
        Ok(Response::new(GetUserResponse {
            user: Some(user.into()),
        }))
    }

    async fn create_user(
        &self,
        request: Request<CreateUserRequest>,
    ) -> Result<Response<CreateUserResponse>, Status> {
        let CreateUserRequest { email, name } = request.into_inner();
        let user = self
            .service
            .create_user(email, name)
            .await
            .map_err(into_status)?;
        Ok(Response::new(CreateUserResponse {
            user: Some(user.into()),
        }))
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id.to_string(),
            email: record.email,
            name: record.name,
        }
    }
}

fn into_status(err: ServiceError) -> Status {
    match err {
        ServiceError::InvalidArgument(msg) => Status::invalid_argument(msg),
        ServiceError::NotFound(id) => Status::not_found(format!("user {id} not found")),
        ServiceError::Database(e) => {
            error!(error = %e, "User query failed");
            Status::internal("internal error")
        }
    }
}
