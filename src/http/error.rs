use rouille::Response;

use crate::{
    site::StyleEditError,
    storage::{auth::AuthError, error::StorageError},
};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TrackNotFound(id) => {
                ApiError::NotFound(format!("track {} not found", id))
            }

            StorageError::InvalidTrack(e) => ApiError::BadRequest(e.to_string()),

            StorageError::Database(_)
            | StorageError::Fs(_)
            | StorageError::Json(_)
            | StorageError::Internal(_) => {
                log::error!("storage failure: {err}");
                ApiError::Internal("internal server error".into())
            }
        }
    }
}

impl From<StyleEditError> for ApiError {
    fn from(err: StyleEditError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Storage(e) => e.into(),
            AuthError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            AuthError::AlreadyExists(_)
            | AuthError::PasswordTooShort
            | AuthError::InvalidEmail(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Internal(msg) => Response::text(msg).with_status_code(status),
        }
    }
}
