use actix_web::{http::StatusCode, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("IO error\n{0}")]
    Read(#[from] std::io::Error),

    #[error("blocking task error\n{0}")]
    Blocking(#[from] actix_web::error::BlockingError),

    #[error("askama templating error\n{0}")]
    Askama(#[from] askama::Error),

    #[error("reqwest error\n{0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("serde_yaml error\n{0}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("serde_json error\n{0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("timestamp out of range\n{0}")]
    Time(#[from] time::error::ComponentRange),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("other error \n{0}")]
    Other(String),
}

impl ResponseError for SiteError {
    fn status_code(&self) -> StatusCode {
        match self {
            SiteError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
