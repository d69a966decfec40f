use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("registry is not configured: missing {0}")]
    NotConfigured(&'static str),

    #[error("credential endpoint accepted none of {attempts} authentication strategies")]
    AuthRejected { attempts: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
