use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error("API error: {0}")]
    Api(#[from] core_auth::ApiError),

    #[error("Spotify error: {0}")]
    Spotify(#[from] provider_spotify::SpotifyError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
