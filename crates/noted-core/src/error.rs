use thiserror::Error;

pub type NotedResult<T> = Result<T, NotedError>;

#[derive(Debug, Error)]
pub enum NotedError {
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
