use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForkfixError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("branch error: {0}")]
    Branch(String),

    #[error("pull request rejected: {0}")]
    PullRequest(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("github error: {0}")]
    GitHub(String),

    #[error("issue store error: {0}")]
    Store(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ForkfixError>;
