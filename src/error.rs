pub type FiligreeResult<T> = Result<T, FiligreeError>;

#[derive(thiserror::Error, Debug)]
pub enum FiligreeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("graph error: {0}")]
    Graph(String),

    #[error("probe error: {0}")]
    Probe(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("exec error: {0}")]
    Exec(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FiligreeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn graph(msg: impl Into<String>) -> Self {
        Self::Graph(msg.into())
    }

    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn exec(msg: impl Into<String>) -> Self {
        Self::Exec(msg.into())
    }
}
