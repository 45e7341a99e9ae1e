use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("cannot parse free memory from line {line}: {content:?}")]
    Parse { line: usize, content: String },
}
