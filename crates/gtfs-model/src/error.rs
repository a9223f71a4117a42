use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("file {file} depends on unknown file {dependency}")]
    UnknownDependency { file: String, dependency: String },
    #[error("dependency cycle between files: {}", files.join(", "))]
    DependencyCycle { files: Vec<String> },
    #[error("invalid {kind} value '{value}'")]
    InvalidValue { kind: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
