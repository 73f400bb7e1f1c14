//! Error taxonomy for the generator pipeline.
//!
//! Fatal kinds abort a run with a single-line diagnostic. Shape mismatches
//! between a schema and its sample document are not errors: they are
//! recorded on the model (see [`crate::model::ShapeMismatch`]) and the
//! sample data wins.
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure to obtain a usable input or schema document.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("unable to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {detail}", path.display())]
    Parse { path: PathBuf, detail: String },
    #[error("JSON pointer `{pointer}` selects nothing in the input document")]
    Pointer { pointer: String },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    /// The root document cannot be mapped to an entity.
    #[error("root document must be an object or an array of objects, found {found}")]
    InvalidRoot { found: &'static str },

    /// Cycle resolution did not converge. Reaching this is a bug in the
    /// resolver, not a property of the input.
    #[error("internal error: dependency cycles remain after resolution among [{}]", remaining.join(", "))]
    UnresolvableCycle { remaining: Vec<String> },

    #[error("unsupported target language `{0}`")]
    UnsupportedTarget(String),

    #[error("unable to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to serialize the model report: {0}")]
    Report(#[source] serde_json::Error),
}

impl Error {
    pub fn is_acquisition(&self) -> bool {
        matches!(self, Error::Acquisition(_))
    }

    pub fn is_unsupported_target(&self) -> bool {
        matches!(self, Error::UnsupportedTarget(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_are_single_line() {
        let errors = [
            Error::from(AcquisitionError::Read {
                path: PathBuf::from("missing.json"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            }),
            Error::InvalidRoot { found: "a string" },
            Error::UnresolvableCycle { remaining: vec!["A".into(), "B".into()] },
            Error::UnsupportedTarget("cobol".into()),
        ];
        for err in &errors {
            let msg = err.to_string();
            assert!(!msg.contains('\n'), "multi-line diagnostic: {msg}");
        }
        assert!(errors[0].is_acquisition());
        assert!(errors[3].is_unsupported_target());
        assert!(errors[2].to_string().contains("A, B"));
    }
}
