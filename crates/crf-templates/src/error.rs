use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to read template file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse template file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate template code: {code}")]
    DuplicateCode { code: String },

    #[error("template {code}: duplicate field key '{key}'")]
    DuplicateField { code: String, key: String },

    #[error("template {code}: rule condition references undeclared field '{key}'")]
    UnknownConditionField { code: String, key: String },

    #[error("template {code}: rule hides undeclared field '{key}'")]
    UnknownHiddenField { code: String, key: String },

    #[error("template {code}: paired group '{label}' prefix '{prefix}' matches no field")]
    DanglingPairedPrefix {
        code: String,
        label: String,
        prefix: String,
    },

    #[error("template {code}: field '{key}' is a {kind} field but declares options")]
    OptionsOnNonChoice {
        code: String,
        key: String,
        kind: String,
    },

    #[error("template {code}: choice field '{key}' declares no options")]
    ChoiceWithoutOptions { code: String, key: String },
}

impl TemplateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
