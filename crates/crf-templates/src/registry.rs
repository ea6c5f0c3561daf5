use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crf_model::template::{FieldDef, Template};
use crf_model::value::FieldKind;

use crate::error::TemplateError;

/// Read-only registry resolving a template code to its schema and UI
/// specification.
///
/// Built once at startup — from in-code templates or a directory of JSON
/// files — validated structurally, then passed by reference to whatever
/// needs it. Deliberately not a process-wide singleton.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, Template>,
}

impl TemplateRegistry {
    /// Build a registry from a set of templates, validating each one.
    ///
    /// # Errors
    ///
    /// Rejects duplicate template codes and structurally invalid templates
    /// (see [`validate_template`]).
    pub fn new(templates: Vec<Template>) -> Result<Self, TemplateError> {
        let mut by_code = BTreeMap::new();
        for template in templates {
            validate_template(&template)?;
            let code = template.code.clone();
            if by_code.insert(code.clone(), template).is_some() {
                return Err(TemplateError::DuplicateCode { code });
            }
        }
        Ok(Self { templates: by_code })
    }

    /// Load every `*.json` template file under `dir`.
    ///
    /// Files are read in path order so load failures are reported
    /// deterministically.
    pub fn load_dir(dir: &Path) -> Result<Self, TemplateError> {
        let entries = std::fs::read_dir(dir).map_err(|e| TemplateError::io(dir, e))?;
        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut templates = Vec::with_capacity(paths.len());
        for path in paths {
            let contents =
                std::fs::read_to_string(&path).map_err(|e| TemplateError::io(&path, e))?;
            let template: Template =
                serde_json::from_str(&contents).map_err(|source| TemplateError::Parse {
                    path: path.clone(),
                    source,
                })?;
            tracing::debug!(code = %template.code, path = %path.display(), "loaded template");
            templates.push(template);
        }
        Self::new(templates)
    }

    pub fn get(&self, code: &str) -> Option<&Template> {
        self.templates.get(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Structural validation of a single template.
///
/// Checks that rule conditions and hide/show lists reference declared
/// fields, paired-group prefixes match at least one field, field keys are
/// unique, and choice fields carry an option list. A non-empty `show` list
/// is legal but flagged with a warning: no current behavior toggles a
/// default-hidden field through it, so its use needs product
/// clarification rather than a guessed default-visibility model.
pub fn validate_template(template: &Template) -> Result<(), TemplateError> {
    let mut keys = BTreeSet::new();
    for field in &template.fields {
        if !keys.insert(field.key.as_str()) {
            return Err(TemplateError::DuplicateField {
                code: template.code.clone(),
                key: field.key.clone(),
            });
        }
        validate_field(template, field)?;
    }

    for rule in &template.ui.rules {
        if !keys.contains(rule.when.field_key.as_str()) {
            return Err(TemplateError::UnknownConditionField {
                code: template.code.clone(),
                key: rule.when.field_key.clone(),
            });
        }
        for key in rule.hide.iter().chain(rule.show.iter()) {
            if !keys.contains(key.as_str()) {
                return Err(TemplateError::UnknownHiddenField {
                    code: template.code.clone(),
                    key: key.clone(),
                });
            }
        }
        if !rule.show.is_empty() {
            tracing::warn!(
                code = %template.code,
                field = %rule.when.field_key,
                "rule declares a 'show' list; show semantics are unexercised and ignored"
            );
        }
    }

    for group in &template.ui.paired_groups {
        for prefix in [&group.left_prefix, &group.right_prefix] {
            if !template.fields.iter().any(|f| f.key.starts_with(prefix)) {
                return Err(TemplateError::DanglingPairedPrefix {
                    code: template.code.clone(),
                    label: group.label.clone(),
                    prefix: prefix.clone(),
                });
            }
        }
    }

    Ok(())
}

fn validate_field(template: &Template, field: &FieldDef) -> Result<(), TemplateError> {
    match field.kind {
        FieldKind::Choice => {
            if field.options.is_empty() {
                return Err(TemplateError::ChoiceWithoutOptions {
                    code: template.code.clone(),
                    key: field.key.clone(),
                });
            }
        }
        FieldKind::Text | FieldKind::Bool | FieldKind::Number => {
            if !field.options.is_empty() {
                return Err(TemplateError::OptionsOnNonChoice {
                    code: template.code.clone(),
                    key: field.key.clone(),
                    kind: field.kind.as_str().to_string(),
                });
            }
        }
    }
    Ok(())
}
