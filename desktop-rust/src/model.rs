use std::path::{Path, PathBuf};

use essay_grader::batch::{validate, BatchRequest, ValidationError};
use essay_grader::config::Settings;

/// Where the current run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Waiting,
    Running,
}

#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub title: String,
    pub rubric: String,
    pub images: Vec<PathBuf>,
}

impl FormState {
    pub fn selection_label(&self) -> String {
        match self.images.len() {
            0 => "No images selected".to_string(),
            1 => "1 image selected".to_string(),
            n => format!("{n} images selected"),
        }
    }

    pub fn to_request(&self) -> BatchRequest {
        BatchRequest {
            images: self.images.clone(),
            title: self.title.clone(),
            rubric: self.rubric.clone(),
        }
    }
}

/// Validate the form, then copy title/rubric into `settings` and persist them.
///
/// Nothing is written when validation fails.
pub fn commit_for_start(
    form: &FormState,
    settings: &mut Settings,
    settings_path: &Path,
) -> Result<BatchRequest, ValidationError> {
    let request = form.to_request();
    validate(&request, settings)?;

    settings.prompt.title = form.title.clone();
    settings.prompt.rubric = form.rubric.clone();
    if let Err(err) = settings.save(settings_path) {
        tracing::warn!("Saving title/rubric failed: {err}");
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> FormState {
        FormState {
            title: "My Hometown".into(),
            rubric: "Content 10\nLanguage 10".into(),
            images: vec![PathBuf::from("a.jpg")],
        }
    }

    #[test]
    fn test_invalid_form_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut settings = Settings::default();
        settings.api.key = "sk-unsaved".into();

        let mut form = filled_form();
        form.rubric = "  ".into();
        let result = commit_for_start(&form, &mut settings, &path);

        assert_eq!(result.unwrap_err(), ValidationError::MissingRubric);
        assert!(!path.exists());
        assert!(settings.prompt.title.is_empty());
    }

    #[test]
    fn test_valid_form_persists_title_and_rubric() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut settings = Settings::default();
        settings.api.key = "sk-test".into();

        let form = filled_form();
        let request = commit_for_start(&form, &mut settings, &path).unwrap();

        assert_eq!(request.images, form.images);
        let saved = Settings::load(&path).unwrap();
        assert_eq!(saved.prompt.title, "My Hometown");
        assert_eq!(saved.prompt.rubric, form.rubric);
    }

    #[test]
    fn test_selection_label() {
        let mut form = FormState::default();
        assert_eq!(form.selection_label(), "No images selected");
        form.images.push(PathBuf::from("a.jpg"));
        assert_eq!(form.selection_label(), "1 image selected");
        form.images.push(PathBuf::from("b.jpg"));
        assert_eq!(form.selection_label(), "2 images selected");
    }

    #[test]
    fn test_request_keeps_selection_order() {
        let form = FormState {
            title: "t".into(),
            rubric: "r".into(),
            images: vec![PathBuf::from("2.jpg"), PathBuf::from("1.jpg")],
        };
        assert_eq!(form.to_request().images, form.images);
    }
}
