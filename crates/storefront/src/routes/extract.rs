//! Request extractors shared by the storefront and admin routes.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart},
};

use crate::error::AppError;

/// JSON body extractor whose rejections are reported as `400 {"error": ...}`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// A fully buffered multipart form with at most one file part.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    file: Option<Bytes>,
}

impl MultipartForm {
    /// Read every part. The part named `file_field` is kept as bytes; an empty
    /// file part (no file chosen) counts as absent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the body is not valid multipart.
    pub async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            if name == file_field {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                if !data.is_empty() {
                    form.file = Some(data);
                }
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    /// A trimmed, non-empty text field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// A text field that must be present.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the missing field.
    pub fn required(&self, name: &str) -> Result<&str, AppError> {
        self.text(name)
            .ok_or_else(|| AppError::BadRequest(format!("{name} is required")))
    }

    /// Take the uploaded file, if any.
    pub fn take_file(&mut self) -> Option<Bytes> {
        self.file.take()
    }

    #[cfg(test)]
    pub(crate) fn insert_field(&mut self, name: &str, value: &str) {
        self.fields.insert(name.to_owned(), value.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_trims_and_skips_blank() {
        let mut form = MultipartForm::default();
        form.insert_field("title", "  Great mug ");
        form.insert_field("comment", "   ");

        assert_eq!(form.text("title"), Some("Great mug"));
        assert_eq!(form.text("comment"), None);
        assert_eq!(form.text("missing"), None);
        assert!(form.required("comment").is_err());
        assert_eq!(form.take_file(), None);
    }
}
