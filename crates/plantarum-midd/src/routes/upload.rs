//! Multipart helpers.

use axum::extract::multipart::{Field, Multipart, MultipartError};

use plantarum_ipfs::FileUpload;

use crate::error::ApiError;

fn bad_form(err: MultipartError) -> ApiError {
    ApiError::bad_request(format!("invalid multipart body: {err}"))
}

async fn to_upload(field: Field<'_>) -> Result<FileUpload, ApiError> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let mime_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await.map_err(bad_form)?;
    Ok(FileUpload::new(file_name, mime_type, bytes))
}

/// The first part named `name`, if any.
pub(crate) async fn single_file(
    form: &mut Multipart,
    name: &str,
) -> Result<Option<FileUpload>, ApiError> {
    while let Some(field) = form.next_field().await.map_err(bad_form)? {
        let field_name = field.name().map(str::to_string);
        if field_name.as_deref() == Some(name) {
            return to_upload(field).await.map(Some);
        }
    }
    Ok(None)
}

/// A tokenization form: one `metadata` text part plus any number of `files` parts.
#[derive(Debug, Default)]
pub(crate) struct TokenizationForm {
    pub metadata: Option<String>,
    pub files: Vec<FileUpload>,
}

pub(crate) async fn tokenization_form(form: &mut Multipart) -> Result<TokenizationForm, ApiError> {
    let mut out = TokenizationForm::default();
    while let Some(field) = form.next_field().await.map_err(bad_form)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("metadata") => out.metadata = Some(field.text().await.map_err(bad_form)?),
            Some("files") | Some("files[]") => out.files.push(to_upload(field).await?),
            _ => {}
        }
    }
    Ok(out)
}
