//! Multipart bodies for file uploads.

use std::path::Path;

use serde_json::{Map, Value};

use crate::request::query::scalar_to_string;

/// Field name used for the file part when none is given.
pub const DEFAULT_FILE_FIELD: &str = "file";

/// File content attached to an upload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UploadFile {
    pub content: Vec<u8>,
    /// Name reported by the source (e.g. the file on disk).
    pub file_name: Option<String>,
    pub mime: Option<String>,
}

impl UploadFile {
    pub fn from_bytes(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Read a file from disk, keeping its name.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        Ok(Self {
            content,
            file_name: path.file_name().map(|name| name.to_string_lossy().into_owned()),
            mime: None,
        })
    }
}

/// A file bound to the form field that carries it.
#[derive(Debug, Clone, PartialEq)]
pub struct FileField {
    pub name: String,
    pub file: UploadFile,
}

/// Arguments to the upload entry point.
#[derive(Debug, Clone, Default)]
pub struct UploadFileParams {
    /// Form field carrying the file; defaults to `file`.
    pub name: Option<String>,
    pub file: UploadFile,
    /// Explicit filename overriding the file's own.
    pub filename: Option<String>,
    /// Auxiliary form fields.
    pub data: Map<String, Value>,
}

impl UploadFileParams {
    /// Split into the file field and the auxiliary fields.
    pub fn into_parts(self) -> (FileField, Map<String, Value>) {
        let mut file = self.file;
        if self.filename.is_some() {
            file.file_name = self.filename;
        }
        let field = FileField {
            name: self.name.unwrap_or_else(|| DEFAULT_FILE_FIELD.to_string()),
            file,
        };
        (field, self.data)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartValue {
    Text(String),
    File {
        file_name: Option<String>,
        content: Vec<u8>,
        mime: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub value: PartValue,
}

/// Ordered list of multipart parts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultipartForm {
    pub parts: Vec<FormPart>,
}

impl MultipartForm {
    /// Assemble a form: the file part (if any) first, then one part per
    /// top-level field, arrays expanded into repeated `name[]` parts.
    pub fn build(file: Option<&FileField>, fields: &Map<String, Value>) -> Self {
        let mut form = MultipartForm::default();

        if let Some(field) = file {
            form.parts.push(FormPart {
                name: field.name.clone(),
                value: PartValue::File {
                    file_name: field.file.file_name.clone(),
                    content: field.file.content.clone(),
                    mime: field.file.mime.clone(),
                },
            });
        }

        for (key, value) in fields {
            match value {
                Value::Array(items) => {
                    let name = format!("{}[]", key);
                    for item in items {
                        form.push_text(&name, item);
                    }
                }
                other => form.push_text(key, other),
            }
        }
        form
    }

    fn push_text(&mut self, name: &str, value: &Value) {
        let text = match value {
            Value::Null => "null".to_string(),
            Value::Object(_) => value.to_string(),
            other => scalar_to_string(other),
        };
        self.parts.push(FormPart {
            name: name.to_string(),
            value: PartValue::Text(text),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.parts.iter().map(|part| part.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_first_and_array_fields() {
        let field = FileField {
            name: "attachment".into(),
            file: UploadFile {
                content: b"hello".to_vec(),
                file_name: Some("notes.txt".into()),
                mime: None,
            },
        };
        let fields = json!({"folder": "docs", "tags": ["a", "b"], "size": 5});
        let form = MultipartForm::build(Some(&field), fields.as_object().unwrap());

        assert_eq!(form.field_names(), vec!["attachment", "folder", "tags[]", "tags[]", "size"]);
        assert!(matches!(
            &form.parts[0].value,
            PartValue::File { file_name: Some(name), .. } if name == "notes.txt"
        ));
        assert_eq!(form.parts[3].value, PartValue::Text("b".into()));
        assert_eq!(form.parts[4].value, PartValue::Text("5".into()));
    }

    #[test]
    fn test_upload_params_defaults() {
        let params = UploadFileParams {
            file: UploadFile {
                content: vec![1, 2],
                file_name: Some("scan.png".into()),
                mime: None,
            },
            ..Default::default()
        };
        let (field, data) = params.into_parts();
        assert_eq!(field.name, DEFAULT_FILE_FIELD);
        assert_eq!(field.file.file_name.as_deref(), Some("scan.png"));
        assert!(data.is_empty());

        let params = UploadFileParams {
            name: Some("avatar".into()),
            filename: Some("me.png".into()),
            ..Default::default()
        };
        let (field, _) = params.into_parts();
        assert_eq!(field.name, "avatar");
        assert_eq!(field.file.file_name.as_deref(), Some("me.png"));
    }

    #[test]
    fn test_fields_only() {
        let fields = json!({"a": 1});
        let form = MultipartForm::build(None, fields.as_object().unwrap());
        assert_eq!(form.field_names(), vec!["a"]);
    }
}
