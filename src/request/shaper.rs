//! Payload shaping.
//!
//! # Rules (in precedence order)
//! ```text
//! literal params      → appended to the URL verbatim, nothing else encoded
//!                       (GET still gets the cache buster)
//! GET                 → params ∪ body mapping become the query; cache buster
//! non-GET, no body    → params become the body
//! join_params_to_url  → query ∪ body also serialized into the URL
//! form-urlencoded     → body re-encoded as bracketed key=value pairs
//! multipart           → upload file first, then one part per field
//! JSON                → body passed through (dates formatted)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};

use crate::request::dates::format_request_dates;
use crate::request::descriptor::{Body, ContentType, Method, Params, RequestDescriptor};
use crate::request::multipart::MultipartForm;
use crate::request::options::RequestOptions;
use crate::request::query;

/// Decides query/body placement and encoding for a descriptor.
#[derive(Debug, Default)]
pub struct PayloadShaper {
    last_timestamp: AtomicU64,
}

impl PayloadShaper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape(
        &self,
        mut descriptor: RequestDescriptor,
        options: &RequestOptions,
        date_format: &str,
    ) -> RequestDescriptor {
        let is_get = descriptor.method == Method::Get;

        let mut params = match std::mem::take(&mut descriptor.params) {
            Params::Literal(suffix) => {
                descriptor.url.push_str(&suffix);
                if is_get && options.join_time {
                    descriptor.cache_bust = Some(self.next_timestamp());
                }
                return descriptor;
            }
            Params::Map(map) => map,
        };

        if options.format_date {
            if let Body::Json(body) = &mut descriptor.body {
                format_request_dates(body, date_format);
            }
        }

        if is_get {
            match std::mem::take(&mut descriptor.body) {
                Body::Json(Value::Object(fields)) => {
                    for (key, value) in fields {
                        params.entry(key).or_insert(value);
                    }
                }
                Body::Empty | Body::Json(Value::Null) => {}
                other => {
                    tracing::debug!(url = %descriptor.url, body = ?other, "GET body is not a mapping, dropped");
                }
            }
            descriptor.params = Params::Map(params);
            if options.join_time {
                descriptor.cache_bust = Some(self.next_timestamp());
            }
            return descriptor;
        }

        if options.format_date {
            let mut wrapped = Value::Object(params);
            format_request_dates(&mut wrapped, date_format);
            params = match wrapped {
                Value::Object(map) => map,
                _ => Map::new(),
            };
        }

        if descriptor.body.is_present() || descriptor.upload.is_some() {
            descriptor.params = Params::Map(params);
        } else {
            if !params.is_empty() {
                descriptor.body = Body::Json(Value::Object(params));
            }
            descriptor.params = Params::default();
        }

        if options.join_params_to_url {
            let mut merged = descriptor.params.as_map().cloned().unwrap_or_default();
            if let Body::Json(Value::Object(fields)) = &descriptor.body {
                for (key, value) in fields {
                    merged.insert(key.clone(), value.clone());
                }
            }
            descriptor.url = query::join_params_to_url(&descriptor.url, &merged);
        }

        match descriptor.effective_content_type() {
            ContentType::FormUrlEncoded => {
                if let Body::Json(Value::Object(fields)) = &descriptor.body {
                    descriptor.body = Body::Form(query::encode_brackets(fields));
                }
            }
            ContentType::FormData => {
                let fields = match std::mem::take(&mut descriptor.body) {
                    Body::Json(Value::Object(fields)) => fields,
                    Body::Json(Value::Null) | Body::Empty => Map::new(),
                    other => {
                        descriptor.body = other;
                        return descriptor;
                    }
                };
                descriptor.body = Body::Multipart(MultipartForm::build(descriptor.upload.as_ref(), &fields));
            }
            _ => {}
        }

        descriptor
    }

    /// Strictly increasing millisecond timestamp, so two calls in the same
    /// millisecond still produce distinct wire queries.
    fn next_timestamp(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let mut prev = self.last_timestamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.last_timestamp.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::dates::DEFAULT_DATE_FORMAT;
    use crate::request::multipart::{FileField, UploadFile};
    use crate::request::options::CallOptions;
    use serde_json::json;

    fn options(overrides: CallOptions) -> RequestOptions {
        RequestOptions::default().with_overrides(&overrides)
    }

    fn shape(descriptor: RequestDescriptor, overrides: CallOptions) -> RequestDescriptor {
        PayloadShaper::new().shape(descriptor, &options(overrides), DEFAULT_DATE_FORMAT)
    }

    #[test]
    fn test_get_moves_body_into_query_with_timestamp() {
        let d = RequestDescriptor::get("/users").param("id", 1).json(json!({"page": 2}));
        let shaped = shape(d, CallOptions::new());

        assert_eq!(shaped.body, Body::Empty);
        assert_eq!(shaped.params, Params::Map(json!({"id": 1, "page": 2}).as_object().unwrap().clone()));
        assert!(shaped.cache_bust.is_some());
        assert!(shaped.wire_url().starts_with("/users?id=1&page=2&_t="));
    }

    #[test]
    fn test_get_drops_non_mapping_body() {
        let d = RequestDescriptor::get("/users").param("id", 1).json(json!([1, 2]));
        let shaped = shape(d, CallOptions::new().join_time(false));
        assert_eq!(shaped.body, Body::Empty);
        assert_eq!(shaped.wire_url(), "/users?id=1");
    }

    #[test]
    fn test_get_without_timestamp() {
        let shaped = shape(RequestDescriptor::get("/users"), CallOptions::new().join_time(false));
        assert_eq!(shaped.cache_bust, None);
        assert_eq!(shaped.wire_url(), "/users");
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let shaper = PayloadShaper::new();
        let opts = options(CallOptions::new());
        let a = shaper.shape(RequestDescriptor::get("/list"), &opts, DEFAULT_DATE_FORMAT);
        let b = shaper.shape(RequestDescriptor::get("/list"), &opts, DEFAULT_DATE_FORMAT);
        assert!(b.cache_bust > a.cache_bust);
        assert_ne!(a.wire_url(), b.wire_url());
    }

    #[test]
    fn test_literal_params_bypass_encoding() {
        let d = RequestDescriptor::post("/users")
            .params(Params::Literal("/42".into()))
            .content_type(ContentType::FormUrlEncoded)
            .json(json!({"name": " x "}));
        let shaped = shape(d, CallOptions::new().join_params_to_url(true));
        assert_eq!(shaped.url, "/users/42");
        assert_eq!(shaped.body, Body::Json(json!({"name": " x "})));
        assert_eq!(shaped.cache_bust, None);

        let shaped = shape(RequestDescriptor::get("/users").params(Params::Literal("/7".into())), CallOptions::new());
        assert_eq!(shaped.url, "/users/7");
        assert!(shaped.wire_url().starts_with("/users/7?_t="));
    }

    #[test]
    fn test_non_get_params_become_body_when_body_empty() {
        let d = RequestDescriptor::post("/users").param("name", "ann");
        let shaped = shape(d, CallOptions::new());
        assert_eq!(shaped.body, Body::Json(json!({"name": "ann"})));
        assert!(shaped.params.is_empty());

        let d = RequestDescriptor::post("/users").param("dry_run", true).json(json!({"name": "ann"}));
        let shaped = shape(d, CallOptions::new());
        assert_eq!(shaped.body, Body::Json(json!({"name": "ann"})));
        assert_eq!(shaped.wire_url(), "/users?dry_run=true");
    }

    #[test]
    fn test_form_urlencoded_arrays() {
        let d = RequestDescriptor::post("/tags")
            .content_type(ContentType::FormUrlEncoded)
            .json(json!({"tags": ["a", "b"]}));
        let shaped = shape(d, CallOptions::new());
        assert_eq!(shaped.body, Body::Form("tags[]=a&tags[]=b".into()));
    }

    #[test]
    fn test_multipart_with_file_first() {
        let mut d = RequestDescriptor::post("/upload")
            .content_type(ContentType::FormData)
            .json(json!({"folder": "docs", "tags": ["x", "y"]}));
        d.upload = Some(FileField {
            name: "file".into(),
            file: UploadFile::from_bytes(b"data".to_vec()),
        });
        let shaped = shape(d, CallOptions::new());
        match shaped.body {
            Body::Multipart(form) => {
                assert_eq!(form.field_names(), vec!["file", "folder", "tags[]", "tags[]"]);
            }
            other => panic!("expected multipart body, got {:?}", other),
        }
    }

    #[test]
    fn test_join_params_to_url_keeps_body() {
        let d = RequestDescriptor::new(Method::Put, "/users/")
            .param("v", 2)
            .json(json!({"id": 9}));
        let shaped = shape(d, CallOptions::new().join_params_to_url(true));
        assert_eq!(shaped.url, "/users?v=2&id=9");
        assert_eq!(shaped.body, Body::Json(json!({"id": 9})));
    }

    #[test]
    fn test_json_dates_formatted_unless_disabled() {
        let d = RequestDescriptor::post("/events").json(json!({"at": "2024-05-01T10:00:00Z"}));
        let shaped = shape(d.clone(), CallOptions::new());
        assert_eq!(shaped.body, Body::Json(json!({"at": "2024-05-01 10:00:00"})));

        let shaped = shape(d, CallOptions::new().format_date(false));
        assert_eq!(shaped.body, Body::Json(json!({"at": "2024-05-01T10:00:00Z"})));
    }
}
