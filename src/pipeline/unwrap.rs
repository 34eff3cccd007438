//! Response envelope unwrapping.
//!
//! ```text
//! return_raw_response        → whole envelope (status, headers, payload)
//! !auto_unwrap               → payload as-is
//! payload missing            → TransformError
//! code == success            → payload.result
//! code == timeout            → BusinessError (timeout message)
//! otherwise                  → BusinessError (payload.message or generic)
//! ```

use serde_json::Value;

use crate::config::{BusinessCode, BusinessCodes};
use crate::pipeline::error::{ClassifiedError, GENERIC_FAILURE_MESSAGE, RESPONSE_TIMEOUT_MESSAGE};
use crate::request::RequestOptions;
use crate::transport::ResultEnvelope;

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultUnwrapper {
    codes: BusinessCodes,
}

impl ResultUnwrapper {
    pub fn new(codes: BusinessCodes) -> Self {
        Self { codes }
    }

    pub fn unwrap(&self, envelope: ResultEnvelope, options: &RequestOptions) -> Result<Value, ClassifiedError> {
        if options.return_raw_response {
            return Ok(envelope.into_value());
        }
        if !options.auto_unwrap {
            return Ok(envelope.payload.unwrap_or(Value::Null));
        }

        if envelope.payload.is_none() {
            return Err(ClassifiedError::transform(GENERIC_FAILURE_MESSAGE));
        }

        // No numeric code is just another non-success code.
        let outcome = match envelope.business_code() {
            Some(code) => self.codes.classify(code),
            None => BusinessCode::Error,
        };

        let message = match outcome {
            BusinessCode::Success => {
                let result = envelope
                    .payload
                    .and_then(|mut payload| payload.get_mut("result").map(Value::take))
                    .unwrap_or(Value::Null);
                return Ok(result);
            }
            BusinessCode::Timeout => RESPONSE_TIMEOUT_MESSAGE.to_string(),
            BusinessCode::Error | BusinessCode::Other(_) => envelope
                .message()
                .unwrap_or(GENERIC_FAILURE_MESSAGE)
                .to_string(),
        };

        let error = ClassifiedError::business(message);
        Err(match envelope.payload {
            Some(payload) => error.with_raw(payload),
            None => error,
        })
    }
}
