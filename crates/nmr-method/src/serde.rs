//! JSON and YAML helpers returning [`NmrError::Serde`].

use nmr_core::errors::{ErrorInfo, NmrError};
use serde::{de::DeserializeOwned, Serialize};

pub(crate) fn serde_error(code: &str, err: impl ToString) -> NmrError {
    NmrError::Serde(ErrorInfo::new(code, err.to_string()))
}

/// Deserializes a value from JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, NmrError> {
    serde_json::from_slice(data).map_err(|err| serde_error("json_deserialize", err))
}

/// Serializes a value into YAML.
pub fn to_yaml_string<T: Serialize>(value: &T) -> Result<String, NmrError> {
    serde_yaml::to_string(value).map_err(|err| serde_error("yaml_serialize", err))
}

/// Deserializes a YAML payload into the requested type.
pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, NmrError> {
    serde_yaml::from_slice(data).map_err(|err| serde_error("yaml_deserialize", err))
}
