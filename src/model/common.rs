use std::collections::BTreeMap;

/// Flat string-keyed request/response parameters.
///
/// Ordered by key so that signing sees the same byte sequence regardless of
/// the order parameters were inserted in.
pub type Params = BTreeMap<String, String>;

/// `return_code` / `return_msg` pair carried by every v2 XML response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnEnvelope {
    pub return_code: Option<String>,
    pub return_msg: Option<String>,
}

impl ReturnEnvelope {
    pub fn from_params(params: &Params) -> Self {
        Self {
            return_code: params.get("return_code").cloned(),
            return_msg: params.get("return_msg").cloned(),
        }
    }
}
