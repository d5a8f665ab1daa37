use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Method;
use tracing::debug;

use crate::config::ClientConfig;
use crate::crypto::sign::{sign_md5, SIGN_KEY};
use crate::error::WxPayError;
use crate::model::common::Params;
use crate::xml;

/// RFC 3986 unreserved characters stay literal in query keys and values.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const USER_AGENT: &str = concat!("wxpay-bill/", env!("CARGO_PKG_VERSION"));

pub struct WxPayClient {
    pub(crate) config: ClientConfig,
    pub(crate) http: reqwest::Client,
}

impl WxPayClient {
    pub fn new(config: ClientConfig) -> Self {
        let http = config.http_client.clone().unwrap_or_default();
        Self { config, http }
    }

    pub fn appid(&self) -> &str {
        &self.config.appid
    }

    /// Returns the merchant ID.
    pub fn mch_id(&self) -> &str {
        &self.config.mch_id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sign `params` and send them to `path`, returning the raw response body.
    ///
    /// POST sends the parameters as an `<xml>` body; GET sends them as a query
    /// string. The body is returned as-is whatever the HTTP status, since the
    /// v2 API reports business errors inside the payload.
    pub async fn execute(
        &self,
        path: &str,
        method: &str,
        mut params: Params,
    ) -> Result<bytes::Bytes, WxPayError> {
        if path.is_empty() {
            return Err(WxPayError::Config("request path should be set".into()));
        }
        let http_method = parse_method(method)?;
        let url = resolve_url(&self.config.base_url, path);

        let sign = sign_md5(&params, &self.config.key);
        params.insert(SIGN_KEY.to_string(), sign);

        debug!(method = %http_method, url = %url, "sending signed request");

        let req = if http_method == Method::GET {
            self.http.get(format!("{url}?{}", encode_query(&params)))
        } else {
            self.http
                .post(&url)
                .header("Content-Type", "text/xml; charset=utf-8")
                .body(xml::encode(&params))
        };

        let resp = req
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(WxPayError::Http)?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(WxPayError::Http)?;
        debug!(status = status.as_u16(), len = body.len(), "received response");

        Ok(body)
    }

    pub(crate) async fn post_xml(
        &self,
        path: &str,
        params: Params,
    ) -> Result<bytes::Bytes, WxPayError> {
        self.execute(path, "POST", params).await
    }
}

fn parse_method(method: &str) -> Result<Method, WxPayError> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        _ => Err(WxPayError::InvalidMethod(method.to_string())),
    }
}

/// Join a request path onto the base URL; absolute URLs pass through unchanged.
fn resolve_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else if path.starts_with('/') {
        format!("{base_url}{path}")
    } else {
        format!("{base_url}/{path}")
    }
}

/// Percent-encode a string so it is safe to use as a query key or value.
pub(crate) fn encode_query_component(s: &str) -> String {
    utf8_percent_encode(s, QUERY_ENCODE_SET).to_string()
}

fn encode_query(params: &Params) -> String {
    params
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                encode_query_component(k),
                encode_query_component(v)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> WxPayClient {
        let config = ClientConfig::builder()
            .appid("wx2421b1c4370ec43b")
            .mch_id("10010588")
            .key("secret")
            .base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        WxPayClient::new(config)
    }

    // --- resolve_url tests ---

    #[test]
    fn test_resolve_url_absolute_path() {
        let url = resolve_url("https://api.mch.weixin.qq.com", "/pay/downloadbill");
        assert_eq!(url, "https://api.mch.weixin.qq.com/pay/downloadbill");
    }

    #[test]
    fn test_resolve_url_relative_path() {
        let url = resolve_url("https://api.mch.weixin.qq.com", "pay/downloadbill");
        assert_eq!(url, "https://api.mch.weixin.qq.com/pay/downloadbill");
    }

    #[test]
    fn test_resolve_url_full_url_passthrough() {
        let url = resolve_url("https://api.mch.weixin.qq.com", "https://other.example.com/x");
        assert_eq!(url, "https://other.example.com/x");
    }

    // --- parse_method tests ---

    #[test]
    fn test_parse_method_case_insensitive() {
        assert_eq!(parse_method("post").unwrap(), Method::POST);
        assert_eq!(parse_method("GET").unwrap(), Method::GET);
    }

    #[test]
    fn test_parse_method_rejects_others() {
        assert!(matches!(parse_method("PUT"), Err(WxPayError::InvalidMethod(m)) if m == "PUT"));
        assert!(matches!(parse_method(""), Err(WxPayError::InvalidMethod(_))));
    }

    // --- encode_query tests ---

    #[test]
    fn test_encode_query() {
        let mut p = Params::new();
        p.insert("bill_date".into(), "20141119".into());
        p.insert("body".into(), "a b&c".into());
        assert_eq!(encode_query(&p), "bill_date=20141119&body=a%20b%26c");
    }

    #[test]
    fn test_encode_query_component_keeps_unreserved() {
        assert_eq!(encode_query_component("sub_mch-id.v~1"), "sub_mch-id.v~1");
        assert_eq!(encode_query_component("a/b=c"), "a%2Fb%3Dc");
    }

    #[test]
    fn test_encode_query_component_unicode() {
        let encoded = encode_query_component("账单");
        assert_eq!(encoded.matches('%').count(), 6);
    }

    // --- execute validation tests (fail before any I/O) ---

    #[tokio::test]
    async fn test_execute_rejects_invalid_method() {
        let client = test_client();
        let err = client
            .execute("/pay/downloadbill", "DELETE", Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WxPayError::InvalidMethod(_)));
    }

    #[tokio::test]
    async fn test_execute_rejects_empty_path() {
        let client = test_client();
        let err = client.execute("", "POST", Params::new()).await.unwrap_err();
        assert!(matches!(err, WxPayError::Config(_)));
    }
}
