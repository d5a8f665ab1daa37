use crate::error::WxPayError;
use crate::model::bill::BillType;

const DEFAULT_BASE_URL: &str = "https://api.mch.weixin.qq.com";

pub struct ClientConfig {
    pub appid: String,
    pub mch_id: String,
    pub sub_mch_id: Option<String>,
    pub key: String,
    pub bill_type: BillType,
    pub http_client: Option<reqwest::Client>,
    pub base_url: String,
}

#[derive(Default)]
pub struct ClientConfigBuilder {
    appid: Option<String>,
    mch_id: Option<String>,
    sub_mch_id: Option<String>,
    key: Option<String>,
    bill_type: Option<BillType>,
    http_client: Option<reqwest::Client>,
    base_url: Option<String>,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Build a config from `WXPAY_APPID`, `WXPAY_MCH_ID`, `WXPAY_SUB_MCH_ID`,
    /// `WXPAY_KEY`, `WXPAY_BILL_TYPE` and `WXPAY_BASE_URL`.
    pub fn from_env() -> Result<Self, WxPayError> {
        let mut builder = Self::builder();
        if let Some(v) = env_var("WXPAY_APPID") {
            builder = builder.appid(v);
        }
        if let Some(v) = env_var("WXPAY_MCH_ID") {
            builder = builder.mch_id(v);
        }
        if let Some(v) = env_var("WXPAY_SUB_MCH_ID") {
            builder = builder.sub_mch_id(v);
        }
        if let Some(v) = env_var("WXPAY_KEY") {
            builder = builder.key(v);
        }
        if let Some(v) = env_var("WXPAY_BILL_TYPE") {
            builder = builder.bill_type(v.parse()?);
        }
        if let Some(v) = env_var("WXPAY_BASE_URL") {
            builder = builder.base_url(v);
        }
        builder.build()
    }
}

impl ClientConfigBuilder {
    pub fn appid(mut self, appid: impl Into<String>) -> Self {
        self.appid = Some(appid.into());
        self
    }

    pub fn mch_id(mut self, mch_id: impl Into<String>) -> Self {
        self.mch_id = Some(mch_id.into());
        self
    }

    pub fn sub_mch_id(mut self, sub_mch_id: impl Into<String>) -> Self {
        self.sub_mch_id = Some(sub_mch_id.into());
        self
    }

    /// Merchant API key used for MD5 request signing.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn bill_type(mut self, bill_type: BillType) -> Self {
        self.bill_type = Some(bill_type);
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn build(self) -> Result<ClientConfig, WxPayError> {
        let appid = required(self.appid, "appid")?;
        let mch_id = required(self.mch_id, "mch_id")?;
        let key = required(self.key, "key")?;

        let base_url = self
            .base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if base_url.is_empty() {
            return Err(WxPayError::Config("base_url must not be empty".into()));
        }

        Ok(ClientConfig {
            appid,
            mch_id,
            // An empty sub-merchant id means "not a service provider sub-account".
            sub_mch_id: self.sub_mch_id.filter(|s| !s.is_empty()),
            key,
            bill_type: self.bill_type.unwrap_or_default(),
            http_client: self.http_client,
            base_url,
        })
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, WxPayError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(WxPayError::Config(format!("{name} is required"))),
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
