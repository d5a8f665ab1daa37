use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::common::Params;
use crate::error::WxPayError;

/// Which transactions a bill covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BillType {
    #[default]
    All,
    Success,
    Refund,
}

impl BillType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillType::All => "ALL",
            BillType::Success => "SUCCESS",
            BillType::Refund => "REFUND",
        }
    }
}

impl fmt::Display for BillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillType {
    type Err = WxPayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ALL" => Ok(BillType::All),
            "SUCCESS" => Ok(BillType::Success),
            "REFUND" => Ok(BillType::Refund),
            _ => Err(WxPayError::Config(format!(
                "bill_type must be ALL, SUCCESS or REFUND, got {s:?}"
            ))),
        }
    }
}

/// Body of `POST /pay/downloadbill`, before signing.
#[derive(Debug, Clone)]
pub struct DownloadBillRequest {
    pub appid: String,
    pub mch_id: String,
    pub sub_mch_id: Option<String>,
    pub nonce_str: String,
    pub bill_date: String,
    pub bill_type: BillType,
}

impl DownloadBillRequest {
    pub fn into_params(self) -> Params {
        let mut params = Params::new();
        params.insert("appid".into(), self.appid);
        params.insert("mch_id".into(), self.mch_id);
        params.insert("nonce_str".into(), self.nonce_str);
        params.insert("bill_date".into(), self.bill_date);
        params.insert("bill_type".into(), self.bill_type.as_str().into());
        if let Some(sub_mch_id) = self.sub_mch_id {
            params.insert("sub_mch_id".into(), sub_mch_id);
        }
        params
    }
}

/// Outcome of a bill download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillContent {
    /// Raw bill text as returned by the gateway.
    Found(String),
    /// The gateway answered `No Bill Exist` for the requested date.
    NotFound,
}

impl BillContent {
    /// Collapse to the bill text, with `""` standing in for a missing bill.
    pub fn into_text(self) -> String {
        match self {
            BillContent::Found(text) => text,
            BillContent::NotFound => String::new(),
        }
    }
}

/// Number of columns in a bill data row.
pub const TRADE_RECORD_FIELDS: usize = 24;

/// One transaction line of a daily bill.
///
/// Field order matches the bill's column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeRecord {
    /// 交易时间, e.g. `2014-11-19 19:44:40`
    pub trade_time: String,
    /// 公众账号ID
    pub appid: String,
    /// 商户号
    pub mch_id: String,
    /// 子商户号
    pub sub_mch_id: String,
    /// 设备号
    pub device_info: String,
    /// 微信订单号
    pub transaction_id: String,
    /// 商户订单号
    pub out_trade_no: String,
    /// 用户标识
    pub openid: String,
    /// 交易类型, e.g. `JSAPI`
    pub trade_type: String,
    /// 交易状态, e.g. `SUCCESS`
    pub trade_state: String,
    /// 付款银行, e.g. `CMB_CREDIT`
    pub bank_type: String,
    /// 货币种类
    pub fee_type: String,
    /// 总金额
    pub total_fee: String,
    /// 企业红包金额
    pub coupon_fee: String,
    /// 微信退款单号
    pub refund_id: String,
    /// 商户退款单号
    pub out_refund_no: String,
    /// 退款金额
    pub refund_fee: String,
    /// 企业红包退款金额
    pub coupon_refund_fee: String,
    /// 退款类型
    pub refund_channel: String,
    /// 退款状态
    pub refund_state: String,
    /// 商品名称
    pub body: String,
    /// 商户数据包
    pub attach: String,
    /// 手续费
    pub service_fee: String,
    /// 费率, e.g. `0.60%`
    pub rate: String,
}

impl TradeRecord {
    pub fn from_fields(fields: [String; TRADE_RECORD_FIELDS]) -> Self {
        let [
            trade_time,
            appid,
            mch_id,
            sub_mch_id,
            device_info,
            transaction_id,
            out_trade_no,
            openid,
            trade_type,
            trade_state,
            bank_type,
            fee_type,
            total_fee,
            coupon_fee,
            refund_id,
            out_refund_no,
            refund_fee,
            coupon_refund_fee,
            refund_channel,
            refund_state,
            body,
            attach,
            service_fee,
            rate,
        ] = fields;
        Self {
            trade_time,
            appid,
            mch_id,
            sub_mch_id,
            device_info,
            transaction_id,
            out_trade_no,
            openid,
            trade_type,
            trade_state,
            bank_type,
            fee_type,
            total_fee,
            coupon_fee,
            refund_id,
            out_refund_no,
            refund_fee,
            coupon_refund_fee,
            refund_channel,
            refund_state,
            body,
            attach,
            service_fee,
            rate,
        }
    }

    /// All fields in bill column order.
    pub fn fields(&self) -> [&str; TRADE_RECORD_FIELDS] {
        [
            &self.trade_time,
            &self.appid,
            &self.mch_id,
            &self.sub_mch_id,
            &self.device_info,
            &self.transaction_id,
            &self.out_trade_no,
            &self.openid,
            &self.trade_type,
            &self.trade_state,
            &self.bank_type,
            &self.fee_type,
            &self.total_fee,
            &self.coupon_fee,
            &self.refund_id,
            &self.out_refund_no,
            &self.refund_fee,
            &self.coupon_refund_fee,
            &self.refund_channel,
            &self.refund_state,
            &self.body,
            &self.attach,
            &self.service_fee,
            &self.rate,
        ]
    }
}
