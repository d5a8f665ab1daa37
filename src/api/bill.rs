use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::client::WxPayClient;
use crate::crypto::nonce::gen_nonce;
use crate::error::WxPayError;
use crate::model::bill::*;
use crate::model::common::ReturnEnvelope;
use crate::trade::TradeRecords;
use crate::xml;

const DOWNLOAD_BILL_PATH: &str = "/pay/downloadbill";
const BILL_DATE_FORMAT: &str = "%Y%m%d";
const NO_BILL_EXIST: &str = "No Bill Exist";

impl WxPayClient {
    /// Download the bill for `bill_date` (`YYYYMMDD`).
    ///
    /// POST /pay/downloadbill
    pub async fn download_bill(&self, bill_date: &str) -> Result<BillContent, WxPayError> {
        validate_bill_date(bill_date)?;

        let req = DownloadBillRequest {
            appid: self.config.appid.clone(),
            mch_id: self.config.mch_id.clone(),
            sub_mch_id: self.config.sub_mch_id.clone(),
            nonce_str: gen_nonce(),
            bill_date: bill_date.to_string(),
            bill_type: self.config.bill_type,
        };

        let body = self.post_xml(DOWNLOAD_BILL_PATH, req.into_params()).await?;
        interpret_bill_response(&body)
    }

    /// Download the bill text for `bill_date`.
    ///
    /// A missing bill yields [`WxPayError::NoBillExist`] when `raise_on_missing`
    /// is set, and an empty string otherwise.
    pub async fn get_bill(
        &self,
        bill_date: &str,
        raise_on_missing: bool,
    ) -> Result<String, WxPayError> {
        match self.download_bill(bill_date).await? {
            BillContent::Found(text) => Ok(text),
            BillContent::NotFound if raise_on_missing => Err(WxPayError::NoBillExist {
                bill_date: bill_date.to_string(),
            }),
            BillContent::NotFound => Ok(String::new()),
        }
    }

    /// Download the bill for `bill_date` and write it verbatim to `path`,
    /// truncating any existing file. A missing bill writes an empty file.
    pub async fn save_bill(
        &self,
        bill_date: &str,
        path: impl AsRef<Path>,
    ) -> Result<(), WxPayError> {
        let content = self.get_bill(bill_date, false).await?;
        tokio::fs::write(path.as_ref(), content.as_bytes()).await?;
        info!(bill_date, path = %path.as_ref().display(), bytes = content.len(), "bill saved");
        Ok(())
    }

    /// Download the bill for `bill_date` and iterate over its transaction rows.
    ///
    /// A missing bill yields an empty iterator.
    pub async fn trade_records(&self, bill_date: &str) -> Result<TradeRecords, WxPayError> {
        let text = self.download_bill(bill_date).await?.into_text();
        if text.is_empty() {
            return Ok(TradeRecords::empty());
        }
        Ok(TradeRecords::new(text))
    }
}

fn validate_bill_date(bill_date: &str) -> Result<(), WxPayError> {
    // chrono accepts unpadded fields, so pin the width to YYYYMMDD.
    if bill_date.len() != 8 || !bill_date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WxPayError::InvalidDate(bill_date.to_string()));
    }
    NaiveDate::parse_from_str(bill_date, BILL_DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| WxPayError::InvalidDate(bill_date.to_string()))
}

/// Read a `/pay/downloadbill` response body.
///
/// An `<xml>` body is an error envelope; anything else is the bill itself and
/// is passed through without validation.
pub fn interpret_bill_response(body: &[u8]) -> Result<BillContent, WxPayError> {
    if !xml::looks_like_xml(body) {
        debug!(len = body.len(), "received bill content");
        return Ok(BillContent::Found(String::from_utf8_lossy(body).into_owned()));
    }

    let envelope = ReturnEnvelope::from_params(&xml::decode(body)?);
    match envelope.return_msg {
        Some(msg) if msg == NO_BILL_EXIST => {
            debug!("gateway reports no bill");
            Ok(BillContent::NotFound)
        }
        Some(message) => {
            let code = envelope.return_code.unwrap_or_else(|| "FAIL".into());
            warn!(%code, %message, "bill download rejected");
            Err(WxPayError::Api { code, message })
        }
        None => Err(WxPayError::Unknown(
            "error response without return_msg".into(),
        )),
    }
}
