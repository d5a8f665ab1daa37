use std::io::Cursor;
use std::iter::FusedIterator;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use tracing::debug;

use crate::error::WxPayError;
use crate::model::bill::{TradeRecord, TRADE_RECORD_FIELDS};

/// A first row whose first cell starts with this is data rather than a header.
const DATE_PREFIX: &str = "20";

/// Lazy, single-pass reader over the transaction rows of a bill.
///
/// The first row is treated as a header when its first field does not look
/// like a date. Every following row with exactly 24 fields becomes a
/// [`TradeRecord`]; the first row of any other width marks the start of the
/// summary block and ends iteration without reading further. A blank line is
/// an empty row and ends iteration the same way.
pub struct TradeRecords {
    rows: Option<StringRecordsIntoIter<Cursor<Vec<u8>>>>,
    header: Option<Vec<String>>,
    row_index: usize,
}

impl TradeRecords {
    pub fn new(content: String) -> Self {
        let mut content = content.into_bytes();
        // The csv reader silently skips empty lines, so cut the input there.
        if let Some(end) = first_blank_line(&content) {
            debug!(offset = end, "bill content ends at blank line");
            content.truncate(end);
        }
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(Cursor::new(content));
        Self {
            rows: Some(reader.into_records()),
            header: None,
            row_index: 0,
        }
    }

    pub fn empty() -> Self {
        Self {
            rows: None,
            header: None,
            row_index: 0,
        }
    }

    /// Column titles, once the header row has been read.
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    fn finish(&mut self) {
        self.rows = None;
    }
}

impl Iterator for TradeRecords {
    type Item = Result<TradeRecord, WxPayError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = match self.rows.as_mut()?.next()? {
                Ok(row) => row,
                Err(e) => {
                    self.finish();
                    return Some(Err(WxPayError::Csv(e)));
                }
            };
            let index = self.row_index;
            self.row_index += 1;

            if index == 0 && !row.get(0).unwrap_or("").starts_with(DATE_PREFIX) {
                self.header = Some(row.iter().map(str::to_owned).collect());
                continue;
            }

            if row.len() != TRADE_RECORD_FIELDS {
                debug!(row = index, fields = row.len(), "reached bill summary, stopping");
                self.finish();
                return None;
            }

            return Some(Ok(to_trade_record(&row)));
        }
    }
}

impl FusedIterator for TradeRecords {}

fn to_trade_record(row: &StringRecord) -> TradeRecord {
    let fields: [String; TRADE_RECORD_FIELDS] =
        std::array::from_fn(|i| strip_marker(row.get(i).unwrap_or("")).to_owned());
    TradeRecord::from_fields(fields)
}

/// Byte offset where the first empty line begins, ignoring line breaks inside quoted fields.
///
/// Everything before the offset is kept, including the terminator of the last
/// non-empty line.
fn first_blank_line(content: &[u8]) -> Option<usize> {
    let mut in_quotes = false;
    let mut field_start = true;
    let mut i = 0;
    if matches!(content.first(), Some(b'\r' | b'\n')) {
        return Some(0);
    }
    while i < content.len() {
        let b = content[i];
        if in_quotes {
            if b == b'"' {
                if content.get(i + 1) == Some(&b'"') {
                    i += 1;
                } else {
                    in_quotes = false;
                }
            }
            i += 1;
            continue;
        }
        match b {
            b'"' if field_start => {
                in_quotes = true;
                field_start = false;
            }
            b',' => field_start = true,
            b'\r' | b'\n' => {
                let mut end = i + 1;
                if b == b'\r' && content.get(end) == Some(&b'\n') {
                    end += 1;
                }
                if matches!(content.get(end), Some(b'\r' | b'\n')) {
                    return Some(end);
                }
                field_start = true;
                i = end;
                continue;
            }
            _ => field_start = false,
        }
        i += 1;
    }
    None
}

/// Drop the leading backtick the gateway prepends to every bill cell.
fn strip_marker(value: &str) -> &str {
    let mut chars = value.chars();
    chars.next();
    chars.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "交易时间,公众账号ID,商户号,子商户号,设备号,微信订单号,商户订单号,用户标识,交易类型,交易状态,付款银行,货币种类,总金额,企业红包金额,微信退款单号,商户退款单号,退款金额,企业红包退款金额,退款类型,退款状态,商品名称,商户数据包,手续费,费率";
    const ROW: &str = "`2014-11-19 19:44:40,`wx2421b1c4370ec43b,`10010588,`0,`,`1007440988201411190006028672,`267963,`085e9858eca3bf372fc033504,`JSAPI,`SUCCESS,`CMB_CREDIT,`CNY,`0.01,`0.0,`0,`0,`0,`0,`,`,`出借 参与感 一个星期,`,`0.00006,`0.60%";
    const SUMMARY_TITLE: &str = "总交易单数,总交易额,总退款金额,总企业红包退款金额,手续费总金额";
    const SUMMARY: &str = "`1,`0.01,`0.00,`0.00,`0.00006";

    fn bill(lines: &[&str]) -> String {
        let mut s = lines.join("\r\n");
        s.push_str("\r\n");
        s
    }

    #[test]
    fn test_header_rows_and_summary() {
        let content = bill(&[HEADER, ROW, ROW, ROW, SUMMARY_TITLE, SUMMARY]);
        let mut records = TradeRecords::new(content);
        let parsed: Vec<TradeRecord> = records.by_ref().map(Result::unwrap).collect();

        assert_eq!(parsed.len(), 3);
        let first = &parsed[0];
        assert_eq!(first.trade_time, "2014-11-19 19:44:40");
        assert_eq!(first.mch_id, "10010588");
        assert_eq!(first.device_info, "");
        assert_eq!(first.transaction_id, "1007440988201411190006028672");
        assert_eq!(first.body, "出借 参与感 一个星期");
        assert_eq!(first.service_fee, "0.00006");
        assert_eq!(first.rate, "0.60%");

        let header = records.header().unwrap();
        assert_eq!(header.len(), 24);
        assert_eq!(header[0], "交易时间");
    }

    #[test]
    fn test_first_row_without_header_is_data() {
        // Only a bare `20` prefix marks a data row; the marker itself is still stripped.
        let content = bill(&[&ROW[1..], ROW, SUMMARY_TITLE]);
        let mut records = TradeRecords::new(content);
        let parsed: Vec<TradeRecord> = records.by_ref().map(Result::unwrap).collect();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].trade_time, "014-11-19 19:44:40");
        assert_eq!(parsed[0].mch_id, "10010588");
        assert_eq!(parsed[1].trade_time, "2014-11-19 19:44:40");
        assert!(records.header().is_none());
    }

    #[test]
    fn test_marked_first_row_is_header() {
        let content = bill(&[ROW, ROW, SUMMARY_TITLE]);
        let mut records = TradeRecords::new(content);
        assert_eq!(records.by_ref().count(), 1);
        assert_eq!(records.header().unwrap()[0], "`2014-11-19 19:44:40");
    }

    #[test]
    fn test_stops_before_malformed_row() {
        let content = bill(&[HEADER, ROW, "合计,0.01", ROW, ROW]);
        let records: Vec<_> = TradeRecords::new(content).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_ref().unwrap().trade_time, "2014-11-19 19:44:40");
    }

    #[test]
    fn test_stops_at_blank_line() {
        let content = bill(&[HEADER, ROW, "", ROW, SUMMARY_TITLE, SUMMARY]);
        let records: Vec<_> = TradeRecords::new(content).collect();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_stops_at_blank_line_lf() {
        let content = [HEADER, ROW, ROW, "", ROW, SUMMARY_TITLE].join("\n");
        let records: Vec<_> = TradeRecords::new(content).collect();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_leading_blank_line_ends_iteration() {
        let content = format!("\r\n{}", bill(&[HEADER, ROW, SUMMARY_TITLE]));
        let mut records = TradeRecords::new(content);
        assert!(records.next().is_none());
        assert!(records.header().is_none());
    }

    #[test]
    fn test_first_blank_line() {
        assert_eq!(first_blank_line(b"a,b\r\n\r\nc,d"), Some(5));
        assert_eq!(first_blank_line(b"a,b\nc,d\n\ny"), Some(8));
        assert_eq!(first_blank_line(b"\na,b"), Some(0));
        assert_eq!(first_blank_line(b"a,b\r\nc,d\r\n"), None);
        assert_eq!(first_blank_line(b"a,\"x\n\ny\",b\nc"), None);
        assert_eq!(first_blank_line(b"a,b\"\n\nc"), Some(5));
        assert_eq!(first_blank_line(b""), None);
    }

    #[test]
    fn test_blank_line_inside_quoted_field_is_data() {
        let row = ROW.replace("`出借 参与感 一个星期", "\"`line one\r\n\r\nline two\"");
        let content = bill(&[HEADER, &row, ROW, SUMMARY_TITLE]);
        let records: Vec<_> = TradeRecords::new(content).map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].body, "line one\r\n\r\nline two");
    }

    #[test]
    fn test_single_record_example() {
        let mut row = vec!["`2014-11-19 19:44:40".to_string()];
        row.extend((1..24).map(|i| format!("`v{i}")));
        let content = bill(&[HEADER, &row.join(","), "合计,0.01"]);
        let records: Vec<_> = TradeRecords::new(content).map(Result::unwrap).collect();
        assert_eq!(records.len(), 1);
        let fields = records[0].fields();
        assert_eq!(fields[0], "2014-11-19 19:44:40");
        assert_eq!(fields[1], "v1");
        assert_eq!(fields[23], "v23");
    }

    #[test]
    fn test_quoted_fields_with_commas() {
        let row = ROW.replace("`出借 参与感 一个星期", "\"`goods, with comma\"");
        let content = bill(&[HEADER, &row, SUMMARY_TITLE]);
        let records: Vec<_> = TradeRecords::new(content).map(Result::unwrap).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].body, "goods, with comma");
    }

    #[test]
    fn test_header_only() {
        let records: Vec<_> = TradeRecords::new(bill(&[HEADER])).collect();
        assert!(records.is_empty());
    }

    #[test]
    fn test_header_then_summary_only() {
        let content = bill(&[HEADER, SUMMARY_TITLE, SUMMARY]);
        let records: Vec<_> = TradeRecords::new(content).collect();
        assert!(records.is_empty());
    }

    #[test]
    fn test_empty_content() {
        assert_eq!(TradeRecords::new(String::new()).count(), 0);
        assert_eq!(TradeRecords::empty().count(), 0);
    }

    #[test]
    fn test_fused_after_summary() {
        let mut records = TradeRecords::new(bill(&[HEADER, ROW, SUMMARY_TITLE, ROW]));
        assert!(records.next().is_some());
        assert!(records.next().is_none());
        assert!(records.next().is_none());
    }

    #[test]
    fn test_strip_marker() {
        assert_eq!(strip_marker("`0.01"), "0.01");
        assert_eq!(strip_marker("`"), "");
        assert_eq!(strip_marker(""), "");
        assert_eq!(strip_marker("交易"), "易");
    }
}
