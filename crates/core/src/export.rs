use std::io::Write;

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::Result;
use crate::model::TreeNode;
use crate::record::HistoryRecord;

fn record_json(rec: &HistoryRecord) -> Result<Value> {
    let mut value = serde_json::to_value(rec)?;
    if let Value::Object(map) = &mut value {
        map.insert(
            "confidence".to_string(),
            rec.confidence().map(Value::from).unwrap_or(Value::Null),
        );
    }
    Ok(value)
}

/// One JSON object per line, in the order given, with the derived
/// `confidence` alongside the record's own fields.
pub fn to_jsonl<'a>(
    records: impl IntoIterator<Item = &'a HistoryRecord>,
    mut w: impl Write,
) -> Result<()> {
    for (i, rec) in records.into_iter().enumerate() {
        if i > 0 {
            w.write_all(b"\n")?;
        }
        serde_json::to_writer(&mut w, &record_json(rec)?)?;
    }
    w.flush()?;
    Ok(())
}

pub fn to_csv<'a>(
    records: impl IntoIterator<Item = &'a HistoryRecord>,
    mut w: impl Write,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(&mut w);
    writer.write_record([
        "timestamp",
        "requestId",
        "status",
        "responseTime",
        "inputSize",
        "outputSize",
        "confidence",
        "errorMessage",
    ])?;
    let opt = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_default();
    for rec in records {
        writer.write_record([
            rec.timestamp.clone(),
            rec.request_id.clone(),
            rec.status.clone(),
            opt(rec.response_time),
            opt(rec.input_size),
            opt(rec.output_size),
            rec.confidence().map(|c| c.to_string()).unwrap_or_default(),
            rec.error_message.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn tree_to_json(roots: &[TreeNode]) -> Result<Value> {
    Ok(serde_json::to_value(roots)?)
}

/// Download name for a history export made on `date`.
pub fn history_file_name(date: NaiveDate) -> String {
    format!("monitoring_history_{}.jsonl", date.format("%Y-%m-%d"))
}
