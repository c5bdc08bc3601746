//! History as CSV (`captured_at,category,confidence,treat`).

use cotton_core::Record;

pub const CSV_HEADER: &str = "captured_at,category,confidence,treat";

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn records_to_csv(records: &[Record]) -> String {
    let mut out = String::with_capacity(64 * (records.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for record in records {
        out.push_str(&format!(
            "{},{},{:.2},{}\n",
            record.captured_at(),
            escape(record.category()),
            record.confidence(),
            record.treat()
        ));
    }
    out
}
