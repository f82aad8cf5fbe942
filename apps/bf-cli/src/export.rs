//! CSV and JSON export of run records.

use std::io::{self, Write};

use bf_core::Value;
use bf_sim::{RunRecord, SinkSeries};

/// Column headers for one sink: `label[port]`, or `label[port].i` per vector element.
fn columns(series: &SinkSeries) -> Vec<String> {
    let Some(first) = series.values.first() else {
        return Vec::new();
    };
    first
        .iter()
        .enumerate()
        .flat_map(|(port, value)| match value {
            Value::Scalar(_) => vec![format!("{}[{port}]", series.label)],
            Value::Vector(v) => (0..v.len())
                .map(|i| format!("{}[{port}].{i}", series.label))
                .collect(),
        })
        .collect()
}

/// One row per recorded time point, one column per sink input element.
pub fn write_csv<W: Write>(record: &RunRecord, mut out: W) -> io::Result<()> {
    let mut header = vec!["t".to_string()];
    for series in &record.sinks {
        header.extend(columns(series));
    }
    writeln!(out, "{}", header.join(","))?;

    for (k, t) in record.t.iter().enumerate() {
        let mut row = vec![t.to_string()];
        for series in &record.sinks {
            if let Some(sample) = series.values.get(k) {
                row.extend(
                    sample
                        .iter()
                        .flat_map(|v| v.as_slice().iter().map(f64::to_string)),
                );
            }
        }
        writeln!(out, "{}", row.join(","))?;
    }
    out.flush()
}

pub fn write_json<W: Write>(record: &RunRecord, out: W) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(out, record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_core::BlockId;

    fn record() -> RunRecord {
        RunRecord {
            t: vec![0.0, 0.5],
            sinks: vec![SinkSeries {
                block: BlockId::from_index(3),
                label: "scope.out".to_string(),
                values: vec![
                    vec![Value::scalar(1.0), Value::vector(vec![2.0, 3.0])],
                    vec![Value::scalar(4.0), Value::vector(vec![5.0, 6.0])],
                ],
            }],
            steps: 2,
        }
    }

    #[test]
    fn csv_flattens_vector_inputs() {
        let mut buf = Vec::new();
        write_csv(&record(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "t,scope.out[0],scope.out[1].0,scope.out[1].1");
        assert_eq!(lines[1], "0,1,2,3");
        assert_eq!(lines[2], "0.5,4,5,6");
    }

    #[test]
    fn json_contains_series() {
        let mut buf = Vec::new();
        write_json(&record(), &mut buf).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(v["t"][1], 0.5);
        assert_eq!(v["sinks"][0]["label"], "scope.out");
        assert_eq!(v["sinks"][0]["values"][1][1][0], 5.0);
        assert_eq!(v["steps"], 2);
    }
}
