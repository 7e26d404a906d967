use crate::rates::ScrapeEvent;
use itertools::Itertools;
use std::fmt::Display;

pub const CSV_HEADER: [&str; 4] = ["term_days", "rate", "observed_at", "captured_at"];

fn field<T: Display>(value: Option<T>) -> String {
    let s = value.map(|v| v.to_string()).unwrap_or_default();
    if s.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s
    }
}

fn line<I: IntoIterator<Item = String>>(fields: I) -> String {
    fields.into_iter().join(",")
}

/// Render events as CSV, one line per record. An event without records still
/// gets a line so every run shows up in the timeline.
pub fn to_csv(events: &[ScrapeEvent]) -> String {
    let mut out = line(CSV_HEADER.iter().map(ToString::to_string));
    out.push('\n');

    for event in events {
        let captured_at = event.captured_at.to_rfc3339();
        if event.records.is_empty() {
            out.push_str(&line([
                field::<u32>(None),
                field::<f64>(None),
                field::<String>(None),
                field(Some(&captured_at)),
            ]));
            out.push('\n');
        }
        for r in &event.records {
            out.push_str(&line([
                field(Some(r.term_days)),
                field(Some(r.rate)),
                field(Some(r.observed_at.to_rfc3339())),
                field(Some(&captured_at)),
            ]));
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::RateRecord;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    #[test]
    fn column_order_and_empty_values() {
        let observed_at =
            DateTime::parse_from_rfc3339("2024-03-05T10:00:00-03:00").expect("Invalid date format");
        let events = vec![
            ScrapeEvent {
                captured_at: Utc.with_ymd_and_hms(2024, 3, 5, 13, 0, 1).unwrap(),
                records: vec![],
            },
            ScrapeEvent {
                captured_at: Utc.with_ymd_and_hms(2024, 3, 5, 13, 0, 0).unwrap(),
                records: vec![
                    RateRecord {
                        term_days: 7,
                        currency: "PESOS".to_string(),
                        rate: 38.5,
                        observed_at,
                    },
                    RateRecord {
                        term_days: 30,
                        currency: "PESOS".to_string(),
                        rate: 1234.56,
                        observed_at,
                    },
                ],
            },
        ];

        let expected = "term_days,rate,observed_at,captured_at\n\
            ,,,2024-03-05T13:00:01+00:00\n\
            7,38.5,2024-03-05T10:00:00-03:00,2024-03-05T13:00:00+00:00\n\
            30,1234.56,2024-03-05T10:00:00-03:00,2024-03-05T13:00:00+00:00\n";
        assert_eq!(to_csv(&events), expected);
    }

    #[test]
    fn quotes_separators() {
        assert_eq!(field(Some("a,b")), "\"a,b\"");
        assert_eq!(field(Some("say \"hi\"")), "\"say \"\"hi\"\"\"");
        assert_eq!(field::<&str>(None), "");
    }

    #[test]
    fn header_only_when_empty() {
        assert_eq!(to_csv(&[]), "term_days,rate,observed_at,captured_at\n");
    }
}
