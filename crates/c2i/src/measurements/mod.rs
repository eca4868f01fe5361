//! Field mapping from a report onto the three measurements.

use crate::influx::{FieldValue, Fields, Tags};
use crate::report::Report;
use crate::timestamp::{Timestamp, TimestampError, TimestampPolicy};

pub const TIMING: &str = "test_timing";
pub const BYTE: &str = "test_byte";
pub const COUNTER: &str = "test_counter";

/// What to write when a source value is missing or mistyped.
#[derive(Debug, Clone, Copy)]
enum Missing {
    Omit,
    Zero,
}

struct FieldSpec {
    key: &'static str,
    path: &'static str,
    missing: Missing,
}

const fn field(key: &'static str, path: &'static str, missing: Missing) -> FieldSpec {
    FieldSpec { key, path, missing }
}

const TAGS: &[(&str, &str)] = &[("testname", "TestDetail.Name"), ("nodename", "NodeName")];

const TIMING_FIELDS: &[FieldSpec] = &[
    field("total", "Summary.Timing.Total", Missing::Omit),
    field("dns", "Summary.Timing.Dns", Missing::Omit),
    field("wait", "Summary.Timing.Wait", Missing::Omit),
    field("connect", "Summary.Timing.Connect", Missing::Omit),
    field("send", "Summary.Timing.Send", Missing::Omit),
    field("ssl", "Summary.Timing.Ssl", Missing::Omit),
    field("wire", "Summary.Timing.Wire", Missing::Omit),
    field("client", "Summary.Timing.Client", Missing::Omit),
    field("doccomplete", "Summary.Timing.DocumentComplete", Missing::Zero),
    field("renderstart", "Summary.Timing.renderStart", Missing::Zero),
    field("domload", "Summary.Timing.domLoad", Missing::Zero),
];

const BYTE_FIELDS: &[FieldSpec] = &[
    field("totalcontent", "Summary.Byte.Response.TotalContent", Missing::Zero),
    field("image", "Summary.Byte.Response.Image", Missing::Zero),
    field("script", "Summary.Byte.Response.Script", Missing::Zero),
    field("css", "Summary.Byte.Response.Css", Missing::Zero),
    field("html", "Summary.Byte.Response.Html", Missing::Zero),
];

const COUNTER_FIELDS: &[FieldSpec] = &[
    field("hosts", "Summary.Counter.Hosts", Missing::Omit),
    field("requests", "Summary.Counter.Requests", Missing::Omit),
    field("failedrequests", "Summary.Counter.FailedRequests", Missing::Omit),
    field("jsfailures", "Summary.Counter.JsFailures", Missing::Zero),
];

/// The three records of one request. They share one tag set and one time.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurements {
    pub time: Timestamp,
    pub tags: Tags,
    pub timing: Fields,
    pub byte: Fields,
    pub counter: Fields,
}

impl Measurements {
    /// Resolve the timestamp, then map every field. Only the timestamp can
    /// fail; missing fields are omitted or zeroed.
    pub fn build(report: &Report, policy: TimestampPolicy) -> Result<Self, TimestampError> {
        let time = policy.resolve(report)?;

        let mut counter = map_fields(report, COUNTER_FIELDS);
        counter.insert("availability".into(), availability(report).into());
        if policy.stamps_calendar_fields() {
            stamp_calendar(&mut counter, time);
        }

        Ok(Self {
            time,
            tags: map_tags(report),
            timing: map_fields(report, TIMING_FIELDS),
            byte: map_fields(report, BYTE_FIELDS),
            counter,
        })
    }

    /// `(measurement name, fields)` in write order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Fields)> {
        [
            (TIMING, &self.timing),
            (BYTE, &self.byte),
            (COUNTER, &self.counter),
        ]
        .into_iter()
    }
}

fn map_tags(report: &Report) -> Tags {
    TAGS.iter()
        .filter_map(|(key, path)| Some(((*key).to_owned(), report.str_at(path)?.to_owned())))
        .collect()
}

fn map_fields(report: &Report, specs: &[FieldSpec]) -> Fields {
    specs
        .iter()
        .filter_map(|spec| {
            let value = match (report.f64_at(spec.path), spec.missing) {
                (Some(v), _) => v,
                (None, Missing::Zero) => 0.0,
                (None, Missing::Omit) => return None,
            };
            Some((spec.key.to_owned(), FieldValue::Float(value)))
        })
        .collect()
}

/// 0 when the report carries an error code, 100 otherwise.
fn availability(report: &Report) -> f64 {
    if report.exists("Summary.Error") && report.exists("Summary.Error.Code") {
        0.0
    } else {
        100.0
    }
}

fn stamp_calendar(fields: &mut Fields, time: Timestamp) {
    let year = format!("{:04}", time.year());
    let month = format!("{:02}", time.month());
    fields.insert("year-month".into(), format!("{year}-{month}").into());
    fields.insert("year".into(), year.into());
    fields.insert("month".into(), month.into());
}
