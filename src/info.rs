use crate::refs::{ObjectReferences, RefType};
use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use pdf_writer::{Date as PDate, Pdf, TextStr};
use serde::Serialize;

/// Document-level metadata written into the PDF Info dictionary. Derived from the
/// form data once per export, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateMetadata {
    pub title: String,
    pub subject: String,
    pub author: String,
    pub creator: String,
    pub producer: String,
    pub keywords: Vec<String>,
    pub creation_date: DateTime<FixedOffset>,
    pub mod_date: DateTime<FixedOffset>,
}

impl CertificateMetadata {
    pub(crate) fn write(&self, refs: &mut ObjectReferences, writer: &mut Pdf) {
        let id = refs.gen(RefType::Info);
        let mut info = writer.document_info(id);

        info.title(TextStr(self.title.as_str()));
        info.subject(TextStr(self.subject.as_str()));
        if !self.author.is_empty() {
            info.author(TextStr(self.author.as_str()));
        }
        if !self.keywords.is_empty() {
            let keywords = self.keywords.join(", ");
            info.keywords(TextStr(keywords.as_str()));
        }
        info.creator(TextStr(self.creator.as_str()));
        info.producer(TextStr(self.producer.as_str()));
        info.creation_date(pdf_date(&self.creation_date));
        info.modified_date(pdf_date(&self.mod_date));
    }
}

fn pdf_date(date: &DateTime<FixedOffset>) -> PDate {
    let offset = date.offset().local_minus_utc();
    let offset_hours = offset / (60 * 60);
    let offset_minutes = ((offset - (offset_hours * (60 * 60))) / 60).abs();
    PDate::new(date.year().clamp(0, 9999) as u16)
        .month(date.month() as u8)
        .day(date.day() as u8)
        .hour(date.hour() as u8)
        .minute(date.minute() as u8)
        .second(date.second() as u8)
        .utc_offset_hour(offset_hours as i8)
        .utc_offset_minute(offset_minutes as u8)
}
