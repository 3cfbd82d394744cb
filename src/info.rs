use crate::refs::{ObjectReferences, RefType};
use pdf_writer::{Date as PDate, Pdf, TextStr};

/// General document metadata such as title, author, etc
#[derive(Default, Debug, Clone)]
pub struct Info {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    /// No prescribed format, though a comma separated list is conventional
    pub keywords: Option<String>,
}

impl Info {
    pub fn new() -> Info {
        Info::default()
    }

    pub fn title<S: ToString>(mut self, title: S) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn author<S: ToString>(mut self, author: S) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn subject<S: ToString>(mut self, subject: S) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn keywords<S: ToString>(mut self, keywords: S) -> Self {
        self.keywords = Some(keywords.to_string());
        self
    }

    pub(crate) fn write(&self, refs: &mut ObjectReferences, writer: &mut Pdf) {
        let id = refs.gen(RefType::Info);
        let mut info = writer.document_info(id);

        if let Some(title) = &self.title {
            info.title(TextStr(title));
        }
        if let Some(author) = &self.author {
            info.author(TextStr(author));
        }
        if let Some(subject) = &self.subject {
            info.subject(TextStr(subject));
        }
        if let Some(keywords) = &self.keywords {
            info.keywords(TextStr(keywords));
        }
        info.producer(TextStr(concat!(
            env!("CARGO_PKG_NAME"),
            " v",
            env!("CARGO_PKG_VERSION")
        )));
        info.creation_date(creation_date());
    }
}

fn creation_date() -> PDate {
    use chrono::prelude::*;
    let now = Local::now();
    let offset = now.offset().local_minus_utc();
    let offset_hours = offset / 3600;
    let offset_minutes = ((offset % 3600) / 60).abs();
    PDate::new(now.year() as u16)
        .month(now.month() as u8)
        .day(now.day() as u8)
        .hour(now.hour() as u8)
        .minute(now.minute() as u8)
        .second(now.second() as u8)
        .utc_offset_hour(offset_hours as i8)
        .utc_offset_minute(offset_minutes as u8)
}
