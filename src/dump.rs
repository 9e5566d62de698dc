//! Streaming reader for MediaWiki XML exports, used by the `--stdin` page
//! selection mode.

use std::io::BufRead;

use quick_xml::{events::Event, reader::Reader};

use crate::error::StoreError;
use crate::{Page, PageSource};

pub struct DumpReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
    last_text_content: Option<String>,
    page: Page,
}

impl<R: BufRead> DumpReader<R> {
    pub fn new(input: R) -> Self {
        DumpReader {
            reader: Reader::from_reader(input),
            buffer: Vec::new(),
            last_text_content: None,
            page: Page::new(),
        }
    }
}

fn dump_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Dump {
        message: e.to_string(),
    }
}

impl<R: BufRead> PageSource for DumpReader<R> {
    fn next_page(&mut self) -> Result<Option<Page>, StoreError> {
        loop {
            match self.reader.read_event_into(&mut self.buffer) {
                Ok(Event::Start(node)) => match node.name().as_ref() {
                    b"page" => self.page = Page::new(),
                    b"title" | b"id" | b"text" => self.last_text_content = None,
                    b"ns" => {
                        self.page.ns = None;
                        self.last_text_content = None;
                    }
                    _ => {}
                },
                Ok(Event::End(node)) => match node.name().as_ref() {
                    b"title" => {
                        self.page.title = self.last_text_content.take().unwrap_or_default();
                    }
                    b"ns" => {
                        let ns_text = self.last_text_content.take().unwrap_or_default();
                        self.page.ns = ns_text.parse::<i32>().ok();
                    }
                    b"id" => {
                        let id_str = self.last_text_content.take().unwrap_or_default();
                        let id = id_str.parse::<i32>().map_err(dump_err)?;
                        // ids arrive in document order: page, then revision
                        if self.page.id.is_none() {
                            self.page.id = Some(id);
                        } else if self.page.rev_id.is_none() {
                            self.page.rev_id = Some(id);
                        }
                    }
                    b"text" => {
                        self.page.rev_text = self.last_text_content.take().unwrap_or_default();
                    }
                    b"page" => {
                        let page = std::mem::replace(&mut self.page, Page::new());
                        self.buffer.clear();
                        return Ok(Some(page));
                    }
                    _ => {}
                },
                Ok(Event::Text(text)) => {
                    let s = String::from_utf8(text.to_vec()).map_err(dump_err)?;
                    match self.last_text_content.as_mut() {
                        Some(content) => content.push_str(&s),
                        None => self.last_text_content = Some(s),
                    }
                }
                Ok(Event::Eof) => return Ok(None),
                Ok(_) => {}
                Err(e) => return Err(dump_err(e)),
            }
            self.buffer.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"<mediawiki>
  <page>
    <title>cat</title>
    <ns>0</ns>
    <id>100</id>
    <revision>
      <id>5000</id>
      <text>==English==
{{en-noun}}
</text>
    </revision>
  </page>
  <page>
    <title>Template:en-noun</title>
    <ns>10</ns>
    <id>101</id>
    <revision>
      <id>5001</id>
      <text>template body</text>
    </revision>
  </page>
</mediawiki>"#;

    #[test]
    fn test_reads_pages_in_order() {
        let mut reader = DumpReader::new(DUMP.as_bytes());

        let page = reader.next_page().unwrap().unwrap();
        assert_eq!(page.title, "cat");
        assert_eq!(page.ns, Some(0));
        assert_eq!(page.id, Some(100));
        assert_eq!(page.rev_id, Some(5000));
        assert_eq!(page.rev_text, "==English==\n{{en-noun}}\n");

        let page = reader.next_page().unwrap().unwrap();
        assert_eq!(page.title, "Template:en-noun");
        assert_eq!(page.ns, Some(10));

        assert!(reader.next_page().unwrap().is_none());
    }
}
