// # Distribution Config Document
//
// The remote configuration is an opaque XML document (the CloudFront
// `DistributionConfig`). This module reads just enough of it to locate the
// origins, and rewrites exactly one `OriginPath` element while streaming every
// other event through untouched, so the written document is byte-identical to
// the one that was read outside the replaced text.
//
// ## Layout
//
// ```text
// <DistributionConfig>
//   <Origins>
//     <Quantity>2</Quantity>
//     <Items>
//       <Origin>
//         <Id>..</Id>
//         <DomainName>..</DomainName>
//         <OriginPath>/v1</OriginPath>     <- the only field ever mutated
//         ...
//       </Origin>
//       ...
//     </Items>
//   </Origins>
//   ...
// </DistributionConfig>
// ```

use std::fmt;

use quick_xml::events::{BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::error::{Error, Result};
use crate::traits::OriginDocument;

/// Element path from the document root to each origin entry
const ORIGIN_ELEMENT_PATH: [&str; 4] = ["DistributionConfig", "Origins", "Items", "Origin"];

/// Opaque version token (the `ETag` of the document)
///
/// A write is accepted only when the token presented matches the one the
/// remote currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    /// Wrap a raw token value
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, as sent in `If-Match`
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One origin entry as seen in the document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    /// Origin identifier (`Id` element), if present
    pub id: Option<String>,
    /// Current origin path; empty when the element is empty
    pub origin_path: String,
    /// Whether the entry carries an `OriginPath` element at all
    has_path_element: bool,
}

/// In-memory copy of a distribution configuration
///
/// Holds the raw document plus the origins parsed out of it. The raw text is
/// what goes back over the wire on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionConfig {
    xml: String,
    origins: Vec<Origin>,
}

impl DistributionConfig {
    /// Parse a `DistributionConfig` document
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedDocument` if the text is not well-formed XML
    /// or its root element is not `DistributionConfig`.
    pub fn from_xml(xml: impl Into<String>) -> Result<Self> {
        let xml = xml.into();
        let origins = scan_origins(&xml)?;
        Ok(Self { xml, origins })
    }

    /// The raw document
    pub fn as_xml(&self) -> &str {
        &self.xml
    }

    /// Consume the config, returning the raw document
    pub fn into_xml(self) -> String {
        self.xml
    }

    /// Number of origin entries
    pub fn origin_count(&self) -> usize {
        self.origins.len()
    }

    /// All origin entries, in document order
    pub fn origins(&self) -> &[Origin] {
        &self.origins
    }

    /// The origin path at `index`, if that origin exists
    pub fn origin_path(&self, index: usize) -> Option<&str> {
        self.origins.get(index).map(|o| o.origin_path.as_str())
    }

    /// Replace the origin path at `index`, returning the previous value
    ///
    /// Only the text of that origin's `OriginPath` element changes; every
    /// other byte of the document is preserved.
    ///
    /// # Errors
    ///
    /// - `Error::IndexOutOfRange` if `index` is not in `[0, origin_count())`
    /// - `Error::MalformedDocument` if the origin has no `OriginPath` element
    pub fn set_origin_path(&mut self, index: usize, new_path: &str) -> Result<String> {
        let len = self.origins.len();
        let origin = self
            .origins
            .get(index)
            .ok_or_else(|| Error::index_out_of_range(index, len))?;

        if !origin.has_path_element {
            return Err(Error::malformed(format!(
                "origin {} has no OriginPath element",
                index
            )));
        }

        let rewritten = rewrite_origin_path(&self.xml, index, new_path)?;
        let previous = std::mem::replace(&mut self.origins[index].origin_path, new_path.to_string());
        self.xml = rewritten;
        Ok(previous)
    }
}

impl OriginDocument for DistributionConfig {
    fn origin_count(&self) -> usize {
        DistributionConfig::origin_count(self)
    }

    fn origin_path(&self, index: usize) -> Option<&str> {
        DistributionConfig::origin_path(self, index)
    }

    fn set_origin_path(&mut self, index: usize, new_path: &str) -> Result<String> {
        DistributionConfig::set_origin_path(self, index, new_path)
    }
}

/// Which origin child element is currently being captured
enum Field {
    Id,
    OriginPath,
}

fn scan_origins(xml: &str) -> Result<Vec<Origin>> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut origins = Vec::new();
    let mut current: Option<Origin> = None;
    let mut field: Option<Field> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                stack.push(e.local_name().as_ref().to_vec());
                if stack.len() == 1 {
                    check_root(&stack[0])?;
                    saw_root = true;
                }
                if is_origin(&stack) {
                    current = Some(Origin::default());
                } else if let Some(origin) = current.as_mut()
                    && stack.len() == ORIGIN_ELEMENT_PATH.len() + 1
                {
                    field = match stack[stack.len() - 1].as_slice() {
                        b"Id" => Some(Field::Id),
                        b"OriginPath" => {
                            origin.has_path_element = true;
                            Some(Field::OriginPath)
                        }
                        _ => None,
                    };
                }
            }
            Event::Empty(e) => {
                let name = e.local_name().as_ref().to_vec();
                if stack.is_empty() {
                    check_root(&name)?;
                    saw_root = true;
                }
                stack.push(name);
                if is_origin(&stack) {
                    origins.push(Origin::default());
                } else if is_origin_child(&stack, "OriginPath")
                    && let Some(origin) = current.as_mut()
                {
                    origin.has_path_element = true;
                }
                stack.pop();
            }
            Event::Text(t) => {
                if let (Some(origin), Some(f)) = (current.as_mut(), field.as_ref()) {
                    let text = t.unescape().map_err(xml_error)?;
                    match f {
                        Field::Id => origin.id.get_or_insert_with(String::new).push_str(&text),
                        Field::OriginPath => origin.origin_path.push_str(&text),
                    }
                }
            }
            Event::CData(c) => {
                if let (Some(origin), Some(f)) = (current.as_mut(), field.as_ref()) {
                    let text = cdata_text(c.into_inner().as_ref())?;
                    match f {
                        Field::Id => origin.id.get_or_insert_with(String::new).push_str(&text),
                        Field::OriginPath => origin.origin_path.push_str(&text),
                    }
                }
            }
            Event::End(_) => {
                if stack.len() == ORIGIN_ELEMENT_PATH.len() + 1 {
                    field = None;
                }
                if is_origin(&stack)
                    && let Some(origin) = current.take()
                {
                    origins.push(origin);
                }
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(Error::malformed("document has no root element"));
    }
    if !stack.is_empty() {
        return Err(Error::malformed("unexpected end of document"));
    }

    Ok(origins)
}

fn rewrite_origin_path(xml: &str, target: usize, new_path: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + new_path.len()));
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut origins_seen = 0usize;
    let mut in_target = false;
    // Depth of the OriginPath element whose original content is being dropped
    let mut skip_depth: Option<usize> = None;
    let mut replaced = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Eof => break,
            Event::Start(e) => {
                stack.push(e.local_name().as_ref().to_vec());
                if skip_depth.is_some() {
                    continue;
                }
                if is_origin(&stack) {
                    in_target = origins_seen == target;
                    origins_seen += 1;
                }
                let replace_here = in_target && !replaced && is_origin_child(&stack, "OriginPath");
                writer.write_event(Event::Start(e)).map_err(write_error)?;
                if replace_here {
                    writer
                        .write_event(Event::Text(BytesText::new(new_path)))
                        .map_err(write_error)?;
                    skip_depth = Some(stack.len());
                    replaced = true;
                }
            }
            Event::End(e) => {
                if let Some(depth) = skip_depth {
                    if stack.len() == depth {
                        skip_depth = None;
                        writer.write_event(Event::End(e)).map_err(write_error)?;
                    }
                    stack.pop();
                    continue;
                }
                if is_origin(&stack) {
                    in_target = false;
                }
                stack.pop();
                writer.write_event(Event::End(e)).map_err(write_error)?;
            }
            Event::Empty(e) => {
                if skip_depth.is_some() {
                    continue;
                }
                stack.push(e.local_name().as_ref().to_vec());
                if is_origin(&stack) {
                    origins_seen += 1;
                }
                let replace_here = in_target && !replaced && is_origin_child(&stack, "OriginPath");
                stack.pop();

                if replace_here {
                    // `<OriginPath/>` becomes `<OriginPath>new</OriginPath>`
                    let end = e.to_end().into_owned();
                    writer.write_event(Event::Start(e)).map_err(write_error)?;
                    writer
                        .write_event(Event::Text(BytesText::new(new_path)))
                        .map_err(write_error)?;
                    writer.write_event(Event::End(end)).map_err(write_error)?;
                    replaced = true;
                } else {
                    writer.write_event(Event::Empty(e)).map_err(write_error)?;
                }
            }
            other => {
                if skip_depth.is_none() {
                    writer.write_event(other).map_err(write_error)?;
                }
            }
        }
    }

    if !replaced {
        return Err(Error::malformed(format!(
            "origin {} has no OriginPath element",
            target
        )));
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::malformed(format!("rewritten document is not UTF-8: {}", e)))
}

fn check_root(name: &[u8]) -> Result<()> {
    if name == ORIGIN_ELEMENT_PATH[0].as_bytes() {
        Ok(())
    } else {
        Err(Error::malformed(format!(
            "expected root element DistributionConfig, found {}",
            String::from_utf8_lossy(name)
        )))
    }
}

fn path_matches(stack: &[Vec<u8>], path: &[&str]) -> bool {
    stack.len() == path.len()
        && stack
            .iter()
            .zip(path)
            .all(|(have, want)| have.as_slice() == want.as_bytes())
}

fn is_origin(stack: &[Vec<u8>]) -> bool {
    path_matches(stack, &ORIGIN_ELEMENT_PATH)
}

fn is_origin_child(stack: &[Vec<u8>], child: &str) -> bool {
    stack.len() == ORIGIN_ELEMENT_PATH.len() + 1
        && is_origin(&stack[..ORIGIN_ELEMENT_PATH.len()])
        && stack[ORIGIN_ELEMENT_PATH.len()].as_slice() == child.as_bytes()
}

fn cdata_text(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| Error::malformed(format!("CDATA is not UTF-8: {}", e)))
}

fn xml_error(err: quick_xml::Error) -> Error {
    Error::malformed(err.to_string())
}

fn write_error(err: impl fmt::Display) -> Error {
    Error::malformed(format!("failed to write document: {}", err))
}
