//! Keyed upsert of repeated blocks in source-format metadata XML.
//!
//! The document is held as a flat list of owned `quick_xml` events so that
//! everything outside the edited block is written back byte for byte. Only the
//! repeated blocks sfkit edits are understood: `objectPermissions` and
//! `fieldPermissions` in permission sets and profiles, and `labels` in
//! `CustomLabels`.

use crate::error::SfkitError;
use crate::permissions::flags::{FieldPermissionFlags, ObjectPermissionFlags};
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs;
use std::path::Path;
use tracing::debug;

const DEFAULT_INDENT: &str = "    ";

/// A repeated top-level block identified by a key child element.
pub trait MetadataEntry {
    /// Element name of the block, e.g. `objectPermissions`.
    const BLOCK: &'static str;
    /// Child element holding the key, e.g. `object`.
    const KEY: &'static str;
    /// Canonical child order, key included.
    const ORDER: &'static [&'static str];

    fn key(&self) -> &str;

    /// Child elements to write, key included. Absent optional children are omitted.
    fn fields(&self) -> Vec<(&'static str, String)>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPermissionEntry {
    pub object: String,
    pub flags: ObjectPermissionFlags,
}

impl MetadataEntry for ObjectPermissionEntry {
    const BLOCK: &'static str = "objectPermissions";
    const KEY: &'static str = "object";
    const ORDER: &'static [&'static str] = &[
        "allowCreate",
        "allowDelete",
        "allowEdit",
        "allowRead",
        "modifyAllRecords",
        "object",
        "viewAllRecords",
    ];

    fn key(&self) -> &str {
        &self.object
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields: Vec<(&'static str, String)> = self
            .flags
            .xml_fields()
            .into_iter()
            .map(|(name, on)| (name, on.to_string()))
            .collect();
        fields.push(("object", self.object.clone()));
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPermissionEntry {
    /// `Object.Field`
    pub field: String,
    pub flags: FieldPermissionFlags,
}

impl MetadataEntry for FieldPermissionEntry {
    const BLOCK: &'static str = "fieldPermissions";
    const KEY: &'static str = "field";
    const ORDER: &'static [&'static str] = &["editable", "field", "readable"];

    fn key(&self) -> &str {
        &self.field
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields: Vec<(&'static str, String)> = self
            .flags
            .xml_fields()
            .into_iter()
            .map(|(name, on)| (name, on.to_string()))
            .collect();
        fields.push(("field", self.field.clone()));
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomLabelEntry {
    pub full_name: String,
    pub value: String,
    pub short_description: String,
    pub language: String,
    pub protected: bool,
    pub categories: Option<String>,
}

impl MetadataEntry for CustomLabelEntry {
    const BLOCK: &'static str = "labels";
    const KEY: &'static str = "fullName";
    const ORDER: &'static [&'static str] = &[
        "categories",
        "fullName",
        "language",
        "protected",
        "shortDescription",
        "value",
    ];

    fn key(&self) -> &str {
        &self.full_name
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::with_capacity(6);
        if let Some(categories) = &self.categories {
            fields.push(("categories", categories.clone()));
        }
        fields.push(("fullName", self.full_name.clone()));
        fields.push(("language", self.language.clone()));
        fields.push(("protected", self.protected.to_string()));
        fields.push(("shortDescription", self.short_description.clone()));
        fields.push(("value", self.value.clone()));
        fields
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// An entry with the same key existed and its values changed.
    Replaced,
    /// No entry with the key existed; one block was added.
    Appended,
    /// An entry with the same key already carried these values.
    Unchanged,
}

/// One repeated block as read from the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEntry {
    pub key: String,
    /// Child element name and unescaped text, in document order.
    pub fields: Vec<(String, String)>,
}

impl BlockEntry {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Index range of one block: `start` is its start tag, `end` its end tag.
#[derive(Debug, Clone, Copy)]
struct BlockSpan {
    start: usize,
    end: usize,
}

/// A child of a block: an element with its events, or anything else (comments).
enum Child {
    Element {
        name: String,
        events: Vec<Event<'static>>,
    },
    Other(Event<'static>),
}

pub struct MetadataDocument {
    events: Vec<Event<'static>>,
    root_start: usize,
    root_end: usize,
    indent: String,
}

impl MetadataDocument {
    pub fn parse(xml: &str) -> Result<Self, SfkitError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let mut events = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Eof => break,
                event => events.push(event.into_owned()),
            }
        }

        let root_start = events
            .iter()
            .position(|e| matches!(e, Event::Start(_)))
            .ok_or_else(|| SfkitError::Metadata("document has no root element".to_string()))?;
        let root_end = matching_end(&events, root_start)?;
        let indent = detect_indent(&events, root_start);

        Ok(Self {
            events,
            root_start,
            root_end,
            indent,
        })
    }

    pub fn load(path: &Path) -> Result<Self, SfkitError> {
        let xml = fs::read_to_string(path)?;
        Self::parse(&xml).map_err(|e| match e {
            SfkitError::Metadata(msg) => {
                SfkitError::Metadata(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Write the whole document back to `path`.
    pub fn save(&self, path: &Path) -> Result<(), SfkitError> {
        let xml = self.to_xml_string()?;
        fs::write(path, xml)?;
        debug!(path = %path.display(), "Metadata file written");
        Ok(())
    }

    pub fn to_xml_string(&self) -> Result<String, SfkitError> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.events {
            writer.write_event(event)?;
        }
        String::from_utf8(writer.into_inner())
            .map_err(|e| SfkitError::Metadata(format!("non UTF-8 output: {}", e)))
    }

    /// Name of the root element, e.g. `PermissionSet`.
    pub fn root_name(&self) -> String {
        match &self.events[self.root_start] {
            Event::Start(start) => element_name(start),
            _ => String::new(),
        }
    }

    /// All blocks named `block`, keyed by their `key` child.
    pub fn entries(&self, block: &str, key: &str) -> Result<Vec<BlockEntry>, SfkitError> {
        self.spans(block)?
            .into_iter()
            .map(|span| {
                let fields = self.block_fields(span)?;
                let key_value = fields
                    .iter()
                    .find(|(n, _)| n == key)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default();
                Ok(BlockEntry {
                    key: key_value,
                    fields,
                })
            })
            .collect()
    }

    pub fn find_entry<E: MetadataEntry>(&self, key: &str) -> Result<Option<BlockEntry>, SfkitError> {
        Ok(self
            .entries(E::BLOCK, E::KEY)?
            .into_iter()
            .find(|entry| entry.key == key))
    }

    pub fn object_permissions(&self, object: &str) -> Result<Option<ObjectPermissionFlags>, SfkitError> {
        Ok(self
            .find_entry::<ObjectPermissionEntry>(object)?
            .map(|entry| {
                ObjectPermissionFlags::from_xml_fields(
                    entry.fields.iter().map(|(n, v)| (n.as_str(), v.as_str())),
                )
            }))
    }

    pub fn field_permissions(&self, field: &str) -> Result<Option<FieldPermissionFlags>, SfkitError> {
        Ok(self
            .find_entry::<FieldPermissionEntry>(field)?
            .map(|entry| {
                FieldPermissionFlags::from_xml_fields(
                    entry.fields.iter().map(|(n, v)| (n.as_str(), v.as_str())),
                )
            }))
    }

    /// Replace the block whose key matches `entry.key()` exactly, or append a new one.
    pub fn upsert<E: MetadataEntry>(&mut self, entry: &E) -> Result<UpsertOutcome, SfkitError> {
        let spans = self.spans(E::BLOCK)?;
        for span in &spans {
            let fields = self.block_fields(*span)?;
            let matches = fields.iter().any(|(n, v)| n == E::KEY && v == entry.key());
            if !matches {
                continue;
            }
            let wanted = canonical_fields(entry);
            let unchanged = wanted
                .iter()
                .all(|(name, value)| fields.iter().any(|(n, v)| n == name && v == value));
            if unchanged {
                return Ok(UpsertOutcome::Unchanged);
            }
            let replacement = self.rebuild_block::<E>(*span, &wanted)?;
            self.events.splice(span.start..=span.end, replacement);
            self.reindex()?;
            return Ok(UpsertOutcome::Replaced);
        }

        self.append::<E>(entry, &spans);
        self.reindex()?;
        Ok(UpsertOutcome::Appended)
    }

    fn append<E: MetadataEntry>(&mut self, entry: &E, spans: &[BlockSpan]) {
        let block = self.new_block(E::BLOCK, &canonical_fields(entry));
        let newline_indent = text_event(&format!("\n{}", self.indent));

        if let Some(last) = spans.last() {
            let at = last.end + 1;
            let mut inserted = vec![newline_indent];
            inserted.extend(block);
            self.events.splice(at..at, inserted);
            return;
        }

        if let Some(sibling) = self.first_sibling_after(E::BLOCK) {
            let mut inserted = block;
            inserted.push(newline_indent);
            self.events.splice(sibling..sibling, inserted);
            return;
        }

        let root_end = self.root_end;
        let mut inserted = vec![newline_indent];
        inserted.extend(block);
        let ends_with_whitespace = root_end > self.root_start + 1
            && matches!(&self.events[root_end - 1], Event::Text(t) if is_whitespace(t));
        if ends_with_whitespace {
            // Keep the existing newline before the root end tag.
            let at = root_end - 1;
            self.events.splice(at..at, inserted);
        } else {
            inserted.push(text_event("\n"));
            self.events.splice(root_end..root_end, inserted);
        }
    }

    /// Start index of the first top-level element whose name sorts after `block`.
    fn first_sibling_after(&self, block: &str) -> Option<usize> {
        self.top_level_starts()
            .into_iter()
            .find(|(_, name)| name.as_str() > block)
            .map(|(index, _)| index)
    }

    fn top_level_starts(&self) -> Vec<(usize, String)> {
        let mut starts = Vec::new();
        let mut depth = 0usize;
        for index in self.root_start + 1..self.root_end {
            match &self.events[index] {
                Event::Start(start) => {
                    if depth == 0 {
                        starts.push((index, element_name(start)));
                    }
                    depth += 1;
                }
                Event::Empty(start) if depth == 0 => starts.push((index, element_name(start))),
                Event::End(_) => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        starts
    }

    fn spans(&self, block: &str) -> Result<Vec<BlockSpan>, SfkitError> {
        self.top_level_starts()
            .into_iter()
            .filter(|(index, name)| {
                name == block && matches!(self.events[*index], Event::Start(_))
            })
            .map(|(start, _)| {
                let end = matching_end(&self.events, start)?;
                Ok(BlockSpan { start, end })
            })
            .collect()
    }

    fn children(&self, span: BlockSpan) -> Result<Vec<Child>, SfkitError> {
        let mut children = Vec::new();
        let mut index = span.start + 1;
        while index < span.end {
            match &self.events[index] {
                Event::Start(start) => {
                    let end = matching_end(&self.events, index)?;
                    children.push(Child::Element {
                        name: element_name(start),
                        events: self.events[index..=end].to_vec(),
                    });
                    index = end + 1;
                    continue;
                }
                Event::Empty(start) => children.push(Child::Element {
                    name: element_name(start),
                    events: vec![self.events[index].clone()],
                }),
                Event::Text(text) if is_whitespace(text) => {}
                other => children.push(Child::Other(other.clone())),
            }
            index += 1;
        }
        Ok(children)
    }

    fn block_fields(&self, span: BlockSpan) -> Result<Vec<(String, String)>, SfkitError> {
        self.children(span)?
            .into_iter()
            .filter_map(|child| match child {
                Child::Element { name, events } => Some((name, events)),
                Child::Other(_) => None,
            })
            .map(|(name, events)| Ok((name, element_text(&events)?)))
            .collect()
    }

    /// New events for an existing block: known children get new values, missing
    /// ones are inserted in canonical position, unknown children are kept.
    fn rebuild_block<E: MetadataEntry>(
        &self,
        span: BlockSpan,
        wanted: &[(&'static str, String)],
    ) -> Result<Vec<Event<'static>>, SfkitError> {
        let mut children = self.children(span)?;

        for (name, value) in wanted {
            let existing = children.iter_mut().find_map(|child| match child {
                Child::Element { name: n, events } if n.as_str() == *name => Some(events),
                _ => None,
            });
            match existing {
                Some(events) => *events = element_events(name, value),
                None => {
                    let at = insertion_point(&children, name, E::ORDER);
                    children.insert(
                        at,
                        Child::Element {
                            name: name.to_string(),
                            events: element_events(name, value),
                        },
                    );
                }
            }
        }

        let inner = format!("\n{}{}", self.indent, self.indent);
        let mut events = vec![self.events[span.start].clone()];
        for child in children {
            events.push(text_event(&inner));
            match child {
                Child::Element { events: child_events, .. } => events.extend(child_events),
                Child::Other(event) => events.push(event),
            }
        }
        events.push(text_event(&format!("\n{}", self.indent)));
        events.push(self.events[span.end].clone());
        Ok(events)
    }

    fn new_block(&self, block: &str, fields: &[(&'static str, String)]) -> Vec<Event<'static>> {
        let inner = format!("\n{}{}", self.indent, self.indent);
        let mut events = vec![Event::Start(BytesStart::new(block.to_string()))];
        for (name, value) in fields {
            events.push(text_event(&inner));
            events.extend(element_events(name, value));
        }
        events.push(text_event(&format!("\n{}", self.indent)));
        events.push(Event::End(BytesEnd::new(block.to_string())));
        events
    }

    fn reindex(&mut self) -> Result<(), SfkitError> {
        self.root_end = matching_end(&self.events, self.root_start)?;
        Ok(())
    }
}

/// Position for a missing child: after the nearest preceding canonical sibling,
/// else before the first following one, else at the end.
fn insertion_point(children: &[Child], name: &str, order: &[&str]) -> usize {
    let rank = |n: &str| order.iter().position(|o| *o == n);
    let Some(own) = rank(name) else {
        return children.len();
    };
    let mut after = None;
    for (index, child) in children.iter().enumerate() {
        if let Child::Element { name: n, .. } = child {
            match rank(n.as_str()) {
                Some(r) if r < own => after = Some(index + 1),
                Some(r) if r > own && after.is_none() => return index,
                _ => {}
            }
        }
    }
    after.unwrap_or(children.len())
}

/// Entry fields sorted into canonical element order.
fn canonical_fields<E: MetadataEntry>(entry: &E) -> Vec<(&'static str, String)> {
    let mut fields = entry.fields();
    fields.sort_by_key(|(name, _)| {
        E::ORDER
            .iter()
            .position(|o| o == name)
            .unwrap_or(usize::MAX)
    });
    fields
}

fn matching_end(events: &[Event<'static>], start: usize) -> Result<usize, SfkitError> {
    let mut depth = 0usize;
    for (index, event) in events.iter().enumerate().skip(start) {
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(index);
                }
            }
            _ => {}
        }
    }
    Err(SfkitError::Metadata("unterminated element".to_string()))
}

fn detect_indent(events: &[Event<'static>], root_start: usize) -> String {
    match events.get(root_start + 1) {
        Some(Event::Text(text)) if is_whitespace(text) => {
            let raw = String::from_utf8_lossy(text).into_owned();
            match raw.rsplit_once('\n') {
                Some((_, indent)) if !indent.is_empty() => indent.to_string(),
                _ => DEFAULT_INDENT.to_string(),
            }
        }
        _ => DEFAULT_INDENT.to_string(),
    }
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn element_text(events: &[Event<'static>]) -> Result<String, SfkitError> {
    let mut value = String::new();
    for event in events {
        match event {
            Event::Text(text) => value.push_str(&text.unescape()?),
            Event::CData(data) => value.push_str(&String::from_utf8_lossy(data)),
            _ => {}
        }
    }
    Ok(value)
}

fn element_events(name: &str, value: &str) -> Vec<Event<'static>> {
    vec![
        Event::Start(BytesStart::new(name.to_string())),
        Event::Text(BytesText::from_escaped(partial_escape(value)).into_owned()),
        Event::End(BytesEnd::new(name.to_string())),
    ]
}

fn text_event(raw: &str) -> Event<'static> {
    Event::Text(BytesText::from_escaped(raw.to_string()))
}

fn is_whitespace(text: &BytesText<'_>) -> bool {
    text.iter().all(|b| b.is_ascii_whitespace())
}
