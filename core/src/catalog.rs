//! Decoder for the catalog service's XML documents.
//!
//! The catalog answers with
//! `<books><book isbn="..."><title>..</title>...</book>...</books>`. The
//! root element's name is not checked. The document is first read into a
//! small element tree, then every `book` element is turned into a
//! `BookRow` in document order.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ApiError;
use crate::types::BookRow;

const BOOK: &str = "book";

#[derive(Debug)]
struct Element {
    name: String,
    isbn: Option<String>,
    children: Vec<Node>,
}

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    /// First element named `name` below this one, in document order.
    fn first_descendant(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|child| match child {
            Node::Element(el) if el.name == name => Some(el),
            Node::Element(el) => el.first_descendant(name),
            Node::Text(_) => None,
        })
    }

    fn text_content(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.text_content(out),
            }
        }
    }

    fn child_text(&self, name: &str) -> String {
        let mut text = String::new();
        if let Some(el) = self.first_descendant(name) {
            el.text_content(&mut text);
        }
        text
    }

    fn collect_books<'a>(&'a self, out: &mut Vec<&'a Element>) {
        if self.name == BOOK {
            out.push(self);
        }
        for child in &self.children {
            if let Node::Element(el) = child {
                el.collect_books(out);
            }
        }
    }

    fn to_row(&self) -> BookRow {
        BookRow {
            isbn: self.isbn.clone().unwrap_or_default(),
            title: self.child_text("title"),
            author: self.child_text("author"),
            year: self.child_text("year"),
            genre: self.child_text("genre"),
            price: self.child_text("price"),
            stock: self.child_text("stock"),
            format: self.child_text("format"),
        }
    }
}

/// Decode a catalog document into rows, one per `book` element.
///
/// A well-formed document without books yields an empty vector. Anything
/// that is not well-formed XML fails with `ApiError::Decode`.
pub fn decode_catalog(xml: &str) -> Result<Vec<BookRow>, ApiError> {
    let root = parse_tree(xml)?;
    let mut books = Vec::new();
    root.collect_books(&mut books);
    Ok(books.into_iter().map(Element::to_row).collect())
}

fn parse_tree(xml: &str) -> Result<Element, ApiError> {
    let mut reader = Reader::from_str(xml);
    let mut open: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|e| ApiError::Decode(format!("at byte {position}: {e}")))?;
        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(decode_error(position, "content after the root element"));
                }
                open.push(element(&reader, &start, position)?);
            }
            Event::Empty(start) => {
                if root.is_some() {
                    return Err(decode_error(position, "content after the root element"));
                }
                let el = element(&reader, &start, position)?;
                close(el, &mut open, &mut root);
            }
            Event::End(_) => {
                let el = open
                    .pop()
                    .ok_or_else(|| decode_error(position, "closing tag without an open element"))?;
                close(el, &mut open, &mut root);
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| ApiError::Decode(format!("at byte {position}: {e}")))?;
                push_text(&mut open, &root, text.into_owned(), position)?;
            }
            Event::CData(data) => {
                let text = reader
                    .decoder()
                    .decode(&data)
                    .map_err(|e| ApiError::Decode(format!("at byte {position}: {e}")))?;
                push_text(&mut open, &root, text.into_owned(), position)?;
            }
            Event::Eof => break,
            // Declarations, processing instructions (xml-stylesheet),
            // comments and doctype carry no catalog data.
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(ApiError::Decode(format!(
            "unexpected end of document: <{}> is not closed",
            unclosed.name
        )));
    }
    root.ok_or_else(|| ApiError::Decode("document has no root element".to_string()))
}

fn element(reader: &Reader<&[u8]>, start: &BytesStart<'_>, position: usize) -> Result<Element, ApiError> {
    let name = reader
        .decoder()
        .decode(start.name().as_ref())
        .map_err(|e| ApiError::Decode(format!("at byte {position}: {e}")))?
        .into_owned();
    let isbn = match start.try_get_attribute("isbn") {
        Ok(Some(attr)) => Some(
            attr.unescape_value()
                .map_err(|e| ApiError::Decode(format!("at byte {position}: {e}")))?
                .into_owned(),
        ),
        Ok(None) => None,
        Err(e) => return Err(ApiError::Decode(format!("at byte {position}: {e}"))),
    };
    Ok(Element {
        name,
        isbn,
        children: Vec::new(),
    })
}

fn close(el: Element, open: &mut [Element], root: &mut Option<Element>) {
    match open.last_mut() {
        Some(parent) => parent.children.push(Node::Element(el)),
        None => *root = Some(el),
    }
}

fn push_text(open: &mut [Element], root: &Option<Element>, text: String, position: usize) -> Result<(), ApiError> {
    match open.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Text(text));
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None if root.is_some() => Err(decode_error(position, "content after the root element")),
        None => Err(decode_error(position, "text before the root element")),
    }
}

fn decode_error(position: usize, message: &str) -> ApiError {
    ApiError::Decode(format!("at byte {position}: {message}"))
}
