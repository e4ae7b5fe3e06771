//! Reader for Tenhou's mjlog XML.
//!
//! An mjlog is a flat sequence of elements, almost all of them empty, e.g.
//! `<INIT seed="0,0,0,2,4,92" oya="0" hai0="..."/>` followed by `<T34/>`,
//! `<D34/>` and so on. The reader only keeps element names and attributes;
//! text content, comments, declarations and closing tags are skipped.

use crate::event::Event;

use ahash::AHashMap;
use anyhow::{Context, Result};
use std::fs;
use std::io::Read;
use std::iter::Peekable;
use std::path::Path;
use std::str::CharIndices;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One element of the log with its raw attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub attrs: AHashMap<String, String>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected end of input inside element starting at byte {0}")]
    UnexpectedEof(usize),
    #[error("expected {expected:?} at byte {pos}, found {found:?}")]
    Expected {
        pos: usize,
        expected: char,
        found: char,
    },
    #[error("element at byte {0} has no name")]
    EmptyName(usize),
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: AHashMap::new(),
        }
    }

    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }
}

/// Scans every opening or empty element of `xml` in document order.
pub fn parse_tags(xml: &str) -> Result<Vec<Tag>, ParseError> {
    let mut tags = Vec::new();
    let mut chars = xml.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c != '<' {
            continue;
        }
        match chars.peek() {
            Some(&(_, '?' | '!' | '/')) => {
                skip_past(&mut chars, '>', start)?;
                continue;
            }
            None => return Err(ParseError::UnexpectedEof(start)),
            _ => {}
        }

        let mut name = String::new();
        while let Some(&(_, c)) = chars.peek() {
            if c.is_whitespace() || c == '/' || c == '>' {
                break;
            }
            name.push(c);
            chars.next();
        }
        if name.is_empty() {
            return Err(ParseError::EmptyName(start));
        }

        let mut tag = Tag::new(name);
        loop {
            skip_whitespace(&mut chars);
            let (pos, c) = chars.next().ok_or(ParseError::UnexpectedEof(start))?;
            match c {
                '>' => break,
                '/' => {
                    expect(&mut chars, '>', start)?;
                    break;
                }
                _ => {
                    let mut key = String::from(c);
                    while let Some(&(_, c)) = chars.peek() {
                        if c == '=' || c.is_whitespace() {
                            break;
                        }
                        key.push(c);
                        chars.next();
                    }
                    skip_whitespace(&mut chars);
                    expect(&mut chars, '=', start)?;
                    skip_whitespace(&mut chars);
                    let (qpos, quote) = chars.next().ok_or(ParseError::UnexpectedEof(start))?;
                    if quote != '"' && quote != '\'' {
                        return Err(ParseError::Expected {
                            pos: qpos,
                            expected: '"',
                            found: quote,
                        });
                    }
                    let mut raw = String::new();
                    loop {
                        let (_, c) = chars.next().ok_or(ParseError::UnexpectedEof(pos))?;
                        if c == quote {
                            break;
                        }
                        raw.push(c);
                    }
                    tag.attrs.insert(key, unescape(&raw));
                }
            }
        }
        tags.push(tag);
    }

    Ok(tags)
}

/// Parses the log and converts every element into an [`Event`]. The root
/// `mjloggm` element is dropped.
pub fn parse_events(xml: &str) -> Result<Vec<Event>> {
    let tags = parse_tags(xml).context("failed to scan mjlog")?;
    tags.iter()
        .filter(|tag| tag.name != "mjloggm")
        .enumerate()
        .map(|(idx, tag)| {
            Event::try_from(tag).with_context(|| format!("malformed event {idx}: <{}>", tag.name))
        })
        .collect()
}

/// Reads a plain or gzip-compressed mjlog file.
pub fn read_log(path: &Path) -> Result<Vec<Event>> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let xml = if raw.starts_with(&GZIP_MAGIC) {
        let mut xml = String::new();
        flate2::read::GzDecoder::new(raw.as_slice())
            .read_to_string(&mut xml)
            .with_context(|| format!("failed to decompress {}", path.display()))?;
        xml
    } else {
        String::from_utf8(raw).with_context(|| format!("{} is not UTF-8", path.display()))?
    };
    parse_events(&xml).with_context(|| format!("failed to parse {}", path.display()))
}

fn skip_whitespace(chars: &mut Peekable<CharIndices<'_>>) {
    while chars.next_if(|&(_, c)| c.is_whitespace()).is_some() {}
}

fn skip_past(chars: &mut Peekable<CharIndices<'_>>, end: char, start: usize) -> Result<(), ParseError> {
    chars
        .find(|&(_, c)| c == end)
        .map(|_| ())
        .ok_or(ParseError::UnexpectedEof(start))
}

fn expect(chars: &mut Peekable<CharIndices<'_>>, expected: char, start: usize) -> Result<(), ParseError> {
    match chars.next() {
        Some((_, c)) if c == expected => Ok(()),
        Some((pos, found)) => Err(ParseError::Expected {
            pos,
            expected,
            found,
        }),
        None => Err(ParseError::UnexpectedEof(start)),
    }
}

fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
