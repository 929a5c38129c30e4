//! Markup parser producing the arena document tree.
//!
//! The parser is deliberately narrow: it recognizes exactly the constructs
//! the rewrite engine needs to walk (elements, text, comments, CDATA,
//! directives) and preserves attribute insertion order and raw attribute
//! text, so the engine's offset arithmetic over attribute values stays
//! valid. It does no entity decoding.

use crate::dom::node::{Document, NodeId};
use crate::error::ParseError;

/// Elements whose content is raw text ended only by the matching close tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Options controlling how markup is parsed.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Parse in XHTML mode. Currently informational; kept so callers can
    /// thread one options value through parse and render.
    pub xhtml: bool,
    /// Strip control bytes and escape stray `&` before parsing.
    pub sanitize: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            xhtml: true,
            sanitize: false,
        }
    }
}

/// Parse markup into a [`Document`].
pub fn parse(markup: &str, options: &ParseOptions) -> Result<Document, ParseError> {
    let sanitized;
    let src = if options.sanitize {
        sanitized = sanitize(markup);
        &sanitized
    } else {
        markup
    };

    Parser::new(src).run()
}

/// Replace symbols that can break parsing: control bytes are dropped and
/// `&` that does not begin an entity is escaped to `&amp;`.
pub fn sanitize(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;
    while let Some(idx) = rest.find(|c: char| c == '&' || ('\x00'..='\x08').contains(&c)) {
        out.push_str(&rest[..idx]);
        let c = rest[idx..].chars().next().unwrap();
        rest = &rest[idx + c.len_utf8()..];
        if c == '&' {
            if starts_with_entity(rest) {
                out.push('&');
            } else {
                out.push_str("&amp;");
            }
        }
        // control bytes are dropped on the floor
    }
    out.push_str(rest);
    out
}

fn starts_with_entity(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    let mut pos = 0;
    if bytes.first() == Some(&b'#') {
        pos += 1;
        if bytes.get(pos) == Some(&b'x') || bytes.get(pos) == Some(&b'X') {
            pos += 1;
        }
    }
    let start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_alphanumeric() {
        pos += 1;
    }
    pos > start && bytes.get(pos) == Some(&b';')
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    doc: Document,
    stack: Vec<NodeId>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        let doc = Document::new();
        let root = doc.root();
        Self {
            src,
            pos: 0,
            doc,
            stack: vec![root],
        }
    }

    fn run(mut self) -> Result<Document, ParseError> {
        while self.pos < self.src.len() {
            match self.rest().find('<') {
                None => {
                    self.emit_text(self.pos, self.src.len());
                    self.pos = self.src.len();
                }
                Some(offset) => {
                    self.emit_text(self.pos, self.pos + offset);
                    self.pos += offset;
                    self.markup()?;
                }
            }
        }
        // open elements at end of input are implicitly closed
        Ok(self.doc)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn parent(&self) -> NodeId {
        *self.stack.last().expect("root never leaves the stack")
    }

    fn emit_text(&mut self, start: usize, end: usize) {
        if start < end {
            let parent = self.parent();
            self.doc.create_text(parent, &self.src[start..end]);
        }
    }

    fn markup(&mut self) -> Result<(), ParseError> {
        let rest = self.rest();
        if let Some(body) = rest.strip_prefix("<!--") {
            let end = body
                .find("-->")
                .ok_or_else(|| ParseError::unterminated("comment", self.pos))?;
            let parent = self.parent();
            self.doc.create_comment(parent, &body[..end]);
            self.pos += 4 + end + 3;
        } else if let Some(body) = rest.strip_prefix("<![CDATA[") {
            let end = body
                .find("]]>")
                .ok_or_else(|| ParseError::unterminated("CDATA section", self.pos))?;
            let parent = self.parent();
            self.doc.create_cdata(parent, &body[..end]);
            self.pos += 9 + end + 3;
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            let end = rest
                .find('>')
                .ok_or_else(|| ParseError::unterminated("directive", self.pos))?;
            let parent = self.parent();
            self.doc.create_directive(parent, &rest[1..end]);
            self.pos += end + 1;
        } else if let Some(body) = rest.strip_prefix("</") {
            let end = body
                .find('>')
                .ok_or_else(|| ParseError::unterminated("close tag", self.pos))?;
            self.close_element(body[..end].trim());
            self.pos += 2 + end + 1;
        } else {
            self.open_tag()?;
        }
        Ok(())
    }

    fn close_element(&mut self, name: &str) {
        // pop to the nearest matching open element; an unmatched close tag
        // (e.g. the explicit close of a void element) is ignored
        if let Some(depth) = self
            .stack
            .iter()
            .rposition(|&id| self.doc.node(id).name().eq_ignore_ascii_case(name))
        {
            if depth > 0 {
                self.stack.truncate(depth);
            }
        }
    }

    fn open_tag(&mut self) -> Result<(), ParseError> {
        debug_assert!(self.rest().starts_with('<'));
        let tag_pos = self.pos;
        self.pos += 1;

        let name_len = self
            .rest()
            .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
            .ok_or_else(|| ParseError::unterminated("tag", tag_pos))?;
        let name = &self.src[self.pos..self.pos + name_len];
        self.pos += name_len;

        let parent = self.parent();
        let id = self.doc.create_element(parent, name);

        let self_closed = self.attributes(id, tag_pos)?;
        let void = is_void_element(name);

        if !self_closed && !void {
            if RAW_TEXT_ELEMENTS
                .iter()
                .any(|raw| name.eq_ignore_ascii_case(raw))
            {
                self.raw_text(id, name);
            } else {
                self.stack.push(id);
            }
        }
        Ok(())
    }

    /// Parse the attribute list of an open tag. Returns true when the tag
    /// was explicitly self-closed with `/>`.
    fn attributes(&mut self, id: NodeId, tag_pos: usize) -> Result<bool, ParseError> {
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(ParseError::unterminated("tag", tag_pos));
            }
            if let Some(after) = rest.strip_prefix("/>") {
                self.pos = self.src.len() - after.len();
                return Ok(true);
            }
            if rest.starts_with('/') {
                // stray slash inside the tag, skip it
                self.pos += 1;
                continue;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return Ok(false);
            }

            let name_len = rest
                .find(|c: char| c.is_ascii_whitespace() || c == '=' || c == '>' || c == '/')
                .ok_or_else(|| ParseError::unterminated("tag", tag_pos))?;
            let name = &self.src[self.pos..self.pos + name_len];
            self.pos += name_len;

            self.skip_whitespace();
            if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                let value = self.attribute_value(name, tag_pos)?;
                self.doc.push_attr(id, name, value);
            } else {
                // valueless attribute
                self.doc.push_attr(id, name, "");
            }
        }
    }

    fn attribute_value(&mut self, name: &str, tag_pos: usize) -> Result<&'a str, ParseError> {
        let rest = self.rest();
        if let Some(quote) = rest.chars().next().filter(|&c| c == '"' || c == '\'') {
            let body = &rest[1..];
            let end = body.find(quote).ok_or_else(|| ParseError::Attribute {
                name: name.to_string(),
                position: tag_pos,
            })?;
            let value = &body[..end];
            self.pos += 1 + end + 1;
            Ok(value)
        } else {
            let end = rest
                .find(|c: char| c.is_ascii_whitespace() || c == '>')
                .ok_or_else(|| ParseError::unterminated("tag", tag_pos))?;
            let value = &rest[..end];
            self.pos += end;
            Ok(value)
        }
    }

    /// Consume raw text content up to the matching close tag. Script and
    /// style bodies may contain `<` freely, so no markup is recognized
    /// inside them. A missing close tag swallows the remaining input.
    fn raw_text(&mut self, id: NodeId, name: &str) {
        let rest = self.rest();
        let lower = rest.to_ascii_lowercase();
        let close = format!("</{}", name.to_ascii_lowercase());
        match lower.find(&close) {
            Some(end) => {
                if end > 0 {
                    self.doc.create_text(id, &rest[..end]);
                }
                let after_close = match rest[end..].find('>') {
                    Some(gt) => end + gt + 1,
                    None => rest.len(),
                };
                self.pos += after_close;
            }
            None => {
                if !rest.is_empty() {
                    self.doc.create_text(id, rest);
                }
                self.pos = self.src.len();
            }
        }
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }
}

fn is_void_element(name: &str) -> bool {
    const VOID: &[&str] = &[
        "area", "base", "basefont", "br", "col", "command", "embed", "frame", "hr", "img",
        "input", "isindex", "keygen", "link", "meta", "param", "source", "track", "wbr",
    ];
    VOID.iter().any(|void| name.eq_ignore_ascii_case(void))
}
