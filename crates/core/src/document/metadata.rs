//! Metadata synthesis: the Info dictionary, the XMP stream, and the
//! structural report.
//!
//! XMP fields override Info fields per field. The XMP packet is parsed
//! with a small namespace-aware XML reader; when that fails, a
//! tag-search fallback extracts the same fields by opening/closing-tag
//! matching.

use crate::document::page::Page;
use crate::document::reader::Reader;
use crate::error::Result;
use crate::model::value::ValueKind;
use serde::Serialize;
use std::io::Write;
use tracing::debug;

/// Unified document metadata (Info + XMP fields).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Meta {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subject: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub keywords: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub creator: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub producer: String,
    #[serde(rename = "creationDate", skip_serializing_if = "String::is_empty")]
    pub creation_date: String,
    #[serde(rename = "modDate", skip_serializing_if = "String::is_empty")]
    pub mod_date: String,
}

/// Access permissions derived from `Encrypt.P` (ISO 32000-1 §7.6.3).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccessPermission {
    pub can_print: bool,
    pub can_print_faithful: bool,
    pub can_modify: bool,
    pub extract_content: bool,
    pub modify_annotations: bool,
    pub fill_in_form: bool,
    pub extract_for_accessibility: bool,
    pub assemble_document: bool,
}

/// The comprehensive metadata report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetadataFull {
    #[serde(flatten)]
    pub meta: Meta,

    #[serde(rename = "pdf:PDFVersion")]
    pub pdf_version: String,
    #[serde(rename = "pdf:hasXMP")]
    pub has_xmp: bool,
    #[serde(rename = "pdf:hasCollection")]
    pub has_collection: bool,
    #[serde(rename = "pdf:encrypted")]
    pub encrypted: bool,
    #[serde(rename = "xmpTPg:NPages")]
    pub n_pages: usize,
    #[serde(rename = "pdf:containsNonEmbeddedFont")]
    pub contains_non_embedded_font: bool,

    pub access_permission: AccessPermission,
}

#[derive(Debug, Default)]
struct XmpFields {
    title: String,
    creator: String,
    subject: String,
    keywords: String,
    creator_tool: String,
    producer: String,
    create_date: String,
    modify_date: String,
}

/// `a` when non-blank, otherwise `b`.
fn prefer(a: String, b: String) -> String {
    if a.trim().is_empty() {
        b
    } else {
        a
    }
}

impl Reader {
    fn read_info(&self) -> Meta {
        let info = self.trailer().key("Info");
        Meta {
            title: info.key("Title").text(),
            author: info.key("Author").text(),
            subject: info.key("Subject").text(),
            keywords: info.key("Keywords").text(),
            creator: info.key("Creator").text(),
            producer: info.key("Producer").text(),
            creation_date: info.key("CreationDate").text(),
            mod_date: info.key("ModDate").text(),
        }
    }

    /// The raw XMP packet from `/Root/Metadata`, empty when absent.
    fn read_xmp(&self) -> Result<String> {
        let md = self.trailer().key("Root").key("Metadata");
        if md.kind() != ValueKind::Stream {
            return Ok(String::new());
        }
        debug!("found XMP stream");
        let data = md.stream_data()?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Unified metadata with XMP taking precedence over Info.
    pub fn metadata(&self) -> Result<Meta> {
        let info = self.read_info();
        let xmp_xml = self.read_xmp().unwrap_or_default();
        let xf = if xmp_xml.is_empty() {
            XmpFields::default()
        } else {
            match xmp::parse(&xmp_xml) {
                Some(fields) => fields,
                None => xmp::parse_fallback(&xmp_xml),
            }
        };
        Ok(Meta {
            title: prefer(xf.title, info.title),
            author: prefer(xf.creator, info.author),
            subject: prefer(xf.subject, info.subject),
            keywords: prefer(xf.keywords, info.keywords),
            creator: prefer(xf.creator_tool, info.creator),
            producer: prefer(xf.producer, info.producer),
            creation_date: prefer(xf.create_date, info.creation_date),
            mod_date: prefer(xf.modify_date, info.mod_date),
        })
    }

    /// The header version string, e.g. "1.7".
    pub fn header_version(&self) -> String {
        let (major, minor) = self.version();
        format!("{}.{}", major, minor)
    }

    fn has_xmp(&self) -> bool {
        self.trailer().key("Root").key("Metadata").kind() == ValueKind::Stream
    }

    fn has_collection(&self) -> bool {
        !self.trailer().key("Root").key("Collection").is_null()
    }

    /// Effective access permissions from `Encrypt.P`; everything is
    /// allowed when the file is not encrypted.
    pub fn access_permissions(&self) -> AccessPermission {
        let enc = self.trailer().key("Encrypt");
        if enc.is_null() {
            return AccessPermission {
                can_print: true,
                can_print_faithful: true,
                can_modify: true,
                extract_content: true,
                modify_annotations: true,
                fill_in_form: true,
                extract_for_accessibility: true,
                assemble_document: true,
            };
        }
        let p = enc.key("P").int64() as u32;
        let bit = |n: u32| p & (1 << (n - 1)) != 0;
        let modify_annotations = bit(6);
        let can_print = bit(3);
        AccessPermission {
            can_print,
            can_print_faithful: bit(12) || can_print,
            can_modify: bit(4),
            extract_content: bit(5),
            modify_annotations,
            fill_in_form: bit(9) || modify_annotations,
            extract_for_accessibility: bit(10),
            assemble_document: bit(11),
        }
    }

    /// Whether any page references a font without an embedded font file.
    ///
    /// A font counts as embedded iff its FontDescriptor carries one of
    /// `FontFile`, `FontFile2` or `FontFile3` as a stream.
    pub fn contains_non_embedded_font(&self) -> bool {
        for i in 1..=self.num_pages() {
            let p = self.page(i);
            let fd = p.resources().key("Font");
            if fd.kind() != ValueKind::Dict {
                continue;
            }
            for name in fd.keys() {
                if !font_is_embedded(&p, &name) {
                    return true;
                }
            }
        }
        false
    }

    /// The comprehensive metadata report.
    pub fn metadata_full(&self) -> Result<MetadataFull> {
        let meta = self.metadata()?;
        Ok(MetadataFull {
            meta,
            pdf_version: self.header_version(),
            has_xmp: self.has_xmp(),
            has_collection: self.has_collection(),
            encrypted: self.is_encrypted(),
            n_pages: self.num_pages(),
            contains_non_embedded_font: self.contains_non_embedded_font(),
            access_permission: self.access_permissions(),
        })
    }

    /// Write the full metadata report as pretty JSON.
    pub fn metadata_json<W: Write>(&self, w: &mut W) -> Result<()> {
        let full = self.metadata_full()?;
        serde_json::to_writer_pretty(&mut *w, &full)?;
        w.write_all(b"\n")?;
        Ok(())
    }
}

fn font_is_embedded(p: &Page<'_>, name: &str) -> bool {
    let f = p.font(name);
    let desc = f.value().key("FontDescriptor");
    if desc.kind() != ValueKind::Dict {
        return false;
    }
    ["FontFile", "FontFile2", "FontFile3"]
        .iter()
        .any(|k| desc.key(k).kind() == ValueKind::Stream)
}

/// XMP packet parsing.
mod xmp {
    use super::XmpFields;

    const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
    const NS_PDF: &str = "http://ns.adobe.com/pdf/1.3/";
    const NS_XMP: &str = "http://ns.adobe.com/xap/1.0/";
    const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

    #[derive(Debug, Default)]
    struct Node {
        uri: String,
        local: String,
        text: String,
        children: Vec<Node>,
    }

    /// Parse the packet and pull the known fields; `None` when the XML
    /// is structurally broken (the caller then runs the tag fallback).
    pub(super) fn parse(xml: &str) -> Option<XmpFields> {
        let root = parse_document(xml)?;
        let mut f = XmpFields::default();
        collect(&root, &mut f);
        Some(f)
    }

    fn collect(node: &Node, f: &mut XmpFields) {
        let set = |slot: &mut String, value: String| {
            let value = value.trim().to_string();
            if !value.is_empty() {
                *slot = value;
            }
        };
        match (node.uri.as_str(), node.local.as_str()) {
            (NS_DC, "title") => set(&mut f.title, list_head(node)),
            (NS_DC, "creator") => set(&mut f.creator, list_head(node)),
            (NS_DC, "description") => set(&mut f.subject, list_head(node)),
            (NS_PDF, "Keywords") => set(&mut f.keywords, node.text.clone()),
            (NS_PDF, "Producer") => set(&mut f.producer, node.text.clone()),
            (NS_XMP, "CreatorTool") => set(&mut f.creator_tool, node.text.clone()),
            (NS_XMP, "CreateDate") => set(&mut f.create_date, node.text.clone()),
            (NS_XMP, "ModifyDate") => set(&mut f.modify_date, node.text.clone()),
            _ => {}
        }
        for child in &node.children {
            collect(child, f);
        }
    }

    /// First `rdf:li` under an `rdf:Alt`/`rdf:Seq`/`rdf:Bag` child, or
    /// the element's own text for the simple form.
    fn list_head(node: &Node) -> String {
        for child in &node.children {
            if child.uri == NS_RDF {
                for li in &child.children {
                    if li.uri == NS_RDF && li.local == "li" {
                        return li.text.clone();
                    }
                }
            }
        }
        node.text.clone()
    }

    // -- minimal namespace-aware XML reader --------------------------------

    struct Frame {
        node: Node,
        /// Prefix to namespace-URI bindings declared on this element.
        ns: Vec<(String, String)>,
    }

    fn parse_document(xml: &str) -> Option<Node> {
        let bytes = xml.as_bytes();
        let mut pos = 0usize;
        let mut stack: Vec<Frame> = vec![Frame {
            node: Node::default(),
            ns: vec![("xml".into(), "http://www.w3.org/XML/1998/namespace".into())],
        }];

        while pos < bytes.len() {
            match bytes[pos] {
                b'<' => {
                    if bytes[pos..].starts_with(b"<!--") {
                        pos = skip_until(xml, pos, "-->")?;
                    } else if bytes[pos..].starts_with(b"<![CDATA[") {
                        let end = xml[pos + 9..].find("]]>")? + pos + 9;
                        let text = &xml[pos + 9..end];
                        if let Some(top) = stack.last_mut() {
                            top.node.text.push_str(text);
                        }
                        pos = end + 3;
                    } else if bytes[pos..].starts_with(b"<?") {
                        pos = skip_until(xml, pos, "?>")?;
                    } else if bytes[pos..].starts_with(b"<!") {
                        pos = skip_until(xml, pos, ">")?;
                    } else if bytes[pos..].starts_with(b"</") {
                        let end = xml[pos..].find('>')? + pos;
                        let name = xml[pos + 2..end].trim();
                        let frame = stack.pop()?;
                        if stack.is_empty() {
                            return None;
                        }
                        let (prefix, local) = split_name(name);
                        if frame.node.local != local
                            || frame.node.uri != lookup_ns(&stack, &frame.ns, prefix)
                        {
                            return None;
                        }
                        stack.last_mut()?.node.children.push(frame.node);
                        pos = end + 1;
                    } else {
                        let end = xml[pos..].find('>')? + pos;
                        let self_closing = bytes[end - 1] == b'/';
                        let inner_end = if self_closing { end - 1 } else { end };
                        let tag = &xml[pos + 1..inner_end];
                        let frame = open_element(tag, &stack)?;
                        if self_closing {
                            stack.last_mut()?.node.children.push(frame.node);
                        } else {
                            stack.push(frame);
                        }
                        pos = end + 1;
                    }
                }
                _ => {
                    let end = xml[pos..].find('<').map(|i| i + pos).unwrap_or(xml.len());
                    let text = decode_entities(&xml[pos..end]);
                    if let Some(top) = stack.last_mut() {
                        top.node.text.push_str(&text);
                    }
                    pos = end;
                }
            }
        }

        if stack.len() != 1 {
            return None;
        }
        Some(stack.pop()?.node)
    }

    fn open_element(tag: &str, stack: &[Frame]) -> Option<Frame> {
        let mut parts = tag.split_whitespace();
        let name = parts.next()?;
        let mut ns = Vec::new();

        // Attributes matter only for xmlns declarations.
        let attrs = tag[name.len()..].trim();
        let mut rest = attrs;
        while let Some(eq) = rest.find('=') {
            let key = rest[..eq].trim().to_string();
            let after = rest[eq + 1..].trim_start();
            let quote = after.chars().next()?;
            if quote != '"' && quote != '\'' {
                return None;
            }
            let close = after[1..].find(quote)? + 1;
            let value = decode_entities(&after[1..close]);
            if key == "xmlns" {
                ns.push((String::new(), value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                ns.push((prefix.to_string(), value));
            }
            rest = &after[close + 1..];
        }

        let (prefix, local) = split_name(name);
        let uri = {
            // Bindings on this very element are in scope for its name.
            let own = ns
                .iter()
                .rev()
                .find(|(p, _)| p == prefix)
                .map(|(_, u)| u.clone());
            own.unwrap_or_else(|| lookup_ns(stack, &[], prefix))
        };
        Some(Frame {
            node: Node {
                uri,
                local: local.to_string(),
                text: String::new(),
                children: Vec::new(),
            },
            ns,
        })
    }

    fn split_name(name: &str) -> (&str, &str) {
        match name.split_once(':') {
            Some((p, l)) => (p, l),
            None => ("", name),
        }
    }

    fn lookup_ns(stack: &[Frame], own: &[(String, String)], prefix: &str) -> String {
        for (p, u) in own.iter().rev() {
            if p == prefix {
                return u.clone();
            }
        }
        for frame in stack.iter().rev() {
            for (p, u) in frame.ns.iter().rev() {
                if p == prefix {
                    return u.clone();
                }
            }
        }
        String::new()
    }

    fn skip_until(xml: &str, pos: usize, end: &str) -> Option<usize> {
        xml[pos..].find(end).map(|i| pos + i + end.len())
    }

    fn decode_entities(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let mut rest = s;
        while let Some(amp) = rest.find('&') {
            out.push_str(&rest[..amp]);
            let tail = &rest[amp..];
            let semi = match tail.find(';') {
                Some(i) if i <= 10 => i,
                _ => {
                    out.push('&');
                    rest = &rest[amp + 1..];
                    continue;
                }
            };
            match &tail[1..semi] {
                "amp" => out.push('&'),
                "lt" => out.push('<'),
                "gt" => out.push('>'),
                "quot" => out.push('"'),
                "apos" => out.push('\''),
                ent if ent.starts_with("#x") || ent.starts_with("#X") => {
                    if let Ok(cp) = u32::from_str_radix(&ent[2..], 16) {
                        if let Some(c) = char::from_u32(cp) {
                            out.push(c);
                        }
                    }
                }
                ent if ent.starts_with('#') => {
                    if let Ok(cp) = ent[1..].parse::<u32>() {
                        if let Some(c) = char::from_u32(cp) {
                            out.push(c);
                        }
                    }
                }
                _ => out.push_str(&tail[..semi + 1]),
            }
            rest = &rest[amp + semi + 1..];
        }
        out.push_str(rest);
        out
    }

    // -- tag-search fallback -------------------------------------------------

    /// Extract fields by literal opening/closing-tag matching, used when
    /// the packet does not parse as XML.
    pub(super) fn parse_fallback(xml: &str) -> XmpFields {
        let get = |candidates: &[&str]| -> String {
            for t in candidates {
                let open = format!("<{}>", t);
                let close = format!("</{}>", t);
                if let Some(i) = xml.find(&open) {
                    if let Some(j) = xml[i + open.len()..].find(&close) {
                        return strip_tags(&xml[i + open.len()..i + open.len() + j])
                            .trim()
                            .to_string();
                    }
                }
            }
            String::new()
        };
        XmpFields {
            title: get(&["dc:title", "pdf:Title", "xmp:Title", "rdf:li"]),
            creator: get(&["dc:creator", "pdf:Author", "xmp:Author", "rdf:li"]),
            subject: get(&["dc:description", "pdf:Subject"]),
            keywords: get(&["pdf:Keywords", "xmp:Keywords"]),
            creator_tool: get(&["xmp:CreatorTool"]),
            producer: get(&["pdf:Producer"]),
            create_date: get(&["xmp:CreateDate"]),
            modify_date: get(&["xmp:ModifyDate"]),
        }
    }

    fn strip_tags(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let mut in_tag = false;
        for c in s.chars() {
            match c {
                '<' => in_tag = true,
                '>' => in_tag = false,
                _ => {
                    if !in_tag {
                        out.push(c);
                    }
                }
            }
        }
        out
    }

}
