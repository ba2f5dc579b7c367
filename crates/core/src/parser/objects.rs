//! Object parser: builds PDF objects from token sequences.
//!
//! Handles the recursive dict/array grammar, indirect references
//! (`N G R`, gated by `allow_objptr`), object definitions (`N G obj`) and
//! stream detection (a dict body followed by the `stream` keyword, gated
//! by `allow_stream`).

use crate::error::{PdfError, Result};
use crate::model::{Dict, ObjDef, ObjPtr, Object, Stream};
use crate::parser::lexer::{Lexer, Token};

pub struct ObjectParser<'a> {
    pub lex: Lexer<'a>,
    /// Combine `integer integer R` into an indirect reference.
    pub allow_objptr: bool,
    /// Turn a dict body followed by `stream` into a stream object.
    pub allow_stream: bool,
    /// Lookahead buffer (popped before the lexer is consulted).
    lookahead: Vec<Token>,
}

impl<'a> ObjectParser<'a> {
    pub fn new(data: &'a [u8], base: u64) -> Self {
        Self {
            lex: Lexer::new(data, base),
            allow_objptr: true,
            allow_stream: true,
            lookahead: Vec::new(),
        }
    }

    /// Parser for content and CMap streams: no indirect references, no
    /// embedded streams, EOF is an ordinary end of input.
    pub fn for_content(data: &'a [u8]) -> Self {
        let mut p = Self::new(data, 0);
        p.allow_objptr = false;
        p.allow_stream = false;
        p.lex.allow_eof = true;
        p
    }

    pub fn next_token(&mut self) -> Result<Token> {
        if let Some(tok) = self.lookahead.pop() {
            return Ok(tok);
        }
        self.lex.read_token()
    }

    pub fn push_back(&mut self, tok: Token) {
        self.lookahead.push(tok);
    }

    /// Jump to an absolute offset, discarding buffered tokens.
    pub fn seek_to(&mut self, abs: u64) {
        self.lookahead.clear();
        self.lex.seek_to(abs);
    }

    /// Parse the next object.
    pub fn parse_object(&mut self) -> Result<Object> {
        let tok = self.next_token()?;
        self.object_from_token(tok)
    }

    fn object_from_token(&mut self, tok: Token) -> Result<Object> {
        match tok {
            Token::Int(n) => {
                if self.allow_objptr {
                    if let Some(r) = self.try_objptr(n)? {
                        return Ok(r);
                    }
                }
                Ok(Object::Int(n))
            }
            Token::Real(x) => Ok(Object::Real(x)),
            Token::Str(s) => Ok(Object::String(s)),
            Token::Name(n) => Ok(Object::Name(n)),
            Token::DictStart => self.parse_dict(),
            Token::ArrayStart => self.parse_array(),
            Token::Keyword(kw) => match kw.as_slice() {
                b"true" => Ok(Object::Bool(true)),
                b"false" => Ok(Object::Bool(false)),
                b"null" => Ok(Object::Null),
                _ => Err(PdfError::TokenError {
                    pos: self.lex.tell(),
                    msg: format!("unexpected keyword {:?}", String::from_utf8_lossy(&kw)),
                }),
            },
            Token::ArrayEnd | Token::DictEnd => Err(PdfError::TokenError {
                pos: self.lex.tell(),
                msg: "unexpected closing delimiter".into(),
            }),
            Token::Eof => Err(PdfError::UnexpectedEof),
        }
    }

    /// After an integer, look for `integer R` and combine into a reference.
    fn try_objptr(&mut self, id: i64) -> Result<Option<Object>> {
        let tok2 = match self.next_token() {
            Ok(t) => t,
            Err(PdfError::UnexpectedEof) => return Ok(None),
            Err(e) => return Err(e),
        };
        if let Token::Int(gen) = tok2 {
            let tok3 = match self.next_token() {
                Ok(t) => t,
                Err(PdfError::UnexpectedEof) => {
                    self.push_back(Token::Int(gen));
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            if tok3.is_keyword(b"R") && id >= 0 && gen >= 0 {
                return Ok(Some(Object::Ref(ObjPtr::new(id as u32, gen as u16))));
            }
            self.push_back(tok3);
            self.push_back(Token::Int(gen));
        } else {
            self.push_back(tok2);
        }
        Ok(None)
    }

    fn parse_array(&mut self) -> Result<Object> {
        let mut arr = Vec::new();
        loop {
            let tok = self.next_token()?;
            if tok == Token::ArrayEnd {
                break;
            }
            if tok == Token::Eof {
                return Err(PdfError::UnexpectedEof);
            }
            arr.push(self.object_from_token(tok)?);
        }
        Ok(Object::Array(arr))
    }

    fn parse_dict(&mut self) -> Result<Object> {
        let mut dict = Dict::new();
        loop {
            let tok = self.next_token()?;
            if tok == Token::DictEnd {
                break;
            }
            let key = match tok {
                Token::Name(n) => n,
                Token::Eof => return Err(PdfError::UnexpectedEof),
                _ => {
                    return Err(PdfError::TokenError {
                        pos: self.lex.tell(),
                        msg: "expected name as dict key".into(),
                    })
                }
            };
            let value = self.parse_object()?;
            dict.insert(key, value);
        }
        Ok(Object::Dict(dict))
    }

    /// Parse an `N G obj ...` definition, including stream bodies.
    ///
    /// For a stream the payload offset is the byte immediately after the
    /// EOL that terminates the `stream` keyword.
    pub fn parse_indirect_object(&mut self) -> Result<ObjDef> {
        let id = match self.next_token()? {
            Token::Int(n) if n >= 0 => n as u32,
            other => {
                return Err(PdfError::TokenError {
                    pos: self.lex.tell(),
                    msg: format!("expected object number, got {:?}", other),
                })
            }
        };
        let gen = match self.next_token()? {
            Token::Int(n) if n >= 0 => n as u16,
            other => {
                return Err(PdfError::TokenError {
                    pos: self.lex.tell(),
                    msg: format!("expected generation, got {:?}", other),
                })
            }
        };
        let tok = self.next_token()?;
        if !tok.is_keyword(b"obj") {
            return Err(PdfError::TokenError {
                pos: self.lex.tell(),
                msg: format!("expected 'obj', got {:?}", tok),
            });
        }
        let ptr = ObjPtr::new(id, gen);
        let obj = self.parse_object()?;

        if self.allow_stream {
            if let Object::Dict(dict) = &obj {
                let next = match self.next_token() {
                    Ok(t) => Some(t),
                    Err(PdfError::UnexpectedEof) => None,
                    Err(e) => return Err(e),
                };
                match next {
                    Some(t) if t.is_keyword(b"stream") => {
                        let rem = self.lex.remaining();
                        let mut skip = 0;
                        if rem.first() == Some(&b'\r') {
                            skip += 1;
                        }
                        if rem.get(skip) == Some(&b'\n') {
                            skip += 1;
                        }
                        let offset = self.lex.tell() + skip as u64;
                        return Ok(ObjDef {
                            ptr,
                            obj: Object::Stream(Stream {
                                hdr: dict.clone(),
                                ptr,
                                offset,
                            }),
                        });
                    }
                    Some(t) if t.is_keyword(b"endobj") => return Ok(ObjDef { ptr, obj }),
                    Some(t) => self.push_back(t),
                    None => {}
                }
                return Ok(ObjDef { ptr, obj });
            }
        }

        // Consume a trailing endobj when present.
        match self.next_token() {
            Ok(t) => {
                if !t.is_keyword(b"endobj") {
                    self.push_back(t);
                }
            }
            Err(PdfError::UnexpectedEof) => {}
            Err(e) => return Err(e),
        }
        Ok(ObjDef { ptr, obj })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(data: &[u8]) -> Object {
        ObjectParser::new(data, 0).parse_object().unwrap()
    }

    #[test]
    fn parse_simple_dict() {
        let obj = parse_one(b"<< /Type /Page /Count 5 >>");
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get("Type").unwrap().as_name(), Some("Page"));
        assert_eq!(dict.get("Count").unwrap().as_int(), Some(5));
    }

    #[test]
    fn parse_nested_dict_with_ref() {
        let obj = parse_one(b"<< /Resources << /Font << /F1 4 0 R >> >> >>");
        let res = obj.as_dict().unwrap().get("Resources").unwrap();
        let font = res.as_dict().unwrap().get("Font").unwrap();
        let f1 = font.as_dict().unwrap().get("F1").unwrap();
        assert_eq!(*f1, Object::Ref(ObjPtr::new(4, 0)));
    }

    #[test]
    fn parse_array_mixed() {
        let obj = parse_one(b"[ 1 2.5 /Name (str) null ]");
        let arr = obj.as_array().unwrap();
        assert_eq!(arr.len(), 5);
        assert_eq!(arr[0], Object::Int(1));
        assert_eq!(arr[1], Object::Real(2.5));
        assert_eq!(arr[4], Object::Null);
    }

    #[test]
    fn two_ints_without_r_stay_ints() {
        let mut p = ObjectParser::new(b"10 20 30", 0);
        assert_eq!(p.parse_object().unwrap(), Object::Int(10));
        assert_eq!(p.parse_object().unwrap(), Object::Int(20));
        assert_eq!(p.parse_object().unwrap(), Object::Int(30));
    }

    #[test]
    fn consecutive_refs_in_array() {
        let obj = parse_one(b"[ 1 0 R 2 0 R 3 0 R ]");
        let arr = obj.as_array().unwrap();
        assert_eq!(arr[0], Object::Ref(ObjPtr::new(1, 0)));
        assert_eq!(arr[1], Object::Ref(ObjPtr::new(2, 0)));
        assert_eq!(arr[2], Object::Ref(ObjPtr::new(3, 0)));
    }

    #[test]
    fn objptr_disabled_in_content_mode() {
        let mut p = ObjectParser::for_content(b"1 0 R");
        assert_eq!(p.parse_object().unwrap(), Object::Int(1));
    }

    #[test]
    fn indirect_object_plain() {
        let mut p = ObjectParser::new(b"7 0 obj\n<< /A 1 >>\nendobj\n", 0);
        let def = p.parse_indirect_object().unwrap();
        assert_eq!(def.ptr, ObjPtr::new(7, 0));
        assert!(def.obj.as_dict().is_some());
    }

    #[test]
    fn indirect_object_stream_offset() {
        let data = b"5 0 obj\n<< /Length 4 >>\nstream\r\nDATAendstream\nendobj\n";
        let mut p = ObjectParser::new(data, 0);
        let def = p.parse_indirect_object().unwrap();
        match def.obj {
            Object::Stream(s) => {
                let off = s.offset as usize;
                assert_eq!(&data[off..off + 4], b"DATA");
            }
            other => panic!("expected stream, got {:?}", other),
        }
    }
}
