//! Recursive-descent parser for text `.X` files.
//!
//! The parser walks a flat token list with a single cursor. Only the
//! templates needed to rebuild geometry get semantic handling:
//!
//! - `Frame { FrameTransformMatrix { ... } Frame { ... } Mesh { ... } }`
//! - `Mesh { positions; faces; MeshTextureCoords; MeshMaterialList; MeshNormals }`
//! - `Material { diffuse; power; specular; emissive; TextureFilename { ... } }`
//!
//! Every other block (templates, `Header`, skinning data, animation sets)
//! is skipped by brace matching. Keywords are matched case-insensitively.
//! Syntax errors abort the whole parse; there is no recovery.

use std::collections::HashMap;

use thiserror::Error;
use xof_math::{Vec3, Vec4};

use super::header::{split_header, FormatError, XHeader};
use super::lexer::{tokenize, Token, TokenKind};
use super::types::*;

/// Errors that can occur during `.X` parsing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Line {line}: expected keyword '{keyword}', found {found}")]
    ExpectedKeyword {
        keyword: &'static str,
        found: String,
        line: usize,
    },

    #[error("Line {line}: expected symbol '{symbol}', found {found}")]
    ExpectedSymbol {
        symbol: char,
        found: String,
        line: usize,
    },

    #[error("Line {line}: expected number, found {found}")]
    ExpectedNumber { found: String, line: usize },

    #[error("Line {line}: expected non-negative integer, found {found}")]
    ExpectedInteger { found: String, line: usize },

    #[error("Line {line}: expected texture file name, found {found}")]
    ExpectedName { found: String, line: usize },

    #[error("Unresolved material reference '{0}'")]
    UnresolvedMaterial(String),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parser behaviour switches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Fail on `{ name }` references to unknown materials instead of
    /// dropping them with a diagnostic.
    pub strict_material_references: bool,
}

/// `.X` token parser.
pub struct XParser {
    tokens: Vec<Token>,
    pos: usize,
    options: ParseOptions,
    /// Material arena for the document being built
    materials: Vec<XMaterial>,
    /// Named materials visible to later `{ name }` references
    named_materials: HashMap<String, MaterialId>,
    diagnostics: Vec<Diagnostic>,
}

impl XParser {
    /// Create a parser over an already tokenized object section.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            options: ParseOptions::default(),
            materials: Vec::new(),
            named_materials: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse the whole token list into a document.
    pub fn parse(mut self, header: XHeader) -> ParseResult<XDocument> {
        let root = self.parse_root()?;

        log::debug!(
            "Parsed .X document: {} frames, {} meshes, {} materials",
            root.children.len(),
            root.mesh_count(),
            self.materials.len()
        );

        Ok(XDocument {
            header,
            root,
            materials: self.materials,
            diagnostics: self.diagnostics,
        })
    }

    // ------------------------------------------------------------------
    // Cursor helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn skip_separators(&mut self) {
        while self.peek().is_some_and(Token::is_separator) {
            self.pos += 1;
        }
    }

    /// Description of the current token for error messages.
    fn found(&self) -> (String, usize) {
        match self.peek() {
            Some(token) => (format!("'{}'", token.lexeme), token.line),
            None => (
                "end of input".to_string(),
                self.tokens.last().map_or(1, |t| t.line),
            ),
        }
    }

    fn at_symbol(&self, symbol: char) -> bool {
        self.peek().is_some_and(|t| t.is_symbol(symbol))
    }

    fn expect_symbol(&mut self, symbol: char) -> ParseResult<()> {
        self.skip_separators();
        if self.at_symbol(symbol) {
            self.pos += 1;
            return Ok(());
        }
        let (found, line) = self.found();
        Err(ParseError::ExpectedSymbol {
            symbol,
            found,
            line,
        })
    }

    fn expect_keyword(&mut self, keyword: &'static str) -> ParseResult<()> {
        self.skip_separators();
        if self.peek().is_some_and(|t| t.is_keyword(keyword)) {
            self.pos += 1;
            return Ok(());
        }
        let (found, line) = self.found();
        Err(ParseError::ExpectedKeyword {
            keyword,
            found,
            line,
        })
    }

    fn read_number(&mut self) -> ParseResult<f64> {
        self.skip_separators();
        if let Some(value) = self.peek().and_then(Token::as_f64) {
            self.pos += 1;
            return Ok(value);
        }
        let (found, line) = self.found();
        Err(ParseError::ExpectedNumber { found, line })
    }

    fn read_f32(&mut self) -> ParseResult<f32> {
        Ok(self.read_number()? as f32)
    }

    fn read_vec3(&mut self) -> ParseResult<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Read a count or index. Fractional, negative, or oversized values fail.
    fn read_u32(&mut self) -> ParseResult<u32> {
        self.skip_separators();
        let value = self.peek().and_then(Token::as_f64);
        match value {
            Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => {
                self.pos += 1;
                Ok(v as u32)
            }
            _ => {
                let (found, line) = self.found();
                Err(ParseError::ExpectedInteger { found, line })
            }
        }
    }

    fn read_count(&mut self) -> ParseResult<usize> {
        Ok(self.read_u32()? as usize)
    }

    /// Capacity hint that a corrupt count cannot blow up.
    fn capacity_for(&self, count: usize, tokens_per_item: usize) -> usize {
        count.min((self.tokens.len() - self.pos) / tokens_per_item.max(1))
    }

    /// Consume an optional object name.
    ///
    /// A name is taken only when the next meaningful token after it is `{`,
    /// so `Mesh {` and `Mesh Body {` both parse.
    fn optional_name(&mut self) -> String {
        self.skip_separators();
        let Some(token) = self.peek() else {
            return String::new();
        };
        if token.kind == TokenKind::Symbol {
            return String::new();
        }

        let mut offset = 1;
        while self.peek_at(offset).is_some_and(Token::is_separator) {
            offset += 1;
        }
        if !self.peek_at(offset).is_some_and(|t| t.is_symbol('{')) {
            return String::new();
        }

        let name = token.lexeme.clone();
        self.pos += 1;
        name
    }

    /// Skip a `{ ... }` block starting at the current `{`.
    fn skip_block(&mut self) -> ParseResult<()> {
        self.expect_symbol('{')?;
        self.skip_rest_of_block()
    }

    /// Consume tokens up to and including the `}` closing the current block.
    fn skip_rest_of_block(&mut self) -> ParseResult<()> {
        let mut depth = 1usize;
        while let Some(token) = self.peek() {
            if token.is_symbol('{') {
                depth += 1;
            } else if token.is_symbol('}') {
                depth -= 1;
            }
            self.pos += 1;
            if depth == 0 {
                return Ok(());
            }
        }
        let (found, line) = self.found();
        Err(ParseError::ExpectedSymbol {
            symbol: '}',
            found,
            line,
        })
    }

    /// Skip an object this parser has no semantic handling for.
    ///
    /// Consumes the keyword, an optional name, and the following block if
    /// there is one. A bare `{` is skipped as a block.
    fn skip_opaque(&mut self) -> ParseResult<()> {
        self.skip_separators();
        if self.at_symbol('{') {
            return self.skip_block();
        }
        if let Some(token) = self.peek() {
            log::trace!("Skipping '{}' at line {}", token.lexeme, token.line);
            self.pos += 1;
        }
        self.optional_name();
        self.skip_separators();
        if self.at_symbol('{') {
            self.skip_block()?;
        }
        Ok(())
    }

    /// Advance to the next meaningful token inside a block.
    ///
    /// Returns `false` after consuming the closing `}`; errors at end of input.
    fn next_in_block(&mut self) -> ParseResult<bool> {
        self.skip_separators();
        match self.peek() {
            None => {
                let (found, line) = self.found();
                Err(ParseError::ExpectedSymbol {
                    symbol: '}',
                    found,
                    line,
                })
            }
            Some(token) if token.is_symbol('}') => {
                self.pos += 1;
                Ok(false)
            }
            Some(_) => Ok(true),
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    // ------------------------------------------------------------------
    // Productions
    // ------------------------------------------------------------------

    fn parse_root(&mut self) -> ParseResult<XFrame> {
        let mut root = XFrame::default();

        loop {
            self.skip_separators();
            if self.peek().is_none() {
                break;
            }

            if self.at_keyword("frame") {
                let frame = self.parse_frame()?;
                root.children.push(frame);
            } else if self.at_keyword("mesh") {
                let mesh = self.parse_mesh()?;
                root.meshes.push(mesh);
            } else if self.at_keyword("material") {
                // Registered by name; only emitted if a mesh references it
                self.parse_material()?;
            } else {
                self.skip_opaque()?;
            }
        }

        Ok(root)
    }

    fn parse_frame(&mut self) -> ParseResult<XFrame> {
        self.expect_keyword("frame")?;
        let mut frame = XFrame::new(self.optional_name());
        self.expect_symbol('{')?;

        log::trace!("Parsing frame '{}'", frame.name);

        while self.next_in_block()? {
            if self.at_keyword("frametransformmatrix") {
                frame.transform = Some(self.parse_frame_transform()?);
            } else if self.at_keyword("frame") {
                let child = self.parse_frame()?;
                frame.children.push(child);
            } else if self.at_keyword("mesh") {
                let mesh = self.parse_mesh()?;
                frame.meshes.push(mesh);
            } else {
                self.skip_opaque()?;
            }
        }

        Ok(frame)
    }

    fn parse_frame_transform(&mut self) -> ParseResult<[f32; 16]> {
        self.expect_keyword("frametransformmatrix")?;
        self.optional_name();
        self.expect_symbol('{')?;

        let mut matrix = [0.0f32; 16];
        for value in &mut matrix {
            *value = self.read_f32()?;
        }

        self.expect_symbol('}')?;
        Ok(matrix)
    }

    fn parse_mesh(&mut self) -> ParseResult<XMesh> {
        self.expect_keyword("mesh")?;
        let mut mesh = XMesh {
            name: self.optional_name(),
            ..Default::default()
        };
        self.expect_symbol('{')?;

        let vertex_count = self.read_count()?;
        mesh.positions.reserve(self.capacity_for(vertex_count, 3));
        for _ in 0..vertex_count {
            mesh.positions.push(self.read_vec3()?);
        }

        let face_count = self.read_count()?;
        mesh.faces.reserve(self.capacity_for(face_count, 4));
        for _ in 0..face_count {
            mesh.faces.push(self.read_face()?);
        }

        while self.next_in_block()? {
            if self.at_keyword("meshtexturecoords") {
                mesh.uvs = Some(self.parse_texture_coords()?);
            } else if self.at_keyword("meshmateriallist") {
                self.parse_material_list(&mut mesh)?;
            } else if self.at_keyword("meshnormals") {
                self.skip_normals()?;
            } else {
                self.skip_opaque()?;
            }
        }

        log::trace!(
            "Parsed mesh '{}': {} vertices, {} faces",
            mesh.name,
            mesh.positions.len(),
            mesh.faces.len()
        );

        Ok(mesh)
    }

    /// `n; i0, i1, ... in-1;`
    fn read_face(&mut self) -> ParseResult<Vec<u32>> {
        let count = self.read_count()?;
        let mut face = Vec::with_capacity(self.capacity_for(count, 1));
        for _ in 0..count {
            face.push(self.read_u32()?);
        }
        Ok(face)
    }

    fn parse_texture_coords(&mut self) -> ParseResult<Vec<[f32; 2]>> {
        self.expect_keyword("meshtexturecoords")?;
        self.optional_name();
        self.expect_symbol('{')?;

        let count = self.read_count()?;
        let mut uvs = Vec::with_capacity(self.capacity_for(count, 2));
        for _ in 0..count {
            uvs.push([self.read_f32()?, self.read_f32()?]);
        }

        self.skip_rest_of_block()?;
        Ok(uvs)
    }

    /// Normals are recomputed after triangulation, so the block is only
    /// validated structurally.
    fn skip_normals(&mut self) -> ParseResult<()> {
        self.expect_keyword("meshnormals")?;
        self.optional_name();
        self.expect_symbol('{')?;

        let count = self.read_count()?;
        for _ in 0..count {
            self.read_vec3()?;
        }
        let face_count = self.read_count()?;
        for _ in 0..face_count {
            self.read_face()?;
        }

        self.skip_rest_of_block()
    }

    fn parse_material_list(&mut self, mesh: &mut XMesh) -> ParseResult<()> {
        self.expect_keyword("meshmateriallist")?;
        self.optional_name();
        self.expect_symbol('{')?;

        self.skip_separators();
        let (declared_found, declared_line) = self.found();
        let declared_materials = self.read_count()?;
        let face_count = self.read_count()?;
        mesh.face_materials = Vec::with_capacity(self.capacity_for(face_count, 1));
        for _ in 0..face_count {
            mesh.face_materials.push(self.read_count()?);
        }

        // A declared count beyond the faces plus the remaining tokens is corrupt.
        let remaining = self.tokens.len() - self.pos;
        if declared_materials > face_count.saturating_add(remaining) {
            return Err(ParseError::ExpectedInteger {
                found: declared_found,
                line: declared_line,
            });
        }

        while self.next_in_block()? {
            if self.at_keyword("material") {
                let id = self.parse_material()?;
                mesh.materials.push(id);
            } else if self.at_material_reference() {
                if let Some(id) = self.parse_material_reference()? {
                    mesh.materials.push(id);
                }
            } else {
                self.skip_opaque()?;
            }
        }

        while mesh.materials.len() < declared_materials {
            mesh.materials.push(self.add_material(XMaterial::fallback()));
        }

        Ok(())
    }

    /// `{ name }` with exactly one name token between the braces. Separators
    /// may surround the name.
    fn at_material_reference(&self) -> bool {
        self.material_reference_len().is_some()
    }

    /// Token offset of the name and total length of a `{ name }` reference
    /// at the cursor.
    fn material_reference_len(&self) -> Option<(usize, usize)> {
        if !self.at_symbol('{') {
            return None;
        }
        let mut offset = 1;
        while self.peek_at(offset).is_some_and(Token::is_separator) {
            offset += 1;
        }
        let name_offset = offset;
        if self.peek_at(name_offset)?.kind == TokenKind::Symbol {
            return None;
        }
        offset += 1;
        while self.peek_at(offset).is_some_and(Token::is_separator) {
            offset += 1;
        }
        self.peek_at(offset)
            .is_some_and(|t| t.is_symbol('}'))
            .then_some((name_offset, offset + 1))
    }

    fn parse_material_reference(&mut self) -> ParseResult<Option<MaterialId>> {
        let Some((name_offset, len)) = self.material_reference_len() else {
            let (found, line) = self.found();
            return Err(ParseError::ExpectedName { found, line });
        };
        let name = self.tokens[self.pos + name_offset].lexeme.clone();
        self.pos += len;

        match self.named_materials.get(&name) {
            Some(&id) => Ok(Some(id)),
            None if self.options.strict_material_references => {
                Err(ParseError::UnresolvedMaterial(name))
            }
            None => {
                log::warn!("Dropping reference to unknown material '{}'", name);
                self.diagnostics.push(Diagnostic::UnresolvedMaterial { name });
                Ok(None)
            }
        }
    }

    fn parse_material(&mut self) -> ParseResult<MaterialId> {
        self.expect_keyword("material")?;
        let name = self.optional_name();
        self.expect_symbol('{')?;

        let diffuse = Vec4::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        );
        let specular_power = self.read_f32()?;
        let specular = self.read_vec3()?;
        let emissive = self.read_vec3()?;

        let mut material = XMaterial {
            name,
            diffuse,
            specular_power,
            specular,
            emissive,
            texture_reference: None,
            texture_locator: None,
        };

        while self.next_in_block()? {
            if self.at_keyword("texturefilename") {
                material.texture_reference = Some(self.parse_texture_filename()?);
            } else {
                self.skip_opaque()?;
            }
        }

        let name = material.name.clone();
        let id = self.add_material(material);
        if !name.is_empty() {
            // Later definitions shadow earlier ones
            self.named_materials.insert(name, id);
        }
        Ok(id)
    }

    fn parse_texture_filename(&mut self) -> ParseResult<String> {
        self.expect_keyword("texturefilename")?;
        self.optional_name();
        self.expect_symbol('{')?;
        self.skip_separators();

        let file_name = match self.peek() {
            Some(token) if matches!(token.kind, TokenKind::String | TokenKind::Identifier) => {
                token.lexeme.clone()
            }
            _ => {
                let (found, line) = self.found();
                return Err(ParseError::ExpectedName { found, line });
            }
        };
        self.pos += 1;

        self.expect_symbol('}')?;
        Ok(file_name)
    }

    fn add_material(&mut self, material: XMaterial) -> MaterialId {
        let id = MaterialId(self.materials.len());
        self.materials.push(material);
        id
    }
}

/// Parse a complete `.X` file (header included) with default options.
pub fn parse_x(content: &str) -> ParseResult<XDocument> {
    parse_x_with_options(content, ParseOptions::default())
}

/// Parse a complete `.X` file (header included).
pub fn parse_x_with_options(content: &str, options: ParseOptions) -> ParseResult<XDocument> {
    let (header, body) = split_header(content)?;
    let tokens = tokenize(body);
    XParser::new(tokens).with_options(options).parse(header)
}
